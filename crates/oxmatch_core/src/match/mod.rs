//! # Match
//!
//! ## Relations of important structs
//! ```text
//!   OxmTlv --assign--> Match --pack--> bytes
//!                        |
//!                        v
//!            [Option<MaskedValue>; FIELD_COUNT]
//!                        ^
//!                        |
//!               FieldDescriptor (FIELDS)
//! ```
//!
//! A [Match] keeps one optional [MaskedValue] slot per registered field. Values are
//! stored in canonical form: `value & mask == value`, and a field whose mask is all
//! zeros is not stored at all. Two matches that admit the same packets are therefore
//! structurally equal, which is what strict lookup relies on.
//!
//! ## Example
//! ```
//! use oxmatch_core::r#match::{field::OxmField, Match};
//!
//! let mut rule = Match::new();
//! rule.set(OxmField::EthType, 0x0800u16)
//!     .set_masked(OxmField::Ipv4Dst, 0x0a00_0000u32, 0xff00_0000u32)
//!     .unwrap();
//!
//! let mut pkt = Match::new();
//! pkt.set(OxmField::EthType, 0x0800u16)
//!     .set(OxmField::Ipv4Dst, 0x0a01_0203u32)
//!     .set(OxmField::TcpDst, 80u16);
//!
//! assert!(rule.covers(&pkt));
//! assert!(!pkt.covers(&rule));
//! ```

pub mod field;
pub mod tlv;

use std::fmt::{Debug, Display, Formatter};

use bitvec::{field::BitField, prelude::*};
use bytes::BufMut;
use funty::Unsigned;

use crate::error::{OxmError, OxmResult};
use field::{FieldCodec, OxmField, FIELDS, FIELD_COUNT, MAX_FIELD_LEN};
use tlv::OxmTlv;

pub type FieldBitOrder = Msb0;
pub type FieldBitStore = u8;
pub type FieldBits = BitArray<[FieldBitStore; MAX_FIELD_LEN], FieldBitOrder>;

/// Value and mask of one field, left-aligned in network byte order.
///
/// Bits past the field's canonical length are always zero.
#[derive(Eq, PartialEq, Hash, Default, Clone, Copy, Debug)]
pub struct MaskedValue {
    pub value: FieldBits,
    pub mask: FieldBits,
}

fn store_be<U: Unsigned>(bits: &mut BitSlice<FieldBitStore, FieldBitOrder>, value: U) {
    let width = bits.len().min(std::mem::size_of::<U>() * 8);
    let pad = bits.len() - width;
    bits[..pad].fill(false);
    bits[pad..].store_be(value);
}

fn load_be<U: Unsigned>(bits: &BitSlice<FieldBitStore, FieldBitOrder>) -> U {
    let width = bits.len().min(std::mem::size_of::<U>() * 8);
    bits[bits.len() - width..].load_be()
}

impl MaskedValue {
    /// Stores `value`/`mask` into the first `len` bytes. Integers wider than the
    /// field keep their low-order bytes.
    pub fn store<U: Unsigned>(value: U, mask: U, len: usize) -> Self {
        let mut v = FieldBits::ZERO;
        let mut m = FieldBits::ZERO;
        store_be(&mut v[..len * 8], value);
        store_be(&mut m[..len * 8], mask);
        Self { value: v, mask: m }
    }

    /// Builds from raw network-order bytes; a missing mask means exact.
    pub fn from_bytes(value: &[u8], mask: Option<&[u8]>) -> Self {
        let len = value.len().min(MAX_FIELD_LEN);
        let mut v = FieldBits::ZERO;
        let mut m = FieldBits::ZERO;
        v.as_raw_mut_slice()[..len].copy_from_slice(&value[..len]);
        match mask {
            Some(mask) => {
                let mlen = mask.len().min(len);
                m.as_raw_mut_slice()[..mlen].copy_from_slice(&mask[..mlen]);
            }
            None => m[..len * 8].fill(true),
        }
        Self { value: v, mask: m }
    }

    /// Canonical form, or `None` when the mask leaves nothing constrained.
    pub fn normalize(self) -> Option<Self> {
        if self.mask.not_any() {
            None
        } else {
            Some(Self {
                value: self.value & self.mask,
                mask: self.mask,
            })
        }
    }

    #[inline]
    pub fn is_exact(&self, len: usize) -> bool {
        self.mask[..len * 8].all()
    }

    #[inline]
    pub fn value_bytes(&self, len: usize) -> &[u8] {
        &self.value.as_raw_slice()[..len]
    }

    #[inline]
    pub fn mask_bytes(&self, len: usize) -> &[u8] {
        &self.mask.as_raw_slice()[..len]
    }

    pub fn load_value<U: Unsigned>(&self, len: usize) -> U {
        load_be(&self.value[..len * 8])
    }

    pub fn load_mask<U: Unsigned>(&self, len: usize) -> U {
        load_be(&self.mask[..len * 8])
    }

    /// Every value admitted by `rhs` is admitted by `self`.
    pub fn is_superset_of(&self, rhs: &MaskedValue) -> bool {
        // self may only care about bits rhs also fixes
        (self.mask & rhs.mask) == self.mask && ((self.value ^ rhs.value) & self.mask).not_any()
    }

    /// Some value is admitted by both.
    pub fn intersect_any(&self, rhs: &MaskedValue) -> bool {
        ((self.value ^ rhs.value) & self.mask & rhs.mask).not_any()
    }
}

/// Field constraints of one flow rule, or the header fields of one packet.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Match {
    fields: [Option<MaskedValue>; FIELD_COUNT],
}

impl Default for Match {
    fn default() -> Self {
        Self::new()
    }
}

impl Match {
    /// Fully wildcarded match.
    pub fn new() -> Self {
        Match {
            fields: [None; FIELD_COUNT],
        }
    }

    #[inline]
    pub fn get(&self, field: OxmField) -> Option<&MaskedValue> {
        self.fields[field as usize].as_ref()
    }

    #[inline]
    pub fn is_set(&self, field: OxmField) -> bool {
        self.fields[field as usize].is_some()
    }

    pub fn value<U: Unsigned>(&self, field: OxmField) -> Option<U> {
        self.get(field).map(|mv| mv.load_value(field.len()))
    }

    pub fn mask<U: Unsigned>(&self, field: OxmField) -> Option<U> {
        self.get(field).map(|mv| mv.load_mask(field.len()))
    }

    /// Constrains `field` to exactly `value`.
    pub fn set<U: Unsigned>(&mut self, field: OxmField, value: U) -> &mut Self {
        let len = field.len();
        let mut mv = MaskedValue::store(value, U::ZERO, len);
        mv.mask[..len * 8].fill(true);
        self.fields[field as usize] = Some(mv);
        self
    }

    /// Constrains the bits of `field` selected by `mask`. A zero mask clears the field.
    pub fn set_masked<U: Unsigned>(
        &mut self,
        field: OxmField,
        value: U,
        mask: U,
    ) -> OxmResult<&mut Self> {
        let mv = MaskedValue::store(value, mask, field.len());
        self.put(field, mv)?;
        Ok(self)
    }

    /// Constrains `field` from network-order bytes of exactly the canonical length.
    pub fn set_bytes(
        &mut self,
        field: OxmField,
        value: &[u8],
        mask: Option<&[u8]>,
    ) -> OxmResult<&mut Self> {
        let len = field.len();
        let bad = std::iter::once(value)
            .chain(mask)
            .map(<[u8]>::len)
            .find(|n| *n != len);
        if let Some(actual) = bad {
            return Err(OxmError::MalformedLength {
                field,
                expected: len,
                actual,
            });
        }
        self.put(field, MaskedValue::from_bytes(value, mask))?;
        Ok(self)
    }

    fn put(&mut self, field: OxmField, mv: MaskedValue) -> OxmResult<()> {
        let mv = mv.normalize();
        if let Some(mv) = &mv {
            if !field.is_maskable() && !mv.is_exact(field.len()) {
                return Err(OxmError::NotMaskable(field));
            }
        }
        self.fields[field as usize] = mv;
        Ok(())
    }

    /// Removes the constraint on `field`, returning it.
    pub fn clear(&mut self, field: OxmField) -> Option<MaskedValue> {
        self.fields[field as usize].take()
    }

    /// Set fields in wire type order.
    pub fn iter(&self) -> impl Iterator<Item = (OxmField, &MaskedValue)> + '_ {
        FIELDS
            .iter()
            .zip(self.fields.iter())
            .filter_map(|(d, mv)| mv.as_ref().map(|mv| (d.field, mv)))
    }

    /// No field is constrained.
    pub fn is_empty(&self) -> bool {
        self.fields.iter().all(Option::is_none)
    }

    /// Number of constrained fields.
    pub fn field_count(&self) -> usize {
        self.fields.iter().filter(|f| f.is_some()).count()
    }

    /// Every constrained field is exact (no partial mask).
    pub fn is_exact(&self) -> bool {
        self.iter().all(|(f, mv)| mv.is_exact(f.len()))
    }

    /// Decodes one OXM TLV into its field slot.
    pub fn assign(&mut self, tlv: &OxmTlv) -> OxmResult<()> {
        let field = tlv.header.check()?;
        if tlv.body.len() != tlv.header.length() {
            return Err(OxmError::MalformedLength {
                field,
                expected: tlv.header.length(),
                actual: tlv.body.len(),
            });
        }
        if self.is_set(field) {
            return Err(OxmError::DuplicateField(field));
        }
        self.put(field, MaskedValue::from_bytes(tlv.value(), tlv.mask()))
    }

    /// Sum of each field's payload length (value, plus mask when partial).
    pub fn payload_length(&self) -> usize {
        FIELDS.iter().map(|d| d.wire_length(self)).sum()
    }

    /// Bytes the match occupies as an OXM list, headers included.
    pub fn length(&self) -> usize {
        FIELDS.iter().map(|d| d.tlv_length(self)).sum()
    }

    /// Packs every set field in wire type order, returning the bytes written.
    pub fn pack<B: BufMut>(&self, dst: &mut B) -> usize {
        FIELDS.iter().map(|d| d.pack(self, dst)).sum()
    }

    /// Every packet admitted by `other` is admitted by `self`.
    pub fn covers(&self, other: &Match) -> bool {
        self.fields
            .iter()
            .zip(other.fields.iter())
            .all(|(a, b)| match (a, b) {
                (None, _) => true,
                (Some(_), None) => false,
                (Some(a), Some(b)) => a.is_superset_of(b),
            })
    }

    /// Some packet is admitted by both.
    pub fn overlaps(&self, other: &Match) -> bool {
        self.fields
            .iter()
            .zip(other.fields.iter())
            .all(|(a, b)| match (a, b) {
                (Some(a), Some(b)) => a.intersect_any(b),
                _ => true,
            })
    }
}

fn write_hex(f: &mut Formatter<'_>, bytes: &[u8]) -> std::fmt::Result {
    f.write_str("0x")?;
    for b in bytes {
        write!(f, "{:02x}", b)?;
    }
    Ok(())
}

impl Display for Match {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return f.write_str("*");
        }
        for (i, (field, mv)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}=", field)?;
            let len = field.len();
            write_hex(f, mv.value_bytes(len))?;
            if !mv.is_exact(len) {
                f.write_str("/")?;
                write_hex(f, mv.mask_bytes(len))?;
            }
        }
        Ok(())
    }
}

impl Debug for Match {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Match({})", self)
    }
}
