use std::fmt::{Debug, Formatter};

use super::field::{lookup, OxmField};
use crate::error::{OxmError, OxmResult};

/// `OFPXMC_OPENFLOW_BASIC`
pub const OFPXMC_OPENFLOW_BASIC: u16 = 0x8000;
pub const OXM_HEADER_LEN: usize = 4;

/// 32-bit OXM header: `class:16 | field:7 | hasmask:1 | length:8`.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct OxmHeader(pub u32);

impl OxmHeader {
    pub const fn new(class: u16, field: u8, has_mask: bool, length: u8) -> Self {
        OxmHeader(
            (class as u32) << 16
                | ((field as u32) & 0x7f) << 9
                | (has_mask as u32) << 8
                | length as u32,
        )
    }

    #[inline]
    pub const fn class(self) -> u16 {
        (self.0 >> 16) as u16
    }

    #[inline]
    pub const fn field(self) -> u8 {
        ((self.0 >> 9) & 0x7f) as u8
    }

    #[inline]
    pub const fn has_mask(self) -> bool {
        (self.0 >> 8) & 1 == 1
    }

    /// Payload length in bytes, header excluded.
    #[inline]
    pub const fn length(self) -> usize {
        (self.0 & 0xff) as usize
    }

    /// Resolves the header against the registry and checks the declared length
    /// against the field's exact or doubled canonical length.
    pub fn check(self) -> OxmResult<OxmField> {
        let unknown = OxmError::UnknownFieldType {
            class: self.class(),
            field: self.field(),
        };
        if self.class() != OFPXMC_OPENFLOW_BASIC {
            return Err(unknown);
        }
        let desc = lookup(self.field()).ok_or(unknown)?;
        let expected = match (self.has_mask(), desc.maskable) {
            (false, _) => desc.len,
            (true, true) => desc.len * 2,
            // an exact-only field never carries a mask on the wire
            (true, false) => desc.len,
        };
        if (self.has_mask() && !desc.maskable) || self.length() != expected {
            return Err(OxmError::MalformedLength {
                field: desc.field,
                expected,
                actual: self.length(),
            });
        }
        Ok(desc.field)
    }
}

impl Debug for OxmHeader {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "OxmHeader({:#06x}:{}{} len={})",
            self.class(),
            self.field(),
            if self.has_mask() { "/m" } else { "" },
            self.length()
        )
    }
}

/// Borrowed view of one OXM TLV: its header and the payload the header announces.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OxmTlv<'a> {
    pub header: OxmHeader,
    pub body: &'a [u8],
}

impl<'a> OxmTlv<'a> {
    pub fn new(header: OxmHeader, body: &'a [u8]) -> OxmResult<Self> {
        if body.len() != header.length() {
            return Err(OxmError::Truncated {
                needed: header.length(),
                available: body.len(),
            });
        }
        Ok(OxmTlv { header, body })
    }

    /// The value half of the payload.
    pub fn value(&self) -> &'a [u8] {
        if self.header.has_mask() {
            &self.body[..self.body.len() / 2]
        } else {
            self.body
        }
    }

    /// The mask half of the payload, if the header announces one.
    pub fn mask(&self) -> Option<&'a [u8]> {
        self.header
            .has_mask()
            .then(|| &self.body[self.body.len() / 2..])
    }

    /// Bytes this TLV occupies on the wire.
    #[inline]
    pub fn wire_len(&self) -> usize {
        OXM_HEADER_LEN + self.body.len()
    }
}
