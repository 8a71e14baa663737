//! # Field codec registry
//!
//! ## What is a field descriptor?
//! Every OpenFlow basic-class match field has a fixed wire type, a canonical
//! byte length and a maskability bit. [FieldDescriptor] records those three
//! facts together with the logical name used in text syntax and logs.
//!
//! ## Registration
//! The registry is the static table [FIELDS], indexed by OXM field type. It is
//! laid out at compile time, so lookup by type is a bounds-checked array index
//! and there is nothing to initialise or tear down. A `const` check rejects a
//! table whose slot `i` does not describe type `i`, which makes a duplicate or
//! out-of-order registration a build failure rather than a runtime condition.
//!
//! Name lookup goes through the perfect hash map generated by `build.rs`.
//!
//! ## Example
//! ```
//! use oxmatch_core::r#match::{field::{FieldCodec, OxmField}, Match};
//!
//! let mut m = Match::new();
//! m.set(OxmField::Ipv4Dst, 0x0a00_0001u32);
//! let ipv4_dst = OxmField::from_name("ipv4_dst").unwrap();
//! assert_eq!(ipv4_dst.descriptor().wire_length(&m), 4);
//! assert_eq!(ipv4_dst.descriptor().tlv_length(&m), 8);
//! ```

use std::fmt::{Display, Formatter};

use bytes::BufMut;

use super::{
    tlv::{OxmHeader, OFPXMC_OPENFLOW_BASIC, OXM_HEADER_LEN},
    Match,
};

mod codegen {
    include!(concat!(env!("OUT_DIR"), "/codegen.rs"));
}

pub use codegen::FIELD_COUNT;

/// Longest canonical field length (IPv6 addresses).
pub const MAX_FIELD_LEN: usize = 16;

/// Static description of one match field type.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub field: OxmField,
    pub name: &'static str,
    pub len: usize,
    pub maskable: bool,
}

/// Per-field codec contract.
///
/// `wire_length` is the payload a field occupies inside its TLV (0 when the field is
/// not set, the canonical length for an exact constraint, twice that for a partial
/// mask). `tlv_length` adds the OXM header and is what [pack](FieldCodec::pack)
/// writes.
pub trait FieldCodec {
    fn type_id(&self) -> u8;

    fn canonical_length(&self) -> usize;

    fn is_field(&self, name: &str) -> bool;

    fn wire_length(&self, m: &Match) -> usize;

    fn pack<B: BufMut>(&self, m: &Match, dst: &mut B) -> usize;

    fn tlv_length(&self, m: &Match) -> usize {
        match self.wire_length(m) {
            0 => 0,
            n => OXM_HEADER_LEN + n,
        }
    }
}

impl FieldCodec for FieldDescriptor {
    #[inline]
    fn type_id(&self) -> u8 {
        self.field as u8
    }

    #[inline]
    fn canonical_length(&self) -> usize {
        self.len
    }

    fn is_field(&self, name: &str) -> bool {
        OxmField::from_name(name) == Some(self.field)
    }

    fn wire_length(&self, m: &Match) -> usize {
        match m.get(self.field) {
            None => 0,
            Some(mv) if mv.is_exact(self.len) => self.len,
            Some(_) => self.len * 2,
        }
    }

    fn pack<B: BufMut>(&self, m: &Match, dst: &mut B) -> usize {
        let Some(mv) = m.get(self.field) else {
            return 0;
        };
        let has_mask = !mv.is_exact(self.len);
        dst.put_u32(self.field.header(has_mask).0);
        dst.put_slice(mv.value_bytes(self.len));
        if has_mask {
            dst.put_slice(mv.mask_bytes(self.len));
        }
        self.tlv_length(m)
    }
}

macro_rules! oxm_fields {
    ($($variant:ident = $id:literal, $name:literal, $len:literal, $maskable:literal;)+) => {
        /// OpenFlow 1.3 basic-class match field types (`OFPXMT_OFB_*`).
        #[repr(u8)]
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum OxmField {
            $($variant = $id,)+
        }

        const DESCRIPTORS: [FieldDescriptor; FIELD_COUNT] = [
            $(FieldDescriptor {
                field: OxmField::$variant,
                name: $name,
                len: $len,
                maskable: $maskable,
            },)+
        ];
    };
}

oxm_fields! {
    InPort = 0, "in_port", 4, false;
    InPhyPort = 1, "in_phy_port", 4, false;
    Metadata = 2, "metadata", 8, true;
    EthDst = 3, "eth_dst", 6, true;
    EthSrc = 4, "eth_src", 6, true;
    EthType = 5, "eth_type", 2, false;
    VlanVid = 6, "vlan_vid", 2, true;
    VlanPcp = 7, "vlan_pcp", 1, false;
    IpDscp = 8, "ip_dscp", 1, false;
    IpEcn = 9, "ip_ecn", 1, false;
    IpProto = 10, "ip_proto", 1, false;
    Ipv4Src = 11, "ipv4_src", 4, true;
    Ipv4Dst = 12, "ipv4_dst", 4, true;
    TcpSrc = 13, "tcp_src", 2, false;
    TcpDst = 14, "tcp_dst", 2, false;
    UdpSrc = 15, "udp_src", 2, false;
    UdpDst = 16, "udp_dst", 2, false;
    SctpSrc = 17, "sctp_src", 2, false;
    SctpDst = 18, "sctp_dst", 2, false;
    Icmpv4Type = 19, "icmpv4_type", 1, false;
    Icmpv4Code = 20, "icmpv4_code", 1, false;
    ArpOp = 21, "arp_op", 2, false;
    ArpSpa = 22, "arp_spa", 4, true;
    ArpTpa = 23, "arp_tpa", 4, true;
    ArpSha = 24, "arp_sha", 6, true;
    ArpTha = 25, "arp_tha", 6, true;
    Ipv6Src = 26, "ipv6_src", 16, true;
    Ipv6Dst = 27, "ipv6_dst", 16, true;
    Ipv6Flabel = 28, "ipv6_flabel", 4, true;
    Icmpv6Type = 29, "icmpv6_type", 1, false;
    Icmpv6Code = 30, "icmpv6_code", 1, false;
    Ipv6NdTarget = 31, "ipv6_nd_target", 16, false;
    Ipv6NdSll = 32, "ipv6_nd_sll", 6, false;
    Ipv6NdTll = 33, "ipv6_nd_tll", 6, false;
    MplsLabel = 34, "mpls_label", 4, false;
    MplsTc = 35, "mpls_tc", 1, false;
    MplsBos = 36, "mpls_bos", 1, false;
    PbbIsid = 37, "pbb_isid", 3, true;
    TunnelId = 38, "tunnel_id", 8, true;
    Ipv6Exthdr = 39, "ipv6_exthdr", 2, true;
}

// slot i must describe field type i
const _: () = {
    let mut i = 0;
    while i < FIELD_COUNT {
        assert!(DESCRIPTORS[i].field as usize == i, "field table is not dense");
        assert!(DESCRIPTORS[i].len <= MAX_FIELD_LEN, "field wider than MAX_FIELD_LEN");
        i += 1;
    }
};

/// The process-wide field registry, indexed by OXM field type.
pub static FIELDS: [FieldDescriptor; FIELD_COUNT] = DESCRIPTORS;

/// Looks up a descriptor by wire field type.
#[inline]
pub fn lookup(type_id: u8) -> Option<&'static FieldDescriptor> {
    FIELDS.get(type_id as usize)
}

impl OxmField {
    /// Field for a wire type, if registered.
    #[inline]
    pub fn from_type(type_id: u8) -> Option<Self> {
        lookup(type_id).map(|d| d.field)
    }

    /// Field for a logical name such as `"ipv4_dst"`.
    pub fn from_name(name: &str) -> Option<Self> {
        codegen::FIELD_MAP
            .get(name)
            .and_then(|id| Self::from_type(*id))
    }

    #[inline]
    pub fn descriptor(self) -> &'static FieldDescriptor {
        &FIELDS[self as usize]
    }

    #[inline]
    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    #[inline]
    pub fn len(self) -> usize {
        self.descriptor().len
    }

    #[inline]
    pub fn is_maskable(self) -> bool {
        self.descriptor().maskable
    }

    /// OXM header announcing this field, sized for an exact or masked payload.
    pub fn header(self, has_mask: bool) -> OxmHeader {
        let len = if has_mask { self.len() * 2 } else { self.len() };
        OxmHeader::new(OFPXMC_OPENFLOW_BASIC, self as u8, has_mask, len as u8)
    }

    /// All fields in wire type order.
    pub fn iter() -> impl Iterator<Item = OxmField> {
        FIELDS.iter().map(|d| d.field)
    }
}

impl Display for OxmField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
