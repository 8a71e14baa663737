//! # oxmatch
//!
//! Match and classification core of a software OpenFlow switch: the OXM field
//! registry and [Match](crate::core::r#match::Match) value ([core](crate::core)), OXM wire and text
//! codecs ([oxm](crate::oxm)) and the flow match table ([table](crate::table)).
//!
//! ## Example
//! ```
//! use oxmatch::prelude::*;
//!
//! let mut table = MatchTable::new();
//! let rule = parse_match("eth_type=0x0800,ipv4_dst=10.0.0.0/8").unwrap();
//! table.insert(rule, 100, "to-core").unwrap();
//!
//! // a packet as it arrives in a PACKET_OUT or from the datapath, in OXM form
//! let mut pkt = Match::new();
//! pkt.set(OxmField::EthType, 0x0800u16)
//!     .set(OxmField::Ipv4Dst, 0x0a01_0101u32);
//! let mut wire = Vec::new();
//! encode_ofp_match(&pkt, &mut wire);
//!
//! let (_, decoded) = OfpMatchFormat.decode(&wire).unwrap();
//! assert_eq!(table.lookup(&decoded), Some(&"to-core"));
//! ```
pub use oxmatch_core as core;
pub use oxmatch_oxm as oxm;
pub use oxmatch_table as table;

#[allow(missing_docs)]
pub mod prelude {
    #[doc(hidden)]
    pub use oxmatch_core::prelude::*;
    #[doc(hidden)]
    pub use oxmatch_oxm::prelude::*;
    #[doc(hidden)]
    pub use oxmatch_table::prelude::*;
}
