//! This crate provides the OpenFlow basic-class field registry, the [Match] value and
//! the single-TLV OXM codec every other layer builds on.
//!
//! [Match]: crate::r#match::Match
pub mod error;
pub mod r#match;

pub use error::{OxmError, OxmResult};

#[allow(missing_docs)]
pub mod prelude {
    #[doc(hidden)]
    pub use crate::{
        error::{OxmError, OxmResult},
        r#match::{
            field::{lookup, FieldCodec, FieldDescriptor, OxmField, FIELDS, FIELD_COUNT},
            tlv::{OxmHeader, OxmTlv, OFPXMC_OPENFLOW_BASIC, OXM_HEADER_LEN},
            MaskedValue, Match,
        },
    };
}
