use thiserror::Error;

use crate::r#match::field::OxmField;

/// Errors raised while building a [Match](crate::r#match::Match) or decoding one from OXM.
///
/// Any of these aborts the decode of the enclosing message; a match that failed to
/// decode is never handed out half-populated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OxmError {
    /// The TLV names a class or field type that is not registered.
    #[error("unknown OXM field type: class {class:#06x}, field {field}")]
    UnknownFieldType { class: u16, field: u8 },
    /// The declared payload length is not the exact or doubled canonical length.
    #[error("malformed length for {field}: expected {expected} bytes, got {actual}")]
    MalformedLength {
        field: OxmField,
        expected: usize,
        actual: usize,
    },
    /// The same field appears twice in one match.
    #[error("duplicate OXM field {0}")]
    DuplicateField(OxmField),
    /// A partial mask was supplied for an exact-only field.
    #[error("field {0} does not accept a mask")]
    NotMaskable(OxmField),
    /// The input ends before a declared length is satisfied.
    #[error("truncated input: need {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },
    /// The `ofp_match` envelope carries a match type other than OXM.
    #[error("unsupported match type {0}")]
    BadMatchType(u16),
    /// A textual field value could not be interpreted.
    #[error("bad value for {field}: {reason}")]
    BadValue { field: String, reason: String },
    /// Input that does not follow the expected grammar at all.
    #[error("syntax error: {0}")]
    Syntax(String),
}

pub type OxmResult<T> = Result<T, OxmError>;
