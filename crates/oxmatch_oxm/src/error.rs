use std::fmt::Debug;

use nom::error::{ErrorKind, FromExternalError, ParseError};
use oxmatch_core::OxmError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeErrorKind {
    #[error("{0:?}")]
    Nom(ErrorKind),
    #[error(transparent)]
    Oxm(OxmError),
}

/// Parser error carrying either a grammar failure or the [OxmError] that stopped a
/// well-framed but invalid input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}")]
pub struct DecodeError<I> {
    pub kind: DecodeErrorKind,
    pub input: I,
}

impl<I> DecodeError<I> {
    pub fn oxm(input: I, err: OxmError) -> Self {
        DecodeError {
            kind: DecodeErrorKind::Oxm(err),
            input,
        }
    }
}

impl<I> ParseError<I> for DecodeError<I> {
    fn from_error_kind(input: I, kind: ErrorKind) -> Self {
        DecodeError {
            kind: DecodeErrorKind::Nom(kind),
            input,
        }
    }

    fn append(_: I, _: ErrorKind, other: Self) -> Self {
        other
    }
}

impl<I> FromExternalError<I, OxmError> for DecodeError<I> {
    fn from_external_error(input: I, _: ErrorKind, e: OxmError) -> Self {
        Self::oxm(input, e)
    }
}

impl<I: Debug> From<DecodeError<I>> for OxmError {
    fn from(e: DecodeError<I>) -> Self {
        match e.kind {
            DecodeErrorKind::Oxm(e) => e,
            DecodeErrorKind::Nom(kind) => {
                OxmError::Syntax(format!("{} near {:?}", kind.description(), e.input))
            }
        }
    }
}

/// Lifts an [OxmError] into a non-recoverable nom error at `input`.
pub(crate) fn fail<I, E>(input: I, e: OxmError) -> nom::Err<E>
where
    E: FromExternalError<I, OxmError>,
{
    nom::Err::Failure(E::from_external_error(input, ErrorKind::Verify, e))
}
