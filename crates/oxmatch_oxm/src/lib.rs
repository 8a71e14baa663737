//! This crate provides OXM match-list decoding and encoding: the binary TLV list, the
//! padded `ofp_match` envelope that carries it in OpenFlow messages, and a text syntax
//! for fixtures and logs.
mod error;
pub mod list;
pub mod text;
pub mod wire;

use nom::{
    error::{FromExternalError, ParseError},
    Finish, IResult,
};
use tracing::debug;

use oxmatch_core::{r#match::Match, OxmError, OxmResult};

pub use error::{DecodeError, DecodeErrorKind};
pub use list::OxmList;
pub use text::{parse_match, TextFormat};
pub use wire::{
    encode_ofp_match, encode_oxm_list, ofp_match_len, OfpMatchFormat, OxmListFormat, OFPMT_OXM,
};

/// A binary format a [Match] can be decoded from.
///
/// Implementors write the nom parser `_decode`; `decode` drives it to completion and
/// turns whatever stopped it into an [OxmError]. A failed decode never yields a
/// partially populated match.
pub trait MatchDecoder {
    // Required method
    fn _decode<'x, E>(&self, input: &'x [u8]) -> IResult<&'x [u8], Match, E>
    where
        E: ParseError<&'x [u8]> + FromExternalError<&'x [u8], OxmError>;

    // Provided method

    /// Decodes one match from the front of `input`, returning the unconsumed rest.
    fn decode<'x>(&self, input: &'x [u8]) -> OxmResult<(&'x [u8], Match)> {
        match self._decode::<DecodeError<&'x [u8]>>(input).finish() {
            Ok(res) => Ok(res),
            Err(e) => {
                let e = OxmError::from(e);
                debug!(error = %e, len = input.len(), "rejected OXM match");
                Err(e)
            }
        }
    }
}

/// A text format a [Match] can be parsed from.
pub trait MatchParser {
    // Required method
    fn _parse<'x, E>(&self, input: &'x str) -> IResult<&'x str, Match, E>
    where
        E: ParseError<&'x str> + FromExternalError<&'x str, OxmError>;

    // Provided method

    /// Parses the whole of `input`; trailing garbage is a syntax error.
    fn parse(&self, input: &str) -> OxmResult<Match> {
        let res = self
            ._parse::<DecodeError<&str>>(input)
            .finish()
            .map_err(OxmError::from)
            .and_then(|(rest, m)| match rest {
                "" => Ok(m),
                rest => Err(OxmError::Syntax(format!("unexpected {:?}", rest))),
            });
        if let Err(e) = &res {
            debug!(error = %e, input, "rejected match text");
        }
        res
    }
}

/// Basics for io
pub mod basic {
    /// Basic helper functions for parsing
    pub mod parser {
        use nom::{
            bytes::complete::take_while_m_n,
            character::complete::{char, digit1, hex_digit1},
            combinator::{map, verify},
            error::{ErrorKind, ParseError},
            multi::separated_list1,
            sequence::tuple,
            Err::Error,
            IResult,
        };

        /// r"[0-9]+"
        pub fn parse_digits<'a, E: ParseError<&'a str>>(
            input: &'a str,
        ) -> IResult<&'a str, &'a str, E> {
            digit1(input)
        }

        /// r"[<=255].[<=255].[<=255].[<=255]"
        pub fn parse_ipv4_dotted<'a, E: ParseError<&'a str>>(
            input: &'a str,
        ) -> IResult<&'a str, [u8; 4], E> {
            fn parse_u8<'a, E: ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, u8, E> {
                let (rest, num) = digit1(input)?;
                if let Ok(num) = num.parse::<u8>() {
                    Ok((rest, num))
                } else {
                    Err(Error(E::from_error_kind(input, ErrorKind::Digit)))
                }
            }

            let (rest, (o1, _, o2, _, o3, _, o4)) = tuple((
                parse_u8,
                char('.'),
                parse_u8,
                char('.'),
                parse_u8,
                char('.'),
                parse_u8,
            ))(input)?;
            Ok((rest, [o1, o2, o3, o4]))
        }

        /// r"[0-9a-fA-F]+", big-endian, an odd digit count is left-padded with 0
        pub fn parse_hex_bytes<'a, E: ParseError<&'a str>>(
            input: &'a str,
        ) -> IResult<&'a str, Vec<u8>, E> {
            let (rest, digits) = hex_digit1(input)?;
            let digits = digits.as_bytes();
            let head = digits.len() % 2;
            let mut out = Vec::with_capacity(digits.len() / 2 + head);
            let nibble = |c: u8| (c as char).to_digit(16).unwrap_or(0) as u8;
            if head == 1 {
                out.push(nibble(digits[0]));
            }
            for pair in digits[head..].chunks(2) {
                out.push((nibble(pair[0]) << 4) | nibble(pair[1]));
            }
            Ok((rest, out))
        }

        /// r"xx:xx:xx:xx:xx:xx"
        pub fn parse_mac<'a, E: ParseError<&'a str>>(
            input: &'a str,
        ) -> IResult<&'a str, [u8; 6], E> {
            let octet = map(
                take_while_m_n(2, 2, |c: char| c.is_ascii_hexdigit()),
                |s: &str| {
                    s.chars()
                        .filter_map(|c| c.to_digit(16))
                        .fold(0u8, |acc, d| (acc << 4) | d as u8)
                },
            );
            let (rest, octets) =
                verify(separated_list1(char(':'), octet), |v: &Vec<u8>| v.len() == 6)(input)?;
            let mut mac = [0u8; 6];
            mac.copy_from_slice(&octets);
            Ok((rest, mac))
        }
    }
}

#[allow(missing_docs)]
pub mod prelude {
    #[doc(hidden)]
    pub use crate::{
        list::OxmList,
        text::{parse_match, TextFormat},
        wire::{
            encode_ofp_match, encode_oxm_list, ofp_match, ofp_match_len, oxm_list, oxm_tlv,
            OfpMatchFormat, OxmListFormat, OFPMT_OXM,
        },
        DecodeError, MatchDecoder, MatchParser,
    };
}
