//! Text syntax for matches, as used in logs, fixtures and tooling.
//!
//! ```text
//! match      := "*" | constraint ((","|" ") constraint)*
//! constraint := name "=" value ["/" mask]
//! value      := decimal | 0x<hex> | a.b.c.d | xx:xx:xx:xx:xx:xx | ipv6
//! mask       := value | prefix-length      (prefix length after an address)
//! ```
//!
//! The output of `Display for Match` parses back to an equal match.
use std::{net::Ipv6Addr, str::FromStr};

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{map, opt, value},
    error::{FromExternalError, ParseError},
    multi::separated_list0,
    sequence::{delimited, preceded, separated_pair, tuple},
    IResult,
};

use oxmatch_core::{r#match::field::OxmField, r#match::Match, OxmError, OxmResult};

use crate::{
    basic::parser::{parse_digits, parse_hex_bytes, parse_ipv4_dotted, parse_mac},
    error::fail,
    MatchParser,
};

/// `name=value[/mask]` list separated by commas or whitespace.
#[derive(Copy, Clone, Debug, Default)]
pub struct TextFormat;

type Constraint<'x> = (&'x str, &'x str, Option<&'x str>);

fn is_name(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_value(c: char) -> bool {
    c.is_ascii_hexdigit() || matches!(c, ':' | '.' | 'x' | 'X')
}

fn constraint<'x, E: ParseError<&'x str>>(input: &'x str) -> IResult<&'x str, Constraint<'x>, E> {
    map(
        tuple((
            separated_pair(take_while1(is_name), char('='), take_while1(is_value)),
            opt(preceded(char('/'), take_while1(is_value))),
        )),
        |((name, v), m)| (name, v, m),
    )(input)
}

fn separator<'x, E: ParseError<&'x str>>(input: &'x str) -> IResult<&'x str, (), E> {
    alt((
        value((), delimited(multispace0, char(','), multispace0)),
        value((), multispace1),
    ))(input)
}

fn bad(field: OxmField, token: &str, reason: &str) -> OxmError {
    OxmError::BadValue {
        field: field.name().to_string(),
        reason: format!("{:?}: {}", token, reason),
    }
}

/// Left-pads `raw` to the field width; leading bytes past the width must be zero.
fn fit(field: OxmField, raw: &[u8], token: &str) -> OxmResult<Vec<u8>> {
    let len = field.len();
    let skip = raw.len().saturating_sub(len);
    if raw[..skip].iter().any(|b| *b != 0) {
        return Err(bad(field, token, "too wide for field"));
    }
    let kept = &raw[skip..];
    let mut out = vec![0u8; len];
    out[len - kept.len()..].copy_from_slice(kept);
    Ok(out)
}

fn whole<T>(r: IResult<&str, T>) -> Option<T> {
    match r {
        Ok(("", t)) => Some(t),
        _ => None,
    }
}

/// Raw big-endian bytes of a value token, and whether it was an address literal.
fn token_bytes(field: OxmField, token: &str) -> OxmResult<(Vec<u8>, bool)> {
    if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        return whole(parse_hex_bytes(hex))
            .map(|b| (b, false))
            .ok_or_else(|| bad(field, token, "bad hex"));
    }
    if token.contains(':') {
        if let Some(mac) = whole(parse_mac(token)) {
            return Ok((mac.to_vec(), true));
        }
        return Ipv6Addr::from_str(token)
            .map(|a| (a.octets().to_vec(), true))
            .map_err(|_| bad(field, token, "bad address"));
    }
    if token.contains('.') {
        return whole(parse_ipv4_dotted(token))
            .map(|a| (a.to_vec(), true))
            .ok_or_else(|| bad(field, token, "bad address"));
    }
    let digits = whole(parse_digits(token)).ok_or_else(|| bad(field, token, "not a number"))?;
    digits
        .parse::<u128>()
        .map(|n| (n.to_be_bytes().to_vec(), false))
        .map_err(|_| bad(field, token, "number out of range"))
}

fn prefix_mask(field: OxmField, bits: &str) -> OxmResult<Vec<u8>> {
    let width = field.len() * 8;
    let n: usize = bits
        .parse()
        .map_err(|_| bad(field, bits, "bad prefix length"))?;
    if n > width {
        return Err(bad(field, bits, "prefix longer than field"));
    }
    let mut out = vec![0u8; field.len()];
    for (i, byte) in out.iter_mut().enumerate() {
        let ones = n.saturating_sub(i * 8).min(8);
        *byte = (0xff00u16 >> ones) as u8;
    }
    Ok(out)
}

/// Applies one textual constraint to `m`.
pub fn apply(m: &mut Match, (name, val, mask): Constraint) -> OxmResult<()> {
    let field = OxmField::from_name(name).ok_or_else(|| OxmError::BadValue {
        field: name.to_string(),
        reason: "unknown field".to_string(),
    })?;
    let (raw, is_addr) = token_bytes(field, val)?;
    let value_bytes = fit(field, &raw, val)?;
    let mask_bytes = match mask {
        None => None,
        Some(bits) if is_addr && bits.bytes().all(|b| b.is_ascii_digit()) => {
            Some(prefix_mask(field, bits)?)
        }
        Some(mask) => {
            let (raw, _) = token_bytes(field, mask)?;
            Some(fit(field, &raw, mask)?)
        }
    };
    m.set_bytes(field, &value_bytes, mask_bytes.as_deref())?;
    Ok(())
}

impl MatchParser for TextFormat {
    fn _parse<'x, E>(&self, input: &'x str) -> IResult<&'x str, Match, E>
    where
        E: ParseError<&'x str> + FromExternalError<&'x str, OxmError>,
    {
        let (rest, constraints) = delimited(
            multispace0,
            alt((
                value(vec![], tag("*")),
                separated_list0(separator, constraint),
            )),
            multispace0,
        )(input)?;
        let mut m = Match::new();
        for c in constraints {
            apply(&mut m, c).map_err(|e| fail(input, e))?;
        }
        Ok((rest, m))
    }
}

/// Parses a whole string with [TextFormat].
pub fn parse_match(input: &str) -> OxmResult<Match> {
    TextFormat.parse(input)
}
