//! Binary OXM: single TLVs, back-to-back TLV lists and the padded `ofp_match` envelope.
use bytes::BufMut;
use nom::{
    bytes::complete::take,
    error::{FromExternalError, ParseError},
    number::complete::{be_u16, be_u32},
    sequence::pair,
    IResult,
};

use oxmatch_core::{
    r#match::{
        tlv::{OxmHeader, OxmTlv, OXM_HEADER_LEN},
        Match,
    },
    OxmError,
};

use crate::{error::fail, MatchDecoder};

/// `OFPMT_STANDARD`, the OpenFlow 1.1 fixed match. Not decoded.
pub const OFPMT_STANDARD: u16 = 0;
/// `OFPMT_OXM`
pub const OFPMT_OXM: u16 = 1;
/// `type` + `length` of `struct ofp_match`.
pub const OFP_MATCH_HEADER_LEN: usize = 4;

/// Rounds `len` up to the next 64-bit boundary.
#[inline]
pub fn pad8(len: usize) -> usize {
    (len + 7) / 8 * 8
}

fn need<'a, E>(input: &'a [u8], needed: usize) -> Result<(), nom::Err<E>>
where
    E: FromExternalError<&'a [u8], OxmError>,
{
    if input.len() < needed {
        Err(fail(
            input,
            OxmError::Truncated {
                needed,
                available: input.len(),
            },
        ))
    } else {
        Ok(())
    }
}

/// One TLV: 4-byte header followed by the payload it announces.
pub fn oxm_tlv<'a, E>(input: &'a [u8]) -> IResult<&'a [u8], OxmTlv<'a>, E>
where
    E: ParseError<&'a [u8]> + FromExternalError<&'a [u8], OxmError>,
{
    need(input, OXM_HEADER_LEN)?;
    let (rest, raw) = be_u32(input)?;
    let header = OxmHeader(raw);
    need(rest, header.length())?;
    let (rest, body) = take(header.length())(rest)?;
    let tlv = OxmTlv::new(header, body).map_err(|e| fail(input, e))?;
    Ok((rest, tlv))
}

/// A TLV list spanning exactly `input`, folded into a [Match].
///
/// Fails on the first TLV that does not decode; no partial match escapes.
pub fn oxm_list<'a, E>(input: &'a [u8]) -> IResult<&'a [u8], Match, E>
where
    E: ParseError<&'a [u8]> + FromExternalError<&'a [u8], OxmError>,
{
    let mut m = Match::new();
    let mut rest = input;
    while !rest.is_empty() {
        let (next, tlv) = oxm_tlv(rest)?;
        m.assign(&tlv).map_err(|e| fail(rest, e))?;
        rest = next;
    }
    Ok((rest, m))
}

/// `struct ofp_match`: type, length, TLV list, zero padding to 8 bytes.
///
/// `length` covers the header and the TLVs but not the padding; the padding is
/// consumed as well.
pub fn ofp_match<'a, E>(input: &'a [u8]) -> IResult<&'a [u8], Match, E>
where
    E: ParseError<&'a [u8]> + FromExternalError<&'a [u8], OxmError>,
{
    need(input, OFP_MATCH_HEADER_LEN)?;
    let (_, (ty, length)) = pair(be_u16, be_u16)(input)?;
    if ty != OFPMT_OXM {
        return Err(fail(input, OxmError::BadMatchType(ty)));
    }
    let length = length as usize;
    if length < OFP_MATCH_HEADER_LEN {
        return Err(fail(
            input,
            OxmError::Truncated {
                needed: OFP_MATCH_HEADER_LEN,
                available: length,
            },
        ));
    }
    let padded = pad8(length);
    need(input, padded)?;
    let (_, m) = oxm_list(&input[OFP_MATCH_HEADER_LEN..length])?;
    Ok((&input[padded..], m))
}

/// Writes `m` as a bare TLV list, returning the bytes written.
pub fn encode_oxm_list<B: BufMut>(m: &Match, dst: &mut B) -> usize {
    m.pack(dst)
}

/// Size of the padded `ofp_match` envelope for `m`.
pub fn ofp_match_len(m: &Match) -> usize {
    pad8(OFP_MATCH_HEADER_LEN + m.length())
}

/// Writes `m` inside an `ofp_match` envelope, returning the bytes written
/// including padding.
pub fn encode_ofp_match<B: BufMut>(m: &Match, dst: &mut B) -> usize {
    let length = OFP_MATCH_HEADER_LEN + m.length();
    dst.put_u16(OFPMT_OXM);
    dst.put_u16(length as u16);
    m.pack(dst);
    let padded = pad8(length);
    dst.put_bytes(0, padded - length);
    padded
}

/// Decodes a bare TLV list occupying the whole input.
#[derive(Copy, Clone, Debug, Default)]
pub struct OxmListFormat;

impl MatchDecoder for OxmListFormat {
    fn _decode<'x, E>(&self, input: &'x [u8]) -> IResult<&'x [u8], Match, E>
    where
        E: ParseError<&'x [u8]> + FromExternalError<&'x [u8], OxmError>,
    {
        oxm_list(input)
    }
}

/// Decodes one padded `ofp_match` envelope from the front of the input.
#[derive(Copy, Clone, Debug, Default)]
pub struct OfpMatchFormat;

impl MatchDecoder for OfpMatchFormat {
    fn _decode<'x, E>(&self, input: &'x [u8]) -> IResult<&'x [u8], Match, E>
    where
        E: ParseError<&'x [u8]> + FromExternalError<&'x [u8], OxmError>,
    {
        ofp_match(input)
    }
}
