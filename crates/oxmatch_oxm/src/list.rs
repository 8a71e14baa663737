use bytes::{BufMut, Bytes, BytesMut};
use nom::Finish;

use oxmatch_core::{
    r#match::{
        field::{FieldCodec, FIELDS},
        tlv::{OxmHeader, OxmTlv, OXM_HEADER_LEN},
        Match,
    },
    OxmError, OxmResult,
};

use crate::{error::DecodeError, wire::oxm_tlv};

/// Owned OXM TLV list, in the order it was built or received.
///
/// Unlike [Match] the list keeps wire order and does not interpret the fields, so
/// it can carry a list that has not been validated yet. [OxmList::to_match] does
/// the validation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OxmList {
    tlvs: Vec<(OxmHeader, Bytes)>,
}

impl OxmList {
    pub fn new() -> Self {
        Self::default()
    }

    /// One TLV per set field, in wire type order.
    pub fn from_match(m: &Match) -> Self {
        let mut buf = BytesMut::with_capacity(m.length());
        let mut tlvs = Vec::with_capacity(m.field_count());
        for d in FIELDS.iter() {
            let n = d.pack(m, &mut buf);
            if n == 0 {
                continue;
            }
            let mut tlv = buf.split_to(n).freeze();
            let header = OxmHeader(u32::from_be_bytes([tlv[0], tlv[1], tlv[2], tlv[3]]));
            let body = tlv.split_off(OXM_HEADER_LEN);
            tlvs.push((header, body));
        }
        OxmList { tlvs }
    }

    /// Splits a TLV list occupying the whole input. Only framing is checked here.
    pub fn parse(input: &[u8]) -> OxmResult<Self> {
        let mut tlvs = Vec::new();
        let mut rest = input;
        while !rest.is_empty() {
            let (next, tlv) = oxm_tlv::<DecodeError<&[u8]>>(rest)
                .finish()
                .map_err(OxmError::from)?;
            tlvs.push((tlv.header, Bytes::copy_from_slice(tlv.body)));
            rest = next;
        }
        Ok(OxmList { tlvs })
    }

    /// Appends a raw TLV. The body must be exactly as long as the header announces.
    pub fn push(&mut self, header: OxmHeader, body: impl Into<Bytes>) -> OxmResult<()> {
        let body = body.into();
        OxmTlv::new(header, &body)?;
        self.tlvs.push((header, body));
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = OxmTlv<'_>> + '_ {
        self.tlvs
            .iter()
            .map(|(header, body)| OxmTlv {
                header: *header,
                body: &body[..],
            })
    }

    pub fn len(&self) -> usize {
        self.tlvs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tlvs.is_empty()
    }

    /// Total bytes on the wire, no padding.
    pub fn wire_len(&self) -> usize {
        self.iter().map(|t| t.wire_len()).sum()
    }

    pub fn encode<B: BufMut>(&self, dst: &mut B) -> usize {
        for (header, body) in &self.tlvs {
            dst.put_u32(header.0);
            dst.put_slice(body);
        }
        self.wire_len()
    }

    /// Folds the list into a [Match], rejecting it whole on the first bad TLV.
    pub fn to_match(&self) -> OxmResult<Match> {
        let mut m = Match::new();
        for tlv in self.iter() {
            m.assign(&tlv)?;
        }
        Ok(m)
    }
}

impl TryFrom<&OxmList> for Match {
    type Error = OxmError;

    fn try_from(list: &OxmList) -> OxmResult<Match> {
        list.to_match()
    }
}

impl From<&Match> for OxmList {
    fn from(m: &Match) -> Self {
        OxmList::from_match(m)
    }
}
