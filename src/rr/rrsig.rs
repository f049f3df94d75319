// Copyright 2022 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Reading and writing of RRSIG record data ([RFC 4034 § 3]).
//!
//! [RFC 4034 § 3]: https://datatracker.ietf.org/doc/html/rfc4034#section-3

use super::{ReadRdataError, Rrset, Type};
use crate::name::Name;

/// The length of the fixed-size fields at the start of RRSIG RDATA
/// (everything before the Signer's Name).
pub const FIXED_LEN: usize = 18;

/// The parsed form of RRSIG RDATA.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Rrsig {
    pub type_covered: Type,
    pub algorithm: u8,
    pub labels: u8,
    pub original_ttl: u32,
    pub expiration: u32,
    pub inception: u32,
    pub key_tag: u16,
    pub signer: Name,
    pub signature: Box<[u8]>,
}

impl Rrsig {
    /// Parses RRSIG RDATA.
    pub fn parse(rdata: &[u8]) -> Result<Self, ReadRdataError> {
        let fixed = rdata.get(..FIXED_LEN).ok_or(ReadRdataError::UnexpectedEom)?;
        let (signer, signer_len) = Name::from_wire(&rdata[FIXED_LEN..])?;
        Ok(Self {
            type_covered: u16::from_be_bytes([fixed[0], fixed[1]]).into(),
            algorithm: fixed[2],
            labels: fixed[3],
            original_ttl: u32::from_be_bytes([fixed[4], fixed[5], fixed[6], fixed[7]]),
            expiration: u32::from_be_bytes([fixed[8], fixed[9], fixed[10], fixed[11]]),
            inception: u32::from_be_bytes([fixed[12], fixed[13], fixed[14], fixed[15]]),
            key_tag: u16::from_be_bytes([fixed[16], fixed[17]]),
            signer,
            signature: rdata[FIXED_LEN + signer_len..].into(),
        })
    }

    /// Serializes the RDATA up to (but not including) the signature,
    /// with the signer's name in canonical form. This is the RRSIG part
    /// of the signed data defined in [RFC 4034 § 3.1.8.1].
    ///
    /// [RFC 4034 § 3.1.8.1]: https://datatracker.ietf.org/doc/html/rfc4034#section-3.1.8.1
    pub fn compose_unsigned(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(FIXED_LEN + self.signer.wire_repr().len());
        out.extend_from_slice(&self.type_covered.to_be_bytes());
        out.push(self.algorithm);
        out.push(self.labels);
        out.extend_from_slice(&self.original_ttl.to_be_bytes());
        out.extend_from_slice(&self.expiration.to_be_bytes());
        out.extend_from_slice(&self.inception.to_be_bytes());
        out.extend_from_slice(&self.key_tag.to_be_bytes());
        out.extend_from_slice(&self.signer.canonical_wire());
        out
    }

    /// Serializes the complete RDATA.
    pub fn to_rdata(&self) -> Vec<u8> {
        let mut out = self.compose_unsigned();
        out.extend_from_slice(&self.signature);
        out
    }
}

/// Reads the Type Covered field without parsing the rest of the RDATA.
pub fn type_covered_of(rdata: &[u8]) -> Option<Type> {
    rdata
        .get(0..2)
        .map(|octets| u16::from_be_bytes([octets[0], octets[1]]).into())
}

/// Reads the Key Tag field without parsing the rest of the RDATA.
pub fn key_tag_of(rdata: &[u8]) -> Option<u16> {
    rdata
        .get(16..18)
        .map(|octets| u16::from_be_bytes([octets[0], octets[1]]))
}

/// Reads the Signature Expiration field without parsing the rest of the
/// RDATA.
pub fn expiration_of(rdata: &[u8]) -> Option<u32> {
    rdata
        .get(8..12)
        .map(|octets| u32::from_be_bytes([octets[0], octets[1], octets[2], octets[3]]))
}

/// Selects from an RRSIG RRset the signatures that cover `covered`. The
/// result keeps the owner, class, and TTL of `rrsigs`. Returns [`None`]
/// if no signature covers the type.
pub fn synth_rrsig(covered: Type, rrsigs: &Rrset) -> Option<Rrset> {
    let mut out = Rrset::init_from(rrsigs);
    for rdata in rrsigs.rdatas.iter() {
        if type_covered_of(rdata) == Some(covered) {
            out.add_rdata(rdata);
        }
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::Class;
    use crate::rr::Ttl;

    fn sample(type_covered: Type, key_tag: u16) -> Rrsig {
        Rrsig {
            type_covered,
            algorithm: 253,
            labels: 2,
            original_ttl: 3600,
            expiration: 2_000_000,
            inception: 1_000_000,
            key_tag,
            signer: "Quandary.TEST.".parse().unwrap(),
            signature: vec![1, 2, 3].into(),
        }
    }

    #[test]
    fn parse_reads_composed_rdata() {
        let rrsig = sample(Type::SOA, 4242);
        let rdata = rrsig.to_rdata();
        assert_eq!(type_covered_of(&rdata), Some(Type::SOA));
        assert_eq!(key_tag_of(&rdata), Some(4242));
        assert_eq!(expiration_of(&rdata), Some(2_000_000));
        let parsed = Rrsig::parse(&rdata).unwrap();
        assert_eq!(parsed, rrsig);
        assert_eq!(parsed.signer.wire_repr(), b"\x08quandary\x04test\x00");
    }

    #[test]
    fn parse_rejects_truncated_rdata() {
        let rdata = sample(Type::A, 1).to_rdata();
        assert_eq!(
            Rrsig::parse(&rdata[..10]),
            Err(ReadRdataError::UnexpectedEom)
        );
        assert_eq!(
            Rrsig::parse(&rdata[..FIXED_LEN + 3]),
            Err(ReadRdataError::UnexpectedEom)
        );
    }

    #[test]
    fn synth_rrsig_selects_covered_type() {
        let mut rrsigs = Rrset::new(
            "quandary.test.".parse().unwrap(),
            Type::RRSIG,
            Class::IN,
            Ttl::from(3600),
        );
        rrsigs.add_rdata(&sample(Type::SOA, 1).to_rdata());
        rrsigs.add_rdata(&sample(Type::NS, 1).to_rdata());
        rrsigs.add_rdata(&sample(Type::NS, 2).to_rdata());
        let ns = synth_rrsig(Type::NS, &rrsigs).unwrap();
        assert_eq!(ns.len(), 2);
        assert_eq!(ns.rr_type, Type::RRSIG);
        assert!(synth_rrsig(Type::MX, &rrsigs).is_none());
    }
}
