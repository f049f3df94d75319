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

//! Helpers for DNSKEY, CDNSKEY, and CDS record data ([RFC 4034 § 2],
//! [RFC 7344], [RFC 8078]).
//!
//! [RFC 4034 § 2]: https://datatracker.ietf.org/doc/html/rfc4034#section-2
//! [RFC 7344]: https://datatracker.ietf.org/doc/html/rfc7344
//! [RFC 8078]: https://datatracker.ietf.org/doc/html/rfc8078

/// The Zone Key flag. Set on every key that signs zone data.
pub const FLAG_ZONE: u16 = 0x0100;

/// The Secure Entry Point flag, conventionally set on KSKs.
pub const FLAG_SEP: u16 = 0x0001;

/// The Protocol field value, which must always be 3.
pub const PROTOCOL: u8 = 3;

/// The CDNSKEY RDATA that requests removal of the parent's DS RRset
/// (RFC 8078 § 4): flags 0, protocol 3, algorithm 0, and a one-octet
/// zero public key.
pub const EMPTY_CDNSKEY: [u8; 5] = [0, 0, PROTOCOL, 0, 0];

/// The CDS RDATA counterpart of [`EMPTY_CDNSKEY`]: key tag 0,
/// algorithm 0, digest type 0, and a one-octet zero digest.
pub const EMPTY_CDS: [u8; 5] = [0, 0, 0, 0, 0];

/// Composes DNSKEY (or CDNSKEY) RDATA.
pub fn compose(flags: u16, algorithm: u8, public_key: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + public_key.len());
    out.extend_from_slice(&flags.to_be_bytes());
    out.push(PROTOCOL);
    out.push(algorithm);
    out.extend_from_slice(public_key);
    out
}

/// Reads the Flags field of DNSKEY RDATA.
pub fn flags_of(rdata: &[u8]) -> Option<u16> {
    rdata
        .get(0..2)
        .map(|octets| u16::from_be_bytes([octets[0], octets[1]]))
}

/// Reads the Algorithm field of DNSKEY RDATA.
pub fn algorithm_of(rdata: &[u8]) -> Option<u8> {
    rdata.get(3).copied()
}

/// Computes the key tag of DNSKEY RDATA as specified in [RFC 4034
/// Appendix B].
///
/// [RFC 4034 Appendix B]: https://datatracker.ietf.org/doc/html/rfc4034#appendix-B
pub fn key_tag(rdata: &[u8]) -> u16 {
    if algorithm_of(rdata) == Some(1) {
        // RSA/MD5 keys use the older algorithm of Appendix B.1: the
        // third-to-last and second-to-last octets of the public key.
        return match rdata.len() {
            n if n >= 7 => u16::from_be_bytes([rdata[n - 3], rdata[n - 2]]),
            _ => 0,
        };
    }

    let mut accumulator: u32 = 0;
    for (i, octet) in rdata.iter().enumerate() {
        if i & 1 == 0 {
            accumulator += (*octet as u32) << 8;
        } else {
            accumulator += *octet as u32;
        }
    }
    accumulator += (accumulator >> 16) & 0xffff;
    (accumulator & 0xffff) as u16
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_lays_out_fields() {
        let rdata = compose(FLAG_ZONE | FLAG_SEP, 253, &[0xaa, 0xbb]);
        assert_eq!(rdata, [0x01, 0x01, 3, 253, 0xaa, 0xbb]);
        assert_eq!(flags_of(&rdata), Some(257));
        assert_eq!(algorithm_of(&rdata), Some(253));
    }

    #[test]
    fn key_tag_matches_manual_computation() {
        // Octets summed in pairs: 0x0101 + 0x03fd + 0xaabb = 0xafb9.
        let rdata = compose(FLAG_ZONE | FLAG_SEP, 253, &[0xaa, 0xbb]);
        assert_eq!(key_tag(&rdata), 0xafb9);
    }

    #[test]
    fn key_tag_folds_carry() {
        // 0xffff + 0xffff = 0x1fffe, folded to 0xffff.
        assert_eq!(key_tag(&[0xff, 0xff, 0xff, 0xff]), 0xffff);
    }

    #[test]
    fn sentinels_are_five_octets() {
        assert_eq!(EMPTY_CDNSKEY, [0, 0, 3, 0, 0]);
        assert_eq!(EMPTY_CDS, [0; 5]);
    }
}
