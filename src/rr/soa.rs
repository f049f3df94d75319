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

//! Helpers for SOA record data.

use super::ReadRdataError;
use crate::name::Name;

/// Finds the offset of the SERIAL field, which follows the MNAME and
/// RNAME fields.
fn serial_offset(rdata: &[u8]) -> Result<usize, ReadRdataError> {
    let (_, mname_len) = Name::from_wire(rdata)?;
    let (_, rname_len) = Name::from_wire(&rdata[mname_len..])?;
    let offset = mname_len + rname_len;
    match rdata.len().checked_sub(offset) {
        Some(20) => Ok(offset),
        Some(n) if n < 20 => Err(ReadRdataError::UnexpectedEom),
        _ => Err(ReadRdataError::TrailingData),
    }
}

/// Reads the serial number from SOA RDATA.
pub fn serial(rdata: &[u8]) -> Result<u32, ReadRdataError> {
    let offset = serial_offset(rdata)?;
    Ok(u32::from_be_bytes([
        rdata[offset],
        rdata[offset + 1],
        rdata[offset + 2],
        rdata[offset + 3],
    ]))
}

/// Returns a copy of the SOA RDATA with its serial replaced.
pub fn with_serial(rdata: &[u8], serial: u32) -> Result<Vec<u8>, ReadRdataError> {
    let offset = serial_offset(rdata)?;
    let mut out = rdata.to_vec();
    out[offset..offset + 4].copy_from_slice(&serial.to_be_bytes());
    Ok(out)
}

/// Returns the serial that follows `serial` in [RFC 1982] serial number
/// arithmetic.
///
/// [RFC 1982]: https://datatracker.ietf.org/doc/html/rfc1982
pub fn next_serial(serial: u32) -> u32 {
    serial.wrapping_add(1)
}

/// Reads the MINIMUM field (the negative caching TTL).
pub fn minimum(rdata: &[u8]) -> Result<u32, ReadRdataError> {
    let offset = serial_offset(rdata)? + 16;
    Ok(u32::from_be_bytes([
        rdata[offset],
        rdata[offset + 1],
        rdata[offset + 2],
        rdata[offset + 3],
    ]))
}

/// Composes SOA RDATA from its fields.
pub fn compose(mname: &Name, rname: &Name, fields: [u32; 5]) -> Vec<u8> {
    let mut out = Vec::with_capacity(mname.wire_repr().len() + rname.wire_repr().len() + 20);
    out.extend_from_slice(mname.wire_repr());
    out.extend_from_slice(rname.wire_repr());
    for field in fields {
        out.extend_from_slice(&field.to_be_bytes());
    }
    out
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        compose(
            &"ns1.quandary.test.".parse().unwrap(),
            &"hostmaster.quandary.test.".parse().unwrap(),
            [2022010101, 7200, 3600, 1209600, 300],
        )
    }

    #[test]
    fn serial_works() {
        let rdata = sample();
        assert_eq!(serial(&rdata), Ok(2022010101));
        assert_eq!(minimum(&rdata), Ok(300));
        let bumped = with_serial(&rdata, next_serial(2022010101)).unwrap();
        assert_eq!(serial(&bumped), Ok(2022010102));
        assert_eq!(bumped.len(), rdata.len());
    }

    #[test]
    fn next_serial_wraps() {
        assert_eq!(next_serial(u32::MAX), 0);
    }

    #[test]
    fn malformed_soa_is_rejected() {
        let mut rdata = sample();
        rdata.pop();
        assert_eq!(serial(&rdata), Err(ReadRdataError::UnexpectedEom));
        rdata.extend_from_slice(&[0, 0]);
        assert_eq!(serial(&rdata), Err(ReadRdataError::TrailingData));
    }
}
