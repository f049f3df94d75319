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

//! Parsing of RDATA in presentation format.
//!
//! Each record type has its own textual format; in addition, RFC 3597
//! § 5 allows the RDATA of *any* type to be given in the generic form
//! `\# <length> <hex digits>`. RDATA entered generically for a type we
//! understand is validated against that type. Types without a textual
//! format here must use the generic form.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use super::{soa, Type, MAX_RDATA_LEN};
use crate::class::Class;
use crate::name::{self, Name};
use crate::util::decode_hex;

/// Parses `text` as RDATA of type `rr_type` in class `class`.
pub fn parse_rdata(rr_type: Type, class: Class, text: &str) -> Result<Vec<u8>, ParseRdataError> {
    let fields = split_fields(text)?;
    if fields.first().map(String::as_str) == Some("\\#") {
        let rdata = parse_generic(&fields[1..])?;
        return if is_valid_for_type(rr_type, class, &rdata) {
            Ok(rdata)
        } else {
            Err(ParseRdataError::InvalidForType)
        };
    }

    let mut fields = Fields(fields.into_iter());
    let rdata = match rr_type {
        Type::NS | Type::CNAME | Type::PTR => fields.name()?.wire_repr().to_vec(),
        Type::A if class == Class::IN => fields.parse::<Ipv4Addr>("IPv4 address")?.octets().to_vec(),
        Type::AAAA if class == Class::IN => {
            fields.parse::<Ipv6Addr>("IPv6 address")?.octets().to_vec()
        }
        Type::MX => {
            let preference: u16 = fields.parse("preference")?;
            let mut rdata = preference.to_be_bytes().to_vec();
            rdata.extend_from_slice(fields.name()?.wire_repr());
            rdata
        }
        Type::SOA => {
            let mname = fields.name()?;
            let rname = fields.name()?;
            let mut numbers = [0; 5];
            for number in &mut numbers {
                *number = fields.parse("32-bit integer")?;
            }
            soa::compose(&mname, &rname, numbers)
        }
        Type::TXT => return parse_txt(fields.0),
        _ => return Err(ParseRdataError::GenericFormRequired),
    };
    fields.finish()?;
    Ok(rdata)
}

/// Parses the fields following `\#`.
fn parse_generic(fields: &[String]) -> Result<Vec<u8>, ParseRdataError> {
    let len: usize = fields
        .first()
        .ok_or(ParseRdataError::Expected("RDATA length"))?
        .parse()
        .map_err(|_| ParseRdataError::Invalid("RDATA length"))?;
    if len > MAX_RDATA_LEN {
        return Err(ParseRdataError::Invalid("RDATA length"));
    }
    let rdata = decode_hex(&fields[1..].concat()).ok_or(ParseRdataError::Invalid("hex RDATA"))?;
    if rdata.len() == len {
        Ok(rdata)
    } else {
        Err(ParseRdataError::LengthMismatch)
    }
}

fn parse_txt(fields: impl Iterator<Item = String>) -> Result<Vec<u8>, ParseRdataError> {
    let mut rdata = Vec::new();
    for string in fields {
        let len = u8::try_from(string.len()).map_err(|_| ParseRdataError::TooLong)?;
        rdata.push(len);
        rdata.extend_from_slice(string.as_bytes());
    }
    if rdata.is_empty() {
        Err(ParseRdataError::Expected("character string"))
    } else if rdata.len() > MAX_RDATA_LEN {
        Err(ParseRdataError::TooLong)
    } else {
        Ok(rdata)
    }
}

fn is_valid_for_type(rr_type: Type, class: Class, rdata: &[u8]) -> bool {
    match rr_type {
        Type::NS | Type::CNAME | Type::PTR => Name::from_wire_all(rdata).is_ok(),
        Type::A if class == Class::IN => rdata.len() == 4,
        Type::AAAA if class == Class::IN => rdata.len() == 16,
        Type::SOA => soa::serial(rdata).is_ok(),
        _ => true,
    }
}

/// Splits `text` into whitespace-separated fields. A field may be put
/// in double quotes to include whitespace; within quotes, `\"` and `\\`
/// stand for themselves.
fn split_fields(text: &str) -> Result<Vec<String>, ParseRdataError> {
    let mut fields = Vec::new();
    let mut chars = text.chars().peekable();
    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let first = match chars.next() {
            Some(c) => c,
            None => return Ok(fields),
        };

        let mut field = String::new();
        if first == '"' {
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some('\\') => field.push(chars.next().ok_or(ParseRdataError::UnterminatedQuote)?),
                    Some(c) => field.push(c),
                    None => return Err(ParseRdataError::UnterminatedQuote),
                }
            }
        } else {
            field.push(first);
            while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                field.push(c);
            }
        }
        fields.push(field);
    }
}

/// The fields of typed RDATA, consumed front to back.
struct Fields(std::vec::IntoIter<String>);

impl Fields {
    fn next(&mut self, what: &'static str) -> Result<String, ParseRdataError> {
        self.0.next().ok_or(ParseRdataError::Expected(what))
    }

    fn parse<T: std::str::FromStr>(&mut self, what: &'static str) -> Result<T, ParseRdataError> {
        self.next(what)?
            .parse()
            .map_err(|_| ParseRdataError::Invalid(what))
    }

    fn name(&mut self) -> Result<Name, ParseRdataError> {
        self.next("domain name")?.parse().map_err(ParseRdataError::Name)
    }

    fn finish(mut self) -> Result<(), ParseRdataError> {
        match self.0.next() {
            Some(_) => Err(ParseRdataError::TrailingFields),
            None => Ok(()),
        }
    }
}

/// An error signaling that RDATA text could not be parsed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParseRdataError {
    Expected(&'static str),
    Invalid(&'static str),
    Name(name::Error),
    TrailingFields,
    UnterminatedQuote,
    LengthMismatch,
    TooLong,
    InvalidForType,
    GenericFormRequired,
}

impl fmt::Display for ParseRdataError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Expected(what) => write!(f, "expected {}", what),
            Self::Invalid(what) => write!(f, "invalid {}", what),
            Self::Name(e) => write!(f, "invalid domain name: {}", e),
            Self::TrailingFields => f.write_str("unexpected trailing fields"),
            Self::UnterminatedQuote => f.write_str("unterminated quoted string"),
            Self::LengthMismatch => f.write_str("RDATA length does not match the hex data"),
            Self::TooLong => f.write_str("RDATA is too long"),
            Self::InvalidForType => f.write_str("RDATA is invalid for the record type"),
            Self::GenericFormRequired => {
                f.write_str("the \\# format is required for this record type")
            }
        }
    }
}

impl std::error::Error for ParseRdataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Name(e) => Some(e),
            _ => None,
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_rdata_parses() {
        assert_eq!(
            parse_rdata(Type::A, Class::IN, "192.0.2.1").unwrap(),
            [192, 0, 2, 1]
        );
        assert_eq!(
            parse_rdata(Type::MX, Class::IN, "10 mail.quandary.test.").unwrap(),
            b"\x00\x0a\x04mail\x08quandary\x04test\x00"
        );
        assert_eq!(
            parse_rdata(Type::TXT, Class::IN, r#""hello world" x"#).unwrap(),
            b"\x0bhello world\x01x"
        );
        let soa = parse_rdata(Type::SOA, Class::IN, "ns. host. 2023 1 2 3 4").unwrap();
        assert_eq!(soa::serial(&soa).unwrap(), 2023);
    }

    #[test]
    fn generic_rdata_parses_and_is_validated() {
        assert_eq!(
            parse_rdata(Type::DS, Class::IN, "\\# 3 0a0b 0c").unwrap(),
            [0x0a, 0x0b, 0x0c]
        );
        assert!(parse_rdata(Type::NSEC, Class::IN, "\\# 0").unwrap().is_empty());
        assert_eq!(
            parse_rdata(Type::A, Class::IN, "\\# 4 c0000201").unwrap(),
            [192, 0, 2, 1]
        );
        assert_eq!(
            parse_rdata(Type::A, Class::IN, "\\# 3 c00002"),
            Err(ParseRdataError::InvalidForType)
        );
        assert_eq!(
            parse_rdata(Type::DS, Class::IN, "\\# 2 0a"),
            Err(ParseRdataError::LengthMismatch)
        );
    }

    #[test]
    fn malformed_rdata_is_rejected() {
        assert_eq!(
            parse_rdata(Type::A, Class::IN, "192.0.2.1 extra"),
            Err(ParseRdataError::TrailingFields)
        );
        assert_eq!(
            parse_rdata(Type::A, Class::IN, "banana"),
            Err(ParseRdataError::Invalid("IPv4 address"))
        );
        assert_eq!(
            parse_rdata(Type::DS, Class::IN, "1 2 3 abcd"),
            Err(ParseRdataError::GenericFormRequired)
        );
        assert_eq!(
            parse_rdata(Type::TXT, Class::IN, "\"open"),
            Err(ParseRdataError::UnterminatedQuote)
        );
    }
}
