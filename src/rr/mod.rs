// Copyright 2021 Matthew Ingwersen.
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

//! Data structures and routines for handling DNS resource record data.
//!
//! Record data is generally treated as opaque octets. The exceptions
//! are the few types the signing engine has to look inside: RRSIG (see
//! [`rrsig`]), SOA (see [`soa`]), and DNSKEY/DS (see [`dnskey`]).

use std::fmt;

pub mod dnskey;
mod rdata_set;
pub mod rrsig;
mod rr_type;
mod rrset;
pub mod soa;
mod text;
pub use rdata_set::RdataSet;
pub use rr_type::Type;
pub use rrset::{Rrset, Ttl};
pub use rrsig::Rrsig;
pub use text::{parse_rdata, ParseRdataError};

/// The maximum length of a single RDATA, as imposed by the 16-bit
/// RDLENGTH field.
pub const MAX_RDATA_LEN: usize = u16::MAX as usize;

/// An error signaling that RDATA of a structured type could not be
/// read.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ReadRdataError {
    /// The RDATA ended before all of its fields were read.
    UnexpectedEom,

    /// An embedded domain name was invalid.
    InvalidName(crate::name::Error),

    /// Octets remained after all fields were read.
    TrailingData,
}

impl fmt::Display for ReadRdataError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::UnexpectedEom => f.write_str("unexpected end of RDATA"),
            Self::InvalidName(e) => write!(f, "invalid embedded name: {}", e),
            Self::TrailingData => f.write_str("trailing data after RDATA fields"),
        }
    }
}

impl std::error::Error for ReadRdataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidName(e) => Some(e),
            _ => None,
        }
    }
}

impl From<crate::name::Error> for ReadRdataError {
    fn from(e: crate::name::Error) -> Self {
        match e {
            crate::name::Error::UnexpectedEom => Self::UnexpectedEom,
            e => Self::InvalidName(e),
        }
    }
}
