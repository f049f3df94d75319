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

//! Implementation of RRset-related data structures and types.

use std::fmt;

use super::{RdataSet, Type};
use crate::class::Class;
use crate::name::Name;
use crate::util::Hex;

////////////////////////////////////////////////////////////////////////
// TTLS                                                               //
////////////////////////////////////////////////////////////////////////

/// The time to live (TTL) of a DNS record.
///
/// [RFC 2181 § 8] clarified that TTL values are unsigned integers
/// between 0 and 2³¹ - 1, inclusive. `Ttl::from(u32)` treats values
/// with the most significant bit set as zero.
///
/// [RFC 2181 § 8]: https://datatracker.ietf.org/doc/html/rfc2181#section-8
#[derive(Clone, Copy, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct Ttl(u32);

impl Ttl {
    /// Returns the TTL in network byte order.
    pub fn to_be_bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }
}

impl From<u32> for Ttl {
    fn from(raw: u32) -> Self {
        if raw > i32::MAX as u32 {
            Self(0)
        } else {
            Self(raw)
        }
    }
}

impl From<Ttl> for u32 {
    fn from(ttl: Ttl) -> Self {
        ttl.0
    }
}

impl fmt::Debug for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

////////////////////////////////////////////////////////////////////////
// RRSETS                                                             //
////////////////////////////////////////////////////////////////////////

/// A resource record set.
///
/// [RFC 2181 § 5] defined an RRset as a group of records with the same
/// label, class, and type, and also stipulated that all records in an
/// RRset have the same TTL. DNSSEC signs whole RRsets, so both the zone
/// and the changesets exchanged with the signing engine store records
/// grouped this way.
///
/// [RFC 2181 § 5]: https://datatracker.ietf.org/doc/html/rfc2181#section-5
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Rrset {
    pub owner: Name,
    pub rr_type: Type,
    pub class: Class,
    pub ttl: Ttl,
    pub rdatas: RdataSet,
}

impl Rrset {
    /// Creates a new [`Rrset`] containing no record data.
    pub fn new(owner: Name, rr_type: Type, class: Class, ttl: Ttl) -> Self {
        Self {
            owner,
            rr_type,
            class,
            ttl,
            rdatas: RdataSet::new(),
        }
    }

    /// Creates a new [`Rrset`] containing a single record.
    pub fn with_rdata(owner: Name, rr_type: Type, class: Class, ttl: Ttl, rdata: &[u8]) -> Self {
        let mut rrset = Self::new(owner, rr_type, class, ttl);
        rrset.rdatas.insert(rdata);
        rrset
    }

    /// Creates an empty [`Rrset`] with the same owner, type, class, and
    /// TTL as `other`.
    pub fn init_from(other: &Rrset) -> Self {
        Self::new(other.owner.clone(), other.rr_type, other.class, other.ttl)
    }

    /// Adds an RDATA, returning whether it was not already present.
    pub fn add_rdata(&mut self, rdata: &[u8]) -> bool {
        self.rdatas.insert(rdata)
    }

    pub fn is_empty(&self) -> bool {
        self.rdatas.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rdatas.len()
    }
}

/// Displays the RRset one record per line, in presentation format with
/// RFC 3597 generic RDATA.
impl fmt::Display for Rrset {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, rdata) in self.rdatas.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(
                f,
                "{} {} {} {} \\# {} {}",
                self.owner,
                self.ttl,
                self.class,
                self.rr_type,
                rdata.len(),
                Hex(rdata),
            )?;
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
