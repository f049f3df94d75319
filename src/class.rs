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

//! Implementation of the [`Class`] type for DNS classes.

use std::fmt;
use std::str::FromStr;

use crate::util::Caseless;

/// Represents a class in the DNS.
///
/// Signed zones are almost always of class [`IN`](Class::IN), but the
/// class of the zone's records flows into the signed data of every
/// RRSIG (RFC 4034 § 3.1.8.1), so it is carried through faithfully.
#[derive(Clone, Copy, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct Class(u16);

impl Class {
    // RFC 1035.
    pub const IN: Self = Self(1);
    pub const CH: Self = Self(3);
    pub const HS: Self = Self(4);

    /// Returns the class's value in network byte order, ready to be
    /// placed into signed data.
    pub fn to_be_bytes(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }
}

impl From<u16> for Class {
    fn from(value: u16) -> Self {
        Class(value)
    }
}

impl From<Class> for u16 {
    fn from(class: Class) -> Self {
        class.0
    }
}

impl FromStr for Class {
    type Err = &'static str;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match Caseless(text) {
            Caseless("IN") => Ok(Self::IN),
            Caseless("CH") => Ok(Self::CH),
            Caseless("HS") => Ok(Self::HS),
            _ => match text.get(0..5) {
                Some(prefix) if prefix.eq_ignore_ascii_case("CLASS") => text[5..]
                    .parse::<u16>()
                    .map(Self::from)
                    .or(Err("class value is not a valid unsigned 16-bit integer")),
                _ => Err("unknown class"),
            },
        }
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", *self)
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::IN => f.write_str("IN"),
            Self::CH => f.write_str("CH"),
            Self::HS => f.write_str("HS"),
            Self(value) => write!(f, "CLASS{}", value), // RFC 3597 § 5
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::Class;

    #[test]
    fn round_trips_through_text() {
        for text in ["IN", "CH", "HS", "CLASS65280"] {
            let class: Class = text.parse().unwrap();
            assert_eq!(class.to_string(), text);
        }
        assert_eq!("in".parse::<Class>().unwrap(), Class::IN);
        assert_eq!("CLASS1".parse::<Class>().unwrap(), Class::IN);
    }

    #[test]
    fn rejects_garbage() {
        assert!("CLASSX".parse::<Class>().is_err());
        assert!("XYZZY".parse::<Class>().is_err());
        assert!("CLASS65536".parse::<Class>().is_err());
    }

    #[test]
    fn wire_bytes_are_big_endian() {
        assert_eq!(Class::IN.to_be_bytes(), [0, 1]);
    }
}
