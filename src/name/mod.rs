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

//! Implementation of data structures related to domain names.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FusedIterator;
use std::str::FromStr;

use arrayvec::ArrayVec;

mod error;
pub use error::Error;

/// The maximum number of labels in a domain name, including the null
/// label.
const MAX_N_LABELS: usize = 128;

/// The maximum length of the uncompressed on-the-wire representation of
/// a domain name.
const MAX_WIRE_LEN: usize = 255;

/// The maximum length of a label in a domain name (not including the
/// octet that provides the length).
const MAX_LABEL_LEN: usize = 63;

////////////////////////////////////////////////////////////////////////
// NAME STRUCTURE                                                     //
////////////////////////////////////////////////////////////////////////

/// A structure to represent a domain name.
///
/// A `Name` owns the uncompressed on-the-wire representation of a
/// fully-qualified domain name, as defined in [RFC 1035 § 3.1]. The
/// representation is validated on construction, so every `Name` ends
/// in exactly one null label and contains no label longer than 63
/// octets.
///
/// Comparison of `Name`s is ASCII-case-insensitive, and the [`Ord`]
/// implementation gives DNSSEC's canonical ordering. This means a
/// `Name` can be used directly as the key of the ordered zone trees.
///
/// [RFC 1035 § 3.1]: https://datatracker.ietf.org/doc/html/rfc1035#section-3.1
#[derive(Clone)]
pub struct Name {
    wire: Box<[u8]>,
}

impl Name {
    /// Returns the root name.
    pub fn root() -> Self {
        Self {
            wire: Box::new([0]),
        }
    }

    /// Returns whether this is the root name.
    pub fn is_root(&self) -> bool {
        self.wire.len() == 1
    }

    /// Returns whether this is a wildcard name, i.e. whether its
    /// leftmost label is `*`.
    pub fn is_wildcard(&self) -> bool {
        self.wire.starts_with(b"\x01*")
    }

    /// Returns an iterator over the non-null labels of the name, from
    /// left to right.
    pub fn labels(&self) -> Labels {
        Labels::new(self)
    }

    /// Returns the number of non-null labels in the name. The root name
    /// has zero labels.
    pub fn label_count(&self) -> usize {
        self.labels().len()
    }

    /// Returns the value of the Labels field of an RRSIG covering an
    /// RRset owned by this name, per [RFC 4034 § 3.1.3]: the non-null
    /// label count, not counting a leading wildcard label.
    ///
    /// [RFC 4034 § 3.1.3]: https://datatracker.ietf.org/doc/html/rfc4034#section-3.1.3
    pub fn rrsig_labels(&self) -> u8 {
        let count = self.label_count();
        if self.is_wildcard() {
            (count - 1) as u8
        } else {
            count as u8
        }
    }

    /// Returns whether `self` is equal to or a subdomain of `other`.
    pub fn eq_or_subdomain_of(&self, other: &Name) -> bool {
        let n_self = self.label_count();
        let n_other = other.label_count();
        n_self >= n_other
            && self
                .labels()
                .rev()
                .zip(other.labels().rev())
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }

    /// Returns the name obtained by removing the leftmost `skip`
    /// labels, or [`None`] if the name has fewer than `skip` non-null
    /// labels.
    pub fn superdomain(&self, skip: usize) -> Option<Name> {
        let mut offset = 0;
        for _ in 0..skip {
            let len = self.wire[offset] as usize;
            if len == 0 {
                return None;
            }
            offset += len + 1;
        }
        Some(Self {
            wire: self.wire[offset..].into(),
        })
    }

    /// Returns the parent of this name, or [`None`] for the root.
    pub fn parent(&self) -> Option<Name> {
        self.superdomain(1)
    }

    /// Returns the wildcard name `*.<closest>`, where `<closest>` is
    /// formed from the rightmost `n_labels` labels of this name. This
    /// is how the owner name of a wildcard-expanded RRset is restored
    /// when computing signed data (RFC 4035 § 5.3.2).
    pub fn wildcard_ancestor(&self, n_labels: usize) -> Option<Name> {
        let total = self.label_count();
        let closest = self.superdomain(total.checked_sub(n_labels)?)?;
        let mut wire = Vec::with_capacity(closest.wire.len() + 2);
        wire.extend_from_slice(b"\x01*");
        wire.extend_from_slice(&closest.wire);
        if wire.len() > MAX_WIRE_LEN {
            None
        } else {
            Some(Self { wire: wire.into() })
        }
    }

    /// Returns the on-the-wire representation of the name, with the
    /// case of the original input preserved.
    pub fn wire_repr(&self) -> &[u8] {
        &self.wire
    }

    /// Returns the canonical on-the-wire form of the name: all ASCII
    /// letters lowercased, as required by [RFC 4034 § 6.2].
    ///
    /// [RFC 4034 § 6.2]: https://datatracker.ietf.org/doc/html/rfc4034#section-6.2
    pub fn canonical_wire(&self) -> Vec<u8> {
        // Length octets are at most 63 and so are never ASCII letters.
        self.wire.to_ascii_lowercase()
    }

    /// Reads an uncompressed on-the-wire name from the start of
    /// `octets`. On success, the name and the number of octets it
    /// occupied are returned.
    pub fn from_wire(octets: &[u8]) -> Result<(Self, usize), Error> {
        let len = validate_uncompressed(octets)?;
        Ok((
            Self {
                wire: octets[..len].into(),
            },
            len,
        ))
    }

    /// Like [`Name::from_wire`], but requires that the name occupy all
    /// of `octets`.
    pub fn from_wire_all(octets: &[u8]) -> Result<Self, Error> {
        let (name, len) = Self::from_wire(octets)?;
        if len == octets.len() {
            Ok(name)
        } else {
            Err(Error::ExtraData)
        }
    }
}

/// Checks that `octets` begins with a valid uncompressed name, and
/// returns its length.
fn validate_uncompressed(octets: &[u8]) -> Result<usize, Error> {
    let mut offset = 0;
    let mut n_labels = 0;
    loop {
        let len = *octets.get(offset).ok_or(Error::UnexpectedEom)? as usize;
        if len & 0xc0 == 0xc0 {
            return Err(Error::CompressionUnsupported);
        } else if len > MAX_LABEL_LEN {
            return Err(Error::LabelTooLong);
        }
        offset += len + 1;
        n_labels += 1;
        if offset > MAX_WIRE_LEN || n_labels > MAX_N_LABELS {
            return Err(Error::NameTooLong);
        } else if offset > octets.len() {
            return Err(Error::UnexpectedEom);
        } else if len == 0 {
            return Ok(offset);
        }
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_root() {
            return f.write_str(".");
        }
        for label in self.labels() {
            for octet in label {
                if *octet == b'.' {
                    f.write_str("\\.")?;
                } else if *octet == b'\\' {
                    f.write_str("\\\\")?;
                } else if octet.is_ascii_graphic() {
                    write!(f, "{}", *octet as char)?;
                } else {
                    write!(f, "\\{:03}", *octet)?;
                }
            }
            f.write_str(".")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\"{}\"", self)
    }
}

/// In accordance with RFC 1034 § 3.1 (clarified by RFC 4343),
/// comparison of `Name`s is ASCII-case-insensitive.
impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.wire.eq_ignore_ascii_case(&other.wire)
    }
}

impl Eq for Name {}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The [`Ord`] implementation for `Name` employs DNSSEC's canonical
/// ordering of domain names. Per [RFC 4034 § 6.1], `Name`s are ordered
/// as strings of lowercased labels read from right to left.
///
/// [RFC 4034 § 6.1]: https://datatracker.ietf.org/doc/html/rfc4034#section-6.1
impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        self.labels()
            .rev()
            .zip(other.labels().rev())
            .map(|(a, b)| cmp_labels(a, b))
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| self.label_count().cmp(&other.label_count()))
    }
}

fn cmp_labels(a: &[u8], b: &[u8]) -> Ordering {
    a.iter()
        .map(u8::to_ascii_lowercase)
        .cmp(b.iter().map(u8::to_ascii_lowercase))
}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for octet in self.wire.iter() {
            state.write_u8(octet.to_ascii_lowercase());
        }
    }
}

////////////////////////////////////////////////////////////////////////
// ITERATION OVER A NAME'S LABELS                                     //
////////////////////////////////////////////////////////////////////////

/// An iterator over the non-null labels of a [`Name`]. Each label is
/// yielded as the octets it contains, without its length octet.
pub struct Labels<'a> {
    name: &'a Name,
    offsets: ArrayVec<u8, MAX_N_LABELS>,
    front: usize,
    back: usize,
}

impl Labels<'_> {
    fn new(name: &Name) -> Labels {
        let mut offsets = ArrayVec::new();
        let mut offset = 0;
        while name.wire[offset] != 0 {
            offsets.push(offset as u8);
            offset += name.wire[offset] as usize + 1;
        }
        let back = offsets.len();
        Labels {
            name,
            offsets,
            front: 0,
            back,
        }
    }
}

impl<'a> Iterator for Labels<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.front < self.back {
            let offset = self.offsets[self.front] as usize;
            self.front += 1;
            let len = self.name.wire[offset] as usize;
            Some(&self.name.wire[offset + 1..offset + 1 + len])
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl DoubleEndedIterator for Labels<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front < self.back {
            self.back -= 1;
            let offset = self.offsets[self.back] as usize;
            let len = self.name.wire[offset] as usize;
            Some(&self.name.wire[offset + 1..offset + 1 + len])
        } else {
            None
        }
    }
}

impl ExactSizeIterator for Labels<'_> {}

impl FusedIterator for Labels<'_> {}

////////////////////////////////////////////////////////////////////////
// PARSING OF NAMES FROM RUST STRINGS                                 //
////////////////////////////////////////////////////////////////////////

/// Allows for conversion of a Rust [`str`] into a [`Name`]. The passed
/// string must be strictly ASCII and fully qualified (i.e. end in a
/// dot). Escape sequences as defined by [RFC 4343 § 2.1] are supported.
///
/// [RFC 4343 § 2.1]: https://datatracker.ietf.org/doc/html/rfc4343#section-2.1
impl FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(Error::StrEmpty);
        } else if s == "." {
            return Ok(Name::root());
        }

        let mut wire: ArrayVec<u8, MAX_WIRE_LEN> = ArrayVec::new();
        let mut label: ArrayVec<u8, MAX_LABEL_LEN> = ArrayVec::new();
        let mut remaining_octets: &[u8] = s.as_ref();

        // NOTE: to check that the string is ASCII, it suffices to check
        // that each octet is ASCII as we go. This is because all
        // multi-byte characters start with an octet that is not ASCII.
        while let Some(&octet) = remaining_octets.first() {
            if octet == b'.' {
                if label.is_empty() {
                    return Err(Error::NullNonTerminal);
                }
                if wire.remaining_capacity() <= label.len() {
                    return Err(Error::NameTooLong);
                }
                wire.push(label.len() as u8);
                wire.try_extend_from_slice(&label)
                    .or(Err(Error::NameTooLong))?;
                label.clear();
                remaining_octets = &remaining_octets[1..];
                continue;
            }

            let (value, consumed) = if octet == b'\\' {
                let (value, consumed) = parse_escape(&remaining_octets[1..])?;
                (value, consumed + 1)
            } else if !octet.is_ascii() {
                return Err(Error::StrNotAscii);
            } else {
                (octet, 1)
            };
            label.try_push(value).or(Err(Error::LabelTooLong))?;
            remaining_octets = &remaining_octets[consumed..];
        }

        if !label.is_empty() {
            return Err(Error::NotFullyQualified);
        }
        wire.try_push(0).or(Err(Error::NameTooLong))?;
        Ok(Self {
            wire: wire.as_slice().into(),
        })
    }
}

/// Parses an escape sequence. We expect `remaining_octets` to start
/// with the octet immediately *after* the backslash that introduces the
/// escape sequence.
fn parse_escape(remaining_octets: &[u8]) -> Result<(u8, usize), Error> {
    match remaining_octets {
        [] => Err(Error::InvalidEscape),
        [h, t, o, ..] if h.is_ascii_digit() && t.is_ascii_digit() && o.is_ascii_digit() => {
            let value =
                100 * (h - b'0') as usize + 10 * (t - b'0') as usize + (o - b'0') as usize;
            u8::try_from(value)
                .map(|value| (value, 3))
                .or(Err(Error::InvalidEscape))
        }
        [d, ..] if d.is_ascii_digit() => Err(Error::InvalidEscape),
        [c, ..] => Ok((*c, 1)),
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
