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

//! The [`RdataSet`] structure.

use std::fmt;

use super::MAX_RDATA_LEN;
use crate::util::Hex;

////////////////////////////////////////////////////////////////////////
// RDATASET STRUCTURE                                                 //
////////////////////////////////////////////////////////////////////////

/// Stores the RDATA of an RRset.
///
/// Each RDATA is kept exactly once, and the set is kept sorted in the
/// canonical RR ordering of [RFC 4034 § 6.3] (RDATA compared as
/// left-justified unsigned octet sequences). The signing engine can
/// therefore build signed data by simply iterating over the set.
///
/// [RFC 4034 § 6.3]: https://datatracker.ietf.org/doc/html/rfc4034#section-6.3
#[derive(Clone, Default, Eq, Hash, PartialEq)]
pub struct RdataSet {
    rdatas: Vec<Box<[u8]>>,
}

impl RdataSet {
    /// Creates a new set initially containing no RDATA.
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, rdata: &[u8]) -> Result<usize, usize> {
        self.rdatas.binary_search_by(|e| e.as_ref().cmp(rdata))
    }

    /// Copies an RDATA into this set. Following the behavior of other
    /// nameservers, duplicate RDATA is silently discarded. Returns
    /// whether the RDATA was inserted.
    ///
    /// # Panics
    ///
    /// Panics if `rdata` is longer than 65,535 octets.
    pub fn insert(&mut self, rdata: &[u8]) -> bool {
        assert!(rdata.len() <= MAX_RDATA_LEN);
        match self.position(rdata) {
            Ok(_) => false,
            Err(index) => {
                self.rdatas.insert(index, rdata.into());
                true
            }
        }
    }

    /// Removes an RDATA from this set. Returns whether it was present.
    pub fn remove(&mut self, rdata: &[u8]) -> bool {
        match self.position(rdata) {
            Ok(index) => {
                self.rdatas.remove(index);
                true
            }
            Err(_) => false,
        }
    }

    /// Returns whether the set contains `rdata`.
    pub fn contains(&self, rdata: &[u8]) -> bool {
        self.position(rdata).is_ok()
    }

    pub fn len(&self) -> usize {
        self.rdatas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rdatas.is_empty()
    }

    /// Returns the RDATA at position `index` in canonical order.
    pub fn get(&self, index: usize) -> Option<&[u8]> {
        self.rdatas.get(index).map(AsRef::as_ref)
    }

    /// Returns an iterator over the RDATA in canonical order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &[u8]> + ExactSizeIterator {
        self.rdatas.iter().map(AsRef::as_ref)
    }

    /// Returns the RDATA present in both `self` and `other`.
    pub fn intersection(&self, other: &RdataSet) -> RdataSet {
        Self {
            rdatas: self
                .rdatas
                .iter()
                .filter(|rdata| other.contains(rdata))
                .cloned()
                .collect(),
        }
    }

    /// Removes every RDATA of `other` from this set.
    pub fn subtract(&mut self, other: &RdataSet) {
        self.rdatas.retain(|rdata| !other.contains(rdata));
    }

    /// Inserts every RDATA of `other` into this set.
    pub fn extend(&mut self, other: &RdataSet) {
        for rdata in other.iter() {
            self.insert(rdata);
        }
    }
}

impl<'a> FromIterator<&'a [u8]> for RdataSet {
    fn from_iter<I: IntoIterator<Item = &'a [u8]>>(iter: I) -> Self {
        let mut set = Self::new();
        for rdata in iter {
            set.insert(rdata);
        }
        set
    }
}

impl fmt::Debug for RdataSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut list = f.debug_list();
        for rdata in self.iter() {
            list.entry(&format_args!("{}", Hex(rdata)));
        }
        list.finish()
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_keeps_canonical_order_and_ignores_duplicates() {
        let mut rdatas = RdataSet::new();
        assert!(rdatas.insert(&[127, 0, 0, 2]));
        assert!(rdatas.insert(&[127, 0, 0, 1]));
        assert!(rdatas.insert(&[10, 0, 0, 1, 5]));
        assert!(!rdatas.insert(&[127, 0, 0, 1]));
        assert_eq!(
            rdatas.iter().collect::<Vec<_>>(),
            [&[10u8, 0, 0, 1, 5][..], &[127, 0, 0, 1], &[127, 0, 0, 2]],
        );
    }

    #[test]
    fn shorter_prefix_sorts_first() {
        let rdatas: RdataSet = [&b"ab"[..], b"a", b"b"].into_iter().collect();
        assert_eq!(rdatas.iter().collect::<Vec<_>>(), [&b"a"[..], b"ab", b"b"]);
    }

    #[test]
    fn set_operations_work() {
        let mut a: RdataSet = [&[1u8][..], &[2], &[3]].into_iter().collect();
        let b: RdataSet = [&[2u8][..], &[3], &[4]].into_iter().collect();
        assert_eq!(
            a.intersection(&b).iter().collect::<Vec<_>>(),
            [&[2u8][..], &[3]]
        );
        a.subtract(&b);
        assert_eq!(a.iter().collect::<Vec<_>>(), [&[1u8][..]]);
        a.extend(&b);
        assert_eq!(a.len(), 4);
        assert!(a.remove(&[4]));
        assert!(!a.remove(&[4]));
        assert!(!a.contains(&[4]));
    }
}
