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

//! Implementation of the [`Node`] structure for zone trees.

use std::ops::{BitOr, BitOrAssign};

use crate::name::Name;
use crate::rr::{Rrset, Type};

/// Flags describing the position of a [`Node`] relative to the zone's
/// cuts. They are recomputed by
/// [`ZoneContents::adjust`](super::ZoneContents::adjust).
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct NodeFlags(u8);

impl NodeFlags {
    /// The node is a delegation point: it owns an NS RRset and is not
    /// the apex.
    pub const DELEG: Self = Self(1);

    /// The node is below a delegation point, so its data (glue) is not
    /// authoritative.
    pub const NONAUTH: Self = Self(2);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for NodeFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for NodeFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// A node in a zone tree: an owner name and the RRsets it owns.
#[derive(Clone, Debug)]
pub struct Node {
    owner: Name,
    rrsets: Vec<Rrset>,
    pub(super) flags: NodeFlags,
}

impl Node {
    pub(super) fn new(owner: Name) -> Self {
        Self {
            owner,
            rrsets: Vec::new(),
            flags: NodeFlags::empty(),
        }
    }

    pub fn owner(&self) -> &Name {
        &self.owner
    }

    pub fn flags(&self) -> NodeFlags {
        self.flags
    }

    /// Returns the node's RRsets, ordered by type.
    pub fn rrsets(&self) -> &[Rrset] {
        &self.rrsets
    }

    pub fn rrset_count(&self) -> usize {
        self.rrsets.len()
    }

    pub fn rrset(&self, rr_type: Type) -> Option<&Rrset> {
        self.position(rr_type).ok().map(|i| &self.rrsets[i])
    }

    pub fn has_type(&self, rr_type: Type) -> bool {
        self.position(rr_type).is_ok()
    }

    fn position(&self, rr_type: Type) -> Result<usize, usize> {
        self.rrsets.binary_search_by_key(&rr_type, |rrset| rrset.rr_type)
    }

    /// Merges the records of `rrset` into the node. The TTL of an
    /// existing RRset is replaced by that of `rrset`.
    pub(super) fn add(&mut self, rrset: &Rrset) {
        match self.position(rrset.rr_type) {
            Ok(i) => {
                let existing = &mut self.rrsets[i];
                existing.ttl = rrset.ttl;
                existing.rdatas.extend(&rrset.rdatas);
            }
            Err(i) => self.rrsets.insert(i, rrset.clone()),
        }
    }

    /// Removes the records of `rrset` from the node. Records that are
    /// not present are ignored. An RRset left empty is dropped.
    pub(super) fn remove(&mut self, rrset: &Rrset) {
        if let Ok(i) = self.position(rrset.rr_type) {
            self.rrsets[i].rdatas.subtract(&rrset.rdatas);
            if self.rrsets[i].is_empty() {
                self.rrsets.remove(i);
            }
        }
    }

    pub(super) fn is_empty(&self) -> bool {
        self.rrsets.is_empty()
    }
}
