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

//! Implementation of DNS zone data structures, for keeping DNS zones
//! loaded in memory and describing changes to them.

use std::collections::{BTreeMap, HashSet};

use crate::class::Class;
use crate::name::Name;
use crate::rr::{rrsig, Rrset, Type};

mod changeset;
mod error;
mod node;
mod update;
pub use changeset::{AddMode, Changeset};
pub use error::Error;
pub use node::{Node, NodeFlags};
pub use update::ZoneUpdate;

/// A tree of [`Node`]s, keyed and iterated in DNSSEC canonical order.
pub type ZoneTree = BTreeMap<Name, Node>;

/// The contents of a DNS zone at one version.
///
/// The zone's data lives in two trees. The main tree holds every node
/// of the zone proper. NSEC3 records, whose owners are hashed names,
/// live together with their signatures in a separate NSEC3 tree, so
/// that they neither interfere with the main tree's structure nor get
/// flagged as part of it.
///
/// `ZoneContents` is cloned to produce the new version of a zone in a
/// [`ZoneUpdate`]; readers of the old version are never disturbed.
#[derive(Clone, Debug)]
pub struct ZoneContents {
    name: Name,
    class: Class,
    nodes: ZoneTree,
    nsec3_nodes: ZoneTree,
}

impl ZoneContents {
    /// Creates new, empty contents for the zone `name`.
    pub fn new(name: Name, class: Class) -> Self {
        Self {
            name,
            class,
            nodes: ZoneTree::new(),
            nsec3_nodes: ZoneTree::new(),
        }
    }

    /// Returns the zone's name (the owner of its apex).
    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn class(&self) -> Class {
        self.class
    }

    /// Returns the apex node, if it owns any records.
    pub fn apex(&self) -> Option<&Node> {
        self.nodes.get(&self.name)
    }

    /// Returns the RRset of type `rr_type` at the apex.
    pub fn apex_rrset(&self, rr_type: Type) -> Option<&Rrset> {
        self.apex().and_then(|apex| apex.rrset(rr_type))
    }

    /// Returns the main tree.
    pub fn nodes(&self) -> &ZoneTree {
        &self.nodes
    }

    /// Returns the NSEC3 tree.
    pub fn nsec3_nodes(&self) -> &ZoneTree {
        &self.nsec3_nodes
    }

    /// Finds the node owned by `owner`, looking first in the main tree
    /// and then in the NSEC3 tree.
    pub fn find_node(&self, owner: &Name) -> Option<&Node> {
        self.nodes
            .get(owner)
            .or_else(|| self.nsec3_nodes.get(owner))
    }

    /// Checks that `rrset` may be stored in this zone.
    pub fn check(&self, rrset: &Rrset) -> Result<(), Error> {
        if !rrset.owner.eq_or_subdomain_of(&self.name) {
            Err(Error::NotInZone)
        } else if rrset.class != self.class {
            Err(Error::ClassMismatch)
        } else {
            Ok(())
        }
    }

    /// Adds the records of `rrset` to the zone. If the RRset already
    /// exists, its TTL is replaced.
    ///
    /// Node flags are not updated; call [`ZoneContents::adjust`] once
    /// a batch of changes is complete.
    pub fn add_rrset(&mut self, rrset: &Rrset) -> Result<(), Error> {
        self.check(rrset)?;
        if rrset.is_empty() {
            return Ok(());
        }
        self.tree_for_mut(rrset)
            .entry(rrset.owner.clone())
            .or_insert_with(|| Node::new(rrset.owner.clone()))
            .add(rrset);
        Ok(())
    }

    /// Removes the records of `rrset` from the zone. Records that are
    /// not present are ignored, and nodes left without RRsets are
    /// removed from their tree.
    pub fn remove_rrset(&mut self, rrset: &Rrset) -> Result<(), Error> {
        self.check(rrset)?;
        let tree = self.tree_for_mut(rrset);
        if let Some(node) = tree.get_mut(&rrset.owner) {
            node.remove(rrset);
            if node.is_empty() {
                tree.remove(&rrset.owner);
            }
        }
        Ok(())
    }

    fn tree_for_mut(&mut self, rrset: &Rrset) -> &mut ZoneTree {
        if belongs_to_nsec3_tree(rrset) {
            &mut self.nsec3_nodes
        } else {
            &mut self.nodes
        }
    }

    /// Recomputes the [`NodeFlags`] of the main tree. A non-apex node
    /// owning NS is flagged [`DELEG`](NodeFlags::DELEG); any node below
    /// such a node is flagged [`NONAUTH`](NodeFlags::NONAUTH).
    pub fn adjust(&mut self) {
        let cuts: HashSet<Name> = self
            .nodes
            .values()
            .filter(|node| node.owner() != &self.name && node.has_type(Type::NS))
            .map(|node| node.owner().clone())
            .collect();

        for node in self.nodes.values_mut() {
            let mut flags = NodeFlags::empty();
            if cuts.contains(node.owner()) {
                flags |= NodeFlags::DELEG;
            }
            let mut ancestor = node.owner().parent();
            while let Some(name) = ancestor {
                if name == self.name || !name.eq_or_subdomain_of(&self.name) {
                    break;
                } else if cuts.contains(&name) {
                    flags |= NodeFlags::NONAUTH;
                    break;
                }
                ancestor = name.parent();
            }
            node.flags = flags;
        }
    }
}

/// Determines whether an RRset is stored in the NSEC3 tree: NSEC3
/// RRsets, and RRSIG RRsets covering only NSEC3.
fn belongs_to_nsec3_tree(rrset: &Rrset) -> bool {
    match rrset.rr_type {
        Type::NSEC3 => true,
        Type::RRSIG => {
            !rrset.is_empty()
                && rrset
                    .rdatas
                    .iter()
                    .all(|rdata| rrsig::type_covered_of(rdata) == Some(Type::NSEC3))
        }
        _ => false,
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use lazy_static::lazy_static;

    use super::*;
    use crate::rr::Ttl;

    lazy_static! {
        static ref NAME: Name = "quandary.test.".parse().unwrap();
        static ref OUTSIDE: Name = "other.test.".parse().unwrap();
    }

    fn a_rrset(owner: &str, octet: u8) -> Rrset {
        Rrset::with_rdata(
            owner.parse().unwrap(),
            Type::A,
            Class::IN,
            Ttl::from(3600),
            &[192, 0, 2, octet],
        )
    }

    fn new_zone() -> ZoneContents {
        ZoneContents::new(NAME.clone(), Class::IN)
    }

    #[test]
    fn add_rejects_mismatched_class() {
        let mut zone = new_zone();
        let mut rrset = a_rrset("quandary.test.", 1);
        rrset.class = Class::CH;
        assert_eq!(zone.add_rrset(&rrset), Err(Error::ClassMismatch));
    }

    #[test]
    fn add_rejects_owner_outside_of_zone() {
        let mut zone = new_zone();
        let rrset = a_rrset("other.test.", 1);
        assert_eq!(rrset.owner, *OUTSIDE);
        assert_eq!(zone.add_rrset(&rrset), Err(Error::NotInZone));
    }

    #[test]
    fn add_merges_and_remove_prunes() {
        let mut zone = new_zone();
        zone.add_rrset(&a_rrset("www.quandary.test.", 1)).unwrap();
        let mut second = a_rrset("www.quandary.test.", 2);
        second.ttl = Ttl::from(60);
        zone.add_rrset(&second).unwrap();

        let owner: Name = "www.quandary.test.".parse().unwrap();
        let rrset = zone.find_node(&owner).unwrap().rrset(Type::A).unwrap();
        assert_eq!(rrset.len(), 2);
        assert_eq!(rrset.ttl, Ttl::from(60));

        zone.remove_rrset(&a_rrset("www.quandary.test.", 1)).unwrap();
        zone.remove_rrset(&a_rrset("www.quandary.test.", 9)).unwrap();
        assert_eq!(zone.find_node(&owner).unwrap().rrset_count(), 1);
        zone.remove_rrset(&a_rrset("www.quandary.test.", 2)).unwrap();
        assert!(zone.find_node(&owner).is_none());
    }

    #[test]
    fn nsec3_records_go_to_their_own_tree() {
        let mut zone = new_zone();
        let owner = "abcdef.quandary.test.";
        zone.add_rrset(&Rrset::with_rdata(
            owner.parse().unwrap(),
            Type::NSEC3,
            Class::IN,
            Ttl::from(300),
            &[1, 0, 0, 0, 0],
        ))
        .unwrap();
        assert!(zone.nodes().is_empty());
        assert_eq!(zone.nsec3_nodes().len(), 1);
        assert!(zone.find_node(&owner.parse().unwrap()).is_some());
    }

    #[test]
    fn adjust_flags_delegations() {
        let mut zone = new_zone();
        zone.add_rrset(&Rrset::with_rdata(
            NAME.clone(),
            Type::NS,
            Class::IN,
            Ttl::from(3600),
            b"\x03ns1\x08quandary\x04test\x00",
        ))
        .unwrap();
        zone.add_rrset(&Rrset::with_rdata(
            "sub.quandary.test.".parse().unwrap(),
            Type::NS,
            Class::IN,
            Ttl::from(3600),
            b"\x02ns\x03sub\x08quandary\x04test\x00",
        ))
        .unwrap();
        zone.add_rrset(&a_rrset("ns.sub.quandary.test.", 1)).unwrap();
        zone.add_rrset(&a_rrset("www.quandary.test.", 1)).unwrap();
        zone.adjust();

        let flags = |owner: &str| zone.find_node(&owner.parse().unwrap()).unwrap().flags();
        assert_eq!(flags("quandary.test."), NodeFlags::empty());
        assert_eq!(flags("sub.quandary.test."), NodeFlags::DELEG);
        assert_eq!(flags("ns.sub.quandary.test."), NodeFlags::NONAUTH);
        assert_eq!(flags("www.quandary.test."), NodeFlags::empty());
    }
}
