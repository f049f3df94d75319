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

//! Implementation of the [`Changeset`] structure.

use std::collections::BTreeMap;

use crate::name::Name;
use crate::rr::{Rrset, Type};

/// Controls how [`Changeset::add_rrset`] and
/// [`Changeset::remove_rrset`] interact with the opposite side of the
/// changeset.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AddMode {
    /// Record the change as given.
    Plain,

    /// Drop records that the opposite side already contains from the
    /// opposite side, then record the change in full. Removing and
    /// re-adding a record with a new TTL is expressed this way.
    Check,

    /// Like [`Check`](AddMode::Check), but when the TTLs agree the
    /// cancelled records are dropped from this change as well, so that
    /// a removal followed by an identical addition leaves no trace.
    CheckCancelOut,
}

type RrsetMap = BTreeMap<(Name, Type), Rrset>;

/// A diff between two versions of a zone.
///
/// Additions and removals are kept per (owner, type), ordered
/// canonically. The SOA is not stored among them: the SOA being
/// replaced is kept in [`soa_from`](Changeset::soa_from) and its
/// replacement in [`soa_to`](Changeset::soa_to).
#[derive(Clone, Debug)]
pub struct Changeset {
    zone: Name,
    pub soa_from: Option<Rrset>,
    pub soa_to: Option<Rrset>,
    add: RrsetMap,
    remove: RrsetMap,
}

impl Changeset {
    /// Creates an empty changeset for the zone `zone`.
    pub fn new(zone: Name) -> Self {
        Self {
            zone,
            soa_from: None,
            soa_to: None,
            add: RrsetMap::new(),
            remove: RrsetMap::new(),
        }
    }

    pub fn zone(&self) -> &Name {
        &self.zone
    }

    /// Returns whether the changeset describes no change at all.
    pub fn is_empty(&self) -> bool {
        self.soa_from.is_none()
            && self.soa_to.is_none()
            && self.add.is_empty()
            && self.remove.is_empty()
    }

    /// Records the addition of `rrset`. An SOA replaces
    /// [`soa_to`](Changeset::soa_to).
    pub fn add_rrset(&mut self, rrset: &Rrset, mode: AddMode) {
        if rrset.rr_type == Type::SOA {
            self.soa_to = Some(rrset.clone());
        } else {
            record(&mut self.add, &mut self.remove, rrset, mode);
        }
    }

    /// Records the removal of `rrset`. An SOA is kept in
    /// [`soa_from`](Changeset::soa_from) unless one is already
    /// recorded there.
    pub fn remove_rrset(&mut self, rrset: &Rrset, mode: AddMode) {
        if rrset.rr_type == Type::SOA {
            if self.soa_from.is_none() {
                self.soa_from = Some(rrset.clone());
            }
        } else {
            record(&mut self.remove, &mut self.add, rrset, mode);
        }
    }

    /// Returns the added RRsets (without the SOA).
    pub fn additions(&self) -> impl Iterator<Item = &Rrset> {
        self.add.values()
    }

    /// Returns the removed RRsets (without the SOA).
    pub fn removals(&self) -> impl Iterator<Item = &Rrset> {
        self.remove.values()
    }

    /// Returns the added RRset of the given owner and type.
    pub fn addition(&self, owner: &Name, rr_type: Type) -> Option<&Rrset> {
        self.add.get(&(owner.clone(), rr_type))
    }

    /// Returns the removed RRset of the given owner and type.
    pub fn removal(&self, owner: &Name, rr_type: Type) -> Option<&Rrset> {
        self.remove.get(&(owner.clone(), rr_type))
    }

    /// Iterates over all RRsets of the changeset: additions first, then
    /// removals. The SOA is not included.
    pub fn iter_all(&self) -> impl Iterator<Item = &Rrset> {
        self.additions().chain(self.removals())
    }

    /// Merges `other`, a change that happens after this one, into this
    /// changeset. Opposite changes to the same records cancel out.
    pub fn merge(&mut self, other: &Changeset) {
        for rrset in other.removals() {
            self.remove_rrset(rrset, AddMode::CheckCancelOut);
        }
        for rrset in other.additions() {
            self.add_rrset(rrset, AddMode::CheckCancelOut);
        }
        if self.soa_from.is_none() {
            self.soa_from = other.soa_from.clone();
        }
        if other.soa_to.is_some() {
            self.soa_to = other.soa_to.clone();
        }
    }
}

/// Records `rrset` into `this`, reconciling it with `opposite`
/// according to `mode`.
fn record(this: &mut RrsetMap, opposite: &mut RrsetMap, rrset: &Rrset, mode: AddMode) {
    let key = (rrset.owner.clone(), rrset.rr_type);
    let mut rrset = rrset.clone();

    if mode != AddMode::Plain {
        if let Some(counterpart) = opposite.get_mut(&key) {
            let common = counterpart.rdatas.intersection(&rrset.rdatas);
            counterpart.rdatas.subtract(&common);
            if mode == AddMode::CheckCancelOut && counterpart.ttl == rrset.ttl {
                rrset.rdatas.subtract(&common);
            }
            if counterpart.is_empty() {
                opposite.remove(&key);
            }
        }
    }

    if rrset.is_empty() {
        return;
    }
    match this.get_mut(&key) {
        Some(existing) => {
            existing.ttl = rrset.ttl;
            existing.rdatas.extend(&rrset.rdatas);
        }
        None => {
            this.insert(key, rrset);
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use lazy_static::lazy_static;

    use super::*;
    use crate::class::Class;
    use crate::rr::Ttl;

    lazy_static! {
        static ref ZONE: Name = "quandary.test.".parse().unwrap();
    }

    fn rrset(rr_type: Type, ttl: u32, rdatas: &[&str]) -> Rrset {
        let mut rrset = Rrset::new(ZONE.clone(), rr_type, Class::IN, Ttl::from(ttl));
        for rdata in rdatas {
            rrset.add_rdata(rdata.as_bytes());
        }
        rrset
    }

    #[test]
    fn soa_goes_to_dedicated_slots() {
        let mut changeset = Changeset::new(ZONE.clone());
        changeset.remove_rrset(&rrset(Type::SOA, 3600, &["old"]), AddMode::Plain);
        changeset.remove_rrset(&rrset(Type::SOA, 3600, &["older"]), AddMode::Plain);
        changeset.add_rrset(&rrset(Type::SOA, 3600, &["new"]), AddMode::Plain);
        assert_eq!(changeset.soa_from, Some(rrset(Type::SOA, 3600, &["old"])));
        assert_eq!(changeset.soa_to, Some(rrset(Type::SOA, 3600, &["new"])));
        assert_eq!(changeset.iter_all().count(), 0);
        assert!(!changeset.is_empty());
    }

    #[test]
    fn cancel_out_removes_identical_records_from_both_sides() {
        let mut changeset = Changeset::new(ZONE.clone());
        changeset.remove_rrset(&rrset(Type::DNSKEY, 3600, &["k1", "k2"]), AddMode::Plain);
        changeset.add_rrset(
            &rrset(Type::DNSKEY, 3600, &["k2", "k3"]),
            AddMode::CheckCancelOut,
        );
        assert_eq!(
            changeset.removal(&ZONE, Type::DNSKEY),
            Some(&rrset(Type::DNSKEY, 3600, &["k1"]))
        );
        assert_eq!(
            changeset.addition(&ZONE, Type::DNSKEY),
            Some(&rrset(Type::DNSKEY, 3600, &["k3"]))
        );
    }

    #[test]
    fn cancel_out_of_everything_leaves_empty_changeset() {
        let mut changeset = Changeset::new(ZONE.clone());
        changeset.remove_rrset(&rrset(Type::CDS, 3600, &["c"]), AddMode::Plain);
        changeset.add_rrset(&rrset(Type::CDS, 3600, &["c"]), AddMode::CheckCancelOut);
        assert!(changeset.is_empty());
    }

    #[test]
    fn check_keeps_addition_when_ttl_changes() {
        let mut changeset = Changeset::new(ZONE.clone());
        changeset.remove_rrset(&rrset(Type::TXT, 3600, &["t"]), AddMode::Plain);
        changeset.add_rrset(&rrset(Type::TXT, 60, &["t"]), AddMode::CheckCancelOut);
        assert!(changeset.removal(&ZONE, Type::TXT).is_none());
        assert_eq!(
            changeset.addition(&ZONE, Type::TXT),
            Some(&rrset(Type::TXT, 60, &["t"]))
        );
    }

    #[test]
    fn plain_mode_keeps_both_sides() {
        let mut changeset = Changeset::new(ZONE.clone());
        changeset.remove_rrset(&rrset(Type::TXT, 60, &["t"]), AddMode::Plain);
        changeset.add_rrset(&rrset(Type::TXT, 60, &["t"]), AddMode::Plain);
        assert_eq!(changeset.iter_all().count(), 2);
    }

    #[test]
    fn merge_cancels_opposite_changes() {
        let mut first = Changeset::new(ZONE.clone());
        first.add_rrset(&rrset(Type::TXT, 60, &["a", ""]), AddMode::Plain);
        let mut second = Changeset::new(ZONE.clone());
        second.remove_rrset(&rrset(Type::TXT, 60, &["a"]), AddMode::Plain);
        second.add_rrset(&rrset(Type::SOA, 60, &["soa"]), AddMode::Plain);
        first.merge(&second);
        assert_eq!(
            first.addition(&ZONE, Type::TXT),
            Some(&rrset(Type::TXT, 60, &[""]))
        );
        assert!(first.removal(&ZONE, Type::TXT).is_none());
        assert!(first.soa_to.is_some());
    }
}
