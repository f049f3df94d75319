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

//! Implementation of the [`ZoneUpdate`] structure.

use std::sync::Arc;

use super::{AddMode, Changeset, Error, ZoneContents};
use crate::rr::{Rrset, Type};

/// A transaction that produces a new version of a zone.
///
/// The update pairs the zone's current contents (if any) with a working
/// copy of the new contents, and accumulates the diff between the two.
/// Changes are made by applying [`Changeset`]s; each is applied
/// atomically (it is checked in full before anything is modified). The
/// caller publishes the result with [`ZoneUpdate::commit`]; dropping
/// the update instead discards every change.
#[derive(Debug)]
pub struct ZoneUpdate {
    old: Option<Arc<ZoneContents>>,
    new: ZoneContents,
    change: Changeset,
}

impl ZoneUpdate {
    /// Starts an update on top of existing contents.
    pub fn incremental(old: Arc<ZoneContents>) -> Self {
        let new = ZoneContents::clone(&old);
        let change = Changeset::new(old.name().clone());
        Self {
            old: Some(old),
            new,
            change,
        }
    }

    /// Starts an update that installs `contents` from scratch, e.g.
    /// after loading a zone.
    pub fn full(mut contents: ZoneContents) -> Self {
        contents.adjust();
        let change = Changeset::new(contents.name().clone());
        Self {
            old: None,
            new: contents,
            change,
        }
    }

    /// Returns the contents the update started from, if any.
    pub fn old_contents(&self) -> Option<&ZoneContents> {
        self.old.as_deref()
    }

    /// Returns the contents as modified so far.
    pub fn new_contents(&self) -> &ZoneContents {
        &self.new
    }

    /// Returns the accumulated diff.
    pub fn change(&self) -> &Changeset {
        &self.change
    }

    /// Returns whether nothing has been changed by the update.
    pub fn no_change(&self) -> bool {
        self.change.is_empty()
    }

    /// Adds the records of `rrset`.
    pub fn add(&mut self, rrset: &Rrset) -> Result<(), Error> {
        let mut changeset = Changeset::new(self.new.name().clone());
        changeset.add_rrset(rrset, AddMode::Plain);
        self.apply_changeset(&changeset)
    }

    /// Removes the records of `rrset`.
    pub fn remove(&mut self, rrset: &Rrset) -> Result<(), Error> {
        let mut changeset = Changeset::new(self.new.name().clone());
        changeset.remove_rrset(rrset, AddMode::Plain);
        self.apply_changeset(&changeset)
    }

    /// Applies `changeset` to the new contents and merges it into the
    /// update's diff. Either the whole changeset is applied or, on
    /// error, nothing is.
    pub fn apply_changeset(&mut self, changeset: &Changeset) -> Result<(), Error> {
        for rrset in changeset
            .iter_all()
            .chain(changeset.soa_from.iter())
            .chain(changeset.soa_to.iter())
        {
            self.new.check(rrset)?;
        }

        for rrset in changeset.removals() {
            self.new.remove_rrset(rrset)?;
        }
        for rrset in changeset.additions() {
            self.new.add_rrset(rrset)?;
        }
        match (&changeset.soa_from, &changeset.soa_to) {
            (_, Some(soa_to)) => {
                if let Some(current) = self.new.apex_rrset(Type::SOA).cloned() {
                    self.new.remove_rrset(&current)?;
                }
                self.new.add_rrset(soa_to)?;
            }
            (Some(soa_from), None) => self.new.remove_rrset(soa_from)?,
            (None, None) => (),
        }

        self.new.adjust();
        self.change.merge(changeset);
        Ok(())
    }

    /// Finishes the update, returning the new contents to publish.
    pub fn commit(self) -> Arc<ZoneContents> {
        Arc::new(self.new)
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::Class;
    use crate::name::Name;
    use crate::rr::Ttl;

    fn txt(owner: &str, text: &[u8]) -> Rrset {
        Rrset::with_rdata(
            owner.parse().unwrap(),
            Type::TXT,
            Class::IN,
            Ttl::from(300),
            text,
        )
    }

    fn soa(serial: u8) -> Rrset {
        Rrset::with_rdata(
            "quandary.test.".parse().unwrap(),
            Type::SOA,
            Class::IN,
            Ttl::from(3600),
            &[0, 0, 0, 0, 0, serial, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        )
    }

    fn base() -> Arc<ZoneContents> {
        let mut contents = ZoneContents::new("quandary.test.".parse().unwrap(), Class::IN);
        contents.add_rrset(&soa(1)).unwrap();
        contents.add_rrset(&txt("quandary.test.", b"hello")).unwrap();
        Arc::new(contents)
    }

    #[test]
    fn apply_changeset_is_atomic() {
        let mut update = ZoneUpdate::incremental(base());
        let mut changeset = Changeset::new("quandary.test.".parse().unwrap());
        changeset.add_rrset(&txt("a.quandary.test.", b"in zone"), AddMode::Plain);
        changeset.add_rrset(&txt("outside.test.", b"out of zone"), AddMode::Plain);
        assert_eq!(update.apply_changeset(&changeset), Err(Error::NotInZone));
        assert!(update.no_change());
        let owner: Name = "a.quandary.test.".parse().unwrap();
        assert!(update.new_contents().find_node(&owner).is_none());
    }

    #[test]
    fn soa_to_replaces_apex_soa() {
        let mut update = ZoneUpdate::incremental(base());
        let mut changeset = Changeset::new("quandary.test.".parse().unwrap());
        changeset.remove_rrset(&soa(1), AddMode::Plain);
        changeset.add_rrset(&soa(2), AddMode::Plain);
        update.apply_changeset(&changeset).unwrap();
        assert_eq!(
            update.new_contents().apex_rrset(Type::SOA),
            Some(&soa(2))
        );
        assert_eq!(update.change().soa_from, Some(soa(1)));
        let contents = update.commit();
        assert_eq!(contents.apex_rrset(Type::SOA), Some(&soa(2)));
    }

    #[test]
    fn old_contents_are_untouched() {
        let old = base();
        let mut update = ZoneUpdate::incremental(old.clone());
        update.remove(&txt("quandary.test.", b"hello")).unwrap();
        assert!(!update.no_change());
        assert!(old.apex_rrset(Type::TXT).is_some());
        assert!(update.new_contents().apex_rrset(Type::TXT).is_none());
    }
}
