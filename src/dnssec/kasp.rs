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

//! Persistent key storage, as far as the signing engine needs it.
//!
//! Under an offline-KSK policy, the KSK never touches the signer. The
//! key records (DNSKEY, CDNSKEY, CDS) and their KSK signatures are
//! prepared elsewhere for a series of time periods and stored here, and
//! the engine loads the set covering the current time.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Mutex;

use super::key_records::KeyRecords;
use crate::name::Name;

/// An offline key-record set loaded from storage.
#[derive(Clone, Debug)]
pub struct OfflineRecords {
    pub records: KeyRecords,

    /// When the next stored set takes effect, if there is one.
    pub next_resign: Option<u64>,
}

/// Key storage.
pub trait KaspStore: Send + Sync {
    /// Loads the newest offline key-record set of `zone` that took
    /// effect at or before `now`.
    fn load_offline_records(&self, zone: &Name, now: u64) -> Result<OfflineRecords, StorageError>;
}

/// Errors reported by key storage.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StorageError {
    /// No suitable record set is stored.
    NotFound,

    /// The storage backend failed.
    Backend(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::NotFound => f.write_str("no offline records found"),
            Self::Backend(what) => f.write_str(what),
        }
    }
}

impl std::error::Error for StorageError {}

////////////////////////////////////////////////////////////////////////
// IN-MEMORY STORAGE                                                  //
////////////////////////////////////////////////////////////////////////

/// A [`KaspStore`] that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemoryKasp {
    offline: Mutex<HashMap<Name, BTreeMap<u64, KeyRecords>>>,
}

impl MemoryKasp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the offline key-record set of `zone` that takes effect at
    /// `timestamp`, replacing any set stored for the same time.
    pub fn insert_offline_records(&self, zone: Name, timestamp: u64, records: KeyRecords) {
        self.offline
            .lock()
            .unwrap()
            .entry(zone)
            .or_default()
            .insert(timestamp, records);
    }
}

impl KaspStore for MemoryKasp {
    fn load_offline_records(&self, zone: &Name, now: u64) -> Result<OfflineRecords, StorageError> {
        let offline = self.offline.lock().unwrap();
        let sets = offline.get(zone).ok_or(StorageError::NotFound)?;
        let (_, records) = sets
            .range(..=now)
            .next_back()
            .ok_or(StorageError::NotFound)?;
        let next_resign = sets
            .range(now.saturating_add(1)..)
            .next()
            .map(|(timestamp, _)| *timestamp);
        Ok(OfflineRecords {
            records: records.clone(),
            next_resign,
        })
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

    fn records(marker: &[u8]) -> KeyRecords {
        let mut records = KeyRecords::new(&ZONE, Class::IN, Ttl::from(3600));
        records.dnskey.add_rdata(marker);
        records
    }

    fn marker(records: &KeyRecords) -> &[u8] {
        records.dnskey.rdatas.get(0).unwrap()
    }

    #[test]
    fn load_picks_newest_set_not_after_now() {
        let kasp = MemoryKasp::new();
        kasp.insert_offline_records(ZONE.clone(), 100, records(b"first"));
        kasp.insert_offline_records(ZONE.clone(), 200, records(b"second"));
        kasp.insert_offline_records(ZONE.clone(), 300, records(b"third"));

        let loaded = kasp.load_offline_records(&ZONE, 250).unwrap();
        assert_eq!(marker(&loaded.records), b"second");
        assert_eq!(loaded.next_resign, Some(300));

        let loaded = kasp.load_offline_records(&ZONE, 200).unwrap();
        assert_eq!(marker(&loaded.records), b"second");

        let loaded = kasp.load_offline_records(&ZONE, 1000).unwrap();
        assert_eq!(marker(&loaded.records), b"third");
        assert_eq!(loaded.next_resign, None);
    }

    #[test]
    fn load_fails_without_suitable_set() {
        let kasp = MemoryKasp::new();
        assert_eq!(
            kasp.load_offline_records(&ZONE, 0).unwrap_err(),
            StorageError::NotFound
        );
        kasp.insert_offline_records(ZONE.clone(), 100, records(b"first"));
        assert_eq!(
            kasp.load_offline_records(&ZONE, 99).unwrap_err(),
            StorageError::NotFound
        );
    }
}
