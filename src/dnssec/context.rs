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

//! Signing contexts.

use std::sync::Arc;

use super::crypto::SignContext;
use super::kasp::KaspStore;
use super::key::{ZoneKey, ZoneKeyset};
use super::{Error, Policy};
use crate::name::Name;
use crate::rr::Rrset;

/// Everything a signing pass needs to know besides the keys: the zone,
/// the current time, and the policy. It does not change during a pass.
#[derive(Clone)]
pub struct DnssecContext {
    pub zone: Name,

    /// The current time, in seconds since the UNIX epoch.
    pub now: u64,

    pub policy: Policy,

    /// Replace every signature, valid or not.
    pub rrsig_drop_existing: bool,

    /// Signatures of the apex key records prepared under an offline-KSK
    /// policy, once they have been loaded.
    pub offline_rrsig: Option<Rrset>,

    pub kasp: Arc<dyn KaspStore>,
}

impl DnssecContext {
    pub fn new(zone: Name, now: u64, policy: Policy, kasp: Arc<dyn KaspStore>) -> Self {
        Self {
            zone,
            now,
            policy,
            rrsig_drop_existing: false,
            offline_rrsig: None,
            kasp,
        }
    }

    /// The expiration of a signature made now.
    pub fn expiration(&self) -> u64 {
        self.now.saturating_add(self.policy.rrsig_lifetime)
    }

    /// The earliest expiration a signature may have and still be kept.
    pub fn refresh_limit(&self) -> u64 {
        self.now.saturating_add(self.policy.rrsig_refresh_before)
    }
}

/// The keys of a zone together with a [`SignContext`] for each of
/// them. Each signing thread has its own.
pub struct ZoneSignContext<'a> {
    pub keys: &'a ZoneKeyset,
    ctxs: Vec<Box<dyn SignContext>>,
    pub dnssec: &'a DnssecContext,
}

impl<'a> ZoneSignContext<'a> {
    /// Starts a signing context for every key of `keys`.
    pub fn new(keys: &'a ZoneKeyset, dnssec: &'a DnssecContext) -> Result<Self, Error> {
        let ctxs = keys
            .iter()
            .map(|key| key.key().start())
            .collect::<Result<_, _>>()?;
        Ok(Self { keys, ctxs, dnssec })
    }

    /// Returns the number of keys.
    pub fn count(&self) -> usize {
        self.ctxs.len()
    }

    /// Returns the `i`th key and its signing context.
    pub fn key_mut(&mut self, i: usize) -> (&'a ZoneKey, &mut dyn SignContext) {
        let keys = self.keys;
        (&keys.keys[i], self.ctxs[i].as_mut())
    }
}
