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

//! Signing passes and the DNSSEC zone event.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use log::info;

use super::context::DnssecContext;
use super::driver::{sign_soa, soa_expired, zone_sign, zone_sign_update};
use super::events::{EventScheduler, EventTime, ZoneEvent, ZoneTimers};
use super::kasp::KaspStore;
use super::key_records::update_dnskeys;
use super::reschedule::{reschedule, RescheduleResult};
use super::{Error, Policy, ZoneKeyset};
use crate::name::Name;
use crate::rr::{soa, Rrset, Type};
use crate::util::earliest;
use crate::zone::{AddMode, Changeset, ZoneContents, ZoneUpdate};

////////////////////////////////////////////////////////////////////////
// SIGNING PASSES                                                     //
////////////////////////////////////////////////////////////////////////

/// Options of a full signing pass.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SignFlags {
    /// Replace every signature, valid or not.
    pub drop_signatures: bool,

    /// Replace the NSEC3 salt if it is due.
    pub nsec3_resalt: bool,
}

/// Decides whether the NSEC3 salt is replaced now. Returns whether it
/// is, and when it is next due.
fn nsec3_resalt(dnssec: &DnssecContext, last_resalt: Option<u64>) -> (bool, Option<u64>) {
    match dnssec.policy.nsec3_salt_lifetime {
        None | Some(0) => (false, None),
        Some(lifetime) => match last_resalt {
            Some(last) if last.saturating_add(lifetime) > dnssec.now => {
                (false, Some(last.saturating_add(lifetime)))
            }
            _ => (true, Some(dnssec.now.saturating_add(lifetime))),
        },
    }
}

/// Increments the serial of the zone's SOA, unless the update already
/// replaces the SOA.
fn increment_soa(update: &mut ZoneUpdate) -> Result<(), Error> {
    if update.change().soa_to.is_some() {
        return Ok(());
    }
    let old = update
        .new_contents()
        .apex_rrset(Type::SOA)
        .ok_or(Error::InvalidArgument("the zone has no SOA"))?
        .clone();
    let rdata = old
        .rdatas
        .get(0)
        .ok_or(Error::InvalidArgument("the zone has an empty SOA"))?;
    let serial = soa::serial(rdata)?;
    let new = Rrset::with_rdata(
        old.owner.clone(),
        Type::SOA,
        old.class,
        old.ttl,
        &soa::with_serial(rdata, soa::next_serial(serial))?,
    );

    let mut changeset = Changeset::new(old.owner.clone());
    changeset.remove_rrset(&old, AddMode::Plain);
    changeset.add_rrset(&new, AddMode::Plain);
    update.apply_changeset(&changeset)?;
    Ok(())
}

/// Computes when the zone must next be signed, given the earliest
/// expiration of its signatures and when the next offline record set
/// takes effect.
fn next_sign(dnssec: &DnssecContext, expires_at: Option<u64>, next_resign: Option<u64>) -> Option<u64> {
    let refresh = expires_at.map(|at| at.saturating_sub(dnssec.policy.rrsig_refresh_before));
    earliest(refresh, next_resign)
}

/// Signs the whole zone under `update`.
///
/// The apex key records are rebuilt first, then every signature in the
/// zone is brought up to date. If that changed anything, or the SOA
/// signatures need refreshing anyway, the SOA serial is incremented
/// and the SOA re-signed.
pub fn sign_zone(
    update: &mut ZoneUpdate,
    keys: &ZoneKeyset,
    dnssec: &mut DnssecContext,
    flags: SignFlags,
    last_resalt: Option<u64>,
) -> Result<RescheduleResult, Error> {
    dnssec.policy.validate()?;
    dnssec.rrsig_drop_existing = flags.drop_signatures;
    let mut result = RescheduleResult {
        next_rollover: keys.next_rollover,
        plan_ds_query: keys.plan_ds_query,
        ..Default::default()
    };

    if flags.nsec3_resalt {
        let (resalted, next_resalt) = nsec3_resalt(dnssec, last_resalt);
        if resalted {
            result.last_nsec3resalt = Some(dnssec.now);
        }
        result.next_nsec3resalt = next_resalt;
    }

    let next_resign = update_dnskeys(update, keys, dnssec)?;
    let expires_at = zone_sign(update, keys, dnssec)?;

    if !update.no_change() || soa_expired(update.new_contents(), keys, dnssec)? {
        increment_soa(update)?;
        sign_soa(update, keys, dnssec)?;
    }

    result.next_sign = next_sign(dnssec, expires_at, next_resign);
    Ok(result)
}

/// Signs what `update` has changed so far. If that is not nothing, the
/// SOA serial is incremented (unless the update already set one) and
/// the SOA re-signed.
pub fn sign_update(
    update: &mut ZoneUpdate,
    keys: &ZoneKeyset,
    dnssec: &DnssecContext,
) -> Result<RescheduleResult, Error> {
    let expires_at = zone_sign_update(update, keys, dnssec)?;
    let mut result = RescheduleResult {
        next_rollover: keys.next_rollover,
        plan_ds_query: keys.plan_ds_query,
        ..Default::default()
    };

    if !update.no_change() {
        increment_soa(update)?;
        sign_soa(update, keys, dnssec)?;
    }

    result.next_sign = next_sign(dnssec, expires_at, None);
    Ok(result)
}

////////////////////////////////////////////////////////////////////////
// MANAGED ZONES                                                      //
////////////////////////////////////////////////////////////////////////

/// A signed zone along with everything needed to keep it signed.
pub struct ManagedZone {
    name: Name,
    contents: RwLock<Arc<ZoneContents>>,
    keys: RwLock<Arc<ZoneKeyset>>,
    policy: Policy,
    kasp: Arc<dyn KaspStore>,
    force_resign: AtomicBool,
    timers: Mutex<ZoneTimers>,

    // Held while the zone is being changed, so that changes are not
    // lost.
    update_lock: Mutex<()>,
}

impl ManagedZone {
    pub fn new(
        mut contents: ZoneContents,
        keys: ZoneKeyset,
        policy: Policy,
        kasp: Arc<dyn KaspStore>,
    ) -> Self {
        contents.adjust();
        Self {
            name: contents.name().clone(),
            contents: RwLock::new(Arc::new(contents)),
            keys: RwLock::new(Arc::new(keys)),
            policy,
            kasp,
            force_resign: AtomicBool::new(false),
            timers: Mutex::new(ZoneTimers::default()),
            update_lock: Mutex::new(()),
        }
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    /// Returns the current (published) contents of the zone.
    pub fn contents(&self) -> Arc<ZoneContents> {
        self.contents.read().unwrap().clone()
    }

    pub fn keys(&self) -> Arc<ZoneKeyset> {
        self.keys.read().unwrap().clone()
    }

    /// Replaces the keys. They are used from the next signing pass on.
    pub fn set_keys(&self, keys: ZoneKeyset) {
        *self.keys.write().unwrap() = Arc::new(keys);
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn timers(&self) -> ZoneTimers {
        *self.timers.lock().unwrap()
    }

    /// Makes the next signing pass replace every signature.
    pub fn set_force_resign(&self) {
        self.force_resign.store(true, Ordering::SeqCst);
    }

    fn dnssec_context(&self, now: u64) -> DnssecContext {
        DnssecContext::new(self.name.clone(), now, self.policy.clone(), self.kasp.clone())
    }

    /// Runs the DNSSEC event of the zone: a full signing pass, followed
    /// by the scheduling of the events that depend on it.
    ///
    /// Nothing is published if the pass fails.
    pub fn event_dnssec(&self, scheduler: &dyn EventScheduler, now: u64) -> Result<(), Error> {
        let _guard = self.update_lock.lock().unwrap();

        let drop_signatures = self.force_resign.swap(false, Ordering::SeqCst);
        if drop_signatures {
            info!("{}: DNSSEC, dropping previous signatures, re-signing zone", self.name);
        } else {
            info!("{}: DNSSEC, signing zone", self.name);
        }
        let flags = SignFlags {
            drop_signatures,
            nsec3_resalt: scheduler
                .time_of(&self.name, ZoneEvent::Nsec3Resalt)
                .map_or(true, |at| at <= now),
        };

        let keys = self.keys();
        let mut dnssec = self.dnssec_context(now);
        let last_resalt = self.timers().last_resalt;
        let mut update = ZoneUpdate::incremental(self.contents());
        let result = sign_zone(&mut update, &keys, &mut dnssec, flags, last_resalt)?;

        let zone_changed = !update.no_change();
        if zone_changed {
            *self.contents.write().unwrap() = update.commit();
        }

        let mut timers = self.timers.lock().unwrap();
        reschedule(&self.name, &mut timers, scheduler, &result, zone_changed, now);
        Ok(())
    }

    /// Applies `changes` to the zone (as a dynamic update would) and
    /// signs what changed. Secondaries are notified, and the next
    /// signing pass is brought forward if the new signatures need
    /// refreshing before it.
    pub fn apply_changes(
        &self,
        changes: &Changeset,
        scheduler: &dyn EventScheduler,
        now: u64,
    ) -> Result<(), Error> {
        let _guard = self.update_lock.lock().unwrap();

        let keys = self.keys();
        let dnssec = self.dnssec_context(now);
        let mut update = ZoneUpdate::incremental(self.contents());
        update.apply_changeset(changes)?;
        let result = sign_update(&mut update, &keys, &dnssec)?;
        if update.no_change() {
            return Ok(());
        }
        *self.contents.write().unwrap() = update.commit();

        let current = scheduler.time_of(&self.name, ZoneEvent::Dnssec);
        let dnssec_at = match result.next_sign {
            Some(at) if earliest(current, Some(at)) == Some(at) => EventTime::At(at),
            _ => EventTime::Keep,
        };
        scheduler.schedule(
            &self.name,
            &[(ZoneEvent::Dnssec, dnssec_at), (ZoneEvent::Notify, EventTime::Now)],
        );
        Ok(())
    }
}
