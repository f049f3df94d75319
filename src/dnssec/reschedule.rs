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

//! Planning what happens after a signing pass.

use chrono::{DateTime, Local};
use log::{info, warn};

use super::events::{EventScheduler, EventTime, ZoneEvent, ZoneTimers};
use crate::name::Name;
use crate::util::earliest;

/// What a signing pass found out about the future of the zone. Times
/// are in seconds since the UNIX epoch.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RescheduleResult {
    /// When signatures need to be refreshed.
    pub next_sign: Option<u64>,

    /// When the next key-rollover action is due.
    pub next_rollover: Option<u64>,

    /// Whether the parent's DS RRset should be checked now.
    pub plan_ds_query: bool,

    /// When the NSEC3 salt was replaced, if it was during the pass.
    pub last_nsec3resalt: Option<u64>,

    /// When the NSEC3 salt is next to be replaced.
    pub next_nsec3resalt: Option<u64>,
}

fn log_dnssec_next(zone: &Name, refresh_at: Option<u64>) {
    let at = refresh_at
        .and_then(|secs| i64::try_from(secs).ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0));
    match at {
        Some(at) => info!(
            "{}: DNSSEC, next signing at {}",
            zone,
            at.with_timezone(&Local).format("%Y-%m-%dT%H:%M:%S%z")
        ),
        None => warn!("{}: DNSSEC, next signing not scheduled", zone),
    }
}

/// Schedules the events that follow a signing pass of `zone` at `now`,
/// and updates its timers. Returns when the next pass is due.
///
/// The next pass is due when signatures need refreshing or a key
/// rollover needs attention, whichever is earlier. A parent DS query
/// and an NSEC3 resalt are scheduled if the pass asked for them, and
/// secondaries are notified if the zone changed. Other events are left
/// alone.
pub fn reschedule(
    zone: &Name,
    timers: &mut ZoneTimers,
    scheduler: &dyn EventScheduler,
    result: &RescheduleResult,
    zone_changed: bool,
    now: u64,
) -> Option<u64> {
    let refresh_at = earliest(result.next_sign, result.next_rollover);
    log_dnssec_next(zone, refresh_at);

    if result.plan_ds_query {
        timers.next_parent_ds_q = Some(now);
    }
    if let Some(last_resalt) = result.last_nsec3resalt {
        timers.last_resalt = Some(last_resalt);
    }

    let keep_unless = |condition: bool| {
        if condition {
            EventTime::Now
        } else {
            EventTime::Keep
        }
    };
    scheduler.schedule(
        zone,
        &[
            (
                ZoneEvent::Dnssec,
                refresh_at.map_or(EventTime::Unset, EventTime::At),
            ),
            (ZoneEvent::ParentDsQuery, keep_unless(result.plan_ds_query)),
            (
                ZoneEvent::Nsec3Resalt,
                result.next_nsec3resalt.map_or(EventTime::Keep, EventTime::At),
            ),
            (ZoneEvent::Notify, keep_unless(zone_changed)),
        ],
    );
    refresh_at
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
