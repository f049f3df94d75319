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

//! Zone event scheduling.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::time::SystemTime;

use crate::name::Name;

/// Returns the current time, in seconds since the UNIX epoch.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|since| since.as_secs())
        .unwrap_or(0)
}

/// Kinds of events that happen to a zone.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ZoneEvent {
    /// A signing pass.
    Dnssec,

    /// A check of the parent's DS RRset.
    ParentDsQuery,

    /// A replacement of the NSEC3 salt.
    Nsec3Resalt,

    /// Notification of secondary servers about a changed zone.
    Notify,
}

impl fmt::Display for ZoneEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Dnssec => "DNSSEC",
            Self::ParentDsQuery => "parent DS query",
            Self::Nsec3Resalt => "NSEC3 resalt",
            Self::Notify => "NOTIFY",
        })
    }
}

/// When to run an event.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EventTime {
    /// At the given time, in seconds since the UNIX epoch.
    At(u64),

    /// As soon as possible.
    Now,

    /// Never; cancel the event.
    Unset,

    /// Leave the event as it is.
    Keep,
}

/// Something that runs zone events at scheduled times.
pub trait EventScheduler {
    /// Reschedules events of `zone`. All of `events` take effect
    /// together.
    fn schedule(&self, zone: &Name, events: &[(ZoneEvent, EventTime)]);

    /// Returns when `event` of `zone` is scheduled, if it is.
    fn time_of(&self, zone: &Name, event: ZoneEvent) -> Option<u64>;
}

/// An in-memory [`EventScheduler`]. Due events are collected with
/// [`ZoneEvents::take_due`].
pub struct ZoneEvents {
    scheduled: Mutex<HashMap<(Name, ZoneEvent), u64>>,
    clock: fn() -> u64,
}

impl ZoneEvents {
    pub fn new() -> Self {
        Self::with_clock(unix_now)
    }

    /// Creates a scheduler that resolves [`EventTime::Now`] with
    /// `clock`.
    pub fn with_clock(clock: fn() -> u64) -> Self {
        Self {
            scheduled: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Removes and returns the events due at `now`, earliest first.
    pub fn take_due(&self, now: u64) -> Vec<(Name, ZoneEvent)> {
        let mut scheduled = self.scheduled.lock().unwrap();
        let mut due: Vec<_> = scheduled
            .iter()
            .filter(|(_, time)| **time <= now)
            .map(|(key, time)| (*time, key.clone()))
            .collect();
        due.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1 .1.cmp(&b.1 .1)));
        due.into_iter()
            .map(|(_, key)| {
                scheduled.remove(&key);
                key
            })
            .collect()
    }

    /// Returns the time of the earliest scheduled event.
    pub fn next_time(&self) -> Option<u64> {
        self.scheduled.lock().unwrap().values().min().copied()
    }
}

impl Default for ZoneEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ZoneEvents {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ZoneEvents")
            .field("scheduled", &self.scheduled)
            .finish()
    }
}

impl EventScheduler for ZoneEvents {
    fn schedule(&self, zone: &Name, events: &[(ZoneEvent, EventTime)]) {
        let now = (self.clock)();
        let mut scheduled = self.scheduled.lock().unwrap();
        for (event, time) in events {
            let key = (zone.clone(), *event);
            match time {
                EventTime::At(time) => {
                    scheduled.insert(key, *time);
                }
                EventTime::Now => {
                    scheduled.insert(key, now);
                }
                EventTime::Unset => {
                    scheduled.remove(&key);
                }
                EventTime::Keep => (),
            }
        }
    }

    fn time_of(&self, zone: &Name, event: ZoneEvent) -> Option<u64> {
        self.scheduled
            .lock()
            .unwrap()
            .get(&(zone.clone(), event))
            .copied()
    }
}

/// Timers a zone keeps between events.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ZoneTimers {
    /// When the NSEC3 salt was last replaced.
    pub last_resalt: Option<u64>,

    /// When the parent's DS RRset is next to be checked.
    pub next_parent_ds_q: Option<u64>,
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use lazy_static::lazy_static;

    use super::*;

    lazy_static! {
        static ref ZONE: Name = "quandary.test.".parse().unwrap();
    }

    fn clock() -> u64 {
        1000
    }

    #[test]
    fn schedule_applies_each_kind_of_time() {
        let events = ZoneEvents::with_clock(clock);
        events.schedule(
            &ZONE,
            &[
                (ZoneEvent::Dnssec, EventTime::At(5000)),
                (ZoneEvent::Notify, EventTime::Now),
                (ZoneEvent::Nsec3Resalt, EventTime::At(9000)),
            ],
        );
        assert_eq!(events.time_of(&ZONE, ZoneEvent::Dnssec), Some(5000));
        assert_eq!(events.time_of(&ZONE, ZoneEvent::Notify), Some(1000));

        events.schedule(
            &ZONE,
            &[
                (ZoneEvent::Dnssec, EventTime::Unset),
                (ZoneEvent::Nsec3Resalt, EventTime::Keep),
                (ZoneEvent::ParentDsQuery, EventTime::Keep),
            ],
        );
        assert_eq!(events.time_of(&ZONE, ZoneEvent::Dnssec), None);
        assert_eq!(events.time_of(&ZONE, ZoneEvent::Nsec3Resalt), Some(9000));
        assert_eq!(events.time_of(&ZONE, ZoneEvent::ParentDsQuery), None);
    }

    #[test]
    fn take_due_removes_due_events_in_order() {
        let events = ZoneEvents::with_clock(clock);
        let other: Name = "other.test.".parse().unwrap();
        events.schedule(&ZONE, &[(ZoneEvent::Dnssec, EventTime::At(3000))]);
        events.schedule(&ZONE, &[(ZoneEvent::Notify, EventTime::Now)]);
        events.schedule(&other, &[(ZoneEvent::Dnssec, EventTime::At(2000))]);
        assert_eq!(events.next_time(), Some(1000));

        let due = events.take_due(2500);
        assert_eq!(
            due,
            vec![
                (ZONE.clone(), ZoneEvent::Notify),
                (other, ZoneEvent::Dnssec)
            ]
        );
        assert_eq!(events.next_time(), Some(3000));
        assert!(events.take_due(2500).is_empty());
    }
}
