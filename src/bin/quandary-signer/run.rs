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

//! Implements the `run` command (i.e., keeping the zone signed).

use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use env_logger::Env;
use log::{debug, error, info, warn};
use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
use signal_hook::iterator::Signals;

use quandary_signer::dnssec::events::{unix_now, EventScheduler, EventTime, ZoneEvent, ZoneEvents};
use quandary_signer::dnssec::ManagedZone;
use quandary_signer::rr::{soa, Type};

use crate::args::RunArgs;
use crate::config;
use crate::describe_error;

/// How long to wait before retrying a failed signing pass, in seconds.
const RETRY_DELAY: u64 = 60;

/// Runs the signer until it is told to stop.
pub fn run(args: RunArgs) {
    env_logger::init_from_env(Env::new().default_filter_or("warn"));

    if let Err(e) = try_running(args) {
        let mut message = describe_error("Failed to run:", &e);
        message.push_str("\nExiting with failure.");
        error!("{}", message);
        process::exit(1);
    }
    info!("Exiting with success.");
}

fn try_running(args: RunArgs) -> Result<()> {
    info!(
        "Quandary signer v{}.{}.{} starting.",
        env!("CARGO_PKG_VERSION_MAJOR"),
        env!("CARGO_PKG_VERSION_MINOR"),
        env!("CARGO_PKG_VERSION_PATCH"),
    );

    info!("Loading the configuration from {}.", args.config.display());
    let config =
        config::load_from_path(&args.config).context("failed to load the configuration")?;
    let zone = Arc::new(ManagedZone::new(
        config.zone_contents().context("failed to load the zone")?,
        config.keyset().context("failed to load the keys")?,
        config.policy.to_policy(),
        config
            .kasp()
            .context("failed to load the offline key records")?,
    ));

    // Set up signal handling before anything runs in the background.
    let mut signals = set_up_signal_handling().context("failed to set up signal handling")?;

    let events = Arc::new(ZoneEvents::new());
    events.schedule(zone.name(), &[(ZoneEvent::Dnssec, EventTime::Now)]);
    let shutdown = Arc::new(AtomicBool::new(false));
    let event_loop = {
        let zone = zone.clone();
        let events = events.clone();
        let shutdown = shutdown.clone();
        thread::Builder::new()
            .name("event loop".to_string())
            .spawn(move || run_events(&zone, &events, &shutdown))
            .context("failed to start the event loop")?
    };
    info!("Set-up is complete; signing {}.", zone.name());

    // Process incoming signals.
    for signal in signals.forever() {
        match signal {
            s @ (SIGINT | SIGTERM) => {
                let name = match s {
                    SIGINT => "SIGINT",
                    SIGTERM => "SIGTERM",
                    _ => unreachable!(),
                };
                info!("Received {}; shutting down.", name);
                break;
            }
            SIGHUP => {
                info!("Received SIGHUP; dropping all signatures on the next pass.");
                zone.set_force_resign();
                events.schedule(zone.name(), &[(ZoneEvent::Dnssec, EventTime::Now)]);
                event_loop.thread().unpark();
            }
            _ => unreachable!(),
        }
    }

    shutdown.store(true, Ordering::SeqCst);
    event_loop.thread().unpark();
    event_loop
        .join()
        .map_err(|_| anyhow!("the event loop panicked"))?;
    info!("Shutdown complete.");
    Ok(())
}

fn set_up_signal_handling() -> Result<Signals> {
    let all_signals = &[SIGHUP, SIGINT, SIGTERM];
    let term_signals = &[SIGINT, SIGTERM];
    let already_terminating = Arc::new(AtomicBool::new(false));

    // This sets up signal handlers to exit immediately if a second
    // termination signal arrives before the process finishes shutting
    // down gracefully.
    for sig in term_signals {
        signal_hook::flag::register_conditional_shutdown(*sig, 1, already_terminating.clone())?;
        signal_hook::flag::register(*sig, already_terminating.clone())?;
    }

    Signals::new(all_signals).map_err(Into::into)
}

////////////////////////////////////////////////////////////////////////
// EVENT LOOP                                                         //
////////////////////////////////////////////////////////////////////////

/// Runs the zone's events as they come due, until `shutdown` is set.
/// The thread is unparked whenever something changes from outside.
fn run_events(zone: &ManagedZone, events: &ZoneEvents, shutdown: &AtomicBool) {
    while !shutdown.load(Ordering::SeqCst) {
        let now = unix_now();
        for (_, event) in events.take_due(now) {
            handle_event(zone, events, event, now);
        }

        match events.next_time() {
            Some(at) => {
                let now = unix_now();
                if at > now {
                    thread::park_timeout(Duration::from_secs(at - now));
                }
            }
            None => thread::park(),
        }
    }
}

fn handle_event(zone: &ManagedZone, events: &ZoneEvents, event: ZoneEvent, now: u64) {
    debug!("{}: running the {} event.", zone.name(), event);
    match event {
        ZoneEvent::Dnssec => {
            if let Err(e) = zone.event_dnssec(events, now) {
                error!(
                    "{}: DNSSEC, failed to sign the zone ({}); retrying in {} seconds",
                    zone.name(),
                    e,
                    RETRY_DELAY
                );
                events.schedule(
                    zone.name(),
                    &[(ZoneEvent::Dnssec, EventTime::At(now + RETRY_DELAY))],
                );
            }
        }
        ZoneEvent::Nsec3Resalt => {
            // The salt is replaced by a signing pass.
            events.schedule(zone.name(), &[(ZoneEvent::Dnssec, EventTime::Now)]);
        }
        ZoneEvent::ParentDsQuery => {
            warn!(
                "{}: DS check, no parent servers configured, not checking",
                zone.name()
            );
        }
        ZoneEvent::Notify => {
            let contents = zone.contents();
            let serial = contents
                .apex_rrset(Type::SOA)
                .and_then(|soa| soa.rdatas.get(0))
                .and_then(|rdata| soa::serial(rdata).ok());
            match serial {
                Some(serial) => info!("{}: NOTIFY, zone published with serial {}", zone.name(), serial),
                None => warn!("{}: NOTIFY, zone published without a readable SOA", zone.name()),
            }
        }
    }
}
