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

//! Implements the `sign` and `keygen` commands.

use std::io::{self, Write};
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Local};
use env_logger::Env;
use log::error;

use quandary_signer::dnssec::events::unix_now;
use quandary_signer::dnssec::zone_events::{sign_zone, SignFlags};
use quandary_signer::dnssec::{DnssecContext, HmacSha256Key};
use quandary_signer::rr::Rrset;
use quandary_signer::zone::{Changeset, ZoneUpdate};

use crate::args::SignArgs;
use crate::config;
use crate::describe_error;

/// Signs the zone once and prints what changed.
pub fn sign(args: SignArgs) {
    env_logger::init_from_env(Env::new().default_filter_or("warn"));

    if let Err(e) = try_signing(args) {
        error!("{}", describe_error("Failed to sign:", &e));
        process::exit(1);
    }
}

fn try_signing(args: SignArgs) -> Result<()> {
    let config =
        config::load_from_path(&args.config).context("failed to load the configuration")?;
    let mut policy = config.policy.to_policy();
    if let Some(threads) = args.threads {
        policy.signing_threads = threads;
    }
    let contents = config.zone_contents().context("failed to load the zone")?;
    let keys = config.keyset().context("failed to load the keys")?;
    let kasp = config.kasp().context("failed to load the offline key records")?;

    let now = args.now.unwrap_or_else(unix_now);
    let mut dnssec = DnssecContext::new(contents.name().clone(), now, policy, kasp);
    let flags = SignFlags {
        drop_signatures: args.force_resign,
        nsec3_resalt: false,
    };
    let mut update = ZoneUpdate::incremental(Arc::new(contents));
    let result = sign_zone(&mut update, &keys, &mut dnssec, flags, None)
        .context("failed to sign the zone")?;

    let mut out = io::stdout().lock();
    write_changeset(&mut out, update.change()).context("failed to print the changes")?;
    let written = match result.next_sign.and_then(format_time) {
        Some(at) => writeln!(out, "; next signing at {}", at),
        None => writeln!(out, "; next signing not scheduled"),
    };
    written.context("failed to print the changes")?;
    Ok(())
}

/// Writes a changeset as a diff: removed records prefixed with `-`,
/// then added ones prefixed with `+`.
fn write_changeset(out: &mut impl Write, changeset: &Changeset) -> io::Result<()> {
    if changeset.is_empty() {
        return writeln!(out, "; no changes");
    }
    for rrset in changeset.soa_from.iter().chain(changeset.removals()) {
        write_rrset(out, '-', rrset)?;
    }
    for rrset in changeset.soa_to.iter().chain(changeset.additions()) {
        write_rrset(out, '+', rrset)?;
    }
    Ok(())
}

fn write_rrset(out: &mut impl Write, prefix: char, rrset: &Rrset) -> io::Result<()> {
    for line in rrset.to_string().lines() {
        writeln!(out, "{}{}", prefix, line)?;
    }
    Ok(())
}

fn format_time(secs: u64) -> Option<String> {
    let at = DateTime::from_timestamp(i64::try_from(secs).ok()?, 0)?;
    Some(
        at.with_timezone(&Local)
            .format("%Y-%m-%dT%H:%M:%S%z")
            .to_string(),
    )
}

/// Prints a freshly generated, base64-encoded key secret.
pub fn keygen() {
    let key = HmacSha256Key::generate();
    println!("{}", BASE64.encode(key.secret()));
}
