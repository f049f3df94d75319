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

//! Signing whole zones and zone diffs, in parallel.
//!
//! The work (the nodes of a zone tree, or the RRsets of a diff) is dealt
//! out round-robin to [`Policy::signing_threads`](super::Policy) worker
//! threads. Each worker has its own [`ZoneSignContext`] and records its
//! results in a changeset of its own, so nothing is shared mutably while
//! the workers run. Once all of them are done, the changesets are
//! applied to the zone update in worker order.

use std::collections::BTreeSet;

use super::context::{DnssecContext, ZoneSignContext};
use super::sign::{
    add_missing_rrsigs, force_resign_rrset, remove_rrset_rrsigs, resign_rrset,
    rr_should_be_signed, sign_node_rrsets,
};
use super::validity::all_signatures_exist;
use super::{Error, ZoneKeyset};
use crate::name::Name;
use crate::rr::{Rrset, Type};
use crate::thread::{self, fan_out};
use crate::util::earliest;
use crate::zone::{Changeset, NodeFlags, ZoneContents, ZoneTree, ZoneUpdate};

const THREAD_NAME: &str = "DNSSEC signer";

/// Returns the worker that handles the `item_index`th work item.
pub fn assign(item_index: usize, thread_count: usize) -> usize {
    item_index % thread_count
}

/// What a worker produced.
struct WorkerOutput {
    changeset: Changeset,
    expires_at: Option<u64>,
}

impl WorkerOutput {
    fn new(dnssec: &DnssecContext) -> Self {
        Self {
            changeset: Changeset::new(dnssec.zone.clone()),
            expires_at: None,
        }
    }
}

type WorkerResult = Result<Result<WorkerOutput, Error>, thread::Error>;

/// Validates the policy and returns the number of signing threads.
fn check_policy(dnssec: &DnssecContext) -> Result<usize, Error> {
    dnssec.policy.validate()?;
    Ok(dnssec.policy.signing_threads)
}

/// Applies the workers' changesets to `update` in worker order and
/// folds their expirations into `expires_at`. The first failure found
/// is returned; nothing after it is applied.
fn apply_outputs(
    update: &mut ZoneUpdate,
    results: Vec<WorkerResult>,
    expires_at: &mut Option<u64>,
) -> Result<(), Error> {
    for result in results {
        let output = result??;
        update.apply_changeset(&output.changeset)?;
        *expires_at = earliest(*expires_at, output.expires_at);
    }
    Ok(())
}

////////////////////////////////////////////////////////////////////////
// FULL ZONE SIGNING                                                  //
////////////////////////////////////////////////////////////////////////

/// Brings the signatures of every authoritative node of one tree of the
/// zone up to date. Returns the earliest expiration among the
/// signatures kept or made, which is at most the expiration of a
/// signature made now.
fn zone_tree_sign(
    update: &mut ZoneUpdate,
    tree: fn(&ZoneContents) -> &ZoneTree,
    keys: &ZoneKeyset,
    dnssec: &DnssecContext,
) -> Result<Option<u64>, Error> {
    let threads = check_policy(dnssec)?;
    let mut expires_at = Some(dnssec.expiration());

    let results = {
        let nodes: Vec<_> = tree(update.new_contents())
            .values()
            .filter(|node| node.rrset_count() > 0 && !node.flags().contains(NodeFlags::NONAUTH))
            .collect();

        fan_out(THREAD_NAME, threads, |thread_index| -> Result<_, Error> {
            let mut sign_ctx = ZoneSignContext::new(keys, dnssec)?;
            let mut output = WorkerOutput::new(dnssec);
            for (i, node) in nodes.iter().enumerate() {
                if assign(i, threads) == thread_index {
                    sign_node_rrsets(
                        node,
                        &mut sign_ctx,
                        &mut output.changeset,
                        &mut output.expires_at,
                    )?;
                }
            }
            Ok(output)
        })
    };

    apply_outputs(update, results, &mut expires_at)?;
    Ok(expires_at)
}

/// Brings the signatures of the whole zone up to date: first the main
/// tree, then the NSEC3 tree. Returns the earliest signature
/// expiration.
pub fn zone_sign(
    update: &mut ZoneUpdate,
    keys: &ZoneKeyset,
    dnssec: &DnssecContext,
) -> Result<Option<u64>, Error> {
    check_policy(dnssec)?;
    let normal = zone_tree_sign(update, ZoneContents::nodes, keys, dnssec)?;
    let nsec3 = zone_tree_sign(update, ZoneContents::nsec3_nodes, keys, dnssec)?;
    Ok(earliest(normal, nsec3))
}

////////////////////////////////////////////////////////////////////////
// CHANGESET SIGNING                                                  //
////////////////////////////////////////////////////////////////////////

/// Brings the signatures of the `rr_type` RRset of `owner` up to date
/// after it changed. An RRset that no longer exists or should no longer
/// be signed loses its signatures; a node that no longer exists took
/// its signatures with it.
fn sign_changed_rrset(
    contents: &ZoneContents,
    owner: &Name,
    rr_type: Type,
    sign_ctx: &mut ZoneSignContext,
    output: &mut WorkerOutput,
) -> Result<(), Error> {
    let node = match contents.find_node(owner) {
        Some(node) => node,
        None => return Ok(()),
    };
    let rrsigs = node.rrset(Type::RRSIG);
    match node.rrset(rr_type) {
        Some(rrset) if rr_should_be_signed(node, rrset) => resign_rrset(
            rrset,
            rrsigs,
            sign_ctx,
            &mut output.changeset,
            &mut output.expires_at,
        ),
        _ => {
            remove_rrset_rrsigs(rr_type, rrsigs, &mut output.changeset);
            Ok(())
        }
    }
}

/// Brings the signatures of the RRsets changed by `update` up to date.
///
/// Signatures are not considered changed RRsets themselves. The SOA is
/// handled once, on the calling thread, after the workers are done.
fn sign_changeset(
    update: &mut ZoneUpdate,
    keys: &ZoneKeyset,
    dnssec: &DnssecContext,
) -> Result<Option<u64>, Error> {
    let threads = check_policy(dnssec)?;
    let mut expires_at = None;

    let (results, soa_output) = {
        let contents = update.new_contents();
        let change = update.change();
        let items: BTreeSet<(&Name, Type)> = change
            .iter_all()
            .filter(|rrset| !matches!(rrset.rr_type, Type::RRSIG | Type::SOA))
            .map(|rrset| (&rrset.owner, rrset.rr_type))
            .collect();

        let results = fan_out(THREAD_NAME, threads, |thread_index| -> Result<_, Error> {
            let mut sign_ctx = ZoneSignContext::new(keys, dnssec)?;
            let mut output = WorkerOutput::new(dnssec);
            for (i, (owner, rr_type)) in items.iter().enumerate() {
                if assign(i, threads) == thread_index {
                    sign_changed_rrset(contents, owner, *rr_type, &mut sign_ctx, &mut output)?;
                }
            }
            Ok(output)
        });

        let soa_output = if change.soa_from.is_some() || change.soa_to.is_some() {
            let mut sign_ctx = ZoneSignContext::new(keys, dnssec)?;
            let mut output = WorkerOutput::new(dnssec);
            sign_changed_rrset(contents, contents.name(), Type::SOA, &mut sign_ctx, &mut output)?;
            Some(output)
        } else {
            None
        };

        (results, soa_output)
    };

    apply_outputs(update, results, &mut expires_at)?;
    if let Some(output) = soa_output {
        update.apply_changeset(&output.changeset)?;
        expires_at = earliest(expires_at, output.expires_at);
    }
    Ok(expires_at)
}

/// Returns whether `update` changed the apex DNSKEY or NSEC3PARAM
/// RRsets. Such a change may affect the signatures of the whole zone.
pub fn apex_dnssec_changed(update: &ZoneUpdate) -> bool {
    let old = match update.old_contents() {
        Some(old) => old,
        None => return false,
    };
    let new = update.new_contents();
    [Type::DNSKEY, Type::NSEC3PARAM]
        .into_iter()
        .any(|rr_type| old.apex_rrset(rr_type) != new.apex_rrset(rr_type))
}

/// Brings the signatures of the zone up to date after `update` changed
/// it: the RRsets the update changed, or the whole zone if the change
/// may affect all of it. Returns the earliest expiration among the
/// signatures considered.
pub fn zone_sign_update(
    update: &mut ZoneUpdate,
    keys: &ZoneKeyset,
    dnssec: &DnssecContext,
) -> Result<Option<u64>, Error> {
    check_policy(dnssec)?;
    if apex_dnssec_changed(update) {
        zone_sign(update, keys, dnssec)
    } else {
        sign_changeset(update, keys, dnssec)
    }
}

////////////////////////////////////////////////////////////////////////
// SOA AND DENIAL-OF-EXISTENCE RECORDS                                //
////////////////////////////////////////////////////////////////////////

fn apex_soa(contents: &ZoneContents) -> Result<&Rrset, Error> {
    contents
        .apex_rrset(Type::SOA)
        .ok_or(Error::InvalidArgument("the zone has no SOA"))
}

/// Replaces the signatures of the SOA.
pub fn sign_soa(update: &mut ZoneUpdate, keys: &ZoneKeyset, dnssec: &DnssecContext) -> Result<(), Error> {
    let changeset = {
        let contents = update.new_contents();
        let soa = apex_soa(contents)?;
        let rrsigs = contents.apex_rrset(Type::RRSIG);
        let mut sign_ctx = ZoneSignContext::new(keys, dnssec)?;
        let mut output = WorkerOutput::new(dnssec);
        force_resign_rrset(
            soa,
            rrsigs,
            &mut sign_ctx,
            &mut output.changeset,
            &mut output.expires_at,
        )?;
        output.changeset
    };
    update.apply_changeset(&changeset)?;
    Ok(())
}

/// Returns whether the SOA lacks a usable signature from some key that
/// should sign it.
pub fn soa_expired(contents: &ZoneContents, keys: &ZoneKeyset, dnssec: &DnssecContext) -> Result<bool, Error> {
    let soa = apex_soa(contents)?;
    let rrsigs = contents.apex_rrset(Type::RRSIG);
    let mut sign_ctx = ZoneSignContext::new(keys, dnssec)?;
    Ok(!all_signatures_exist(soa, rrsigs, &mut sign_ctx))
}

/// Adds signatures for the NSEC, NSEC3, and NSEC3PARAM records that
/// `changeset` adds.
pub fn sign_nsecs_in_changeset(
    keys: &ZoneKeyset,
    dnssec: &DnssecContext,
    changeset: &mut Changeset,
) -> Result<(), Error> {
    let nsecs: Vec<Rrset> = changeset
        .additions()
        .filter(|rrset| matches!(rrset.rr_type, Type::NSEC | Type::NSEC3 | Type::NSEC3PARAM))
        .cloned()
        .collect();

    let mut sign_ctx = ZoneSignContext::new(keys, dnssec)?;
    let unsigned = vec![false; sign_ctx.count()];
    let mut expires_at = None;
    for rrset in &nsecs {
        add_missing_rrsigs(
            rrset,
            None,
            Some(&unsigned),
            &mut sign_ctx,
            changeset,
            &mut expires_at,
        )?;
    }
    Ok(())
}
