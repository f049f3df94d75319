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

//! Bringing the signatures of single RRsets and nodes up to date.
//!
//! Nothing here modifies a zone. Every function compares what the zone
//! holds with what the keys and the policy call for, and records the
//! difference in a [`Changeset`].

use super::context::{DnssecContext, ZoneSignContext};
use super::rrset_sign::{check_signature, sign_rrset};
use super::validity::valid_signature_exists;
use super::{Error, Policy, ZoneKey};
use crate::rr::rrsig::{self, synth_rrsig};
use crate::rr::{Rrset, Type};
use crate::util::earliest;
use crate::zone::{AddMode, Changeset, Node, NodeFlags};

////////////////////////////////////////////////////////////////////////
// PREDICATES                                                         //
////////////////////////////////////////////////////////////////////////

/// Decides whether `key` signs `covered`.
///
/// Keys that are neither active nor post-active sign nothing. Away from
/// the apex, ZSKs sign everything. At the apex, the DNSKEY RRset is
/// signed by KSKs (and so are CDS and CDNSKEY, unless the policy says
/// otherwise); everything else by ZSKs.
pub fn use_key(key: &ZoneKey, covered: &Rrset, policy: &Policy) -> bool {
    if !key.may_sign() {
        return false;
    }

    if covered.owner != *key.owner() {
        return key.is_zsk();
    }

    match covered.rr_type {
        Type::DNSKEY => key.is_ksk(),
        Type::CDS | Type::CDNSKEY if policy.cds_signed_by_ksk => key.is_ksk(),
        _ => key.is_zsk(),
    }
}

/// Decides whether `rrset`, owned by `node`, should be signed at all.
pub fn rr_should_be_signed(node: &Node, rrset: &Rrset) -> bool {
    if rrset.is_empty() || rrset.rr_type == Type::RRSIG {
        return false;
    }

    // Glue.
    if node.flags().contains(NodeFlags::NONAUTH) {
        return false;
    }

    // At delegation points, the child's data is authoritative.
    if node.flags().contains(NodeFlags::DELEG) {
        return matches!(rrset.rr_type, Type::NSEC | Type::DS);
    }

    true
}

/// Returns the stored offline signatures if `covered` is an apex key
/// record whose signatures are made offline.
fn offline_signed<'a>(covered: &Rrset, dnssec: &'a DnssecContext) -> Option<&'a Rrset> {
    if covered.owner != dnssec.zone {
        return None;
    }
    let offline_rrsig = dnssec.offline_rrsig.as_ref()?;
    let signed = match covered.rr_type {
        Type::DNSKEY => true,
        Type::CDS | Type::CDNSKEY => dnssec.policy.cds_signed_by_ksk,
        _ => false,
    };
    signed.then_some(offline_rrsig)
}

////////////////////////////////////////////////////////////////////////
// RRSET RECONCILIATION                                               //
////////////////////////////////////////////////////////////////////////

/// Records the removal of the signatures of `covered` among `rrsigs`
/// that no current key vouches for.
///
/// A signature is kept if an active or post-active key with its key
/// tag successfully checks it, and its expiration is folded into
/// `expires_at`. A key keeps at most one signature. Signatures made
/// offline are kept as long as key storage still provides them. A check that fails
/// for any reason but an invalid signature aborts everything.
///
/// The returned vector tells, for each key of `sign_ctx`, whether a
/// signature by that key is being kept.
pub fn remove_expired_rrsigs(
    covered: &Rrset,
    rrsigs: Option<&Rrset>,
    sign_ctx: &mut ZoneSignContext,
    changeset: &mut Changeset,
    expires_at: &mut Option<u64>,
) -> Result<Vec<bool>, Error> {
    let mut kept = vec![false; sign_ctx.count()];
    let synth = match rrsigs.and_then(|rrsigs| synth_rrsig(covered.rr_type, rrsigs)) {
        Some(synth) => synth,
        None => return Ok(kept),
    };

    let dnssec = sign_ctx.dnssec;
    let stored = offline_signed(covered, dnssec);
    let mut to_remove = Rrset::init_from(&synth);
    for rdata in synth.rdatas.iter() {
        if stored.map_or(false, |stored| stored.rdatas.contains(rdata)) {
            continue;
        }
        let key_tag = rrsig::key_tag_of(rdata);
        let mut keep = false;

        for (i, key_kept) in kept.iter_mut().enumerate() {
            let (key, ctx) = sign_ctx.key_mut(i);
            if !key.may_sign() || Some(key.key_tag()) != key_tag {
                continue;
            }
            match check_signature(covered, rdata, key, ctx, dnssec) {
                Ok(expiration) => {
                    if !*key_kept {
                        *key_kept = true;
                        keep = true;
                        *expires_at = earliest(*expires_at, Some(expiration));
                    }
                    break;
                }
                Err(Error::InvalidSignature) => continue,
                Err(e) => return Err(e),
            }
        }

        if !keep {
            to_remove.add_rdata(rdata);
        }
    }

    if !to_remove.is_empty() {
        changeset.remove_rrset(&to_remove, AddMode::Plain);
    }
    Ok(kept)
}

/// Records the addition of signatures of `covered` by every key that
/// should sign it but has no usable signature yet.
///
/// `valid` may give, per key, whether a usable signature is known to
/// exist (as returned by [`remove_expired_rrsigs`]). Without it, the
/// signatures in `rrsigs` are checked.
///
/// Apex key records that are signed offline are not signed here: the
/// stored signatures that `rrsigs` lacks are added instead.
pub fn add_missing_rrsigs(
    covered: &Rrset,
    rrsigs: Option<&Rrset>,
    valid: Option<&[bool]>,
    sign_ctx: &mut ZoneSignContext,
    changeset: &mut Changeset,
    expires_at: &mut Option<u64>,
) -> Result<(), Error> {
    let dnssec = sign_ctx.dnssec;
    if let Some(offline_rrsig) = offline_signed(covered, dnssec) {
        if let Some(mut stored) = synth_rrsig(covered.rr_type, offline_rrsig) {
            if let Some(present) = rrsigs {
                stored.rdatas.subtract(&present.rdatas);
            }
            if !stored.is_empty() {
                changeset.add_rrset(&stored, AddMode::Check);
            }
        }
        return Ok(());
    }

    let mut to_add = Rrset::new(
        covered.owner.clone(),
        Type::RRSIG,
        covered.class,
        covered.ttl,
    );
    for i in 0..sign_ctx.count() {
        let (key, ctx) = sign_ctx.key_mut(i);
        if !use_key(key, covered, &dnssec.policy) {
            continue;
        }
        let signed = match valid {
            Some(valid) => valid[i],
            None => valid_signature_exists(covered, rrsigs, key, ctx, dnssec).is_some(),
        };
        if !signed {
            sign_rrset(&mut to_add, covered, key, ctx, dnssec, expires_at)?;
        }
    }

    if !to_add.is_empty() {
        changeset.add_rrset(&to_add, AddMode::Plain);
    }
    Ok(())
}

/// Records the removal of every signature in `rrsigs` covering
/// `rr_type`.
pub fn remove_rrset_rrsigs(rr_type: Type, rrsigs: Option<&Rrset>, changeset: &mut Changeset) {
    if let Some(synth) = rrsigs.and_then(|rrsigs| synth_rrsig(rr_type, rrsigs)) {
        changeset.remove_rrset(&synth, AddMode::Plain);
    }
}

/// Replaces every signature of `covered`, valid or not.
pub fn force_resign_rrset(
    covered: &Rrset,
    rrsigs: Option<&Rrset>,
    sign_ctx: &mut ZoneSignContext,
    changeset: &mut Changeset,
    expires_at: &mut Option<u64>,
) -> Result<(), Error> {
    remove_rrset_rrsigs(covered.rr_type, rrsigs, changeset);
    let none = vec![false; sign_ctx.count()];
    add_missing_rrsigs(covered, None, Some(&none), sign_ctx, changeset, expires_at)
}

/// Replaces the signatures of `covered` that are invalid or due for
/// refresh, and adds the ones that are missing.
pub fn resign_rrset(
    covered: &Rrset,
    rrsigs: Option<&Rrset>,
    sign_ctx: &mut ZoneSignContext,
    changeset: &mut Changeset,
    expires_at: &mut Option<u64>,
) -> Result<(), Error> {
    let valid = remove_expired_rrsigs(covered, rrsigs, sign_ctx, changeset, expires_at)?;
    add_missing_rrsigs(covered, rrsigs, Some(&valid), sign_ctx, changeset, expires_at)
}

////////////////////////////////////////////////////////////////////////
// NODE RECONCILIATION                                                //
////////////////////////////////////////////////////////////////////////

/// Records the removal of signatures in `rrsigs` covering types that
/// `node` no longer has.
pub fn remove_standalone_rrsigs(node: &Node, rrsigs: Option<&Rrset>, changeset: &mut Changeset) {
    let rrsigs = match rrsigs {
        Some(rrsigs) => rrsigs,
        None => return,
    };
    let mut to_remove = Rrset::init_from(rrsigs);
    for rdata in rrsigs.rdatas.iter() {
        match rrsig::type_covered_of(rdata) {
            Some(covered) if node.has_type(covered) => (),
            _ => {
                to_remove.add_rdata(rdata);
            }
        }
    }
    if !to_remove.is_empty() {
        changeset.remove_rrset(&to_remove, AddMode::Plain);
    }
}

/// Brings the signatures of every RRset of `node` up to date. RRsets
/// that should not be signed lose any signatures they have.
pub fn sign_node_rrsets(
    node: &Node,
    sign_ctx: &mut ZoneSignContext,
    changeset: &mut Changeset,
    expires_at: &mut Option<u64>,
) -> Result<(), Error> {
    let rrsigs = node.rrset(Type::RRSIG);
    for rrset in node.rrsets() {
        if !rr_should_be_signed(node, rrset) {
            remove_rrset_rrsigs(rrset.rr_type, rrsigs, changeset);
            continue;
        }
        if sign_ctx.dnssec.rrsig_drop_existing {
            force_resign_rrset(rrset, rrsigs, sign_ctx, changeset, expires_at)?;
        } else {
            resign_rrset(rrset, rrsigs, sign_ctx, changeset, expires_at)?;
        }
    }
    remove_standalone_rrsigs(node, rrsigs, changeset);
    Ok(())
}
