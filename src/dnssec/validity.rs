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

//! Deciding whether an RRset is already signed.

use super::context::{DnssecContext, ZoneSignContext};
use super::crypto::SignContext;
use super::key::ZoneKey;
use super::rrset_sign::check_signature;
use super::sign::use_key;
use crate::rr::{rrsig, Rrset};

/// Looks for a usable signature of `covered` by `key` among `rrsigs`.
/// Returns its index in `rrsigs`, if there is one.
///
/// Signatures that fail to check for any reason are not usable, so
/// this never fails.
pub fn valid_signature_exists(
    covered: &Rrset,
    rrsigs: Option<&Rrset>,
    key: &ZoneKey,
    ctx: &mut dyn SignContext,
    dnssec: &DnssecContext,
) -> Option<usize> {
    rrsigs?.rdatas.iter().position(|rdata| {
        rrsig::key_tag_of(rdata) == Some(key.key_tag())
            && rrsig::type_covered_of(rdata) == Some(covered.rr_type)
            && check_signature(covered, rdata, key, ctx, dnssec).is_ok()
    })
}

/// Checks whether `covered` has a usable signature from every key that
/// should sign it.
pub fn all_signatures_exist(
    covered: &Rrset,
    rrsigs: Option<&Rrset>,
    sign_ctx: &mut ZoneSignContext,
) -> bool {
    let dnssec = sign_ctx.dnssec;
    (0..sign_ctx.count()).all(|i| {
        let (key, ctx) = sign_ctx.key_mut(i);
        !use_key(key, covered, &dnssec.policy)
            || valid_signature_exists(covered, rrsigs, key, ctx, dnssec).is_some()
    })
}
