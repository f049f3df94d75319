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

//! Maintenance of the apex DNSKEY, CDNSKEY, and CDS RRsets.

use log::{info, warn};

use super::context::DnssecContext;
use super::policy::CdsCdnskeyPublish;
use super::{Error, ZoneKey, ZoneKeyset};
use crate::class::Class;
use crate::name::Name;
use crate::rr::{dnskey, Rrset, Ttl, Type};
use crate::zone::{AddMode, Changeset, ZoneUpdate};

/// The key-related records of a zone apex.
#[derive(Clone, Debug)]
pub struct KeyRecords {
    pub dnskey: Rrset,
    pub cdnskey: Rrset,
    pub cds: Rrset,

    /// Signatures over the above, when they are made offline.
    pub rrsig: Rrset,
}

impl KeyRecords {
    /// Creates empty RRsets owned by `apex`.
    pub fn new(apex: &Name, class: Class, ttl: Ttl) -> Self {
        let rrset = |rr_type| Rrset::new(apex.clone(), rr_type, class, ttl);
        Self {
            dnskey: rrset(Type::DNSKEY),
            cdnskey: rrset(Type::CDNSKEY),
            cds: rrset(Type::CDS),
            rrsig: rrset(Type::RRSIG),
        }
    }
}

/// Selects the KSKs to publish in CDNSKEY and CDS records.
pub fn get_cdnskeys<'a>(keys: &'a ZoneKeyset, dnssec: &DnssecContext) -> Vec<&'a ZoneKey> {
    let mode = dnssec.policy.cds_cdnskey_publish;
    if !matches!(
        mode,
        CdsCdnskeyPublish::Rollover | CdsCdnskeyPublish::Always | CdsCdnskeyPublish::DoubleDs
    ) {
        return Vec::new();
    }

    let mut selected: Vec<_> = keys
        .iter()
        .filter(|key| key.is_ksk() && key.is_ready)
        .collect();

    if (mode == CdsCdnskeyPublish::Always && selected.is_empty())
        || mode == CdsCdnskeyPublish::DoubleDs
    {
        selected.extend(
            keys.iter()
                .filter(|key| key.is_ksk() && key.is_active && !key.is_ready),
        );
    }

    if selected.len() > mode.max_keys() {
        warn!(
            "{}: DNSSEC, published CDS/CDNSKEY records for too many ({}) keys",
            dnssec.zone,
            selected.len()
        );
    }
    selected
}

/// Adds the DNSKEY, CDNSKEY, and CDS records called for by `keys` and
/// the policy to `records`.
pub fn add_dnskeys(keys: &ZoneKeyset, dnssec: &DnssecContext, records: &mut KeyRecords) {
    for key in keys.iter().filter(|key| key.is_public) {
        records.dnskey.add_rdata(&key.dnskey_rdata());
    }

    for key in get_cdnskeys(keys, dnssec) {
        records.cdnskey.add_rdata(&key.dnskey_rdata());
        records
            .cds
            .add_rdata(&key.ds_rdata(dnssec.policy.cds_digest_type));
    }

    if dnssec.policy.cds_cdnskey_publish == CdsCdnskeyPublish::Empty {
        records.cdnskey.add_rdata(&dnskey::EMPTY_CDNSKEY);
        records.cds.add_rdata(&dnskey::EMPTY_CDS);
    }
}

/// Replaces the apex DNSKEY, CDNSKEY, and CDS RRsets of the zone with
/// the ones called for by `keys` and the policy.
///
/// Under an offline-KSK policy the records and their signatures are
/// loaded from key storage instead; the signatures are then kept in
/// [`DnssecContext::offline_rrsig`] for the signing that follows. If
/// loading fails, the records are built from `keys` after all.
///
/// Records that do not actually change leave no trace in the update's
/// diff. Returns when the next offline record set takes effect, if
/// one does.
pub fn update_dnskeys(
    update: &mut ZoneUpdate,
    keys: &ZoneKeyset,
    dnssec: &mut DnssecContext,
) -> Result<Option<u64>, Error> {
    let mut next_resign = None;

    let (changeset, records) = {
        let contents = update.new_contents();
        let soa = contents
            .apex_rrset(Type::SOA)
            .ok_or(Error::InvalidArgument("the zone has no SOA"))?;
        let apex = contents.name();

        let mut changeset = Changeset::new(apex.clone());
        for rr_type in [Type::DNSKEY, Type::CDNSKEY, Type::CDS] {
            if let Some(rrset) = contents.apex_rrset(rr_type) {
                changeset.remove_rrset(rrset, AddMode::Plain);
            }
        }

        let ttl = dnssec.policy.dnskey_ttl.unwrap_or(soa.ttl);
        let mut records = KeyRecords::new(apex, contents.class(), ttl);
        if dnssec.policy.offline_ksk {
            match dnssec.kasp.load_offline_records(apex, dnssec.now) {
                Ok(offline) => {
                    info!("{}: DNSSEC, using offline DNSKEY RRSIG", dnssec.zone);
                    records = offline.records;
                    next_resign = offline.next_resign;
                }
                Err(e) => {
                    warn!(
                        "{}: DNSSEC, failed to load offline DNSKEY RRSIG ({})",
                        dnssec.zone, e
                    );
                    add_dnskeys(keys, dnssec, &mut records);
                }
            }
        } else {
            add_dnskeys(keys, dnssec, &mut records);
        }

        for rrset in [&records.cdnskey, &records.cds, &records.dnskey] {
            if !rrset.is_empty() {
                changeset.add_rrset(rrset, AddMode::CheckCancelOut);
            }
        }
        (changeset, records)
    };

    if !records.rrsig.is_empty() {
        dnssec.offline_rrsig = Some(records.rrsig);
    }
    update.apply_changeset(&changeset)?;
    Ok(next_resign)
}
