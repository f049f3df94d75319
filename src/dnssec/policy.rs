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

//! Signing policy.

use super::key::DigestType;
use super::Error;
use crate::rr::Ttl;

const DAY: u64 = 24 * 60 * 60;

/// RRSIG timestamps are read in serial number arithmetic relative to
/// the current time, so a signature may not be valid for this long.
const MAX_RRSIG_LIFETIME: u64 = 1 << 31;

/// Which keys are advertised to the parent zone through CDS and
/// CDNSKEY records.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CdsCdnskeyPublish {
    /// Publish nothing.
    None,

    /// Publish the "delete DS" sentinel records of RFC 8078 § 4.
    Empty,

    /// Publish ready KSKs (i.e. during a KSK rollover).
    Rollover,

    /// Publish ready KSKs, or the active KSKs if none is ready.
    Always,

    /// Publish both ready and active KSKs, so that the parent may hold
    /// two DS records during a rollover.
    DoubleDs,
}

impl CdsCdnskeyPublish {
    /// The number of keys this mode is expected to publish at most.
    pub fn max_keys(self) -> usize {
        match self {
            Self::DoubleDs => 2,
            _ => 1,
        }
    }
}

/// The policy a zone is signed under. Times are in seconds.
#[derive(Clone, Debug)]
pub struct Policy {
    /// The validity period of new signatures.
    pub rrsig_lifetime: u64,

    /// How long before their expiration signatures are replaced.
    pub rrsig_refresh_before: u64,

    /// The number of threads used to sign a zone. Must be at least 1.
    pub signing_threads: usize,

    /// Whether KSK signatures are produced elsewhere and loaded from key
    /// storage.
    pub offline_ksk: bool,

    pub cds_cdnskey_publish: CdsCdnskeyPublish,

    /// Whether CDS and CDNSKEY RRsets are signed by the KSK (like the
    /// DNSKEY RRset) rather than by the ZSK.
    pub cds_signed_by_ksk: bool,

    pub cds_digest_type: DigestType,

    /// The TTL of DNSKEY, CDNSKEY, and CDS records. Defaults to the TTL
    /// of the SOA.
    pub dnskey_ttl: Option<Ttl>,

    /// How often the NSEC3 salt is replaced, if at all.
    pub nsec3_salt_lifetime: Option<u64>,
}

impl Policy {
    /// Checks that zones can be signed under this policy, with every
    /// new signature outliving its refresh time.
    pub fn validate(&self) -> Result<(), Error> {
        if self.signing_threads == 0 {
            Err(Error::InvalidArgument("at least one signing thread is required"))
        } else if self.rrsig_refresh_before >= self.rrsig_lifetime {
            Err(Error::InvalidArgument(
                "RRSIG refresh time must be shorter than the RRSIG lifetime",
            ))
        } else if self.rrsig_lifetime >= MAX_RRSIG_LIFETIME {
            Err(Error::InvalidArgument("RRSIG lifetime is too long"))
        } else {
            Ok(())
        }
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            rrsig_lifetime: 14 * DAY,
            rrsig_refresh_before: 7 * DAY,
            signing_threads: 1,
            offline_ksk: false,
            cds_cdnskey_publish: CdsCdnskeyPublish::Rollover,
            cds_signed_by_ksk: true,
            cds_digest_type: DigestType::Sha256,
            dnskey_ttl: None,
            nsec3_salt_lifetime: None,
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_valid() {
        assert!(Policy::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_unusable_policies() {
        let invalid = [
            Policy {
                signing_threads: 0,
                ..Default::default()
            },
            Policy {
                rrsig_lifetime: 3 * DAY,
                ..Default::default()
            },
            Policy {
                rrsig_lifetime: 7 * DAY,
                ..Default::default()
            },
            Policy {
                rrsig_lifetime: MAX_RRSIG_LIFETIME,
                ..Default::default()
            },
        ];
        for policy in invalid {
            assert!(
                matches!(policy.validate(), Err(Error::InvalidArgument(_))),
                "{:?} was accepted",
                policy
            );
        }
    }

    #[test]
    fn validate_accepts_short_refresh_times() {
        let policy = Policy {
            rrsig_lifetime: 3 * DAY,
            rrsig_refresh_before: DAY,
            ..Default::default()
        };
        assert!(policy.validate().is_ok());
    }
}
