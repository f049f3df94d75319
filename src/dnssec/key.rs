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

//! Zone keys as seen by the signing engine.

use std::fmt;
use std::sync::Arc;

use sha1::Sha1;
use sha2::{Digest, Sha256};

use super::crypto::SigningKey;
use crate::name::Name;
use crate::rr::dnskey;

/// A snapshot of one key of a zone.
///
/// The role flags are fixed when the key is created; the lifecycle
/// flags describe where the key-rollover machinery currently has the
/// key and may be changed between signing passes.
#[derive(Clone)]
pub struct ZoneKey {
    owner: Name,
    key: Arc<dyn SigningKey>,
    key_tag: u16,
    is_ksk: bool,
    is_zsk: bool,

    /// The key signs records.
    pub is_active: bool,

    /// The key no longer signs, but its signatures are kept until they
    /// expire.
    pub is_post_active: bool,

    /// The key (a KSK) is ready to be referenced by the parent's DS.
    pub is_ready: bool,

    /// The key is published in the DNSKEY RRset.
    pub is_public: bool,
}

impl ZoneKey {
    /// Creates an active, published key. A key may be both a KSK and a
    /// ZSK (a combined signing key).
    pub fn new(owner: Name, key: Arc<dyn SigningKey>, is_ksk: bool, is_zsk: bool) -> Self {
        let flags = Self::flags_for(is_ksk);
        let key_tag = dnskey::key_tag(&dnskey::compose(flags, key.algorithm(), &key.public_key()));
        Self {
            owner,
            key,
            key_tag,
            is_ksk,
            is_zsk,
            is_active: true,
            is_post_active: false,
            is_ready: false,
            is_public: true,
        }
    }

    fn flags_for(is_ksk: bool) -> u16 {
        if is_ksk {
            dnskey::FLAG_ZONE | dnskey::FLAG_SEP
        } else {
            dnskey::FLAG_ZONE
        }
    }

    pub fn owner(&self) -> &Name {
        &self.owner
    }

    pub fn key(&self) -> &Arc<dyn SigningKey> {
        &self.key
    }

    pub fn key_tag(&self) -> u16 {
        self.key_tag
    }

    pub fn algorithm(&self) -> u8 {
        self.key.algorithm()
    }

    pub fn is_ksk(&self) -> bool {
        self.is_ksk
    }

    pub fn is_zsk(&self) -> bool {
        self.is_zsk
    }

    /// Returns whether signatures made by this key may remain in the
    /// zone.
    pub fn may_sign(&self) -> bool {
        self.is_active || self.is_post_active
    }

    /// Returns the DNSKEY flags of the key.
    pub fn flags(&self) -> u16 {
        Self::flags_for(self.is_ksk)
    }

    /// Returns the key's DNSKEY (and CDNSKEY) RDATA.
    pub fn dnskey_rdata(&self) -> Vec<u8> {
        dnskey::compose(self.flags(), self.algorithm(), &self.key.public_key())
    }

    /// Returns the key's DS (and CDS) RDATA ([RFC 4034 § 5.1.4]).
    ///
    /// [RFC 4034 § 5.1.4]: https://datatracker.ietf.org/doc/html/rfc4034#section-5.1.4
    pub fn ds_rdata(&self, digest_type: DigestType) -> Vec<u8> {
        let mut data = self.owner.canonical_wire();
        data.extend_from_slice(&self.dnskey_rdata());
        let digest = match digest_type {
            DigestType::Sha1 => Sha1::digest(&data).to_vec(),
            DigestType::Sha256 => Sha256::digest(&data).to_vec(),
        };

        let mut out = Vec::with_capacity(4 + digest.len());
        out.extend_from_slice(&self.key_tag.to_be_bytes());
        out.push(self.algorithm());
        out.push(digest_type as u8);
        out.extend_from_slice(&digest);
        out
    }
}

impl fmt::Debug for ZoneKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ZoneKey")
            .field("owner", &self.owner)
            .field("key_tag", &self.key_tag)
            .field("algorithm", &self.algorithm())
            .field("is_ksk", &self.is_ksk)
            .field("is_zsk", &self.is_zsk)
            .field("is_active", &self.is_active)
            .field("is_post_active", &self.is_post_active)
            .field("is_ready", &self.is_ready)
            .field("is_public", &self.is_public)
            .finish()
    }
}

/// DS digest types.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DigestType {
    Sha1 = 1,
    Sha256 = 2,
}

/// The keys applicable to a zone, along with what the key-rollover
/// machinery reported about them.
#[derive(Clone, Debug, Default)]
pub struct ZoneKeyset {
    pub keys: Vec<ZoneKey>,

    /// When the next key-rollover action is due.
    pub next_rollover: Option<u64>,

    /// Whether the parent's DS RRset should be checked, e.g. because a
    /// new KSK became ready.
    pub plan_ds_query: bool,
}

impl ZoneKeyset {
    pub fn new(keys: Vec<ZoneKey>) -> Self {
        Self {
            keys,
            next_rollover: None,
            plan_ds_query: false,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<ZoneKey> {
        self.keys.iter()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dnssec::crypto::HmacSha256Key;

    fn key(is_ksk: bool) -> ZoneKey {
        ZoneKey::new(
            "quandary.test.".parse().unwrap(),
            Arc::new(HmacSha256Key::new(b"key")),
            is_ksk,
            !is_ksk,
        )
    }

    #[test]
    fn flags_follow_role() {
        assert_eq!(key(true).flags(), 257);
        assert_eq!(key(false).flags(), 256);
        assert_ne!(key(true).key_tag(), key(false).key_tag());
    }

    #[test]
    fn key_tag_matches_dnskey_rdata() {
        let key = key(true);
        assert_eq!(key.key_tag(), dnskey::key_tag(&key.dnskey_rdata()));
    }

    #[test]
    fn ds_rdata_has_digest_of_right_length() {
        let key = key(true);
        let ds = key.ds_rdata(DigestType::Sha256);
        assert_eq!(ds.len(), 4 + 32);
        assert_eq!(&ds[..2], &key.key_tag().to_be_bytes());
        assert_eq!(ds[2], 253);
        assert_eq!(ds[3], 2);
        assert_eq!(key.ds_rdata(DigestType::Sha1).len(), 4 + 20);
    }

    #[test]
    fn new_keys_are_active_and_public() {
        let key = key(false);
        assert!(key.is_active && key.is_public && key.may_sign());
        assert!(!key.is_ready && !key.is_post_active);
    }
}
