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

//! Implements the signer configuration file.

use std::fmt::{self, Write};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use log::Level::Debug;
use log::{debug, log_enabled};
use paste::paste;
use serde::{de, Deserialize};

use quandary_signer::class::Class;
use quandary_signer::dnssec::{
    CdsCdnskeyPublish, DigestType, HmacSha256Key, KeyRecords, MemoryKasp, Policy, ZoneKey,
    ZoneKeyset,
};
use quandary_signer::name::Name;
use quandary_signer::rr::{parse_rdata, Rrset, Ttl, Type};
use quandary_signer::zone::ZoneContents;

////////////////////////////////////////////////////////////////////////
// CONFIGURATION LOADING                                              //
////////////////////////////////////////////////////////////////////////

/// Loads the signer configuration from the file given by `path`.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let raw_config = fs::read(path.as_ref()).context("failed to read the configuration file")?;
    let config: Config =
        toml::from_slice(&raw_config).context("failed to parse the configuration file")?;
    config
        .policy
        .to_policy()
        .validate()
        .context("the signing policy is unusable")?;
    log_config_summary(&config);
    Ok(config)
}

/// Summarizes the configuration in the log, if the debug log level is
/// enabled.
fn log_config_summary(config: &Config) {
    if !log_enabled!(Debug) {
        // Don't compute the message if it will never be printed.
        return;
    }

    let mut message = format!(
        "Configuration loaded:\n\
         Zone:    {}/{} ({} records)\n\
         Threads: {}\n\
         Keys:    ",
        config.zone.name.0,
        config.zone.class.0,
        config.zone.records.len(),
        config.policy.signing_threads.unwrap_or(1),
    );
    if config.keys.is_empty() {
        message.push_str("none");
    } else {
        write!(message, "{}", config.keys.len()).unwrap();
        for key in &config.keys {
            write!(
                message,
                "\n  {} (active: {}, ready: {})",
                key.role, key.active, key.ready
            )
            .unwrap();
        }
    }
    if !config.offline.is_empty() {
        write!(message, "\nOffline: {} record sets", config.offline.len()).unwrap();
    }
    debug!("{}", message);
}

////////////////////////////////////////////////////////////////////////
// CONFIGURATION FILE STRUCTURE                                       //
////////////////////////////////////////////////////////////////////////

/// The complete configuration file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub zone: ZoneConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub keys: Vec<KeyConfig>,
    #[serde(default)]
    pub offline: Vec<OfflineConfig>,
}

impl Config {
    /// Builds the zone contents from the configured records.
    pub fn zone_contents(&self) -> Result<ZoneContents> {
        let apex = &self.zone.name.0;
        let class = self.zone.class.0;
        let mut contents = ZoneContents::new(apex.clone(), class);
        for record in &self.zone.records {
            let rdata = parse_rdata(record.rr_type.0, class, &record.data).with_context(|| {
                format!("invalid RDATA for {} {}", record.owner.0, record.rr_type.0)
            })?;
            let rrset = Rrset::with_rdata(
                record.owner.0.clone(),
                record.rr_type.0,
                class,
                Ttl::from(record.ttl),
                &rdata,
            );
            contents
                .add_rrset(&rrset)
                .with_context(|| format!("failed to add {} {}", record.owner.0, record.rr_type.0))?;
        }
        contents.adjust();
        Ok(contents)
    }

    /// Builds the zone's keys.
    pub fn keyset(&self) -> Result<ZoneKeyset> {
        let keys = self
            .keys
            .iter()
            .enumerate()
            .map(|(i, key)| {
                key.to_zone_key(&self.zone.name.0)
                    .with_context(|| format!("invalid key #{}", i + 1))
            })
            .collect::<Result<_>>()?;
        Ok(ZoneKeyset::new(keys))
    }

    /// Builds the key storage, holding the configured offline record
    /// sets.
    pub fn kasp(&self) -> Result<Arc<MemoryKasp>> {
        let kasp = MemoryKasp::new();
        for (i, offline) in self.offline.iter().enumerate() {
            let records = offline
                .to_key_records(&self.zone.name.0, self.zone.class.0)
                .with_context(|| format!("invalid offline record set #{}", i + 1))?;
            kasp.insert_offline_records(self.zone.name.0.clone(), offline.timestamp, records);
        }
        Ok(Arc::new(kasp))
    }
}

////////////////////////////////////////////////////////////////////////
// CONFIGURATION SECTION: ZONE                                        //
////////////////////////////////////////////////////////////////////////

/// The zone to sign.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ZoneConfig {
    pub name: ConfigName,
    #[serde(default = "default_zone_class")]
    pub class: ConfigClass,
    #[serde(default)]
    pub records: Vec<RecordConfig>,
}

fn default_zone_class() -> ConfigClass {
    ConfigClass(Class::IN)
}

/// A single record of the zone. The data is in presentation format,
/// or in the generic `\#` format of RFC 3597.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordConfig {
    pub owner: ConfigName,
    #[serde(rename = "type")]
    pub rr_type: ConfigType,
    #[serde(default = "default_ttl")]
    pub ttl: u32,
    pub data: String,
}

fn default_ttl() -> u32 {
    3600
}

////////////////////////////////////////////////////////////////////////
// CONFIGURATION SECTION: POLICY                                      //
////////////////////////////////////////////////////////////////////////

/// The signing policy. Anything left out takes its default from
/// [`Policy::default`].
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    pub rrsig_lifetime: Option<u64>,
    pub rrsig_refresh_before: Option<u64>,
    pub signing_threads: Option<usize>,
    pub offline_ksk: Option<bool>,
    pub cds_cdnskey_publish: Option<ConfigCdsCdnskeyPublish>,
    pub cds_signed_by_ksk: Option<bool>,
    pub cds_digest_type: Option<ConfigDigestType>,
    pub dnskey_ttl: Option<u32>,
    pub nsec3_salt_lifetime: Option<u64>,
}

impl PolicyConfig {
    pub fn to_policy(&self) -> Policy {
        let defaults = Policy::default();
        Policy {
            rrsig_lifetime: self.rrsig_lifetime.unwrap_or(defaults.rrsig_lifetime),
            rrsig_refresh_before: self
                .rrsig_refresh_before
                .unwrap_or(defaults.rrsig_refresh_before),
            signing_threads: self.signing_threads.unwrap_or(defaults.signing_threads),
            offline_ksk: self.offline_ksk.unwrap_or(defaults.offline_ksk),
            cds_cdnskey_publish: self
                .cds_cdnskey_publish
                .map_or(defaults.cds_cdnskey_publish, Into::into),
            cds_signed_by_ksk: self.cds_signed_by_ksk.unwrap_or(defaults.cds_signed_by_ksk),
            cds_digest_type: self
                .cds_digest_type
                .map_or(defaults.cds_digest_type, Into::into),
            dnskey_ttl: self.dnskey_ttl.map(Ttl::from).or(defaults.dnskey_ttl),
            nsec3_salt_lifetime: self.nsec3_salt_lifetime.or(defaults.nsec3_salt_lifetime),
        }
    }
}

/// A deserializable wrapper over [`CdsCdnskeyPublish`].
#[derive(Clone, Copy, Debug, Deserialize)]
pub enum ConfigCdsCdnskeyPublish {
    #[serde(rename = "none")]
    None,
    #[serde(rename = "empty")]
    Empty,
    #[serde(rename = "rollover")]
    Rollover,
    #[serde(rename = "always")]
    Always,
    #[serde(rename = "double-ds")]
    DoubleDs,
}

impl From<ConfigCdsCdnskeyPublish> for CdsCdnskeyPublish {
    fn from(config_mode: ConfigCdsCdnskeyPublish) -> Self {
        match config_mode {
            ConfigCdsCdnskeyPublish::None => Self::None,
            ConfigCdsCdnskeyPublish::Empty => Self::Empty,
            ConfigCdsCdnskeyPublish::Rollover => Self::Rollover,
            ConfigCdsCdnskeyPublish::Always => Self::Always,
            ConfigCdsCdnskeyPublish::DoubleDs => Self::DoubleDs,
        }
    }
}

/// A deserializable wrapper over [`DigestType`].
#[derive(Clone, Copy, Debug, Deserialize)]
pub enum ConfigDigestType {
    #[serde(rename = "sha1")]
    Sha1,
    #[serde(rename = "sha256")]
    Sha256,
}

impl From<ConfigDigestType> for DigestType {
    fn from(config_type: ConfigDigestType) -> Self {
        match config_type {
            ConfigDigestType::Sha1 => Self::Sha1,
            ConfigDigestType::Sha256 => Self::Sha256,
        }
    }
}

////////////////////////////////////////////////////////////////////////
// CONFIGURATION SECTION: KEYS                                        //
////////////////////////////////////////////////////////////////////////

/// A signing key of the zone and its lifecycle state.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyConfig {
    pub role: KeyRole,
    pub secret: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub post_active: bool,
    #[serde(default)]
    pub ready: bool,
    #[serde(default = "default_true")]
    pub public: bool,
}

fn default_true() -> bool {
    true
}

impl KeyConfig {
    fn to_zone_key(&self, apex: &Name) -> Result<ZoneKey> {
        let secret = BASE64
            .decode(self.secret.trim())
            .context("the secret is not valid base64")?;
        if secret.is_empty() {
            return Err(anyhow!("the secret is empty"));
        }
        let (is_ksk, is_zsk) = match self.role {
            KeyRole::Ksk => (true, false),
            KeyRole::Zsk => (false, true),
            KeyRole::Csk => (true, true),
        };
        let mut key = ZoneKey::new(
            apex.clone(),
            Arc::new(HmacSha256Key::new(&secret)),
            is_ksk,
            is_zsk,
        );
        key.is_active = self.active;
        key.is_post_active = self.post_active;
        key.is_ready = self.ready;
        key.is_public = self.public;
        Ok(key)
    }
}

/// What a key signs.
#[derive(Clone, Copy, Debug, Deserialize)]
pub enum KeyRole {
    #[serde(rename = "ksk")]
    Ksk,
    #[serde(rename = "zsk")]
    Zsk,
    #[serde(rename = "csk")]
    Csk,
}

impl fmt::Display for KeyRole {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Ksk => "KSK",
            Self::Zsk => "ZSK",
            Self::Csk => "CSK",
        })
    }
}

////////////////////////////////////////////////////////////////////////
// CONFIGURATION SECTION: OFFLINE KEY RECORDS                         //
////////////////////////////////////////////////////////////////////////

/// Apex key records, and their signatures, prepared in advance for an
/// offline KSK. They take effect at `timestamp`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OfflineConfig {
    pub timestamp: u64,
    #[serde(default = "default_ttl")]
    pub ttl: u32,
    #[serde(default)]
    pub dnskey: Vec<String>,
    #[serde(default)]
    pub cdnskey: Vec<String>,
    #[serde(default)]
    pub cds: Vec<String>,
    #[serde(default)]
    pub rrsig: Vec<String>,
}

impl OfflineConfig {
    fn to_key_records(&self, apex: &Name, class: Class) -> Result<KeyRecords> {
        let mut records = KeyRecords::new(apex, class, Ttl::from(self.ttl));
        for (rrset, texts) in [
            (&mut records.dnskey, &self.dnskey),
            (&mut records.cdnskey, &self.cdnskey),
            (&mut records.cds, &self.cds),
            (&mut records.rrsig, &self.rrsig),
        ] {
            for text in texts {
                let rdata = parse_rdata(rrset.rr_type, class, text)
                    .with_context(|| format!("invalid {} RDATA", rrset.rr_type))?;
                rrset.add_rdata(&rdata);
            }
        }
        Ok(records)
    }
}

////////////////////////////////////////////////////////////////////////
// WRAPPERS OVER LIBRARY TYPES FOR SERDE                              //
////////////////////////////////////////////////////////////////////////

/// Generates a deserializable `ConfigX` structure wrapping an `X` type
/// from [`quandary_signer`], using its [`FromStr`](std::str::FromStr)
/// implementation.
macro_rules! make_serde_wrapper {
    ($wrapper:ident, $over:ty, $description:literal) => {
        /// A macro-generated deserializable wrapper over a
        /// [`quandary_signer`] type.
        #[derive(Clone, Debug)]
        pub struct $wrapper(pub $over);

        impl<'de> Deserialize<'de> for $wrapper {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: de::Deserializer<'de>,
            {
                deserializer.deserialize_str(paste! { [<$wrapper Visitor>] })
            }
        }

        paste! {
            /// A macro-generated [`Visitor`](de::Visitor).
            #[derive(Debug)]
            struct [<$wrapper Visitor>];
        }

        impl<'de> de::Visitor<'de> for paste! { [<$wrapper Visitor>] } {
            type Value = $wrapper;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str($description)
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                value
                    .parse()
                    .map($wrapper)
                    .map_err(|e| E::custom(format!("invalid {}: {}", $description, e)))
            }
        }
    };
}

make_serde_wrapper!(ConfigName, Name, "domain name");
make_serde_wrapper!(ConfigClass, Class, "DNS class");
make_serde_wrapper!(ConfigType, Type, "record type");

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
