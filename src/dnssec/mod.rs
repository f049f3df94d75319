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

//! The DNSSEC zone-signing engine.
//!
//! A signing pass works on a [`ZoneUpdate`](crate::zone::ZoneUpdate).
//! It reads the update's new contents and, for every RRset that should
//! be signed, compares the signatures present with the ones the zone's
//! keys and [`Policy`] call for. The differences are collected in
//! changesets and applied to the update; nothing is published until
//! the caller commits it.
//!
//! The layers, from the bottom up:
//!
//! * [`crypto`] is the interface to cryptographic backends.
//! * [`check_signature`] and [`sign_rrset`] check and make single
//!   signatures; [`valid_signature_exists`] and
//!   [`all_signatures_exist`] answer whether an RRset is signed.
//! * [`sign`] reconciles the signatures of an RRset or a node.
//! * [`driver`] spreads that work for a whole zone, or for the RRsets a
//!   changeset touched, across threads.
//! * [`key_records`] maintains the apex DNSKEY, CDNSKEY, and CDS
//!   RRsets.
//! * [`zone_events`] runs complete signing passes, and [`reschedule`]
//!   plans the events that follow one.

mod context;
pub mod crypto;
pub mod driver;
mod error;
pub mod events;
pub mod kasp;
mod key;
pub mod key_records;
mod policy;
pub mod reschedule;
mod rrset_sign;
pub mod sign;
mod validity;
pub mod zone_events;

pub use context::{DnssecContext, ZoneSignContext};
pub use crypto::{CryptoError, HmacSha256Key, SignContext, SigningKey};
pub use error::Error;
pub use kasp::{KaspStore, MemoryKasp, OfflineRecords, StorageError};
pub use key::{DigestType, ZoneKey, ZoneKeyset};
pub use key_records::KeyRecords;
pub use policy::{CdsCdnskeyPublish, Policy};
pub use rrset_sign::{canonical_rdata, check_signature, sign_rrset, signed_data};
pub use validity::{all_signatures_exist, valid_signature_exists};
pub use zone_events::{ManagedZone, SignFlags};
