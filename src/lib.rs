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

//! Quandary's DNSSEC zone-signing engine.
//!
//! The engine keeps every RRset of a zone correctly signed as the
//! zone's content, its keys, and its signing policy change over time.
//! The heart of it lives in the [`dnssec`] module; the remaining
//! modules provide the DNS data types ([`name`], [`rr`], [`class`]) and
//! the in-memory zone structures ([`zone`]) that the engine reads from
//! and writes changesets to.
//!
//! A signing pass is driven through a [`zone::ZoneUpdate`]: the engine
//! reads the update's new zone contents, emits additions and removals
//! of RRSIG (and DNSKEY/CDNSKEY/CDS) records, and applies them to the
//! update. The caller commits the update once signing succeeds.

pub mod class;
pub mod dnssec;
pub mod name;
pub mod rr;
pub mod thread;
mod util;
pub mod zone;
