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

//! Implementation of the [`Error`] type for the signing engine.

use std::fmt;
use std::io;

use super::crypto::CryptoError;
use super::kasp::StorageError;
use crate::rr::ReadRdataError;
use crate::{thread, zone};

/// Errors that abort a signing pass.
///
/// [`Error::InvalidSignature`] is special: inside the engine it means
/// "this signature must be replaced" and never aborts anything. It only
/// surfaces from [`check_signature`](super::check_signature).
#[derive(Debug)]
pub enum Error {
    /// An input was unusable, e.g. the zone has no SOA at its apex or
    /// the policy would have signatures refreshed as soon as they are
    /// made.
    InvalidArgument(&'static str),

    /// A signature did not verify, or is about to expire.
    InvalidSignature,

    /// The cryptographic backend failed for a reason other than an
    /// invalid signature.
    Crypto(CryptoError),

    /// A signing worker thread could not be started.
    ThreadStart(io::Error),

    /// A signing worker thread panicked.
    WorkerPanicked,

    /// Key storage could not provide the requested data.
    Storage(StorageError),

    /// A changeset could not be applied to the zone.
    Zone(zone::Error),

    /// Record data the engine needed to read was malformed.
    MalformedRdata(ReadRdataError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidArgument(what) => write!(f, "invalid argument: {}", what),
            Self::InvalidSignature => f.write_str("invalid signature"),
            Self::Crypto(e) => write!(f, "cryptographic failure: {}", e),
            Self::ThreadStart(e) => write!(f, "failed to start signing thread: {}", e),
            Self::WorkerPanicked => f.write_str("signing thread panicked"),
            Self::Storage(e) => write!(f, "key storage failure: {}", e),
            Self::Zone(e) => write!(f, "failed to update zone: {}", e),
            Self::MalformedRdata(e) => write!(f, "malformed record data: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Crypto(e) => Some(e),
            Self::ThreadStart(e) => Some(e),
            Self::Storage(e) => Some(e),
            Self::Zone(e) => Some(e),
            Self::MalformedRdata(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CryptoError> for Error {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::InvalidSignature => Self::InvalidSignature,
            e => Self::Crypto(e),
        }
    }
}

impl From<thread::Error> for Error {
    fn from(e: thread::Error) -> Self {
        match e {
            thread::Error::Spawn(e) => Self::ThreadStart(e),
            thread::Error::Panicked => Self::WorkerPanicked,
        }
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<zone::Error> for Error {
    fn from(e: zone::Error) -> Self {
        Self::Zone(e)
    }
}

impl From<ReadRdataError> for Error {
    fn from(e: ReadRdataError) -> Self {
        Self::MalformedRdata(e)
    }
}
