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

//! The seam between the signing engine and cryptographic backends.
//!
//! The engine never touches key material itself. It talks to a
//! [`SigningKey`], which describes a key and creates [`SignContext`]s;
//! each signing worker owns one context per key for the duration of a
//! pass, so backends may keep per-context mutable state without any
//! locking.
//!
//! [`HmacSha256Key`] is a simple backend that uses the private
//! algorithm number 253 (PRIVATEDNS, [RFC 4034 Appendix A.1.1]) with
//! HMAC-SHA256. It is deterministic and cheap, which makes it suitable
//! for tests and for lab deployments; it offers no public-key security,
//! since verification requires the secret.
//!
//! [RFC 4034 Appendix A.1.1]: https://datatracker.ietf.org/doc/html/rfc4034#appendix-A.1.1

use std::fmt;

use hmac::{Hmac, Mac};
use lazy_static::lazy_static;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::name::Name;

////////////////////////////////////////////////////////////////////////
// BACKEND TRAITS                                                     //
////////////////////////////////////////////////////////////////////////

/// A DNSSEC key as seen by the signing engine.
pub trait SigningKey: Send + Sync + fmt::Debug {
    /// The DNSSEC algorithm number of the key.
    fn algorithm(&self) -> u8;

    /// The contents of the Public Key field of the key's DNSKEY record.
    fn public_key(&self) -> Vec<u8>;

    /// Creates a new signing context for this key.
    fn start(&self) -> Result<Box<dyn SignContext>, CryptoError>;
}

/// A stateful handle for signing and verifying data with one key.
pub trait SignContext {
    /// Signs `data`, returning the signature.
    fn sign(&mut self, data: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Verifies that `signature` is a signature of `data`. A signature
    /// that simply does not match yields
    /// [`CryptoError::InvalidSignature`].
    fn verify(&mut self, data: &[u8], signature: &[u8]) -> Result<(), CryptoError>;
}

/// Errors reported by cryptographic backends.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CryptoError {
    /// The signature does not match the data.
    InvalidSignature,

    /// The backend failed.
    Other(String),
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidSignature => f.write_str("invalid signature"),
            Self::Other(what) => f.write_str(what),
        }
    }
}

impl std::error::Error for CryptoError {}

////////////////////////////////////////////////////////////////////////
// HMAC-SHA256 BACKEND                                                //
////////////////////////////////////////////////////////////////////////

/// The PRIVATEDNS algorithm number.
pub const PRIVATEDNS: u8 = 253;

/// The length of secrets made by [`HmacSha256Key::generate`].
pub const GENERATED_SECRET_LEN: usize = 32;

lazy_static! {
    /// PRIVATEDNS public keys begin with a domain name that identifies
    /// the actual algorithm.
    static ref HMAC_SHA256_NAME: Name = "hmac-sha256.".parse().unwrap();
}

/// An HMAC-SHA256 key used through the PRIVATEDNS algorithm.
///
/// The published "public key" is the algorithm name followed by the
/// SHA-256 digest of the secret, so that distinct secrets yield distinct
/// DNSKEY records (and key tags) without disclosing the secret.
#[derive(Clone)]
pub struct HmacSha256Key {
    secret: Box<[u8]>,
}

impl HmacSha256Key {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Generates a key with a random secret.
    pub fn generate() -> Self {
        let mut secret = [0; GENERATED_SECRET_LEN];
        rand::thread_rng().fill_bytes(&mut secret);
        Self::new(&secret)
    }

    pub fn secret(&self) -> &[u8] {
        &self.secret
    }
}

impl fmt::Debug for HmacSha256Key {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("HmacSha256Key")
            .field("secret", &format_args!("<{} octets>", self.secret.len()))
            .finish()
    }
}

impl SigningKey for HmacSha256Key {
    fn algorithm(&self) -> u8 {
        PRIVATEDNS
    }

    fn public_key(&self) -> Vec<u8> {
        let mut out = HMAC_SHA256_NAME.wire_repr().to_vec();
        out.extend_from_slice(&Sha256::digest(&self.secret));
        out
    }

    fn start(&self) -> Result<Box<dyn SignContext>, CryptoError> {
        let mac = Hmac::<Sha256>::new_from_slice(&self.secret)
            .map_err(|e| CryptoError::Other(e.to_string()))?;
        Ok(Box::new(HmacContext { mac }))
    }
}

/// The [`SignContext`] of an [`HmacSha256Key`]. The keyed state is
/// computed once and cloned for each operation.
struct HmacContext {
    mac: Hmac<Sha256>,
}

impl SignContext for HmacContext {
    fn sign(&mut self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut mac = self.mac.clone();
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    fn verify(&mut self, data: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
        let mut mac = self.mac.clone();
        mac.update(data);
        mac.verify_slice(signature)
            .or(Err(CryptoError::InvalidSignature))
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_works() {
        let key = HmacSha256Key::new(b"quandary test secret");
        let mut ctx = key.start().unwrap();
        let signature = ctx.sign(b"data").unwrap();
        assert_eq!(signature.len(), 32);
        assert_eq!(ctx.verify(b"data", &signature), Ok(()));
        assert_eq!(
            ctx.verify(b"other data", &signature),
            Err(CryptoError::InvalidSignature)
        );
    }

    #[test]
    fn contexts_of_one_key_agree() {
        let key = HmacSha256Key::generate();
        let signature = key.start().unwrap().sign(b"data").unwrap();
        assert_eq!(key.start().unwrap().verify(b"data", &signature), Ok(()));
    }

    #[test]
    fn public_key_identifies_algorithm_and_secret() {
        let a = HmacSha256Key::new(b"a");
        let b = HmacSha256Key::new(b"b");
        assert!(a.public_key().starts_with(b"\x0bhmac-sha256\x00"));
        assert_eq!(a.public_key().len(), 13 + 32);
        assert_ne!(a.public_key(), b.public_key());
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let key = HmacSha256Key::new(b"hunter2");
        assert!(!format!("{:?}", key).contains("hunter2"));
    }
}
