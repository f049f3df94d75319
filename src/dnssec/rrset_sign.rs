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

//! Signing and verification of single RRsets.

use std::borrow::Cow;

use super::context::DnssecContext;
use super::crypto::SignContext;
use super::key::ZoneKey;
use super::Error;
use crate::name::Name;
use crate::rr::{Rrset, Rrsig, Type};
use crate::util::earliest;

/// Builds the data an RRSIG with the (unsigned) fields of `rrsig`
/// signs over `covered`, as defined in [RFC 4034 § 3.1.8.1]. Each RDATA
/// is put in canonical form (see [`canonical_rdata`]) and the results
/// are taken in canonical order.
///
/// [RFC 4034 § 3.1.8.1]: https://datatracker.ietf.org/doc/html/rfc4034#section-3.1.8.1
pub fn signed_data(rrsig: &Rrsig, covered: &Rrset) -> Vec<u8> {
    let owner = if (rrsig.labels as usize) < covered.owner.label_count() {
        covered
            .owner
            .wildcard_ancestor(rrsig.labels as usize)
            .unwrap_or_else(|| covered.owner.clone())
    } else {
        covered.owner.clone()
    };
    let owner = owner.canonical_wire();

    let mut rdatas: Vec<Cow<[u8]>> = covered
        .rdatas
        .iter()
        .map(|rdata| canonical_rdata(covered.rr_type, rdata))
        .collect();
    rdatas.sort();
    rdatas.dedup();

    let mut data = rrsig.compose_unsigned();
    for rdata in rdatas {
        data.extend_from_slice(&owner);
        data.extend_from_slice(&covered.rr_type.to_be_bytes());
        data.extend_from_slice(&covered.class.to_be_bytes());
        data.extend_from_slice(&rrsig.original_ttl.to_be_bytes());
        data.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
        data.extend_from_slice(&rdata);
    }
    data
}

/// Returns `rdata` in the canonical form of [RFC 4034 § 6.2]: the
/// domain names embedded in the RDATA of NS, CNAME, SOA, PTR, MX, and
/// SRV records are lowercased. Other types, and RDATA whose names do
/// not parse, are returned unchanged.
///
/// [RFC 4034 § 6.2]: https://datatracker.ietf.org/doc/html/rfc4034#section-6.2
pub fn canonical_rdata(rr_type: Type, rdata: &[u8]) -> Cow<[u8]> {
    // The offset of the first embedded name and the number of names
    // that follow one another from there.
    let (start, names) = match rr_type {
        Type::NS | Type::CNAME | Type::PTR => (0, 1),
        Type::SOA => (0, 2),
        Type::MX => (2, 1),
        Type::SRV => (6, 1),
        _ => return Cow::Borrowed(rdata),
    };

    let mut canonical = rdata.to_vec();
    let mut offset = start;
    for _ in 0..names {
        match rdata.get(offset..).map(Name::from_wire) {
            Some(Ok((_, len))) => {
                // Length octets are at most 63 and so are never ASCII
                // letters.
                canonical[offset..offset + len].make_ascii_lowercase();
                offset += len;
            }
            _ => return Cow::Borrowed(rdata),
        }
    }
    Cow::Owned(canonical)
}

/// Signs `covered` with `key` and adds the signature to `rrsigs`.
/// `expires_at` is lowered to the new signature's expiration if that
/// is earlier.
pub fn sign_rrset(
    rrsigs: &mut Rrset,
    covered: &Rrset,
    key: &ZoneKey,
    ctx: &mut dyn SignContext,
    dnssec: &DnssecContext,
    expires_at: &mut Option<u64>,
) -> Result<(), Error> {
    if covered.rr_type == Type::RRSIG || covered.is_empty() {
        return Err(Error::InvalidArgument("cannot sign an RRSIG or empty RRset"));
    }

    let expiration = dnssec.expiration();
    let mut rrsig = Rrsig {
        type_covered: covered.rr_type,
        algorithm: key.algorithm(),
        labels: covered.owner.rrsig_labels(),
        original_ttl: u32::from(covered.ttl),
        expiration: expiration as u32,
        inception: dnssec.now as u32,
        key_tag: key.key_tag(),
        signer: key.owner().clone(),
        signature: Box::new([]),
    };
    rrsig.signature = ctx.sign(&signed_data(&rrsig, covered))?.into();

    rrsigs.add_rdata(&rrsig.to_rdata());
    *expires_at = earliest(*expires_at, Some(expiration));
    Ok(())
}

/// Checks whether `rrsig_rdata` is a usable signature of `covered` by
/// `key`.
///
/// A signature is usable if it verifies and will not expire before the
/// policy's refresh period. [`Error::InvalidSignature`] means that the
/// signature should be replaced; other errors mean that checking it was
/// impossible. On success, returns the signature's expiration.
pub fn check_signature(
    covered: &Rrset,
    rrsig_rdata: &[u8],
    key: &ZoneKey,
    ctx: &mut dyn SignContext,
    dnssec: &DnssecContext,
) -> Result<u64, Error> {
    // Unreadable signatures are as good as invalid ones: they must go.
    let rrsig = Rrsig::parse(rrsig_rdata).or(Err(Error::InvalidSignature))?;

    let expiration = rrsig_time(rrsig.expiration, dnssec.now);
    if expiration < dnssec.refresh_limit()
        || rrsig.type_covered != covered.rr_type
        || rrsig.key_tag != key.key_tag()
        || rrsig.algorithm != key.algorithm()
        || rrsig.original_ttl != u32::from(covered.ttl)
        || rrsig.signer != *key.owner()
    {
        return Err(Error::InvalidSignature);
    }

    ctx.verify(&signed_data(&rrsig, covered), &rrsig.signature)?;
    Ok(expiration)
}

/// Converts an RRSIG timestamp to a UNIX time, taking the timestamp to
/// be the one closest to `now` per the serial number arithmetic of
/// [RFC 4034 § 3.1.5].
///
/// [RFC 4034 § 3.1.5]: https://datatracker.ietf.org/doc/html/rfc4034#section-3.1.5
pub fn rrsig_time(timestamp: u32, now: u64) -> u64 {
    let offset = timestamp.wrapping_sub(now as u32) as i32;
    now.saturating_add_signed(offset as i64)
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use lazy_static::lazy_static;

    use super::*;
    use crate::class::Class;
    use crate::dnssec::crypto::HmacSha256Key;
    use crate::dnssec::kasp::MemoryKasp;
    use crate::dnssec::Policy;
    use crate::name::Name;
    use crate::rr::Ttl;

    const NOW: u64 = 1_700_000_000;

    lazy_static! {
        static ref ZONE: Name = "quandary.test.".parse().unwrap();
        static ref KEY: ZoneKey = ZoneKey::new(
            ZONE.clone(),
            Arc::new(HmacSha256Key::new(b"zsk")),
            false,
            true,
        );
        static ref OTHER_KEY: ZoneKey = ZoneKey::new(
            ZONE.clone(),
            Arc::new(HmacSha256Key::new(b"other")),
            false,
            true,
        );
    }

    fn dnssec_at(now: u64) -> DnssecContext {
        DnssecContext::new(ZONE.clone(), now, Policy::default(), Arc::new(MemoryKasp::new()))
    }

    fn txt(owner: &str, ttl: u32, texts: &[&str]) -> Rrset {
        let mut rrset = Rrset::new(owner.parse().unwrap(), Type::TXT, Class::IN, Ttl::from(ttl));
        for text in texts {
            rrset.add_rdata(text.as_bytes());
        }
        rrset
    }

    fn sign(covered: &Rrset, key: &ZoneKey, dnssec: &DnssecContext) -> (Rrset, Option<u64>) {
        let mut rrsigs = Rrset::new(covered.owner.clone(), Type::RRSIG, Class::IN, covered.ttl);
        let mut expires_at = None;
        let mut ctx = key.key().start().unwrap();
        sign_rrset(&mut rrsigs, covered, key, ctx.as_mut(), dnssec, &mut expires_at).unwrap();
        (rrsigs, expires_at)
    }

    fn check(covered: &Rrset, rrsigs: &Rrset, key: &ZoneKey, dnssec: &DnssecContext) -> Result<u64, Error> {
        let mut ctx = key.key().start().unwrap();
        check_signature(covered, rrsigs.rdatas.get(0).unwrap(), key, ctx.as_mut(), dnssec)
    }

    #[test]
    fn signature_verifies() {
        let dnssec = dnssec_at(NOW);
        let covered = txt("www.quandary.test.", 300, &["a", "b"]);
        let (rrsigs, expires_at) = sign(&covered, &KEY, &dnssec);
        let expiration = NOW + dnssec.policy.rrsig_lifetime;
        assert_eq!(expires_at, Some(expiration));
        assert_eq!(check(&covered, &rrsigs, &KEY, &dnssec).unwrap(), expiration);

        let rrsig = Rrsig::parse(rrsigs.rdatas.get(0).unwrap()).unwrap();
        assert_eq!(rrsig.type_covered, Type::TXT);
        assert_eq!(rrsig.labels, 3);
        assert_eq!(rrsig.original_ttl, 300);
        assert_eq!(rrsig.inception as u64, NOW);
        assert_eq!(rrsig.key_tag, KEY.key_tag());
        assert_eq!(rrsig.signer, *ZONE);
    }

    #[test]
    fn changed_rrset_invalidates_signature() {
        let dnssec = dnssec_at(NOW);
        let covered = txt("www.quandary.test.", 300, &["a", "b"]);
        let (rrsigs, _) = sign(&covered, &KEY, &dnssec);
        assert!(matches!(
            check(&txt("www.quandary.test.", 300, &["a"]), &rrsigs, &KEY, &dnssec),
            Err(Error::InvalidSignature)
        ));
        assert!(matches!(
            check(&txt("www.quandary.test.", 600, &["a", "b"]), &rrsigs, &KEY, &dnssec),
            Err(Error::InvalidSignature)
        ));
        assert!(matches!(
            check(&covered, &rrsigs, &OTHER_KEY, &dnssec),
            Err(Error::InvalidSignature)
        ));
    }

    #[test]
    fn owner_case_does_not_matter() {
        let dnssec = dnssec_at(NOW);
        let (rrsigs, _) = sign(&txt("www.quandary.test.", 300, &["a"]), &KEY, &dnssec);
        let covered = txt("WWW.Quandary.TEST.", 300, &["a"]);
        assert!(check(&covered, &rrsigs, &KEY, &dnssec).is_ok());
    }

    fn ns(owner: &str, targets: &[&str]) -> Rrset {
        let mut rrset = Rrset::new(owner.parse().unwrap(), Type::NS, Class::IN, Ttl::from(3600));
        for target in targets {
            let target: Name = target.parse().unwrap();
            rrset.add_rdata(target.wire_repr());
        }
        rrset
    }

    #[test]
    fn embedded_name_case_does_not_matter() {
        let dnssec = dnssec_at(NOW);
        let mixed = ns("quandary.test.", &["B.Quandary.TEST.", "a.quandary.test."]);
        let (rrsigs, _) = sign(&mixed, &KEY, &dnssec);
        let lower = ns("quandary.test.", &["b.quandary.test.", "a.quandary.test."]);
        assert!(check(&lower, &rrsigs, &KEY, &dnssec).is_ok());
    }

    #[test]
    fn canonical_rdata_lowercases_only_names() {
        let mut mx = vec![0, 10];
        mx.extend_from_slice("Mail.Quandary.Test.".parse::<Name>().unwrap().wire_repr());
        let mut expected = vec![0, 10];
        expected.extend_from_slice("mail.quandary.test.".parse::<Name>().unwrap().wire_repr());
        assert_eq!(&*canonical_rdata(Type::MX, &mx), expected.as_slice());

        assert_eq!(&*canonical_rdata(Type::TXT, b"\x05Hello"), b"\x05Hello");
        assert_eq!(&*canonical_rdata(Type::NS, b"\x05AB"), b"\x05AB");
    }

    #[test]
    fn wildcard_label_is_not_counted() {
        let dnssec = dnssec_at(NOW);
        let covered = txt("*.quandary.test.", 300, &["wild"]);
        let (rrsigs, _) = sign(&covered, &KEY, &dnssec);
        let rrsig = Rrsig::parse(rrsigs.rdatas.get(0).unwrap()).unwrap();
        assert_eq!(rrsig.labels, 2);
        assert!(check(&covered, &rrsigs, &KEY, &dnssec).is_ok());
    }

    #[test]
    fn signature_due_for_refresh_is_invalid() {
        let covered = txt("www.quandary.test.", 300, &["a"]);
        let (rrsigs, _) = sign(&covered, &KEY, &dnssec_at(NOW));
        let policy = Policy::default();
        let almost = NOW + policy.rrsig_lifetime - policy.rrsig_refresh_before;
        assert!(check(&covered, &rrsigs, &KEY, &dnssec_at(almost)).is_ok());
        assert!(matches!(
            check(&covered, &rrsigs, &KEY, &dnssec_at(almost + 1)),
            Err(Error::InvalidSignature)
        ));
    }

    #[test]
    fn garbage_rrsig_is_invalid() {
        let dnssec = dnssec_at(NOW);
        let covered = txt("www.quandary.test.", 300, &["a"]);
        let rrsigs = Rrset::with_rdata(
            covered.owner.clone(),
            Type::RRSIG,
            Class::IN,
            covered.ttl,
            b"short",
        );
        assert!(matches!(
            check(&covered, &rrsigs, &KEY, &dnssec),
            Err(Error::InvalidSignature)
        ));
    }

    #[test]
    fn rrsig_time_wraps_around() {
        assert_eq!(rrsig_time(100, 50), 100);
        let now = 1u64 << 32;
        assert_eq!(rrsig_time(10, now), now + 10);
        assert_eq!(rrsig_time(u32::MAX, now), now - 1);
    }
}
