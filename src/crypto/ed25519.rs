// Ed25519 signing primitives for transaction-entry authorization (§4.4).
//
// RCD (reveal condition datum) byte layout: 0x01 || public_key (33 bytes total).
// Signatures are detached, 64 bytes, over a SHA-512 digest of the per-signer message.

use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

pub const RCD_TYPE_1: u8 = 0x01;
pub const PUBLIC_KEY_BYTES: usize = 32;
pub const SIGNATURE_BYTES: usize = 64;

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(pub [u8; PUBLIC_KEY_BYTES]);

#[derive(Clone)]
pub struct SecretKey(pub [u8; 32]);

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; SIGNATURE_BYTES]);

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({})", hex::encode(self.0))
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signature({})", hex::encode(self.0))
    }
}

impl Serialize for PublicKey {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        hex::encode(self.0).serialize(s)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        let arr: [u8; PUBLIC_KEY_BYTES] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("public key must be 32 bytes"))?;
        Ok(PublicKey(arr))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SignError {
    #[error("invalid public key bytes")]
    InvalidPublicKey,
    #[error("invalid signature bytes")]
    InvalidSignature,
    #[error("signature does not verify")]
    VerificationFailed,
}

/// RCD bytes for a public key: 0x01 || pubkey (33 bytes).
pub fn rcd_bytes(pk: &PublicKey) -> [u8; 1 + PUBLIC_KEY_BYTES] {
    let mut out = [0u8; 1 + PUBLIC_KEY_BYTES];
    out[0] = RCD_TYPE_1;
    out[1..].copy_from_slice(&pk.0);
    out
}

/// Address is derived the same way regardless of signature scheme: SHA-512(rcd)[0..32].
pub fn address_from_rcd(rcd: &[u8]) -> [u8; 32] {
    let hash = super::hash::hash_sha512(rcd);
    let mut addr = [0u8; 32];
    addr.copy_from_slice(&hash[0..32]);
    addr
}

pub fn sign(digest: &[u8; 64], sk: &SecretKey) -> Signature {
    let signing_key = SigningKey::from_bytes(&sk.0);
    let sig: DalekSignature = signing_key.sign(digest);
    Signature(sig.to_bytes())
}

pub fn verify(pk: &PublicKey, sig: &Signature, digest: &[u8; 64]) -> Result<(), SignError> {
    let verifying_key =
        VerifyingKey::from_bytes(&pk.0).map_err(|_| SignError::InvalidPublicKey)?;
    let signature = DalekSignature::from_bytes(&sig.0);
    verifying_key
        .verify(digest, &signature)
        .map_err(|_| SignError::VerificationFailed)
}

pub fn public_key_of(sk: &SecretKey) -> PublicKey {
    let signing_key = SigningKey::from_bytes(&sk.0);
    PublicKey(signing_key.verifying_key().to_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash::hash_sha512;

    fn keypair() -> (SecretKey, PublicKey) {
        let sk = SecretKey([7u8; 32]);
        let pk = public_key_of(&sk);
        (sk, pk)
    }

    #[test]
    fn sign_then_verify_roundtrip() {
        let (sk, pk) = keypair();
        let digest = hash_sha512(b"message");
        let sig = sign(&digest, &sk);
        assert!(verify(&pk, &sig, &digest).is_ok());
    }

    #[test]
    fn wrong_pubkey_rejected() {
        let (sk, _) = keypair();
        let (_, other_pk) = {
            let sk2 = SecretKey([9u8; 32]);
            let pk2 = public_key_of(&sk2);
            (sk2, pk2)
        };
        let digest = hash_sha512(b"message");
        let sig = sign(&digest, &sk);
        assert!(verify(&other_pk, &sig, &digest).is_err());
    }

    #[test]
    fn tampered_digest_rejected() {
        let (sk, pk) = keypair();
        let digest = hash_sha512(b"message");
        let sig = sign(&digest, &sk);
        let mut tampered = hash_sha512(b"different");
        tampered[0] ^= 0xff;
        assert!(verify(&pk, &sig, &tampered).is_err());
    }

    #[test]
    fn rcd_bytes_have_type_one_prefix() {
        let (_, pk) = keypair();
        let rcd = rcd_bytes(&pk);
        assert_eq!(rcd.len(), 33);
        assert_eq!(rcd[0], RCD_TYPE_1);
        assert_eq!(&rcd[1..], &pk.0[..]);
    }
}
