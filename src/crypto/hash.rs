// Cryptographic hashing wrappers
use sha2::{Digest, Sha256, Sha512};
use sha3::Sha3_256;

/// SHA-512: used for transaction-entry signature digests and address derivation.
pub fn hash_sha512(data: &[u8]) -> [u8; 64] {
    let mut hasher = Sha512::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// SHA-256: used for entry-hash identifiers.
pub fn hash_sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// SHA3-256: used for address checksums and the difficulty-hash stand-in (§4.5).
pub fn hash_sha3_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// SHA3-256 concat: hashes a then b without allocating a temporary Vec.
pub fn hash_sha3_256_concat(a: &[u8], b: &[u8]) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    hasher.update(a);
    hasher.update(b);
    hasher.finalize().into()
}
