// Human-readable address encoding.
//
// Format: PN1<base32(address)><4-byte checksum>, derived from an Ed25519 RCD.

pub const ADDRESS_BYTES: usize = 32;
const ADDRESS_PREFIX: &str = "PN1";

#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    #[error("invalid address prefix: must start with {ADDRESS_PREFIX}")]
    InvalidPrefix,
    #[error("invalid address encoding")]
    InvalidEncoding,
    #[error("invalid address length")]
    InvalidLength,
    #[error("invalid address checksum")]
    InvalidChecksum,
}

/// Encodes a raw 32-byte address into its human-readable form.
/// Checksum: sha3_256(sha3_256(PREFIX || address))[0..4].
pub fn encode_address_string(addr: &[u8; ADDRESS_BYTES]) -> String {
    let b32 = data_encoding::BASE32_NOPAD.encode(addr);

    let mut payload = Vec::with_capacity(ADDRESS_PREFIX.len() + addr.len());
    payload.extend_from_slice(ADDRESS_PREFIX.as_bytes());
    payload.extend_from_slice(addr);

    let hash1 = super::hash::hash_sha3_256(&payload);
    let hash2 = super::hash::hash_sha3_256(&hash1);
    let checksum = data_encoding::BASE32_NOPAD.encode(&hash2[0..4]);

    format!("{ADDRESS_PREFIX}{b32}{checksum}")
}

/// Decodes a human-readable address string back to raw bytes, verifying the checksum.
pub fn decode_address_string(s: &str) -> Result<[u8; ADDRESS_BYTES], AddressError> {
    if !s.starts_with(ADDRESS_PREFIX) {
        return Err(AddressError::InvalidPrefix);
    }

    let body = &s[ADDRESS_PREFIX.len()..];
    if body.len() < 8 {
        return Err(AddressError::InvalidLength);
    }

    let (addr_part, _checksum_part) = body.split_at(body.len() - 7);

    let addr_bytes = data_encoding::BASE32_NOPAD
        .decode(addr_part.as_bytes())
        .map_err(|_| AddressError::InvalidEncoding)?;

    if addr_bytes.len() != ADDRESS_BYTES {
        return Err(AddressError::InvalidLength);
    }

    let mut addr = [0u8; ADDRESS_BYTES];
    addr.copy_from_slice(&addr_bytes);

    let expected = encode_address_string(&addr);
    if expected == s {
        Ok(addr)
    } else {
        Err(AddressError::InvalidChecksum)
    }
}
