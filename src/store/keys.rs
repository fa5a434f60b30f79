// Byte-key layout for the default column family (§6).
//
//   "SyncHead"              -> 4-byte BE height
//   "WinnersHead"           -> 4-byte BE height
//   "Winners" || BE32(h)    -> 10 * 32-byte entry hashes (320 bytes)
//   "Rates"   || BE32(h)    -> compact JSON object, ticker -> f64
//   "Balances"|| address    -> compact JSON object, ticker -> u64

pub const SYNC_HEAD: &[u8] = b"SyncHead";
pub const WINNERS_HEAD: &[u8] = b"WinnersHead";
pub const WINNERS_PREFIX: &[u8] = b"Winners";
pub const RATES_PREFIX: &[u8] = b"Rates";
pub const BALANCES_PREFIX: &[u8] = b"Balances";

pub fn winners_key(height: u32) -> Vec<u8> {
    let mut k = Vec::with_capacity(WINNERS_PREFIX.len() + 4);
    k.extend_from_slice(WINNERS_PREFIX);
    k.extend_from_slice(&height.to_be_bytes());
    k
}

pub fn rates_key(height: u32) -> Vec<u8> {
    let mut k = Vec::with_capacity(RATES_PREFIX.len() + 4);
    k.extend_from_slice(RATES_PREFIX);
    k.extend_from_slice(&height.to_be_bytes());
    k
}

pub fn balances_key(address: &[u8; 32]) -> Vec<u8> {
    let mut k = Vec::with_capacity(BALANCES_PREFIX.len() + 32);
    k.extend_from_slice(BALANCES_PREFIX);
    k.extend_from_slice(address);
    k
}
