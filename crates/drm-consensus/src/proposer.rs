const FNV_OFFSET_BASIS_32: u32 = 0x811c_9dc5;
const FNV_PRIME_32: u32 = 0x0100_0193;

/// 32-bit FNV-1a. The `fnv` crate only exposes the 64-bit variant, so this
/// is hand-rolled to match the hash the proposer election formula names.
pub fn fnv1a_32(data: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS_32;
    for byte in data {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME_32);
    }
    hash
}

/// `fnv1a_32(tx_id) mod validator_count`. Deterministic: every validator
/// that hears the same `tx_id` elects the same proposer independently.
pub fn elect_proposer(tx_id: &str, validator_count: u32) -> u32 {
    fnv1a_32(tx_id.as_bytes()) % validator_count
}
