//! Blake3 hashing for query-signature keys

/// Hash raw bytes with blake3.
pub fn hash_bytes(data: &[u8]) -> blake3::Hash {
    blake3::hash(data)
}

/// Return the first 16 hex characters of a blake3 hash.
///
/// 64 bits of key space is plenty for a per-user cache while keeping
/// filenames short.
pub fn short_hash(hash: &blake3::Hash) -> String {
    hash.to_hex()[..16].to_string()
}
