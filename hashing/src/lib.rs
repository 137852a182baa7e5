use ethereum_types::H256;
use once_cell::sync::Lazy;
use sha2::{Digest as _, Sha256};

/// Height of the tallest subtree [`zero_hash`] can return.
///
/// The deepest tree merkleized while indexing blocks is that of a single transaction
/// (2<sup>25</sup> chunks), so this leaves plenty of room.
pub const MAX_ZERO_HASH_HEIGHT: usize = 64;

static ZERO_HASHES: Lazy<[H256; MAX_ZERO_HASH_HEIGHT + 1]> = Lazy::new(|| {
    let mut zero_hashes = [H256::zero(); MAX_ZERO_HASH_HEIGHT + 1];

    for height in 1..=MAX_ZERO_HASH_HEIGHT {
        let lower = zero_hashes[height - 1];
        zero_hashes[height] = hash_256_256(lower, lower);
    }

    zero_hashes
});

/// Returns the root of a tree of the given height whose leaves are all zero chunks.
///
/// # Panics
///
/// Panics if `height` exceeds [`MAX_ZERO_HASH_HEIGHT`].
#[inline]
#[must_use]
pub fn zero_hash(height: usize) -> H256 {
    ZERO_HASHES[height]
}

#[inline]
#[must_use]
pub fn hash_256_256(left: H256, right: H256) -> H256 {
    let digest = Sha256::new()
        .chain_update(left.as_bytes())
        .chain_update(right.as_bytes())
        .finalize();

    H256::from_slice(digest.as_slice())
}

#[inline]
#[must_use]
pub fn hash_bytes(bytes: impl AsRef<[u8]>) -> H256 {
    H256::from_slice(Sha256::digest(bytes.as_ref()).as_slice())
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use itertools::Itertools as _;

    use super::*;

    #[test]
    fn zero_hashes_start_with_known_values() {
        assert_eq!(zero_hash(0), H256::zero());

        assert_eq!(
            zero_hash(1),
            H256(hex!(
                "f5a5fd42d16a20302798ef6ed309979b43003d2320d9f0e8ea9831a92759fb4b"
            )),
        );

        assert_eq!(
            zero_hash(2),
            H256(hex!(
                "db56114e00fdd4c1f85c892bf35ac9a89289aaecb1ebd0a96cde606a748b5d71"
            )),
        );
    }

    #[test]
    fn higher_zero_hashes_are_calculated_from_lower_ones() {
        for (lower, higher) in (0..=MAX_ZERO_HASH_HEIGHT).map(zero_hash).tuple_windows() {
            assert_eq!(hash_256_256(lower, lower), higher);
        }
    }

    #[test]
    fn hash_256_256_matches_hashing_concatenated_bytes() {
        let left = H256::repeat_byte(1);
        let right = H256::repeat_byte(2);

        let mut concatenated = left.as_bytes().to_vec();
        concatenated.extend_from_slice(right.as_bytes());

        assert_eq!(hash_256_256(left, right), hash_bytes(concatenated));
    }
}
