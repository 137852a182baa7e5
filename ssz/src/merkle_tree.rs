use ethereum_types::H256;
use itertools::Itertools as _;
use typenum::Unsigned as _;

use crate::{consts::BYTES_PER_CHUNK, porcelain::SszHash};

/// Merkleizes `chunks` as the leaves of a tree with room for `limit` chunks.
///
/// Missing leaves are treated as zero chunks. The tree is never materialized.
/// Subtrees consisting only of padding are replaced with precomputed zero hashes.
#[must_use]
pub fn merkleize_chunks(chunks: impl IntoIterator<Item = H256>, limit: usize) -> H256 {
    let depth = depth_for(limit);
    let mut layer = chunks.into_iter().collect_vec();

    debug_assert!(layer.len() <= 1 << depth);

    if layer.is_empty() {
        return hashing::zero_hash(depth);
    }

    for height in 0..depth {
        if layer.len() % 2 == 1 {
            layer.push(hashing::zero_hash(height));
        }

        layer = layer
            .into_iter()
            .tuples()
            .map(|(left, right)| hashing::hash_256_256(left, right))
            .collect();
    }

    layer
        .into_iter()
        .exactly_one()
        .unwrap_or_else(|_| unreachable!("each layer halves the number of nodes"))
}

/// Merkleizes a homogeneous collection with room for `limit` elements.
///
/// Basic values are packed into chunks as they are in SSZ lists and vectors.
#[must_use]
pub fn merkleize_elements<T: SszHash>(elements: &[T], limit: usize) -> H256 {
    let packing_factor = T::PackingFactor::USIZE;

    if packing_factor == 1 {
        return merkleize_chunks(elements.iter().map(SszHash::hash_tree_root), limit);
    }

    let element_size = BYTES_PER_CHUNK / packing_factor;
    let mut bytes = Vec::with_capacity(elements.len() * element_size);

    for element in elements {
        let root = element.hash_tree_root();
        bytes.extend_from_slice(&root[..element_size]);
    }

    merkleize_chunks(pack_bytes(&bytes), limit.div_ceil(packing_factor))
}

/// Splits `bytes` into chunks, padding the last one with zeros.
pub fn pack_bytes(bytes: &[u8]) -> impl Iterator<Item = H256> + '_ {
    bytes.chunks(BYTES_PER_CHUNK).map(|chunk| {
        let mut hash = H256::zero();
        hash[..chunk.len()].copy_from_slice(chunk);
        hash
    })
}

#[must_use]
pub fn mix_in_length(root: H256, length: usize) -> H256 {
    let length = u64::try_from(length).expect("lengths of SSZ collections fit in u64");
    hashing::hash_256_256(root, length.hash_tree_root())
}

fn depth_for(limit: usize) -> usize {
    limit
        .next_power_of_two()
        .trailing_zeros()
        .try_into()
        .expect("depth of a tree with a usize number of leaves fits in usize")
}
