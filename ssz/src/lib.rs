//! Canonical hashing of the SSZ types that make up beacon blocks.
//!
//! Only `hash_tree_root` is implemented. Blocks are received as JSON from the Beacon Node API,
//! so there is no need for the binary encoding.

// These are re-exported primarily to make `ssz_derive` work without additional dependencies.
pub use ethereum_types::H256;
pub use hashing;
pub use ssz_derive::SszHash;
pub use typenum::U1;

pub use crate::{
    bit_list::BitList,
    bit_vector::BitVector,
    byte_list::ByteList,
    byte_vector::ByteVector,
    consts::{BITS_PER_BYTE, BYTES_PER_CHUNK},
    contiguous_list::ContiguousList,
    contiguous_vector::ContiguousVector,
    error::ReadError,
    merkle_tree::{merkleize_chunks, merkleize_elements, mix_in_length, pack_bytes},
    porcelain::SszHash,
    uint256::Uint256,
};

mod basic;
mod bit_list;
mod bit_vector;
mod byte_list;
mod byte_vector;
mod consts;
mod contiguous_list;
mod contiguous_vector;
mod error;
mod merkle_tree;
mod porcelain;
mod uint256;
