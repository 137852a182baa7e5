use ethereum_types::H256;
use typenum::{NonZero, Unsigned};

pub trait SszHash {
    /// Number of values of this type that fit in a single chunk when packed into a list or vector.
    ///
    /// Composite types and types at least as large as a chunk are not packed and have a packing
    /// factor of 1. Their roots are used as chunks directly.
    type PackingFactor: Unsigned + NonZero;

    fn hash_tree_root(&self) -> H256;
}
