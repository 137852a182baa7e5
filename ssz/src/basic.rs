use ethereum_types::{H160, H256};
use typenum::{U1, U32, U4};

use crate::porcelain::SszHash;

impl SszHash for bool {
    type PackingFactor = U32;

    #[inline]
    fn hash_tree_root(&self) -> H256 {
        let mut hash = H256::zero();
        hash.as_bytes_mut()[0] = (*self).into();
        hash
    }
}

impl SszHash for u8 {
    type PackingFactor = U32;

    #[inline]
    fn hash_tree_root(&self) -> H256 {
        let mut hash = H256::zero();
        hash.as_bytes_mut()[0] = *self;
        hash
    }
}

impl SszHash for u64 {
    type PackingFactor = U4;

    #[inline]
    fn hash_tree_root(&self) -> H256 {
        let mut hash = H256::zero();
        hash.as_bytes_mut()[..size_of::<Self>()].copy_from_slice(&self.to_le_bytes());
        hash
    }
}

// `Bytes20` and `Bytes32` are vectors of bytes, so neither of them is packed when used as an
// element of another collection.
impl SszHash for H160 {
    type PackingFactor = U1;

    #[inline]
    fn hash_tree_root(&self) -> H256 {
        let mut hash = H256::zero();
        hash.as_bytes_mut()[..Self::len_bytes()].copy_from_slice(self.as_bytes());
        hash
    }
}

impl SszHash for H256 {
    type PackingFactor = U1;

    #[inline]
    fn hash_tree_root(&self) -> H256 {
        *self
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn u64_root_is_little_endian_and_zero_padded() {
        assert_eq!(
            0x0102_0304_u64.hash_tree_root(),
            H256(hex!(
                "0403020100000000000000000000000000000000000000000000000000000000"
            )),
        );
    }

    #[test]
    fn h160_root_is_left_aligned() {
        let address = H160::repeat_byte(0xab);
        let root = address.hash_tree_root();

        assert_eq!(&root[..20], address.as_bytes());
        assert_eq!(&root[20..], [0; 12]);
    }

    #[test]
    fn bool_root_is_single_byte() {
        assert_eq!(false.hash_tree_root(), H256::zero());

        let root = true.hash_tree_root();

        assert_eq!(root[0], 1);
        assert_eq!(&root[1..], [0; 31]);
    }
}
