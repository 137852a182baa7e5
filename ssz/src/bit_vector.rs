use core::{
    fmt::{Debug, Formatter, Result as FmtResult},
    marker::PhantomData,
};

use bitvec::{order::Lsb0, vec::BitVec};
use derivative::Derivative;
use derive_more::{Deref, DerefMut};
use ethereum_types::H256;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use typenum::{Unsigned, U1};

use crate::{
    consts::{BITS_PER_BYTE, BITS_PER_CHUNK},
    error::ReadError,
    merkle_tree,
    porcelain::SszHash,
};

#[derive(Deref, DerefMut, Derivative)]
#[derivative(Clone(bound = ""), PartialEq(bound = ""), Eq(bound = ""))]
pub struct BitVector<N> {
    #[deref]
    #[deref_mut]
    bits: BitVec<u8, Lsb0>,
    #[derivative(PartialEq = "ignore")]
    phantom: PhantomData<N>,
}

impl<N: Unsigned> Default for BitVector<N> {
    fn default() -> Self {
        Self {
            bits: BitVec::repeat(false, N::USIZE),
            phantom: PhantomData,
        }
    }
}

impl<N> Debug for BitVector<N> {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        formatter.write_str("0b")?;

        for bit in self.bits.iter().by_vals() {
            formatter.write_str(if bit { "1" } else { "0" })?;
        }

        Ok(())
    }
}

impl<N: Unsigned> TryFrom<Vec<u8>> for BitVector<N> {
    type Error = ReadError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        let expected = N::USIZE.div_ceil(BITS_PER_BYTE);
        let actual = bytes.len();

        if actual != expected {
            return Err(ReadError::VectorSizeMismatch { expected, actual });
        }

        let mut bits = BitVec::from_vec(bytes);

        if bits[N::USIZE..].any() {
            return Err(ReadError::BitVectorNonzeroPadding);
        }

        bits.truncate(N::USIZE);

        Ok(Self {
            bits,
            phantom: PhantomData,
        })
    }
}

impl<N> BitVector<N> {
    /// Returns the bits packed into bytes, least significant bit first.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.packed_bytes()
    }

    fn packed_bytes(&self) -> &[u8] {
        &self.bits.as_raw_slice()[..self.bits.len().div_ceil(BITS_PER_BYTE)]
    }
}

impl<'de, N: Unsigned> Deserialize<'de> for BitVector<N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_utils::prefixed_hex::deserialize(deserializer)?
            .try_into()
            .map_err(D::Error::custom)
    }
}

impl<N> Serialize for BitVector<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde_utils::prefixed_hex::serialize(self.packed_bytes(), serializer)
    }
}

impl<N: Unsigned> SszHash for BitVector<N> {
    type PackingFactor = U1;

    fn hash_tree_root(&self) -> H256 {
        merkle_tree::merkleize_chunks(
            merkle_tree::pack_bytes(self.packed_bytes()),
            N::USIZE.div_ceil(BITS_PER_CHUNK),
        )
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use serde_json::json;
    use typenum::{U12, U32, U512};

    use super::*;

    #[test]
    fn bits_are_read_least_significant_first() -> Result<()> {
        let bit_vector = serde_json::from_value::<BitVector<U12>>(json!("0x0108"))?;

        let set_bits = bit_vector.iter_ones().collect::<Vec<_>>();

        assert_eq!(set_bits, [0, 11]);

        Ok(())
    }

    #[test]
    fn padding_bits_must_be_zero() {
        assert!(serde_json::from_value::<BitVector<U12>>(json!("0x0110")).is_err());
    }

    #[test]
    fn wrong_byte_count_is_rejected() {
        assert!(serde_json::from_value::<BitVector<U32>>(json!("0xffffff")).is_err());
    }

    #[test]
    fn mainnet_sync_committee_bits_span_two_chunks() -> Result<()> {
        let hex = format!("0x{}", "ff".repeat(64));
        let bit_vector = serde_json::from_value::<BitVector<U512>>(json!(hex))?;

        let full_chunk = H256::repeat_byte(0xff);

        assert_eq!(
            bit_vector.hash_tree_root(),
            hashing::hash_256_256(full_chunk, full_chunk),
        );

        Ok(())
    }
}
