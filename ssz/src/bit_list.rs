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
#[derivative(Clone(bound = ""), PartialEq(bound = ""), Eq(bound = ""), Default(bound = ""))]
pub struct BitList<N> {
    // We rely on `Lsb0` to match the bit order used by SSZ.
    #[deref]
    #[deref_mut]
    bits: BitVec<u8, Lsb0>,
    #[derivative(PartialEq = "ignore")]
    phantom: PhantomData<N>,
}

impl<N> Debug for BitList<N> {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        formatter.write_str("0b")?;

        for bit in self.bits.iter().by_vals() {
            formatter.write_str(if bit { "1" } else { "0" })?;
        }

        Ok(())
    }
}

impl<N: Unsigned> BitList<N> {
    /// Creates a list of `length` unset bits.
    pub fn with_length(length: usize) -> Result<Self, ReadError> {
        Self::validate_length(length)?;

        Ok(Self {
            bits: BitVec::repeat(false, length),
            phantom: PhantomData,
        })
    }

    /// Decodes the SSZ representation, in which the highest set bit marks the end of the list.
    pub fn from_ssz_bytes(mut bytes: Vec<u8>) -> Result<Self, ReadError> {
        let last_byte = bytes.last().copied().unwrap_or_default();

        if last_byte == 0 {
            return Err(ReadError::BitListNoDelimitingBit);
        }

        let delimiter_position = BITS_PER_BYTE - 1 - last_byte.leading_zeros() as usize;
        let length = (bytes.len() - 1) * BITS_PER_BYTE + delimiter_position;

        Self::validate_length(length)?;

        if let Some(last_byte) = bytes.last_mut() {
            *last_byte &= !(1 << delimiter_position);
        }

        let mut bits = BitVec::from_vec(bytes);
        bits.truncate(length);

        Ok(Self {
            bits,
            phantom: PhantomData,
        })
    }

    fn validate_length(length: usize) -> Result<(), ReadError> {
        let maximum = N::USIZE;

        if length > maximum {
            return Err(ReadError::ListTooLong {
                maximum,
                actual: length,
            });
        }

        Ok(())
    }
}

impl<N> BitList<N> {
    #[must_use]
    pub fn to_ssz_bytes(&self) -> Vec<u8> {
        let length = self.bits.len();
        let mut bytes = self.packed_bytes().to_vec();

        bytes.resize(length / BITS_PER_BYTE + 1, 0);
        bytes[length / BITS_PER_BYTE] |= 1 << (length % BITS_PER_BYTE);
        bytes
    }

    // Bits past the end of the list are never set, but the backing `Vec` may hold extra bytes.
    fn packed_bytes(&self) -> &[u8] {
        &self.bits.as_raw_slice()[..self.bits.len().div_ceil(BITS_PER_BYTE)]
    }
}

impl<'de, N: Unsigned> Deserialize<'de> for BitList<N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes = serde_utils::prefixed_hex::deserialize(deserializer)?;
        Self::from_ssz_bytes(bytes).map_err(D::Error::custom)
    }
}

impl<N> Serialize for BitList<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde_utils::prefixed_hex::serialize(self.to_ssz_bytes(), serializer)
    }
}

impl<N: Unsigned> SszHash for BitList<N> {
    type PackingFactor = U1;

    fn hash_tree_root(&self) -> H256 {
        let root = merkle_tree::merkleize_chunks(
            merkle_tree::pack_bytes(self.packed_bytes()),
            N::USIZE.div_ceil(BITS_PER_CHUNK),
        );

        merkle_tree::mix_in_length(root, self.bits.len())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use serde_json::json;
    use test_case::test_case;
    use typenum::{U2048, U8};

    use super::*;

    #[test_case("0x01" => 0)]
    #[test_case("0x02" => 1)]
    #[test_case("0x0f" => 3)]
    #[test_case("0xff01" => 8)]
    #[test_case("0xff03" => 9)]
    fn length_is_position_of_delimiting_bit(json: &str) -> usize {
        serde_json::from_value::<BitList<U2048>>(json!(json))
            .expect("test cases are valid bit lists")
            .len()
    }

    #[test]
    fn delimiting_bit_is_not_part_of_the_list() -> Result<()> {
        let bit_list = serde_json::from_value::<BitList<U2048>>(json!("0x0d"))?;

        assert_eq!(bit_list.iter().by_vals().collect::<Vec<_>>(), [true, false, true]);
        assert_eq!(serde_json::to_value(&bit_list)?, json!("0x0d"));

        Ok(())
    }

    #[test]
    fn missing_delimiting_bit_is_rejected() {
        assert!(serde_json::from_value::<BitList<U2048>>(json!("0x0100")).is_err());
        assert!(serde_json::from_value::<BitList<U2048>>(json!("0x")).is_err());
    }

    #[test]
    fn list_longer_than_maximum_is_rejected() {
        assert!(serde_json::from_value::<BitList<U8>>(json!("0xff01")).is_ok());
        assert!(serde_json::from_value::<BitList<U8>>(json!("0xff03")).is_err());
    }

    #[test]
    fn full_byte_list_does_not_hash_delimiter_byte() -> Result<()> {
        let bit_list = serde_json::from_value::<BitList<U2048>>(json!("0xff01"))?;

        let mut chunk = H256::zero();
        chunk.0[0] = 0xff;

        // 2048 bits fit in 8 chunks.
        let root = merkle_tree::merkleize_chunks([chunk], 8);

        assert_eq!(bit_list.hash_tree_root(), merkle_tree::mix_in_length(root, 8));

        Ok(())
    }
}
