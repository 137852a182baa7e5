use core::{
    fmt::{Debug, Formatter, Result as FmtResult},
    marker::PhantomData,
};

use derivative::Derivative;
use derive_more::Deref;
use ethereum_types::H256;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use typenum::{Unsigned, U1};

use crate::{consts::BYTES_PER_CHUNK, error::ReadError, merkle_tree, porcelain::SszHash};

#[derive(Deref, Derivative)]
#[derivative(Clone(bound = ""), PartialEq(bound = ""), Eq(bound = ""), Default(bound = ""))]
pub struct ByteList<N> {
    #[deref]
    bytes: Vec<u8>,
    #[derivative(PartialEq = "ignore")]
    phantom: PhantomData<N>,
}

impl<N> Debug for ByteList<N> {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        write!(formatter, "0x{}", hex::encode(&self.bytes))
    }
}

impl<N> AsRef<[u8]> for ByteList<N> {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl<N: Unsigned> TryFrom<Vec<u8>> for ByteList<N> {
    type Error = ReadError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        let maximum = N::USIZE;
        let actual = bytes.len();

        if actual > maximum {
            return Err(ReadError::ListTooLong { maximum, actual });
        }

        Ok(Self {
            bytes,
            phantom: PhantomData,
        })
    }
}

impl<'de, N: Unsigned> Deserialize<'de> for ByteList<N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_utils::prefixed_hex::deserialize(deserializer)?
            .try_into()
            .map_err(D::Error::custom)
    }
}

impl<N> Serialize for ByteList<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde_utils::prefixed_hex::serialize(&self.bytes, serializer)
    }
}

impl<N: Unsigned> SszHash for ByteList<N> {
    type PackingFactor = U1;

    fn hash_tree_root(&self) -> H256 {
        let root = merkle_tree::merkleize_chunks(
            merkle_tree::pack_bytes(&self.bytes),
            N::USIZE.div_ceil(BYTES_PER_CHUNK),
        );

        merkle_tree::mix_in_length(root, self.bytes.len())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use typenum::{U32, U64};

    use super::*;

    #[test]
    fn empty_extra_data_round_trips_as_0x() -> Result<(), serde_json::Error> {
        let extra_data = serde_json::from_value::<ByteList<U32>>(json!("0x"))?;

        assert!(extra_data.is_empty());
        assert_eq!(serde_json::to_value(extra_data)?, json!("0x"));

        Ok(())
    }

    #[test]
    fn root_of_short_list_hashes_padded_chunk_with_length() -> Result<(), ReadError> {
        let list = ByteList::<U64>::try_from(vec![0xaa, 0xbb])?;

        let mut chunk = H256::zero();
        chunk.0[0] = 0xaa;
        chunk.0[1] = 0xbb;

        let expected = merkle_tree::mix_in_length(hashing::hash_256_256(chunk, H256::zero()), 2);

        assert_eq!(list.hash_tree_root(), expected);

        Ok(())
    }
}
