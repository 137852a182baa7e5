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

/// A fixed-length byte string such as a BLS public key or signature.
///
/// `H256` and `H160` are used for 32 and 20 byte values instead of this.
#[derive(Deref, Derivative)]
#[derivative(Clone(bound = ""), PartialEq(bound = ""), Eq(bound = ""), Hash(bound = ""))]
pub struct ByteVector<N> {
    #[deref]
    bytes: Box<[u8]>,
    #[derivative(PartialEq = "ignore", Hash = "ignore")]
    phantom: PhantomData<N>,
}

impl<N: Unsigned> Default for ByteVector<N> {
    fn default() -> Self {
        Self {
            bytes: vec![0; N::USIZE].into_boxed_slice(),
            phantom: PhantomData,
        }
    }
}

impl<N> Debug for ByteVector<N> {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        write!(formatter, "0x{}", hex::encode(&self.bytes))
    }
}

impl<N> AsRef<[u8]> for ByteVector<N> {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl<N: Unsigned> TryFrom<Vec<u8>> for ByteVector<N> {
    type Error = ReadError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        let expected = N::USIZE;
        let actual = bytes.len();

        if actual != expected {
            return Err(ReadError::VectorSizeMismatch { expected, actual });
        }

        Ok(Self {
            bytes: bytes.into_boxed_slice(),
            phantom: PhantomData,
        })
    }
}

impl<N: Unsigned> TryFrom<&[u8]> for ByteVector<N> {
    type Error = ReadError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        bytes.to_vec().try_into()
    }
}

impl<'de, N: Unsigned> Deserialize<'de> for ByteVector<N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_utils::prefixed_hex::deserialize(deserializer)?
            .try_into()
            .map_err(D::Error::custom)
    }
}

impl<N> Serialize for ByteVector<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde_utils::prefixed_hex::serialize(&self.bytes, serializer)
    }
}

impl<N: Unsigned> SszHash for ByteVector<N> {
    type PackingFactor = U1;

    fn hash_tree_root(&self) -> H256 {
        merkle_tree::merkleize_chunks(
            merkle_tree::pack_bytes(&self.bytes),
            N::USIZE.div_ceil(BYTES_PER_CHUNK),
        )
    }
}
