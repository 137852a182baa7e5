use core::{
    fmt::{Debug, Formatter, Result as FmtResult},
    marker::PhantomData,
};

use derivative::Derivative;
use derive_more::Deref;
use ethereum_types::H256;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use typenum::{Unsigned, U1};

use crate::{error::ReadError, merkle_tree, porcelain::SszHash};

/// An SSZ vector whose elements are stored in a single allocation.
#[derive(Deref, Derivative)]
#[derivative(
    Clone(bound = "T: Clone"),
    PartialEq(bound = "T: PartialEq"),
    Eq(bound = "T: Eq")
)]
pub struct ContiguousVector<T, N> {
    #[deref]
    elements: Box<[T]>,
    #[derivative(PartialEq = "ignore")]
    phantom: PhantomData<N>,
}

impl<T: Debug, N> Debug for ContiguousVector<T, N> {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        self.elements.fmt(formatter)
    }
}

impl<T: Default, N: Unsigned> Default for ContiguousVector<T, N> {
    fn default() -> Self {
        Self {
            elements: core::iter::repeat_with(T::default).take(N::USIZE).collect(),
            phantom: PhantomData,
        }
    }
}

impl<T, N: Unsigned> TryFrom<Vec<T>> for ContiguousVector<T, N> {
    type Error = ReadError;

    fn try_from(elements: Vec<T>) -> Result<Self, Self::Error> {
        let expected = N::USIZE;
        let actual = elements.len();

        if actual != expected {
            return Err(ReadError::VectorSizeMismatch { expected, actual });
        }

        Ok(Self {
            elements: elements.into_boxed_slice(),
            phantom: PhantomData,
        })
    }
}

impl<'de, T: Deserialize<'de>, N: Unsigned> Deserialize<'de> for ContiguousVector<T, N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::deserialize(deserializer)?
            .try_into()
            .map_err(D::Error::custom)
    }
}

impl<T: Serialize, N> Serialize for ContiguousVector<T, N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.elements.serialize(serializer)
    }
}

impl<T: SszHash, N: Unsigned> SszHash for ContiguousVector<T, N> {
    type PackingFactor = U1;

    fn hash_tree_root(&self) -> H256 {
        merkle_tree::merkleize_elements(&self.elements, N::USIZE)
    }
}
