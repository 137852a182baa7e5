use core::{
    fmt::{Debug, Formatter, Result as FmtResult},
    marker::PhantomData,
};

use derivative::Derivative;
use derive_more::Deref;
use ethereum_types::H256;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use try_from_iterator::TryFromIterator;
use typenum::{Unsigned, U1};

use crate::{
    error::ReadError,
    merkle_tree,
    porcelain::SszHash,
};

/// An SSZ list backed by a [`Vec`].
#[derive(Deref, Derivative)]
#[derivative(
    Clone(bound = "T: Clone"),
    PartialEq(bound = "T: PartialEq"),
    Eq(bound = "T: Eq"),
    Default(bound = "")
)]
pub struct ContiguousList<T, N> {
    #[deref]
    elements: Vec<T>,
    #[derivative(PartialEq = "ignore")]
    phantom: PhantomData<N>,
}

impl<T: Debug, N> Debug for ContiguousList<T, N> {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        self.elements.fmt(formatter)
    }
}

impl<T, N: Unsigned> TryFrom<Vec<T>> for ContiguousList<T, N> {
    type Error = ReadError;

    fn try_from(elements: Vec<T>) -> Result<Self, Self::Error> {
        let maximum = N::USIZE;
        let actual = elements.len();

        if actual > maximum {
            return Err(ReadError::ListTooLong { maximum, actual });
        }

        Ok(Self {
            elements,
            phantom: PhantomData,
        })
    }
}

impl<T, N: Unsigned> TryFromIterator<T> for ContiguousList<T, N> {
    type Error = ReadError;

    fn try_from_iter(items: impl IntoIterator<Item = T>) -> Result<Self, Self::Error> {
        items.into_iter().collect::<Vec<_>>().try_into()
    }
}

impl<T, N> From<ContiguousList<T, N>> for Vec<T> {
    fn from(list: ContiguousList<T, N>) -> Self {
        list.elements
    }
}

impl<'list, T, N> IntoIterator for &'list ContiguousList<T, N> {
    type Item = &'list T;
    type IntoIter = core::slice::Iter<'list, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

impl<'de, T: Deserialize<'de>, N: Unsigned> Deserialize<'de> for ContiguousList<T, N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::deserialize(deserializer)?
            .try_into()
            .map_err(D::Error::custom)
    }
}

impl<T: Serialize, N> Serialize for ContiguousList<T, N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.elements.serialize(serializer)
    }
}

impl<T: SszHash, N: Unsigned> SszHash for ContiguousList<T, N> {
    type PackingFactor = U1;

    fn hash_tree_root(&self) -> H256 {
        let root = merkle_tree::merkleize_elements(&self.elements, N::USIZE);
        merkle_tree::mix_in_length(root, self.elements.len())
    }
}
