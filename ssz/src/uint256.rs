use core::fmt::{Display, Formatter, Result as FmtResult};

use ethereum_types::H256;
use num_bigint::BigUint;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use typenum::U1;

use crate::{error::ReadError, porcelain::SszHash};

/// A 256-bit unsigned integer kept in its SSZ (little-endian) byte order.
///
/// Consumers that need to do arithmetic on the value should reverse the bytes and build a
/// big-endian integer out of them. The JSON representation is a decimal string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug)]
pub struct Uint256([u8; 32]);

impl Uint256 {
    #[must_use]
    pub const fn from_le_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn to_le_bytes(self) -> [u8; 32] {
        self.0
    }

    pub fn from_decimal(string: &str) -> Result<Self, ReadError> {
        let value = string
            .parse::<BigUint>()
            .map_err(|_| ReadError::InvalidDecimal)?;

        Self::try_from(&value)
    }
}

impl TryFrom<&BigUint> for Uint256 {
    type Error = ReadError;

    fn try_from(value: &BigUint) -> Result<Self, Self::Error> {
        let digits = value.to_bytes_le();
        let byte_count = digits.len();

        if byte_count > 32 {
            return Err(ReadError::Uint256Overflow { byte_count });
        }

        let mut bytes = [0; 32];
        bytes[..byte_count].copy_from_slice(&digits);
        Ok(Self(bytes))
    }
}

impl Display for Uint256 {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        BigUint::from_bytes_le(&self.0).fmt(formatter)
    }
}

impl<'de> Deserialize<'de> for Uint256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let string = String::deserialize(deserializer)?;
        Self::from_decimal(&string).map_err(D::Error::custom)
    }
}

impl Serialize for Uint256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl SszHash for Uint256 {
    type PackingFactor = U1;

    fn hash_tree_root(&self) -> H256 {
        H256(self.0)
    }
}
