use thiserror::Error;

#[derive(Debug, Error)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub enum ReadError {
    #[error("list has too many elements (maximum: {maximum}, actual: {actual})")]
    ListTooLong { maximum: usize, actual: usize },
    #[error("vector has wrong length (expected: {expected}, actual: {actual})")]
    VectorSizeMismatch { expected: usize, actual: usize },
    #[error("bit list has no delimiting bit")]
    BitListNoDelimitingBit,
    #[error("bit vector has nonzero padding bits")]
    BitVectorNonzeroPadding,
    #[error("integer is not a decimal number")]
    InvalidDecimal,
    #[error("integer does not fit in 256 bits ({byte_count} bytes)")]
    Uint256Overflow { byte_count: usize },
}
