use core::convert::Infallible;

/// Fallible counterpart of [`FromIterator`] for bounded collections.
///
/// Implementing [`TryFrom`] instead would conflict with the blanket impl for [`Into`].
pub trait TryFromIterator<T>: Sized {
    type Error;

    fn try_from_iter(items: impl IntoIterator<Item = T>) -> Result<Self, Self::Error>;
}

impl<T> TryFromIterator<T> for Vec<T> {
    type Error = Infallible;

    fn try_from_iter(items: impl IntoIterator<Item = T>) -> Result<Self, Self::Error> {
        Ok(items.into_iter().collect())
    }
}
