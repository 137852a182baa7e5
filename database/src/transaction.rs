use core::ops::Range;
use std::{collections::BTreeMap, sync::Arc};

use anyhow::Result;

use crate::{Database, WriteBatch};

/// Buffered writes on top of a [`Database`].
///
/// Reads see the transaction's own writes. Nothing reaches the database until [`commit`] is
/// called, which applies every buffered write at once. Dropping the transaction discards them.
///
/// [`commit`]: Transaction::commit
pub struct Transaction {
    database: Arc<Database>,
    writes: WriteBatch,
}

impl Transaction {
    #[must_use]
    pub const fn new(database: Arc<Database>) -> Self {
        Self {
            database,
            writes: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn get(&self, key: impl AsRef<[u8]>) -> Result<Option<Vec<u8>>> {
        match self.writes.get(key.as_ref()) {
            Some(pending) => Ok(Some(pending.clone())),
            None => self.database.get(key),
        }
    }

    /// Returns pairs with keys in `range` in ascending key order, including uncommitted writes.
    pub fn iterator_ascending(
        &self,
        range: Range<impl AsRef<[u8]>>,
    ) -> Result<impl Iterator<Item = (Vec<u8>, Vec<u8>)>> {
        let start = range.start.as_ref().to_vec();
        let end = range.end.as_ref().to_vec();

        let mut merged = self
            .database
            .iterator_ascending(start.as_slice()..end.as_slice())?
            .collect::<Result<BTreeMap<_, _>>>()?;

        if start < end {
            merged.extend(
                self.writes
                    .range(start..end)
                    .map(|(key, value)| (key.clone(), value.clone())),
            );
        }

        Ok(merged.into_iter())
    }

    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.writes.insert(key.into(), value.into());
    }

    pub fn commit(self) -> Result<()> {
        if self.writes.is_empty() {
            return Ok(());
        }

        self.database.write_batch(self.writes)
    }
}
