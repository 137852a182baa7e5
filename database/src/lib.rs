use core::ops::Range;
use std::{
    borrow::Cow,
    collections::BTreeMap,
    path::Path,
    sync::{Arc, Mutex},
};

use anyhow::Result;
use bytesize::ByteSize;
use im::OrdMap;
use itertools::Either;
use libmdbx::{DatabaseFlags, Environment, Geometry, WriteFlags};
use log::info;
use snap::raw::{Decoder, Encoder};
use tap::Pipe as _;
use thiserror::Error;

pub use crate::transaction::Transaction;

mod transaction;

const GROWTH_STEP: ByteSize = ByteSize::mib(256);
const MAX_NAMED_DATABASES: usize = 4;

// <https://erthink.github.io/libmdbx/group__c__opening.html#gabb7dd3b10dd31639ba252df545e11768>
const FILE_PERMISSIONS: u16 = 0o600;

/// Pending writes keyed by database key.
pub type WriteBatch = BTreeMap<Vec<u8>, Vec<u8>>;

/// Ordered key-value store with `snap`-compressed values.
///
/// Multi-key updates go through [`Database::write_batch`], which applies all of them in a single
/// storage transaction. See [`Transaction`] for buffered read-your-writes access.
pub struct Database(DatabaseKind);

impl Database {
    pub fn persistent(
        name: &str,
        directory: impl AsRef<Path>,
        max_size: ByteSize,
    ) -> Result<Self> {
        let directory = directory.as_ref();

        fs_err::create_dir_all(directory)?;

        let environment = Environment::builder()
            .set_max_dbs(MAX_NAMED_DATABASES)
            .set_geometry(Geometry {
                size: Some(..usize::try_from(max_size.as_u64())?),
                growth_step: Some(isize::try_from(GROWTH_STEP.as_u64())?),
                shrink_threshold: None,
                page_size: None,
            })
            .open_with_permissions(directory, FILE_PERMISSIONS.into())?;

        let transaction = environment.begin_rw_txn()?;
        transaction.create_db(Some(name), DatabaseFlags::default())?;
        transaction.commit()?;

        info!(
            "opened database {name} in {} (maximum size: {max_size})",
            directory.to_str().ok_or(Error::NonUnicodePath)?,
        );

        Ok(Self(DatabaseKind::Persistent {
            database_name: name.to_owned(),
            environment,
        }))
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self(DatabaseKind::InMemory {
            map: Mutex::default(),
        })
    }

    pub fn get(&self, key: impl AsRef<[u8]>) -> Result<Option<Vec<u8>>> {
        match self.kind() {
            DatabaseKind::Persistent {
                database_name,
                environment,
            } => {
                let transaction = environment.begin_ro_txn()?;
                let database = transaction.open_db(Some(database_name))?;

                transaction
                    .get::<Cow<_>>(database.dbi(), key.as_ref())?
                    .map(|compressed| decompress(&compressed))
            }
            DatabaseKind::InMemory { map } => map
                .lock()
                .expect("in-memory database mutex is poisoned")
                .get(key.as_ref())
                .map(|compressed| decompress(compressed)),
        }
        .transpose()
    }

    /// Iterates over pairs with keys in `range` in ascending key order.
    ///
    /// The iterator reads from a snapshot taken when this method is called.
    pub fn iterator_ascending(
        &self,
        range: Range<impl AsRef<[u8]>>,
    ) -> Result<impl Iterator<Item = Result<(Vec<u8>, Vec<u8>)>>> {
        let start = range.start.as_ref();
        let end = range.end.as_ref().to_vec();

        match self.kind() {
            DatabaseKind::Persistent {
                database_name,
                environment,
            } => {
                let transaction = environment.begin_ro_txn()?;
                let database = transaction.open_db(Some(database_name))?;

                let mut cursor = transaction.cursor(&database)?;

                cursor
                    .set_range::<Vec<u8>, Cow<[u8]>>(start)
                    .transpose()
                    .into_iter()
                    .chain(core::iter::from_fn(move || {
                        cursor.next::<Vec<u8>, Cow<[u8]>>().transpose()
                    }))
                    .map(|result| decompress_pair(result?))
                    .take_while(move |result| {
                        result
                            .as_ref()
                            .map_or(true, |(key, _)| key.as_slice() < end.as_slice())
                    })
                    .pipe(Either::Left)
            }
            DatabaseKind::InMemory { map } => {
                let map = map.lock().expect("in-memory database mutex is poisoned");
                let start_pair = map.get_key_value(start);
                let (_, mut above) = map.split(start);

                if let Some((key, value)) = start_pair {
                    above.insert(Arc::clone(key), Arc::clone(value));
                }

                above
                    .into_iter()
                    .take_while(move |(key, _)| key.as_ref() < end.as_slice())
                    .map(|(key, value)| Ok((key.to_vec(), decompress(value.as_ref())?)))
                    .pipe(Either::Right)
            }
        }
        .pipe(Ok)
    }

    /// Applies all writes in `batch` atomically. Either all of them are persisted or none are.
    pub fn write_batch(&self, batch: WriteBatch) -> Result<()> {
        match self.kind() {
            DatabaseKind::Persistent {
                database_name,
                environment,
            } => {
                let transaction = environment.begin_rw_txn()?;
                let database = transaction.open_db(Some(database_name))?;

                for (key, value) in batch {
                    let compressed = compress(&value)?;
                    transaction.put(database.dbi(), key, compressed, WriteFlags::default())?;
                }

                transaction.commit()?;
            }
            DatabaseKind::InMemory { map } => {
                // Build the new map before replacing the old one so that a failed compression
                // leaves the database unchanged.
                let mut map = map.lock().expect("in-memory database mutex is poisoned");
                let mut new_map = map.clone();

                for (key, value) in batch {
                    new_map.insert(key.into(), compress(&value)?.into());
                }

                *map = new_map;
            }
        }

        Ok(())
    }

    const fn kind(&self) -> &DatabaseKind {
        &self.0
    }
}

enum DatabaseKind {
    Persistent {
        database_name: String,
        environment: Environment,
    },
    InMemory {
        // `OrdMap` is cloned on every batch and by iterators, so the elements must be cheap to
        // clone. This rules out `Vec<u8>` and `Box<[u8]>`.
        map: Mutex<InMemoryMap>,
    },
}

#[derive(Debug, Error)]
enum Error {
    #[error("database directory path should be a valid Unicode string")]
    NonUnicodePath,
}

type InMemoryMap = OrdMap<Arc<[u8]>, Arc<[u8]>>;

fn compress(data: &[u8]) -> Result<Vec<u8>> {
    Encoder::new().compress_vec(data).map_err(Into::into)
}

fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    Decoder::new().decompress_vec(data).map_err(Into::into)
}

fn decompress_pair<K>((key, compressed_value): (K, Cow<[u8]>)) -> Result<(K, Vec<u8>)> {
    let value = decompress(&compressed_value)?;
    Ok((key, value))
}

#[cfg(test)]
pub(crate) mod tests {
    use tempfile::TempDir;
    use test_case::test_case;

    use super::*;

    pub type Constructor = fn() -> Result<Database>;

    #[test_case(build_persistent_database)]
    #[test_case(build_in_memory_database)]
    fn test_get(constructor: Constructor) -> Result<()> {
        let database = constructor()?;

        assert_eq!(database.get("A")?, Some(to_bytes("1")));
        assert_eq!(database.get("D")?, None);

        Ok(())
    }

    #[test_case(build_persistent_database)]
    #[test_case(build_in_memory_database)]
    fn test_iterator_ascending(constructor: Constructor) -> Result<()> {
        let database = constructor()?;

        assert_pairs_eq(
            database.iterator_ascending("0".."Z")?,
            [("A", "1"), ("B", "2"), ("C", "3"), ("E", "5")],
        )?;

        assert_pairs_eq(
            database.iterator_ascending("B".."E")?,
            [("B", "2"), ("C", "3")],
        )?;

        assert_pairs_eq(database.iterator_ascending("D".."F")?, [("E", "5")])?;
        assert_pairs_eq(database.iterator_ascending("C".."C")?, [])?;
        assert_pairs_eq(database.iterator_ascending("F".."Z")?, [])?;

        Ok(())
    }

    #[test_case(build_persistent_database)]
    #[test_case(build_in_memory_database)]
    fn test_write_batch_inserts_and_overwrites(constructor: Constructor) -> Result<()> {
        let database = constructor()?;

        let batch = WriteBatch::from([
            (to_bytes("B"), to_bytes("20")),
            (to_bytes("D"), to_bytes("4")),
        ]);

        database.write_batch(batch)?;

        assert_pairs_eq(
            database.iterator_ascending("A".."Z")?,
            [("A", "1"), ("B", "20"), ("C", "3"), ("D", "4"), ("E", "5")],
        )?;

        Ok(())
    }

    // This covers a bug in the in-memory backend where iterating mutated the map.
    #[test_case(build_persistent_database)]
    #[test_case(build_in_memory_database)]
    fn test_iterators_do_not_modify_the_database(constructor: Constructor) -> Result<()> {
        let database = constructor()?;

        assert_pairs_eq(database.iterator_ascending("E".."Z")?, [("E", "5")])?;
        assert_pairs_eq(database.iterator_ascending("E".."Z")?, [("E", "5")])?;

        assert_pairs_eq(database.iterator_ascending("F".."Z")?, [])?;
        assert_pairs_eq(database.iterator_ascending("F".."Z")?, [])?;

        Ok(())
    }

    #[test_case(build_persistent_database)]
    #[test_case(build_in_memory_database)]
    fn test_isolation(constructor: Constructor) -> Result<()> {
        let database = constructor()?;
        let iterator = database.iterator_ascending("A".."Z")?;

        database.write_batch(WriteBatch::from([
            (to_bytes("A"), to_bytes("10")),
            (to_bytes("D"), to_bytes("4")),
        ]))?;

        assert_pairs_eq(iterator, [("A", "1"), ("B", "2"), ("C", "3"), ("E", "5")])?;

        Ok(())
    }

    pub fn build_persistent_database() -> Result<Database> {
        // The directory is deleted when `TempDir` is dropped. `libmdbx` keeps working with the
        // open file handles until the environment is closed.
        let database = Database::persistent("test_db", TempDir::new()?, ByteSize::mib(1))?;

        populate_database(&database)?;
        Ok(database)
    }

    pub fn build_in_memory_database() -> Result<Database> {
        let database = Database::in_memory();
        populate_database(&database)?;
        Ok(database)
    }

    fn populate_database(database: &Database) -> Result<()> {
        database.write_batch(WriteBatch::from([
            (to_bytes("A"), to_bytes("1")),
            (to_bytes("B"), to_bytes("2")),
            (to_bytes("C"), to_bytes("3")),
        ]))?;

        database.write_batch(WriteBatch::from([(to_bytes("E"), to_bytes("5"))]))?;

        Ok(())
    }

    pub fn assert_pairs_eq<'strings>(
        actual_pairs: impl IntoIterator<Item = Result<(impl AsRef<[u8]>, impl AsRef<[u8]>)>>,
        expected_pairs: impl IntoIterator<Item = (&'strings str, &'strings str)>,
    ) -> Result<()> {
        let actual_pairs = to_string_pairs(actual_pairs)?;
        let expected_pairs = to_string_pairs(expected_pairs.into_iter().map(Ok))?;

        assert_eq!(actual_pairs, expected_pairs);

        Ok(())
    }

    fn to_string_pairs(
        pairs: impl IntoIterator<Item = Result<(impl AsRef<[u8]>, impl AsRef<[u8]>)>>,
    ) -> Result<Vec<(String, String)>> {
        pairs
            .into_iter()
            .map(|result| {
                let (key, value) = result?;
                let key_string = core::str::from_utf8(key.as_ref())?;
                let value_string = core::str::from_utf8(value.as_ref())?;
                Ok((key_string.to_owned(), value_string.to_owned()))
            })
            .collect()
    }

    pub fn to_bytes(string: &str) -> Vec<u8> {
        string.as_bytes().to_vec()
    }
}
