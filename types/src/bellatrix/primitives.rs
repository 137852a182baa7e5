use ssz::ByteList;

use crate::preset::Preset;

pub type Transaction<P> = ByteList<<P as Preset>::MaxBytesPerTransaction>;
