pub mod combined;
pub mod config;
pub mod nonstandard;
pub mod preset;
pub mod traits;

pub mod phase0 {
    pub mod consts;
    pub mod containers;
    pub mod primitives;

    mod container_impls;
}

pub mod altair {
    pub mod containers;
    pub mod primitives;
}

pub mod bellatrix {
    pub mod containers;
    pub mod primitives;
}

pub mod capella {
    pub mod containers;
    pub mod primitives;
}

