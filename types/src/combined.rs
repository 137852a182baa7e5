use derive_more::From;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ssz::{SszHash, H256};
use typenum::U1;

use crate::{
    altair::containers::SignedBeaconBlock as AltairSignedBeaconBlock,
    bellatrix::containers::SignedBeaconBlock as BellatrixSignedBeaconBlock,
    capella::containers::SignedBeaconBlock as CapellaSignedBeaconBlock,
    nonstandard::Phase,
    phase0::{
        containers::SignedBeaconBlock as Phase0SignedBeaconBlock,
        primitives::{SignatureBytes, Slot},
    },
    preset::Preset,
    traits::BeaconBlock,
};

#[derive(Clone, PartialEq, Eq, Debug, From, Deserialize, Serialize)]
#[serde(bound = "", untagged)]
pub enum SignedBeaconBlock<P: Preset> {
    Phase0(Phase0SignedBeaconBlock<P>),
    Altair(AltairSignedBeaconBlock<P>),
    Bellatrix(BellatrixSignedBeaconBlock<P>),
    Capella(CapellaSignedBeaconBlock<P>),
}

impl<P: Preset> SszHash for SignedBeaconBlock<P> {
    type PackingFactor = U1;

    fn hash_tree_root(&self) -> H256 {
        match self {
            Self::Phase0(block) => block.hash_tree_root(),
            Self::Altair(block) => block.hash_tree_root(),
            Self::Bellatrix(block) => block.hash_tree_root(),
            Self::Capella(block) => block.hash_tree_root(),
        }
    }
}

impl<P: Preset> SignedBeaconBlock<P> {
    #[must_use]
    pub fn message(&self) -> &dyn BeaconBlock<P> {
        match self {
            Self::Phase0(block) => &block.message,
            Self::Altair(block) => &block.message,
            Self::Bellatrix(block) => &block.message,
            Self::Capella(block) => &block.message,
        }
    }

    #[must_use]
    pub const fn signature(&self) -> &SignatureBytes {
        match self {
            Self::Phase0(block) => &block.signature,
            Self::Altair(block) => &block.signature,
            Self::Bellatrix(block) => &block.signature,
            Self::Capella(block) => &block.signature,
        }
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        match self {
            Self::Phase0(_) => Phase::Phase0,
            Self::Altair(_) => Phase::Altair,
            Self::Bellatrix(_) => Phase::Bellatrix,
            Self::Capella(_) => Phase::Capella,
        }
    }

    #[must_use]
    pub fn slot(&self) -> Slot {
        self.message().slot()
    }
}

/// A block as returned by `/eth/v2/beacon/blocks/{block_id}`.
///
/// `data` is left undecoded because its schema depends on `version`,
/// which may name a phase this crate does not know about.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct VersionedSignedBeaconBlock {
    pub version: String,
    pub data: Value,
}

impl VersionedSignedBeaconBlock {
    pub fn new<P: Preset>(block: &SignedBeaconBlock<P>) -> serde_json::Result<Self> {
        Ok(Self {
            version: block.phase().to_string(),
            data: serde_json::to_value(block)?,
        })
    }
}
