// Response bodies of the Beacon Node API endpoints used by the indexer.
// Unknown fields are ignored so that newer nodes can add fields without breaking the client.

use serde::{Deserialize, Serialize};
use types::phase0::primitives::{CommitteeIndex, Slot, UnixSeconds, ValidatorIndex, H256};

/// Wrapper used by most endpoints.
#[derive(Deserialize)]
pub struct EthResponse<T> {
    pub data: T,
}

/// <https://ethereum.github.io/beacon-APIs/#/Beacon/getEpochCommittees>
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct BeaconCommittee {
    #[serde(with = "serde_utils::string_or_native")]
    pub index: CommitteeIndex,
    #[serde(with = "serde_utils::string_or_native")]
    pub slot: Slot,
    #[serde(with = "serde_utils::string_or_native_sequence")]
    pub validators: Vec<ValidatorIndex>,
}

/// <https://ethereum.github.io/beacon-APIs/#/Beacon/getEpochSyncCommittees>
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct SyncCommittee {
    #[serde(with = "serde_utils::string_or_native_sequence")]
    pub validators: Vec<ValidatorIndex>,
}

/// <https://ethereum.github.io/beacon-APIs/#/Beacon/getGenesis>
#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct Genesis {
    #[serde(with = "serde_utils::string_or_native")]
    pub genesis_time: UnixSeconds,
    pub genesis_validators_root: H256,
}

/// Data of a `head` event from `/eth/v1/events`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct HeadEvent {
    #[serde(with = "serde_utils::string_or_native")]
    pub slot: Slot,
    pub block: H256,
    pub state: H256,
    pub epoch_transition: bool,
}
