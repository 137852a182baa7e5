pub use crate::{
    api::{Eth2Api, Eth2ApiError},
    containers::{BeaconCommittee, Genesis, HeadEvent, SyncCommittee},
    events::EventBuffer,
    traits::{BeaconCommitteesProvider, SignedBeaconBlockProvider, SyncCommitteeProvider},
};

mod api;
mod containers;
mod events;
mod traits;
