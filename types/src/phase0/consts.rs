use typenum::{Add1, U32};

use crate::phase0::primitives::{Epoch, Slot};

pub const FAR_FUTURE_EPOCH: Epoch = Epoch::MAX;
pub const GENESIS_EPOCH: Epoch = 0;
pub const GENESIS_SLOT: Slot = 0;

pub type DepositContractTreeDepth = U32;

// The extra node is the mixed in deposit count.
pub type DepositProofLength = Add1<DepositContractTreeDepth>;
