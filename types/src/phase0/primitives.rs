use ssz::ByteVector;
use typenum::{U48, U96};

pub use ethereum_types::{H160, H256};

pub type CommitteeIndex = u64;
pub type DepositIndex = u64;
pub type Epoch = u64;
pub type ExecutionAddress = H160;
pub type ExecutionBlockHash = H256;
pub type ExecutionBlockNumber = u64;
pub type Gas = u64;
pub type Gwei = u64;
pub type Slot = u64;
pub type UnixSeconds = u64;
pub type ValidatorIndex = u64;

// Signatures and public keys are never verified or decompressed, so they are kept as raw bytes.
pub type PublicKeyBytes = ByteVector<U48>;
pub type SignatureBytes = ByteVector<U96>;
