use crate::phase0::{
    containers::{BeaconBlockHeader, SignedBeaconBlockHeader},
    primitives::SignatureBytes,
};

impl BeaconBlockHeader {
    #[inline]
    #[must_use]
    pub const fn with_signature(self, signature: SignatureBytes) -> SignedBeaconBlockHeader {
        SignedBeaconBlockHeader {
            message: self,
            signature,
        }
    }
}
