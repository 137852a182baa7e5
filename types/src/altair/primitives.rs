pub type SyncCommitteePeriod = u64;
