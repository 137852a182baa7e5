pub use crate::{
    helpers::start_timer_vec,
    metrics::{CommitteeSource, Metrics, METRICS},
};

mod helpers;
mod metrics;
