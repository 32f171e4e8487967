//! Process lifecycle: orderly shutdown

mod shutdown;

pub use shutdown::{ShutdownReason, ShutdownSignal};
