//! State machine module for meta-key interception
//!
//! Every meta session moves through three states:
//! - Idle: no meta key held
//! - MetaHeldAmbiguous: meta held, waiting to see whether it is a tap
//! - MetaHeldPassthrough: meta held as part of a combo, events forwarded

mod machine;
mod session;

pub use machine::{Interceptor, State, Verdict};
