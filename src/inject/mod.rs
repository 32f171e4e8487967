//! Synthetic input injection
//!
//! The emitter is platform-neutral and talks to the platform through the
//! [`InputSink`] trait; the Win32 implementation lives in `win32`.

mod emitter;
#[cfg(windows)]
mod win32;

pub use emitter::{
    chord_sequence, Emitter, InjectionTag, InputSink, SyntheticKey, DEFAULT_FALLBACK_DELAY,
};
#[cfg(windows)]
pub use win32::Win32Injector;

#[cfg(test)]
pub(crate) use emitter::testing;
