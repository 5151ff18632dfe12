//! Guest memory model and diagnostic tracing shared across the simulator crates.
//!
//! Everything here is agnostic to where the guest image actually came
//! from (a file, a test fixture, a future live driver capture).

pub mod memory;
pub mod trace;

pub use memory::{GuestMemory, MemError};
pub use trace::TraceMask;
