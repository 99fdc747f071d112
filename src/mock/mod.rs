//! Mock Directory Implementation
//!
//! Implements an in-memory directory and settings service for testing the
//! reconciler without network access. Every call is recorded so tests can
//! assert on exactly what would have been sent, and failures can be injected
//! per operation (optionally for one address) to exercise error paths.

mod directory;
mod failure;
mod state;

pub use directory::MockDirectory;
pub use failure::{FailureConfig, FailureInjector, Operation};
pub use state::{Call, MockState};
