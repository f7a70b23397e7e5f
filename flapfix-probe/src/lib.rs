//! Environment probing for the flapfix installer.
//!
//! Every prerequisite becomes a [`Check`] in a [`ProbeReport`]; probing
//! never aborts early and never mutates any path, so a single run reports
//! everything that is wrong at once.

mod checks;

pub use checks::{Prober, isolation_from_env, isolation_from_vars};
