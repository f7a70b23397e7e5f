//! Install pipeline for the NextFLAP native extension.
//!
//! The pipeline itself is I/O-agnostic: every external collaborator (the
//! interpreter, pip, the Z3 lookup, the build script, the confirmation
//! prompt) sits behind a port trait, so the stage ordering and fail-fast
//! behaviour are testable with stubs.

pub mod adapters;
pub mod pipeline;
pub mod ports;
pub mod settings;

pub use pipeline::{InstallError, InstallOutcome, run_install};
pub use ports::{BuildPort, ConfirmPort, InstallPorts, PipPort, ProbePort, PythonPort, SolverPort};
pub use settings::InstallSettings;
