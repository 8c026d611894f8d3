//! Observer callback that mirrors a hyperparameter-optimization study into an
//! external experiment-tracking run.
//!
//! On every completed trial the callback projects cheap per-trial state into
//! the run's namespace; visualization artifacts and full study snapshots are
//! gated behind configurable update frequencies.  The optimization engine and
//! the tracking client stay external; this crate only reads the study object
//! model (`sl-types`) and writes the run namespace contract (`sl-track`).

pub mod callback;
pub mod freq;
pub mod plots;
pub mod projection;
pub mod storage;

pub use callback::*;
pub use freq::*;
pub use plots::*;
pub use projection::*;
pub use storage::*;
