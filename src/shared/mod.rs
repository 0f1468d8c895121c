//! Contract between the training core and a front end.
//!
//! A front end fills in [`RunSettings`], starts a [`TrainingHandle`] and
//! polls it for [`TrainingSnapshot`]s. It never touches the pool directly.

pub mod commands;
pub mod sim_thread;
pub mod snapshot;

pub use commands::{RunSettings, RunState};
pub use sim_thread::TrainingHandle;
pub use snapshot::{NetworkView, Phase, TrainingSnapshot, WorldView};
