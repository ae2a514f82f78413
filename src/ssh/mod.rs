// ABOUTME: SSH connectivity module.
// ABOUTME: Exposes session management and the RemoteRunner command seam.

mod client;
mod error;
mod runner;

pub use client::{CommandOutput, Session, SessionConfig};
pub use error::{Error, Result};
pub use runner::{RemoteRunner, StepError, best_effort, required};
