// ABOUTME: Container runtime layer: kind detection and the shell-command driver.
// ABOUTME: Every effect is a discrete docker invocation over the RemoteRunner seam.

mod driver;
mod error;
mod kind;

pub use driver::ContainerDriver;
pub use error::{DeployError, DeployErrorKind};
pub use kind::{COMPOSE_MANIFESTS, DeploymentKind, detect_kind};
