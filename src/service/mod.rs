mod commands;
mod focus;
mod runner;

pub use commands::{Command, Reply};
pub use focus::FocusService;
pub use runner::{ServiceHandle, DEFAULT_SNAPSHOT_HOURS};
