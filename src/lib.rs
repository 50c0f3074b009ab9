pub mod adapters;
#[cfg(feature = "cli")]
pub mod app;
#[cfg(feature = "cli")]
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{cli::EventFile, CliConfig, Command};

pub use core::runner::ActionRunner;
pub use domain::event::GitHubEvent;
pub use utils::error::{ActionError, Result};
