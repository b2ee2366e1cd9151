pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::cli::LocalStorage;
pub use config::toml_config::RenderConfig;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use crate::core::{export::PngExporter, render::RenderEngine};
pub use utils::error::{RenderError, Result};
