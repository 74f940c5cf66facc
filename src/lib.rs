#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]

pub mod catalog;
pub mod commands;
pub mod config;
pub mod error;
pub mod registry;
pub mod store;
pub mod webui;

pub use catalog::{CommandDescriptor, PluginCatalog, PluginDescriptor, StaticCatalog};
pub use config::Config;
pub use error::{PermError, Result};
pub use registry::PermissionRegistry;
pub use store::{PermissionLevel, PermissionStore};
pub use webui::{WebUiServer, WebUiStatus};
