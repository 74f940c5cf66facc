//! `perm` chat command group.
//!
//! The host forwards chat lines here; [`parser`] recognizes the `perm`
//! group and [`handlers`] renders plain-text replies.

pub mod handlers;
pub mod parser;

pub use handlers::handle_command;
pub use parser::{PermCommand, WebUiAction, parse_command};
