//! wif-cli
//!
//! `ocm-wif` command-line front end: flag and environment parsing,
//! command dispatch, and plain-text rendering of provisioning and drift
//! reports.

pub mod cli;
pub mod commands;
pub mod render;
pub mod settings;

pub use crate::cli::{Cli, Command, GlobalArgs, LogFormat};
pub use crate::settings::Settings;
