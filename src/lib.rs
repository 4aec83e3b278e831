#![allow(clippy::uninlined_format_args)]

pub mod app;
pub mod browse;
pub mod catalog;
pub mod clipboard;
pub mod config;
pub mod html;
pub mod layout;
pub mod logging;
pub mod resolver;
pub mod router;
pub mod storage;
pub mod theme;
pub mod ui;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::{run, RunOptions};
