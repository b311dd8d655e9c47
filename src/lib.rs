pub mod app;
pub mod config;
pub mod dataset;
pub mod error;
pub mod fetch;
pub mod fs_util;
pub mod output;
pub mod progress;
pub mod render;
pub mod store;
