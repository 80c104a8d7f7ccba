// src/core/mod.rs

pub mod args;
pub mod build;
pub mod catalogue;
pub mod command;
pub mod downloader;
pub mod generic_command;
pub mod graph_display;
pub mod interpolator;
pub mod registry;
