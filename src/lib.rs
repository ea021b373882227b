pub mod commands;
pub mod config;
pub mod error;
pub mod platform;
pub mod registries;
pub mod registry;
pub mod retry;
pub mod sync;
pub mod version;
