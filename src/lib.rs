pub mod cli;
pub mod config;
pub mod context;
pub mod editor;
pub mod engine;
pub mod error;
pub mod init;
pub mod inventory;
pub mod pipeline;
pub mod programs;
pub mod stats;
pub mod store;
