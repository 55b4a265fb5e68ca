pub mod adapters;
pub mod app;
pub mod config;
pub mod context;
pub mod driver;
pub mod error;
pub mod screens;
pub mod session_task;
