pub mod app;
pub mod cli;
pub mod config;
pub mod interpreter;
pub mod logging;
pub mod queue;
