pub mod cli;
pub mod config;
pub mod service;

pub use cli::{AnalyzeArgs, Args, Commands};
pub use service::run_analyze;
