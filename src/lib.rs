pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod providers;
pub mod session;
pub mod warehouse;

pub use error::{Error, Result};
