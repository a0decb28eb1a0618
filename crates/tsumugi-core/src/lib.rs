pub mod cache;
pub mod config;
pub mod error;

pub use error::TsumugiError;
