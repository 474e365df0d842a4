pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{Result, SorterError};
