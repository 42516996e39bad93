pub mod cli;
pub mod config;
pub mod error;
pub mod platform;
pub mod views;

#[cfg(test)]
pub mod testing;
