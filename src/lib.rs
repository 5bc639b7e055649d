pub mod bot;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod providers;
#[cfg(test)]
pub mod test_helpers;
