pub mod cron;
pub mod daemon;
pub mod executor;
pub mod judge;
pub mod plans;
mod services;

#[cfg(test)]
pub(crate) mod test_support;

pub use services::Services;
