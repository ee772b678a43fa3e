pub mod executor_client;
pub mod gateway;

pub use executor_client::HttpExecutorClient;
