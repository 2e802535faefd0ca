pub mod engine;
pub mod exchange_client;
