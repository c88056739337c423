pub mod connection;
pub mod operations;

pub use connection::create_ssl_connector;
pub use operations::{ensure_schema, store_reading, PostgresSink};
