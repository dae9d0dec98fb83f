pub mod connection;
pub mod connector;

pub use connection::Connection;
