pub mod client;
pub mod connection;
pub mod convert;
pub mod proto;

pub use client::{request_id, SmartSpeechClient};
pub use connection::{transport_error, CallMetadata, ConnectionSettings, Connector};

/// Initial-metadata key under which the server returns its correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";
