//! Client-side error taxonomy.
//!
//! Every failure inside one scan unit maps onto one of three categories;
//! all of them are fatal to the unit that raised them. There is no retry
//! layer anywhere in the harness.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Session establishment failed: endpoint unreachable or the open
    /// handshake was rejected.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The endpoint answered with a structurally unexpected or malformed
    /// response.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// A scan failed mid-stream: remote fault, transport drop, or a row
    /// that could not be decoded. Rows counted before the failure stay
    /// counted; aggregate counters are monotonic.
    #[error("execution failed: {0}")]
    Execution(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;
