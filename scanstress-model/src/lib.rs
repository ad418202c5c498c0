//! Shared wire-protocol definitions for the scanstress harness.
//!
//! The harness speaks an Avatica-flavored JSON protocol over HTTP: every
//! operation is a `POST /` with a tagged request body, answered by a tagged
//! response body. Both the client crate and the in-process service depend on
//! these types so the two sides can never drift apart structurally.

pub mod error;
pub mod wire;

pub use error::ClientError;
pub use wire::{
    DESCRIPTOR_COLUMNS, DESCRIPTOR_SCHEMA_POS, DESCRIPTOR_TABLE_POS, Frame,
    WireRequest, WireResponse,
};
