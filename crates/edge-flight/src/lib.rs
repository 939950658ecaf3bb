//! Side-channel ("flight") serialization.
//!
//! A response ships the component tree a second time, as rows a client can
//! replay to rebuild live component state:
//! - `FlightRow` - One `<tag><id>:<json>` row
//! - `FlightPushRecord` - A row bound to the boundary it was emitted for
//! - `FlightSerializer` - Request-scoped encoder with a shared-row table
//! - `push_statement` - Embedding of a row into HTML

mod push;
mod row;
mod serializer;

pub use push::*;
pub use row::*;
pub use serializer::*;
