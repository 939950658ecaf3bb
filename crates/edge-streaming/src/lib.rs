//! Response delivery for shell-first streaming SSR.
//!
//! This crate provides:
//! - `ResponseWriter` - Chunk contract enforcement over a `Transport`
//! - `SinkTransport` / `MemoryTransport` - Transport implementations
//! - `ResponseChunk` / `ResponseHead` - What goes over the wire
//! - `SeoInjector` - Deferred head metadata
//! - `DocumentShell` - Document template around the rendered tree

mod chunk;
mod seo;
mod shell;
mod writer;

pub use chunk::*;
pub use seo::*;
pub use shell::*;
pub use writer::*;
