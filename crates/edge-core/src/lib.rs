//! Core data model for the streaming server-component renderer.
//!
//! This crate provides the fundamental types shared by every stage:
//! - `ComponentNode` / `MountedNode` - Authoring tree and evaluated tree
//! - `RenderRequest` / `RenderContext` - Per-request input and immutable context
//! - `TransportMode` - Stream or buffer delivery
//! - `RenderState` - Renderer lifecycle tracking
//! - `RenderError` - Error taxonomy
//! - `RenderConfig` - Serializable configuration

mod config;
mod context;
mod error;
mod escape;
mod head;
mod lifecycle;
mod mode;
mod node;
mod request;

pub use config::*;
pub use context::*;
pub use error::*;
pub use escape::*;
pub use head::*;
pub use lifecycle::*;
pub use mode::*;
pub use node::*;
pub use request::*;
