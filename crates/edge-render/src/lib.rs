//! Streaming renderer.
//!
//! This crate provides:
//! - `BotPolicyClassifier` - Stream or buffer, decided once per request
//! - `evaluate_root` / `evaluate` - Component tree evaluation
//! - `HtmlWriter` - Markup for evaluated trees
//! - `Renderer` - The request state machine
//! - `CancelHandle` / `CancelSignal` - External cancellation

mod bot;
mod cancel;
mod evaluate;
mod html;
mod renderer;

pub use bot::*;
pub use cancel::*;
pub use evaluate::*;
pub use html::*;
pub use renderer::*;
