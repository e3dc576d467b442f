//! Proxy core: request rewriting and downstream dispatch.
//!
//! # Data Flow
//! ```text
//! Matched route + bindings + inbound request
//!     → rewrite.rs (substitute path, fix authority, strip hop-by-hop)
//!     → dispatch.rs (timeouts, bounded retry, outcome classification)
//!     → DispatchOutcome back to the frontend
//! ```
//!
//! # Design Decisions
//! - Rewriting is pure; dispatch is the only suspension point
//! - Retries collapse inside the dispatcher: the frontend still makes at
//!   most one dispatch call per inbound request
//! - Every outcome maps to exactly one observable response upstream

pub mod dispatch;
pub mod rewrite;

pub use dispatch::{DispatchOutcome, Dispatcher};
pub use rewrite::{rewrite, RewriteError};
