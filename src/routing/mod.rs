//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → table.rs (snapshot active generation, lookup)
//!     → matcher.rs (evaluate candidates, bind placeholders)
//!     → Return: matched RouteDefinition + bindings, or None
//!
//! Route Compilation (at startup and on reload):
//!     [[routes]] config entries
//!     → template.rs (parse path templates)
//!     → validation (semantic checks, all-or-nothing)
//!     → publish as a new immutable generation
//! ```
//!
//! # Design Decisions
//! - Routes compiled at load time, immutable at runtime
//! - No regex in the hot path (segment comparison only)
//! - Deterministic: same input always matches same route
//! - Priority is derived from the template, never configured

pub mod matcher;
pub mod table;
pub mod template;

pub use matcher::{Bindings, RouteMatch};
pub use table::{RouteDefinition, RouteTable, SharedRouteTable};
pub use template::{PathTemplate, Segment, TemplateError};
