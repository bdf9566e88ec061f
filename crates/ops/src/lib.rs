//! `ops` crate — the `Operation` trait, value type tags, node schemas, and
//! the process-wide [`NodeRegistry`].
//!
//! Every registered operation — built-in or external — implements
//! [`Operation`]. The engine crate dispatches execution through this trait
//! object and uses the registry's declared schemas to validate graphs and
//! resolved inputs.

pub mod builtin;
pub mod context;
pub mod error;
pub mod mock;
pub mod registry;
pub mod schema;
pub mod traits;

pub use context::{OpContext, ProgressSender};
pub use error::OpError;
pub use registry::{CatalogEntry, NodeRegistry, RegistryBuilder, RegistryEntry};
pub use schema::{InputSpec, OutputSpec, ValueKind, WidgetSpec};
pub use traits::Operation;
