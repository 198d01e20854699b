//! Storage layer
//!
//! SQLite is the only backend. `schema` owns the table layout and
//! versioning, `sqlite` implements the store traits on top of it and
//! `error` defines the failures every operation can return.

pub mod error;
pub mod schema;
pub mod sqlite;

pub use error::{ErrorKind, StoreError, StoreResult};
pub use schema::{init_schema, needs_init, SCHEMA_VERSION};
pub use sqlite::{SqliteStore, StoreStats};
