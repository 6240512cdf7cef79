//! In-memory record storage
//!
//! A simple key/value database for JSON-like records. Readers receive copies
//! of cacheable records and shared handles to pass-through records.

pub mod identifier;
pub mod memory;
pub mod record;
pub mod seed;

pub use identifier::create_identifier;
pub use memory::{RecordSource, Store};
pub use record::{Record, RecordKind, ID_FIELD};
