//! # Domain Store
//!
//! The store access port consumed by the duplicate pipeline, plus two backends:
//!
//! - [`MemoryStore`]: documents in process memory, snapshot cursors
//! - [`JsonlStore`]: a JSON-lines file loaded into a [`MemoryStore`] and persisted atomically
//!
//! Every backend matches documents on the full `(domain, tld, sub)` key and routes
//! [`RecordStore::insert_canonical`] through [`domain_records::parse_domain`].

mod error;
mod jsonl;
mod memory;
mod port;

pub use error::{Result, StoreError};
pub use jsonl::JsonlStore;
pub use memory::MemoryStore;
pub use port::{RawRecord, RecordCursor, RecordStore};
