//! # Domain Records
//!
//! Value types for the domain collection and the parsing library used when
//! records are (re)inserted.
//!
//! A stored document looks like `{"domain": "example", "tld": "com", "sub": "www"}`;
//! the `(domain, tld, sub)` triple is the uniqueness key.
//!
//! ```
//! use domain_records::{parse_domain, DomainKey};
//!
//! let key = parse_domain("www.example.co.uk").unwrap();
//! assert_eq!(key, DomainKey::new("example", "co.uk", "www"));
//! assert_eq!(key.full_domain(), "www.example.co.uk");
//! ```

mod error;
mod parse;
mod types;

pub use error::{RecordError, Result};
pub use parse::{is_valid_domain, normalize_domain, parse_domain, registrable_domain};
pub use types::{DomainKey, Record};
