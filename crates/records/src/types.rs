use crate::error::{RecordError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Uniqueness key of a stored domain record.
///
/// `domain` is the single label left of the public suffix, `tld` is the suffix itself
/// (possibly multi-label, e.g. `co.uk`) and `sub` is everything left of `domain`. An empty
/// `sub` denotes the apex entry for the registrable domain.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DomainKey {
    pub domain: String,
    pub tld: String,
    #[serde(default)]
    pub sub: String,
}

impl DomainKey {
    pub fn new(domain: impl Into<String>, tld: impl Into<String>, sub: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            tld: tld.into(),
            sub: sub.into(),
        }
    }

    /// `domain.tld`
    pub fn registrable(&self) -> String {
        format!("{}.{}", self.domain, self.tld)
    }

    /// Full dotted form, `sub.domain.tld` (or `domain.tld` for the apex).
    pub fn full_domain(&self) -> String {
        if self.sub.is_empty() {
            self.registrable()
        } else {
            format!("{}.{}.{}", self.sub, self.domain, self.tld)
        }
    }

    pub fn is_apex(&self) -> bool {
        self.sub.is_empty()
    }

    /// Rejects keys whose decomposition is structurally empty.
    pub fn check_schema(&self) -> Result<()> {
        if self.domain.trim().is_empty() {
            return Err(RecordError::schema(
                self.full_domain(),
                "missing registrable domain label",
            ));
        }
        if self.domain.contains('.') {
            return Err(RecordError::schema(
                self.full_domain(),
                "registrable domain label contains a dot",
            ));
        }
        if self.tld.trim().is_empty() {
            return Err(RecordError::schema(self.full_domain(), "missing TLD"));
        }
        if self.tld.split('.').any(str::is_empty) {
            return Err(RecordError::schema(
                self.full_domain(),
                "TLD has an empty label",
            ));
        }
        if !self.sub.is_empty() && self.sub.split('.').any(str::is_empty) {
            return Err(RecordError::schema(
                self.full_domain(),
                "subdomain has an empty label",
            ));
        }
        Ok(())
    }
}

impl fmt::Display for DomainKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_domain())
    }
}

/// One decoded unit of the domain collection.
///
/// Fields other than the key are carried as opaque metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(flatten)]
    key: DomainKey,

    #[serde(flatten)]
    metadata: Map<String, Value>,
}

impl Record {
    pub fn new(key: DomainKey) -> Self {
        Self {
            key,
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(key: DomainKey, metadata: Map<String, Value>) -> Self {
        Self { key, metadata }
    }

    /// Decode a stored document.
    pub fn decode(raw: Value) -> Result<Self> {
        if !raw.is_object() {
            return Err(RecordError::decode(format!(
                "expected a document object, got {}",
                value_kind(&raw)
            )));
        }
        serde_json::from_value(raw).map_err(|e| RecordError::decode(e.to_string()))
    }

    pub fn to_document(&self) -> Value {
        let mut doc = self.metadata.clone();
        doc.insert("domain".to_string(), Value::String(self.key.domain.clone()));
        doc.insert("tld".to_string(), Value::String(self.key.tld.clone()));
        doc.insert("sub".to_string(), Value::String(self.key.sub.clone()));
        Value::Object(doc)
    }

    pub fn key(&self) -> &DomainKey {
        &self.key
    }

    pub fn into_key(self) -> DomainKey {
        self.key
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    pub fn domain(&self) -> &str {
        &self.key.domain
    }

    pub fn tld(&self) -> &str {
        &self.key.tld
    }

    pub fn sub(&self) -> &str {
        &self.key.sub
    }

    pub fn registrable(&self) -> String {
        self.key.registrable()
    }

    pub fn full_domain(&self) -> String {
        self.key.full_domain()
    }

    pub fn check_schema(&self) -> Result<()> {
        self.key.check_schema()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.key.fmt(f)
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
