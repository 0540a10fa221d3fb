use crate::error::Result;
use crate::job::ScanJob;
use async_trait::async_trait;
use domain_records::{parse_domain, DomainKey, Record};
use serde::Serialize;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FindingKind {
    /// The parsing library rejects the stored full domain
    Unparseable { reason: String },
    /// The parsing library splits the full domain differently than stored
    DecompositionMismatch { parsed: String },
    /// The full domain contains the requested substring
    Contains { needle: String },
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct InspectFinding {
    pub full_domain: String,
    #[serde(flatten)]
    pub kind: FindingKind,
}

impl fmt::Display for InspectFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FindingKind::Unparseable { reason } => {
                write!(f, "{} -> unparseable: {reason}", self.full_domain)
            }
            FindingKind::DecompositionMismatch { parsed } => {
                write!(f, "{} -> parses as {parsed}", self.full_domain)
            }
            FindingKind::Contains { needle } => {
                write!(f, "{} -> contains {needle}", self.full_domain)
            }
        }
    }
}

/// Non-fatal consistency checks over every record.
#[derive(Debug, Default)]
pub struct Inspector {
    contains: Option<String>,
    findings: Mutex<Vec<InspectFinding>>,
}

impl Inspector {
    pub fn new(contains: Option<String>) -> Self {
        Self {
            contains: contains.filter(|s| !s.is_empty()),
            findings: Mutex::new(Vec::new()),
        }
    }

    pub fn inspect(&self, record: &Record) -> Vec<InspectFinding> {
        let full_domain = record.full_domain();
        let mut findings = Vec::new();

        match parse_domain(&full_domain) {
            Ok(parsed) if &parsed != record.key() => findings.push(InspectFinding {
                full_domain: full_domain.clone(),
                kind: FindingKind::DecompositionMismatch {
                    parsed: describe(&parsed),
                },
            }),
            Ok(_) => {}
            Err(err) => findings.push(InspectFinding {
                full_domain: full_domain.clone(),
                kind: FindingKind::Unparseable {
                    reason: err.to_string(),
                },
            }),
        }

        if let Some(needle) = &self.contains {
            if full_domain.contains(needle.as_str()) {
                findings.push(InspectFinding {
                    full_domain,
                    kind: FindingKind::Contains {
                        needle: needle.clone(),
                    },
                });
            }
        }
        findings
    }

    /// Collected findings, sorted.
    pub fn take_findings(&self) -> Vec<InspectFinding> {
        let mut findings = std::mem::take(&mut *self.lock());
        findings.sort();
        findings
    }

    fn lock(&self) -> MutexGuard<'_, Vec<InspectFinding>> {
        self.findings.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn describe(key: &DomainKey) -> String {
    format!("domain={} tld={} sub={:?}", key.domain, key.tld, key.sub)
}

#[async_trait]
impl ScanJob for Inspector {
    fn name(&self) -> &'static str {
        "inspect"
    }

    async fn process(&self, record: Record) -> Result<()> {
        let found = self.inspect(&record);
        if !found.is_empty() {
            for finding in &found {
                log::debug!("{finding}");
            }
            self.lock().extend(found);
        }
        Ok(())
    }
}
