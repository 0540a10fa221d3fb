use crate::error::{RecordError, Result};
use crate::types::DomainKey;

const MAX_DOMAIN_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// Public suffixes spanning two labels. Anything else splits on the last label.
const MULTI_LABEL_SUFFIXES: &[&str] = &[
    "ac.jp", "ac.uk", "co.in", "co.jp", "co.kr", "co.nz", "co.uk", "co.za", "com.ar", "com.au",
    "com.br", "com.cn", "com.hk", "com.mx", "com.sg", "com.tr", "com.tw", "edu.au", "gov.au",
    "gov.cn", "gov.uk", "me.uk", "ne.jp", "net.au", "net.br", "net.cn", "or.jp", "org.au",
    "org.br", "org.cn", "org.nz", "org.uk",
];

/// Lowercase, trim, drop one trailing dot, and validate every label.
pub fn normalize_domain(input: &str) -> Result<String> {
    let trimmed = input.trim();
    let trimmed = trimmed.strip_suffix('.').unwrap_or(trimmed);
    if trimmed.is_empty() {
        return Err(RecordError::invalid_domain(input, "empty"));
    }
    if trimmed.len() > MAX_DOMAIN_LEN {
        return Err(RecordError::invalid_domain(
            input,
            format!("longer than {MAX_DOMAIN_LEN} characters"),
        ));
    }

    let normalized = trimmed.to_ascii_lowercase();
    for label in normalized.split('.') {
        validate_label(label).map_err(|reason| RecordError::invalid_domain(input, reason))?;
    }
    Ok(normalized)
}

/// Split a domain into its registrable label, public suffix and subdomain.
pub fn parse_domain(input: &str) -> Result<DomainKey> {
    let normalized = normalize_domain(input)?;
    let labels: Vec<&str> = normalized.split('.').collect();
    if labels.len() < 2 {
        return Err(RecordError::invalid_domain(input, "missing TLD"));
    }

    let suffix_len = suffix_label_count(&labels);
    if labels.len() <= suffix_len {
        return Err(RecordError::invalid_domain(
            input,
            "public suffix without a registrable label",
        ));
    }

    let tld_start = labels.len() - suffix_len;
    let tld = labels[tld_start..].join(".");
    if tld.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return Err(RecordError::invalid_domain(input, "numeric TLD"));
    }

    Ok(DomainKey {
        domain: labels[tld_start - 1].to_string(),
        tld,
        sub: labels[..tld_start - 1].join("."),
    })
}

pub fn is_valid_domain(input: &str) -> bool {
    parse_domain(input).is_ok()
}

/// `domain.tld` part of `input`, if it parses.
pub fn registrable_domain(input: &str) -> Option<String> {
    parse_domain(input).ok().map(|key| key.registrable())
}

fn suffix_label_count(labels: &[&str]) -> usize {
    if labels.len() >= 2 {
        let tail = format!("{}.{}", labels[labels.len() - 2], labels[labels.len() - 1]);
        if MULTI_LABEL_SUFFIXES.binary_search(&tail.as_str()).is_ok() {
            return 2;
        }
    }
    1
}

fn validate_label(label: &str) -> std::result::Result<(), String> {
    if label.is_empty() {
        return Err("empty label".to_string());
    }
    if label.len() > MAX_LABEL_LEN {
        return Err(format!("label longer than {MAX_LABEL_LEN} characters"));
    }
    if label.starts_with('-') || label.ends_with('-') {
        return Err(format!("label {label:?} starts or ends with a hyphen"));
    }
    if let Some(c) = label
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(format!("invalid character {c:?} in label {label:?}"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn suffix_table_is_sorted() {
        let mut sorted = MULTI_LABEL_SUFFIXES.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, MULTI_LABEL_SUFFIXES);
    }

    #[test]
    fn parses_simple_and_nested_domains() {
        assert_eq!(
            parse_domain("example.com").unwrap(),
            DomainKey::new("example", "com", "")
        );
        assert_eq!(
            parse_domain("a.b.example.com").unwrap(),
            DomainKey::new("example", "com", "a.b")
        );
        assert_eq!(
            parse_domain("mail.example.co.uk").unwrap(),
            DomainKey::new("example", "co.uk", "mail")
        );
    }

    #[test]
    fn normalizes_case_whitespace_and_trailing_dot() {
        assert_eq!(
            parse_domain("  WWW.Example.COM. ").unwrap(),
            DomainKey::new("example", "com", "www")
        );
        assert_eq!(normalize_domain("_dmarc.Example.org").unwrap(), "_dmarc.example.org");
    }

    #[test]
    fn rejects_malformed_input() {
        for input in [
            "",
            ".",
            "com",
            "co.uk",
            "a..example.com",
            "-bad.example.com",
            "bad-.example.com",
            "sp ace.example.com",
            "*.example.com",
            "192.168.0.1",
        ] {
            assert!(!is_valid_domain(input), "{input:?} should be rejected");
        }

        let long_label = "a".repeat(64);
        assert!(!is_valid_domain(&format!("{long_label}.com")));
    }

    #[test]
    fn registrable_domain_ignores_subdomains() {
        assert_eq!(
            registrable_domain("x.y.example.net").as_deref(),
            Some("example.net")
        );
        assert_eq!(registrable_domain("nope"), None);
    }
}
