//! Read-only crates.io lookups.

use anyhow::{Context, Result};
use serde::Deserialize;

const REGISTRY_API: &str = "https://crates.io/api/v1/crates";

#[derive(Debug, Deserialize)]
struct RegistryResponse {
    #[serde(rename = "crate")]
    krate: RegistryCrate,
}

#[derive(Debug, Deserialize)]
struct RegistryCrate {
    repository: Option<String>,
}

/// The repository URL a crate declares in its registry metadata, if any.
/// Used only to decide whether automatic upstream reporting could be
/// attempted; the submission itself stays manual.
pub fn crate_repository(name: &str) -> Result<Option<String>> {
    let url = format!("{REGISTRY_API}/{name}");
    let mut response = ureq::get(&url)
        .call()
        .with_context(|| format!("query crates.io metadata for `{name}`"))?;
    let body: RegistryResponse = response
        .body_mut()
        .read_json()
        .with_context(|| format!("parse crates.io metadata for `{name}`"))?;
    Ok(body.krate.repository)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_response_extracts_repository() {
        let body: RegistryResponse = serde_json::from_str(
            r#"{"crate": {"name": "smallvec", "repository": "https://github.com/servo/rust-smallvec"}}"#,
        )
        .expect("parse");
        assert_eq!(
            body.krate.repository.as_deref(),
            Some("https://github.com/servo/rust-smallvec")
        );
    }

    #[test]
    fn registry_response_tolerates_missing_repository() {
        let body: RegistryResponse =
            serde_json::from_str(r#"{"crate": {"name": "smallvec"}}"#).expect("parse");
        assert!(body.krate.repository.is_none());
    }
}
