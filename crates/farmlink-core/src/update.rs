//! Update checking against the SMAPI compatibility catalog
//!
//! One batched query for every manifest carrying update keys; keyless
//! manifests are assumed to be the operator's own work and skipped. A
//! catalog failure aborts only the update check, never the surrounding
//! flow.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::manifest::ModManifest;

/// Compatibility-catalog endpoint.
const CATALOG_URL: &str = "https://smapi.io/api/v3.0/mods";

const HTTP_TIMEOUT_SECS: u64 = 30;

/// Content host an update can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateHost {
    Nexus { mod_id: u64 },
    GitHub { repo: String },
    Unknown,
}

/// One mod with a newer version available.
#[derive(Debug, Clone)]
pub struct ModUpdate {
    pub manifest: ModManifest,
    pub suggested_version: String,
    pub host: UpdateHost,
    /// Mod page for the manual download tier, when the catalog offered one.
    pub page_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CatalogRequestEntry<'a> {
    id: &'a str,
    update_keys: &'a [String],
    installed_version: &'a str,
    is_broken: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogResult {
    id: String,
    #[serde(default)]
    suggested_update: Option<SuggestedUpdate>,
    #[serde(default)]
    metadata: Option<CatalogMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SuggestedUpdate {
    version: String,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogMetadata {
    #[serde(default)]
    nexus_id: Option<u64>,
    #[serde(default)]
    github_repo: Option<String>,
    #[serde(default)]
    main: Option<MetadataLink>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetadataLink {
    #[serde(default)]
    url: Option<String>,
}

/// Queries the compatibility catalog for newer mod versions.
pub struct UpdateChecker {
    client: reqwest::blocking::Client,
    catalog_url: String,
}

impl UpdateChecker {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            catalog_url: CATALOG_URL.to_string(),
        })
    }

    /// Check every keyed manifest in one batched request.
    pub fn check(&self, manifests: &[ModManifest]) -> Result<Vec<ModUpdate>> {
        let keyed: Vec<&ModManifest> =
            manifests.iter().filter(|m| m.has_update_keys()).collect();
        if keyed.is_empty() {
            return Ok(Vec::new());
        }

        let request: Vec<CatalogRequestEntry> = keyed
            .iter()
            .map(|m| CatalogRequestEntry {
                id: &m.unique_id,
                update_keys: &m.update_keys,
                installed_version: &m.version,
                is_broken: false,
            })
            .collect();

        info!(mods = keyed.len(), "querying update catalog");
        let response = self
            .client
            .post(&self.catalog_url)
            .json(&request)
            .send()
            .map_err(|e| Error::catalog(e.to_string()))?;
        if !response.status().is_success() {
            return Err(Error::catalog(format!("HTTP {}", response.status())));
        }
        let results: Vec<CatalogResult> =
            response.json().map_err(|e| Error::catalog(e.to_string()))?;

        Ok(build_updates(&keyed, &results))
    }
}

/// Match catalog results back to manifests by identity and keep those with
/// a newer suggested version.
fn build_updates(manifests: &[&ModManifest], results: &[CatalogResult]) -> Vec<ModUpdate> {
    let mut updates = Vec::new();
    for result in results {
        let Some(manifest) = manifests
            .iter()
            .find(|m| m.unique_id.eq_ignore_ascii_case(&result.id))
        else {
            continue;
        };
        let Some(suggested) = &result.suggested_update else {
            debug!(module = %manifest.name, "no update suggested");
            continue;
        };
        if !is_newer(&manifest.version, &suggested.version) {
            continue;
        }

        let host = host_for(manifest, result.metadata.as_ref());
        let page_url = suggested.url.clone().or_else(|| {
            result
                .metadata
                .as_ref()
                .and_then(|m| m.main.as_ref())
                .and_then(|l| l.url.clone())
        });
        updates.push(ModUpdate {
            manifest: (*manifest).clone(),
            suggested_version: suggested.version.clone(),
            host,
            page_url,
        });
    }
    updates
}

/// Derive the content host, preferring explicit catalog metadata and
/// falling back to the manifest's own update keys.
fn host_for(manifest: &ModManifest, metadata: Option<&CatalogMetadata>) -> UpdateHost {
    if let Some(meta) = metadata {
        if let Some(id) = meta.nexus_id {
            return UpdateHost::Nexus { mod_id: id };
        }
        if let Some(repo) = &meta.github_repo {
            return UpdateHost::GitHub { repo: repo.clone() };
        }
    }
    host_from_update_keys(&manifest.update_keys)
}

/// Parse a host out of update keys like `Nexus:1234` or
/// `GitHub:owner/repo`.
pub fn host_from_update_keys(keys: &[String]) -> UpdateHost {
    static NEXUS: OnceLock<Regex> = OnceLock::new();
    static GITHUB: OnceLock<Regex> = OnceLock::new();
    let nexus = NEXUS.get_or_init(|| Regex::new(r"(?i)^nexus:\s*(\d+)").unwrap());
    let github =
        GITHUB.get_or_init(|| Regex::new(r"(?i)^github:\s*([\w.-]+/[\w.-]+)").unwrap());

    for key in keys {
        if let Some(caps) = nexus.captures(key)
            && let Ok(id) = caps[1].parse()
        {
            return UpdateHost::Nexus { mod_id: id };
        }
        if let Some(caps) = github.captures(key) {
            return UpdateHost::GitHub {
                repo: caps[1].to_string(),
            };
        }
    }
    UpdateHost::Unknown
}

/// Whether `suggested` is newer than `installed`.
///
/// Versions compare as semver when both sides parse (after padding partial
/// versions); otherwise any difference counts as newer, since the catalog
/// only suggests upgrades.
pub fn is_newer(installed: &str, suggested: &str) -> bool {
    match (parse_lenient(installed), parse_lenient(suggested)) {
        (Some(i), Some(s)) => s > i,
        _ => installed != suggested,
    }
}

fn parse_lenient(version: &str) -> Option<semver::Version> {
    let version = version.trim();
    if let Ok(v) = semver::Version::parse(version) {
        return Some(v);
    }
    // Pad partial versions like "1.2" before giving up. A core without any
    // digit would pad to "0.0.0" and make distinct unparseable versions
    // compare equal, so treat it as unparseable instead.
    let core: String = version
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if !core.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    let mut parts: Vec<&str> = core.split('.').filter(|p| !p.is_empty()).collect();
    while parts.len() < 3 {
        parts.push("0");
    }
    semver::Version::parse(&parts.join(".")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn manifest(id: &str, version: &str, keys: &[&str]) -> ModManifest {
        ModManifest {
            name: id.to_string(),
            unique_id: id.to_string(),
            version: version.to_string(),
            update_keys: keys.iter().map(|k| k.to_string()).collect(),
            dir: PathBuf::from("mods").join(id),
            relative_dir: PathBuf::from(id),
        }
    }

    #[test]
    fn test_host_from_update_keys() {
        assert_eq!(
            host_from_update_keys(&["Nexus:2400".to_string()]),
            UpdateHost::Nexus { mod_id: 2400 }
        );
        assert_eq!(
            host_from_update_keys(&["nexus: 2400".to_string()]),
            UpdateHost::Nexus { mod_id: 2400 }
        );
        assert_eq!(
            host_from_update_keys(&["GitHub:Pathoschild/SMAPI".to_string()]),
            UpdateHost::GitHub {
                repo: "Pathoschild/SMAPI".to_string()
            }
        );
        assert_eq!(
            host_from_update_keys(&["Chucklefish:4250".to_string()]),
            UpdateHost::Unknown
        );
    }

    #[test]
    fn test_is_newer() {
        assert!(is_newer("1.0.0", "2.0.0"));
        assert!(is_newer("1.0", "1.0.1"));
        assert!(!is_newer("2.0.0", "2.0.0"));
        assert!(!is_newer("2.1.0", "2.0.9"));
        // Unparseable versions fall back to inequality.
        assert!(is_newer("beta-build", "release-build"));
        assert!(!is_newer("beta-build", "beta-build"));
    }

    #[test]
    fn test_build_updates_matches_by_id_case_insensitively() {
        let m = manifest("Author.FooMod", "1.0.0", &["Nexus:100"]);
        let results = vec![CatalogResult {
            id: "author.foomod".to_string(),
            suggested_update: Some(SuggestedUpdate {
                version: "2.0.0".to_string(),
                url: Some("https://www.nexusmods.com/stardewvalley/mods/100".to_string()),
            }),
            metadata: None,
        }];

        let updates = build_updates(&[&m], &results);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].suggested_version, "2.0.0");
        assert_eq!(updates[0].host, UpdateHost::Nexus { mod_id: 100 });
        assert!(updates[0].page_url.is_some());
    }

    #[test]
    fn test_catalog_metadata_preferred_over_keys() {
        let m = manifest("Author.FooMod", "1.0.0", &["Nexus:100"]);
        let results = vec![CatalogResult {
            id: "Author.FooMod".to_string(),
            suggested_update: Some(SuggestedUpdate {
                version: "2.0.0".to_string(),
                url: None,
            }),
            metadata: Some(CatalogMetadata {
                nexus_id: Some(999),
                github_repo: None,
                main: None,
            }),
        }];

        let updates = build_updates(&[&m], &results);
        assert_eq!(updates[0].host, UpdateHost::Nexus { mod_id: 999 });
    }

    #[test]
    fn test_no_host_metadata_and_no_recognizable_key_is_unknown() {
        let m = manifest("Foo", "1.0", &["Chucklefish:4250"]);
        let results = vec![CatalogResult {
            id: "Foo".to_string(),
            suggested_update: Some(SuggestedUpdate {
                version: "2.0".to_string(),
                url: None,
            }),
            metadata: None,
        }];

        let updates = build_updates(&[&m], &results);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].host, UpdateHost::Unknown);
        assert!(updates[0].page_url.is_none());
    }

    #[test]
    fn test_non_numeric_suggested_version_is_recorded() {
        let m = manifest("Foo", "beta-build", &["Nexus:1"]);
        let results = vec![CatalogResult {
            id: "Foo".to_string(),
            suggested_update: Some(SuggestedUpdate {
                version: "release-build".to_string(),
                url: None,
            }),
            metadata: None,
        }];

        let updates = build_updates(&[&m], &results);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].suggested_version, "release-build");
    }

    #[test]
    fn test_not_newer_is_dropped() {
        let m = manifest("Foo", "2.0.0", &["Nexus:1"]);
        let results = vec![CatalogResult {
            id: "Foo".to_string(),
            suggested_update: Some(SuggestedUpdate {
                version: "2.0.0".to_string(),
                url: None,
            }),
            metadata: None,
        }];
        assert!(build_updates(&[&m], &results).is_empty());
    }
}
