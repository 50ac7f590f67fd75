//! Mod manifest scanning
//!
//! SMAPI manifests are JSON in spirit but not in letter: many ship with
//! `/* */` block comments or `//` line comments, and single-valued fields
//! are often collapsed to a scalar. Parsing strips comments as a text
//! pre-processing step and normalizes `UpdateKeys` to a list.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::error::{Error, Result};

/// File name of a mod manifest.
pub const MANIFEST_FILE: &str = "manifest.json";

/// One parsed mod manifest.
#[derive(Debug, Clone)]
pub struct ModManifest {
    pub name: String,
    pub unique_id: String,
    pub version: String,
    /// Always a list, even when the source document held a single scalar.
    pub update_keys: Vec<String>,
    /// Directory owning the manifest.
    pub dir: PathBuf,
    /// The owning directory relative to the mods root; preserves nested
    /// sub-mod structure for later operations.
    pub relative_dir: PathBuf,
}

impl ModManifest {
    pub fn has_update_keys(&self) -> bool {
        !self.update_keys.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct RawManifest {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "UniqueID", alias = "UniqueId")]
    unique_id: String,
    #[serde(rename = "Version", deserialize_with = "version_string")]
    version: String,
    #[serde(
        rename = "UpdateKeys",
        alias = "UpdateUrls",
        default,
        deserialize_with = "string_or_seq"
    )]
    update_keys: Vec<String>,
}

/// Recursively locate and parse every manifest under the mods root.
///
/// Unparseable manifests are logged and skipped; the scan continues.
pub fn scan_manifests(mods_root: &Path) -> Result<Vec<ModManifest>> {
    let mut manifests = Vec::new();
    if mods_root.is_dir() {
        walk(mods_root, mods_root, &mut manifests)?;
    }
    manifests.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(manifests)
}

fn walk(mods_root: &Path, dir: &Path, out: &mut Vec<ModManifest>) -> Result<()> {
    let manifest_path = dir.join(MANIFEST_FILE);
    if manifest_path.is_file() {
        match parse_manifest(&manifest_path, mods_root) {
            Ok(manifest) => out.push(manifest),
            Err(e) => warn!(path = %manifest_path.display(), "skipping manifest: {e}"),
        }
    }

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            walk(mods_root, &path, out)?;
        }
    }
    Ok(())
}

/// Parse one manifest file.
pub fn parse_manifest(path: &Path, mods_root: &Path) -> Result<ModManifest> {
    let raw_text = fs::read_to_string(path)?;
    let stripped = strip_comments(&raw_text);
    let raw: RawManifest =
        serde_json::from_str(&stripped).map_err(|e| Error::ManifestParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let dir = path.parent().unwrap_or(mods_root).to_path_buf();
    let relative_dir = dir
        .strip_prefix(mods_root)
        .unwrap_or(&dir)
        .to_path_buf();

    Ok(ModManifest {
        name: raw.name,
        unique_id: raw.unique_id,
        version: raw.version,
        update_keys: raw.update_keys,
        dir,
        relative_dir,
    })
}

/// Remove `/* */` block comments and lines whose first non-whitespace
/// characters are `//`.
pub fn strip_comments(text: &str) -> String {
    let mut without_blocks = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("/*") {
        without_blocks.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => {
                rest = "";
                break;
            }
        }
    }
    without_blocks.push_str(rest);

    without_blocks
        .lines()
        .filter(|line| !line.trim_start().starts_with("//"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn version_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Object(map) => {
            let part = |key: &str| -> u64 {
                map.get(key).and_then(Value::as_u64).unwrap_or(0)
            };
            Ok(format!(
                "{}.{}.{}",
                part("MajorVersion"),
                part("MinorVersion"),
                part("PatchVersion")
            ))
        }
        other => Err(serde::de::Error::custom(format!(
            "unsupported version value: {other}"
        ))),
    }
}

/// Accept either a single scalar string or a list of strings.
///
/// Single-element collapse is a known hazard of the source format; the
/// field is always materialized as a list.
fn string_or_seq<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(s) => Ok(vec![s]),
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect()),
        other => Err(serde::de::Error::custom(format!(
            "unsupported update-keys value: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_manifest(dir: &Path, content: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(MANIFEST_FILE), content).unwrap();
    }

    #[test]
    fn test_strip_block_and_line_comments() {
        let text = "/* header */\n{\n  // enabled by default\n  \"Name\": \"X\"\n}";
        let stripped = strip_comments(text);
        assert!(!stripped.contains("header"));
        assert!(!stripped.contains("enabled"));
        serde_json::from_str::<Value>(&stripped).unwrap();
    }

    #[test]
    fn test_strip_comments_keeps_urls() {
        let text = "{\"Url\": \"https://example.com\"}";
        assert_eq!(strip_comments(text), text);
    }

    #[test]
    fn test_scalar_update_key_normalized_to_list() {
        let temp = TempDir::new().unwrap();
        let scalar_dir = temp.path().join("ScalarMod");
        write_manifest(
            &scalar_dir,
            r#"{"Name": "ScalarMod", "UniqueID": "x.scalar", "Version": "1.0.0",
                "UpdateKeys": "Nexus:1234"}"#,
        );
        let list_dir = temp.path().join("ListMod");
        write_manifest(
            &list_dir,
            r#"{"Name": "ListMod", "UniqueID": "x.list", "Version": "1.0.0",
                "UpdateKeys": ["Nexus:1234"]}"#,
        );

        let manifests = scan_manifests(temp.path()).unwrap();
        assert_eq!(manifests.len(), 2);
        assert_eq!(manifests[0].update_keys, manifests[1].update_keys);
        assert_eq!(manifests[0].update_keys, vec!["Nexus:1234"]);
    }

    #[test]
    fn test_version_number_coerced_to_string() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("NumMod");
        write_manifest(
            &dir,
            r#"{"Name": "NumMod", "UniqueID": "x.num", "Version": 1.2}"#,
        );
        let manifests = scan_manifests(temp.path()).unwrap();
        assert_eq!(manifests[0].version, "1.2");
        assert!(manifests[0].update_keys.is_empty());
    }

    #[test]
    fn test_version_object_coerced() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("ObjMod");
        write_manifest(
            &dir,
            r#"{"Name": "ObjMod", "UniqueID": "x.obj",
                "Version": {"MajorVersion": 2, "MinorVersion": 3, "PatchVersion": 1}}"#,
        );
        let manifests = scan_manifests(temp.path()).unwrap();
        assert_eq!(manifests[0].version, "2.3.1");
    }

    #[test]
    fn test_nested_submod_records_relative_path() {
        let temp = TempDir::new().unwrap();
        let parent = temp.path().join("BigMod");
        write_manifest(
            &parent,
            r#"{"Name": "BigMod", "UniqueID": "x.big", "Version": "1.0.0"}"#,
        );
        let nested = parent.join("SubMod");
        write_manifest(
            &nested,
            r#"{"Name": "SubMod", "UniqueID": "x.sub", "Version": "1.0.0"}"#,
        );

        let manifests = scan_manifests(temp.path()).unwrap();
        assert_eq!(manifests.len(), 2);
        let sub = manifests.iter().find(|m| m.name == "SubMod").unwrap();
        assert_eq!(sub.relative_dir, PathBuf::from("BigMod/SubMod"));
    }

    #[test]
    fn test_invalid_manifest_skipped() {
        let temp = TempDir::new().unwrap();
        let good = temp.path().join("Good");
        write_manifest(
            &good,
            r#"{"Name": "Good", "UniqueID": "x.good", "Version": "1.0.0"}"#,
        );
        let bad = temp.path().join("Bad");
        write_manifest(&bad, "not json at all");

        let manifests = scan_manifests(temp.path()).unwrap();
        assert_eq!(manifests.len(), 1);
        assert_eq!(manifests[0].name, "Good");
    }
}
