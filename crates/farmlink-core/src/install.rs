//! Tiered mod download and install
//!
//! Sources are tried in order, first success wins: the Nexus API (gated on
//! a stored API key; link resolution denied by account tier is a normal
//! try-next outcome), GitHub releases (gated on an update key naming a
//! repo), and finally a manual browser fetch into a holding directory.
//!
//! A successful download is extracted, the archive's manifest locates the
//! mod's true root (archives may nest it), the existing local config is
//! preserved by content, and the mod folder is replaced wholesale.

use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, warn};
use zip::ZipArchive;

use crate::config::{AppConfig, RunContext};
use crate::error::{Error, Result};
use crate::layout::LocalLayout;
use crate::manifest::MANIFEST_FILE;
use crate::update::{ModUpdate, UpdateHost, host_from_update_keys};

const HTTP_TIMEOUT_SECS: u64 = 60;

/// Which tier produced the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadSource {
    Nexus,
    GitHub,
    Manual,
}

/// Result of one install attempt.
#[derive(Debug)]
pub enum InstallOutcome {
    Installed {
        dir: PathBuf,
        source: DownloadSource,
    },
    DryRun,
}

/// Operator interaction for the manual download tier.
pub trait ManualFetch {
    /// Block until the operator has placed an archive in `holding_dir`,
    /// or declined.
    fn wait_for_archive(&mut self, mod_name: &str, holding_dir: &Path) -> bool;
}

/// Downloads and installs one update candidate at a time.
pub struct ModInstaller {
    layout: LocalLayout,
    nexus_key_path: Option<PathBuf>,
    ctx: RunContext,
    client: reqwest::blocking::Client,
}

impl ModInstaller {
    pub fn new(layout: LocalLayout, config: &AppConfig, ctx: RunContext) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .user_agent("farmlink")
            .build()?;
        Ok(Self {
            layout,
            nexus_key_path: config.nexus_key_path(),
            ctx,
            client,
        })
    }

    /// Install one update candidate through the download tiers.
    pub fn install(
        &self,
        update: &ModUpdate,
        manual: &mut dyn ManualFetch,
    ) -> Result<InstallOutcome> {
        let name = &update.manifest.name;
        if self.ctx.dry_run {
            info!(
                "dry-run: would update '{}' {} -> {}",
                name, update.manifest.version, update.suggested_version
            );
            return Ok(InstallOutcome::DryRun);
        }

        let (archive, source) = self.download(update, manual)?;
        info!(module = %name, source = ?source, "downloaded update archive");

        let dir = self.install_archive(update, &archive)?;
        Ok(InstallOutcome::Installed { dir, source })
    }

    /// Try each download tier in order, accepting the first success.
    fn download(
        &self,
        update: &ModUpdate,
        manual: &mut dyn ManualFetch,
    ) -> Result<(PathBuf, DownloadSource)> {
        match self.try_nexus(update) {
            Ok(Some(archive)) => return Ok((archive, DownloadSource::Nexus)),
            Ok(None) => {}
            Err(e) => warn!(module = %update.manifest.name, "nexus tier failed: {e}"),
        }

        match self.try_github(update) {
            Ok(Some(archive)) => return Ok((archive, DownloadSource::GitHub)),
            Ok(None) => {}
            Err(e) => warn!(module = %update.manifest.name, "github tier failed: {e}"),
        }

        match self.try_manual(update, manual)? {
            Some(archive) => Ok((archive, DownloadSource::Manual)),
            None => Err(Error::NoDownloadSource {
                name: update.manifest.name.clone(),
            }),
        }
    }

    // ----- tier 1: Nexus API -----

    fn try_nexus(&self, update: &ModUpdate) -> Result<Option<PathBuf>> {
        let UpdateHost::Nexus { mod_id } = update.host else {
            return Ok(None);
        };
        let Some(key_path) = &self.nexus_key_path else {
            return Ok(None);
        };
        if !key_path.is_file() {
            debug!("no nexus api key stored; skipping nexus tier");
            return Ok(None);
        }
        let api_key = fs::read_to_string(key_path)?.trim().to_string();

        let files_url = format!(
            "https://api.nexusmods.com/v1/games/stardewvalley/mods/{mod_id}/files.json"
        );
        let listing: NexusFileList = self
            .client
            .get(&files_url)
            .header("apikey", &api_key)
            .send()?
            .error_for_status()?
            .json()?;

        let Some(file) = select_nexus_file(listing.files) else {
            return Ok(None);
        };

        let link_url = format!(
            "https://api.nexusmods.com/v1/games/stardewvalley/mods/{mod_id}/files/{}/download_link.json",
            file.file_id
        );
        let response = self.client.get(&link_url).header("apikey", &api_key).send()?;
        if response.status() == reqwest::StatusCode::FORBIDDEN {
            // Link resolution is a premium feature on some account tiers;
            // fall through to the next tier.
            debug!("nexus download links unavailable for this account tier");
            return Ok(None);
        }
        let links: Vec<NexusDownloadLink> = response.error_for_status()?.json()?;
        let Some(link) = links.into_iter().next() else {
            return Ok(None);
        };

        let dest = self
            .layout
            .downloads_dir()
            .join(format!("{}-{}.zip", update.manifest.unique_id, update.suggested_version));
        self.download_file(&link.uri, &dest)?;
        Ok(Some(dest))
    }

    // ----- tier 2: GitHub releases -----

    fn try_github(&self, update: &ModUpdate) -> Result<Option<PathBuf>> {
        let repo = match &update.host {
            UpdateHost::GitHub { repo } => Some(repo.clone()),
            // The host may point elsewhere while an update key still names
            // a repo; the tier is gated on the keys.
            _ => match host_from_update_keys(&update.manifest.update_keys) {
                UpdateHost::GitHub { repo } => Some(repo),
                _ => None,
            },
        };
        let Some(repo) = repo else {
            return Ok(None);
        };

        let url = format!("https://api.github.com/repos/{repo}/releases/latest");
        let release: GithubRelease = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .send()?
            .error_for_status()?
            .json()?;

        let Some(asset) = release
            .assets
            .into_iter()
            .filter(|a| a.name.to_ascii_lowercase().ends_with(".zip"))
            .max_by(|a, b| a.updated_at.cmp(&b.updated_at))
        else {
            return Ok(None);
        };

        let dest = self.layout.downloads_dir().join(&asset.name);
        self.download_file(&asset.browser_download_url, &dest)?;
        Ok(Some(dest))
    }

    // ----- tier 3: manual fallback -----

    fn try_manual(
        &self,
        update: &ModUpdate,
        manual: &mut dyn ManualFetch,
    ) -> Result<Option<PathBuf>> {
        let holding = self.layout.manual_downloads_dir();
        fs::create_dir_all(&holding)?;

        if let Some(url) = manual_page_url(update) {
            info!(module = %update.manifest.name, url = %url, "opening mod page");
            if let Err(e) = open::that(&url) {
                warn!("could not open browser: {e}");
            }
        }

        if !manual.wait_for_archive(&update.manifest.name, &holding) {
            return Ok(None);
        }
        Ok(pick_newest_archive(&holding)?)
    }

    fn download_file(&self, url: &str, dest: &Path) -> Result<()> {
        debug!(url = %url, dest = %dest.display(), "downloading");
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let response = self.client.get(url).send()?.error_for_status()?;
        let bytes = response.bytes()?;
        let mut file = File::create(dest)?;
        file.write_all(&bytes)?;
        Ok(())
    }

    // ----- install -----

    /// Extract an archive and replace the mod's local folder, preserving
    /// the existing configuration file by content.
    pub fn install_archive(&self, update: &ModUpdate, archive: &Path) -> Result<PathBuf> {
        let name = &update.manifest.name;
        let extract_dir = self
            .layout
            .downloads_dir()
            .join("extract")
            .join(&update.manifest.unique_id);
        if extract_dir.exists() {
            fs::remove_dir_all(&extract_dir)?;
        }
        extract_zip(archive, &extract_dir)
            .map_err(|e| Error::install(name, format!("extraction failed: {e}")))?;

        // The archive may nest the mod one or more levels deep; its
        // manifest marks the true root.
        let mod_root = find_mod_root(&extract_dir).ok_or_else(|| {
            Error::install(name, "archive contains no manifest".to_string())
        })?;

        let local_dir = self.layout.mods_dir().join(&update.manifest.relative_dir);
        let config_path = local_dir.join("config.json");
        let preserved_config = match fs::read(&config_path) {
            Ok(content) => Some(content),
            Err(_) => None,
        };

        if local_dir.exists() {
            fs::remove_dir_all(&local_dir)?;
        }
        crate::backup::copy_dir(&mod_root, &local_dir)?;

        if let Some(content) = preserved_config {
            fs::write(local_dir.join("config.json"), content)?;
        }

        fs::remove_dir_all(&extract_dir).ok();
        info!(module = %name, version = %update.suggested_version, "installed update");
        Ok(local_dir)
    }
}

#[derive(Debug, Deserialize)]
struct NexusFileList {
    files: Vec<NexusFile>,
}

#[derive(Debug, Deserialize)]
struct NexusFile {
    file_id: u64,
    #[serde(default)]
    category_name: Option<String>,
    #[serde(default)]
    uploaded_timestamp: i64,
}

#[derive(Debug, Deserialize)]
struct NexusDownloadLink {
    #[serde(rename = "URI")]
    uri: String,
}

#[derive(Debug, Deserialize)]
struct GithubRelease {
    assets: Vec<GithubAsset>,
}

#[derive(Debug, Deserialize)]
struct GithubAsset {
    name: String,
    browser_download_url: String,
    #[serde(default)]
    updated_at: String,
}

/// Most recently uploaded MAIN-category file, else the most recent file.
fn select_nexus_file(files: Vec<NexusFile>) -> Option<NexusFile> {
    let newest = |files: Vec<NexusFile>| {
        files
            .into_iter()
            .max_by_key(|f| f.uploaded_timestamp)
    };

    let main: Vec<NexusFile> = files
        .iter()
        .filter(|f| f.category_name.as_deref() == Some("MAIN"))
        .map(|f| NexusFile {
            file_id: f.file_id,
            category_name: f.category_name.clone(),
            uploaded_timestamp: f.uploaded_timestamp,
        })
        .collect();
    if !main.is_empty() {
        return newest(main);
    }
    newest(files)
}

/// Mod page for the manual tier.
fn manual_page_url(update: &ModUpdate) -> Option<String> {
    if let Some(url) = &update.page_url {
        return Some(url.clone());
    }
    match &update.host {
        UpdateHost::Nexus { mod_id } => Some(format!(
            "https://www.nexusmods.com/stardewvalley/mods/{mod_id}"
        )),
        UpdateHost::GitHub { repo } => Some(format!("https://github.com/{repo}/releases")),
        UpdateHost::Unknown => None,
    }
}

/// Most recently modified archive in the holding directory.
fn pick_newest_archive(holding: &Path) -> Result<Option<PathBuf>> {
    let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
    for entry in fs::read_dir(holding)? {
        let entry = entry?;
        let path = entry.path();
        let is_archive = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("zip"));
        if !is_archive {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        if newest.as_ref().is_none_or(|(t, _)| modified > *t) {
            newest = Some((modified, path));
        }
    }
    Ok(newest.map(|(_, path)| path))
}

/// Shallowest directory under `root` containing a manifest.
fn find_mod_root(root: &Path) -> Option<PathBuf> {
    let mut queue = std::collections::VecDeque::from([root.to_path_buf()]);
    while let Some(dir) = queue.pop_front() {
        if dir.join(MANIFEST_FILE).is_file() {
            return Some(dir);
        }
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        let mut subdirs: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        subdirs.sort();
        queue.extend(subdirs);
    }
    None
}

fn extract_zip(archive: &Path, dest: &Path) -> zip::result::ZipResult<()> {
    let file = File::open(archive)?;
    let reader = BufReader::new(file);
    let mut zip = ZipArchive::new(reader)?;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            continue;
        };
        let outpath = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&outpath)?;
        } else {
            if let Some(parent) = outpath.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut outfile = File::create(&outpath)?;
            io::copy(&mut entry, &mut outfile)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn nexus_file(id: u64, category: Option<&str>, uploaded: i64) -> NexusFile {
        NexusFile {
            file_id: id,
            category_name: category.map(String::from),
            uploaded_timestamp: uploaded,
        }
    }

    #[test]
    fn test_select_nexus_file_prefers_newest_main() {
        let files = vec![
            nexus_file(1, Some("MAIN"), 100),
            nexus_file(2, Some("MAIN"), 200),
            nexus_file(3, Some("OPTIONAL"), 300),
        ];
        assert_eq!(select_nexus_file(files).unwrap().file_id, 2);
    }

    #[test]
    fn test_select_nexus_file_falls_back_to_newest() {
        let files = vec![
            nexus_file(1, Some("OPTIONAL"), 100),
            nexus_file(2, None, 300),
        ];
        assert_eq!(select_nexus_file(files).unwrap().file_id, 2);
        assert!(select_nexus_file(Vec::new()).is_none());
    }

    fn make_zip(path: &Path, entries: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        for (name, content) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    fn sample_update(layout: &LocalLayout) -> ModUpdate {
        ModUpdate {
            manifest: crate::manifest::ModManifest {
                name: "Foo".to_string(),
                unique_id: "author.foo".to_string(),
                version: "1.0".to_string(),
                update_keys: vec!["Chucklefish:1".to_string()],
                dir: layout.mods_dir().join("Foo"),
                relative_dir: PathBuf::from("Foo"),
            },
            suggested_version: "2.0".to_string(),
            host: UpdateHost::Unknown,
            page_url: None,
        }
    }

    fn installer(layout: &LocalLayout) -> ModInstaller {
        ModInstaller::new(
            layout.clone(),
            &AppConfig {
                // Point the key lookup somewhere that cannot exist so the
                // nexus tier is skipped.
                nexus_api_key_file: Some(layout.root().join("no-such-key")),
                ..Default::default()
            },
            RunContext::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_find_mod_root_nested() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("release").join("Foo 2.0").join("Foo");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join(MANIFEST_FILE), "{}").unwrap();

        assert_eq!(find_mod_root(temp.path()).unwrap(), nested);
    }

    #[test]
    fn test_find_mod_root_missing() {
        let temp = TempDir::new().unwrap();
        assert!(find_mod_root(temp.path()).is_none());
    }

    #[test]
    fn test_pick_newest_archive_ignores_non_archives() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("readme.txt"), "x").unwrap();
        assert!(pick_newest_archive(temp.path()).unwrap().is_none());

        fs::write(temp.path().join("mod.zip"), "x").unwrap();
        let picked = pick_newest_archive(temp.path()).unwrap().unwrap();
        assert_eq!(picked.file_name().unwrap(), "mod.zip");
    }

    #[test]
    fn test_install_archive_preserves_config() {
        let temp = TempDir::new().unwrap();
        let layout = LocalLayout::new(temp.path());
        layout.ensure().unwrap();

        // Existing install with operator-tuned config.
        let mod_dir = layout.mods_dir().join("Foo");
        fs::create_dir_all(&mod_dir).unwrap();
        fs::write(mod_dir.join(MANIFEST_FILE), r#"{"old": true}"#).unwrap();
        fs::write(mod_dir.join("config.json"), r#"{"tuned": true}"#).unwrap();

        // Update archive nesting the mod one level deep, shipping a
        // default config.
        let archive = temp.path().join("foo-2.0.zip");
        make_zip(
            &archive,
            &[
                ("Foo 2.0/Foo/manifest.json", r#"{"new": true}"#),
                ("Foo 2.0/Foo/config.json", r#"{"default": true}"#),
                ("Foo 2.0/Foo/mod.dll", "binary"),
            ],
        );

        let update = sample_update(&layout);
        let installed = installer(&layout).install_archive(&update, &archive).unwrap();

        assert_eq!(installed, mod_dir);
        assert_eq!(
            fs::read_to_string(mod_dir.join(MANIFEST_FILE)).unwrap(),
            r#"{"new": true}"#
        );
        // The shipped default did not overwrite the tuned config.
        assert_eq!(
            fs::read_to_string(mod_dir.join("config.json")).unwrap(),
            r#"{"tuned": true}"#
        );
        assert!(mod_dir.join("mod.dll").is_file());
    }

    #[test]
    fn test_install_archive_without_manifest_fails() {
        let temp = TempDir::new().unwrap();
        let layout = LocalLayout::new(temp.path());
        layout.ensure().unwrap();

        let archive = temp.path().join("broken.zip");
        make_zip(&archive, &[("readme.txt", "no manifest here")]);

        let update = sample_update(&layout);
        let result = installer(&layout).install_archive(&update, &archive);
        assert!(matches!(result, Err(Error::Install { .. })));
    }

    /// Unknown host with no key file and no repo key: tiers 1 and 2 are
    /// skipped and the manual tier runs.
    #[test]
    fn test_unknown_host_falls_through_to_manual() {
        let temp = TempDir::new().unwrap();
        let layout = LocalLayout::new(temp.path());
        layout.ensure().unwrap();

        struct DropArchive;
        impl ManualFetch for DropArchive {
            fn wait_for_archive(&mut self, _mod_name: &str, holding: &Path) -> bool {
                let archive = holding.join("foo-manual.zip");
                let file = File::create(archive).unwrap();
                let mut writer = zip::ZipWriter::new(file);
                writer
                    .start_file("Foo/manifest.json", SimpleFileOptions::default())
                    .unwrap();
                writer.write_all(b"{}").unwrap();
                writer.finish().unwrap();
                true
            }
        }

        let update = sample_update(&layout);
        let outcome = installer(&layout).install(&update, &mut DropArchive).unwrap();

        match outcome {
            InstallOutcome::Installed { source, dir } => {
                assert_eq!(source, DownloadSource::Manual);
                assert!(dir.join(MANIFEST_FILE).is_file());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_manual_declined_reports_no_source() {
        let temp = TempDir::new().unwrap();
        let layout = LocalLayout::new(temp.path());
        layout.ensure().unwrap();

        struct Decline;
        impl ManualFetch for Decline {
            fn wait_for_archive(&mut self, _mod_name: &str, _holding: &Path) -> bool {
                false
            }
        }

        let update = sample_update(&layout);
        let result = installer(&layout).install(&update, &mut Decline);
        assert!(matches!(result, Err(Error::NoDownloadSource { .. })));
    }

    #[test]
    fn test_dry_run_downloads_nothing() {
        let temp = TempDir::new().unwrap();
        let layout = LocalLayout::new(temp.path());
        layout.ensure().unwrap();

        struct MustNotRun;
        impl ManualFetch for MustNotRun {
            fn wait_for_archive(&mut self, _mod_name: &str, _holding: &Path) -> bool {
                panic!("manual tier reached in dry-run");
            }
        }

        let mut installer = ModInstaller::new(
            layout.clone(),
            &AppConfig::default(),
            RunContext {
                dry_run: true,
                force: false,
            },
        )
        .unwrap();
        installer.nexus_key_path = None;

        let update = sample_update(&layout);
        let outcome = installer.install(&update, &mut MustNotRun).unwrap();
        assert!(matches!(outcome, InstallOutcome::DryRun));
    }
}
