//! Project root discovery, per-project settings, and the asset walker.

use glob::Pattern;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::local_files::{local, FileSystem};

/// Portable per-project settings, read from `repoint.json` at the project
/// root. Absent file means defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectConfig {
    /// Directory under the project root that holds user assets.
    pub assets_root: String,
    /// Extra directory patterns to skip while walking (glob syntax, matched
    /// against the directory name and the path relative to the assets root).
    pub extra_skip_dirs: Vec<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            assets_root: "Assets".to_string(),
            extra_skip_dirs: Vec::new(),
        }
    }
}

impl ProjectConfig {
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join("repoint.json");
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = local().read(&path)?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| Error::config_invalid_json(path.display().to_string(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.assets_root.trim().is_empty() {
            return Err(Error::config_invalid_value(
                "assetsRoot",
                None,
                "cannot be empty",
            ));
        }
        if Path::new(&self.assets_root).is_absolute() {
            return Err(Error::config_invalid_value(
                "assetsRoot",
                Some(self.assets_root.clone()),
                "must be relative to the project root",
            ));
        }
        for pat in &self.extra_skip_dirs {
            Pattern::new(pat).map_err(|e| {
                Error::config_invalid_value("extraSkipDirs", Some(pat.clone()), e.to_string())
            })?;
        }
        Ok(())
    }

    fn skip_patterns(&self) -> Vec<Pattern> {
        self.extra_skip_dirs
            .iter()
            .filter_map(|p| Pattern::new(p).ok())
            .collect()
    }
}

/// A validated Unity project root plus its resolved settings.
#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    pub config: ProjectConfig,
}

impl Project {
    /// Open and validate a project root. The assets directory must exist;
    /// everything else about the layout is Unity's business.
    pub fn open(root: impl Into<PathBuf>, assets_root_override: Option<&str>) -> Result<Self> {
        let given: PathBuf = root.into();
        let root = given
            .canonicalize()
            .map_err(|_| Error::project_not_found(given.display().to_string()))?;

        let mut config = ProjectConfig::load(&root)?;
        if let Some(over) = assets_root_override {
            config.assets_root = over.to_string();
            config.validate()?;
        }

        let assets = root.join(&config.assets_root);
        if !assets.is_dir() {
            return Err(
                Error::project_not_found(root.display().to_string()).with_hint(format!(
                    "No '{}' directory under the project root",
                    config.assets_root
                )),
            );
        }

        Ok(Self { root, config })
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join(&self.config.assets_root)
    }

    /// Project-relative path with forward slashes, for stable output and
    /// stable store keys.
    pub fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }
}

// ============================================================================
// Asset walking
// ============================================================================

/// Directories Unity manages or regenerates; they never hold user scripts or
/// user-serialized assets.
const ALWAYS_SKIP_DIRS: &[&str] = &[
    "Library",
    "Temp",
    "Logs",
    "obj",
    ".git",
    ".svn",
    ".hg",
    "node_modules",
];

/// Skipped only directly under the assets root (build output landing spots).
/// Deeper directories with these names can be ordinary asset folders.
const ROOT_ONLY_SKIP_DIRS: &[&str] = &["Build", "Builds", "StreamingAssetsBackup"];

/// Walk the project's assets tree collecting files with one of `extensions`
/// (lowercase, without the dot). Returns paths sorted for deterministic
/// passes.
pub fn walk_asset_files(project: &Project, extensions: &[&str]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let skips = project.config.skip_patterns();
    let assets = project.assets_dir();
    walk_recursive(&assets, &assets, &skips, extensions, &mut files);
    files.sort();
    files
}

fn walk_recursive(
    dir: &Path,
    root: &Path,
    skips: &[Pattern],
    extensions: &[&str],
    files: &mut Vec<PathBuf>,
) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    let is_root = dir == root;

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if ALWAYS_SKIP_DIRS.contains(&name.as_str()) {
                continue;
            }
            if is_root && ROOT_ONLY_SKIP_DIRS.contains(&name.as_str()) {
                continue;
            }
            if matches_skip(&path, root, &name, skips) {
                continue;
            }
            walk_recursive(&path, root, skips, extensions, files);
        } else if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            let ext = ext.to_ascii_lowercase();
            if extensions.contains(&ext.as_str()) {
                files.push(path);
            }
        }
    }
}

fn matches_skip(path: &Path, root: &Path, name: &str, skips: &[Pattern]) -> bool {
    if skips.is_empty() {
        return false;
    }
    let rel = path
        .strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/");
    skips.iter().any(|p| p.matches(name) || p.matches(&rel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn make_project(dir: &Path) {
        fs::create_dir_all(dir.join("Assets/Scripts")).unwrap();
        fs::create_dir_all(dir.join("Library")).unwrap();
    }

    #[test]
    fn open_requires_assets_dir() {
        let dir = tempdir().unwrap();
        assert!(Project::open(dir.path(), None).is_err());

        make_project(dir.path());
        let project = Project::open(dir.path(), None).unwrap();
        assert_eq!(project.config.assets_root, "Assets");
    }

    #[test]
    fn open_rejects_missing_root() {
        let dir = tempdir().unwrap();
        let gone = dir.path().join("nope");
        let err = Project::open(&gone, None).unwrap_err();
        assert_eq!(err.code, crate::ErrorCode::ProjectNotFound);
    }

    #[test]
    fn assets_root_override() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Content")).unwrap();
        let project = Project::open(dir.path(), Some("Content")).unwrap();
        assert!(project.assets_dir().ends_with("Content"));
    }

    #[test]
    fn config_load_defaults_when_missing() {
        let dir = tempdir().unwrap();
        let config = ProjectConfig::load(dir.path()).unwrap();
        assert_eq!(config.assets_root, "Assets");
        assert!(config.extra_skip_dirs.is_empty());
    }

    #[test]
    fn config_rejects_invalid_json() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("repoint.json"), "{not json").unwrap();
        let err = ProjectConfig::load(dir.path()).unwrap_err();
        assert_eq!(err.code, crate::ErrorCode::ConfigInvalidJson);
    }

    #[test]
    fn config_rejects_empty_assets_root() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("repoint.json"), r#"{"assetsRoot": "  "}"#).unwrap();
        assert!(ProjectConfig::load(dir.path()).is_err());
    }

    #[test]
    fn walk_filters_extensions_and_skips_dirs() {
        let dir = tempdir().unwrap();
        make_project(dir.path());
        let assets = dir.path().join("Assets");
        fs::write(assets.join("Main.unity"), "").unwrap();
        fs::write(assets.join("Scripts/Thing.cs"), "").unwrap();
        fs::write(assets.join("Scripts/Thing.cs.meta"), "").unwrap();
        fs::create_dir_all(assets.join(".git")).unwrap();
        fs::write(assets.join(".git/junk.unity"), "").unwrap();

        let project = Project::open(dir.path(), None).unwrap();
        let scenes = walk_asset_files(&project, &["unity"]);
        assert_eq!(scenes.len(), 1);
        assert!(scenes[0].ends_with("Main.unity"));

        let sources = walk_asset_files(&project, &["cs"]);
        assert_eq!(sources.len(), 1);
    }

    #[test]
    fn walk_honors_extra_skip_patterns() {
        let dir = tempdir().unwrap();
        make_project(dir.path());
        let assets = dir.path().join("Assets");
        fs::create_dir_all(assets.join("ThirdParty/Vendor")).unwrap();
        fs::write(assets.join("ThirdParty/Vendor/V.asset"), "").unwrap();
        fs::write(assets.join("Mine.asset"), "").unwrap();
        fs::write(
            dir.path().join("repoint.json"),
            r#"{"extraSkipDirs": ["ThirdParty*"]}"#,
        )
        .unwrap();

        let project = Project::open(dir.path(), None).unwrap();
        let found = walk_asset_files(&project, &["asset"]);
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("Mine.asset"));
    }

    #[test]
    fn walk_root_only_skip_allows_nested() {
        let dir = tempdir().unwrap();
        make_project(dir.path());
        let assets = dir.path().join("Assets");
        fs::create_dir_all(assets.join("Build")).unwrap();
        fs::write(assets.join("Build/out.asset"), "").unwrap();
        fs::create_dir_all(assets.join("Levels/Build")).unwrap();
        fs::write(assets.join("Levels/Build/level.asset"), "").unwrap();

        let project = Project::open(dir.path(), None).unwrap();
        let found = walk_asset_files(&project, &["asset"]);
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("level.asset"));
    }
}
