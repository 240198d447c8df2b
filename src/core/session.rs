//! Per-project session state: which scripts existed at the last scan, which
//! deletions are still showing, which the user dismissed, and cached
//! categories for scripts whose source is gone.
//!
//! The session is an explicit object the command layer constructs and passes
//! around; nothing in the crate reaches for ambient state.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::guid::ScriptGuid;
use crate::local_files::{local, FileSystem};
use crate::paths;
use crate::script::{ScriptCategory, ScriptIdentifier};
use crate::slugify::session_slug;

/// One tracked script, as last seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptRecord {
    pub guid: ScriptGuid,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub type_name: Option<String>,
    pub category: ScriptCategory,
    pub first_seen: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub missing_since: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionData {
    /// Scripts present at the last update.
    pub known: Vec<ScriptRecord>,
    /// Scripts that disappeared and are still shown.
    pub missing: Vec<ScriptRecord>,
    /// Disappeared scripts the user dismissed.
    pub ignored: Vec<ScriptRecord>,
    /// guid -> category. Deleted scripts keep a category here after their
    /// source can no longer be classified.
    pub type_cache: BTreeMap<ScriptGuid, ScriptCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Outcome of one classification pass.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanDiff {
    /// Scripts seen for the first time.
    pub added: Vec<ScriptRecord>,
    /// Scripts that disappeared in this pass.
    pub deleted: Vec<ScriptRecord>,
    pub known: usize,
    pub missing: usize,
    pub ignored: usize,
}

pub struct Session {
    path: PathBuf,
    pub data: SessionData,
}

impl Session {
    /// Session backed by an explicit file. A missing file is a fresh
    /// session, not an error.
    pub fn at(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            return Ok(Self {
                path,
                data: SessionData::default(),
            });
        }
        let raw = local().read(&path)?;
        let data = serde_json::from_str(&raw)
            .map_err(|e| Error::config_invalid_json(path.display().to_string(), e))?;
        Ok(Self { path, data })
    }

    /// The project's session under the tool config directory.
    pub fn load_or_default(project_root: &Path) -> Result<Self> {
        let slug = session_slug(project_root);
        Self::at(paths::session(&slug)?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist the session, creating directories on demand.
    pub fn save(&self) -> Result<()> {
        let fs = local();
        if let Some(parent) = self.path.parent() {
            fs.ensure_dir(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.data)
            .map_err(|e| Error::internal_json(e.to_string(), Some("serialize session".to_string())))?;
        fs.write(&self.path, &json)
    }

    /// Recompute the classification against the current script set.
    /// In-memory only; call `save` to persist.
    pub fn update(&mut self, scripts: &[ScriptIdentifier]) -> ScanDiff {
        let now = Utc::now().to_rfc3339();

        let mut prior_known: BTreeMap<ScriptGuid, ScriptRecord> =
            std::mem::take(&mut self.data.known)
                .into_iter()
                .map(|r| (r.guid, r))
                .collect();
        let mut prior_missing: BTreeMap<ScriptGuid, ScriptRecord> =
            std::mem::take(&mut self.data.missing)
                .into_iter()
                .map(|r| (r.guid, r))
                .collect();
        let mut prior_ignored: BTreeMap<ScriptGuid, ScriptRecord> =
            std::mem::take(&mut self.data.ignored)
                .into_iter()
                .map(|r| (r.guid, r))
                .collect();

        let mut added = Vec::new();
        let mut known = Vec::with_capacity(scripts.len());

        for script in scripts {
            self.data.type_cache.insert(script.guid, script.category);

            // A reappearing guid resurrects its record from wherever it sat.
            let existing = prior_known
                .remove(&script.guid)
                .or_else(|| prior_missing.remove(&script.guid))
                .or_else(|| prior_ignored.remove(&script.guid));

            let record = match existing {
                Some(mut record) => {
                    record.path = script.path.clone();
                    record.type_name = script.type_name.clone();
                    record.category = script.category;
                    record.missing_since = None;
                    record
                }
                None => {
                    let record = ScriptRecord {
                        guid: script.guid,
                        path: script.path.clone(),
                        type_name: script.type_name.clone(),
                        category: script.category,
                        first_seen: now.clone(),
                        missing_since: None,
                    };
                    added.push(record.clone());
                    record
                }
            };
            known.push(record);
        }

        // Whatever is left in prior_known vanished in this pass.
        let mut deleted: Vec<ScriptRecord> = prior_known
            .into_values()
            .map(|mut record| {
                record.missing_since = Some(now.clone());
                record
            })
            .collect();
        deleted.sort_by(|a, b| a.path.cmp(&b.path));

        let mut missing: Vec<ScriptRecord> = prior_missing.into_values().collect();
        missing.extend(deleted.iter().cloned());
        missing.sort_by(|a, b| a.path.cmp(&b.path));

        let mut ignored: Vec<ScriptRecord> = prior_ignored.into_values().collect();
        ignored.sort_by(|a, b| a.path.cmp(&b.path));

        self.data.known = known;
        self.data.missing = missing;
        self.data.ignored = ignored;
        self.data.updated_at = Some(now);

        ScanDiff {
            added,
            deleted,
            known: self.data.known.len(),
            missing: self.data.missing.len(),
            ignored: self.data.ignored.len(),
        }
    }

    /// Non-mutating deletion check: every tracked, undismissed script absent
    /// from `scripts`.
    pub fn check(&self, scripts: &[ScriptIdentifier]) -> Vec<ScriptRecord> {
        let current: HashSet<ScriptGuid> = scripts.iter().map(|s| s.guid).collect();
        self.data
            .known
            .iter()
            .chain(self.data.missing.iter())
            .filter(|r| !current.contains(&r.guid))
            .cloned()
            .collect()
    }

    /// Clear the ignore list; dismissed deletions show again. Returns how
    /// many came back.
    pub fn show_older(&mut self) -> usize {
        let drained = std::mem::take(&mut self.data.ignored);
        let count = drained.len();
        self.data.missing.extend(drained);
        self.data.missing.sort_by(|a, b| a.path.cmp(&b.path));
        count
    }

    /// Dismiss a missing script: hide it from future reports until
    /// `show_older`.
    pub fn dismiss(&mut self, guid: ScriptGuid) -> Result<ScriptRecord> {
        let idx = self
            .data
            .missing
            .iter()
            .position(|r| r.guid == guid)
            .ok_or_else(|| Error::script_not_found(guid.simple()))?;
        let record = self.data.missing.remove(idx);
        self.data.ignored.push(record.clone());
        Ok(record)
    }

    /// Category oracle for the rewrite engine. Live scripts were absorbed
    /// into the cache by the last update; deleted ones stay cached; anything
    /// else is unresolved.
    pub fn category_of(&self, guid: ScriptGuid) -> ScriptCategory {
        self.data
            .type_cache
            .get(&guid)
            .copied()
            .unwrap_or(ScriptCategory::Unresolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn script(guid: &str, path: &str, category: ScriptCategory) -> ScriptIdentifier {
        ScriptIdentifier {
            guid: ScriptGuid::parse(guid).unwrap(),
            path: path.to_string(),
            type_name: Some(path.trim_end_matches(".cs").replace('/', ".")),
            category,
        }
    }

    const GUID_1: &str = "11111111111111111111111111111111";
    const GUID_2: &str = "22222222222222222222222222222222";

    #[test]
    fn update_classifies_added_then_deleted() {
        let dir = tempdir().unwrap();
        let mut session = Session::at(dir.path().join("s.json")).unwrap();

        let a = script(GUID_1, "Assets/A.cs", ScriptCategory::Behaviour);
        let b = script(GUID_2, "Assets/B.cs", ScriptCategory::DataAsset);

        let diff = session.update(&[a.clone(), b.clone()]);
        assert_eq!(diff.added.len(), 2);
        assert_eq!(diff.deleted.len(), 0);
        assert_eq!(diff.known, 2);

        let diff = session.update(&[a.clone()]);
        assert_eq!(diff.added.len(), 0);
        assert_eq!(diff.deleted.len(), 1);
        assert_eq!(diff.deleted[0].path, "Assets/B.cs");
        assert!(diff.deleted[0].missing_since.is_some());
        assert_eq!(diff.missing, 1);

        // Category survives deletion through the cache.
        assert_eq!(
            session.category_of(ScriptGuid::parse(GUID_2).unwrap()),
            ScriptCategory::DataAsset
        );
    }

    #[test]
    fn check_is_non_mutating() {
        let dir = tempdir().unwrap();
        let mut session = Session::at(dir.path().join("s.json")).unwrap();
        let a = script(GUID_1, "Assets/A.cs", ScriptCategory::Behaviour);
        let b = script(GUID_2, "Assets/B.cs", ScriptCategory::Behaviour);
        session.update(&[a.clone(), b.clone()]);

        let gone = session.check(&[a.clone()]);
        assert_eq!(gone.len(), 1);
        assert_eq!(gone[0].path, "Assets/B.cs");

        // Nothing moved.
        assert_eq!(session.data.known.len(), 2);
        assert!(session.data.missing.is_empty());
    }

    #[test]
    fn dismiss_then_show_older() {
        let dir = tempdir().unwrap();
        let mut session = Session::at(dir.path().join("s.json")).unwrap();
        let a = script(GUID_1, "Assets/A.cs", ScriptCategory::Behaviour);
        let b = script(GUID_2, "Assets/B.cs", ScriptCategory::Behaviour);
        session.update(&[a.clone(), b.clone()]);
        session.update(&[a.clone()]);

        let guid_b = ScriptGuid::parse(GUID_2).unwrap();
        let dismissed = session.dismiss(guid_b).unwrap();
        assert_eq!(dismissed.path, "Assets/B.cs");
        assert!(session.data.missing.is_empty());
        assert_eq!(session.data.ignored.len(), 1);

        // Dismissed scripts no longer show in check.
        assert!(session.check(&[a.clone()]).is_empty());

        assert_eq!(session.show_older(), 1);
        assert_eq!(session.data.missing.len(), 1);
        assert!(session.data.ignored.is_empty());
    }

    #[test]
    fn dismiss_unknown_guid_errors() {
        let dir = tempdir().unwrap();
        let mut session = Session::at(dir.path().join("s.json")).unwrap();
        let err = session.dismiss(ScriptGuid::parse(GUID_1).unwrap()).unwrap_err();
        assert_eq!(err.code, crate::ErrorCode::ScriptNotFound);
    }

    #[test]
    fn reappearing_script_resurrects() {
        let dir = tempdir().unwrap();
        let mut session = Session::at(dir.path().join("s.json")).unwrap();
        let a = script(GUID_1, "Assets/A.cs", ScriptCategory::Behaviour);
        session.update(&[a.clone()]);
        session.update(&[]);
        assert_eq!(session.data.missing.len(), 1);

        let moved = script(GUID_1, "Assets/New/A.cs", ScriptCategory::Behaviour);
        let diff = session.update(&[moved]);
        assert!(diff.added.is_empty());
        assert!(session.data.missing.is_empty());
        assert_eq!(session.data.known[0].path, "Assets/New/A.cs");
        assert!(session.data.known[0].missing_since.is_none());
    }

    #[test]
    fn save_and_reload_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("s.json");
        let mut session = Session::at(path.clone()).unwrap();
        let a = script(GUID_1, "Assets/A.cs", ScriptCategory::DataAsset);
        session.update(&[a]);
        session.save().unwrap();

        let reloaded = Session::at(path).unwrap();
        assert_eq!(reloaded.data.known.len(), 1);
        assert_eq!(
            reloaded.category_of(ScriptGuid::parse(GUID_1).unwrap()),
            ScriptCategory::DataAsset
        );
    }

    #[test]
    fn category_of_unknown_is_unresolved() {
        let dir = tempdir().unwrap();
        let session = Session::at(dir.path().join("s.json")).unwrap();
        assert_eq!(
            session.category_of(ScriptGuid::parse(GUID_1).unwrap()),
            ScriptCategory::Unresolved
        );
    }
}
