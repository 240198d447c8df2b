//! The project object store: loaded file buffers, the selection slot, and
//! the committed-write path.

use std::collections::BTreeMap;
use std::ops::Range;

use crate::error::{Error, Result};
use crate::local_files::{local, FileSystem};
use crate::project::{walk_asset_files, Project};
use crate::serialized::FileId;

/// Extensions of serialized container files.
pub const CONTAINER_EXTENSIONS: &[&str] = &["unity", "prefab", "asset"];

/// The active inspection slot: which document the surrounding tooling is
/// looking at. Enumeration parks it on each container and must put it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub path: String,
    pub anchor: FileId,
}

#[derive(Debug)]
struct FileBuf {
    text: String,
    dirty: bool,
    /// Loaded by a bulk pass rather than an explicit request; eligible for
    /// compaction while clean.
    force_loaded: bool,
}

/// Counters from a bulk force-load.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadStats {
    pub loaded: usize,
    pub skipped: usize,
}

pub struct ProjectStore {
    project: Project,
    files: BTreeMap<String, FileBuf>,
    selection: Option<Selection>,
}

impl ProjectStore {
    pub fn open(project: Project) -> Self {
        Self {
            project,
            files: BTreeMap::new(),
            selection: None,
        }
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Relative paths of every persisted container file on disk.
    pub fn persisted_container_files(&self) -> Vec<String> {
        walk_asset_files(&self.project, CONTAINER_EXTENSIONS)
            .iter()
            .map(|p| self.project.relative(p))
            .collect()
    }

    /// Relative paths of every loaded buffer.
    pub fn loaded_files(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    /// Load a file into the store. Explicit loads are pinned: compaction
    /// never drops them.
    pub fn load(&mut self, rel: &str) -> Result<&str> {
        if let Some(buf) = self.files.get_mut(rel) {
            buf.force_loaded = false;
        } else {
            let abs = self.project.root.join(rel);
            let text = local().read(&abs)?;
            self.files.insert(
                rel.to_string(),
                FileBuf {
                    text,
                    dirty: false,
                    force_loaded: false,
                },
            );
        }
        Ok(self.files.get(rel).map(|b| b.text.as_str()).unwrap_or_default())
    }

    /// Bulk-load every persisted container file not already in the store.
    /// Unreadable files are counted and skipped, never fatal.
    pub fn force_load_all(&mut self) -> LoadStats {
        let mut stats = LoadStats::default();
        for rel in self.persisted_container_files() {
            if self.files.contains_key(&rel) {
                continue;
            }
            let abs = self.project.root.join(&rel);
            match local().read(&abs) {
                Ok(text) => {
                    self.files.insert(
                        rel,
                        FileBuf {
                            text,
                            dirty: false,
                            force_loaded: true,
                        },
                    );
                    stats.loaded += 1;
                }
                Err(_) => stats.skipped += 1,
            }
        }
        stats
    }

    pub fn text(&self, rel: &str) -> Option<&str> {
        self.files.get(rel).map(|b| b.text.as_str())
    }

    pub fn is_dirty(&self, rel: &str) -> bool {
        self.files.get(rel).map(|b| b.dirty).unwrap_or(false)
    }

    pub fn dirty_files(&self) -> Vec<String> {
        self.files
            .iter()
            .filter(|(_, b)| b.dirty)
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// The committed-write path: replace a byte span in a loaded buffer and
    /// mark the file dirty. The only mutation route into the store.
    pub fn commit_edit(&mut self, rel: &str, span: Range<usize>, replacement: &str) -> Result<()> {
        let Some(buf) = self.files.get_mut(rel) else {
            return Err(Error::internal_unexpected(format!(
                "edit committed to unloaded file '{}'",
                rel
            )));
        };
        if span.start > span.end
            || span.end > buf.text.len()
            || !buf.text.is_char_boundary(span.start)
            || !buf.text.is_char_boundary(span.end)
        {
            return Err(Error::internal_unexpected(format!(
                "edit span {}..{} out of bounds for '{}'",
                span.start, span.end, rel
            )));
        }
        buf.text.replace_range(span, replacement);
        buf.dirty = true;
        Ok(())
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn select(&mut self, selection: Option<Selection>) {
        self.selection = selection;
    }

    /// Drop force-loaded buffers with no pending edits. Returns how many
    /// were dropped.
    pub fn compact(&mut self) -> usize {
        let before = self.files.len();
        self.files.retain(|_, buf| !buf.force_loaded || buf.dirty);
        before - self.files.len()
    }

    /// Write every dirty buffer back to disk through the atomic write path.
    /// Returns the relative paths written.
    pub fn flush(&mut self) -> Result<Vec<String>> {
        let fs = local();
        let mut written = Vec::new();
        for (rel, buf) in self.files.iter_mut() {
            if !buf.dirty {
                continue;
            }
            let abs = self.project.root.join(rel.as_str());
            fs.write(&abs, &buf.text)?;
            buf.dirty = false;
            written.push(rel.clone());
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    const GUID_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const GUID_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    fn scene(guid: &str) -> String {
        format!(
            "--- !u!114 &200\nMonoBehaviour:\n  m_GameObject: {{fileID: 100}}\n  m_Script: {{fileID: 11500000, guid: {guid}, type: 3}}\n"
        )
    }

    fn make_store(dir: &Path) -> ProjectStore {
        fs::create_dir_all(dir.join("Assets")).unwrap();
        fs::write(dir.join("Assets/Main.unity"), scene(GUID_A)).unwrap();
        ProjectStore::open(Project::open(dir, None).unwrap())
    }

    #[test]
    fn load_and_text() {
        let dir = tempdir().unwrap();
        let mut store = make_store(dir.path());

        assert!(store.text("Assets/Main.unity").is_none());
        let text = store.load("Assets/Main.unity").unwrap();
        assert!(text.contains(GUID_A));
        assert!(store.text("Assets/Main.unity").is_some());
    }

    #[test]
    fn commit_edit_swaps_span_and_marks_dirty() {
        let dir = tempdir().unwrap();
        let mut store = make_store(dir.path());
        store.load("Assets/Main.unity").unwrap();

        let start = store.text("Assets/Main.unity").unwrap().find(GUID_A).unwrap();
        store
            .commit_edit("Assets/Main.unity", start..start + 32, GUID_B)
            .unwrap();

        let text = store.text("Assets/Main.unity").unwrap();
        assert!(text.contains(GUID_B));
        assert!(!text.contains(GUID_A));
        assert!(store.is_dirty("Assets/Main.unity"));
        assert_eq!(store.dirty_files(), vec!["Assets/Main.unity".to_string()]);
    }

    #[test]
    fn commit_edit_rejects_unloaded_and_out_of_bounds() {
        let dir = tempdir().unwrap();
        let mut store = make_store(dir.path());

        assert!(store.commit_edit("Assets/Main.unity", 0..1, "x").is_err());

        store.load("Assets/Main.unity").unwrap();
        let len = store.text("Assets/Main.unity").unwrap().len();
        assert!(store
            .commit_edit("Assets/Main.unity", len..len + 1, "x")
            .is_err());
    }

    #[test]
    fn force_load_then_compact_keeps_dirty_and_pinned() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Assets")).unwrap();
        fs::write(dir.path().join("Assets/A.unity"), scene(GUID_A)).unwrap();
        fs::write(dir.path().join("Assets/B.prefab"), scene(GUID_A)).unwrap();
        fs::write(dir.path().join("Assets/C.asset"), scene(GUID_A)).unwrap();
        let mut store = ProjectStore::open(Project::open(dir.path(), None).unwrap());

        // Pin one file by loading it explicitly before the bulk pass.
        store.load("Assets/A.unity").unwrap();
        let stats = store.force_load_all();
        assert_eq!(stats.loaded, 2);
        assert_eq!(stats.skipped, 0);
        assert_eq!(store.loaded_files().len(), 3);

        // Dirty one of the force-loaded buffers.
        let start = store.text("Assets/B.prefab").unwrap().find(GUID_A).unwrap();
        store
            .commit_edit("Assets/B.prefab", start..start + 32, GUID_B)
            .unwrap();

        let dropped = store.compact();
        assert_eq!(dropped, 1);
        let mut left = store.loaded_files();
        left.sort();
        assert_eq!(left, vec!["Assets/A.unity", "Assets/B.prefab"]);
    }

    #[test]
    fn flush_writes_dirty_buffers_and_clears_flag() {
        let dir = tempdir().unwrap();
        let mut store = make_store(dir.path());
        store.load("Assets/Main.unity").unwrap();
        let start = store.text("Assets/Main.unity").unwrap().find(GUID_A).unwrap();
        store
            .commit_edit("Assets/Main.unity", start..start + 32, GUID_B)
            .unwrap();

        let written = store.flush().unwrap();
        assert_eq!(written, vec!["Assets/Main.unity".to_string()]);
        assert!(!store.is_dirty("Assets/Main.unity"));

        let on_disk = fs::read_to_string(dir.path().join("Assets/Main.unity")).unwrap();
        assert!(on_disk.contains(GUID_B));
    }

    #[test]
    fn flush_without_edits_writes_nothing() {
        let dir = tempdir().unwrap();
        let mut store = make_store(dir.path());
        store.force_load_all();
        assert!(store.flush().unwrap().is_empty());
    }

    #[test]
    fn selection_roundtrip() {
        let dir = tempdir().unwrap();
        let mut store = make_store(dir.path());
        assert!(store.selection().is_none());

        store.select(Some(Selection {
            path: "Assets/Main.unity".to_string(),
            anchor: 200,
        }));
        assert_eq!(store.selection().map(|s| s.anchor), Some(200));

        store.select(None);
        assert!(store.selection().is_none());
    }
}
