//! The reference locator & rewriter: one blocking pass over the store.
//!
//! Consumes the enumeration, applies the replacement map where categories
//! agree, refuses everything else, compacts, and reports. Each repoint is a
//! single committed span edit, so an interrupted pass leaves applied
//! repoints in place and nothing half-written; a completed pass re-run with
//! the same map finds no remaining matches.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::guid::ScriptGuid;
use crate::rewrite::enumerate::{ContainerKind, Containers};
use crate::script::ScriptCategory;
use crate::serialized::{FileId, ScriptSlot};
use crate::session::Session;
use crate::store::ProjectStore;

/// Replacement map: old script GUID -> new script GUID.
///
/// Construction enforces the preconditions, so a built map is always valid:
/// keys are unique, no entry maps a script to itself, and the empty map is a
/// legal no-op.
#[derive(Debug, Clone, Default)]
pub struct ReplacementMap {
    entries: BTreeMap<ScriptGuid, ScriptGuid>,
}

impl ReplacementMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, old: ScriptGuid, new: ScriptGuid) -> Result<()> {
        if old == new {
            return Err(Error::map_invalid_entry(
                old.simple(),
                "old and new script are the same",
            ));
        }
        if self.entries.contains_key(&old) {
            return Err(Error::map_duplicate_key(old.simple()));
        }
        self.entries.insert(old, new);
        Ok(())
    }

    pub fn get(&self, old: ScriptGuid) -> Option<ScriptGuid> {
        self.entries.get(&old).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ScriptGuid, ScriptGuid)> + '_ {
        self.entries.iter().map(|(k, v)| (*k, *v))
    }
}

/// Per-object result of one mapped container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RewriteOutcome {
    Applied,
    SkippedNoMapping,
    SkippedIncompatibleCategory,
}

/// One refused repoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteFailure {
    pub file: String,
    pub anchor: FileId,
    pub guid: String,
    pub replacement: String,
    pub required: ContainerKind,
    pub found: ScriptCategory,
    pub reason: String,
}

/// Aggregated result of one rewrite pass.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteReport {
    pub replaced: usize,
    pub failed: usize,
    pub failures: Vec<RewriteFailure>,
    pub files_loaded: usize,
    pub files_skipped: usize,
    pub containers: usize,
    pub compacted: usize,
    pub summary: String,
}

/// Exhaustive compatibility rule. No coercion across categories; an
/// unresolved replacement never passes.
fn compatible(kind: ContainerKind, category: ScriptCategory) -> bool {
    match (kind, category) {
        (ContainerKind::Behaviour, ScriptCategory::Behaviour) => true,
        (ContainerKind::Data, ScriptCategory::DataAsset) => true,
        (ContainerKind::Behaviour, ScriptCategory::DataAsset) => false,
        (ContainerKind::Data, ScriptCategory::Behaviour) => false,
        (ContainerKind::Behaviour, ScriptCategory::Unresolved) => false,
        (ContainerKind::Data, ScriptCategory::Unresolved) => false,
    }
}

/// Run one full rewrite pass: load and enumerate every container, apply the
/// map where the replacement's category matches the container, compact the
/// store, report.
///
/// Phases run strictly in sequence inside this one blocking call; compaction
/// never interleaves with pending repoints. The pass as a whole is not
/// transactional.
pub fn rewrite_all(
    store: &mut ProjectStore,
    session: &Session,
    map: &ReplacementMap,
) -> Result<RewriteReport> {
    crate::log_status!("rewrite", "Enumerating containers");
    let (pairs, load_stats) = {
        let en = Containers::new(store);
        let load_stats = en.load_stats;
        let pairs: Vec<_> = en.collect();
        (pairs, load_stats)
    };
    crate::log_status!(
        "rewrite",
        "Loaded {} files, {} containers",
        load_stats.loaded,
        pairs.len()
    );

    let containers = pairs.len();
    let mut replaced = 0usize;
    let mut failed = 0usize;
    let mut failures = Vec::new();

    for (container, slot) in pairs {
        // A null slot holds nothing to repoint; it lands in neither tally.
        let ScriptSlot::Ref { guid, span } = slot else {
            continue;
        };

        let outcome = match map.get(guid) {
            None => RewriteOutcome::SkippedNoMapping,
            Some(new_guid) => {
                let found = session.category_of(new_guid);
                if compatible(container.kind, found) {
                    store.commit_edit(&container.path, span, &new_guid.simple())?;
                    RewriteOutcome::Applied
                } else {
                    failures.push(RewriteFailure {
                        file: container.path.clone(),
                        anchor: container.anchor,
                        guid: guid.simple(),
                        replacement: new_guid.simple(),
                        required: container.kind,
                        found,
                        reason: match found {
                            ScriptCategory::Unresolved => {
                                "replacement script is unresolved".to_string()
                            }
                            _ => format!(
                                "{} container cannot take a {} script",
                                container.kind.as_str(),
                                found.as_str()
                            ),
                        },
                    });
                    RewriteOutcome::SkippedIncompatibleCategory
                }
            }
        };

        match outcome {
            RewriteOutcome::Applied => replaced += 1,
            RewriteOutcome::SkippedNoMapping => {}
            RewriteOutcome::SkippedIncompatibleCategory => failed += 1,
        }
    }

    crate::log_status!("rewrite", "Compacting store");
    let compacted = store.compact();

    let summary = format!(
        "Script replacement complete: {} replaced, {} invalid objects",
        replaced, failed
    );
    crate::log_status!("rewrite", "{}", summary);

    Ok(RewriteReport {
        replaced,
        failed,
        failures,
        files_loaded: load_stats.loaded,
        files_skipped: load_stats.skipped,
        containers,
        compacted,
        summary,
    })
}
