//! Project object enumeration: every serialized container that could hold a
//! script reference, including containers whose reference is broken.

use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};

use crate::serialized::{self, Document, FileId, ScriptSlot, MONO_BEHAVIOUR_CLASS};
use crate::store::{LoadStats, ProjectStore, Selection};

/// Which kind of serialized container holds the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ContainerKind {
    /// Attached to a game object.
    Behaviour,
    /// Freestanding data object.
    Data,
}

impl ContainerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerKind::Behaviour => "behaviour",
            ContainerKind::Data => "data",
        }
    }
}

/// One serialized container: a script-backed document in one file.
#[derive(Debug, Clone)]
pub struct Container {
    /// Project-relative file path.
    pub path: String,
    /// Document anchor within the file.
    pub anchor: FileId,
    pub kind: ContainerKind,
    doc: Document,
}

impl Container {
    /// Raw slot access: the serialized script-identity slot as currently
    /// present in `text`. Extraction is by text inspection, so a dangling
    /// GUID reads exactly like a healthy one. `None` means the document
    /// lost its `m_Script` field entirely.
    pub fn slot(&self, text: &str) -> Option<ScriptSlot> {
        serialized::script_slot(text, &self.doc)
    }
}

/// RAII guard over the store's selection: snapshots on creation, restores on
/// drop. Early returns and unwinds restore too.
pub struct SelectionScope<'s> {
    store: &'s mut ProjectStore,
    saved: Option<Selection>,
}

impl<'s> SelectionScope<'s> {
    pub fn new(store: &'s mut ProjectStore) -> Self {
        let saved = store.selection().cloned();
        Self { store, saved }
    }

    pub fn store(&mut self) -> &mut ProjectStore {
        self.store
    }
}

impl Drop for SelectionScope<'_> {
    fn drop(&mut self) {
        self.store.select(self.saved.take());
    }
}

/// Lazy, finite, non-restartable walk over every container in the store.
///
/// Construction force-loads all persisted container files (a documented side
/// effect); enumeration then covers those plus every buffer that was already
/// loaded. Composite `.asset` files are walked structurally, depth-first
/// over same-file references, before orphan documents are appended, so
/// nested data containers surface in reference order.
///
/// The store's selection is parked on each container as it is produced and
/// restored when the iterator is dropped, finished or not.
pub struct Containers<'s> {
    scope: SelectionScope<'s>,
    pending_files: VecDeque<String>,
    pending_containers: VecDeque<Container>,
    pub load_stats: LoadStats,
}

impl<'s> Containers<'s> {
    pub fn new(store: &'s mut ProjectStore) -> Self {
        let mut scope = SelectionScope::new(store);
        let load_stats = scope.store().force_load_all();
        let pending_files: VecDeque<String> = scope.store().loaded_files().into();
        Self {
            scope,
            pending_files,
            pending_containers: VecDeque::new(),
            load_stats,
        }
    }
}

impl Iterator for Containers<'_> {
    type Item = (Container, ScriptSlot);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(container) = self.pending_containers.pop_front() {
                let store = self.scope.store();
                store.select(Some(Selection {
                    path: container.path.clone(),
                    anchor: container.anchor,
                }));
                // Malformed documents drop out here without aborting the walk.
                let Some(text) = store.text(&container.path) else {
                    continue;
                };
                let Some(slot) = container.slot(text) else {
                    continue;
                };
                return Some((container, slot));
            }

            let rel = self.pending_files.pop_front()?;
            self.pending_containers = containers_in_file(self.scope.store(), &rel).into();
        }
    }
}

fn containers_in_file(store: &ProjectStore, rel: &str) -> Vec<Container> {
    let Some(text) = store.text(rel) else {
        return Vec::new();
    };

    let docs = serialized::parse_documents(text);
    let order = if rel.ends_with(".asset") {
        structural_order(text, &docs)
    } else {
        (0..docs.len()).collect()
    };

    let mut out = Vec::new();
    for idx in order {
        let doc = &docs[idx];
        if doc.class_id != MONO_BEHAVIOUR_CLASS {
            continue;
        }
        if serialized::script_slot(text, doc).is_none() {
            continue;
        }
        let kind = if serialized::attached_to_game_object(text, doc) {
            ContainerKind::Behaviour
        } else {
            ContainerKind::Data
        };
        out.push(Container {
            path: rel.to_string(),
            anchor: doc.file_id,
            kind,
            doc: doc.clone(),
        });
    }
    out
}

/// Depth-first structural order over a composite asset: start from the main
/// asset document, follow same-file references with a visited guard, then
/// append unreachable documents so enumeration stays complete.
fn structural_order(text: &str, docs: &[Document]) -> Vec<usize> {
    // Unity's main-asset anchor for script-backed assets.
    const MAIN_ASSET: FileId = 11400000;

    let index: HashMap<FileId, usize> = docs
        .iter()
        .enumerate()
        .map(|(i, d)| (d.file_id, i))
        .collect();

    let mut order = Vec::with_capacity(docs.len());
    let Some(first) = docs.first() else {
        return order;
    };
    let start = if index.contains_key(&MAIN_ASSET) {
        MAIN_ASSET
    } else {
        first.file_id
    };

    let mut visited: HashSet<FileId> = HashSet::new();
    let mut stack = vec![start];
    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        let Some(&i) = index.get(&id) else {
            continue;
        };
        order.push(i);
        // Reversed so the first reference is descended into first.
        for r in serialized::local_refs(text, &docs[i]).into_iter().rev() {
            if !visited.contains(&r) {
                stack.push(r);
            }
        }
    }

    for (i, doc) in docs.iter().enumerate() {
        if !visited.contains(&doc.file_id) {
            order.push(i);
        }
    }
    order
}
