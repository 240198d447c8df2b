//! Script asset discovery and category classification.
//!
//! A script's category decides which containers may legally reference it:
//! `MonoBehaviour` descendants live on game objects, `ScriptableObject`
//! descendants are freestanding data. Classification chases base chains
//! across the project's own sources; anything that never reaches a known
//! root stays `Unresolved`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

use crate::guid::ScriptGuid;
use crate::project::{walk_asset_files, Project};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScriptCategory {
    /// Transitively derives from `MonoBehaviour`.
    Behaviour,
    /// Transitively derives from `ScriptableObject`.
    DataAsset,
    /// Source missing, unreadable, or the base chain never reaches a root.
    Unresolved,
}

impl ScriptCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptCategory::Behaviour => "behaviour",
            ScriptCategory::DataAsset => "dataAsset",
            ScriptCategory::Unresolved => "unresolved",
        }
    }
}

/// Stable handle to one script asset. Identity is the GUID; path and type
/// name are presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptIdentifier {
    pub guid: ScriptGuid,
    /// Project-relative path of the `.cs` file.
    pub path: String,
    /// Namespace-qualified class name, when one could be parsed.
    pub type_name: Option<String>,
    pub category: ScriptCategory,
}

/// Counters for inputs a scan had to skip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanDiagnostics {
    /// `.cs` files without a parseable sibling `.cs.meta`.
    pub missing_meta: usize,
    /// Source files that could not be read.
    pub unreadable: usize,
}

#[derive(Debug, Deserialize)]
struct MetaFile {
    guid: String,
}

#[derive(Debug, Clone)]
struct ClassDecl {
    name: String,
    qualified: String,
    bases: Vec<String>,
}

/// Collect every script asset under the project's assets root and classify
/// each one from source.
pub fn collect_scripts(project: &Project) -> (Vec<ScriptIdentifier>, ScanDiagnostics) {
    let files = walk_asset_files(project, &["cs"]);
    let mut diagnostics = ScanDiagnostics::default();

    // First pass gathers class declarations project-wide so base chains can
    // cross files.
    let mut sources: Vec<(ScriptGuid, String, Vec<ClassDecl>, String)> = Vec::new();
    let mut class_map: BTreeMap<String, ClassDecl> = BTreeMap::new();

    for path in files {
        let meta_path = path.with_extension("cs.meta");
        let Ok(meta_raw) = std::fs::read_to_string(&meta_path) else {
            diagnostics.missing_meta += 1;
            continue;
        };
        let Ok(meta) = serde_yml::from_str::<MetaFile>(&meta_raw) else {
            diagnostics.missing_meta += 1;
            continue;
        };
        let Ok(guid) = ScriptGuid::parse(&meta.guid) else {
            diagnostics.missing_meta += 1;
            continue;
        };
        let Ok(source) = std::fs::read_to_string(&path) else {
            diagnostics.unreadable += 1;
            continue;
        };

        let classes = parse_classes(&source);
        for class in &classes {
            class_map
                .entry(class.name.clone())
                .or_insert_with(|| class.clone());
        }

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        sources.push((guid, project.relative(&path), classes, stem));
    }

    let mut scripts = Vec::with_capacity(sources.len());
    for (guid, rel, classes, stem) in sources {
        // Unity binds the class whose name matches the file stem.
        let bound = classes.iter().find(|c| c.name == stem).or(classes.first());
        let (type_name, category) = match bound {
            Some(class) => {
                let mut visited = HashSet::new();
                (
                    Some(class.qualified.clone()),
                    categorize(&class.name, &class_map, &mut visited),
                )
            }
            None => (None, ScriptCategory::Unresolved),
        };
        scripts.push(ScriptIdentifier {
            guid,
            path: rel,
            type_name,
            category,
        });
    }

    (scripts, diagnostics)
}

// ============================================================================
// Source parsing
// ============================================================================

fn namespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"namespace\s+([A-Za-z_][\w.]*)").unwrap())
}

fn class_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)\bclass\s+([A-Za-z_]\w*)\s*(<[^>]*>)?\s*(?::\s*([^{]*?))?\s*\{").unwrap()
    })
}

fn parse_classes(source: &str) -> Vec<ClassDecl> {
    let namespace = namespace_re()
        .captures(source)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());

    let mut classes = Vec::new();
    for caps in class_re().captures_iter(source) {
        let Some(name_m) = caps.get(1) else { continue };
        let name = name_m.as_str().to_string();

        let bases = caps
            .get(3)
            .map(|m| parse_base_list(m.as_str()))
            .unwrap_or_default();

        let qualified = match &namespace {
            Some(ns) => format!("{}.{}", ns, name),
            None => name.clone(),
        };

        classes.push(ClassDecl {
            name,
            qualified,
            bases,
        });
    }
    classes
}

/// Split a base-type list on top-level commas, then reduce each entry to a
/// bare class name (`UnityEngine.MonoBehaviour` -> `MonoBehaviour`).
fn parse_base_list(raw: &str) -> Vec<String> {
    let raw = raw.split(" where ").next().unwrap_or(raw);

    let mut entries = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for ch in raw.chars() {
        match ch {
            '<' => {
                depth += 1;
                current.push(ch);
            }
            '>' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if depth == 0 => {
                entries.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    entries.push(current);

    entries
        .iter()
        .filter_map(|e| {
            let e = e.trim().trim_start_matches("global::");
            let e = e.split('<').next().unwrap_or(e).trim();
            let simple = e.rsplit('.').next().unwrap_or(e);
            if simple.is_empty() || !simple.chars().all(|c| c.is_alphanumeric() || c == '_') {
                None
            } else {
                Some(simple.to_string())
            }
        })
        .collect()
}

/// Chase the base chain to a known root. The visited set guards against
/// inheritance cycles in malformed sources.
fn categorize(
    name: &str,
    classes: &BTreeMap<String, ClassDecl>,
    visited: &mut HashSet<String>,
) -> ScriptCategory {
    if name == "MonoBehaviour" {
        return ScriptCategory::Behaviour;
    }
    if name == "ScriptableObject" {
        return ScriptCategory::DataAsset;
    }
    if !visited.insert(name.to_string()) {
        return ScriptCategory::Unresolved;
    }
    let Some(decl) = classes.get(name) else {
        return ScriptCategory::Unresolved;
    };
    for base in &decl.bases {
        match categorize(base, classes, visited) {
            ScriptCategory::Unresolved => continue,
            resolved => return resolved,
        }
    }
    ScriptCategory::Unresolved
}
