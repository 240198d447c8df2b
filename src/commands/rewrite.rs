use clap::Args;
use serde::Serialize;

use repoint::project::Project;
use repoint::resolve::resolve_script;
use repoint::rewrite::{rewrite_all, ReplacementMap, RewriteFailure};
use repoint::script::collect_scripts;
use repoint::session::{ScriptRecord, Session};
use repoint::store::ProjectStore;

use crate::commands::{read_json_spec_to_string, CmdResult};

#[derive(Args)]
pub struct RewriteArgs {
    /// Replacement entry OLD=NEW; each side is a GUID, asset path, or type
    /// name. Repeatable.
    #[arg(long = "map", value_name = "OLD=NEW")]
    map: Vec<String>,

    /// Replacement map as a JSON object (supports @file and - for stdin)
    #[arg(long, value_name = "JSON")]
    json: Option<String>,

    /// Apply changes to disk (default is dry-run)
    #[arg(long)]
    write: bool,

    /// Project root (default: current directory)
    #[arg(long)]
    project_root: Option<String>,

    /// Asset directory relative to the project root (overrides repoint.json)
    #[arg(long)]
    assets_root: Option<String>,
}

#[derive(Serialize)]
#[serde(tag = "command")]
pub enum RewriteOutput {
    #[serde(rename = "rewrite")]
    Rewrite {
        project_root: String,
        dry_run: bool,
        map_entries: usize,
        containers: usize,
        replaced: usize,
        failed: usize,
        failures: Vec<RewriteFailure>,
        files_loaded: usize,
        files_skipped: usize,
        compacted: usize,
        files_written: Vec<String>,
        summary: String,
    },
}

pub fn run(args: RewriteArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<RewriteOutput> {
    if args.map.is_empty() && args.json.is_none() {
        return Err(repoint::Error::validation_missing_argument(vec![
            "--map".to_string(),
            "--json".to_string(),
        ]));
    }

    let root = args.project_root.as_deref().unwrap_or(".");
    let project = Project::open(root, args.assets_root.as_deref())?;
    let mut session = Session::load_or_default(&project.root)?;

    // Classify against the live project so the map resolves and the
    // category oracle answers from current state.
    let (scripts, _) = collect_scripts(&project);
    session.update(&scripts);

    let records: Vec<ScriptRecord> = session
        .data
        .known
        .iter()
        .chain(session.data.missing.iter())
        .chain(session.data.ignored.iter())
        .cloned()
        .collect();

    let mut pairs: Vec<(String, String)> = Vec::new();
    for entry in &args.map {
        pairs.push(parse_map_flag(entry)?);
    }
    if let Some(spec) = args.json.as_deref() {
        let raw = read_json_spec_to_string(spec)?;
        pairs.extend(parse_map_spec(&raw)?);
    }

    let mut map = ReplacementMap::new();
    for (old, new) in &pairs {
        let old_guid = resolve_script(old, &records)?;
        let new_guid = resolve_script(new, &records)?;
        map.insert(old_guid, new_guid)?;
    }

    let mut store = ProjectStore::open(project.clone());
    let report = rewrite_all(&mut store, &session, &map)?;

    let files_written = if args.write {
        let written = store.flush()?;
        session.save()?;
        written
    } else {
        Vec::new()
    };

    let exit_code = if report.failed > 0 { 1 } else { 0 };

    Ok((
        RewriteOutput::Rewrite {
            project_root: project.root.display().to_string(),
            dry_run: !args.write,
            map_entries: map.len(),
            containers: report.containers,
            replaced: report.replaced,
            failed: report.failed,
            failures: report.failures,
            files_loaded: report.files_loaded,
            files_skipped: report.files_skipped,
            compacted: report.compacted,
            files_written,
            summary: report.summary,
        },
        exit_code,
    ))
}

/// Split one `--map OLD=NEW` flag.
fn parse_map_flag(entry: &str) -> repoint::Result<(String, String)> {
    let Some((old, new)) = entry.split_once('=') else {
        return Err(repoint::Error::map_invalid_entry(
            entry,
            "expected OLD=NEW",
        ));
    };
    let (old, new) = (old.trim(), new.trim());
    if old.is_empty() || new.is_empty() {
        return Err(repoint::Error::map_invalid_entry(
            entry,
            "expected OLD=NEW",
        ));
    }
    Ok((old.to_string(), new.to_string()))
}

/// Parse a JSON replacement map `{ "OLD": "NEW", ... }`.
fn parse_map_spec(raw: &str) -> repoint::Result<Vec<(String, String)>> {
    let value: serde_json::Value = serde_json::from_str(raw).map_err(|e| {
        repoint::Error::validation_invalid_json(
            e,
            Some("parse replacement map".to_string()),
            Some(raw.chars().take(200).collect::<String>()),
        )
    })?;

    let serde_json::Value::Object(entries) = value else {
        return Err(repoint::Error::map_invalid_entry(
            raw.chars().take(80).collect::<String>(),
            "replacement map must be a JSON object",
        ));
    };

    entries
        .into_iter()
        .map(|(old, new)| match new {
            serde_json::Value::String(new) => Ok((old, new)),
            _ => Err(repoint::Error::map_invalid_entry(
                old,
                "replacement must be a JSON string",
            )),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_flag_splits_on_first_equals() {
        let (old, new) = parse_map_flag("Foo=Bar").unwrap();
        assert_eq!(old, "Foo");
        assert_eq!(new, "Bar");
    }

    #[test]
    fn map_flag_without_equals_is_rejected() {
        let err = parse_map_flag("FooBar").unwrap_err();
        assert_eq!(err.code, repoint::ErrorCode::MapInvalidEntry);
    }

    #[test]
    fn map_flag_with_empty_side_is_rejected() {
        assert!(parse_map_flag("Foo=").is_err());
        assert!(parse_map_flag("=Bar").is_err());
    }

    #[test]
    fn map_spec_parses_object_of_strings() {
        let pairs = parse_map_spec(r#"{"Foo": "Bar", "Old": "New"}"#).unwrap();
        assert_eq!(pairs.len(), 2);
        assert!(pairs.contains(&("Foo".to_string(), "Bar".to_string())));
    }

    #[test]
    fn map_spec_rejects_non_object() {
        let err = parse_map_spec(r#"["Foo", "Bar"]"#).unwrap_err();
        assert_eq!(err.code, repoint::ErrorCode::MapInvalidEntry);
    }

    #[test]
    fn map_spec_rejects_non_string_value() {
        let err = parse_map_spec(r#"{"Foo": 3}"#).unwrap_err();
        assert_eq!(err.code, repoint::ErrorCode::MapInvalidEntry);
    }

    #[test]
    fn map_spec_rejects_malformed_json() {
        let err = parse_map_spec("{not json").unwrap_err();
        assert_eq!(err.code, repoint::ErrorCode::ValidationInvalidJson);
    }
}
