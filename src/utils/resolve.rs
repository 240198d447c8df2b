//! Script identifier resolution for CLI arguments.
//!
//! Accepts a raw GUID, an asset path, or a type name and resolves it to a
//! script GUID against the tracked records. When nothing matches, generates
//! fuzzy suggestions so a mistyped name still points somewhere useful.

use crate::error::{Error, Result};
use crate::guid::ScriptGuid;
use crate::session::ScriptRecord;
use std::path::Path;

/// Resolve a user-supplied script identifier against tracked records.
///
/// Resolution order: raw 32-hex GUID, exact asset path, exact type name,
/// source file stem. A raw GUID resolves even when no record carries it:
/// deleted scripts are addressable only that way, and a replacement GUID
/// unknown to the index must still reach the rewrite pass to be refused
/// there.
pub fn resolve_script(input: &str, records: &[ScriptRecord]) -> Result<ScriptGuid> {
    if looks_like_guid(input) {
        return ScriptGuid::parse(input);
    }

    let path_input = input.replace('\\', "/");
    if let Some(record) = records.iter().find(|r| r.path == path_input) {
        return Ok(record.guid);
    }

    let by_type: Vec<&ScriptRecord> = records
        .iter()
        .filter(|r| r.type_name.as_deref() == Some(input))
        .collect();
    if let Some(guid) = single_match("type name", input, &by_type)? {
        return Ok(guid);
    }

    let by_stem: Vec<&ScriptRecord> = records
        .iter()
        .filter(|r| file_stem(&r.path) == Some(input))
        .collect();
    if let Some(guid) = single_match("file name", input, &by_stem)? {
        return Ok(guid);
    }

    let mut err = Error::script_not_found(input);
    if let Some(suggestion) = suggest(input, records) {
        err = err.with_hint(suggestion);
    }
    Err(err)
}

fn looks_like_guid(input: &str) -> bool {
    input.len() == 32 && input.chars().all(|c| c.is_ascii_hexdigit())
}

fn file_stem(path: &str) -> Option<&str> {
    Path::new(path).file_stem().and_then(|s| s.to_str())
}

/// Exactly one hit resolves; several force the caller to disambiguate.
fn single_match(
    kind: &str,
    input: &str,
    hits: &[&ScriptRecord],
) -> Result<Option<ScriptGuid>> {
    match hits {
        [] => Ok(None),
        [record] => Ok(Some(record.guid)),
        _ => {
            let mut hints: Vec<String> = hits
                .iter()
                .map(|r| format!("{}  {}", r.guid.simple(), r.path))
                .collect();
            hints.push("Use the GUID or the full asset path".to_string());
            Err(Error::validation_invalid_argument(
                "script",
                format!("{} '{}' matches {} scripts", kind, input, hits.len()),
                Some(input.to_string()),
                Some(hints),
            ))
        }
    }
}

/// Best fuzzy suggestion for an unmatched identifier, or None when nothing
/// is close enough to be worth proposing.
fn suggest(input: &str, records: &[ScriptRecord]) -> Option<String> {
    let input_lower = input.to_lowercase();
    let record = closest(&input_lower, records)?;
    let label = record
        .type_name
        .as_deref()
        .or_else(|| file_stem(&record.path))
        .unwrap_or(&record.path);
    Some(format!("Did you mean '{}' ({})?", label, record.path))
}

fn closest<'a>(input_lower: &str, records: &'a [ScriptRecord]) -> Option<&'a ScriptRecord> {
    // Prefix match first, then suffix, then edit distance.
    for record in records {
        if labels(record).any(|l| l.to_lowercase().starts_with(input_lower)) {
            return Some(record);
        }
    }
    for record in records {
        if labels(record).any(|l| l.to_lowercase().ends_with(input_lower)) {
            return Some(record);
        }
    }
    for record in records {
        let close = labels(record).any(|l| {
            let dist = levenshtein(input_lower, &l.to_lowercase());
            dist > 0 && dist <= 3
        });
        if close {
            return Some(record);
        }
    }
    None
}

fn labels(record: &ScriptRecord) -> impl Iterator<Item = &str> {
    record
        .type_name
        .as_deref()
        .into_iter()
        .chain(file_stem(&record.path))
}

/// Levenshtein distance with two rolling rows.
fn levenshtein(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut row = vec![0usize; b_chars.len() + 1];

    for (i, &ca) in a_chars.iter().enumerate() {
        row[0] = i + 1;
        for (j, &cb) in b_chars.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            row[j + 1] = (prev[j + 1] + 1).min(row[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut row);
    }

    prev[b_chars.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::ScriptCategory;
    use crate::ErrorCode;

    const GUID_MOVER: &str = "11111111111111111111111111111111";
    const GUID_HEALTH: &str = "22222222222222222222222222222222";
    const GUID_OTHER: &str = "33333333333333333333333333333333";

    fn record(guid: &str, path: &str, type_name: Option<&str>) -> ScriptRecord {
        ScriptRecord {
            guid: ScriptGuid::parse(guid).unwrap(),
            path: path.to_string(),
            type_name: type_name.map(|s| s.to_string()),
            category: ScriptCategory::Behaviour,
            first_seen: "2026-01-01T00:00:00+00:00".to_string(),
            missing_since: None,
        }
    }

    fn records() -> Vec<ScriptRecord> {
        vec![
            record(GUID_MOVER, "Assets/Scripts/PlayerMover.cs", Some("PlayerMover")),
            record(GUID_HEALTH, "Assets/Scripts/Health.cs", Some("Health")),
        ]
    }

    #[test]
    fn raw_guid_resolves_even_when_untracked() {
        let guid = resolve_script(GUID_OTHER, &records()).unwrap();
        assert_eq!(guid.simple(), GUID_OTHER);
    }

    #[test]
    fn exact_path_resolves() {
        let guid = resolve_script("Assets/Scripts/Health.cs", &records()).unwrap();
        assert_eq!(guid.simple(), GUID_HEALTH);
    }

    #[test]
    fn backslash_path_is_normalized() {
        let guid = resolve_script("Assets\\Scripts\\Health.cs", &records()).unwrap();
        assert_eq!(guid.simple(), GUID_HEALTH);
    }

    #[test]
    fn type_name_resolves() {
        let guid = resolve_script("PlayerMover", &records()).unwrap();
        assert_eq!(guid.simple(), GUID_MOVER);
    }

    #[test]
    fn file_stem_resolves_when_type_name_is_absent() {
        let recs = vec![record(GUID_MOVER, "Assets/Untyped.cs", None)];
        let guid = resolve_script("Untyped", &recs).unwrap();
        assert_eq!(guid.simple(), GUID_MOVER);
    }

    #[test]
    fn duplicate_type_name_is_ambiguous() {
        let recs = vec![
            record(GUID_MOVER, "Assets/A/Mover.cs", Some("Mover")),
            record(GUID_HEALTH, "Assets/B/Mover.cs", Some("Mover")),
        ];
        let err = resolve_script("Mover", &recs).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationInvalidArgument);
        let tried: Vec<String> = err.details["tried"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect();
        assert!(tried.iter().any(|t| t.contains("Assets/A/Mover.cs")));
        assert!(tried.iter().any(|t| t.contains("Assets/B/Mover.cs")));
    }

    #[test]
    fn near_miss_suggests_the_closest_script() {
        let err = resolve_script("PlayerMovr", &records()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ScriptNotFound);
        assert!(err
            .hints
            .iter()
            .any(|h| h.message.contains("Did you mean 'PlayerMover'")));
    }

    #[test]
    fn far_miss_gets_no_suggestion() {
        let err = resolve_script("Zzzzzzzzzzz", &records()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ScriptNotFound);
        assert!(!err.hints.iter().any(|h| h.message.contains("Did you mean")));
    }

    #[test]
    fn levenshtein_distances() {
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("hello", "hello"), 0);
    }
}
