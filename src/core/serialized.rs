//! Raw-text model of Unity's serialized YAML files.
//!
//! Scenes, prefabs and `.asset` files are multi-document YAML. This module
//! never parses them structurally: document boundaries and script slots are
//! located in the raw text as byte spans, and edits swap fixed-width GUIDs in
//! place. Untouched bytes survive verbatim, and a document whose script GUID
//! no longer resolves looks exactly like a healthy one.

use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

use crate::guid::ScriptGuid;

/// Local object anchor within one serialized file (the `&12345` part of a
/// document header).
pub type FileId = i64;

/// Unity's serialized class for script-backed objects. ScriptableObject
/// instances use it too; both serialize as `!u!114`.
pub const MONO_BEHAVIOUR_CLASS: u32 = 114;

/// One `--- !u!<class> &<fileID>` document, located as a byte span into the
/// file text (header line inclusive, up to the next header or EOF).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub class_id: u32,
    pub file_id: FileId,
    pub stripped: bool,
    pub span: Range<usize>,
}

/// The serialized script-identity slot of one document: the raw
/// `m_Script: {fileID: ..., guid: ..., type: ...}` flow mapping, reduced to
/// what the rewriter needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptSlot {
    /// `{fileID: 0}`, or a slot that carries no guid. Nothing to repoint.
    Null,
    /// A guid-carrying reference, healthy or dangling alike. The span is the
    /// absolute byte range of the 32 hex digits in the file text.
    Ref { guid: ScriptGuid, span: Range<usize> },
}

impl ScriptSlot {
    pub fn guid(&self) -> Option<ScriptGuid> {
        match self {
            ScriptSlot::Null => None,
            ScriptSlot::Ref { guid, .. } => Some(*guid),
        }
    }
}

fn header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^--- !u!(\d+) &(-?\d+)( stripped)?\r?$").unwrap()
    })
}

fn script_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"m_Script:\s*\{fileID:\s*(-?\d+)(?:,\s*guid:\s*([0-9a-fA-F]{32}))?(?:,\s*type:\s*\d+)?\}",
        )
        .unwrap()
    })
}

fn game_object_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"m_GameObject:\s*\{fileID:\s*(-?\d+)\}").unwrap())
}

fn local_ref_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Guid-carrying refs have ", guid:" before the brace, so this matches
    // same-file references only.
    RE.get_or_init(|| Regex::new(r"\{fileID:\s*(-?\d+)\}").unwrap())
}

/// Split file text into its serialized documents. Anything before the first
/// header (the `%YAML`/`%TAG` prologue) belongs to no document.
pub fn parse_documents(text: &str) -> Vec<Document> {
    let mut headers: Vec<(usize, u32, FileId, bool)> = Vec::new();

    for caps in header_re().captures_iter(text) {
        let (Some(whole), Some(class_m), Some(id_m)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        let (Ok(class_id), Ok(file_id)) = (class_m.as_str().parse(), id_m.as_str().parse()) else {
            continue;
        };
        headers.push((whole.start(), class_id, file_id, caps.get(3).is_some()));
    }

    let mut docs = Vec::with_capacity(headers.len());
    for (i, &(start, class_id, file_id, stripped)) in headers.iter().enumerate() {
        let end = headers.get(i + 1).map(|h| h.0).unwrap_or(text.len());
        docs.push(Document {
            class_id,
            file_id,
            stripped,
            span: start..end,
        });
    }
    docs
}

/// Extract the script slot of a document by direct text inspection.
/// `None` means the document has no `m_Script` field at all.
pub fn script_slot(text: &str, doc: &Document) -> Option<ScriptSlot> {
    let body = &text[doc.span.clone()];
    let caps = script_re().captures(body)?;

    let file_id: i64 = caps.get(1)?.as_str().parse().ok()?;
    match caps.get(2) {
        Some(g) if file_id != 0 => {
            let guid = ScriptGuid::parse(g.as_str()).ok()?;
            let span = doc.span.start + g.start()..doc.span.start + g.end();
            Some(ScriptSlot::Ref { guid, span })
        }
        _ => Some(ScriptSlot::Null),
    }
}

/// Whether the document is attached to an entity (`m_GameObject` non-zero).
pub fn attached_to_game_object(text: &str, doc: &Document) -> bool {
    let body = &text[doc.span.clone()];
    game_object_re()
        .captures(body)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .map(|id| id != 0)
        .unwrap_or(false)
}

/// Same-file `{fileID: N}` references inside a document, for the structural
/// walk over composite assets. Null references are dropped.
pub fn local_refs(text: &str, doc: &Document) -> Vec<FileId> {
    let body = &text[doc.span.clone()];
    local_ref_re()
        .captures_iter(body)
        .filter_map(|c| c.get(1))
        .filter_map(|m| m.as_str().parse::<i64>().ok())
        .filter(|id| *id != 0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const GUID_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

    fn scene_text() -> String {
        format!(
            "%YAML 1.1\n\
             %TAG !u! tag:unity3d.com,2011:\n\
             --- !u!1 &100\n\
             GameObject:\n\
             \x20 m_Name: Player\n\
             --- !u!114 &200\n\
             MonoBehaviour:\n\
             \x20 m_GameObject: {{fileID: 100}}\n\
             \x20 m_Script: {{fileID: 11500000, guid: {GUID_A}, type: 3}}\n\
             \x20 m_Name:\n"
        )
    }

    #[test]
    fn parses_documents_with_prologue() {
        let text = scene_text();
        let docs = parse_documents(&text);
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].class_id, 1);
        assert_eq!(docs[0].file_id, 100);
        assert_eq!(docs[1].class_id, MONO_BEHAVIOUR_CLASS);
        assert_eq!(docs[1].file_id, 200);
        assert!(text[docs[1].span.clone()].starts_with("--- !u!114"));
        assert_eq!(docs[1].span.end, text.len());
    }

    #[test]
    fn parses_stripped_and_negative_anchor() {
        let text = "--- !u!114 &-4242 stripped\nMonoBehaviour:\n  m_Name:\n";
        let docs = parse_documents(text);
        assert_eq!(docs.len(), 1);
        assert!(docs[0].stripped);
        assert_eq!(docs[0].file_id, -4242);
    }

    #[test]
    fn script_slot_spans_the_guid_exactly() {
        let text = scene_text();
        let docs = parse_documents(&text);
        let slot = script_slot(&text, &docs[1]).unwrap();
        match slot {
            ScriptSlot::Ref { guid, span } => {
                assert_eq!(guid.simple(), GUID_A);
                assert_eq!(&text[span], GUID_A);
            }
            ScriptSlot::Null => panic!("expected a guid ref"),
        }
    }

    #[test]
    fn script_slot_null_when_file_id_zero() {
        let text = "--- !u!114 &7\nMonoBehaviour:\n  m_Script: {fileID: 0}\n  m_Name:\n";
        let docs = parse_documents(text);
        assert_eq!(script_slot(text, &docs[0]), Some(ScriptSlot::Null));
    }

    #[test]
    fn script_slot_none_without_field() {
        let text = scene_text();
        let docs = parse_documents(&text);
        assert_eq!(script_slot(&text, &docs[0]), None);
    }

    #[test]
    fn built_in_ref_without_guid_is_null() {
        let text = "--- !u!114 &7\nMonoBehaviour:\n  m_Script: {fileID: 61}\n";
        let docs = parse_documents(text);
        assert_eq!(script_slot(text, &docs[0]), Some(ScriptSlot::Null));
    }

    #[test]
    fn attachment_follows_game_object_ref() {
        let text = scene_text();
        let docs = parse_documents(&text);
        assert!(attached_to_game_object(&text, &docs[1]));

        let data = format!(
            "--- !u!114 &11400000\nMonoBehaviour:\n  m_GameObject: {{fileID: 0}}\n  m_Script: {{fileID: 11500000, guid: {GUID_A}, type: 3}}\n"
        );
        let docs = parse_documents(&data);
        assert!(!attached_to_game_object(&data, &docs[0]));
    }

    #[test]
    fn local_refs_skip_guid_refs_and_nulls() {
        let text = format!(
            "--- !u!114 &1\n\
             MonoBehaviour:\n\
             \x20 m_GameObject: {{fileID: 0}}\n\
             \x20 m_Script: {{fileID: 11500000, guid: {GUID_A}, type: 3}}\n\
             \x20 m_Child: {{fileID: 22}}\n\
             \x20 m_Other: {{fileID: 33}}\n"
        );
        let docs = parse_documents(&text);
        assert_eq!(local_refs(&text, &docs[0]), vec![22, 33]);
    }
}
