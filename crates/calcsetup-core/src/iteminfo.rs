//! Custom properties embedded in a grade item's free-text `iteminfo`.
//!
//! Properties live in a single JSON object wrapped in marker tags:
//!
//! ```text
//! Free-form notes.{{gradereportcalcsetup}}{"rule":"achievement"}{{/gradereportcalcsetup}}
//! ```
//!
//! Text outside the markers belongs to whoever else edits the field and is
//! preserved byte for byte.

use serde_json::{Map, Value};

pub const OPEN_MARKER: &str = "{{gradereportcalcsetup}}";
pub const CLOSE_MARKER: &str = "{{/gradereportcalcsetup}}";

/// Errors raised when writing into an `iteminfo` text.
#[derive(Debug, thiserror::Error)]
pub enum ItemInfoError {
    #[error("iteminfo contains more than one property block")]
    MultipleBlocks,

    #[error("iteminfo contains an unterminated property block")]
    Unterminated,

    #[error("iteminfo notes cannot contain property block markers")]
    MarkerInNotes,

    #[error("failed to encode iteminfo properties: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Byte offsets of a located block.
struct Block {
    start: usize,
    content_start: usize,
    content_end: usize,
    end: usize,
}

fn locate(text: &str) -> Result<Option<Block>, ItemInfoError> {
    let opens = text.matches(OPEN_MARKER).count();
    let closes = text.matches(CLOSE_MARKER).count();
    if opens > 1 || closes > 1 {
        return Err(ItemInfoError::MultipleBlocks);
    }
    match (text.find(OPEN_MARKER), text.find(CLOSE_MARKER)) {
        (None, None) => Ok(None),
        (Some(start), Some(close)) if close > start => Ok(Some(Block {
            start,
            content_start: start + OPEN_MARKER.len(),
            content_end: close,
            end: close + CLOSE_MARKER.len(),
        })),
        _ => Err(ItemInfoError::Unterminated),
    }
}

/// Both markers start with `{{`, which compact JSON only produces inside
/// strings, so escaping the second brace keeps values from closing the block.
fn encode(map: &Map<String, Value>) -> Result<String, ItemInfoError> {
    let json = serde_json::to_string(map)?.replace("{{", "{\\u007b");
    Ok(format!("{OPEN_MARKER}{json}{CLOSE_MARKER}"))
}

/// Decodes the property block, if there is exactly one well-formed block
/// holding a JSON object. Never fails.
pub fn extract(text: &str) -> Option<Map<String, Value>> {
    let block = locate(text).ok()??;
    match serde_json::from_str::<Value>(&text[block.content_start..block.content_end]) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Sets `property` inside the block, creating the block at the end of the
/// text if there is none. A malformed block is replaced by a fresh object.
pub fn insert(text: &str, property: &str, value: Value) -> Result<String, ItemInfoError> {
    match locate(text)? {
        None => {
            let mut map = Map::new();
            map.insert(property.to_owned(), value);
            Ok(format!("{text}{}", encode(&map)?))
        }
        Some(block) => {
            let mut map = match serde_json::from_str::<Value>(
                &text[block.content_start..block.content_end],
            ) {
                Ok(Value::Object(map)) => map,
                _ => Map::new(),
            };
            map.insert(property.to_owned(), value);
            Ok(format!(
                "{}{}{}",
                &text[..block.start],
                encode(&map)?,
                &text[block.end..]
            ))
        }
    }
}

/// The text outside the property block. Text without a single well-formed
/// block is returned whole.
pub fn notes(text: &str) -> String {
    match locate(text) {
        Ok(Some(block)) => format!("{}{}", &text[..block.start], &text[block.end..]),
        _ => text.to_owned(),
    }
}

/// Replaces the free text around the property block with `notes`, keeping
/// the block itself after them.
pub fn replace_notes(text: &str, notes: &str) -> Result<String, ItemInfoError> {
    if notes.contains(OPEN_MARKER) || notes.contains(CLOSE_MARKER) {
        return Err(ItemInfoError::MarkerInNotes);
    }
    Ok(match locate(text)? {
        Some(block) => format!("{notes}{}", &text[block.start..block.end]),
        None => notes.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn insert_into_plain_text_appends_block() {
        let out = insert("Some notes", "rule", json!("achievement")).unwrap();
        assert_eq!(
            out,
            r#"Some notes{{gradereportcalcsetup}}{"rule":"achievement"}{{/gradereportcalcsetup}}"#
        );
        assert_eq!(extract(&out).unwrap()["rule"], json!("achievement"));
    }

    #[test]
    fn insert_preserves_surrounding_text() {
        let text = r#"before{{gradereportcalcsetup}}{"rule":"x"}{{/gradereportcalcsetup}}after"#;
        let out = insert(text, "itemgroup", json!("a")).unwrap();
        assert!(out.starts_with("before{{gradereportcalcsetup}}"));
        assert!(out.ends_with("{{/gradereportcalcsetup}}after"));
        let map = extract(&out).unwrap();
        assert_eq!(map["rule"], json!("x"));
        assert_eq!(map["itemgroup"], json!("a"));
    }

    #[test]
    fn insert_overwrites_existing_key() {
        let first = insert("", "rule", json!("a")).unwrap();
        let second = insert(&first, "rule", json!("b")).unwrap();
        assert_eq!(extract(&second).unwrap()["rule"], json!("b"));
        assert_eq!(second.matches(OPEN_MARKER).count(), 1);
    }

    #[test]
    fn marker_text_in_values_round_trips() {
        let closing = "see {{/gradereportcalcsetup}} here";
        let opening = "{{{gradereportcalcsetup}}";
        let first = insert("notes", "p", json!(closing)).unwrap();
        let second = insert(&first, "q", json!(opening)).unwrap();
        assert_eq!(second.matches(OPEN_MARKER).count(), 1);
        assert_eq!(second.matches(CLOSE_MARKER).count(), 1);

        let map = extract(&second).unwrap();
        assert_eq!(map["p"], json!(closing));
        assert_eq!(map["q"], json!(opening));
        let third = insert(&second, "rule", json!("a")).unwrap();
        assert_eq!(extract(&third).unwrap()["p"], json!(closing));
    }

    #[test]
    fn replacing_notes_keeps_the_block() {
        let text = r#"old{{gradereportcalcsetup}}{"rule":"x"}{{/gradereportcalcsetup}} tail"#;
        assert_eq!(notes(text), "old tail");

        let out = replace_notes(text, "new notes").unwrap();
        assert_eq!(
            out,
            r#"new notes{{gradereportcalcsetup}}{"rule":"x"}{{/gradereportcalcsetup}}"#
        );
        assert_eq!(notes(&out), "new notes");
        assert_eq!(replace_notes("plain", "other").unwrap(), "other");
        assert!(matches!(
            replace_notes(text, "{{/gradereportcalcsetup}}"),
            Err(ItemInfoError::MarkerInNotes)
        ));
    }

    #[test]
    fn malformed_block_is_reset_on_write() {
        let text = "x{{gradereportcalcsetup}}{not json{{/gradereportcalcsetup}}y";
        assert!(extract(text).is_none());
        let out = insert(text, "rule", json!("a")).unwrap();
        assert_eq!(
            out,
            r#"x{{gradereportcalcsetup}}{"rule":"a"}{{/gradereportcalcsetup}}y"#
        );
    }

    #[test]
    fn non_object_block_extracts_none() {
        assert!(extract("{{gradereportcalcsetup}}[1,2]{{/gradereportcalcsetup}}").is_none());
        assert!(extract("no block here").is_none());
        assert!(extract("").is_none());
    }

    #[test]
    fn multiple_blocks_are_rejected() {
        let block = r#"{{gradereportcalcsetup}}{"a":1}{{/gradereportcalcsetup}}"#;
        let text = format!("{block}{block}");
        assert!(extract(&text).is_none());
        assert!(matches!(
            insert(&text, "b", json!(2)),
            Err(ItemInfoError::MultipleBlocks)
        ));
    }

    #[test]
    fn unterminated_block_is_rejected() {
        let text = r#"{{gradereportcalcsetup}}{"a":1}"#;
        assert!(extract(text).is_none());
        assert!(matches!(
            insert(text, "b", json!(2)),
            Err(ItemInfoError::Unterminated)
        ));
        let reversed = r#"{{/gradereportcalcsetup}}{"a":1}{{gradereportcalcsetup}}"#;
        assert!(matches!(
            insert(reversed, "b", json!(2)),
            Err(ItemInfoError::Unterminated)
        ));
    }
}
