//! Structural JSON editor
//!
//! Works on the parsed document, so removing the last member of an object
//! can never leave a dangling separator. Member order is preserved and the
//! output keeps the source's indentation width, line endings, and final
//! newline. Untouched documents are returned verbatim. Documents with a
//! repeated key are rejected, since the parsed form would drop one of them.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::document::LineEnding;
use crate::edit::{EditOutcome, ManifestEdit, Strategy};
use crate::error::{Error, Result};

#[derive(Debug, Default)]
pub struct JsonEditor;

impl JsonEditor {
    pub fn new() -> Self {
        Self
    }

    pub fn apply(&self, source: &str, edit: &ManifestEdit) -> Result<EditOutcome> {
        let mut value: Value = serde_json::from_str(source)?;
        if !value.is_object() {
            return Err(Error::parse("JSON", "root must be an object"));
        }
        serde_json::from_str::<UniqueKeys>(source).map_err(|e| Error::parse("JSON", e.to_string()))?;

        let mut removed = Vec::new();
        prune(&mut value, edit, &mut removed);

        let mut inserted = Vec::new();
        let mut skipped = Vec::new();
        let mut placed: HashMap<String, usize> = HashMap::new();

        for ensure in &edit.ensure {
            if edit.is_denied(&ensure.line) {
                skipped.push(format!("{} (matches denylist)", ensure.line.trim()));
                continue;
            }
            let Some((key, entry)) = parse_member(&ensure.line) else {
                skipped.push(format!("{} (not a single JSON member)", ensure.line.trim()));
                continue;
            };
            let marker = marker_key(&ensure.after);
            let Some(pointer) = find_object(&value, &marker, String::new()) else {
                skipped.push(format!("{} (no object named '{}')", ensure.line.trim(), marker));
                continue;
            };
            let Some(target) = value.pointer_mut(&pointer).and_then(Value::as_object_mut) else {
                continue;
            };

            match target.get(&key) {
                Some(existing) if *existing == entry => continue,
                Some(_) => {
                    skipped.push(format!("{key} (present with a different value)"));
                    continue;
                }
                None => {}
            }

            let offset = placed.entry(pointer).or_insert(0);
            let rendered = format!("{}: {}", Value::String(key.clone()), entry);
            insert_at(target, *offset, key, entry);
            *offset += 1;
            inserted.push(rendered);
        }

        let changed = !removed.is_empty() || !inserted.is_empty();
        let rendered = if changed {
            render(&value, source)?
        } else {
            source.to_string()
        };

        let mut outcome = EditOutcome::new(rendered, Strategy::Structural, changed);
        outcome.removed = removed;
        outcome.inserted = inserted;
        outcome.skipped = skipped;
        Ok(outcome)
    }
}

/// Drop denied members and array strings, depth first.
///
/// A member is denied by its key, or by its value when the value is a
/// string. Container values are descended into instead.
/// Accepts any JSON document whose objects never repeat a key
struct UniqueKeys;

impl<'de> Deserialize<'de> for UniqueKeys {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(UniqueKeysVisitor)
    }
}

struct UniqueKeysVisitor;

impl<'de> Visitor<'de> for UniqueKeysVisitor {
    type Value = UniqueKeys;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON value")
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> std::result::Result<UniqueKeys, E> {
        Ok(UniqueKeys)
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> std::result::Result<UniqueKeys, E> {
        Ok(UniqueKeys)
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> std::result::Result<UniqueKeys, E> {
        Ok(UniqueKeys)
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> std::result::Result<UniqueKeys, E> {
        Ok(UniqueKeys)
    }

    fn visit_str<E: de::Error>(self, _: &str) -> std::result::Result<UniqueKeys, E> {
        Ok(UniqueKeys)
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<UniqueKeys, E> {
        Ok(UniqueKeys)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<UniqueKeys, A::Error> {
        while seq.next_element::<UniqueKeys>()?.is_some() {}
        Ok(UniqueKeys)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<UniqueKeys, A::Error> {
        let mut seen = HashSet::new();
        while let Some(key) = map.next_key::<String>()? {
            if !seen.insert(key.clone()) {
                return Err(de::Error::custom(format!("duplicate key '{key}'")));
            }
            map.next_value::<UniqueKeys>()?;
        }
        Ok(UniqueKeys)
    }
}

fn prune(value: &mut Value, edit: &ManifestEdit, removed: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, mut child) in std::mem::take(map) {
                let denied = edit.is_denied(&key) || child.as_str().is_some_and(|s| edit.is_denied(s));
                if denied {
                    removed.push(format!("{}: {}", Value::String(key), child));
                    continue;
                }
                prune(&mut child, edit, removed);
                map.insert(key, child);
            }
        }
        Value::Array(items) => {
            for mut item in std::mem::take(items) {
                if item.as_str().is_some_and(|s| edit.is_denied(s)) {
                    removed.push(item.to_string());
                    continue;
                }
                prune(&mut item, edit, removed);
                items.push(item);
            }
        }
        _ => {}
    }
}

/// Parse `"key": value,` into its key and value.
fn parse_member(line: &str) -> Option<(String, Value)> {
    let wrapped = format!("{{{}}}", line.trim().trim_end_matches(','));
    let map: Map<String, Value> = serde_json::from_str(&wrapped).ok()?;
    if map.len() != 1 {
        return None;
    }
    map.into_iter().next()
}

/// Member name referenced by a line marker such as `"dependencies": {`.
fn marker_key(marker: &str) -> String {
    let mut quoted = marker.split('"');
    match (quoted.next(), quoted.next(), quoted.next()) {
        (Some(_), Some(inner), Some(_)) => inner.to_string(),
        _ => marker
            .trim_matches(|c: char| c.is_whitespace() || matches!(c, '{' | '[' | ':'))
            .to_string(),
    }
}

/// JSON pointer of the first object-valued member named `key`, in
/// document order.
fn find_object(value: &Value, key: &str, pointer: String) -> Option<String> {
    match value {
        Value::Object(map) => {
            for (name, child) in map {
                let child_pointer = format!("{}/{}", pointer, escape_pointer(name));
                if name == key && child.is_object() {
                    return Some(child_pointer);
                }
                if let Some(found) = find_object(child, key, child_pointer) {
                    return Some(found);
                }
            }
            None
        }
        Value::Array(items) => items
            .iter()
            .enumerate()
            .find_map(|(idx, child)| find_object(child, key, format!("{pointer}/{idx}"))),
        _ => None,
    }
}

fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn insert_at(map: &mut Map<String, Value>, index: usize, key: String, value: Value) {
    let mut pending = Some((key, value));
    for (position, (k, v)) in std::mem::take(map).into_iter().enumerate() {
        if position == index
            && let Some((nk, nv)) = pending.take()
        {
            map.insert(nk, nv);
        }
        map.insert(k, v);
    }
    if let Some((nk, nv)) = pending {
        map.insert(nk, nv);
    }
}

fn detect_indent(source: &str) -> String {
    source
        .lines()
        .skip(1)
        .map(|l| {
            l.chars()
                .take_while(|c| *c == ' ' || *c == '\t')
                .collect::<String>()
        })
        .find(|indent| !indent.is_empty())
        .unwrap_or_else(|| "  ".to_string())
}

fn render(value: &Value, source: &str) -> Result<String> {
    let indent = detect_indent(source);
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;

    let mut text = String::from_utf8(buf).map_err(|e| Error::parse("JSON", e.to_string()))?;
    if source.ends_with('\n') {
        text.push('\n');
    }
    if LineEnding::detect(source) == LineEnding::CrLf {
        text = text.replace('\n', "\r\n");
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::EnsureLine;
    use pretty_assertions::assert_eq;

    fn edit(deny: &[&str], ensure: &[(&str, &str)]) -> ManifestEdit {
        ManifestEdit {
            denylist: deny.iter().map(|s| s.to_string()).collect(),
            ensure: ensure
                .iter()
                .map(|(line, after)| EnsureLine {
                    line: line.to_string(),
                    after: after.to_string(),
                })
                .collect(),
        }
    }

    const MANIFEST: &str = "{\n  \"dependencies\": {\n    \"com.keep\": \"1.0.0\",\n    \"com.drop\": \"2.0.0\",\n    \"com.last\": \"3.0.0\"\n  }\n}\n";

    #[test]
    fn removing_last_entry_leaves_valid_json() {
        let outcome = JsonEditor::new()
            .apply(MANIFEST, &edit(&["com.last"], &[]))
            .unwrap();
        assert_eq!(
            outcome.source,
            "{\n  \"dependencies\": {\n    \"com.keep\": \"1.0.0\",\n    \"com.drop\": \"2.0.0\"\n  }\n}\n"
        );
        assert!(serde_json::from_str::<Value>(&outcome.source).is_ok());
        assert_eq!(outcome.removed, vec!["\"com.last\": \"3.0.0\"".to_string()]);
    }

    #[test]
    fn unchanged_document_is_returned_verbatim() {
        let source = "{\"dependencies\":{\"com.keep\":\"1.0.0\"}}";
        let outcome = JsonEditor::new().apply(source, &edit(&["nothing"], &[])).unwrap();
        assert!(!outcome.changed());
        assert_eq!(outcome.source, source);
    }

    #[test]
    fn denied_values_and_array_items_are_removed() {
        let source = r#"{
    "dependencies": { "com.local": "file:../LibraryX", "com.ok": "1.0.0" },
    "scopedRegistries": [ { "scopes": ["com.ok", "LibraryX.extras"] } ]
}"#;
        let outcome = JsonEditor::new().apply(source, &edit(&["LibraryX"], &[])).unwrap();
        assert!(outcome.changed());
        assert!(!outcome.source.contains("LibraryX"));
        assert!(outcome.source.contains("com.ok"));
        assert!(outcome.source.starts_with("{\n    \"dependencies\""));
        assert_eq!(outcome.removed.len(), 2);
    }

    #[test]
    fn ensure_inserts_at_top_of_marker_object() {
        let outcome = JsonEditor::new()
            .apply(
                MANIFEST,
                &edit(
                    &[],
                    &[
                        ("\"com.a\": \"1.0.0\",", "\"dependencies\": {"),
                        ("\"com.b\": \"1.0.0\",", "\"dependencies\": {"),
                    ],
                ),
            )
            .unwrap();
        let parsed: Value = serde_json::from_str(&outcome.source).unwrap();
        let keys: Vec<&String> = parsed["dependencies"].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["com.a", "com.b", "com.keep", "com.drop", "com.last"]);

        let again = JsonEditor::new()
            .apply(
                &outcome.source,
                &edit(&[], &[("\"com.a\": \"1.0.0\",", "\"dependencies\": {")]),
            )
            .unwrap();
        assert!(!again.changed());
    }

    #[test]
    fn conflicting_ensure_value_is_left_alone() {
        let outcome = JsonEditor::new()
            .apply(MANIFEST, &edit(&[], &[("\"com.keep\": \"9.9.9\"", "dependencies")]))
            .unwrap();
        assert!(!outcome.changed());
        assert_eq!(outcome.skipped.len(), 1);
    }

    #[test]
    fn crlf_and_tab_indent_survive() {
        let source = "{\r\n\t\"dependencies\": {\r\n\t\t\"a\": \"1\",\r\n\t\t\"b\": \"2\"\r\n\t}\r\n}\r\n";
        let outcome = JsonEditor::new().apply(source, &edit(&["2"], &[])).unwrap();
        assert_eq!(
            outcome.source,
            "{\r\n\t\"dependencies\": {\r\n\t\t\"a\": \"1\"\r\n\t}\r\n}\r\n"
        );
    }

    #[test]
    fn repeated_keys_are_rejected() {
        let source = "{\"dependencies\": {\"a\": \"1\", \"b\": {\"x\": 1, \"x\": 2}}}";
        let err = JsonEditor::new().apply(source, &edit(&["a"], &[])).unwrap_err();
        assert!(err.to_string().contains("duplicate key 'x'"));
    }

    #[test]
    fn non_object_root_is_rejected() {
        assert!(JsonEditor::new().apply("[1, 2]", &edit(&["1"], &[])).is_err());
    }
}
