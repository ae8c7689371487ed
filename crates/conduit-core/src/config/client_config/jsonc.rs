//! JSONC (JSON with comments) serializer.
//!
//! Reading strips `//` and `/* */` comments and trailing commas before
//! handing the text to `serde_json`. Writing never re-serializes the whole
//! document: the managed subtree is located by byte offset and the new
//! changed entries are spliced in one by one, so comments and formatting
//! around untouched entries survive verbatim. Comments inside a rewritten
//! entry are dropped.

use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};

use super::json::to_pretty;
use super::{ConfigFormat, ConfigSerializer, extract_map_at_path, set_map_at_path, wrap_in_path};
use crate::error::{ConduitError, Result};

/// JSONC configuration file serializer.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsoncSerializer;

impl ConfigSerializer for JsoncSerializer {
    fn extract_section(
        &self,
        path: &Path,
        content: &str,
        key_path: &[&str],
    ) -> Result<Map<String, Value>> {
        let root = parse_root(&strip_jsonc(content))
            .map_err(|reason| ConduitError::invalid_config(path, reason))?;
        extract_map_at_path(path, &root, key_path)
    }

    fn render_section(
        &self,
        existing: Option<&str>,
        key_path: &[&str],
        section: &Map<String, Value>,
    ) -> Result<String> {
        let Some(original) = existing.filter(|text| !text.trim().is_empty()) else {
            return render_fresh(key_path, Value::Object(section.clone()));
        };

        let stripped = strip_jsonc(original);
        let mut root = match parse_root(&stripped) {
            Ok(root) => root,
            Err(reason) => {
                tracing::warn!(%reason, "Existing JSONC config is invalid, starting from empty");
                return render_fresh(key_path, Value::Object(section.clone()));
            }
        };

        let indent = detect_indent(original);
        if let Some(spliced) = splice_section(original, &stripped, key_path, section, &indent)? {
            return Ok(spliced);
        }

        tracing::warn!("Could not locate config section in JSONC text, rewriting document");
        set_map_at_path(&mut root, key_path, section.clone());
        to_pretty(&root)
    }

    fn format(&self) -> ConfigFormat {
        ConfigFormat::Jsonc
    }
}

/// Blank out comments and trailing commas, keeping every other byte at
/// its original offset.
pub fn strip_jsonc(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = bytes.to_vec();
    let len = bytes.len();
    let mut i = 0;
    let mut in_string = false;

    while i < len {
        let b = bytes[i];
        if in_string {
            match b {
                b'\\' => i += 2,
                b'"' => {
                    in_string = false;
                    i += 1;
                }
                _ => i += 1,
            }
            continue;
        }
        match b {
            b'"' => {
                in_string = true;
                i += 1;
            }
            b'/' if i + 1 < len && bytes[i + 1] == b'/' => {
                while i < len && bytes[i] != b'\n' {
                    out[i] = b' ';
                    i += 1;
                }
            }
            b'/' if i + 1 < len && bytes[i + 1] == b'*' => {
                out[i] = b' ';
                out[i + 1] = b' ';
                i += 2;
                while i < len && !(bytes[i] == b'*' && i + 1 < len && bytes[i + 1] == b'/') {
                    if bytes[i] != b'\n' {
                        out[i] = b' ';
                    }
                    i += 1;
                }
                if i < len {
                    out[i] = b' ';
                    out[i + 1] = b' ';
                    i += 2;
                }
            }
            _ => i += 1,
        }
    }

    remove_trailing_commas(&mut out);
    String::from_utf8_lossy(&out).into_owned()
}

fn remove_trailing_commas(bytes: &mut [u8]) {
    let len = bytes.len();
    let mut in_string = false;
    let mut i = 0;
    while i < len {
        let b = bytes[i];
        if in_string {
            match b {
                b'\\' => i += 1,
                b'"' => in_string = false,
                _ => {}
            }
        } else if b == b'"' {
            in_string = true;
        } else if b == b',' {
            let next = bytes[i + 1..]
                .iter()
                .find(|c| !c.is_ascii_whitespace())
                .copied();
            if matches!(next, Some(b'}') | Some(b']')) {
                bytes[i] = b' ';
            }
        }
        i += 1;
    }
}

fn parse_root(stripped: &str) -> std::result::Result<Map<String, Value>, String> {
    if stripped.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(stripped) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err("expected JSON object at root".to_string()),
        Err(e) => Err(format!("failed to parse JSONC: {}", e)),
    }
}

fn render_fresh(key_path: &[&str], value: Value) -> Result<String> {
    match wrap_in_path(key_path, value) {
        Value::Object(root) => to_pretty(&root),
        _ => Ok("{}\n".to_string()),
    }
}

/// Indentation unit of the document: the leading whitespace of the first
/// indented line, or two spaces.
fn detect_indent(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let trimmed = line.trim_start_matches([' ', '\t']);
            &line[..line.len() - trimmed.len()]
        })
        .find(|prefix| !prefix.is_empty())
        .map(|prefix| {
            if prefix.starts_with('\t') {
                "\t".to_string()
            } else {
                prefix.to_string()
            }
        })
        .unwrap_or_else(|| "  ".to_string())
}

/// Render `value` as the value of a member whose line starts with `base`.
/// The first line is not indented.
fn render_value(value: &Value, indent: &str, base: &str) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut serializer)
        .map_err(|e| ConduitError::Serialize {
            subject: "JSONC config".to_string(),
            reason: e.to_string(),
        })?;
    let text = String::from_utf8_lossy(&buf).into_owned();
    Ok(text.replace('\n', &format!("\n{}", base)))
}

/// Splice the new section into the original text.
///
/// Returns `Ok(None)` if the document structure could not be followed.
fn splice_section(
    original: &str,
    stripped: &str,
    key_path: &[&str],
    section: &Map<String, Value>,
    indent: &str,
) -> Result<Option<String>> {
    let scanner = Scanner::new(stripped.as_bytes());
    let mut object_start = scanner.skip_ws(0);

    for (idx, segment) in key_path.iter().enumerate() {
        let depth = idx + 1;
        let Some(object) = scanner.object(object_start) else {
            return Ok(None);
        };
        let remaining = &key_path[idx + 1..];
        let is_object = |member: &Member| scanner.byte(member.value_start) == Some(b'{');

        match object.members.iter().find(|member| member.key == *segment) {
            Some(member) if is_object(member) && !remaining.is_empty() => {
                object_start = member.value_start;
            }
            Some(member) if is_object(member) => {
                return merge_members(original, stripped, &scanner, member.value_start, section, indent);
            }
            Some(member) => {
                let replacement = wrap_in_path(remaining, Value::Object(section.clone()));
                let text = render_value(&replacement, indent, &indent.repeat(depth))?;
                return Ok(Some(splice(original, member.value_start, member.value_end, &text)));
            }
            None => {
                let replacement = wrap_in_path(remaining, Value::Object(section.clone()));
                let member_text = format!(
                    "{}: {}",
                    json_key(segment)?,
                    render_value(&replacement, indent, &indent.repeat(depth))?
                );
                let spliced = match object.members.last() {
                    Some(last) => splice(
                        original,
                        last.value_end,
                        last.value_end,
                        &format!(",\n{}{}", indent.repeat(depth), member_text),
                    ),
                    None => splice(
                        original,
                        object.open + 1,
                        object.open + 1,
                        &format!(
                            "\n{}{}\n{}",
                            indent.repeat(depth),
                            member_text,
                            indent.repeat(depth - 1)
                        ),
                    ),
                };
                return Ok(Some(spliced));
            }
        }
    }
    Ok(None)
}

/// Apply `section` to the object at `open` one member at a time.
///
/// Members whose value is unchanged are left byte-for-byte as they are,
/// together with the comments around them. Changed values are replaced in
/// place, removed members are cut out with their comma, and new members
/// are appended after the last surviving one.
fn merge_members(
    original: &str,
    stripped: &str,
    scanner: &Scanner<'_>,
    open: usize,
    section: &Map<String, Value>,
    indent: &str,
) -> Result<Option<String>> {
    let Some(object) = scanner.object(open) else {
        return Ok(None);
    };
    let parent_prefix = line_indent(original, open);
    let member_prefix = object
        .members
        .iter()
        .find(|member| starts_line(stripped, member.key_start))
        .map(|member| line_indent(original, member.key_start))
        .unwrap_or_else(|| format!("{}{}", parent_prefix, indent));

    let mut edits: Vec<Edit> = Vec::new();
    let mut last_kept: Option<usize> = None;
    for (idx, member) in object.members.iter().enumerate() {
        let Some(value) = section.get(&member.key) else {
            edits.push(member_removal(stripped, member));
            continue;
        };
        last_kept = Some(idx);
        let current = serde_json::from_str::<Value>(&stripped[member.value_start..member.value_end]).ok();
        if current.as_ref() != Some(value) {
            edits.push(Edit {
                start: member.value_start,
                end: member.value_end,
                text: render_value(value, indent, &member_prefix)?,
            });
        }
    }

    // The comma after the last surviving member would otherwise dangle.
    if let Some(idx) = last_kept.filter(|idx| idx + 1 < object.members.len()) {
        if let Some(comma) = object.members[idx].comma {
            edits.push(Edit {
                start: comma,
                end: comma + 1,
                text: String::new(),
            });
        }
    }

    let mut added = String::new();
    for (key, value) in section {
        if object.members.iter().any(|member| &member.key == key) {
            continue;
        }
        added.push_str(&format!(
            ",\n{}{}: {}",
            member_prefix,
            json_key(key)?,
            render_value(value, indent, &member_prefix)?
        ));
    }
    if !added.is_empty() {
        let edit = match last_kept {
            Some(idx) => {
                let end = object.members[idx].value_end;
                Edit {
                    start: end,
                    end,
                    text: added,
                }
            }
            None => {
                let closing = if starts_line(stripped, object.close) {
                    String::new()
                } else {
                    format!("\n{}", parent_prefix)
                };
                Edit {
                    start: open + 1,
                    end: open + 1,
                    text: format!("{}{}", &added[1..], closing),
                }
            }
        };
        edits.push(edit);
    }

    // Later offsets first so earlier ones stay valid.
    edits.sort_by(|a, b| (b.start, b.end).cmp(&(a.start, a.end)));
    let mut out = original.to_string();
    for edit in edits {
        out.replace_range(edit.start..edit.end, &edit.text);
    }
    Ok(Some(out))
}

struct Edit {
    start: usize,
    end: usize,
    text: String,
}

/// Span covering `member` and its comma. A member alone on its line takes
/// the whole line with it, trailing comment included.
fn member_removal(stripped: &str, member: &Member) -> Edit {
    let bytes = stripped.as_bytes();
    let line_start = stripped[..member.key_start].rfind('\n').map_or(0, |i| i + 1);
    let mut end = member.comma.map_or(member.value_end, |comma| comma + 1);
    while end < bytes.len() && matches!(bytes[end], b' ' | b'\t' | b'\r') {
        end += 1;
    }
    let own_line = starts_line(stripped, member.key_start) && bytes.get(end) == Some(&b'\n');
    let (start, end) = if own_line {
        (line_start, end + 1)
    } else {
        (member.key_start, end)
    };
    Edit {
        start,
        end,
        text: String::new(),
    }
}

/// Whether only whitespace precedes `pos` on its line.
fn starts_line(stripped: &str, pos: usize) -> bool {
    let line_start = stripped[..pos].rfind('\n').map_or(0, |i| i + 1);
    stripped.as_bytes()[line_start..pos]
        .iter()
        .all(|b| b.is_ascii_whitespace())
}

/// Leading whitespace of the line containing `pos`.
fn line_indent(text: &str, pos: usize) -> String {
    let line_start = text[..pos].rfind('\n').map_or(0, |i| i + 1);
    text[line_start..]
        .chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .collect()
}

fn json_key(key: &str) -> Result<String> {
    serde_json::to_string(key).map_err(|e| ConduitError::Serialize {
        subject: "JSONC key".to_string(),
        reason: e.to_string(),
    })
}

fn splice(original: &str, start: usize, end: usize, text: &str) -> String {
    let mut out = String::with_capacity(original.len() + text.len());
    out.push_str(&original[..start]);
    out.push_str(text);
    out.push_str(&original[end..]);
    out
}

#[derive(Debug)]
struct Member {
    key: String,
    key_start: usize,
    value_start: usize,
    value_end: usize,
    /// Offset of the comma following the value, if any.
    comma: Option<usize>,
}

#[derive(Debug)]
struct ObjectSpan {
    open: usize,
    close: usize,
    members: Vec<Member>,
}

/// Minimal structural scanner over comment-free JSON text.
struct Scanner<'a> {
    bytes: &'a [u8],
}

impl<'a> Scanner<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    fn byte(&self, pos: usize) -> Option<u8> {
        self.bytes.get(pos).copied()
    }

    fn skip_ws(&self, mut pos: usize) -> usize {
        while pos < self.bytes.len() && self.bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        pos
    }

    /// End offset (exclusive) of the string starting at `pos`.
    fn skip_string(&self, pos: usize) -> Option<usize> {
        let mut i = pos + 1;
        while i < self.bytes.len() {
            match self.bytes[i] {
                b'\\' => i += 2,
                b'"' => return Some(i + 1),
                _ => i += 1,
            }
        }
        None
    }

    /// End offset (exclusive) of the value starting at `pos`.
    fn skip_value(&self, pos: usize) -> Option<usize> {
        match self.byte(pos)? {
            b'"' => self.skip_string(pos),
            b'{' | b'[' => {
                let mut depth = 0usize;
                let mut i = pos;
                while i < self.bytes.len() {
                    match self.bytes[i] {
                        b'"' => {
                            i = self.skip_string(i)?;
                            continue;
                        }
                        b'{' | b'[' => depth += 1,
                        b'}' | b']' => {
                            depth -= 1;
                            if depth == 0 {
                                return Some(i + 1);
                            }
                        }
                        _ => {}
                    }
                    i += 1;
                }
                None
            }
            _ => {
                let mut i = pos;
                while i < self.bytes.len()
                    && !matches!(self.bytes[i], b',' | b'}' | b']')
                    && !self.bytes[i].is_ascii_whitespace()
                {
                    i += 1;
                }
                (i > pos).then_some(i)
            }
        }
    }

    /// Members of the object whose `{` is at `open`.
    fn object(&self, open: usize) -> Option<ObjectSpan> {
        if self.byte(open)? != b'{' {
            return None;
        }
        let mut members = Vec::new();
        let mut pos = self.skip_ws(open + 1);
        loop {
            match self.byte(pos)? {
                b'}' => {
                    return Some(ObjectSpan {
                        open,
                        close: pos,
                        members,
                    });
                }
                b'"' => {
                    let key_start = pos;
                    let key_end = self.skip_string(pos)?;
                    let key_text = std::str::from_utf8(&self.bytes[pos..key_end]).ok()?;
                    let key: String = serde_json::from_str(key_text).ok()?;
                    pos = self.skip_ws(key_end);
                    if self.byte(pos)? != b':' {
                        return None;
                    }
                    let value_start = self.skip_ws(pos + 1);
                    let value_end = self.skip_value(value_start)?;
                    pos = self.skip_ws(value_end);
                    let comma = (self.byte(pos)? == b',').then_some(pos);
                    if comma.is_some() {
                        pos = self.skip_ws(pos + 1);
                    }
                    members.push(Member {
                        key,
                        key_start,
                        value_start,
                        value_end,
                        comma,
                    });
                }
                _ => return None,
            }
        }
    }
}
