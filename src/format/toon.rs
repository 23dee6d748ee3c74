//! Token-oriented (TOON) encoding and decoding.
//!
//! TOON is the compact counterpart to the JSON output format. Records are
//! written as indented `key: value` lines, and a homogeneous batch of flat
//! records collapses into a single `[N]{fields}:` header followed by one
//! comma-joined row per record, so field names are emitted once instead of
//! once per record.

use serde_json::{Map, Value};

use super::DecodeError;

const INDENT: &str = "  ";

/// Encode a JSON value as a TOON document.
///
/// Never fails: every `serde_json::Value` has a TOON rendering.
pub fn encode(value: &Value) -> String {
    let mut out = String::new();
    match value {
        // A root object with no entries would otherwise render as nothing.
        Value::Object(map) if map.is_empty() => out.push_str("{}\n"),
        Value::Object(map) => write_entries(map, 0, &mut out),
        Value::Array(items) => write_array(None, items, 0, &mut out),
        scalar => {
            out.push_str(&scalar_token(scalar));
            out.push('\n');
        }
    }
    out
}

/// Decode a TOON document back into a JSON value.
///
/// Strict: indentation, array lengths, and row widths must all agree with
/// the document's own headers, otherwise a [`DecodeError`] is returned.
pub fn decode(input: &str) -> Result<Value, DecodeError> {
    let lines = split_lines(input)?;
    let mut parser = Parser { lines, pos: 0 };
    parser.parse_document()
}

// ── encoder ──────────────────────────────────────────────────────────

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Object(_) | Value::Array(_))
}

fn push_line(out: &mut String, level: usize, text: &str) {
    for _ in 0..level {
        out.push_str(INDENT);
    }
    out.push_str(text);
    out.push('\n');
}

fn write_entries(map: &Map<String, Value>, level: usize, out: &mut String) {
    for (key, value) in map {
        match value {
            Value::Object(child) if child.is_empty() => {
                push_line(out, level, &format!("{}:", key_token(key)));
            }
            Value::Object(child) => {
                push_line(out, level, &format!("{}:", key_token(key)));
                write_entries(child, level + 1, out);
            }
            Value::Array(items) => write_array(Some(key), items, level, out),
            scalar => {
                push_line(
                    out,
                    level,
                    &format!("{}: {}", key_token(key), scalar_token(scalar)),
                );
            }
        }
    }
}

fn write_array(key: Option<&str>, items: &[Value], level: usize, out: &mut String) {
    let prefix = key.map(key_token).unwrap_or_default();

    if items.iter().all(is_scalar) {
        push_line(out, level, &format!("{}{}", prefix, inline_scalar_array(items)));
        return;
    }

    if let Some((header, rows)) = tabular(items) {
        push_line(
            out,
            level,
            &format!("{}[{}]{{{}}}:", prefix, items.len(), header),
        );
        for row in rows {
            push_line(out, level + 1, &row);
        }
        return;
    }

    // Mixed shapes fall back to list form.
    push_line(out, level, &format!("{}[{}]:", prefix, items.len()));
    for item in items {
        write_list_item(item, level + 1, out);
    }
}

/// Inline form for an all-scalar array: `[N]: a,b,c`.
fn inline_scalar_array(items: &[Value]) -> String {
    if items.is_empty() {
        return "[0]:".to_string();
    }
    let cells: Vec<String> = items.iter().map(scalar_token).collect();
    format!("[{}]: {}", items.len(), cells.join(","))
}

/// Tabular layout applies when every item is a flat record with the same
/// field set in the same order. Returns the shared header and one row per
/// record, or `None` when the batch is not homogeneous.
fn tabular(items: &[Value]) -> Option<(String, Vec<String>)> {
    let first = items.first()?.as_object()?;
    if first.is_empty() || !first.values().all(is_scalar) {
        return None;
    }
    let fields: Vec<&str> = first.keys().map(String::as_str).collect();
    // Field names are comma-joined in the header, so they must be bare.
    if !fields.iter().copied().all(is_bare_key) {
        return None;
    }

    let mut rows = Vec::with_capacity(items.len());
    for item in items {
        let record = item.as_object()?;
        if record.len() != fields.len()
            || !record.keys().map(String::as_str).eq(fields.iter().copied())
        {
            return None;
        }
        let mut cells = Vec::with_capacity(fields.len());
        for value in record.values() {
            if !is_scalar(value) {
                return None;
            }
            cells.push(scalar_token(value));
        }
        rows.push(cells.join(","));
    }

    let header: Vec<String> = fields.iter().map(|f| key_token(f)).collect();
    Some((header.join(","), rows))
}

fn write_list_item(item: &Value, level: usize, out: &mut String) {
    match item {
        Value::Object(map) => {
            let inline = map.iter().next().filter(|(_, v)| is_scalar(v));
            match inline {
                Some((key, value)) => {
                    push_line(
                        out,
                        level,
                        &format!("- {}: {}", key_token(key), scalar_token(value)),
                    );
                    let rest: Map<String, Value> = map
                        .iter()
                        .skip(1)
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect();
                    write_entries(&rest, level + 1, out);
                }
                None if map.is_empty() => push_line(out, level, "-"),
                None => {
                    push_line(out, level, "-");
                    write_entries(map, level + 1, out);
                }
            }
        }
        Value::Array(items) if items.iter().all(is_scalar) => {
            push_line(out, level, &format!("- {}", inline_scalar_array(items)));
        }
        Value::Array(items) => {
            push_line(out, level, "-");
            write_array(None, items, level + 1, out);
        }
        scalar => push_line(out, level, &format!("- {}", scalar_token(scalar))),
    }
}

fn is_bare_key(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('-')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn key_token(key: &str) -> String {
    if is_bare_key(key) {
        key.to_string()
    } else {
        quoted(key)
    }
}

fn scalar_token(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) if needs_quotes(s) => quoted(s),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => unreachable!("scalar_token on a container"),
    }
}

/// Bare strings must survive re-parsing as the same string: anything that
/// would read back as a different type, split a cell, or collide with the
/// line grammar gets quoted.
fn needs_quotes(s: &str) -> bool {
    if s.is_empty() || s.trim() != s {
        return true;
    }
    if matches!(s, "true" | "false" | "null") {
        return true;
    }
    if s.starts_with('-') {
        return true;
    }
    if s.starts_with(|c: char| c.is_ascii_digit() || matches!(c, '+' | '.'))
        && s.parse::<f64>().is_ok()
    {
        return true;
    }
    s.chars().any(|c| {
        matches!(c, ':' | ',' | '"' | '\\' | '#' | '[' | ']' | '{' | '}') || c.is_control()
    })
}

fn quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

// ── decoder ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    number: usize,
    level: usize,
    text: &'a str,
}

fn err(line: usize, message: impl Into<String>) -> DecodeError {
    DecodeError::Toon {
        line,
        message: message.into(),
    }
}

fn split_lines(input: &str) -> Result<Vec<Line<'_>>, DecodeError> {
    let mut lines = Vec::new();
    for (i, raw) in input.lines().enumerate() {
        let number = i + 1;
        if raw.trim().is_empty() {
            continue;
        }
        let stripped = raw.trim_start_matches(' ');
        if stripped.starts_with('\t') {
            return Err(err(number, "tabs are not allowed for indentation"));
        }
        let indent = raw.len() - stripped.len();
        if indent % 2 != 0 {
            return Err(err(number, "indentation must be a multiple of two spaces"));
        }
        lines.push(Line {
            number,
            level: indent / 2,
            text: stripped.trim_end(),
        });
    }
    Ok(lines)
}

struct Parser<'a> {
    lines: Vec<Line<'a>>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<Line<'a>> {
        self.lines.get(self.pos).copied()
    }

    fn advance(&mut self) -> Line<'a> {
        let line = self.lines[self.pos];
        self.pos += 1;
        line
    }

    fn parse_document(&mut self) -> Result<Value, DecodeError> {
        let Some(first) = self.peek() else {
            return Err(err(0, "empty document"));
        };
        if first.level != 0 {
            return Err(err(first.number, "unexpected indentation"));
        }

        let value = if first.text == "{}" {
            self.advance();
            Value::Object(Map::new())
        } else if first.text.starts_with('[') {
            let line = self.advance();
            let (len, fields, inline) = parse_array_header(line.text, line.number)?;
            self.parse_array(len, fields, inline, 0, line.number)?
        } else if self.lines.len() == 1 && parse_key(first.text).is_none() {
            let line = self.advance();
            scalar_value(line.text, line.number)?
        } else {
            Value::Object(self.parse_object(0)?)
        };

        if let Some(extra) = self.peek() {
            return Err(err(extra.number, "unexpected trailing content"));
        }
        Ok(value)
    }

    fn parse_object(&mut self, level: usize) -> Result<Map<String, Value>, DecodeError> {
        let mut map = Map::new();
        while let Some(line) = self.peek() {
            if line.level < level {
                break;
            }
            if line.level > level {
                return Err(err(line.number, "unexpected indentation"));
            }
            self.advance();

            let (key, rest) =
                parse_key(line.text).ok_or_else(|| err(line.number, "expected a key"))?;
            if map.contains_key(&key) {
                return Err(err(line.number, format!("duplicate key {key:?}")));
            }

            let value = if rest.starts_with('[') {
                let (len, fields, inline) = parse_array_header(rest, line.number)?;
                self.parse_array(len, fields, inline, level, line.number)?
            } else if let Some(after) = rest.strip_prefix(':') {
                let after = after.trim();
                if after.is_empty() {
                    if self.peek().is_some_and(|l| l.level > level) {
                        Value::Object(self.parse_object(level + 1)?)
                    } else {
                        Value::Object(Map::new())
                    }
                } else {
                    scalar_value(after, line.number)?
                }
            } else {
                return Err(err(line.number, "expected ':' after key"));
            };

            map.insert(key, value);
        }
        Ok(map)
    }

    fn parse_array(
        &mut self,
        len: usize,
        fields: Option<Vec<String>>,
        inline: &str,
        level: usize,
        header_line: usize,
    ) -> Result<Value, DecodeError> {
        // Tabular: `[N]{fields}:` with one row per record below the header.
        if let Some(fields) = fields {
            if !inline.is_empty() {
                return Err(err(header_line, "tabular rows belong on their own lines"));
            }
            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                let Some(line) = self.peek() else {
                    return Err(err(header_line, format!("expected {len} rows")));
                };
                if line.level != level + 1 {
                    return Err(err(line.number, format!("expected {len} rows")));
                }
                self.advance();
                let cells = split_cells(line.text, line.number)?;
                if cells.len() != fields.len() {
                    return Err(err(
                        line.number,
                        format!("expected {} cells, found {}", fields.len(), cells.len()),
                    ));
                }
                let mut record = Map::new();
                for (field, cell) in fields.iter().zip(cells) {
                    record.insert(field.clone(), cell);
                }
                items.push(Value::Object(record));
            }
            self.reject_deeper(level)?;
            return Ok(Value::Array(items));
        }

        // Inline: `[N]: a,b,c`.
        if !inline.is_empty() {
            let cells = split_cells(inline, header_line)?;
            if cells.len() != len {
                return Err(err(
                    header_line,
                    format!("expected {len} values, found {}", cells.len()),
                ));
            }
            return Ok(Value::Array(cells));
        }

        if len == 0 {
            self.reject_deeper(level)?;
            return Ok(Value::Array(Vec::new()));
        }

        // List form: `[N]:` with one `- item` per element below the header.
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            let Some(line) = self.peek() else {
                return Err(err(header_line, format!("expected {len} list items")));
            };
            if line.level != level + 1 || !line.text.starts_with('-') {
                return Err(err(line.number, format!("expected {len} list items")));
            }
            self.advance();
            items.push(self.parse_list_item(line, level + 1)?);
        }
        self.reject_deeper(level)?;
        Ok(Value::Array(items))
    }

    fn parse_list_item(&mut self, line: Line<'a>, dash_level: usize) -> Result<Value, DecodeError> {
        let rest = line.text[1..].trim_start();

        // A bare dash introduces a block item (object or nested array).
        if rest.is_empty() {
            return match self.peek() {
                Some(next) if next.level == dash_level + 1 => {
                    if next.text.starts_with('[') {
                        self.advance();
                        let (len, fields, inline) = parse_array_header(next.text, next.number)?;
                        self.parse_array(len, fields, inline, dash_level + 1, next.number)
                    } else {
                        Ok(Value::Object(self.parse_object(dash_level + 1)?))
                    }
                }
                _ => Ok(Value::Object(Map::new())),
            };
        }

        if rest.starts_with('[') {
            let (len, fields, inline) = parse_array_header(rest, line.number)?;
            return self.parse_array(len, fields, inline, dash_level, line.number);
        }

        // `- key: value` opens an object item; further fields sit one level in.
        if let Some((key, after)) = parse_key(rest) {
            let Some(value_text) = after.strip_prefix(':') else {
                return Err(err(line.number, "unsupported list item"));
            };
            let value_text = value_text.trim();
            if value_text.is_empty() {
                return Err(err(line.number, "expected a value after ':'"));
            }
            let mut map = Map::new();
            map.insert(key, scalar_value(value_text, line.number)?);
            if self.peek().is_some_and(|l| l.level == dash_level + 1) {
                for (key, value) in self.parse_object(dash_level + 1)? {
                    if map.contains_key(&key) {
                        return Err(err(line.number, format!("duplicate key {key:?}")));
                    }
                    map.insert(key, value);
                }
            }
            return Ok(Value::Object(map));
        }

        scalar_value(rest, line.number)
    }

    fn reject_deeper(&self, level: usize) -> Result<(), DecodeError> {
        if let Some(line) = self.peek() {
            if line.level > level {
                return Err(err(line.number, "array length mismatch"));
            }
        }
        Ok(())
    }
}

fn parse_array_header(
    text: &str,
    number: usize,
) -> Result<(usize, Option<Vec<String>>, &str), DecodeError> {
    let body = text
        .strip_prefix('[')
        .ok_or_else(|| err(number, "expected '['"))?;
    let close = body
        .find(']')
        .ok_or_else(|| err(number, "unterminated array length"))?;
    let len: usize = body[..close]
        .trim()
        .parse()
        .map_err(|_| err(number, "invalid array length"))?;

    let mut rest = &body[close + 1..];
    let fields = if let Some(after) = rest.strip_prefix('{') {
        let close = after
            .find('}')
            .ok_or_else(|| err(number, "unterminated field list"))?;
        let fields = parse_fields(&after[..close], number)?;
        rest = &after[close + 1..];
        Some(fields)
    } else {
        None
    };

    let rest = rest
        .strip_prefix(':')
        .ok_or_else(|| err(number, "expected ':' after array header"))?;
    Ok((len, fields, rest.trim()))
}

fn parse_fields(text: &str, number: usize) -> Result<Vec<String>, DecodeError> {
    let mut fields = Vec::new();
    for part in text.split(',') {
        let part = part.trim();
        if part.is_empty() {
            return Err(err(number, "empty field name"));
        }
        if part.starts_with('"') {
            let (name, after) = parse_quoted(part, number)?;
            if !after.trim().is_empty() {
                return Err(err(number, "malformed field name"));
            }
            fields.push(name);
        } else {
            fields.push(part.to_string());
        }
    }
    Ok(fields)
}

fn parse_key(text: &str) -> Option<(String, &str)> {
    if text.starts_with('"') {
        let (key, rest) = parse_quoted(text, 0).ok()?;
        if rest.starts_with(':') || rest.starts_with('[') {
            return Some((key, rest));
        }
        return None;
    }
    let end = text.find([':', '['])?;
    let key = &text[..end];
    if key.is_empty() || key.starts_with('-') || key.chars().any(char::is_whitespace) {
        return None;
    }
    Some((key.to_string(), &text[end..]))
}

fn split_cells(text: &str, number: usize) -> Result<Vec<Value>, DecodeError> {
    let mut cells = Vec::new();
    let mut rest = text.trim_start();
    loop {
        if rest.starts_with('"') {
            let (string, after) = parse_quoted(rest, number)?;
            cells.push(Value::String(string));
            let after = after.trim_start();
            if after.is_empty() {
                break;
            }
            rest = after
                .strip_prefix(',')
                .ok_or_else(|| err(number, "expected ',' between values"))?
                .trim_start();
        } else if let Some(split) = rest.find(',') {
            cells.push(bare_scalar(&rest[..split], number)?);
            rest = rest[split + 1..].trim_start();
        } else {
            cells.push(bare_scalar(rest, number)?);
            break;
        }
    }
    Ok(cells)
}

fn scalar_value(text: &str, number: usize) -> Result<Value, DecodeError> {
    if text.starts_with('"') {
        let (string, rest) = parse_quoted(text, number)?;
        if !rest.trim().is_empty() {
            return Err(err(number, "unexpected trailing characters"));
        }
        return Ok(Value::String(string));
    }
    bare_scalar(text, number)
}

fn bare_scalar(text: &str, number: usize) -> Result<Value, DecodeError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(err(number, "missing value"));
    }
    match text {
        "null" => return Ok(Value::Null),
        "true" => return Ok(Value::Bool(true)),
        "false" => return Ok(Value::Bool(false)),
        _ => {}
    }
    if text.starts_with(|c: char| c.is_ascii_digit() || matches!(c, '-' | '+' | '.')) {
        if let Ok(n) = text.parse::<i64>() {
            return Ok(Value::from(n));
        }
        if let Ok(n) = text.parse::<u64>() {
            return Ok(Value::from(n));
        }
        if let Ok(f) = text.parse::<f64>() {
            if let Some(n) = serde_json::Number::from_f64(f) {
                return Ok(Value::Number(n));
            }
        }
    }
    Ok(Value::String(text.to_string()))
}

fn parse_quoted(text: &str, number: usize) -> Result<(String, &str), DecodeError> {
    let mut chars = text.char_indices();
    if !matches!(chars.next(), Some((_, '"'))) {
        return Err(err(number, "expected '\"'"));
    }
    let mut out = String::new();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((out, &text[i + 1..])),
            '\\' => {
                let Some((_, escape)) = chars.next() else {
                    break;
                };
                match escape {
                    '"' => out.push('"'),
                    '\\' => out.push('\\'),
                    '/' => out.push('/'),
                    'n' => out.push('\n'),
                    'r' => out.push('\r'),
                    't' => out.push('\t'),
                    'u' => {
                        let mut code = 0u32;
                        for _ in 0..4 {
                            let Some((_, h)) = chars.next() else {
                                return Err(err(number, "truncated unicode escape"));
                            };
                            let digit = h
                                .to_digit(16)
                                .ok_or_else(|| err(number, "invalid unicode escape"))?;
                            code = code * 16 + digit;
                        }
                        let c = char::from_u32(code)
                            .ok_or_else(|| err(number, "invalid unicode escape"))?;
                        out.push(c);
                    }
                    other => return Err(err(number, format!("invalid escape '\\{other}'"))),
                }
            }
            c => out.push(c),
        }
    }
    Err(err(number, "unterminated string"))
}
