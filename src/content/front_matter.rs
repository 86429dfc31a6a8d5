//! Splits a content file into its metadata block and its body.
//!
//! Three block styles are recognized, all of which must open the file
//! (leading blank lines and a byte order mark are skipped):
//!
//! ```text
//! ---                          +++                        <!--
//! title: Custom Back Button    title = "Custom Back..."   [TITLE]: # (Custom Back Button)
//! date: 2025-11-23 10:00 +0800 date = 2025-11-23T10:..   [DATE]: # (2025-11-23 10:00:00 +0800)
//! ---                          +++                        -->
//! ```
//!
//! The body is returned as a slice of the input and is never rewritten.

use serde_json::{Map, Value};

use crate::content::{FrontMatter, FrontMatterError, HeaderStyle};
use crate::content::parsing_utils::{extract_texted_header, parse_title_html, parse_title_markdown, split_words};

const YAML_DELIMITER: &str = "---";
const TOML_DELIMITER: &str = "+++";

pub fn parse_front_matter(raw: &str) -> Result<(FrontMatter, &str), FrontMatterError> {
    let content = raw.strip_prefix('\u{feff}').unwrap_or(raw);

    let mut start = 0;
    for line in content.split_inclusive('\n') {
        if !line.trim().is_empty() {
            break;
        }
        start += line.len();
    }
    let rest = &content[start..];

    let first_line = rest.lines().next().unwrap_or("");
    let (map, body, style) = match first_line.trim_end() {
        "" => return Err(FrontMatterError::Malformed("file is empty".to_string())),
        YAML_DELIMITER => {
            let (block, body) = split_fenced(rest, YAML_DELIMITER)?;
            (parse_yaml(block)?, body, HeaderStyle::Yaml)
        }
        TOML_DELIMITER => {
            let (block, body) = split_fenced(rest, TOML_DELIMITER)?;
            (parse_toml(block)?, body, HeaderStyle::Toml)
        }
        line if line.trim_start().starts_with("<!--") || extract_texted_header(line).is_some() => {
            let (map, body) = parse_texted(rest)?;
            (map, body, HeaderStyle::Texted)
        }
        _ => return Err(FrontMatterError::Malformed("content does not begin with a front matter block".to_string())),
    };

    let front_matter = build_front_matter(map, style, body)?;
    Ok((front_matter, body))
}

/// Returns the text between the opening fence line and the closing fence
/// line, and everything after the closing fence.
fn split_fenced<'a>(rest: &'a str, delimiter: &str) -> Result<(&'a str, &'a str), FrontMatterError> {
    let unclosed = || FrontMatterError::Malformed(format!("front matter block opened with `{}` is never closed", delimiter));

    let Some(first_nl) = rest.find('\n') else {
        return Err(unclosed());
    };
    let block_start = first_nl + 1;
    let mut pos = block_start;

    loop {
        let line_end = rest[pos..].find('\n').map(|i| pos + i);
        let line = &rest[pos..line_end.unwrap_or(rest.len())];
        if line.trim_end() == delimiter {
            let body_start = line_end.map(|i| i + 1).unwrap_or(rest.len());
            return Ok((&rest[block_start..pos], &rest[body_start..]));
        }
        match line_end {
            Some(i) => pos = i + 1,
            None => return Err(unclosed()),
        }
    }
}

fn parse_yaml(block: &str) -> Result<Map<String, Value>, FrontMatterError> {
    if block.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_yaml::from_str::<Value>(block) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Map::new()),
        Ok(_) => Err(FrontMatterError::Malformed("YAML block is not a key/value mapping".to_string())),
        Err(e) => Err(FrontMatterError::Malformed(format!("invalid YAML: {}", e))),
    }
}

fn parse_toml(block: &str) -> Result<Map<String, Value>, FrontMatterError> {
    match toml::from_str::<toml::Table>(block) {
        Ok(table) => Ok(table.into_iter().map(|(k, v)| (k, toml_to_json(v))).collect()),
        Err(e) => Err(FrontMatterError::Malformed(format!("invalid TOML: {}", e.message()))),
    }
}

fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => serde_json::Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(d) => Value::String(d.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(table.into_iter().map(|(k, v)| (k, toml_to_json(v))).collect()),
    }
}

fn parse_texted(rest: &str) -> Result<(Map<String, Value>, &str), FrontMatterError> {
    let (block, body) = match rest.find("<!--") {
        Some(open) if rest[..open].trim().is_empty() => {
            let after_open = &rest[open + 4..];
            let Some(close) = after_open.find("-->") else {
                return Err(FrontMatterError::Malformed("end of comment in the header is missing".to_string()));
            };
            let after = &after_open[close + 3..];
            // The body starts on the line following the closing marker
            let body = match after.find('\n') {
                Some(nl) if after[..nl].trim().is_empty() => &after[nl + 1..],
                _ => after,
            };
            (&after_open[..close], body)
        }
        _ => {
            let mut end = 0;
            for line in rest.split_inclusive('\n') {
                if !line.trim().is_empty() && extract_texted_header(line).is_none() {
                    break;
                }
                end += line.len();
            }
            (&rest[..end], &rest[end..])
        }
    };

    let mut map = Map::new();
    for line in block.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match extract_texted_header(line) {
            Some((key, val)) => {
                map.insert(key.to_string(), Value::String(val.trim().to_string()));
            }
            None => return Err(FrontMatterError::Malformed(format!("broken header line `{}`", line.trim()))),
        }
    }

    if map.is_empty() {
        return Err(FrontMatterError::Malformed("header comment holds no `[KEY]: # (value)` lines".to_string()));
    }

    Ok((map, body))
}

fn scalar(key: &str, value: Value) -> Result<Option<String>, FrontMatterError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Array(_) | Value::Object(_) => Err(FrontMatterError::Malformed(format!("`{}` must be a single value", key))),
    }
}

/// Lists are accepted either as sequences or as whitespace separated words.
fn list(key: &str, value: Value) -> Result<Vec<String>, FrontMatterError> {
    match value {
        Value::Array(items) => {
            let mut res = Vec::with_capacity(items.len());
            for item in items {
                if let Some(s) = scalar(key, item)? {
                    res.push(s);
                }
            }
            Ok(res)
        }
        Value::Object(_) => Err(FrontMatterError::Malformed(format!("`{}` must be a list", key))),
        other => Ok(scalar(key, other)?.map(|s| split_words(&s)).unwrap_or_default()),
    }
}

fn build_front_matter(map: Map<String, Value>, style: HeaderStyle, body: &str) -> Result<FrontMatter, FrontMatterError> {
    let mut title = None;
    let mut date = None;
    let mut description = None;
    let mut categories = vec![];
    let mut tags = vec![];
    let mut related = vec![];
    let mut extra = Map::new();

    for (key, value) in map {
        match key.to_lowercase().as_str() {
            "title" => title = scalar(&key, value)?,
            "date" => date = scalar(&key, value)?,
            "description" => description = scalar(&key, value)?,
            "categories" | "category" => categories.extend(list(&key, value)?),
            "tags" | "tag" => tags.extend(list(&key, value)?),
            "related" => related.extend(list(&key, value)?),
            _ => {
                extra.insert(key, value);
            }
        }
    }

    if style == HeaderStyle::Texted && title.as_deref().map_or(true, |t| t.trim().is_empty()) {
        title = parse_title_markdown(body).or_else(|| parse_title_html(body));
    }

    let title = title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
    let date = date.map(|d| d.trim().to_string()).filter(|d| !d.is_empty());

    let (title, date) = match (title, date) {
        (Some(title), Some(date)) => (title, date),
        (title, date) => {
            let mut missing = vec![];
            if title.is_none() {
                missing.push("title");
            }
            if date.is_none() {
                missing.push("date");
            }
            return Err(FrontMatterError::MissingFields(missing));
        }
    };

    Ok(FrontMatter {
        style,
        title,
        date,
        description: description.filter(|d| !d.trim().is_empty()),
        categories,
        tags,
        related,
        extra,
    })
}
