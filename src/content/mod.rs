use std::fmt;
use std::fmt::{Display, Formatter};

use serde::Serialize;
use serde_json::{Map, Value};

pub mod content_file;
pub mod front_matter;
pub mod parsing_utils;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentFormat {
    Markdown,
    Html,
}

/// Delimiter style the metadata block was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderStyle {
    /// `---` fenced YAML
    Yaml,
    /// `+++` fenced TOML
    Toml,
    /// `[KEY]: # (value)` lines, optionally wrapped in an HTML comment
    Texted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrontMatter {
    pub style: HeaderStyle,
    pub title: String,
    pub date: String,
    pub description: Option<String>,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub related: Vec<String>,
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrontMatterError {
    Malformed(String),
    MissingFields(Vec<&'static str>),
}

impl Display for FrontMatterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            FrontMatterError::Malformed(reason) => write!(f, "malformed front matter: {}", reason),
            FrontMatterError::MissingFields(fields) => write!(f, "missing required field(s): {}", fields.join(", ")),
        }
    }
}

impl std::error::Error for FrontMatterError {}
