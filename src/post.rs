use std::collections::BTreeSet;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::content::content_file::ContentFile;
use crate::content::front_matter::parse_front_matter;
use crate::content::parsing_utils::line_of_offset;
use crate::content::{ContentFormat, FrontMatterError, HeaderStyle};
use crate::slug::{check_file_date, resolve_slug};
use crate::taxonomy::{normalize_categories, normalize_tags};
use crate::text_utils::parse_published_at;
use crate::validation::Violation;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Post {
    pub slug: String,
    pub source: PathBuf,
    pub stem: String,
    pub format: ContentFormat,
    pub header_style: HeaderStyle,
    pub title: String,
    pub published_at: DateTime<FixedOffset>,
    pub description: Option<String>,
    pub categories: Vec<String>,
    pub tags: BTreeSet<String>,
    pub tag_labels: Vec<String>,
    pub related: Vec<String>,
    pub extra: Map<String, Value>,
    /// Line of the source file where the body starts.
    pub body_line: usize,
    pub body: String,
}

/// What a single content file turned into. A file that fails keeps its
/// findings and yields no post.
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub source: PathBuf,
    pub post: Option<Post>,
    pub findings: Vec<Violation>,
}

impl Display for Post {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "slug={}, date={}, file={}\ntitle={}\ntags={}",
               self.slug,
               self.published_at.to_rfc3339(),
               self.source.display(),
               self.title,
               self.tags.iter().cloned().collect::<Vec<_>>().join(" "),
        )
    }
}

impl Post {
    pub fn from_content(file: &ContentFile, default_offset: Option<FixedOffset>) -> FileOutcome {
        let source = file.file_path.clone();
        let failed = |findings: Vec<Violation>| FileOutcome {
            source: source.clone(),
            post: None,
            findings,
        };
        let malformed = |reason: String| Violation::MalformedFrontMatter {
            file: source.clone(),
            reason,
        };

        let (front_matter, body) = match parse_front_matter(&file.raw_content) {
            Ok(parsed) => parsed,
            Err(FrontMatterError::Malformed(reason)) => return failed(vec![malformed(reason)]),
            Err(FrontMatterError::MissingFields(fields)) => {
                let findings = fields.into_iter()
                    .map(|field| Violation::MissingRequiredField {
                        file: source.clone(),
                        field: field.to_string(),
                    })
                    .collect();
                return failed(findings);
            }
        };

        let published_at = match parse_published_at(&front_matter.date, default_offset) {
            Ok(date) => date,
            Err(e) => return failed(vec![malformed(format!("invalid date: {}", e))]),
        };

        let Some(slug) = resolve_slug(&file.stem, &front_matter.title) else {
            return failed(vec![malformed(format!("title `{}` does not produce a slug", front_matter.title))]);
        };

        let mut findings = vec![];
        if let Some(mismatch) = check_file_date(&source, &file.stem, &published_at) {
            findings.push(mismatch);
        }

        let (tags, tag_labels) = normalize_tags(&front_matter.tags);
        let body_offset = file.raw_content.len() - body.len();

        let post = Post {
            slug,
            source: source.clone(),
            stem: file.stem.clone(),
            format: file.format,
            header_style: front_matter.style,
            title: front_matter.title,
            published_at,
            description: front_matter.description,
            categories: normalize_categories(&front_matter.categories),
            tags,
            tag_labels,
            related: front_matter.related.iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect(),
            extra: front_matter.extra,
            body_line: line_of_offset(&file.raw_content, body_offset),
            body: body.to_string(),
        };

        FileOutcome {
            source,
            post: Some(post),
            findings,
        }
    }
}
