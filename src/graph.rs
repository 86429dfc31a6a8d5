//! Feed order, sequential navigation and cross-post references.
//!
//! References are lookups by identifier. A post may link to itself or take
//! part in a cycle; each reference is resolved on its own.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use lazy_static::lazy_static;
use markdown::mdast::Node;
use markdown::ParseOptions;
use regex::Regex;
use serde::Serialize;
use spdlog::warn;

use crate::content::ContentFormat;
use crate::content::parsing_utils::line_of_offset;
use crate::post::Post;
use crate::validation::Violation;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedEntry {
    pub slug: String,
    /// Adjacent entry earlier in the feed (the newer post).
    pub previous: Option<String>,
    /// Adjacent entry later in the feed (the older post).
    pub next: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    Markdown,
    Html,
    PostUrl,
    Related,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum RefTarget {
    Slug(String),
    /// Source file stem, as used by `{% post_url %}`.
    FileStem(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub target: RefTarget,
    pub kind: LinkKind,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct CrossLink {
    pub from: String,
    pub to: String,
    pub kind: LinkKind,
    pub line: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentGraph {
    pub feed: Vec<FeedEntry>,
    pub links: Vec<CrossLink>,
    /// Target slug -> slugs of the posts linking to it.
    pub backlinks: BTreeMap<String, Vec<String>>,
}

/// Newest first; equal instants fall back to the slug.
pub fn feed_order(a: &Post, b: &Post) -> Ordering {
    b.published_at.cmp(&a.published_at)
        .then_with(|| a.slug.cmp(&b.slug))
}

pub fn sort_feed(posts: &mut [Post]) {
    posts.sort_by(feed_order);
}

/// `posts` must already be in feed order.
pub fn build_feed(posts: &[Post]) -> Vec<FeedEntry> {
    posts.iter()
        .enumerate()
        .map(|(i, post)| FeedEntry {
            slug: post.slug.clone(),
            previous: i.checked_sub(1).map(|p| posts[p].slug.clone()),
            next: posts.get(i + 1).map(|n| n.slug.clone()),
        })
        .collect()
}

/// Slug named by a URL under `link_prefix`, e.g. `/posts/custom-back-button/#top`.
fn slug_from_url(url: &str, link_prefix: &str) -> Option<String> {
    let rest = url.trim().strip_prefix(link_prefix)?;
    let end = rest.find(|c: char| c == '/' || c == '?' || c == '#').unwrap_or(rest.len());
    let slug = &rest[..end];
    if slug.is_empty() {
        None
    } else {
        Some(slug.to_string())
    }
}

fn collect_markdown_links(node: &Node, out: &mut Vec<(String, Option<usize>, Option<usize>)>) {
    let found = match node {
        Node::Link(link) => Some((&link.url, &link.position)),
        Node::Definition(definition) => Some((&definition.url, &definition.position)),
        _ => None,
    };
    if let Some((url, position)) = found {
        let line = position.as_ref().map(|p| p.start.line);
        let column = position.as_ref().map(|p| p.start.column);
        out.push((url.clone(), line, column));
    }

    if let Some(children) = node.children() {
        for child in children {
            collect_markdown_links(child, out);
        }
    }
}

fn position_of(text: &str, offset: usize) -> (usize, usize) {
    let line = line_of_offset(text, offset);
    let line_start = text[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    (line, text[line_start..offset].chars().count() + 1)
}

/// Every reference written in a post, in source order. Line numbers are
/// relative to the source file.
pub fn extract_references(post: &Post, link_prefix: &str) -> Vec<Reference> {
    lazy_static! {
        static ref POST_URL_REGEX: Regex = Regex::new(r"\{%-?\s*post_url\s+(?P<name>[^\s%]+)\s*-?%\}").unwrap();
        static ref HREF_REGEX: Regex = Regex::new(r#"href\s*=\s*["'](?P<url>[^"']*)["']"#).unwrap();
    }

    let to_file_line = |line: usize| line + post.body_line - 1;
    let mut references = vec![];

    match post.format {
        ContentFormat::Markdown => {
            let mut links = vec![];
            match markdown::to_mdast(&post.body, &ParseOptions::gfm()) {
                Ok(root) => collect_markdown_links(&root, &mut links),
                Err(e) => warn!("Could not parse the body of {}: {}", post.source.display(), e.reason),
            }
            for (url, line, column) in links {
                if let Some(slug) = slug_from_url(&url, link_prefix) {
                    references.push(Reference {
                        target: RefTarget::Slug(slug),
                        kind: LinkKind::Markdown,
                        line: line.map(to_file_line),
                        column,
                    });
                }
            }
        }
        ContentFormat::Html => {
            for cap in HREF_REGEX.captures_iter(&post.body) {
                let Some(url) = cap.name("url") else { continue };
                if let Some(slug) = slug_from_url(url.as_str(), link_prefix) {
                    let (line, column) = position_of(&post.body, url.start());
                    references.push(Reference {
                        target: RefTarget::Slug(slug),
                        kind: LinkKind::Html,
                        line: Some(to_file_line(line)),
                        column: Some(column),
                    });
                }
            }
        }
    }

    for cap in POST_URL_REGEX.captures_iter(&post.body) {
        let Some(name) = cap.name("name") else { continue };
        let stem = name.as_str().rsplit('/').next().unwrap_or(name.as_str());
        let (line, column) = position_of(&post.body, name.start());
        references.push(Reference {
            target: RefTarget::FileStem(stem.to_string()),
            kind: LinkKind::PostUrl,
            line: Some(to_file_line(line)),
            column: Some(column),
        });
    }

    for slug in &post.related {
        references.push(Reference {
            target: RefTarget::Slug(slug.clone()),
            kind: LinkKind::Related,
            line: None,
            column: None,
        });
    }

    references
}

/// Resolves the references of every post against the collection. Links come
/// back sorted; every unresolved occurrence is reported on its own.
pub fn resolve_references(posts: &[Post], link_prefix: &str) -> (Vec<CrossLink>, Vec<Violation>) {
    let by_slug: HashMap<&str, &str> = posts.iter().map(|p| (p.slug.as_str(), p.slug.as_str())).collect();
    let by_stem: HashMap<&str, &str> = posts.iter().map(|p| (p.stem.as_str(), p.slug.as_str())).collect();

    let mut links = vec![];
    let mut dangling = vec![];

    for post in posts {
        for reference in extract_references(post, link_prefix) {
            let (resolved, target) = match reference.target {
                RefTarget::Slug(ref slug) => (by_slug.get(slug.as_str()), slug),
                RefTarget::FileStem(ref stem) => (by_stem.get(stem.as_str()), stem),
            };
            match resolved {
                Some(to) => links.push(CrossLink {
                    from: post.slug.clone(),
                    to: to.to_string(),
                    kind: reference.kind,
                    line: reference.line,
                }),
                None => dangling.push(Violation::DanglingReference {
                    file: post.source.clone(),
                    from: post.slug.clone(),
                    target: target.clone(),
                    line: reference.line,
                    column: reference.column,
                }),
            }
        }
    }

    links.sort();
    (links, dangling)
}

pub fn build_graph(posts: &[Post], link_prefix: &str) -> (DocumentGraph, Vec<Violation>) {
    let feed = build_feed(posts);
    let (links, dangling) = resolve_references(posts, link_prefix);

    let mut backlinks: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for link in &links {
        let sources = backlinks.entry(link.to.clone()).or_default();
        if !sources.contains(&link.from) {
            sources.push(link.from.clone());
        }
    }

    (DocumentGraph { feed, links, backlinks }, dangling)
}
