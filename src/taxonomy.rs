use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::Serialize;

use crate::post::Post;
use crate::validation::Violation;

/// Tags are lookup keys: trimmed and lower-cased. `None` for blank input.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let tag = tag.trim();
    if tag.is_empty() {
        None
    } else {
        Some(tag.to_lowercase())
    }
}

/// Returns the normalized tag set and the distinct trimmed spellings, in the
/// order they were first written.
pub fn normalize_tags(raw: &[String]) -> (BTreeSet<String>, Vec<String>) {
    let mut tags = BTreeSet::new();
    let mut labels: Vec<String> = vec![];

    for tag in raw {
        let Some(normalized) = normalize_tag(tag) else {
            continue;
        };
        tags.insert(normalized);

        let label = tag.trim();
        if !labels.iter().any(|l| l == label) {
            labels.push(label.to_string());
        }
    }

    (tags, labels)
}

/// Categories are display taxonomy: case and order are kept, only exact
/// duplicates and blanks go away.
pub fn normalize_categories(raw: &[String]) -> Vec<String> {
    let mut categories: Vec<String> = vec![];
    for category in raw {
        let category = category.trim();
        if category.is_empty() || categories.iter().any(|c| c == category) {
            continue;
        }
        categories.push(category.to_string());
    }
    categories
}

/// Normalized tag -> slugs in feed order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TagIndex(BTreeMap<String, Vec<String>>);

impl TagIndex {
    /// `posts` must already be in feed order.
    pub fn build(posts: &[Post]) -> TagIndex {
        let mut index: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for post in posts {
            for tag in &post.tags {
                index.entry(tag.clone()).or_default().push(post.slug.clone());
            }
        }
        TagIndex(index)
    }

    /// Case-insensitive lookup.
    pub fn get(&self, tag: &str) -> &[String] {
        normalize_tag(tag)
            .and_then(|tag| self.0.get(&tag))
            .map(|slugs| slugs.as_slice())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item=(&String, &Vec<String>)> {
        self.0.iter()
    }
}

/// Category -> slugs in feed order. Keys are case-sensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CategoryIndex(BTreeMap<String, Vec<String>>);

impl CategoryIndex {
    pub fn build(posts: &[Post]) -> CategoryIndex {
        let mut index: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for post in posts {
            for category in &post.categories {
                index.entry(category.clone()).or_default().push(post.slug.clone());
            }
        }
        CategoryIndex(index)
    }

    pub fn get(&self, category: &str) -> &[String] {
        self.0.get(category.trim()).map(|slugs| slugs.as_slice()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item=(&String, &Vec<String>)> {
        self.0.iter()
    }
}

/// Recomputes both indices from scratch. `posts` must be in feed order.
pub fn build_indices(posts: &[Post]) -> (TagIndex, CategoryIndex) {
    (TagIndex::build(posts), CategoryIndex::build(posts))
}

/// One finding per tag written with more than one casing anywhere in the
/// collection.
pub fn tag_casing_findings(posts: &[Post]) -> Vec<Violation> {
    let mut spellings: BTreeMap<String, (BTreeSet<String>, BTreeSet<PathBuf>)> = BTreeMap::new();

    for post in posts {
        for label in &post.tag_labels {
            let Some(tag) = normalize_tag(label) else {
                continue;
            };
            let (variants, files) = spellings.entry(tag).or_default();
            variants.insert(label.clone());
            files.insert(post.source.clone());
        }
    }

    spellings.into_iter()
        .filter(|(_, (variants, _))| variants.len() > 1)
        .map(|(tag, (variants, files))| Violation::DuplicateTagCasing {
            tag,
            variants: variants.into_iter().collect(),
            files: files.into_iter().collect(),
        })
        .collect()
}
