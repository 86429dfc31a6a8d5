use std::collections::BTreeMap;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Serialize;

use crate::graph::{feed_order, resolve_references};
use crate::pipeline::DocumentSet;
use crate::slug::check_file_date;
use crate::taxonomy::{normalize_tag, CategoryIndex, TagIndex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind")]
pub enum Violation {
    /// The file could not be read, or is not UTF-8.
    UnreadableFile {
        file: PathBuf,
        reason: String,
    },
    MalformedFrontMatter {
        file: PathBuf,
        reason: String,
    },
    MissingRequiredField {
        file: PathBuf,
        field: String,
    },
    SlugCollision {
        slug: String,
        files: Vec<PathBuf>,
    },
    DanglingReference {
        file: PathBuf,
        from: String,
        target: String,
        line: Option<usize>,
        column: Option<usize>,
    },
    DateMismatch {
        file: PathBuf,
        file_date: NaiveDate,
        published: NaiveDate,
    },
    DuplicateTagCasing {
        tag: String,
        variants: Vec<String>,
        files: Vec<PathBuf>,
    },
    /// Derived state that disagrees with the posts it was built from.
    InconsistentDocumentSet {
        detail: String,
    },
}

impl Violation {
    pub fn severity(&self) -> Severity {
        match self {
            Violation::DateMismatch { .. } => Severity::Warning,
            Violation::DuplicateTagCasing { .. } => Severity::Info,
            _ => Severity::Error,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Violation::UnreadableFile { .. } => "UnreadableFile",
            Violation::MalformedFrontMatter { .. } => "MalformedFrontMatter",
            Violation::MissingRequiredField { .. } => "MissingRequiredField",
            Violation::SlugCollision { .. } => "SlugCollision",
            Violation::DanglingReference { .. } => "DanglingReference",
            Violation::DateMismatch { .. } => "DateMismatch",
            Violation::DuplicateTagCasing { .. } => "DuplicateTagCasing",
            Violation::InconsistentDocumentSet { .. } => "InconsistentDocumentSet",
        }
    }
}

fn join_paths(files: &[PathBuf]) -> String {
    files.iter().map(|f| f.display().to_string()).collect::<Vec<_>>().join(", ")
}

impl Display for Violation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Violation::UnreadableFile { file, reason } =>
                write!(f, "{}: unreadable: {}", file.display(), reason),
            Violation::MalformedFrontMatter { file, reason } =>
                write!(f, "{}: {}", file.display(), reason),
            Violation::MissingRequiredField { file, field } =>
                write!(f, "{}: required field `{}` is missing", file.display(), field),
            Violation::SlugCollision { slug, files } =>
                write!(f, "slug `{}` is claimed by {}", slug, join_paths(files)),
            Violation::DanglingReference { file, target, line, .. } => match line {
                Some(line) => write!(f, "{}:{}: reference to unknown post `{}`", file.display(), line, target),
                None => write!(f, "{}: reference to unknown post `{}`", file.display(), target),
            },
            Violation::DateMismatch { file, file_date, published } =>
                write!(f, "{}: file name says {} but the post is dated {}", file.display(), file_date, published),
            Violation::DuplicateTagCasing { tag, variants, files } =>
                write!(f, "tag `{}` is spelled {} in {}", tag, variants.join(" / "), join_paths(files)),
            Violation::InconsistentDocumentSet { detail } =>
                write!(f, "inconsistent document set: {}", detail),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn has_errors(&self) -> bool {
        self.violations.iter().any(|v| v.severity() == Severity::Error)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.violations.iter().filter(|v| v.severity() == severity).count()
    }

    pub fn by_severity(&self) -> BTreeMap<Severity, Vec<&Violation>> {
        let mut groups: BTreeMap<Severity, Vec<&Violation>> = BTreeMap::new();
        for violation in &self.violations {
            groups.entry(violation.severity()).or_default().push(violation);
        }
        groups
    }
}

/// Re-checks the collection invariants of a built document set and merges the
/// result with the findings of the earlier stages. A re-derived finding only
/// counts when the earlier stages reported it fewer times, so repeated
/// occurrences survive while validating an unchanged set yields the same list
/// again.
pub fn validate(set: &DocumentSet, link_prefix: &str, findings: Vec<Violation>) -> ValidationReport {
    let mut derived = vec![];

    check_identities(set, &mut derived);
    check_feed(set, &mut derived);
    check_taxonomy(set, &mut derived);

    let (_, dangling) = resolve_references(&set.posts, link_prefix);
    derived.extend(dangling);
    for link in &set.links {
        if set.post(&link.to).is_none() || set.post(&link.from).is_none() {
            derived.push(Violation::InconsistentDocumentSet {
                detail: format!("link {} -> {} points outside the collection", link.from, link.to),
            });
        }
    }

    let mut counts: BTreeMap<Violation, (usize, usize)> = BTreeMap::new();
    for violation in findings {
        counts.entry(violation).or_default().0 += 1;
    }
    for violation in derived {
        counts.entry(violation).or_default().1 += 1;
    }

    let violations = counts.into_iter()
        .flat_map(|(violation, (reported, rechecked))| std::iter::repeat(violation).take(reported.max(rechecked)))
        .collect();

    ValidationReport { violations }
}

fn check_identities(set: &DocumentSet, violations: &mut Vec<Violation>) {
    let mut by_slug: BTreeMap<&str, Vec<PathBuf>> = BTreeMap::new();
    for post in &set.posts {
        by_slug.entry(post.slug.as_str()).or_default().push(post.source.clone());

        if post.title.trim().is_empty() {
            violations.push(Violation::MissingRequiredField {
                file: post.source.clone(),
                field: "title".to_string(),
            });
        }
        if let Some(mismatch) = check_file_date(&post.source, &post.stem, &post.published_at) {
            violations.push(mismatch);
        }
    }

    for (slug, mut files) in by_slug {
        if files.len() > 1 {
            files.sort();
            violations.push(Violation::SlugCollision { slug: slug.to_string(), files });
        }
    }
}

fn check_feed(set: &DocumentSet, violations: &mut Vec<Violation>) {
    for pair in set.posts.windows(2) {
        if feed_order(&pair[0], &pair[1]).is_gt() {
            violations.push(Violation::InconsistentDocumentSet {
                detail: format!("`{}` is listed before `{}` but belongs after it", pair[0].slug, pair[1].slug),
            });
        }
    }

    let feed_matches = set.feed.len() == set.posts.len()
        && set.feed.iter().zip(set.posts.iter()).all(|(entry, post)| entry.slug == post.slug);
    if !feed_matches {
        violations.push(Violation::InconsistentDocumentSet {
            detail: "feed entries do not follow the post collection".to_string(),
        });
    }
}

fn check_taxonomy(set: &DocumentSet, violations: &mut Vec<Violation>) {
    for post in &set.posts {
        if let Some(tag) = post.tags.iter().find(|tag| normalize_tag(tag).as_deref() != Some(tag.as_str())) {
            violations.push(Violation::InconsistentDocumentSet {
                detail: format!("`{}` carries the unnormalized tag `{}`", post.slug, tag),
            });
        }
    }

    if TagIndex::build(&set.posts) != set.tags {
        violations.push(Violation::InconsistentDocumentSet {
            detail: "tag index drifted from the post collection".to_string(),
        });
    }
    if CategoryIndex::build(&set.posts) != set.categories {
        violations.push(Violation::InconsistentDocumentSet {
            detail: "category index drifted from the post collection".to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use crate::pipeline::assemble;
    use crate::post::Post;
    use crate::content::content_file::ContentFile;
    use crate::test_data::yaml_post;

    use super::*;

    fn sample_set() -> DocumentSet {
        let files = [
            ContentFile::from_string("2025-11-23-a", "_posts/2025-11-23-a.md",
                &yaml_post("First", "2025-11-23 10:00:00 +0000", &["Swift"], "See [x](/posts/missing/)\n")),
            ContentFile::from_string("2025-11-20-b", "_posts/2025-11-20-b.md",
                &yaml_post("Second", "2025-11-21 10:00:00 +0000", &["swift"], "Back to [first](/posts/first/)\n")),
        ];
        let outcomes = files.iter().map(|f| Post::from_content(f, None)).collect();
        assemble(outcomes, "/posts/")
    }

    #[test]
    fn test_severity() {
        let mismatch = Violation::DateMismatch {
            file: PathBuf::from("a.md"),
            file_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            published: NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
        };
        assert_eq!(mismatch.severity(), Severity::Warning);
        assert_eq!(Violation::InconsistentDocumentSet { detail: "x".to_string() }.severity(), Severity::Error);
    }

    #[test]
    fn test_report_lists_every_finding() {
        let set = sample_set();
        let kinds: Vec<_> = set.report.violations.iter().map(|v| v.kind()).collect();
        assert_eq!(kinds, ["DanglingReference", "DateMismatch", "DuplicateTagCasing"]);
        assert!(set.report.has_errors());
        assert_eq!(set.report.count(Severity::Warning), 1);
        assert_eq!(set.report.count(Severity::Info), 1);
    }

    #[test]
    fn test_validation_is_idempotent() {
        let set = sample_set();
        let again = validate(&set, "/posts/", set.report.violations.clone());
        assert_eq!(again, set.report);
        let once_more = validate(&set, "/posts/", again.violations.clone());
        assert_eq!(once_more, again);
    }

    #[test]
    fn test_detects_broken_invariants() {
        let mut set = sample_set();
        set.posts.swap(0, 1);
        set.posts[0].tags.insert("Upper".to_string());
        let report = validate(&set, "/posts/", vec![]);

        let inconsistent = report.violations.iter()
            .filter(|v| matches!(v, Violation::InconsistentDocumentSet { .. }))
            .count();
        // order, feed, unnormalized tag, tag index, category index
        assert_eq!(inconsistent, 5);
    }

    #[test]
    fn test_detects_duplicate_slugs() {
        let mut set = sample_set();
        let mut clone = set.posts[0].clone();
        clone.source = PathBuf::from("_posts/copy.md");
        set.posts.insert(1, clone);
        let report = validate(&set, "/posts/", vec![]);
        assert!(report.violations.iter().any(|v| matches!(v, Violation::SlugCollision { slug, files } if slug == "first" && files.len() == 2)));
    }

    #[test]
    fn test_repeated_occurrences_are_kept() {
        let file = ContentFile::from_string("r", "_posts/r.md",
            "---\ntitle: Twice\ndate: 2025-01-01 00:00:00 +0000\nrelated: [ghost, ghost]\n---\n");
        let set = assemble(vec![Post::from_content(&file, None)], "/posts/");

        let dangling = set.report.violations.iter()
            .filter(|v| matches!(v, Violation::DanglingReference { target, .. } if target == "ghost"))
            .count();
        assert_eq!(dangling, 2);

        let again = validate(&set, "/posts/", set.report.violations.clone());
        assert_eq!(again, set.report);
    }

    #[test]
    fn test_derived_findings_are_not_doubled() {
        let set = sample_set();
        let report = validate(&set, "/posts/", vec![]);
        let dangling = report.violations.iter().filter(|v| v.kind() == "DanglingReference").count();
        assert_eq!(dangling, 1);
        assert_eq!(report.count(Severity::Warning), 1);
    }

    #[test]
    fn test_display() {
        let v = Violation::UnreadableFile { file: PathBuf::from("_posts/x.md"), reason: "stream did not contain valid UTF-8".to_string() };
        assert_eq!(v.to_string(), "_posts/x.md: unreadable: stream did not contain valid UTF-8");

        let v = Violation::MissingRequiredField { file: PathBuf::from("_posts/x.md"), field: "date".to_string() };
        assert_eq!(v.to_string(), "_posts/x.md: required field `date` is missing");
    }
}
