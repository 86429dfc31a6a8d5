use std::collections::BTreeMap;
use std::io;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::FixedOffset;
use serde::Serialize;
use spdlog::{debug, info, warn};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::collection::PostCollection;
use crate::config::Config;
use crate::content::content_file::ContentFile;
use crate::graph::{build_graph, CrossLink, FeedEntry};
use crate::post::{FileOutcome, Post};
use crate::post_list::{PostLink, PostList};
use crate::taxonomy::{build_indices, tag_casing_findings, CategoryIndex, TagIndex};
use crate::validation::{validate, Severity, ValidationReport, Violation};

const KNOWN_EXTENSIONS: [&str; 4] = ["md", "markdown", "html", "htm"];

#[derive(Debug, Clone)]
pub struct Settings {
    pub posts_dir: PathBuf,
    pub index_base_name: String,
    pub extensions: Vec<String>,
    pub link_prefix: String,
    pub default_offset: Option<FixedOffset>,
    pub workers: usize,
}

impl Settings {
    pub fn from_config(config: &Config) -> io::Result<Settings> {
        let mut extensions = vec![];
        for ext in &config.defaults.extensions {
            let ext = ext.trim_start_matches('.').to_ascii_lowercase();
            if KNOWN_EXTENSIONS.contains(&ext.as_str()) {
                extensions.push(ext);
            } else {
                warn!("Ignoring extension {}: only {} are understood", ext, KNOWN_EXTENSIONS.join(", "));
            }
        }

        let workers = config.defaults.workers
            .or_else(|| std::thread::available_parallelism().ok().map(|n| n.get()))
            .unwrap_or(4)
            .max(1);

        Ok(Settings {
            posts_dir: config.paths.posts_dir.clone(),
            index_base_name: config.defaults.index_base_name.clone(),
            extensions,
            link_prefix: config.defaults.link_prefix.clone(),
            default_offset: config.default_offset()?,
            workers,
        })
    }
}

/// Everything handed to the renderer: posts in feed order, navigation, links,
/// taxonomy indices and the violation report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentSet {
    pub posts: Vec<Post>,
    pub feed: Vec<FeedEntry>,
    pub links: Vec<CrossLink>,
    pub backlinks: BTreeMap<String, Vec<String>>,
    pub tags: TagIndex,
    pub categories: CategoryIndex,
    pub report: ValidationReport,
}

impl DocumentSet {
    pub fn post(&self, slug: &str) -> Option<&Post> {
        self.posts.iter().find(|p| p.slug == slug)
    }

    pub fn feed_entry(&self, slug: &str) -> Option<&FeedEntry> {
        self.feed.iter().find(|e| e.slug == slug)
    }

    /// Slugs of the posts linking to `slug`.
    pub fn referenced_by(&self, slug: &str) -> &[String] {
        self.backlinks.get(slug).map(|from| from.as_slice()).unwrap_or_default()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Reads and parses every file on the blocking pool, at most `workers` at a
/// time. A file that cannot be read becomes an `UnreadableFile` finding.
/// Outcomes come back sorted by source path whatever order the workers
/// finished in.
pub async fn ingest_all(links: Vec<PostLink>, default_offset: Option<FixedOffset>, workers: usize) -> io::Result<Vec<FileOutcome>> {
    let permits = Arc::new(Semaphore::new(workers.max(1)));
    let mut tasks = JoinSet::new();

    for link in links {
        let permit = match permits.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => return Err(io::Error::new(ErrorKind::Other, format!("Ingest pool closed: {}", e))),
        };
        tasks.spawn_blocking(move || {
            let _permit = permit;
            debug!("Ingesting {}", link.post_path.display());
            let source = link.post_path.clone();
            match ContentFile::from_file(link.post_name, link.post_path) {
                Ok(file) => Post::from_content(&file, default_offset),
                Err(e) => {
                    warn!("{}", e);
                    FileOutcome {
                        findings: vec![Violation::UnreadableFile {
                            file: source.clone(),
                            reason: e.to_string(),
                        }],
                        source,
                        post: None,
                    }
                }
            }
        });
    }

    let mut outcomes = vec![];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => return Err(io::Error::new(ErrorKind::Other, format!("Ingest worker failed: {}", e))),
        }
    }

    outcomes.sort_by(|a, b| a.source.cmp(&b.source));
    Ok(outcomes)
}

/// Collection wide stages. Runs on one thread over outcomes already sorted by
/// source path.
pub fn assemble(outcomes: Vec<FileOutcome>, link_prefix: &str) -> DocumentSet {
    let mut findings = vec![];
    let mut ingested = vec![];

    for outcome in outcomes {
        if outcome.post.is_none() {
            warn!("Leaving out {}", outcome.source.display());
        }
        findings.extend(outcome.findings);
        ingested.extend(outcome.post);
    }

    // casing is reported for colliding posts too
    findings.extend(tag_casing_findings(&ingested));

    let collection: PostCollection = ingested.into_iter().collect();
    let (posts, collisions) = collection.resolve();
    findings.extend(collisions);

    let (tags, categories) = build_indices(&posts);

    let (graph, dangling) = build_graph(&posts, link_prefix);
    findings.extend(dangling);

    let mut set = DocumentSet {
        posts,
        feed: graph.feed,
        links: graph.links,
        backlinks: graph.backlinks,
        tags,
        categories,
        report: ValidationReport::default(),
    };
    set.report = validate(&set, link_prefix, findings);
    set
}

pub async fn run(settings: &Settings) -> io::Result<DocumentSet> {
    let started = Instant::now();

    let post_list = PostList {
        root_dir: settings.posts_dir.clone(),
        post_file: settings.index_base_name.clone(),
        extensions: settings.extensions.clone(),
    };
    let links = match post_list.retrieve_all() {
        Ok(links) => links,
        Err(e) => return Err(io::Error::new(e.kind(), format!("Error listing {}: {}", settings.posts_dir.display(), e))),
    };
    info!("Found {} content files in {}", links.len(), settings.posts_dir.display());

    let outcomes = ingest_all(links, settings.default_offset, settings.workers).await?;
    let set = assemble(outcomes, &settings.link_prefix);

    info!("Built {} posts, {} tags, {} categories in {:?}", set.posts.len(), set.tags.len(), set.categories.len(), started.elapsed());
    info!("Report: {} errors, {} warnings, {} info",
        set.report.count(Severity::Error), set.report.count(Severity::Warning), set.report.count(Severity::Info));

    Ok(set)
}

#[cfg(test)]
mod tests {
    use std::{env, fs};

    use crate::test_data::{yaml_post, POST_BACK_BUTTON, POST_TEXTED, POST_TOML};

    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("postgraph-pipeline-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn settings(posts_dir: PathBuf) -> Settings {
        let mut config = Config::default();
        config.paths.posts_dir = posts_dir;
        config.defaults.workers = Some(2);
        Settings::from_config(&config).unwrap()
    }

    fn write_blog(root: &PathBuf) {
        fs::write(root.join("2025-11-23-custom-back-button.md"), POST_BACK_BUTTON).unwrap();
        fs::write(root.join("2025-10-02-app-icon.md"), POST_TOML).unwrap();
        fs::create_dir_all(root.join("20240212_composite_reuse")).unwrap();
        fs::write(root.join("20240212_composite_reuse").join("index.md"), POST_TEXTED).unwrap();
    }

    #[tokio::test]
    async fn test_run_is_idempotent() {
        let root = scratch_dir("idempotent");
        write_blog(&root);
        let settings = settings(root.clone());

        let first = run(&settings).await.unwrap();
        let second = run(&settings).await.unwrap();
        assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
        assert_eq!(first.posts.len(), 3);

        fs::remove_dir_all(&root).unwrap();
    }

    #[tokio::test]
    async fn test_dangling_reference_scenario() {
        let root = scratch_dir("dangling");
        write_blog(&root);
        let set = run(&settings(root.clone())).await.unwrap();

        let dangling: Vec<_> = set.report.violations.iter()
            .filter(|v| matches!(v, Violation::DanglingReference { .. }))
            .collect();
        assert_eq!(dangling.len(), 1);
        assert!(matches!(dangling[0], Violation::DanglingReference { target, .. } if target == "nonexistent-post"));

        assert!(set.post("composite-reuse-principle").is_some());
        assert_eq!(set.tags.get("design"), ["composite-reuse-principle"]);
        let entry = set.feed_entry("composite-reuse-principle").unwrap();
        assert_eq!(entry.previous.as_deref(), Some("accessing-the-app-icon"));
        assert_eq!(entry.next, None);
        assert_eq!(set.referenced_by("custom-back-button-in-swiftui"), ["composite-reuse-principle"]);
        assert!(set.referenced_by("composite-reuse-principle").is_empty());

        fs::remove_dir_all(&root).unwrap();
    }

    #[tokio::test]
    async fn test_slug_collision_scenario() {
        let root = scratch_dir("collision");
        let post = yaml_post("Custom Back Button", "2025-11-23 10:00:00 +0800", &["swiftui"], "Body\n");
        fs::write(root.join("2025-11-23-a.md"), &post).unwrap();
        fs::write(root.join("2025-11-23-b.md"), &post).unwrap();
        fs::write(root.join("2025-11-20-other.md"), yaml_post("Other", "2025-11-20 10:00:00 +0800", &["swiftui"], "")).unwrap();

        let set = run(&settings(root.clone())).await.unwrap();
        let collisions: Vec<_> = set.report.violations.iter()
            .filter(|v| matches!(v, Violation::SlugCollision { .. }))
            .collect();
        assert_eq!(collisions, vec![&Violation::SlugCollision {
            slug: "custom-back-button".to_string(),
            files: vec![root.join("2025-11-23-a.md"), root.join("2025-11-23-b.md")],
        }]);

        assert!(set.post("custom-back-button").is_none());
        assert_eq!(set.tags.get("swiftui"), ["other"]);
        assert_eq!(set.categories.get("Blog"), ["other"]);
        assert!(set.tags.iter().all(|(_, slugs)| !slugs.iter().any(|s| s == "custom-back-button")));

        fs::remove_dir_all(&root).unwrap();
    }

    #[tokio::test]
    async fn test_missing_date_scenario() {
        let root = scratch_dir("missing-date");
        write_blog(&root);
        fs::write(root.join("2025-11-24-undated.md"), "---\ntitle: Undated\ntags: [swift]\n---\nbody\n").unwrap();

        let set = run(&settings(root.clone())).await.unwrap();
        assert!(set.report.violations.contains(&Violation::MissingRequiredField {
            file: root.join("2025-11-24-undated.md"),
            field: "date".to_string(),
        }));
        assert_eq!(set.posts.len(), 3);
        assert!(set.post("undated").is_none());
        assert!(set.report.has_errors());

        fs::remove_dir_all(&root).unwrap();
    }

    #[tokio::test]
    async fn test_unreadable_file_is_reported_and_skipped() {
        let root = scratch_dir("unreadable");
        fs::write(root.join("2025-01-01-good.md"), yaml_post("Good", "2025-01-01 10:00:00 +0000", &["rust"], "fine\n")).unwrap();
        let mut latin1 = b"---\ntitle: Caf".to_vec();
        latin1.push(0xE9);
        latin1.extend_from_slice(b"\ndate: 2025-01-02 10:00:00 +0000\n---\nbody\n");
        fs::write(root.join("2025-01-02-latin1.md"), latin1).unwrap();

        let set = run(&settings(root.clone())).await.unwrap();
        assert_eq!(set.posts.len(), 1);
        assert!(set.post("good").is_some());
        assert_eq!(set.tags.get("rust"), ["good"]);

        assert_eq!(set.report.violations.len(), 1);
        assert!(matches!(&set.report.violations[0], Violation::UnreadableFile { file, .. } if *file == root.join("2025-01-02-latin1.md")));
        assert!(set.report.has_errors());

        fs::remove_dir_all(&root).unwrap();
    }

    #[tokio::test]
    async fn test_missing_posts_dir_fails() {
        let root = env::temp_dir().join(format!("postgraph-pipeline-absent-{}", std::process::id()));
        let _ = fs::remove_dir_all(&root);
        assert!(run(&settings(root)).await.is_err());
    }

    #[test]
    fn test_casing_is_reported_for_colliding_posts() {
        let files = [
            ContentFile::from_string("2025-11-23-a", "_posts/2025-11-23-a.md", &yaml_post("Same", "2025-11-23 10:00:00 +0000", &["SwiftUI"], "")),
            ContentFile::from_string("2025-11-23-b", "_posts/2025-11-23-b.md", &yaml_post("Same", "2025-11-23 11:00:00 +0000", &["swiftui"], "")),
        ];
        let outcomes = files.iter().map(|f| Post::from_content(f, None)).collect();
        let set = assemble(outcomes, "/posts/");

        assert!(set.posts.is_empty());
        assert!(set.tags.is_empty());
        let kinds: Vec<_> = set.report.violations.iter().map(|v| v.kind()).collect();
        assert_eq!(kinds, ["SlugCollision", "DuplicateTagCasing"]);
        assert!(set.report.violations.contains(&Violation::DuplicateTagCasing {
            tag: "swiftui".to_string(),
            variants: vec!["SwiftUI".to_string(), "swiftui".to_string()],
            files: vec![PathBuf::from("_posts/2025-11-23-a.md"), PathBuf::from("_posts/2025-11-23-b.md")],
        }));
    }

    #[test]
    fn test_tags_differing_in_case_share_one_entry() {
        let files = [
            ContentFile::from_string("a", "_posts/a.md", &yaml_post("One", "2025-01-02 00:00:00 +0000", &["SwiftUI"], "")),
            ContentFile::from_string("b", "_posts/b.md", &yaml_post("Two", "2025-01-01 00:00:00 +0000", &["swiftui"], "")),
        ];
        let outcomes = files.iter().map(|f| Post::from_content(f, None)).collect();
        let set = assemble(outcomes, "/posts/");

        assert_eq!(set.tags.len(), 1);
        assert_eq!(set.tags.get("swiftui"), ["one", "two"]);
        assert_eq!(set.report.violations.len(), 1);
        assert_eq!(set.report.violations[0].kind(), "DuplicateTagCasing");
        assert!(!set.report.has_errors());
    }

    #[test]
    fn test_empty_input() {
        let set = assemble(vec![], "/posts/");
        assert_eq!(set, DocumentSet::default());
    }

    #[test]
    fn test_unknown_extensions_are_dropped() {
        let mut config = Config::default();
        config.defaults.extensions = vec![".MD".to_string(), "txt".to_string()];
        let settings = Settings::from_config(&config).unwrap();
        assert_eq!(settings.extensions, ["md"]);
    }
}
