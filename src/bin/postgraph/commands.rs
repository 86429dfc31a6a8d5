use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use spdlog::{info, warn};

use postgraph::paginator::Paginator;
use postgraph::pipeline::DocumentSet;
use postgraph::post::Post;
use postgraph::text_utils::format_date_time;
use postgraph::validation::Severity;

/// Writes the document set as JSON to `output`, or to `out` when there is none.
/// With `strict`, any error-level violation fails the command.
pub(crate) fn build_cmd(set: &DocumentSet, output: Option<PathBuf>, strict: bool, out: &mut impl Write) -> Result<ExitCode> {
    let json = set.to_json()?;

    match output {
        Some(path) => {
            fs::write(&path, json).with_context(|| format!("Could not write {}", path.display()))?;
            info!("Document set written to {}", path.display());
        }
        None => writeln!(out, "{}", json)?,
    }

    for violation in &set.report.violations {
        match violation.severity() {
            Severity::Error => warn!("{}", violation),
            _ => info!("{}", violation),
        }
    }

    if strict && set.report.has_errors() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

pub(crate) fn check_cmd(set: &DocumentSet, out: &mut impl Write) -> Result<ExitCode> {
    for (severity, violations) in set.report.by_severity() {
        writeln!(out, "{:?} ({})", severity, violations.len())?;
        for violation in violations {
            writeln!(out, "  {}", violation)?;
        }
    }
    writeln!(out, "{} posts, {} violations", set.posts.len(), set.report.violations.len())?;

    if set.report.has_errors() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

#[derive(Debug, Default)]
pub(crate) struct FeedFilter {
    pub tag: Option<String>,
    pub category: Option<String>,
}

fn filter_posts<'a>(set: &'a DocumentSet, filter: &FeedFilter) -> Vec<&'a Post> {
    let mut posts: Vec<&Post> = set.posts.iter().collect();
    if let Some(ref tag) = filter.tag {
        let slugs = set.tags.get(tag);
        posts.retain(|p| slugs.contains(&p.slug));
    }
    if let Some(ref category) = filter.category {
        let slugs = set.categories.get(category);
        posts.retain(|p| slugs.contains(&p.slug));
    }
    posts
}

pub(crate) fn feed_cmd(set: &DocumentSet, filter: &FeedFilter, page: usize, page_size: usize, out: &mut impl Write) -> Result<ExitCode> {
    let posts = filter_posts(set, filter);
    let paginator = Paginator::new(&posts, page_size);
    let page = paginator.page(page).map_err(|e| anyhow!(e))?;

    for post in page.items {
        let (date, time) = format_date_time(&post.published_at);
        writeln!(out, "{} {}  {}  {}", date, time, post.slug, post.title)?;
    }
    writeln!(out, "Page {} of {} ({} posts)", page.number, page.page_count.max(1), page.total)?;

    Ok(ExitCode::SUCCESS)
}

/// Most used first, ties by name.
pub(crate) fn tags_cmd(set: &DocumentSet, out: &mut impl Write) -> Result<ExitCode> {
    let mut tags: Vec<(&String, usize)> = set.tags.iter().map(|(tag, slugs)| (tag, slugs.len())).collect();
    tags.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    for (tag, count) in tags {
        writeln!(out, "{:>4}  {}", count, tag)?;
    }
    Ok(ExitCode::SUCCESS)
}
