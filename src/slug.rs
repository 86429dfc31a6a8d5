use std::path::Path;

use chrono::{DateTime, FixedOffset, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;

use crate::validation::Violation;

/// Date prefix and title fragment of a post file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileName {
    pub date: Option<NaiveDate>,
    pub fragment: String,
}

/// Lower-case, hyphen separated and ASCII only. Diacritics are transliterated
/// and every run of other characters becomes a single `-`.
pub fn slugify(text: &str) -> String {
    let ascii = unidecode::unidecode(text);
    let mut slug = String::with_capacity(ascii.len());
    let mut pending_dash = false;

    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Understands `2025-11-23-custom-back-button` and `20251123_custom_back_button`.
pub fn parse_file_name(stem: &str) -> FileName {
    lazy_static! {
        static ref FILE_NAME_REGEX: Regex = Regex::new(
            r"^(?:(?P<y1>\d{4})-(?P<m1>\d{2})-(?P<d1>\d{2})-|(?P<y2>\d{4})(?P<m2>\d{2})(?P<d2>\d{2})_)(?P<fragment>.*)$"
        ).unwrap();
    }

    let Some(caps) = FILE_NAME_REGEX.captures(stem) else {
        return FileName { date: None, fragment: stem.to_string() };
    };

    let part = |a: &str, b: &str| caps.name(a).or_else(|| caps.name(b)).and_then(|m| m.as_str().parse::<u32>().ok());
    let date = match (part("y1", "y2"), part("m1", "m2"), part("d1", "d2")) {
        (Some(y), Some(m), Some(d)) => NaiveDate::from_ymd_opt(y as i32, m, d),
        _ => None,
    };
    let fragment = caps.name("fragment").map(|m| m.as_str()).unwrap_or_default().to_string();

    FileName { date, fragment }
}

/// Slug from the title, falling back to the file name fragment when the title
/// has no usable characters.
pub fn resolve_slug(stem: &str, title: &str) -> Option<String> {
    let slug = slugify(title);
    if !slug.is_empty() {
        return Some(slug);
    }

    let slug = slugify(&parse_file_name(stem).fragment);
    if slug.is_empty() {
        None
    } else {
        Some(slug)
    }
}

/// The front matter date wins; a different calendar day in the file name is
/// only reported.
pub fn check_file_date(file: &Path, stem: &str, published_at: &DateTime<FixedOffset>) -> Option<Violation> {
    let file_date = parse_file_name(stem).date?;
    let published = published_at.date_naive();
    if file_date == published {
        return None;
    }

    Some(Violation::DateMismatch {
        file: file.to_path_buf(),
        file_date,
        published,
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::text_utils::parse_published_at;

    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Custom Back Button"), "custom-back-button");
        assert_eq!(slugify("  Composite -- Reuse: Principle!  "), "composite-reuse-principle");
        assert_eq!(slugify("Ábaco de Ação"), "abaco-de-acao");
        assert_eq!(slugify("SwiftUI 5.0 & iOS 17"), "swiftui-5-0-ios-17");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_slug_is_stable() {
        assert_eq!(slugify("Custom Back Button"), slugify("Custom Back Button"));
        assert_eq!(slugify("custom back button"), slugify("CUSTOM  BACK-BUTTON"));
    }

    #[test]
    fn test_parse_file_name() {
        let name = parse_file_name("2025-11-23-custom-back-button");
        assert_eq!(name.date, NaiveDate::from_ymd_opt(2025, 11, 23));
        assert_eq!(name.fragment, "custom-back-button");

        let name = parse_file_name("20240212_composite_reuse");
        assert_eq!(name.date, NaiveDate::from_ymd_opt(2024, 2, 12));
        assert_eq!(name.fragment, "composite_reuse");

        let name = parse_file_name("about");
        assert_eq!(name, FileName { date: None, fragment: "about".to_string() });

        let name = parse_file_name("2025-02-30-not-a-day");
        assert_eq!(name.date, None);
        assert_eq!(name.fragment, "not-a-day");
    }

    #[test]
    fn test_resolve_slug_fallback() {
        assert_eq!(resolve_slug("2025-11-23-a", "Custom Back Button"), Some("custom-back-button".to_string()));
        assert_eq!(resolve_slug("2025-11-23-symbols-post", "!?"), Some("symbols-post".to_string()));
        assert_eq!(resolve_slug("2025-11-23-", "???"), None);
    }

    #[test]
    fn test_check_file_date() {
        let file = PathBuf::from("_posts/2025-11-23-a.md");
        let same_day = parse_published_at("2025-11-23 23:30:00 +0800", None).unwrap();
        assert_eq!(check_file_date(&file, "2025-11-23-a", &same_day), None);

        let other_day = parse_published_at("2025-11-24 01:00:00 +0800", None).unwrap();
        assert_eq!(check_file_date(&file, "2025-11-23-a", &other_day), Some(Violation::DateMismatch {
            file: file.clone(),
            file_date: NaiveDate::from_ymd_opt(2025, 11, 23).unwrap(),
            published: NaiveDate::from_ymd_opt(2025, 11, 24).unwrap(),
        }));

        assert_eq!(check_file_date(&file, "undated", &other_day), None);
    }
}
