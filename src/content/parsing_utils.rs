use lazy_static::lazy_static;
use regex::Regex;

/// Title from the first `# ` heading of a markdown body.
pub fn parse_title_markdown(body: &str) -> Option<String> {
    body.lines()
        .find(|line| line.starts_with("# "))
        .map(|line| line[2..].trim().to_string())
        .filter(|title| !title.is_empty())
}

/// Title from the first `<h1>` or `<h2>` of an HTML body.
pub fn parse_title_html(body: &str) -> Option<String> {
    lazy_static! {
        static ref TITLE_REGEX: Regex = Regex::new(r"<h[12]>(?P<title>.+)</h[12]>").unwrap();
    }

    body.lines()
        .find_map(|line| TITLE_REGEX.captures(line).and_then(|cap| cap.name("title").map(|v| v.as_str().trim().to_string())))
        .filter(|title| !title.is_empty())
}

pub fn split_words(words: &str) -> Vec<String> {
    words.split_whitespace()
        .map(|s| s.to_string())
        .collect()
}

pub fn extract_texted_header(line: &str) -> Option<(&str, &str)> {
    lazy_static! {
        static ref HEADER_REGEX: Regex = Regex::new(r"^\s*\[(?P<key>\w+)\]: # \((?P<value>.*)\)\s*$").unwrap();
    }
    extract_header_key_val(line, &HEADER_REGEX)
}

fn extract_header_key_val<'a>(line: &'a str, header_regex: &Regex) -> Option<(&'a str, &'a str)> {
    header_regex.captures(line).and_then(|cap| {
        let key = cap.name("key").map(|key| key.as_str());
        let val = cap.name("value").map(|val| val.as_str());
        match (key, val) {
            (Some(key), Some(val)) => Some((key, val)),
            _ => None
        }
    })
}

/// 1-based line number of a byte offset.
pub fn line_of_offset(text: &str, offset: usize) -> usize {
    let offset = offset.min(text.len());
    text.as_bytes()[..offset].iter().filter(|b| **b == b'\n').count() + 1
}
