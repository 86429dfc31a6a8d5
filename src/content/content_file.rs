use std::{fs, io};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::content::ContentFormat;

#[derive(Debug, Clone)]
pub struct ContentFile {
    /// File stem, or the directory name for `dir/index.md` posts.
    pub stem: String,
    pub file_path: PathBuf,
    pub format: ContentFormat,
    pub raw_content: String,
}

impl ContentFile {
    pub fn from_file(stem: String, file_path: PathBuf) -> io::Result<ContentFile> {
        let format = match Self::guess_type(&file_path) {
            None => return Err(io::Error::new(ErrorKind::Unsupported, format!("Could not guess the type of the file {}", file_path.display()))),
            Some(format) => format,
        };

        let raw_content = match fs::read_to_string(&file_path) {
            Ok(content) => content,
            Err(e) => return Err(io::Error::new(e.kind(), format!("Error reading {}: {}", file_path.display(), e))),
        };

        Ok(ContentFile {
            stem,
            file_path,
            format,
            raw_content,
        })
    }

    pub fn from_string(stem: &str, file_path: &str, raw_content: &str) -> ContentFile {
        let file_path = PathBuf::from(file_path);
        let format = Self::guess_type(&file_path).unwrap_or(ContentFormat::Markdown);
        ContentFile {
            stem: stem.to_string(),
            file_path,
            format,
            raw_content: raw_content.to_string(),
        }
    }

    pub fn guess_type(file_name: &Path) -> Option<ContentFormat> {
        let ext = file_name.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "md" | "markdown" => Some(ContentFormat::Markdown),
            "html" | "htm" => Some(ContentFormat::Html),
            _ => None,
        }
    }
}
