use std::io::ErrorKind;
use std::path::PathBuf;
use std::{env, fs, io};

use chrono::FixedOffset;
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
pub struct Paths {
    pub posts_dir: PathBuf,
    pub output: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Defaults {
    pub index_base_name: String,
    pub extensions: Vec<String>,
    pub link_prefix: String,
    pub default_offset: Option<String>,
    pub page_size: u32,
    pub workers: Option<usize>,
}

impl Default for Defaults {
    fn default() -> Self {
        Defaults {
            index_base_name: "index".to_string(),
            extensions: vec!["md".to_string(), "markdown".to_string(), "html".to_string(), "htm".to_string()],
            link_prefix: "/posts/".to_string(),
            default_offset: None,
            page_size: 10,
            workers: None,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct Log {
    pub level: LogLevel,
    pub log_to_console: bool,
    pub location: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Copy, Clone)]
pub enum LogLevel {
    Critical = 0,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub paths: Paths,
    #[serde(default)]
    pub defaults: Defaults,
    pub log: Option<Log>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            paths: Paths {
                posts_dir: PathBuf::from("_posts"),
                output: None,
            },
            defaults: Defaults::default(),
            log: None,
        }
    }
}

impl Config {
    /// Offset applied to front-matter dates that carry none.
    pub fn default_offset(&self) -> io::Result<Option<FixedOffset>> {
        match self.defaults.default_offset {
            None => Ok(None),
            Some(ref offset) => match offset.parse::<FixedOffset>() {
                Ok(offset) => Ok(Some(offset)),
                Err(e) => Err(io::Error::new(
                    ErrorKind::InvalidData, format!("Invalid default_offset {}: {}", offset, e))),
            },
        }
    }
}

fn parse_path(path: PathBuf) -> PathBuf {
    if path.starts_with("${exe_dir}") {
        let exe_dir = match env::current_exe() {
            Ok(exe) => exe.parent().map(|p| p.to_path_buf()).unwrap_or_default(),
            Err(_) => return path,
        };
        let str_path = path.to_string_lossy();
        PathBuf::from(str_path.replace("${exe_dir}", &exe_dir.to_string_lossy()))
    } else {
        path
    }
}

pub fn parse_config(cfg_content: &str) -> io::Result<Config> {
    let mut cfg: Config = match toml::from_str::<Config>(cfg_content) {
        Ok(cfg) => cfg,
        Err(e) => return Err(io::Error::new(
            ErrorKind::InvalidData, format!("Error parsing configuration file: {}", e))),
    };

    cfg.paths = Paths {
        posts_dir: parse_path(cfg.paths.posts_dir),
        output: cfg.paths.output.map(parse_path),
    };
    if let Some(ref mut log) = cfg.log {
        log.location = log.location.take().map(parse_path);
    }

    Ok(cfg)
}

pub fn read_config(cfg_path: &PathBuf) -> io::Result<Config> {
    let cfg_content = match fs::read_to_string(cfg_path) {
        Ok(content) => content,
        Err(e) => return Err(io::Error::new(e.kind(), format!("Error opening configuration file {}: {}", cfg_path.display(), e))),
    };

    parse_config(&cfg_content)
}

#[cfg(test)]
mod tests {
    use chrono::FixedOffset;

    use super::*;

    #[test]
    fn test_parse_full_config() {
        let cfg = parse_config(r##"
[paths]
posts_dir = "_posts"
output = "site.json"

[defaults]
index_base_name = "index"
extensions = ["md"]
link_prefix = "/blog/"
default_offset = "+08:00"
page_size = 5
workers = 2

[log]
level = "Debug"
log_to_console = true
"##).unwrap();

        assert_eq!(cfg.paths.posts_dir, PathBuf::from("_posts"));
        assert_eq!(cfg.paths.output, Some(PathBuf::from("site.json")));
        assert_eq!(cfg.defaults.extensions, vec!["md"]);
        assert_eq!(cfg.defaults.link_prefix, "/blog/");
        assert_eq!(cfg.defaults.page_size, 5);
        assert_eq!(cfg.defaults.workers, Some(2));
        assert_eq!(cfg.default_offset().unwrap(), FixedOffset::east_opt(8 * 3600));
        assert!(cfg.log.unwrap().log_to_console);
    }

    #[test]
    fn test_defaults_section_is_optional() {
        let cfg = parse_config("[paths]\nposts_dir = \"content\"\n").unwrap();
        assert_eq!(cfg.defaults.index_base_name, "index");
        assert_eq!(cfg.defaults.link_prefix, "/posts/");
        assert_eq!(cfg.defaults.page_size, 10);
        assert!(cfg.default_offset().unwrap().is_none());
        assert!(cfg.log.is_none());
    }

    #[test]
    fn test_invalid_offset() {
        let cfg = parse_config("[paths]\nposts_dir = \"p\"\n[defaults]\ndefault_offset = \"noon\"\n").unwrap();
        assert!(cfg.default_offset().is_err());
    }

    #[test]
    fn test_broken_config() {
        let err = parse_config("[paths\nposts_dir=").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }
}
