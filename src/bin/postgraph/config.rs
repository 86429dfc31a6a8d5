use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

use postgraph::config::{read_config, Config};

use crate::CFG_FILE_NAME;

fn get_config_path() -> Option<PathBuf> {
    let mut dirs_to_search = vec![];

    if let Some(exe_dir) = env::current_exe().ok().and_then(|exe| exe.parent().map(|p| p.to_path_buf())) {
        dirs_to_search.push(exe_dir);
    }
    if let Ok(cur_dir) = env::current_dir() {
        dirs_to_search.push(cur_dir);
    }
    if let Some(cfg_dir) = dirs::config_dir() {
        dirs_to_search.push(cfg_dir);
    }

    dirs_to_search.into_iter()
        .map(|dir| dir.join(CFG_FILE_NAME))
        .find(|path| path.exists())
}

/// Returns the configuration and the file it came from. Without an explicit
/// path and with no file found, the built-in defaults are used.
pub(crate) fn open_config(cfg_path: Option<PathBuf>) -> Result<(Config, Option<PathBuf>)> {
    let Some(config_path) = cfg_path.or_else(get_config_path) else {
        return Ok((Config::default(), None));
    };

    let config = read_config(&config_path)
        .with_context(|| format!("Could not load {}", config_path.display()))?;
    Ok((config, Some(config_path)))
}
