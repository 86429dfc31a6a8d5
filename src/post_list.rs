use std::{fs, io};
use std::path::{Path, PathBuf};

/// A content file found under the posts directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PostLink {
    /// File stem, or the directory name for directory posts.
    pub post_name: String,
    pub post_path: PathBuf,
}

pub struct PostList {
    pub root_dir: PathBuf,
    /// Base name of the file holding a directory post, e.g. `index`.
    pub post_file: String,
    pub extensions: Vec<String>,
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.') || name.starts_with('_')
}

impl PostList {
    /// Plain files and directory posts, sorted by path.
    pub fn retrieve_all(&self) -> io::Result<Vec<PostLink>> {
        let mut posts = self.retrieve_files()?;
        posts.extend(self.retrieve_dirs()?);
        posts.sort_by(|a, b| a.post_path.cmp(&b.post_path));
        Ok(posts)
    }

    fn has_extension(&self, path: &Path) -> bool {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) => self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)),
            None => false,
        }
    }

    pub fn retrieve_files(&self) -> io::Result<Vec<PostLink>> {
        let mut posts = vec![];
        for entry in fs::read_dir(self.root_dir.as_path())? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            let Some(file_name) = entry.file_name().to_str().map(|s| s.to_string()) else {
                continue;
            };
            if is_hidden(&file_name) || !self.has_extension(&path) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()).map(|s| s.to_string()) else {
                continue;
            };
            posts.push(PostLink {
                post_name: stem,
                post_path: path,
            });
        }
        Ok(posts)
    }

    /// Every directory holding a `<post_file>.<ext>` file is a post.
    pub fn retrieve_dirs(&self) -> io::Result<Vec<PostLink>> {
        let mut posts = vec![];
        for dir in Self::list_dirs(self.root_dir.as_path())? {
            let Some(dir_name) = dir.file_name().and_then(|n| n.to_str()).map(|s| s.to_string()) else {
                continue;
            };
            if is_hidden(&dir_name) {
                continue;
            }
            if let Some(post_path) = self.contains_post_file(&dir)? {
                posts.push(PostLink {
                    post_name: dir_name,
                    post_path,
                });
            }
        }
        Ok(posts)
    }

    fn list_dirs(posts_dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut dirs: Vec<PathBuf> = vec![];
        for entry in fs::read_dir(posts_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                dirs.push(entry.path());
            }
        }
        Ok(dirs)
    }

    fn contains_post_file(&self, dir: &Path) -> io::Result<Option<PathBuf>> {
        let mut candidates = vec![];
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            let stem_matches = path.file_stem().and_then(|s| s.to_str()) == Some(self.post_file.as_str());
            if stem_matches && self.has_extension(&path) {
                candidates.push(path);
            }
        }
        // index.html next to index.md: take the first one by name
        candidates.sort();
        Ok(candidates.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use std::env;

    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("postgraph-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_retrieve_all() -> io::Result<()> {
        let root = scratch_dir("post-list");
        fs::write(root.join("2025-11-23-custom-back-button.md"), "x")?;
        fs::write(root.join("2025-10-02-app-icon.markdown"), "x")?;
        fs::write(root.join("notes.txt"), "x")?;
        fs::write(root.join("_draft.md"), "x")?;
        fs::create_dir_all(root.join("20240212_composite_reuse"))?;
        fs::write(root.join("20240212_composite_reuse").join("index.md"), "x")?;
        fs::write(root.join("20240212_composite_reuse").join("ship.png"), "x")?;
        fs::create_dir_all(root.join("images"))?;
        fs::write(root.join("images").join("icon.png"), "x")?;

        let post_list = PostList {
            root_dir: root.clone(),
            post_file: "index".to_string(),
            extensions: vec!["md".to_string(), "markdown".to_string()],
        };
        let posts = post_list.retrieve_all()?;
        let names: Vec<_> = posts.iter().map(|p| p.post_name.as_str()).collect();
        assert_eq!(names, ["20240212_composite_reuse", "2025-10-02-app-icon", "2025-11-23-custom-back-button"]);
        assert_eq!(posts[0].post_path, root.join("20240212_composite_reuse").join("index.md"));

        fs::remove_dir_all(&root)?;
        Ok(())
    }

    #[test]
    fn test_missing_root() {
        let post_list = PostList {
            root_dir: PathBuf::from("/definitely/not/here"),
            post_file: "index".to_string(),
            extensions: vec!["md".to_string()],
        };
        assert!(post_list.retrieve_all().is_err());
    }
}
