use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Guide {
    pub filename: String,
    pub title: String,
}

/// Markdown guides kept as files in one flat directory.
#[derive(Debug, Clone)]
pub struct GuideLibrary {
    dir: PathBuf,
}

impl GuideLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn list(&self) -> anyhow::Result<Vec<Guide>> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .with_context(|| format!("read guides dir {}", self.dir.display()))?;

        let mut guides = Vec::new();
        while let Some(entry) = entries.next_entry().await.context("read guides entry")? {
            let Ok(filename) = entry.file_name().into_string() else {
                continue;
            };
            if !filename.ends_with(".md") {
                continue;
            }
            guides.push(Guide {
                title: title_for(&filename),
                filename,
            });
        }
        guides.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(guides)
    }

    /// Reads one guide. `Ok(None)` when the name is unusable or the file does not exist.
    pub async fn read(&self, name: &str) -> anyhow::Result<Option<(String, String)>> {
        let Some(filename) = resolve_name(name) else {
            return Ok(None);
        };
        let path = self.dir.join(&filename);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some((filename, content))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("read guide {}", path.display())),
        }
    }
}

/// `earn_money_fast.md` -> `Earn Money Fast`.
pub fn title_for(filename: &str) -> String {
    let stem = filename.strip_suffix(".md").unwrap_or(filename).replace('_', " ");
    let mut out = String::with_capacity(stem.len());
    let mut prev_alpha = false;
    for c in stem.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

/// Appends `.md` when missing; refuses anything that could leave the directory.
fn resolve_name(name: &str) -> Option<String> {
    let name = name.trim();
    if name.is_empty()
        || name.starts_with('.')
        || name.contains("..")
        || name.contains('/')
        || name.contains('\\')
        || name.contains('"')
    {
        return None;
    }
    if name.ends_with(".md") {
        Some(name.to_string())
    } else {
        Some(format!("{name}.md"))
    }
}
