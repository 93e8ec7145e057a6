//! The persisted page and HTML extraction.
//!
//! There is exactly one page on disk. Writers go through
//! [`PageStore::write_atomic`], which stages the new document in a temp file
//! next to the destination and renames it into place, so readers only ever
//! see the previous document or the complete new one. A staged file that is
//! never committed is removed when it is dropped.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tempfile::NamedTempFile;

use crate::error::PageError;

static HTML_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<html[\s\S]*?</html>").expect("html span pattern is valid"));
static FENCE_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```html\s*").expect("fence pattern is valid"));

/// Return only the first `<html>`…`</html>` span of `text`, without Markdown
/// code fences, or an empty string when there is no such span.
///
/// ```rust
/// use pagecraft::page::extract_html_only;
///
/// let reply = "Here is code:\n```html\n<html><body>Hi</body></html>\n```";
/// assert_eq!(extract_html_only(reply), "<html><body>Hi</body></html>");
/// assert_eq!(extract_html_only("no html here"), "");
/// ```
pub fn extract_html_only(text: &str) -> String {
    let Some(span) = HTML_SPAN.find(text) else {
        return String::new();
    };
    let without_open = FENCE_OPEN.replace_all(span.as_str(), "");
    without_open.replace("```", "").trim().to_string()
}

/// Location of the single generated page.
#[derive(Debug, Clone)]
pub struct PageStore {
    path: PathBuf,
}

impl PageStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current page content; an absent page reads as the empty string.
    pub async fn read_existing(&self) -> Result<String, PageError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No page yet, using empty content");
                Ok(String::new())
            }
            Err(source) => Err(PageError::Read {
                path: self.path.display().to_string(),
                source,
            }),
        }
    }

    /// Current page reduced to its HTML document.
    pub async fn read_extracted(&self) -> Result<String, PageError> {
        let raw = self.read_existing().await?;
        Ok(extract_html_only(&raw))
    }

    /// Write `content` next to the destination without making it visible.
    pub fn stage(&self, content: &str) -> Result<StagedPage, PageError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let stage_err = |source| PageError::Stage {
            dir: dir.display().to_string(),
            source,
        };

        std::fs::create_dir_all(&dir).map_err(stage_err)?;

        let mut file = tempfile::Builder::new()
            .prefix(".tmp_")
            .suffix(".html")
            .tempfile_in(&dir)
            .map_err(stage_err)?;
        file.write_all(content.as_bytes()).map_err(stage_err)?;
        file.flush().map_err(stage_err)?;
        file.as_file().sync_all().map_err(stage_err)?;

        Ok(StagedPage {
            file,
            dest: self.path.clone(),
        })
    }

    /// Replace the page with `content` atomically.
    pub async fn write_atomic(&self, content: String) -> Result<(), PageError> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.stage(&content)?.commit())
            .await
            .map_err(|e| PageError::Task(e.to_string()))??;

        tracing::info!(path = %self.path.display(), "Page written");
        Ok(())
    }
}

/// A fully written temp file waiting to replace the page.
#[derive(Debug)]
pub struct StagedPage {
    file: NamedTempFile,
    dest: PathBuf,
}

impl StagedPage {
    #[must_use]
    pub fn temp_path(&self) -> &Path {
        self.file.path()
    }

    /// Rename the staged file over the destination.
    pub fn commit(self) -> Result<(), PageError> {
        let dest = self.dest;
        self.file
            .persist(&dest)
            .map(drop)
            .map_err(|e| PageError::Commit {
                path: dest.display().to_string(),
                source: e.error,
            })
    }
}
