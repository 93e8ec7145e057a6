//! Prompt template store.
//!
//! Templates are looked up by name. A file `<dir>/<name>.txt` overrides the
//! built-in default of the same name. Resolved templates are cached for the
//! lifetime of the store, so each file is read at most once unless
//! [`PromptStore::preload`] is called again.
//!
//! Placeholders use `{{variable}}` syntax.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use regex::Regex;

use crate::error::PromptError;

/// Classifies the user's message into an intent keyword.
pub const DETERMINE_USER_INTENT: &str = "determine_user_intent";
/// Produces a design plan for the page.
pub const DESIGN_AND_PLAN: &str = "design_and_plan";
/// Writes the full HTML document.
pub const HTML_GENERATOR: &str = "html_generator";
/// Replies conversationally without touching the page.
pub const RESPOND_TO_USER: &str = "respond_to_user";

const BUILTIN: &[(&str, &str)] = &[
    (
        DETERMINE_USER_INTENT,
        "You route requests for a web page authoring assistant.\n\
         Decide whether the user wants the page to be created or changed, or \
         whether they are only asking a question or chatting.\n\n\
         Current page HTML (may be empty):\n{{existing_html_content}}\n\n\
         User message:\n{{user_message}}\n\n\
         Answer with exactly one word: WRITE_CODE or RESPOND_NATURALLY.",
    ),
    (
        DESIGN_AND_PLAN,
        "You are a senior web designer. Write a concise, numbered design plan \
         for the change the user asks for. Describe layout, sections, colors \
         and content. Do not write code.\n\n\
         Current page HTML (may be empty):\n{{existing_html_content}}\n\n\
         User request:\n{{user_message}}",
    ),
    (
        HTML_GENERATOR,
        "You are an expert front-end developer. Produce one complete, \
         self-contained HTML document (inline CSS and JS) that applies the \
         design plan to the current page. Return the full document starting \
         with <html> and ending with </html>.\n\n\
         Current page HTML (may be empty):\n{{existing_html_content}}\n\n\
         Design plan:\n{{design_plan}}\n\n\
         User request:\n{{user_message}}",
    ),
    (
        RESPOND_TO_USER,
        "You are a friendly assistant that helps users build a web page. \
         Answer the user's message directly and briefly. You may refer to the \
         current page but do not produce code.\n\n\
         Current page HTML (may be empty):\n{{existing_html_content}}\n\n\
         User message:\n{{user_message}}",
    ),
];

/// Named prompt templates with per-store caching.
#[derive(Debug)]
pub struct PromptStore {
    dir: Option<PathBuf>,
    cache: RwLock<HashMap<String, Arc<str>>>,
    placeholder: Regex,
}

impl PromptStore {
    /// Store backed by override files in `dir`, falling back to built-ins.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_dir(Some(dir.into()))
    }

    /// Store that only knows the built-in templates.
    pub fn builtin() -> Self {
        Self::with_dir(None)
    }

    fn with_dir(dir: Option<PathBuf>) -> Self {
        Self {
            dir,
            cache: RwLock::new(HashMap::new()),
            placeholder: Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_]*)\s*\}\}")
                .expect("placeholder pattern is valid"),
        }
    }

    /// Resolve every known template now instead of on first use.
    pub fn preload(&self) -> Result<usize, PromptError> {
        for (name, _) in BUILTIN {
            self.template(name)?;
        }
        let count = self.cache.read().map(|c| c.len()).unwrap_or_default();
        tracing::info!(templates = count, dir = ?self.dir, "Prompt templates preloaded");
        Ok(count)
    }

    /// Fetch a template by name, reading the override file on first use.
    pub fn template(&self, name: &str) -> Result<Arc<str>, PromptError> {
        if let Some(hit) = self.cache.read().ok().and_then(|c| c.get(name).cloned()) {
            return Ok(hit);
        }

        let loaded: Arc<str> = match self.read_override(name)? {
            Some(text) => {
                tracing::debug!(template = %name, "Loaded prompt override");
                text.into()
            }
            None => BUILTIN
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, body)| Arc::<str>::from(*body))
                .ok_or_else(|| PromptError::UnknownTemplate(name.to_string()))?,
        };

        if let Ok(mut cache) = self.cache.write() {
            cache
                .entry(name.to_string())
                .or_insert_with(|| Arc::clone(&loaded));
        }
        Ok(loaded)
    }

    /// Render `name` with the given variables.
    pub fn render(&self, name: &str, vars: &[(&str, &str)]) -> Result<String, PromptError> {
        let template = self.template(name)?;
        self.fill(name, &template, vars)
    }

    fn fill(&self, name: &str, template: &str, vars: &[(&str, &str)]) -> Result<String, PromptError> {
        let mut out = String::with_capacity(template.len());
        let mut last = 0;

        for caps in self.placeholder.captures_iter(template) {
            let (Some(whole), Some(var)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let value = vars
                .iter()
                .find(|(k, _)| *k == var.as_str())
                .map(|(_, v)| *v)
                .ok_or_else(|| PromptError::MissingVariable {
                    template: name.to_string(),
                    variable: var.as_str().to_string(),
                })?;
            out.push_str(&template[last..whole.start()]);
            out.push_str(value);
            last = whole.end();
        }
        out.push_str(&template[last..]);
        Ok(out)
    }

    fn read_override(&self, name: &str) -> Result<Option<String>, PromptError> {
        let Some(dir) = &self.dir else {
            return Ok(None);
        };
        let path = override_path(dir, name);
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(PromptError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }
}

fn override_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.txt"))
}
