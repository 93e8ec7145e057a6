//! Error types shared across the workflow.

use std::time::Duration;

use thiserror::Error;

/// Failure of a single completion request.
#[derive(Error, Debug)]
pub enum CompletionError {
    /// HTTP transport failed before or while receiving the response.
    #[error("completion request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The request exceeded the client timeout.
    #[error("completion request timed out after {0:?}")]
    Timeout(Duration),

    /// The provider answered with a non-success status.
    #[error("completion provider returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as returned by the provider.
        body: String,
    },

    /// A stream frame could not be decoded.
    #[error("malformed completion stream: {0}")]
    Stream(String),

    /// A scripted completion had nothing left to return, or was told to fail.
    #[error("{0}")]
    Scripted(String),
}

/// Failure reading or writing the persisted page.
#[derive(Error, Debug)]
pub enum PageError {
    /// Reading the current page failed for a reason other than absence.
    #[error("failed to read page {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Writing the staged temp file failed.
    #[error("failed to stage page in {dir}: {source}")]
    Stage {
        dir: String,
        #[source]
        source: std::io::Error,
    },

    /// Renaming the staged file over the destination failed.
    #[error("failed to commit page to {path}: {source}")]
    Commit {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The blocking write task did not finish.
    #[error("page write task aborted: {0}")]
    Task(String),
}

/// Failure resolving or rendering a prompt template.
#[derive(Error, Debug)]
pub enum PromptError {
    /// No override file and no built-in template exist under this name.
    #[error("unknown prompt template: {0}")]
    UnknownTemplate(String),

    /// The template references a variable the caller did not supply.
    #[error("prompt template {template} references missing variable {variable}")]
    MissingVariable { template: String, variable: String },

    /// The override file exists but could not be read.
    #[error("failed to read prompt template {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failure of a workflow run. Every variant is terminal for the run.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error(transparent)]
    Persistence(#[from] PageError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    /// The router produced an intent outside the table under the strict policy.
    #[error("unrecognized intent: {0:?}")]
    UnrecognizedIntent(String),

    /// `next` held a value the conditional edge does not know.
    #[error("unknown route: {0:?}")]
    UnknownRoute(String),

    /// The route step finished without setting `next`.
    #[error("route step did not choose a next step")]
    MissingRoute,
}
