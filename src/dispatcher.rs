//! Parallel fan-out of file parsing with fan-in aggregation
//!
//! Every input file becomes one blocking task on the tokio blocking pool. A
//! semaphore bounds how many run at once, and each task reports over a result
//! channel. The coordinator drains the channel until every file has reported,
//! which is the barrier before linking. A task that panics is reported as a
//! worker failure and contributes nothing; the remaining files are unaffected.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinError;
use tracing::{error, info, warn, Span};

use crate::error::Result;
use crate::metrics::PipelineMetrics;
use crate::models::{AttachmentRecord, MessageRecord, ParseStatus, ParsedFile};
use crate::parser::FileParser;

/// Default file extension of archive files
pub const DEFAULT_EXTENSION: &str = "eml";

/// Where a file's contribution was lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The parser caught an error reading or parsing the file
    Parse,
    /// The worker itself died before reporting
    Worker,
}

/// A file that contributed nothing because of a failure.
#[derive(Debug, Clone)]
pub struct FileFailure {
    /// Source file
    pub path: PathBuf,
    /// Parser or worker failure
    pub kind: FailureKind,
    /// Error text
    pub reason: String,
}

/// Union of every file's records.
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    /// Messages from all files, in no particular order
    pub messages: Vec<MessageRecord>,
    /// Attachments from all files, in no particular order
    pub attachments: Vec<AttachmentRecord>,
    /// Number of files found
    pub file_count: usize,
    /// Files that failed
    pub failures: Vec<FileFailure>,
}

impl DispatchOutcome {
    fn absorb(&mut self, parsed: ParsedFile) {
        if let Some(message) = parsed.message {
            self.messages.push(message);
        }
        self.attachments.extend(parsed.attachments);
    }
}

/// Bounded worker pool that parses a directory of archive files.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    workers: usize,
    extension: String,
    span: Span,
}

impl Dispatcher {
    /// Create a dispatcher with `workers` concurrent parsers (at least one).
    ///
    /// Worker logs are recorded under the span that is current at construction;
    /// use [`Dispatcher::with_span`] to choose another.
    #[must_use]
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            extension: DEFAULT_EXTENSION.to_string(),
            span: Span::current(),
        }
    }

    /// Only pick up files with this extension (no leading dot).
    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Record all worker output under `span`.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Number of concurrent workers
    #[must_use]
    pub const fn workers(&self) -> usize {
        self.workers
    }

    /// List the archive files directly inside `dir`, sorted by path.
    ///
    /// Fails only when the directory itself cannot be read.
    pub fn discover(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let matches = path
                .extension()
                .is_some_and(|ext| ext.to_string_lossy() == self.extension.as_str());
            if matches && !entry.file_type()?.is_dir() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Parse every archive file in `dir` and aggregate the results.
    pub async fn dispatch(&self, dir: &Path) -> Result<DispatchOutcome> {
        let files = self.discover(dir)?;
        if files.is_empty() {
            warn!("No .{} files found in {}", self.extension, dir.display());
            return Ok(DispatchOutcome::default());
        }
        info!("Found {} .{} files in {}", files.len(), self.extension, dir.display());

        Ok(self.dispatch_files(files).await)
    }

    /// Parse the given files, one fresh [`FileParser`] per file.
    pub async fn dispatch_files(&self, files: Vec<PathBuf>) -> DispatchOutcome {
        self.dispatch_with(files, |path: &Path| FileParser::new().parse_file(path))
            .await
    }

    /// Run `task` over every file on the worker pool and gather the results.
    pub async fn dispatch_with<F>(&self, files: Vec<PathBuf>, task: F) -> DispatchOutcome
    where
        F: Fn(&Path) -> ParsedFile + Send + Sync + 'static,
    {
        let started = Instant::now();
        let task = Arc::new(task);
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let (tx, mut rx) = mpsc::channel::<(PathBuf, std::result::Result<ParsedFile, JoinError>)>(
            self.workers,
        );

        let mut pending: HashSet<PathBuf> = files.iter().cloned().collect();
        let mut outcome = DispatchOutcome {
            file_count: files.len(),
            ..DispatchOutcome::default()
        };
        info!(workers = self.workers, "Processing started...");

        for path in files {
            let tx = tx.clone();
            let task = Arc::clone(&task);
            let semaphore = Arc::clone(&semaphore);
            let span = self.span.clone();
            tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                let worker_path = path.clone();
                let joined = tokio::task::spawn_blocking(move || {
                    let _entered = span.enter();
                    task(&worker_path)
                })
                .await;
                // The receiver only goes away if the coordinator was dropped.
                let _ = tx.send((path, joined)).await;
            });
        }
        drop(tx);

        while let Some((path, joined)) = rx.recv().await {
            pending.remove(&path);
            match joined {
                Ok(parsed) => {
                    if let ParseStatus::Failed(reason) = &parsed.status {
                        outcome.failures.push(FileFailure {
                            path,
                            kind: FailureKind::Parse,
                            reason: reason.clone(),
                        });
                    }
                    outcome.absorb(parsed);
                }
                Err(e) => {
                    error!(file = %path.display(), "Parallel worker failed: {e}");
                    outcome.failures.push(FileFailure {
                        path,
                        kind: FailureKind::Worker,
                        reason: e.to_string(),
                    });
                }
            }
        }

        // A task that died before sending still must not vanish silently.
        for path in pending {
            error!(file = %path.display(), "Parallel worker exited without a result");
            outcome.failures.push(FileFailure {
                path,
                kind: FailureKind::Worker,
                reason: "worker exited without a result".to_string(),
            });
        }

        PipelineMetrics::record_dispatch(&outcome, started.elapsed());
        info!("Finished processing {} files.", outcome.file_count);
        info!(
            messages = outcome.messages.len(),
            attachments = outcome.attachments.len(),
            failed = outcome.failures.len(),
            "Dispatch complete"
        );

        outcome
    }
}
