//! Spool directory source.
//!
//! The mail transport drops one `.eml` file per message into the spool root. After
//! ingestion each file is moved to `processed/`, or to `failed/` when it could not
//! be parsed or was rejected as malformed. Files left in the root are retried on the
//! next poll.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use thiserror::Error;

use crate::ingest::{ParseEmailError, parse_email};
use crate::models::IncomingMessage;

const PROCESSED_DIR: &str = "processed";
const FAILED_DIR: &str = "failed";
const EXTENSION: &str = "eml";

#[derive(Debug, Error)]
pub enum SpoolError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseEmailError,
    },
    #[error("failed to create parser pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> SpoolError + '_ {
    move |source| SpoolError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[derive(Debug, Clone)]
pub struct SpoolDirectory {
    root: PathBuf,
}

impl SpoolDirectory {
    /// Open a spool rooted at `root`, creating it and its archive folders if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, SpoolError> {
        let root = root.into();
        for dir in [root.clone(), root.join(PROCESSED_DIR), root.join(FAILED_DIR)] {
            fs::create_dir_all(&dir).map_err(io_error(&dir))?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.root.join(PROCESSED_DIR)
    }

    pub fn failed_dir(&self) -> PathBuf {
        self.root.join(FAILED_DIR)
    }

    /// `.eml` files waiting in the spool root, sorted by file name.
    pub fn pending(&self) -> Result<Vec<PathBuf>, SpoolError> {
        let entries = fs::read_dir(&self.root).map_err(io_error(&self.root))?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(io_error(&self.root))?.path();
            if path.is_file() && is_message_file(&path) {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }

    pub fn mark_processed(&self, path: &Path) -> Result<PathBuf, SpoolError> {
        self.move_into(path, &self.processed_dir())
    }

    pub fn mark_failed(&self, path: &Path) -> Result<PathBuf, SpoolError> {
        self.move_into(path, &self.failed_dir())
    }

    fn move_into(&self, path: &Path, dir: &Path) -> Result<PathBuf, SpoolError> {
        let Some(name) = path.file_name() else {
            return Err(SpoolError::Io {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "not a file path"),
            });
        };

        let target = dir.join(name);
        fs::rename(path, &target).map_err(io_error(path))?;
        Ok(target)
    }
}

/// Whether `path` looks like a spooled message (`*.eml`, case-insensitive).
pub fn is_message_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(EXTENSION))
        .unwrap_or(false)
}

/// Read and parse message files in parallel on a pool sized to the machine.
///
/// Results keep the input order. Individual failures are logged and returned
/// alongside their path; only pool creation fails the whole call.
pub fn parse_files_parallel(
    paths: Vec<PathBuf>,
) -> Result<Vec<(PathBuf, Result<IncomingMessage, SpoolError>)>, SpoolError> {
    let total = paths.len();
    log::debug!("parsing {} spooled messages with {} threads", total, num_cpus::get());

    let thread_pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_cpus::get())
        .build()?;

    let parse_errors = Arc::new(AtomicUsize::new(0));

    let parsed = thread_pool.install(|| {
        paths
            .into_par_iter()
            .map(|path| {
                let result = fs::read(&path)
                    .map_err(io_error(&path))
                    .and_then(|raw| {
                        parse_email(&raw).map_err(|source| SpoolError::Parse {
                            path: path.clone(),
                            source,
                        })
                    });

                if let Err(e) = &result {
                    parse_errors.fetch_add(1, Ordering::Relaxed);
                    log::warn!("{}", e);
                }
                (path, result)
            })
            .collect::<Vec<_>>()
    });

    log::debug!(
        "parsing complete: {} ok, {} errors",
        total - parse_errors.load(Ordering::Relaxed),
        parse_errors.load(Ordering::Relaxed)
    );

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MESSAGE: &str = "Message-ID: <a@x>\r\nFrom: dev@example.com\r\nSubject: Enums\r\nDate: Fri, 04 Dec 2020 10:15:00 +0000\r\n\r\nHello\r\n";

    #[test]
    fn pending_lists_only_messages() {
        let dir = tempfile::tempdir().unwrap();
        let spool = SpoolDirectory::open(dir.path()).unwrap();
        fs::write(dir.path().join("b.eml"), MESSAGE).unwrap();
        fs::write(dir.path().join("a.EML"), MESSAGE).unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let names: Vec<String> = spool
            .pending()
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.EML", "b.eml"]);
    }

    #[test]
    fn marking_moves_files() {
        let dir = tempfile::tempdir().unwrap();
        let spool = SpoolDirectory::open(dir.path()).unwrap();
        let ok = dir.path().join("ok.eml");
        let bad = dir.path().join("bad.eml");
        fs::write(&ok, MESSAGE).unwrap();
        fs::write(&bad, "garbage").unwrap();

        let moved = spool.mark_processed(&ok).unwrap();
        spool.mark_failed(&bad).unwrap();

        assert!(moved.exists());
        assert!(!ok.exists());
        assert!(spool.failed_dir().join("bad.eml").exists());
        assert!(spool.pending().unwrap().is_empty());
    }

    #[test]
    fn parses_in_parallel_keeping_order() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("1.eml");
        let bad = dir.path().join("2.eml");
        fs::write(&good, MESSAGE).unwrap();
        fs::write(&bad, "Subject: no id\r\n\r\nbody").unwrap();

        let parsed = parse_files_parallel(vec![good.clone(), bad.clone()]).unwrap();

        assert_eq!(parsed[0].0, good);
        assert_eq!(parsed[0].1.as_ref().unwrap().id, "a@x");
        assert_eq!(parsed[1].0, bad);
        assert!(matches!(parsed[1].1, Err(SpoolError::Parse { .. })));
    }
}
