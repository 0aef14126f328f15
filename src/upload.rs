use crate::error::ViewerError;
use crate::fbx;
use crate::mesh::Model;
use crate::progress::{read_with_progress, LoadingIndicator};
use crate::validate::validate_file;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

#[derive(Debug)]
pub enum ImportOutcome {
    Imported { path: PathBuf, name: String, model: Box<Model> },
    Rejected { path: PathBuf, error: ViewerError },
}

impl ImportOutcome {
    pub fn path(&self) -> &Path {
        match self {
            ImportOutcome::Imported { path, .. } | ImportOutcome::Rejected { path, .. } => path,
        }
    }
}

/// Display name of a candidate file: its file name, or the full path as a fallback.
pub fn display_name(path: &Path) -> String {
    path.file_name().map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned())
}

/// Validate, read and parse one file. Never panics on bad input; every
/// failure becomes a `Rejected` outcome.
pub fn import_file(path: &Path, indicator: &LoadingIndicator) -> ImportOutcome {
    let name = display_name(path);
    let rejected = |error| ImportOutcome::Rejected { path: path.to_path_buf(), error };
    log::info!("[upload] checking {}", path.display());
    if !validate_file(path) {
        log::warn!("[upload] {name} rejected by header check");
        return rejected(ViewerError::InvalidFormat { name });
    }
    let guard = indicator.begin();
    let bytes = match read_with_progress(path, |percent| guard.report(percent)) {
        Ok(bytes) => bytes,
        Err(err) => return rejected(err),
    };
    match fbx::load_model(&bytes, &name) {
        Ok(model) => ImportOutcome::Imported { path: path.to_path_buf(), name, model: Box::new(model) },
        Err(err) => {
            log::error!("[upload] {err}");
            rejected(err)
        }
    }
}

/// Files waiting for import, processed strictly front to back. New batches
/// append to the tail.
#[derive(Debug, Default)]
pub struct UploadQueue {
    pending: VecDeque<PathBuf>,
}

impl UploadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue<I, P>(&mut self, batch: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        for path in batch {
            let path = path.into();
            log::debug!("[upload] queued {}", path.display());
            self.pending.push_back(path);
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn process_next(&mut self, indicator: &LoadingIndicator) -> Option<ImportOutcome> {
        let path = self.pending.pop_front()?;
        Some(import_file(&path, indicator))
    }

    /// Runs the whole queue in order; a failed file never stops the batch.
    pub fn process_all(&mut self, indicator: &LoadingIndicator) -> Vec<ImportOutcome> {
        let mut outcomes = Vec::with_capacity(self.pending.len());
        while let Some(outcome) = self.process_next(indicator) {
            outcomes.push(outcome);
        }
        outcomes
    }
}

/// Single background thread that owns an [`UploadQueue`]. Submissions append
/// to its queue and outcomes come back in submission order, one parse at a time.
pub struct ImportWorker {
    tx: mpsc::Sender<PathBuf>,
    rx: mpsc::Receiver<ImportOutcome>,
    in_flight: usize,
}

impl ImportWorker {
    pub fn new(indicator: LoadingIndicator) -> Option<Self> {
        let (tx, job_rx) = mpsc::channel::<PathBuf>();
        let (result_tx, rx) = mpsc::channel();
        let builder = thread::Builder::new().name("fbx-import".to_string());
        let spawned = builder.spawn(move || {
            let mut queue = UploadQueue::new();
            loop {
                if queue.is_empty() {
                    match job_rx.recv() {
                        Ok(path) => queue.enqueue([path]),
                        Err(_) => break,
                    }
                }
                queue.enqueue(job_rx.try_iter());
                let Some(outcome) = queue.process_next(&indicator) else {
                    continue;
                };
                if result_tx.send(outcome).is_err() {
                    break;
                }
            }
        });
        match spawned {
            Ok(_) => Some(Self { tx, rx, in_flight: 0 }),
            Err(err) => {
                log::error!("[upload] failed to spawn import worker: {err:?}");
                None
            }
        }
    }

    /// Appends a batch. Paths the worker can no longer accept are handed back.
    pub fn submit<I, P>(&mut self, batch: I) -> Result<(), Vec<PathBuf>>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut refused = Vec::new();
        for path in batch {
            let path = path.into();
            if !refused.is_empty() {
                refused.push(path);
                continue;
            }
            match self.tx.send(path) {
                Ok(()) => self.in_flight += 1,
                Err(mpsc::SendError(path)) => refused.push(path),
            }
        }
        if refused.is_empty() {
            Ok(())
        } else {
            Err(refused)
        }
    }

    pub fn pending(&self) -> usize {
        self.in_flight
    }

    pub fn drain(&mut self) -> Vec<ImportOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(outcome) = self.rx.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Blocks for the next outcome; `None` once the worker has gone away.
    pub fn recv(&mut self) -> Option<ImportOutcome> {
        let outcome = self.rx.recv().ok()?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_files_do_not_stop_the_batch() {
        let dir = tempfile::tempdir().expect("temp dir");
        let png = dir.path().join("photo.png");
        std::fs::write(&png, [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]).expect("write");
        let missing = dir.path().join("gone.fbx");

        let mut queue = UploadQueue::new();
        queue.enqueue([png.clone(), missing.clone()]);
        let indicator = LoadingIndicator::new();
        let outcomes = queue.process_all(&indicator);

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].path(), png.as_path());
        assert!(matches!(
            &outcomes[0],
            ImportOutcome::Rejected { error: ViewerError::InvalidFormat { name }, .. } if name == "photo.png"
        ));
        assert!(matches!(&outcomes[1], ImportOutcome::Rejected { error: ViewerError::InvalidFormat { .. }, .. }));
        assert!(queue.is_empty());
        assert!(!indicator.snapshot().visible);
    }

    #[test]
    fn valid_header_with_garbage_body_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("broken.fbx");
        std::fs::write(&path, b"Kaydara FBX Binary  \0\x1a\0garbage").expect("write");
        let indicator = LoadingIndicator::new();
        let outcome = import_file(&path, &indicator);
        assert!(matches!(outcome, ImportOutcome::Rejected { error: ViewerError::Parse { .. }, .. }));
        assert!(!indicator.snapshot().visible);
    }

    #[test]
    fn worker_returns_outcomes_in_submission_order() {
        let dir = tempfile::tempdir().expect("temp dir");
        let paths: Vec<PathBuf> = (0..4).map(|i| dir.path().join(format!("missing-{i}.fbx"))).collect();
        let mut worker = ImportWorker::new(LoadingIndicator::new()).expect("spawn worker");
        worker.submit(paths.clone()).expect("submit");
        assert_eq!(worker.pending(), 4);
        let received: Vec<PathBuf> = (0..4).filter_map(|_| worker.recv()).map(|o| o.path().to_path_buf()).collect();
        assert_eq!(received, paths);
        assert_eq!(worker.pending(), 0);
    }
}
