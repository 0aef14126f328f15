use crate::error::ViewerError;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

const READ_CHUNK: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LoadingState {
    pub visible: bool,
    /// 0..=100
    pub percent: f32,
    /// Loads currently holding a [`LoadingGuard`].
    pub active: usize,
}

/// Shared loading indicator. Cloned into the import worker so parse progress
/// shows up without a round-trip through the UI thread.
#[derive(Debug, Clone, Default)]
pub struct LoadingIndicator {
    state: Arc<Mutex<LoadingState>>,
}

impl LoadingIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LoadingState> {
        // A poisoned indicator only ever holds plain numbers; keep using it.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn show(&self, percent: f32) {
        let mut state = self.lock();
        state.visible = true;
        state.percent = percent.clamp(0.0, 100.0);
    }

    fn finish_one(&self) {
        let mut state = self.lock();
        state.active = state.active.saturating_sub(1);
        if state.active == 0 {
            state.visible = false;
            state.percent = 0.0;
        }
    }

    pub fn snapshot(&self) -> LoadingState {
        *self.lock()
    }

    /// Shows the indicator at 0% and hides it again once the last
    /// outstanding guard drops, whatever path the load takes out of scope.
    /// The import worker and UI-thread texture loads share one indicator.
    pub fn begin(&self) -> LoadingGuard {
        {
            let mut state = self.lock();
            state.active += 1;
            state.visible = true;
            state.percent = 0.0;
        }
        LoadingGuard { indicator: self.clone() }
    }
}

#[must_use = "the indicator hides as soon as the guard is dropped"]
pub struct LoadingGuard {
    indicator: LoadingIndicator,
}

impl LoadingGuard {
    pub fn report(&self, percent: f32) {
        self.indicator.show(percent);
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.indicator.finish_one();
    }
}

/// Reads a whole file in chunks, reporting percentage of the file length read so far.
pub fn read_with_progress(path: &Path, mut on_progress: impl FnMut(f32)) -> Result<Vec<u8>, ViewerError> {
    let fetch_err = |source| ViewerError::AssetFetch { path: path.to_path_buf(), source };
    let mut file = File::open(path).map_err(fetch_err)?;
    let total = file.metadata().map_err(fetch_err)?.len();
    let mut bytes = Vec::with_capacity(total as usize);
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        let read = file.read(&mut chunk).map_err(fetch_err)?;
        if read == 0 {
            break;
        }
        bytes.extend_from_slice(&chunk[..read]);
        if total > 0 {
            on_progress(bytes.len() as f32 / total as f32 * 100.0);
        }
    }
    on_progress(100.0);
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn guard_hides_indicator_on_drop() {
        let indicator = LoadingIndicator::new();
        {
            let guard = indicator.begin();
            guard.report(42.0);
            assert_eq!(indicator.snapshot(), LoadingState { visible: true, percent: 42.0, active: 1 });
        }
        assert!(!indicator.snapshot().visible);
    }

    #[test]
    fn guard_hides_indicator_on_early_error() {
        fn failing(indicator: &LoadingIndicator) -> Result<(), ViewerError> {
            let _guard = indicator.begin();
            read_with_progress(Path::new("no/such/file.png"), |_| {})?;
            Ok(())
        }
        let indicator = LoadingIndicator::new();
        assert!(matches!(failing(&indicator), Err(ViewerError::AssetFetch { .. })));
        assert!(!indicator.snapshot().visible);
    }

    #[test]
    fn overlapping_loads_keep_indicator_until_last_guard() {
        let indicator = LoadingIndicator::new();
        let import = indicator.begin();
        let texture = indicator.begin();
        texture.report(60.0);
        drop(import);
        let state = indicator.snapshot();
        assert!(state.visible);
        assert_eq!(state.active, 1);
        drop(texture);
        assert_eq!(indicator.snapshot(), LoadingState::default());
    }

    #[test]
    fn overlapping_loads_across_threads() {
        let indicator = LoadingIndicator::new();
        let ui_guard = indicator.begin();
        let worker = indicator.clone();
        std::thread::spawn(move || {
            let guard = worker.begin();
            guard.report(100.0);
        })
        .join()
        .expect("worker thread");
        assert!(indicator.snapshot().visible);
        drop(ui_guard);
        assert!(!indicator.snapshot().visible);
    }

    #[test]
    fn progress_is_monotonic_and_finishes_at_100() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(&vec![7u8; READ_CHUNK * 2 + 10]).expect("write");
        let mut seen = Vec::new();
        let bytes = read_with_progress(file.path(), |p| seen.push(p)).expect("read");
        assert_eq!(bytes.len(), READ_CHUNK * 2 + 10);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(seen.last().copied(), Some(100.0));
    }

    #[test]
    fn percent_is_clamped() {
        let indicator = LoadingIndicator::new();
        indicator.show(250.0);
        assert_eq!(indicator.snapshot().percent, 100.0);
    }
}
