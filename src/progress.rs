/// Receives `(current, total)` updates as a batch advances. Injected by the
/// caller so reporting stays decoupled from any particular output mechanism.
pub trait Progress {
    fn update(&self, current: usize, total: usize);
}

/// Counter lines on stderr.
pub struct ConsoleProgress;

impl Progress for ConsoleProgress {
    fn update(&self, current: usize, total: usize) {
        eprintln!("[{current}/{total}]");
    }
}

/// Discards all updates.
pub struct NullProgress;

impl Progress for NullProgress {
    fn update(&self, _current: usize, _total: usize) {}
}
