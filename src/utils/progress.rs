// datatransfer/src/utils/progress.rs
use std::io::{Write, stdout};

/// Bytes of remote output that make up one progress tick.
pub const BYTES_PER_TICK: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Section(String),
    Tick,
    Ok,
    Done,
    Error(String),
}

/// Receives progress markers from the fetch steps.
pub trait ProgressSink {
    fn emit(&self, event: ProgressEvent);

    fn section(&self, title: &str) {
        self.emit(ProgressEvent::Section(title.to_string()));
    }

    fn tick(&self) {
        self.emit(ProgressEvent::Tick);
    }

    fn ok(&self) {
        self.emit(ProgressEvent::Ok);
    }

    fn done(&self) {
        self.emit(ProgressEvent::Done);
    }

    fn error(&self, message: &str) {
        self.emit(ProgressEvent::Error(message.to_string()));
    }
}

/// Renders progress on the terminal: dots for ticks, marks for completed phases.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn emit(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Section(title) => println!("{}", title),
            ProgressEvent::Tick => print!("."),
            ProgressEvent::Ok => print!("✓"),
            ProgressEvent::Done => println!(" ✅"),
            ProgressEvent::Error(message) => {
                println!();
                eprintln!("❌ {}", message);
            }
        }
        let _ = stdout().flush();
    }
}

/// Accumulates output sizes and signals once per full threshold observed.
///
/// The counter restarts from zero after each signal, so a single oversized
/// chunk still produces only one tick.
#[derive(Debug)]
pub struct ByteTicker {
    threshold: usize,
    pending: usize,
    total: u64,
}

impl ByteTicker {
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold: threshold.max(1),
            pending: 0,
            total: 0,
        }
    }

    pub fn record(&mut self, len: usize) -> bool {
        self.pending += len;
        self.total += len as u64;
        if self.pending >= self.threshold {
            self.pending = 0;
            true
        } else {
            false
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}

impl Default for ByteTicker {
    fn default() -> Self {
        Self::new(BYTES_PER_TICK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_once_per_megabyte() {
        let mut ticker = ByteTicker::default();
        let chunk = 256 * 1024;

        let ticks: Vec<bool> = (0..8).map(|_| ticker.record(chunk)).collect();
        assert_eq!(
            ticks,
            vec![false, false, false, true, false, false, false, true]
        );
        assert_eq!(ticker.total(), 2 * BYTES_PER_TICK as u64);
    }

    #[test]
    fn test_counter_resets_after_oversized_chunk() {
        let mut ticker = ByteTicker::new(10);
        assert!(ticker.record(35));
        assert!(!ticker.record(9));
        assert!(ticker.record(1));
    }
}
