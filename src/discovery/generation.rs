//! Scan generations for callers that rescan on file changes.
//!
//! Each scan takes a ticket before it starts. A finished scan's result is
//! used only if no newer scan has been accepted in the meantime, so a slow
//! stale scan can never overwrite a fresher catalogue.

use std::sync::atomic::{AtomicU64, Ordering};

/// Ticket identifying one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScanTicket(u64);

impl ScanTicket {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct ScanGenerations {
    issued: AtomicU64,
    accepted: AtomicU64,
}

impl ScanGenerations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a scan.
    pub fn begin(&self) -> ScanTicket {
        ScanTicket(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Accept a finished scan. Returns false if a newer scan was already
    /// accepted, in which case the result must be discarded.
    pub fn accept(&self, ticket: ScanTicket) -> bool {
        self.accepted.fetch_max(ticket.0, Ordering::SeqCst) < ticket.0
    }

    /// Generation of the newest accepted scan (0 if none).
    pub fn latest_accepted(&self) -> u64 {
        self.accepted.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_stale_result_rejected() {
        let generations = ScanGenerations::new();
        let first = generations.begin();
        let second = generations.begin();
        assert!(second > first);

        assert!(generations.accept(second));
        assert!(!generations.accept(first));
        assert_eq!(generations.latest_accepted(), second.generation());
    }

    #[test]
    fn test_in_order_results_accepted() {
        let generations = ScanGenerations::new();
        let first = generations.begin();
        assert!(generations.accept(first));
        let second = generations.begin();
        assert!(generations.accept(second));
        assert!(!generations.accept(second));
    }

    #[test]
    fn test_concurrent_begin_is_unique() {
        let generations = Arc::new(ScanGenerations::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let generations = Arc::clone(&generations);
                thread::spawn(move || generations.begin().generation())
            })
            .collect();
        let mut seen: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        seen.sort();
        assert_eq!(seen, (1..=8).collect::<Vec<_>>());
    }
}
