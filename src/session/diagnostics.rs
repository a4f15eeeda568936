// SPDX-License-Identifier: GPL-3.0-only

//! Diagnostic channel
//!
//! Every failure that reaches a session boundary is logged through `tracing`
//! and kept in a bounded in-memory log so the host can show it.

use super::types::SessionId;
use crate::errors::ScanError;
use chrono::{DateTime, Local};
use std::collections::VecDeque;
use tracing::warn;

/// One recorded failure
#[derive(Debug, Clone)]
pub struct DiagnosticEntry {
    pub session: Option<SessionId>,
    pub error: ScanError,
    pub at: DateTime<Local>,
}

/// Bounded log of recent failures, oldest dropped first
#[derive(Debug, Clone)]
pub struct DiagnosticLog {
    entries: VecDeque<DiagnosticEntry>,
    capacity: usize,
}

impl DiagnosticLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Log and retain a failure
    pub fn record(&mut self, session: Option<SessionId>, error: ScanError) {
        match session {
            Some(id) => warn!(session = %id, error = %error, "Scan failed"),
            None => warn!(error = %error, "Scan failed"),
        }

        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(DiagnosticEntry {
            session,
            error,
            at: Local::now(),
        });
    }

    pub fn latest(&self) -> Option<&DiagnosticEntry> {
        self.entries.back()
    }

    pub fn entries(&self) -> impl Iterator<Item = &DiagnosticEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
