// SPDX-License-Identifier: GPL-3.0-only

//! Scoped ownership of decode contexts

use super::DecodeContext;
use crate::errors::ScanError;
use std::sync::Arc;
use tracing::{debug, warn};

/// Owns a decode context and releases it exactly once
///
/// Call [`ContextGuard::release`] to observe cleanup errors. If the guard is
/// dropped first (for instance because the decode future was cancelled) the
/// context is released on drop and any error is logged.
pub struct ContextGuard<C: DecodeContext> {
    inner: Option<C>,
    label: String,
}

impl<C: DecodeContext> ContextGuard<C> {
    pub fn new(context: C, label: impl Into<String>) -> Self {
        Self {
            inner: Some(context),
            label: label.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_released(&self) -> bool {
        self.inner.is_none()
    }

    /// Decode through the guarded context
    pub async fn decode_once(&mut self, image: Arc<[u8]>) -> Result<String, ScanError> {
        match self.inner.as_mut() {
            Some(context) => context.decode_once(image).await,
            None => Err(ScanError::ResourceCleanup(format!(
                "{} used after release",
                self.label
            ))),
        }
    }

    /// Release the context now; later calls are no-ops
    pub fn release(&mut self) -> Result<(), ScanError> {
        match self.inner.take() {
            Some(mut context) => {
                debug!(context = %self.label, "Releasing decode context");
                context.release()
            }
            None => Ok(()),
        }
    }
}

impl<C: DecodeContext> Drop for ContextGuard<C> {
    fn drop(&mut self) {
        if let Some(mut context) = self.inner.take() {
            debug!(context = %self.label, "Decode context released on drop");
            if let Err(e) = context.release() {
                warn!(context = %self.label, error = %e, "Failed to release decode context");
            }
        }
    }
}
