//! Scoped ownership of one backend instance.

use fragtree_solver::MipBackend;
use tracing::{trace, warn};

/// Owns a backend for the duration of one solve and disposes it on drop.
///
/// Disposal failures are logged and never replace the result of the solve.
pub(crate) struct BackendSession<'a> {
    backend: Box<dyn MipBackend>,
    name: &'a str,
}

impl<'a> BackendSession<'a> {
    pub(crate) fn new(backend: Box<dyn MipBackend>, name: &'a str) -> Self {
        Self { backend, name }
    }

    pub(crate) fn backend_mut(&mut self) -> &mut dyn MipBackend {
        self.backend.as_mut()
    }
}

impl Drop for BackendSession<'_> {
    fn drop(&mut self) {
        match self.backend.dispose() {
            Ok(()) => trace!(
                component = "ilp",
                operation = "dispose",
                status = "success",
                backend = self.name,
                "Disposed backend"
            ),
            Err(err) => warn!(
                component = "ilp",
                operation = "dispose",
                status = "error",
                backend = self.name,
                error = %err,
                "Failed to dispose backend"
            ),
        }
    }
}
