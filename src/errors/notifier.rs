//! User-facing message surface.

use crate::errors::types::TranslatedError;

/// Shows a failure message to the user.
///
/// The pipeline calls this at most once per logical request.
pub trait Notifier: Send + Sync {
    fn notify(&self, error: &TranslatedError);
}

/// Logs messages instead of displaying them.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, error: &TranslatedError) {
        tracing::error!(
            kind = %error.kind,
            status = ?error.status,
            "{}",
            error.message
        );
    }
}
