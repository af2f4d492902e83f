use thiserror::Error;

/// Failures reported by a firewall backend.
///
/// The reconciler treats these as a sign the system may be in an
/// inconsistent state: an add failure aborts the current update and
/// triggers rollback, while delete and flush failures are logged and
/// tolerated.
#[derive(Debug, Error)]
pub enum FirewallError {
    #[error("failed to add firewall rule: {0}")]
    AddFiltering(String),

    #[error("failed to delete firewall rule {id}: {reason}")]
    DeleteRule { id: String, reason: String },

    #[error("failed to flush firewall rules: {0}")]
    Flush(String),
}
