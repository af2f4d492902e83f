use thiserror::Error;

/// Per-rule validation failures raised while translating a network-map
/// rule into backend terms.
///
/// These indicate a bad rule, not a bad system: the reconciler logs the
/// rule and moves on to the next one.
#[derive(Debug, Error)]
pub enum AclError {
    #[error("invalid peer IP address: {0:?}")]
    InvalidPeerIp(String),

    #[error("invalid protocol type: {0}")]
    InvalidProtocol(String),

    #[error("invalid action type: {0}")]
    InvalidAction(String),

    #[error("invalid port: {0:?}")]
    InvalidPort(String),

    #[error("invalid direction")]
    InvalidDirection,
}
