use std::net::IpAddr;
use std::sync::Arc;

use domain::firewall::entity::{Action, Direction, Port, Protocol};
use domain::firewall::error::FirewallError;

/// Opaque handle to one rule installed in a firewall backend.
///
/// The reconciler never inspects a handle beyond its display identifier;
/// it only stores handles and passes them back to `delete_rule`.
pub trait FirewallRuleHandle: Send + Sync + std::fmt::Debug {
    /// Backend-assigned identifier, used in logs and for deletion.
    fn id(&self) -> String;
}

/// Secondary port for the local packet-filter implementation.
///
/// Backends are free to ignore `ipset_name` if they have no set support;
/// it is an opaque grouping tag shared by rules that differ only in peer
/// IP. Every call may block on kernel I/O; the reconciler treats the port
/// as synchronous.
pub trait FirewallPort: Send + Sync {
    /// Install one filtering rule. A single call may produce more than one
    /// backend rule (chain fan-out); all resulting handles are returned.
    #[allow(clippy::too_many_arguments)]
    fn add_filtering(
        &self,
        ip: IpAddr,
        protocol: Protocol,
        src_port: Option<&Port>,
        dst_port: Option<&Port>,
        direction: Direction,
        action: Action,
        ipset_name: &str,
        comment: &str,
    ) -> Result<Vec<Arc<dyn FirewallRuleHandle>>, FirewallError>;

    /// Remove a previously installed rule.
    fn delete_rule(&self, rule: &dyn FirewallRuleHandle) -> Result<(), FirewallError>;

    /// Commit pending changes to the packet filter.
    fn flush(&self) -> Result<(), FirewallError>;
}
