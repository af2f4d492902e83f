use std::net::IpAddr;

use md5::{Digest, Md5};

use crate::firewall::entity::{Action, Direction, Port, Protocol, RuleId};
use crate::netmap::entity::FirewallRule;

/// Derive the content hash identifying an effective rule.
///
/// The identifier concatenates peer-IP text, protocol code, direction code,
/// action code, the optional comment, and the port text (when present), and
/// digests the bytes to a 128-bit hex string. Collision resistance only has
/// to hold across a few thousand rules on one node.
pub fn rule_id(
    ip: IpAddr,
    protocol: Protocol,
    direction: Direction,
    port: Option<&Port>,
    action: Action,
    comment: &str,
) -> RuleId {
    let mut id = format!(
        "{ip}{}{}{}{comment}",
        protocol.as_str(),
        direction.code(),
        action.code(),
    );
    if let Some(port) = port {
        id.push_str(&port.to_string());
    }

    let mut hasher = Md5::new();
    hasher.update(id.as_bytes());
    RuleId(hex::encode(hasher.finalize()))
}

/// Grouping selector for IP-set sharing: every rule property except the
/// peer IP. Rules with equal selectors are installed under one IP-set name.
pub fn grouping_selector(rule: &FirewallRule) -> String {
    format!(
        "{}:{}:{}:{}",
        rule.direction.code(),
        rule.action.as_str(),
        rule.protocol.as_str(),
        rule.port,
    )
}

/// Mint the IP-set name for the given counter value: `nb` plus a
/// seven-digit zero-padded number.
pub fn ipset_name(counter: u64) -> String {
    format!("nb{counter:07}")
}
