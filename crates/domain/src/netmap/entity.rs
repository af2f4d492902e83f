use serde::{Deserialize, Serialize};

/// Sentinel peer IP meaning "all peers in the network".
///
/// Never parsed as a literal address; the reconciler and squasher compare
/// against it textually.
pub const PEER_IP_WILDCARD: &str = "0.0.0.0";

// ── Wire enums ──────────────────────────────────────────────────────

/// Traffic direction as delivered by the control plane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleDirection {
    In,
    Out,
    /// Catch-all for values this agent version does not know.
    #[default]
    #[serde(other)]
    Unspecified,
}

impl RuleDirection {
    /// Wire code, as used in grouping selectors.
    pub fn code(self) -> u8 {
        match self {
            Self::In => 0,
            Self::Out => 1,
            Self::Unspecified => u8::MAX,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::In => "IN",
            Self::Out => "OUT",
            Self::Unspecified => "UNSPECIFIED",
        }
    }
}

/// Rule verdict as delivered by the control plane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleAction {
    Accept,
    Drop,
    #[default]
    #[serde(other)]
    Unspecified,
}

impl RuleAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accept => "ACCEPT",
            Self::Drop => "DROP",
            Self::Unspecified => "UNSPECIFIED",
        }
    }
}

/// Traffic type as delivered by the control plane. `All` subsumes the rest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleProtocol {
    All,
    Tcp,
    Udp,
    Icmp,
    #[default]
    #[serde(other)]
    Unspecified,
}

impl RuleProtocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Tcp => "TCP",
            Self::Udp => "UDP",
            Self::Icmp => "ICMP",
            Self::Unspecified => "UNSPECIFIED",
        }
    }
}

// ── Network map ─────────────────────────────────────────────────────

/// One firewall rule from the network map, still in wire form.
///
/// Peer IP and port stay textual here; the ACL translator parses and
/// validates them before anything reaches the firewall backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallRule {
    #[serde(rename = "peerIP")]
    pub peer_ip: String,

    #[serde(default)]
    pub direction: RuleDirection,

    #[serde(default)]
    pub action: RuleAction,

    #[serde(default)]
    pub protocol: RuleProtocol,

    /// Decimal port, possibly empty (empty means "any port").
    #[serde(default)]
    pub port: String,
}

/// A remote peer entry. Only the allowed IPs matter to the ACL core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Peer {
    #[serde(default)]
    pub allowed_ips: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SshConfig {
    #[serde(default)]
    pub ssh_enabled: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerConfig {
    #[serde(default)]
    pub ssh_config: Option<SshConfig>,
}

/// Declarative snapshot of the peer set and firewall policy delivered by
/// the control plane.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkMap {
    #[serde(default)]
    pub firewall_rules: Vec<FirewallRule>,

    /// Set by current control planes when the rules list is intentionally
    /// empty. Older control planes leave it false, which triggers the
    /// allow-all compatibility path.
    #[serde(default)]
    pub firewall_rules_is_empty: bool,

    #[serde(default)]
    pub remote_peers: Vec<Peer>,

    #[serde(default)]
    pub offline_peers: Vec<Peer>,

    #[serde(default)]
    pub peer_config: Option<PeerConfig>,
}

impl NetworkMap {
    /// Whether the control plane has SSH access to this peer enabled.
    pub fn ssh_enabled(&self) -> bool {
        self.peer_config
            .as_ref()
            .and_then(|c| c.ssh_config.as_ref())
            .is_some_and(|s| s.ssh_enabled)
    }

    /// Total count of allowed-IP entries across remote and offline peers.
    ///
    /// This is the cardinality a per-protocol rule set must reach before
    /// it can be squashed into a wildcard rule.
    pub fn total_allowed_ips(&self) -> usize {
        self.remote_peers
            .iter()
            .chain(self.offline_peers.iter())
            .map(|p| p.allowed_ips.len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_full_map() {
        let json = r#"{
            "firewallRules": [
                {"peerIP": "10.0.0.1", "direction": "IN", "action": "ACCEPT", "protocol": "TCP", "port": "443"},
                {"peerIP": "0.0.0.0", "direction": "OUT", "action": "DROP", "protocol": "ALL"}
            ],
            "firewallRulesIsEmpty": false,
            "remotePeers": [{"allowedIps": ["10.0.0.1/32", "10.0.0.2/32"]}],
            "offlinePeers": [{"allowedIps": ["10.0.0.3/32"]}],
            "peerConfig": {"sshConfig": {"sshEnabled": true}}
        }"#;

        let map: NetworkMap = serde_json::from_str(json).unwrap();
        assert_eq!(map.firewall_rules.len(), 2);
        assert_eq!(map.firewall_rules[0].peer_ip, "10.0.0.1");
        assert_eq!(map.firewall_rules[0].direction, RuleDirection::In);
        assert_eq!(map.firewall_rules[0].protocol, RuleProtocol::Tcp);
        assert_eq!(map.firewall_rules[0].port, "443");
        assert_eq!(map.firewall_rules[1].action, RuleAction::Drop);
        assert_eq!(map.firewall_rules[1].port, "");
        assert!(map.ssh_enabled());
        assert_eq!(map.total_allowed_ips(), 3);
    }

    #[test]
    fn decode_minimal_map() {
        let map: NetworkMap = serde_json::from_str("{}").unwrap();
        assert!(map.firewall_rules.is_empty());
        assert!(!map.firewall_rules_is_empty);
        assert!(!map.ssh_enabled());
        assert_eq!(map.total_allowed_ips(), 0);
    }

    #[test]
    fn unknown_enum_values_decode_as_unspecified() {
        let json = r#"{"peerIP": "10.0.0.1", "direction": "SIDEWAYS", "action": "MAYBE", "protocol": "SCTP"}"#;
        let rule: FirewallRule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.direction, RuleDirection::Unspecified);
        assert_eq!(rule.action, RuleAction::Unspecified);
        assert_eq!(rule.protocol, RuleProtocol::Unspecified);
    }

    #[test]
    fn missing_enum_fields_default_to_unspecified() {
        let rule: FirewallRule = serde_json::from_str(r#"{"peerIP": "10.0.0.1"}"#).unwrap();
        assert_eq!(rule.direction, RuleDirection::Unspecified);
        assert_eq!(rule.action, RuleAction::Unspecified);
        assert_eq!(rule.protocol, RuleProtocol::Unspecified);
        assert_eq!(rule.port, "");
    }

    #[test]
    fn ssh_disabled_when_config_absent() {
        let map = NetworkMap {
            peer_config: Some(PeerConfig { ssh_config: None }),
            ..Default::default()
        };
        assert!(!map.ssh_enabled());
    }

    #[test]
    fn direction_codes_match_wire_values() {
        assert_eq!(RuleDirection::In.code(), 0);
        assert_eq!(RuleDirection::Out.code(), 1);
    }
}
