use std::net::IpAddr;

use crate::firewall::entity::{Action, Direction, Port, Protocol, RuleId};
use crate::netmap::entity::{self as netmap, RuleAction, RuleDirection, RuleProtocol};

use super::error::AclError;
use super::identity;

/// Map a wire protocol onto the backend protocol.
pub fn firewall_protocol(protocol: RuleProtocol) -> Result<Protocol, AclError> {
    match protocol {
        RuleProtocol::All => Ok(Protocol::All),
        RuleProtocol::Tcp => Ok(Protocol::Tcp),
        RuleProtocol::Udp => Ok(Protocol::Udp),
        RuleProtocol::Icmp => Ok(Protocol::Icmp),
        RuleProtocol::Unspecified => {
            Err(AclError::InvalidProtocol(protocol.as_str().to_string()))
        }
    }
}

/// Map a wire action onto the backend action.
pub fn firewall_action(action: RuleAction) -> Result<Action, AclError> {
    match action {
        RuleAction::Accept => Ok(Action::Accept),
        RuleAction::Drop => Ok(Action::Drop),
        RuleAction::Unspecified => Err(AclError::InvalidAction(action.as_str().to_string())),
    }
}

/// Map a wire direction onto the backend direction.
pub fn firewall_direction(direction: RuleDirection) -> Result<Direction, AclError> {
    match direction {
        RuleDirection::In => Ok(Direction::In),
        RuleDirection::Out => Ok(Direction::Out),
        RuleDirection::Unspecified => Err(AclError::InvalidDirection),
    }
}

/// Map a backend protocol back onto its wire form. Total: every backend
/// protocol has a wire name.
pub fn netmap_protocol(protocol: Protocol) -> RuleProtocol {
    match protocol {
        Protocol::All => RuleProtocol::All,
        Protocol::Tcp => RuleProtocol::Tcp,
        Protocol::Udp => RuleProtocol::Udp,
        Protocol::Icmp => RuleProtocol::Icmp,
    }
}

/// Map a backend action back onto its wire form.
pub fn netmap_action(action: Action) -> RuleAction {
    match action {
        Action::Accept => RuleAction::Accept,
        Action::Drop => RuleAction::Drop,
    }
}

/// Parse a peer IP in standard textual notation (IPv4 or IPv6).
///
/// The wildcard `0.0.0.0` parses like any other address here; callers that
/// care about wildcard semantics compare the text before translating.
pub fn parse_peer_ip(s: &str) -> Result<IpAddr, AclError> {
    s.parse::<IpAddr>()
        .map_err(|_| AclError::InvalidPeerIp(s.to_string()))
}

/// Parse a port string: empty means "any port", otherwise decimal 1-65535.
pub fn parse_port(s: &str) -> Result<Option<Port>, AclError> {
    if s.is_empty() {
        return Ok(None);
    }
    match s.parse::<u16>() {
        Ok(value) if value > 0 => Ok(Some(Port::single(value))),
        _ => Err(AclError::InvalidPort(s.to_string())),
    }
}

/// A network-map rule after translation: parsed, validated, in backend terms.
#[derive(Debug, Clone)]
pub struct TranslatedRule {
    pub peer_ip: IpAddr,
    pub protocol: Protocol,
    pub direction: Direction,
    pub action: Action,
    pub port: Option<Port>,
}

impl TranslatedRule {
    pub fn from_netmap(rule: &netmap::FirewallRule) -> Result<Self, AclError> {
        Ok(Self {
            peer_ip: parse_peer_ip(&rule.peer_ip)?,
            protocol: firewall_protocol(rule.protocol)?,
            direction: firewall_direction(rule.direction)?,
            action: firewall_action(rule.action)?,
            port: parse_port(&rule.port)?,
        })
    }

    /// Content-derived identifier of this rule.
    pub fn rule_id(&self) -> RuleId {
        identity::rule_id(
            self.peer_ip,
            self.protocol,
            self.direction,
            self.port.as_ref(),
            self.action,
            "",
        )
    }
}
