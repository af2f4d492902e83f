use std::collections::{HashMap, HashSet};

use crate::netmap::entity::{
    FirewallRule, NetworkMap, PEER_IP_WILDCARD, RuleAction, RuleDirection, RuleProtocol,
};

/// Squash order matters only for its first element: `ALL` must be tried
/// first, because once it collapses every other protocol is subsumed.
const SQUASH_ORDER: [RuleProtocol; 4] = [
    RuleProtocol::All,
    RuleProtocol::Icmp,
    RuleProtocol::Tcp,
    RuleProtocol::Udp,
];

/// Peer coverage observed for one protocol in one direction.
///
/// `peers` maps peer IP text to the index of the first rule that covered
/// it. Once a protocol has been seen with a DROP action or a port filter,
/// it is latched: the peer map stays empty for the rest of the pass, so a
/// later ACCEPT rule cannot re-enable squashing.
#[derive(Default)]
struct ProtocolPeers {
    latched: bool,
    peers: HashMap<String, usize>,
}

type ProtoMatch = HashMap<RuleProtocol, ProtocolPeers>;

/// Collapse per-peer ACCEPT rules into single wildcard rules where the
/// effective policy allows it.
///
/// Returns the effective rule list and the set of protocols for which a
/// wildcard rule was emitted. A protocol squashes in a direction only when
/// its port-less ACCEPT rules cover every allowed IP of every remote and
/// offline peer, at least two of them, and the protocol has no DROP or
/// port-filtered rule anywhere in that direction. Squashing never relaxes
/// the policy: any narrower intent (a DROP, a port) suppresses it.
pub fn squash_accept_rules(
    network_map: &NetworkMap,
) -> (Vec<FirewallRule>, HashSet<RuleProtocol>) {
    let total_ips = network_map.total_allowed_ips();

    let mut inbound = ProtoMatch::new();
    let mut outbound = ProtoMatch::new();
    let mut squashed_rules: Vec<FirewallRule> = Vec::new();
    let mut squashed_protocols: HashSet<RuleProtocol> = HashSet::new();

    for (index, rule) in network_map.firewall_rules.iter().enumerate() {
        let matches = match rule.direction {
            RuleDirection::In => &mut inbound,
            _ => &mut outbound,
        };
        record_rule(
            index,
            rule,
            matches,
            &mut squashed_rules,
            &mut squashed_protocols,
        );
    }

    squash_direction(
        &inbound,
        RuleDirection::In,
        total_ips,
        &mut squashed_rules,
        &mut squashed_protocols,
    );
    squash_direction(
        &outbound,
        RuleDirection::Out,
        total_ips,
        &mut squashed_rules,
        &mut squashed_protocols,
    );

    // A squashed ALL covers every traffic type; the remaining input rules
    // are all redundant.
    if squashed_protocols.contains(&RuleProtocol::All) {
        return (squashed_rules, squashed_protocols);
    }

    if squashed_rules.is_empty() {
        return (network_map.firewall_rules.clone(), squashed_protocols);
    }

    // Drop the per-peer rules that a wildcard now covers: for each squashed
    // protocol, the rule whose index is the canonical one recorded in its
    // direction map. Everything else survives, and the wildcard rules are
    // appended at the end.
    let mut rules: Vec<FirewallRule> = Vec::with_capacity(network_map.firewall_rules.len());
    for (index, rule) in network_map.firewall_rules.iter().enumerate() {
        if squashed_protocols.contains(&rule.protocol) {
            let matches = match rule.direction {
                RuleDirection::In => &inbound,
                _ => &outbound,
            };
            let canonical = matches
                .get(&rule.protocol)
                .and_then(|entry| entry.peers.get(&rule.peer_ip));
            if canonical == Some(&index) {
                continue;
            }
        }
        rules.push(rule.clone());
    }
    rules.extend(squashed_rules);

    (rules, squashed_protocols)
}

fn record_rule(
    index: usize,
    rule: &FirewallRule,
    matches: &mut ProtoMatch,
    squashed_rules: &mut Vec<FirewallRule>,
    squashed_protocols: &mut HashSet<RuleProtocol>,
) {
    let entry = matches.entry(rule.protocol).or_default();

    if rule.action == RuleAction::Drop || !rule.port.is_empty() {
        entry.latched = true;
        entry.peers.clear();
        return;
    }

    // A wildcard peer IP means the control plane already collapsed this
    // protocol; pass the rule straight through to the squashed set.
    if rule.peer_ip == PEER_IP_WILDCARD {
        squashed_rules.push(rule.clone());
        squashed_protocols.insert(rule.protocol);
        return;
    }

    if entry.latched {
        return;
    }
    entry.peers.entry(rule.peer_ip.clone()).or_insert(index);
}

fn squash_direction(
    matches: &ProtoMatch,
    direction: RuleDirection,
    total_ips: usize,
    squashed_rules: &mut Vec<FirewallRule>,
    squashed_protocols: &mut HashSet<RuleProtocol>,
) {
    for protocol in SQUASH_ORDER {
        let Some(entry) = matches.get(&protocol) else {
            continue;
        };
        // No squash when the rules cover only part of the network, or only
        // a single peer.
        if entry.peers.len() != total_ips || entry.peers.len() < 2 {
            continue;
        }

        squashed_rules.push(FirewallRule {
            peer_ip: PEER_IP_WILDCARD.to_string(),
            direction,
            action: RuleAction::Accept,
            protocol,
            port: String::new(),
        });
        squashed_protocols.insert(protocol);

        if protocol == RuleProtocol::All {
            break;
        }
    }
}
