use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use domain::acl::identity::{grouping_selector, ipset_name};
use domain::acl::squash::squash_accept_rules;
use domain::acl::translate::TranslatedRule;
use domain::firewall::entity::RuleId;
use domain::firewall::error::FirewallError;
use domain::netmap::entity::{
    FirewallRule, NetworkMap, PEER_IP_WILDCARD, RuleAction, RuleDirection, RuleProtocol,
};
use ports::secondary::firewall_port::{FirewallPort, FirewallRuleHandle};

/// TCP port of the SSH fallback rule appended when the control plane
/// enables SSH access to this peer.
const SSH_PORT: u16 = 22;

type RulePairs = HashMap<RuleId, Vec<Arc<dyn FirewallRuleHandle>>>;

/// Mutable reconciler state: the authoritative record of what is installed
/// in the backend, plus the IP-set name counter.
///
/// The counter is strictly increasing for the lifetime of the service;
/// minted names are never reused, even after their rules are removed.
struct AclState {
    ipset_counter: u64,
    rule_pairs: RulePairs,
}

/// Application-level ACL reconciler.
///
/// Translates network maps into backend filtering rules and keeps the
/// installed set in sync across successive maps with minimal churn.
/// `apply_filtering` is serialised by an internal mutex; errors are logged,
/// never propagated. The control plane retries by sending another map.
pub struct AclAppService {
    firewall: Option<Arc<dyn FirewallPort>>,
    state: Mutex<AclState>,
}

impl AclAppService {
    /// `firewall: None` models a platform without packet-filter support;
    /// every apply becomes a logged no-op.
    pub fn new(firewall: Option<Arc<dyn FirewallPort>>) -> Self {
        Self {
            firewall,
            state: Mutex::new(AclState {
                ipset_counter: 0,
                rule_pairs: HashMap::new(),
            }),
        }
    }

    /// Reconcile the backend rule set against a network map.
    ///
    /// Installs rules the map asks for (reusing identical already-installed
    /// rules), removes rules the map no longer contains, and commits via
    /// `flush`. If a backend add fails partway through, the rules installed
    /// by this call are rolled back and the previously installed set is
    /// left untouched.
    pub fn apply_filtering(&self, network_map: &NetworkMap) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let Some(ref firewall) = self.firewall else {
            tracing::debug!("firewall backend is not supported, skipping ACL rules");
            return;
        };

        let start = Instant::now();
        self.sync_rules(&mut state, firewall.as_ref(), network_map);

        if let Err(e) = firewall.flush() {
            tracing::error!("{e}");
        }

        let total: usize = state.rule_pairs.values().map(Vec::len).sum();
        tracing::info!(
            elapsed = ?start.elapsed(),
            total_rules = total,
            "ACL rules processed"
        );
    }

    /// Number of backend rules currently installed.
    pub fn installed_rule_count(&self) -> usize {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.rule_pairs.values().map(Vec::len).sum()
    }

    fn sync_rules(
        &self,
        state: &mut AclState,
        firewall: &dyn FirewallPort,
        network_map: &NetworkMap,
    ) {
        let (mut rules, squashed_protocols) = squash_accept_rules(network_map);

        // SSH fallback: only needed when no squashed wildcard already
        // permits TCP traffic from every peer.
        if network_map.ssh_enabled()
            && !squashed_protocols.contains(&RuleProtocol::All)
            && !squashed_protocols.contains(&RuleProtocol::Tcp)
        {
            rules.push(ssh_fallback_rule());
        }

        // An empty rules list without the is-empty flag means an older
        // control plane that predates rule distribution; keep the mesh
        // connected rather than silently blackholing it.
        if network_map.firewall_rules.is_empty() && !network_map.firewall_rules_is_empty {
            tracing::warn!(
                "control plane is an older version without firewall rule support, \
                 allowing all traffic from connected peers"
            );
            rules.push(allow_all_rule(RuleDirection::In));
            rules.push(allow_all_rule(RuleDirection::Out));
        }

        let mut new_pairs: RulePairs = HashMap::new();
        let mut ipset_by_selector: HashMap<String, String> = HashMap::new();
        // Rule IDs installed by this call; the only ones rollback may touch.
        let mut fresh: Vec<RuleId> = Vec::new();

        for rule in &rules {
            let selector = grouping_selector(rule);
            let ipset = match ipset_by_selector.get(&selector) {
                Some(name) => name.clone(),
                None => {
                    state.ipset_counter += 1;
                    let name = ipset_name(state.ipset_counter);
                    ipset_by_selector.insert(selector, name.clone());
                    name
                }
            };

            let translated = match TranslatedRule::from_netmap(rule) {
                Ok(translated) => translated,
                Err(e) => {
                    tracing::warn!(rule = ?rule, "skipping firewall rule: {e}");
                    continue;
                }
            };

            let rule_id = translated.rule_id();
            if let Some(pair) = state.rule_pairs.get(&rule_id) {
                new_pairs.insert(rule_id, pair.clone());
                continue;
            }

            match install_rule(firewall, &translated, &ipset) {
                Ok(handles) => {
                    state.rule_pairs.insert(rule_id.clone(), handles.clone());
                    new_pairs.insert(rule_id.clone(), handles);
                    fresh.push(rule_id);
                }
                Err(e) => {
                    tracing::error!(rule = ?rule, "failed to apply firewall rule: {e}");
                    roll_back(firewall, state, &fresh);
                    return;
                }
            }
        }

        // Remove rules the new map no longer asks for. Delete failures are
        // logged and tolerated; the entry is dropped either way.
        let stale: Vec<RuleId> = state
            .rule_pairs
            .keys()
            .filter(|id| !new_pairs.contains_key(*id))
            .cloned()
            .collect();
        for rule_id in stale {
            if let Some(handles) = state.rule_pairs.remove(&rule_id) {
                for handle in handles {
                    if let Err(e) = firewall.delete_rule(handle.as_ref()) {
                        tracing::error!(rule = %handle.id(), "{e}");
                    }
                }
            }
        }

        state.rule_pairs = new_pairs;
    }
}

/// Install one effective rule, including its return-path companion where
/// the backend needs one.
///
/// Stateless backends cannot track connections, so a rule with a port gets
/// a second entry with source and destination ports swapped in the opposite
/// direction. `ALL` and `ICMP` carry no meaningful port, and a port-less
/// rule has nothing to swap; both skip the companion.
fn install_rule(
    firewall: &dyn FirewallPort,
    rule: &TranslatedRule,
    ipset: &str,
) -> Result<Vec<Arc<dyn FirewallRuleHandle>>, FirewallError> {
    use domain::firewall::entity::{Port, Protocol};

    fn skip_inverted(protocol: Protocol, port: Option<&Port>) -> bool {
        matches!(protocol, Protocol::All | Protocol::Icmp) || port.is_none()
    }

    let port = rule.port.as_ref();

    let mut handles = firewall.add_filtering(
        rule.peer_ip,
        rule.protocol,
        None,
        port,
        rule.direction,
        rule.action,
        ipset,
        "",
    )?;

    if skip_inverted(rule.protocol, port) {
        return Ok(handles);
    }

    let inverted = firewall.add_filtering(
        rule.peer_ip,
        rule.protocol,
        port,
        None,
        rule.direction.inverted(),
        rule.action,
        ipset,
        "",
    )?;
    handles.extend(inverted);
    Ok(handles)
}

/// Best-effort removal of the rules installed by the current call.
///
/// Pre-existing rules are left alone: the caller returns before stale
/// removal runs, so the backend ends up exactly at its pre-call state.
fn roll_back(firewall: &dyn FirewallPort, state: &mut AclState, fresh: &[RuleId]) {
    tracing::debug!("rolling back ACL rules to the previous state");
    for rule_id in fresh {
        if let Some(handles) = state.rule_pairs.remove(rule_id) {
            for handle in handles {
                if let Err(e) = firewall.delete_rule(handle.as_ref()) {
                    tracing::error!(
                        rule = %handle.id(),
                        "failed to delete new firewall rule during rollback: {e}"
                    );
                }
            }
        }
    }
}

fn ssh_fallback_rule() -> FirewallRule {
    FirewallRule {
        peer_ip: PEER_IP_WILDCARD.to_string(),
        direction: RuleDirection::In,
        action: RuleAction::Accept,
        protocol: RuleProtocol::Tcp,
        port: SSH_PORT.to_string(),
    }
}

fn allow_all_rule(direction: RuleDirection) -> FirewallRule {
    FirewallRule {
        peer_ip: PEER_IP_WILDCARD.to_string(),
        direction,
        action: RuleAction::Accept,
        protocol: RuleProtocol::All,
        port: String::new(),
    }
}
