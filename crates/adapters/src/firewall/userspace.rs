use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use tracing::{debug, info};

use domain::firewall::entity::{Action, Direction, Port, Protocol};
use domain::firewall::error::FirewallError;
use ports::secondary::firewall_port::{FirewallPort, FirewallRuleHandle};

/// Snapshot of one rule held by the userspace backend.
#[derive(Debug, Clone, Serialize)]
pub struct InstalledRule {
    pub id: String,
    pub ip: IpAddr,
    pub protocol: Protocol,
    pub src_port: Option<Port>,
    pub dst_port: Option<Port>,
    pub direction: Direction,
    pub action: Action,
    pub ipset_name: String,
}

#[derive(Debug)]
struct UserspaceHandle {
    id: String,
}

impl FirewallRuleHandle for UserspaceHandle {
    fn id(&self) -> String {
        self.id.clone()
    }
}

struct UserspaceState {
    rules: BTreeMap<String, InstalledRule>,
    next_id: u64,
    generation: u64,
}

/// Userspace firewall backend: a rule table held in process memory.
///
/// Used on platforms without kernel packet-filter support and for dry
/// runs. It accepts the full `FirewallPort` surface, mints opaque handles,
/// and counts flush generations, but enforces nothing.
pub struct UserspaceFirewall {
    state: RwLock<UserspaceState>,
}

impl UserspaceFirewall {
    pub fn new() -> Arc<Self> {
        info!("userspace firewall backend initialised");
        Arc::new(Self {
            state: RwLock::new(UserspaceState {
                rules: BTreeMap::new(),
                next_id: 0,
                generation: 0,
            }),
        })
    }

    /// Snapshot of all currently installed rules, ordered by handle ID.
    pub fn installed_rules(&self) -> Vec<InstalledRule> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.rules.values().cloned().collect()
    }

    pub fn rule_count(&self) -> usize {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.rules.len()
    }

    /// Number of `flush` calls accepted so far.
    pub fn generation(&self) -> u64 {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.generation
    }
}

impl FirewallPort for UserspaceFirewall {
    fn add_filtering(
        &self,
        ip: IpAddr,
        protocol: Protocol,
        src_port: Option<&Port>,
        dst_port: Option<&Port>,
        direction: Direction,
        action: Action,
        ipset_name: &str,
        _comment: &str,
    ) -> Result<Vec<Arc<dyn FirewallRuleHandle>>, FirewallError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.next_id += 1;
        let id = format!("us{:08}", state.next_id);

        state.rules.insert(
            id.clone(),
            InstalledRule {
                id: id.clone(),
                ip,
                protocol,
                src_port: src_port.cloned(),
                dst_port: dst_port.cloned(),
                direction,
                action,
                ipset_name: ipset_name.to_string(),
            },
        );
        debug!(rule = %id, %ip, %protocol, %direction, %action, "rule added");

        Ok(vec![Arc::new(UserspaceHandle { id })])
    }

    fn delete_rule(&self, rule: &dyn FirewallRuleHandle) -> Result<(), FirewallError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let id = rule.id();
        if state.rules.remove(&id).is_none() {
            return Err(FirewallError::DeleteRule {
                id,
                reason: "rule not found".to_string(),
            });
        }
        debug!(rule = %id, "rule deleted");
        Ok(())
    }

    fn flush(&self) -> Result<(), FirewallError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.generation += 1;
        debug!(
            generation = state.generation,
            rules = state.rules.len(),
            "rule table flushed"
        );
        Ok(())
    }
}
