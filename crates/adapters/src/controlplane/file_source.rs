use std::path::Path;

use thiserror::Error;
use tracing::debug;

use domain::netmap::entity::NetworkMap;

#[derive(Debug, Error)]
pub enum ControlPlaneError {
    #[error("failed to read network map: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode network map: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Decode a network map from its JSON wire form.
pub fn parse_network_map(data: &str) -> Result<NetworkMap, ControlPlaneError> {
    Ok(serde_json::from_str(data)?)
}

/// Load a network map from a file on disk.
///
/// This stands in for control-plane delivery: whatever transport produced
/// the map, the reconciler only ever sees the decoded snapshot.
pub fn load_network_map(path: &Path) -> Result<NetworkMap, ControlPlaneError> {
    let content = std::fs::read_to_string(path)?;
    let map = parse_network_map(&content)?;
    debug!(
        path = %path.display(),
        rules = map.firewall_rules.len(),
        remote_peers = map.remote_peers.len(),
        "network map loaded"
    );
    Ok(map)
}
