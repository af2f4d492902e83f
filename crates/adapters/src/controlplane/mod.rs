mod file_source;

pub use file_source::{ControlPlaneError, load_network_map, parse_network_map};
