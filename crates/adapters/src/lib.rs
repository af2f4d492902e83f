#![forbid(unsafe_code)]

pub mod controlplane;
pub mod firewall;
