pub mod firewall_port;
