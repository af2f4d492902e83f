mod userspace;

pub use userspace::{InstalledRule, UserspaceFirewall};
