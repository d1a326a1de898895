mod matcher;
mod provider;

pub use matcher::TorNodeList;
pub use provider::TorProvider;

/// Dataset name used in logs and status.
pub const NAME: &str = "tor-nodes";
