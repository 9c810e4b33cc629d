use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// Where the C/M transport layer should bind (§5 "Transport").
#[derive(Debug, Clone)]
pub struct BindAddresses {
    pub ipv4: Option<SocketAddr>,
    pub ipv6: Option<SocketAddr>,
    pub unix: Option<PathBuf>,
}

impl Default for BindAddresses {
    fn default() -> Self {
        Self {
            ipv4: Some(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 323)),
            ipv6: Some(SocketAddr::new(IpAddr::from([0, 0, 0, 0, 0, 0, 0, 1]), 323)),
            unix: Some(PathBuf::from("/var/run/cmdmond/cmdmond.sock")),
        }
    }
}

/// The runtime-facing view of daemon configuration that handlers may need
/// (§6 "Config"): `DUMP` asks it to persist state, and startup asks it
/// where to bind. Key reloading (`REKEY`) is the `Keys` collaborator's
/// responsibility, not `Config`'s (§6).
pub trait Config {
    fn bind_addresses(&self) -> &BindAddresses;
    fn dump_dir(&self) -> &std::path::Path;

    /// `DUMP` (§4.5 "Housekeeping"): write out whatever state the daemon
    /// considers durable. Returns the number of files written.
    fn dump(&mut self) -> std::io::Result<usize>;
}

/// A `Config` that never touches disk, so `cmdmon-core` can be exercised
/// without a real daemon directory tree.
#[derive(Debug)]
pub struct NoopConfig {
    bind: BindAddresses,
    dump_dir: PathBuf,
    dump_count: usize,
}

impl Default for NoopConfig {
    fn default() -> Self {
        Self {
            bind: BindAddresses::default(),
            dump_dir: PathBuf::from("/var/lib/cmdmond"),
            dump_count: 0,
        }
    }
}

impl NoopConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dump_count(&self) -> usize {
        self.dump_count
    }
}

impl Config for NoopConfig {
    fn bind_addresses(&self) -> &BindAddresses {
        &self.bind
    }

    fn dump_dir(&self) -> &std::path::Path {
        &self.dump_dir
    }

    fn dump(&mut self) -> std::io::Result<usize> {
        self.dump_count += 1;
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_increments_its_counter() {
        let mut config = NoopConfig::new();
        config.dump().unwrap();
        assert_eq!(config.dump_count(), 1);
    }
}
