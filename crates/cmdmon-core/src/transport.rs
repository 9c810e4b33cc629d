use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use socket2::{Domain, SockAddr, Socket, Type};
use thiserror::Error;
use tokio::net::{UdpSocket, UnixDatagram};
use tracing::{error, info, warn};

use cmdmon_collab::BindAddresses;

use crate::collaborators::Collaborators;
use crate::dispatch;
use crate::policy::TrustLevel;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("socket I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no C/M socket could be bound")]
    NoneBound,
}

/// Binds whichever of the configured sockets are present (§5 "Transport":
/// IPv4, IPv6, and a Unix domain socket can all be active at once) and runs
/// a single serial receive/dispatch/send loop over all of them.
///
/// Dispatch is strictly serial: at most one `dispatch::process` call is ever
/// in flight, matching the protocol's single in-order `sequence` space per
/// peer. A busy daemon falls behind under load rather than processing
/// requests out of order or needing per-request synchronization.
pub struct Listener {
    ipv4: Option<UdpSocket>,
    ipv6: Option<UdpSocket>,
    unix: Option<(UnixDatagram, PathBuf)>,
}

impl Listener {
    /// Binds every configured address independently (§4.2: "If only one of
    /// the two IP sockets can be created, that is acceptable"). Only fails
    /// if a bind address was configured but none of them succeeded.
    pub async fn bind(addrs: &BindAddresses) -> Result<Self, TransportError> {
        let ipv4 = match addrs.ipv4 {
            Some(addr) => bind_udp(addr).await.ok(),
            None => None,
        };

        let ipv6 = match addrs.ipv6 {
            Some(addr) => bind_udp(addr).await.ok(),
            None => None,
        };

        let unix = match &addrs.unix {
            Some(path) => bind_unix(path).await.ok().map(|socket| (socket, path.clone())),
            None => None,
        };

        let any_configured = addrs.ipv4.is_some() || addrs.ipv6.is_some() || addrs.unix.is_some();
        let any_bound = ipv4.is_some() || ipv6.is_some() || unix.is_some();

        if any_configured && !any_bound {
            return Err(TransportError::NoneBound);
        }

        if !any_bound {
            warn!("no C/M transport bound; the daemon will accept no requests");
        }

        Ok(Self { ipv4, ipv6, unix })
    }

    /// Runs until cancelled. Each branch of the `select!` reads at most one
    /// datagram per wakeup so no single socket can starve the others.
    pub async fn run(&self, collab: &mut Collaborators) -> Result<(), TransportError> {
        let mut buf = [0u8; 4096];

        loop {
            tokio::select! {
                result = recv_or_pending(&self.ipv4, &mut buf) => {
                    if let Some((len, peer)) = result? {
                        self.reply_udp(&self.ipv4, &buf[..len], peer, collab).await;
                    }
                }
                result = recv_or_pending(&self.ipv6, &mut buf) => {
                    if let Some((len, peer)) = result? {
                        self.reply_udp(&self.ipv6, &buf[..len], peer, collab).await;
                    }
                }
                result = recv_unix_or_pending(&self.unix, &mut buf) => {
                    if let Some(len) = result? {
                        self.reply_unix(&buf[..len], collab).await;
                    }
                }
            }
        }
    }

    async fn reply_udp(
        &self,
        socket: &Option<UdpSocket>,
        data: &[u8],
        peer: SocketAddr,
        collab: &mut Collaborators,
    ) {
        let Some(socket) = socket else { return };

        let trust = trust_level_for(peer.ip());
        if let Some(reply) = dispatch::process(data, trust, peer.ip(), collab) {
            if let Err(err) = socket.send_to(&reply, peer).await {
                error!(?err, %peer, "failed to send C/M reply");
            }
        }
    }

    async fn reply_unix(&self, data: &[u8], collab: &mut Collaborators) {
        let Some((socket, _)) = &self.unix else { return };

        // The Unix socket has no peer address to log against; its traffic
        // is trusted unconditionally (§4.3), so it is keyed under loopback
        // for `ClientLog` accounting purposes.
        let origin = IpAddr::from([127, 0, 0, 1]);
        if let Some(reply) = dispatch::process(data, TrustLevel::FilesystemSocket, origin, collab) {
            if let Err(err) = socket.send(&reply).await {
                error!(?err, "failed to send C/M reply over the Unix socket");
            }
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        if let Some((_, path)) = &self.unix {
            let _ = std::fs::remove_file(path);
        }
    }
}

async fn recv_or_pending(
    socket: &Option<UdpSocket>,
    buf: &mut [u8],
) -> Result<Option<(usize, SocketAddr)>, TransportError> {
    match socket {
        Some(socket) => Ok(Some(socket.recv_from(buf).await?)),
        None => std::future::pending().await,
    }
}

async fn recv_unix_or_pending(
    socket: &Option<(UnixDatagram, PathBuf)>,
    buf: &mut [u8],
) -> Result<Option<usize>, TransportError> {
    match socket {
        Some((socket, _)) => Ok(Some(socket.recv(buf).await?)),
        None => std::future::pending().await,
    }
}

fn trust_level_for(addr: IpAddr) -> TrustLevel {
    if addr.is_loopback() {
        TrustLevel::IpLoopback
    } else {
        TrustLevel::IpRemote(addr)
    }
}

/// Builds the `socket2::Socket` a C/M UDP listener binds from, applying the
/// socket options §4.2 "Socket options" requires: close-on-exec on every
/// socket, address reuse and (for IPv6) v6-only, and a best-effort bind to
/// an address that may not yet exist on the interface. None of these are
/// fatal on failure; the daemon logs and carries on with whatever the
/// kernel gave it.
fn configure_udp_socket(addr: SocketAddr) -> std::io::Result<Socket> {
    let domain = if addr.is_ipv6() { Domain::IPV6 } else { Domain::IPV4 };
    let socket = Socket::new(domain, Type::DGRAM.cloexec(), None)?;

    if let Err(err) = socket.set_reuse_address(true) {
        warn!(%addr, ?err, "failed to set SO_REUSEADDR on C/M socket");
    }

    if addr.is_ipv6() {
        if let Err(err) = socket.set_only_v6(true) {
            warn!(%addr, ?err, "failed to set IPV6_V6ONLY on C/M socket");
        }
    }

    // Best-effort "bind to an address that doesn't exist yet" (§4.2):
    // IP_FREEBIND is Linux-only and absent from `socket2`'s portable API,
    // so this is attempted directly through the raw file descriptor.
    #[cfg(target_os = "linux")]
    {
        use std::os::fd::AsRawFd;
        let enable: libc::c_int = 1;
        let rc = unsafe {
            libc::setsockopt(
                socket.as_raw_fd(),
                libc::IPPROTO_IP,
                libc::IP_FREEBIND,
                &enable as *const _ as *const libc::c_void,
                std::mem::size_of_val(&enable) as libc::socklen_t,
            )
        };
        if rc != 0 {
            warn!(%addr, err = %std::io::Error::last_os_error(), "failed to set IP_FREEBIND on C/M socket");
        }
    }

    socket.set_nonblocking(true)?;
    socket.bind(&SockAddr::from(addr))?;

    Ok(socket)
}

async fn bind_udp(addr: SocketAddr) -> Result<UdpSocket, TransportError> {
    info!(%addr, "binding C/M UDP socket");
    let bind = |addr: SocketAddr| -> std::io::Result<UdpSocket> {
        let socket = configure_udp_socket(addr)?;
        let std_socket = std::net::UdpSocket::from(socket);
        UdpSocket::try_from(std_socket)
    };

    bind(addr).map_err(|source| TransportError::Bind {
        addr: addr.to_string(),
        source,
    })
}

async fn bind_unix(path: &Path) -> Result<UnixDatagram, TransportError> {
    let _ = std::fs::remove_file(path);
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    info!(path = %path.display(), "binding C/M Unix domain socket");
    UnixDatagram::bind(path).map_err(|source| TransportError::Bind {
        addr: path.display().to_string(),
        source,
    })
}
