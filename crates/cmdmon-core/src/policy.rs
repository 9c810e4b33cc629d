use std::net::IpAddr;

use cmdmon_wire::{PermissionClass, Status};

/// How a request reached the daemon (§4.3 "Authorization layering"). The
/// Unix domain socket is trusted unconditionally: anyone with filesystem
/// permission on the socket path has already passed an OS-level gate this
/// protocol does not need to repeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustLevel {
    FilesystemSocket,
    IpLoopback,
    IpRemote(IpAddr),
}

/// Authorizes a request's opcode against its [`PermissionClass`] and the
/// peer's [`TrustLevel`] (§4.3 step 4: "AUTH requires filesystem origin;
/// LOCAL requires local or filesystem origin; OPEN requires any"). Returns
/// the [`Status`] a rejected request's reply should carry.
///
/// The `CMDALLOW`/`CMDDENY` subnet table is consulted earlier, directly by
/// `dispatch::process`, because a CIDR failure is a silent drop rather than
/// a reply this function could express through its `Result`.
pub fn authorize(trust: TrustLevel, permission_class: PermissionClass) -> Result<(), Status> {
    match (trust, permission_class) {
        (TrustLevel::FilesystemSocket, _) => Ok(()),

        (TrustLevel::IpLoopback, PermissionClass::Open | PermissionClass::Local) => Ok(()),
        (TrustLevel::IpLoopback, PermissionClass::Auth) => Err(Status::Unauthorized),

        (TrustLevel::IpRemote(_), PermissionClass::Open) => Ok(()),
        (TrustLevel::IpRemote(_), PermissionClass::Local | PermissionClass::Auth) => {
            Err(Status::Unauthorized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filesystem_socket_passes_every_class() {
        assert_eq!(authorize(TrustLevel::FilesystemSocket, PermissionClass::Auth), Ok(()));
        assert_eq!(authorize(TrustLevel::FilesystemSocket, PermissionClass::Local), Ok(()));
        assert_eq!(authorize(TrustLevel::FilesystemSocket, PermissionClass::Open), Ok(()));
    }

    #[test]
    fn loopback_passes_open_and_local_but_not_auth() {
        assert_eq!(authorize(TrustLevel::IpLoopback, PermissionClass::Open), Ok(()));
        assert_eq!(authorize(TrustLevel::IpLoopback, PermissionClass::Local), Ok(()));
        assert_eq!(
            authorize(TrustLevel::IpLoopback, PermissionClass::Auth),
            Err(Status::Unauthorized)
        );
    }

    #[test]
    fn remote_peer_passes_only_open() {
        let addr: IpAddr = "198.51.100.1".parse().unwrap();
        assert_eq!(authorize(TrustLevel::IpRemote(addr), PermissionClass::Open), Ok(()));
        assert_eq!(
            authorize(TrustLevel::IpRemote(addr), PermissionClass::Local),
            Err(Status::Unauthorized)
        );
        assert_eq!(
            authorize(TrustLevel::IpRemote(addr), PermissionClass::Auth),
            Err(Status::Unauthorized)
        );
    }
}
