use std::net::IpAddr;

use binbuf::prelude::*;
use cmdmon_collab::{AccessFilter, ClientLog};
use cmdmon_core::{process, Collaborators, TrustLevel};
use cmdmon_wire::{
    constants::PROTOCOL_VERSION, Opcode, ReplyHeader, ReplyPayload, ReplyTag, RequestHeader,
    SourceAddress, SourceParams, Status, Timestamp, WireIpAddr, PACKET_TYPE_REQUEST,
};

const LOCAL_ORIGIN: IpAddr = IpAddr::V4(std::net::Ipv4Addr::LOCALHOST);

fn header(command: u16, sequence: u32) -> RequestHeader {
    RequestHeader {
        version: PROTOCOL_VERSION,
        pkt_type: PACKET_TYPE_REQUEST,
        res1: 0,
        res2: 0,
        command,
        attempt: 0,
        sequence,
        utoken: 0,
        token: 0,
        auth: [0; 16],
        attempted_at: Timestamp {
            seconds: 0,
            microseconds: 0,
        },
    }
}

fn request(command: u16, sequence: u32, write_payload: impl FnOnce(&mut WriteBuffer)) -> Vec<u8> {
    let mut wbuf = WriteBuffer::new();
    header(command, sequence).write::<BigEndian>(&mut wbuf).unwrap();
    write_payload(&mut wbuf);
    wbuf.bytes().to_vec()
}

fn decode_reply(bytes: &[u8]) -> (ReplyHeader, Status) {
    let mut rbuf = ReadBuffer::new(bytes);
    let header = ReplyHeader::read::<BigEndian>(&mut rbuf).unwrap();
    let status = Status::try_from(header.status).unwrap();
    (header, status)
}

fn default_source_params() -> SourceParams {
    SourceParams {
        min_poll: 6,
        max_poll: 10,
        presend_min_poll: 0,
        min_stratum: 0,
        poll_target: 6,
        version: 4,
        max_sources: -1,
        min_samples: -1,
        max_samples: -1,
        filter_length: -1,
        max_delay: cmdmon_wire::NtpFloat(3.0),
        max_delay_ratio: cmdmon_wire::NtpFloat(0.0),
        max_delay_dev_ratio: cmdmon_wire::NtpFloat(0.0),
        min_delay: cmdmon_wire::NtpFloat(0.0),
        asymmetry: cmdmon_wire::NtpFloat(0.0),
        offset: cmdmon_wire::NtpFloat(0.0),
        flags: 0,
    }
}

#[test]
fn nsources_reflects_a_prior_add_server() {
    let mut collab = Collaborators::in_memory(0);

    let addr: WireIpAddr = "192.0.2.1".parse::<std::net::IpAddr>().unwrap().into();
    let data = request(Opcode::AddServer as u16, 1, |wbuf| {
        SourceAddress { ip: addr, port: 123 }
            .write::<BigEndian>(wbuf)
            .unwrap();
        default_source_params().write::<BigEndian>(wbuf).unwrap();
    });

    let reply = process(&data, TrustLevel::FilesystemSocket, LOCAL_ORIGIN, &mut collab).unwrap();
    let (_, status) = decode_reply(&reply);
    assert_eq!(status, Status::Success);

    let data = request(Opcode::NSources as u16, 2, |_| {});
    let reply = process(&data, TrustLevel::FilesystemSocket, LOCAL_ORIGIN, &mut collab).unwrap();
    let (header, status) = decode_reply(&reply);
    assert_eq!(status, Status::Success);
    assert_eq!(header.reply_tag, ReplyTag::NSources as u16);

    let mut rbuf = ReadBuffer::new(&reply[cmdmon_wire::constants::REPLY_HEADER_SIZE..]);
    let n = u32::read::<BigEndian>(&mut rbuf).unwrap();
    assert_eq!(n, 1);
}

#[test]
fn unauthorized_remote_modify_is_rejected() {
    let mut collab = Collaborators::in_memory(0);
    let peer: std::net::IpAddr = "203.0.113.5".parse().unwrap();
    collab
        .access
        .allow(cmdmon_collab::Namespace::Cmdmon, "203.0.113.0/24".parse().unwrap());

    let data = request(Opcode::ModifyMinpoll as u16, 1, |wbuf| {
        WireIpAddr::UNSPEC.write::<BigEndian>(wbuf).unwrap();
        7i32.write::<BigEndian>(wbuf).unwrap();
    });

    let reply = process(&data, TrustLevel::IpRemote(peer), peer, &mut collab).unwrap();
    let (_, status) = decode_reply(&reply);
    assert_eq!(status, Status::Unauthorized);
}

#[test]
fn bad_protocol_version_is_reported() {
    let mut collab = Collaborators::in_memory(0);
    let mut wbuf = WriteBuffer::new();
    header(Opcode::Null as u16, 1)
        .write::<BigEndian>(&mut wbuf)
        .map(|_| ())
        .unwrap();
    let mut data = wbuf.bytes().to_vec();
    data[0] = PROTOCOL_VERSION + 1;

    let reply = process(&data, TrustLevel::FilesystemSocket, LOCAL_ORIGIN, &mut collab).unwrap();
    let (_, status) = decode_reply(&reply);
    assert_eq!(status, Status::BadPacketVersion);
}

#[test]
fn settime_while_manual_mode_disabled_is_not_enabled() {
    let mut collab = Collaborators::in_memory(0);
    let data = request(Opcode::Settime as u16, 1, |wbuf| {
        Timestamp {
            seconds: 100,
            microseconds: 0,
        }
        .write::<BigEndian>(wbuf)
        .unwrap();
    });

    let reply = process(&data, TrustLevel::FilesystemSocket, LOCAL_ORIGIN, &mut collab).unwrap();
    let (_, status) = decode_reply(&reply);
    assert_eq!(status, Status::NotEnabled);
}

#[test]
fn client_accesses_by_index_pages_results() {
    let mut collab = Collaborators::in_memory(0);
    for i in 0..2u8 {
        collab
            .client_log
            .record_access(std::net::IpAddr::from([192, 0, 2, i]));
    }

    // Only 2 rows exist, but a window of 8 is requested: next_index must
    // advance by the requested count (8), not the returned count (2).
    let data = request(Opcode::ClientAccessesByIndex as u16, 1, |wbuf| {
        0u32.write::<BigEndian>(wbuf).unwrap();
        8u32.write::<BigEndian>(wbuf).unwrap();
    });

    let reply = process(&data, TrustLevel::FilesystemSocket, LOCAL_ORIGIN, &mut collab).unwrap();
    let (header, status) = decode_reply(&reply);
    assert_eq!(status, Status::Success);
    assert_eq!(header.reply_tag, ReplyTag::ClientAccesses as u16);

    let mut rbuf = ReadBuffer::new(&reply[cmdmon_wire::constants::REPLY_HEADER_SIZE..]);
    let next_index = u32::read::<BigEndian>(&mut rbuf).unwrap();
    let n_indices = u32::read::<BigEndian>(&mut rbuf).unwrap();
    assert_eq!(next_index, 8);
    assert_eq!(n_indices, 2);
}

#[test]
fn client_accesses_by_index_reports_inactive_table() {
    let mut collab = Collaborators::in_memory(0);
    collab.client_log.set_active(false);

    let data = request(Opcode::ClientAccessesByIndex as u16, 1, |wbuf| {
        0u32.write::<BigEndian>(wbuf).unwrap();
        8u32.write::<BigEndian>(wbuf).unwrap();
    });

    let reply = process(&data, TrustLevel::FilesystemSocket, LOCAL_ORIGIN, &mut collab).unwrap();
    let (_, status) = decode_reply(&reply);
    assert_eq!(status, Status::Inactive);
}

#[test]
fn rekey_reloads_keys_not_config() {
    let mut collab = Collaborators::in_memory(0);
    let data = request(Opcode::Rekey as u16, 1, |_| {});

    let reply = process(&data, TrustLevel::FilesystemSocket, LOCAL_ORIGIN, &mut collab).unwrap();
    let (_, status) = decode_reply(&reply);
    assert_eq!(status, Status::Success);
}

#[test]
fn cidr_denied_remote_peer_is_dropped_silently() {
    let mut collab = Collaborators::in_memory(0);
    collab.access.allow(
        cmdmon_collab::Namespace::Cmdmon,
        "203.0.113.0/24".parse().unwrap(),
    );

    let data = request(Opcode::Tracking as u16, 1, |_| {});
    let denied_peer: std::net::IpAddr = "198.51.100.9".parse().unwrap();
    assert!(process(&data, TrustLevel::IpRemote(denied_peer), denied_peer, &mut collab).is_none());

    let page = collab.client_log.page(0, 10);
    assert!(page.rows.is_empty(), "a CIDR-denied drop must not touch ClientLog");

    let allowed_peer: std::net::IpAddr = "203.0.113.42".parse().unwrap();
    let reply = process(&data, TrustLevel::IpRemote(allowed_peer), allowed_peer, &mut collab).unwrap();
    let (_, status) = decode_reply(&reply);
    assert_eq!(status, Status::Success);
}
