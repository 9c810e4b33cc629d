use std::net::IpAddr;

use binbuf::prelude::*;
use cmdmon_collab::{AccessFilter, AccessVerdict, ClientLog, Namespace};
use cmdmon_wire::{
    constants::{COMPATIBILITY_FLOOR, PROTOCOL_VERSION, REQUEST_HEADER_SIZE},
    request_wire_length, Opcode, ReplyHeader, ReplyPayload, RequestHeader, RequestPayload, Status,
    PACKET_TYPE_REQUEST,
};
use tracing::{debug, trace, warn};

use crate::collaborators::Collaborators;
use crate::handlers;
use crate::policy::{self, TrustLevel};

/// Processes one received datagram end to end (§4.4 "Request validation
/// pipeline") and returns the bytes to send back, or `None` if the request
/// must be dropped without a reply. `origin` is the address `ClientLog`
/// accounting is keyed on; for `FilesystemSocket`/`IpLoopback` peers it is
/// supplied by the caller rather than derived from `trust`.
///
/// Steps, matching §4.4:
/// 1. For a remote peer, check the CMDALLOW/CMDDENY subnet table first and
///    drop silently on denial — no reply, no `ClientLog` event (§4.3, §7,
///    §8 scenario 6).
/// 2. Parse the fixed header; too-short or malformed datagrams are dropped.
/// 3. Verify the header names a REQUEST packet with both reserved bytes
///    zero; anything else is dropped as malformed.
/// 4. Requests below the compatibility floor are dropped silently (too old
///    to understand a `BAD-VERSION` reply).
/// 5. Requests above the floor but not matching our version get a
///    `BAD-PACKET-VERSION` reply instead of being parsed further.
/// 6. Resolve the raw `command` field into an [`Opcode`]; unknown opcodes
///    get `INVALID`.
/// 7. Authorize the now-known opcode's permission class against the peer's
///    trust level.
/// 8. Parse the opcode-tagged payload; a short/malformed payload gets
///    `BAD-PACKET-LENGTH`.
/// 9. Hand off to the opcode's handler and fill in the reply.
///
/// Every failure from step 2 onward increments the "bad packet" counter in
/// `ClientLog` (§4.4, §7); reaching a handler records a normal access.
pub fn process(
    data: &[u8],
    trust: TrustLevel,
    origin: IpAddr,
    collab: &mut Collaborators,
) -> Option<Vec<u8>> {
    if let TrustLevel::IpRemote(addr) = trust {
        if collab.access.check(Namespace::Cmdmon, addr) != AccessVerdict::Allowed {
            trace!(%addr, "dropping request from a host not in the C/M access table");
            return None;
        }
    }

    if data.len() < REQUEST_HEADER_SIZE {
        trace!(len = data.len(), "dropping undersized datagram");
        collab.client_log.record_dropped(origin);
        return None;
    }

    let mut rbuf = ReadBuffer::new(data);
    let header = match RequestHeader::read::<BigEndian>(&mut rbuf) {
        Ok(header) => header,
        Err(err) => {
            trace!(?err, "dropping unparseable request header");
            collab.client_log.record_dropped(origin);
            return None;
        }
    };

    if header.pkt_type != PACKET_TYPE_REQUEST || header.res1 != 0 || header.res2 != 0 {
        trace!(
            pkt_type = header.pkt_type,
            res1 = header.res1,
            res2 = header.res2,
            "dropping request with a bad packet type or reserved bytes"
        );
        collab.client_log.record_dropped(origin);
        return None;
    }

    if header.version < COMPATIBILITY_FLOOR {
        trace!(version = header.version, "dropping request below compatibility floor");
        collab.client_log.record_dropped(origin);
        return None;
    }

    if header.version != PROTOCOL_VERSION {
        debug!(version = header.version, "rejecting mismatched protocol version");
        collab.client_log.record_dropped(origin);
        return Some(encode_reply(
            ReplyHeader::template(header.command, header.sequence),
            Status::BadPacketVersion,
            ReplyPayload::None,
        ));
    }

    let opcode = match Opcode::try_from(header.command) {
        Ok(opcode) => opcode,
        Err(_) => {
            debug!(command = header.command, "rejecting unknown opcode");
            collab.client_log.record_dropped(origin);
            return Some(encode_reply(
                ReplyHeader::template(header.command, header.sequence),
                Status::Invalid,
                ReplyPayload::None,
            ));
        }
    };

    if let Err(status) = policy::authorize(trust, opcode.permission_class()) {
        warn!(?opcode, ?trust, "rejecting unauthorized request");
        collab.client_log.record_dropped(origin);
        return Some(encode_reply(
            ReplyHeader::template(header.command, header.sequence),
            status,
            ReplyPayload::None,
        ));
    }

    let expected_len = request_wire_length(opcode);
    if data.len() < expected_len {
        debug!(?opcode, len = data.len(), expected_len, "rejecting short payload");
        collab.client_log.record_dropped(origin);
        return Some(encode_reply(
            ReplyHeader::template(header.command, header.sequence),
            Status::BadPacketLength,
            ReplyPayload::None,
        ));
    }

    let payload = match RequestPayload::read::<BigEndian>(opcode, &mut rbuf) {
        Ok(payload) => payload,
        Err(err) => {
            debug!(?opcode, ?err, "rejecting malformed payload");
            collab.client_log.record_dropped(origin);
            return Some(encode_reply(
                ReplyHeader::template(header.command, header.sequence),
                Status::BadPacketLength,
                ReplyPayload::None,
            ));
        }
    };

    collab.client_log.record_access(origin);
    let (status, reply_payload) = handlers::handle(opcode, payload, collab);

    Some(encode_reply(
        ReplyHeader::template(header.command, header.sequence),
        status,
        reply_payload,
    ))
}

fn encode_reply(mut header: ReplyHeader, status: Status, payload: ReplyPayload) -> Vec<u8> {
    header.status = status as u16;
    header.reply_tag = payload.tag() as u16;

    let mut wbuf = WriteBuffer::new();
    // A header write failure here would mean the fixed-size reply header
    // itself no longer round-trips, which is a codec bug, not a runtime
    // condition callers can recover from.
    header
        .write::<BigEndian>(&mut wbuf)
        .expect("reply header always encodes");
    encode_payload(&payload, &mut wbuf);

    wbuf.bytes().to_vec()
}

fn encode_payload(payload: &ReplyPayload, wbuf: &mut WriteBuffer) {
    match payload {
        ReplyPayload::None => {}
        ReplyPayload::NSources(n) => {
            let _ = n.write::<BigEndian>(wbuf);
        }
        ReplyPayload::SourceData(row) => write_source_data(row, wbuf),
        ReplyPayload::Sourcestats(row) => write_sourcestats(row, wbuf),
        ReplyPayload::Tracking(report) => write_tracking(report, wbuf),
        ReplyPayload::Rtc(report) => write_rtc(report, wbuf),
        ReplyPayload::Activity(report) => write_activity(report, wbuf),
        ReplyPayload::Smoothing(report) => write_smoothing(report, wbuf),
        ReplyPayload::ManualList(rows) => {
            for row in rows {
                write_manual_sample(row, wbuf);
            }
        }
        ReplyPayload::ClientAccesses(page) => {
            let _ = page.next_index.write::<BigEndian>(wbuf);
            let _ = page.n_indices.write::<BigEndian>(wbuf);
            for row in &page.rows {
                let _ = row.ip.write::<BigEndian>(wbuf);
                let _ = row.last_access_ago_seconds.write::<BigEndian>(wbuf);
                let _ = row.n_requests.write::<BigEndian>(wbuf);
                let _ = row.n_dropped.write::<BigEndian>(wbuf);
            }
        }
    }
}

fn write_source_data(row: &cmdmon_wire::SourceDataRow, wbuf: &mut WriteBuffer) {
    let _ = row.address.write::<BigEndian>(wbuf);
    wbuf.push(row.poll as u8);
    wbuf.push(row.stratum);
    wbuf.push(row.state);
    wbuf.push(row.mode);
    wbuf.push(row.flags);
    wbuf.push(row.reachability);
    let _ = row.since_sample.write::<BigEndian>(wbuf);
    let _ = row.orig_latest_meas.write::<BigEndian>(wbuf);
    let _ = row.latest_meas.write::<BigEndian>(wbuf);
    let _ = row.latest_meas_err.write::<BigEndian>(wbuf);
}

fn write_sourcestats(row: &cmdmon_wire::SourcestatsRow, wbuf: &mut WriteBuffer) {
    let _ = row.ref_id.write::<BigEndian>(wbuf);
    let _ = row.address.write::<BigEndian>(wbuf);
    let _ = row.n_samples.write::<BigEndian>(wbuf);
    let _ = row.n_runs.write::<BigEndian>(wbuf);
    let _ = row.span_seconds.write::<BigEndian>(wbuf);
    let _ = row.std_dev.write::<BigEndian>(wbuf);
    let _ = row.resid_freq_ppm.write::<BigEndian>(wbuf);
    let _ = row.skew_ppm.write::<BigEndian>(wbuf);
    let _ = row.est_offset.write::<BigEndian>(wbuf);
    let _ = row.est_offset_err.write::<BigEndian>(wbuf);
}

fn write_tracking(report: &cmdmon_wire::TrackingReport, wbuf: &mut WriteBuffer) {
    let _ = report.ref_id.write::<BigEndian>(wbuf);
    let _ = report.address.write::<BigEndian>(wbuf);
    let _ = report.stratum.write::<BigEndian>(wbuf);
    let _ = report.leap_status.write::<BigEndian>(wbuf);
    let _ = report.ref_time.write::<BigEndian>(wbuf);
    let _ = report.current_correction.write::<BigEndian>(wbuf);
    let _ = report.last_offset.write::<BigEndian>(wbuf);
    let _ = report.rms_offset.write::<BigEndian>(wbuf);
    let _ = report.freq_ppm.write::<BigEndian>(wbuf);
    let _ = report.resid_freq_ppm.write::<BigEndian>(wbuf);
    let _ = report.skew_ppm.write::<BigEndian>(wbuf);
    let _ = report.root_delay.write::<BigEndian>(wbuf);
    let _ = report.root_dispersion.write::<BigEndian>(wbuf);
    let _ = report.last_update_interval.write::<BigEndian>(wbuf);
}

fn write_rtc(report: &cmdmon_wire::RtcReport, wbuf: &mut WriteBuffer) {
    let _ = report.ref_time.write::<BigEndian>(wbuf);
    let _ = report.n_samples.write::<BigEndian>(wbuf);
    let _ = report.n_runs.write::<BigEndian>(wbuf);
    let _ = report.span_seconds.write::<BigEndian>(wbuf);
    let _ = report.rtc_seconds_fast.write::<BigEndian>(wbuf);
    let _ = report.rtc_gain_rate_ppm.write::<BigEndian>(wbuf);
}

fn write_activity(report: &cmdmon_wire::ActivityReport, wbuf: &mut WriteBuffer) {
    let _ = report.online.write::<BigEndian>(wbuf);
    let _ = report.offline.write::<BigEndian>(wbuf);
    let _ = report.burst_online.write::<BigEndian>(wbuf);
    let _ = report.burst_offline.write::<BigEndian>(wbuf);
    let _ = report.unresolved.write::<BigEndian>(wbuf);
}

fn write_smoothing(report: &cmdmon_wire::SmoothingReport, wbuf: &mut WriteBuffer) {
    wbuf.push(report.active as u8);
    wbuf.push(report.leap_only as u8);
    let _ = report.offset.write::<BigEndian>(wbuf);
    let _ = report.freq_ppm.write::<BigEndian>(wbuf);
    let _ = report.wander_ppm.write::<BigEndian>(wbuf);
    let _ = report.last_update_ago_seconds.write::<BigEndian>(wbuf);
    let _ = report.remaining_seconds.write::<BigEndian>(wbuf);
}

fn write_manual_sample(row: &cmdmon_wire::ManualSampleRow, wbuf: &mut WriteBuffer) {
    let _ = row.sample_index.write::<BigEndian>(wbuf);
    let _ = row.when.write::<BigEndian>(wbuf);
    let _ = row.offset.write::<BigEndian>(wbuf);
    let _ = row.peer_dispersion.write::<BigEndian>(wbuf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmdmon_wire::PACKET_TYPE_REQUEST;

    fn request_bytes(version: u8, command: u16) -> Vec<u8> {
        let header = RequestHeader {
            version,
            pkt_type: PACKET_TYPE_REQUEST,
            res1: 0,
            res2: 0,
            command,
            attempt: 0,
            sequence: 7,
            utoken: 0,
            token: 0,
            auth: [0; 16],
            attempted_at: cmdmon_wire::Timestamp {
                seconds: 0,
                microseconds: 0,
            },
        };
        let mut wbuf = WriteBuffer::new();
        header.write::<BigEndian>(&mut wbuf).unwrap();
        wbuf.bytes().to_vec()
    }

    fn reply_status(bytes: &[u8]) -> Status {
        let mut rbuf = ReadBuffer::new(bytes);
        let header = ReplyHeader::read::<BigEndian>(&mut rbuf).unwrap();
        Status::try_from(header.status).unwrap()
    }

    const LOCAL_ORIGIN: std::net::IpAddr = std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST);

    #[test]
    fn bad_version_above_floor_gets_a_reply() {
        let mut collab = Collaborators::in_memory(0);
        let data = request_bytes(PROTOCOL_VERSION + 1, Opcode::Null as u16);
        let reply = process(&data, TrustLevel::FilesystemSocket, LOCAL_ORIGIN, &mut collab).unwrap();
        assert_eq!(reply_status(&reply), Status::BadPacketVersion);
    }

    #[test]
    fn version_below_floor_is_dropped_silently() {
        let mut collab = Collaborators::in_memory(0);
        let data = request_bytes(COMPATIBILITY_FLOOR - 1, Opcode::Null as u16);
        assert!(process(&data, TrustLevel::FilesystemSocket, LOCAL_ORIGIN, &mut collab).is_none());
    }

    #[test]
    fn cidr_denied_remote_peer_is_dropped_silently_with_no_log_event() {
        let mut collab = Collaborators::in_memory(0);
        let data = request_bytes(PROTOCOL_VERSION, Opcode::Tracking as u16);
        let addr: std::net::IpAddr = "198.51.100.7".parse().unwrap();
        assert!(process(&data, TrustLevel::IpRemote(addr), addr, &mut collab).is_none());

        let page = collab.client_log.page(0, 10);
        assert!(page.rows.is_empty(), "a CIDR-denied drop must not touch ClientLog");
    }

    #[test]
    fn unauthorized_remote_auth_opcode_is_rejected() {
        let mut collab = Collaborators::in_memory(0);
        let addr: std::net::IpAddr = "198.51.100.7".parse().unwrap();
        collab.access.allow(cmdmon_collab::Namespace::Cmdmon, "198.51.100.0/24".parse().unwrap());

        let data = request_bytes(PROTOCOL_VERSION, Opcode::Reselect as u16);
        let reply = process(&data, TrustLevel::IpRemote(addr), addr, &mut collab).unwrap();
        assert_eq!(reply_status(&reply), Status::Unauthorized);
    }

    #[test]
    fn null_from_local_socket_succeeds() {
        let mut collab = Collaborators::in_memory(0);
        let data = request_bytes(PROTOCOL_VERSION, Opcode::Null as u16);
        let reply = process(&data, TrustLevel::FilesystemSocket, LOCAL_ORIGIN, &mut collab).unwrap();
        assert_eq!(reply_status(&reply), Status::Success);
    }

    #[test]
    fn nsources_reports_zero_when_empty() {
        let mut collab = Collaborators::in_memory(0);
        let data = request_bytes(PROTOCOL_VERSION, Opcode::NSources as u16);
        let reply = process(&data, TrustLevel::FilesystemSocket, LOCAL_ORIGIN, &mut collab).unwrap();
        assert_eq!(reply_status(&reply), Status::Success);

        let mut rbuf = ReadBuffer::new(&reply);
        let _header = ReplyHeader::read::<BigEndian>(&mut rbuf).unwrap();
        let n = u32::read::<BigEndian>(&mut rbuf).unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn successful_request_records_an_access() {
        let mut collab = Collaborators::in_memory(0);
        let data = request_bytes(PROTOCOL_VERSION, Opcode::Null as u16);
        process(&data, TrustLevel::FilesystemSocket, LOCAL_ORIGIN, &mut collab).unwrap();

        let page = collab.client_log.page(0, 10);
        assert_eq!(page.rows.len(), 1);
        assert_eq!(page.rows[0].n_requests, 1);
        assert_eq!(page.rows[0].n_dropped, 0);
    }

    #[test]
    fn bad_pkt_type_is_dropped_silently() {
        let mut collab = Collaborators::in_memory(0);
        let mut data = request_bytes(PROTOCOL_VERSION, Opcode::Null as u16);
        data[1] = cmdmon_wire::PACKET_TYPE_REPLY;
        assert!(process(&data, TrustLevel::FilesystemSocket, LOCAL_ORIGIN, &mut collab).is_none());
    }

    #[test]
    fn nonzero_reserved_byte_is_dropped_silently() {
        let mut collab = Collaborators::in_memory(0);
        let mut data = request_bytes(PROTOCOL_VERSION, Opcode::Null as u16);
        data[2] = 1;
        assert!(process(&data, TrustLevel::FilesystemSocket, LOCAL_ORIGIN, &mut collab).is_none());
    }
}
