use cmdmon_collab::{AccessFilter, ClientLog, ManualError, Namespace, RtcError};
use cmdmon_wire::{
    constants::MAX_CLIENT_ACCESSES_PER_REPLY, Opcode, RequestPayload, ReplyPayload, Status,
};
use ipnet::IpNet;

use crate::collaborators::Collaborators;

/// Invokes the collaborator operation(s) named by `opcode` (§4.5 "Request
/// handling"). Each handler reports outcomes through the returned
/// [`Status`]; a semantic failure (no such source, RTC unsupported, ...)
/// leaves the reply payload at [`ReplyPayload::None`] rather than
/// propagating a transport-level error (§4.5 "Status-code policy").
pub fn handle(
    opcode: Opcode,
    payload: RequestPayload,
    collab: &mut Collaborators,
) -> (Status, ReplyPayload) {
    match (opcode, payload) {
        (Opcode::Null, _) => (Status::Success, ReplyPayload::None),

        (Opcode::Online, RequestPayload::AddressPattern(pattern)) => {
            let n = collab.sources.set_online(pattern.mask.to_ip_addr().unwrap_or(std::net::IpAddr::from([0, 0, 0, 0])), pattern.address.to_ip_addr().unwrap_or(std::net::IpAddr::from([0, 0, 0, 0])));
            status_from_match_count(n)
        }

        (Opcode::Offline, RequestPayload::AddressPattern(pattern)) => {
            let mask = pattern.mask.to_ip_addr().unwrap_or(std::net::IpAddr::from([0, 0, 0, 0]));
            let address = pattern.address.to_ip_addr().unwrap_or(std::net::IpAddr::from([0, 0, 0, 0]));
            let n = collab.sources.set_offline(mask, address);
            status_from_match_count(n)
        }

        (Opcode::Burst, RequestPayload::Burst(req)) => {
            let mask = req.pattern.mask.to_ip_addr().unwrap_or(std::net::IpAddr::from([0, 0, 0, 0]));
            let address = req.pattern.address.to_ip_addr().unwrap_or(std::net::IpAddr::from([0, 0, 0, 0]));
            let n = collab
                .sources
                .initiate_burst(mask, address, req.n_good_samples, req.n_total_samples);
            status_from_match_count(n)
        }

        (Opcode::AddServer, RequestPayload::SourceAdd { address, params }) => {
            add_source(collab, address, params, false)
        }

        (Opcode::AddPeer, RequestPayload::SourceAdd { address, params }) => {
            add_source(collab, address, params, true)
        }

        (Opcode::DelSource, RequestPayload::SourceAddress(ip)) => {
            let Some(addr) = ip.to_ip_addr() else {
                return (Status::InvalidAf, ReplyPayload::None);
            };
            status_from_control(collab.sources.remove(addr))
        }

        (Opcode::ModifyMinpoll, RequestPayload::ModifyInt(req)) => {
            with_address(req.address, |addr| collab.sources.modify_minpoll(addr, req.value))
        }
        (Opcode::ModifyMaxpoll, RequestPayload::ModifyInt(req)) => {
            with_address(req.address, |addr| collab.sources.modify_maxpoll(addr, req.value))
        }
        (Opcode::ModifyMinstratum, RequestPayload::ModifyInt(req)) => {
            with_address(req.address, |addr| collab.sources.modify_min_stratum(addr, req.value))
        }
        (Opcode::ModifyPolltarget, RequestPayload::ModifyInt(req)) => {
            with_address(req.address, |addr| collab.sources.modify_poll_target(addr, req.value))
        }

        (Opcode::ModifyMaxdelay, RequestPayload::ModifyFloat(req)) => {
            with_address(req.address, |addr| collab.sources.modify_max_delay(addr, req.value.0))
        }
        (Opcode::ModifyMaxdelayratio, RequestPayload::ModifyFloat(req)) => with_address(
            req.address,
            |addr| collab.sources.modify_max_delay_ratio(addr, req.value.0),
        ),
        (Opcode::ModifyMaxdelaydevratio, RequestPayload::ModifyFloat(req)) => with_address(
            req.address,
            |addr| collab.sources.modify_max_delay_dev_ratio(addr, req.value.0),
        ),

        (Opcode::ModifyMaxupdateskew, RequestPayload::ModifyMaxupdateskew(value)) => {
            collab.local_clock.set_max_update_skew(value);
            (Status::Success, ReplyPayload::None)
        }

        (Opcode::ModifyMakestep, RequestPayload::ModifyMakestep(req)) => {
            collab.local_clock.set_makestep(req.limit, req.threshold);
            (Status::Success, ReplyPayload::None)
        }

        (Opcode::Local, RequestPayload::Local(req)) => {
            collab.local_clock.set_local(req);
            (Status::Success, ReplyPayload::None)
        }

        (Opcode::Reselect, _) => {
            collab.reference.reselect();
            (Status::Success, ReplyPayload::None)
        }

        (Opcode::Reselectdistance, RequestPayload::ReselectDistance(value)) => {
            collab.reference.set_reselect_distance(value);
            (Status::Success, ReplyPayload::None)
        }

        (Opcode::Tracking, _) => {
            (Status::Success, ReplyPayload::Tracking(collab.local_clock.tracking()))
        }

        (Opcode::Refresh, _) => {
            collab.sources.refresh_addresses();
            collab.refclocks.refresh();
            (Status::Success, ReplyPayload::None)
        }

        (Opcode::Rekey, _) => match collab.keys.reload() {
            Ok(()) => (Status::Success, ReplyPayload::None),
            Err(_) => (Status::Failed, ReplyPayload::None),
        },

        (Opcode::Settime, RequestPayload::Settime(when)) => match collab.manual.accept_timestamp(when) {
            Ok(()) => (Status::Success, ReplyPayload::None),
            Err(ManualError::NotEnabled) => (Status::NotEnabled, ReplyPayload::None),
            Err(ManualError::NoSuchSample) => (Status::Failed, ReplyPayload::None),
        },

        (Opcode::Dfreq, RequestPayload::Dfreq(value)) => {
            collab.local_clock.step_frequency(value);
            (Status::Success, ReplyPayload::None)
        }

        (Opcode::Doffset, RequestPayload::Doffset(value)) => {
            collab.local_clock.step_offset(value);
            (Status::Success, ReplyPayload::None)
        }

        (Opcode::Makestep, _) => {
            collab.local_clock.step_now();
            (Status::Success, ReplyPayload::None)
        }

        (Opcode::NSources, _) => {
            (Status::Success, ReplyPayload::NSources(collab.sources.n_sources()))
        }

        (Opcode::SourceData, RequestPayload::ByIndex(index)) => {
            match collab.sources.report_by_index(index) {
                Some(row) => (Status::Success, ReplyPayload::SourceData(row)),
                None => (Status::NoSuchSource, ReplyPayload::None),
            }
        }

        (Opcode::Sourcestats, RequestPayload::ByIndex(index)) => {
            match collab.sources.stats_by_index(index) {
                Some(row) => (Status::Success, ReplyPayload::Sourcestats(row)),
                None => (Status::NoSuchSource, ReplyPayload::None),
            }
        }

        (Opcode::Rtcreport, _) => match collab.rtc.report() {
            Ok(report) => (Status::Success, ReplyPayload::Rtc(report)),
            Err(RtcError::Unsupported) => (Status::NoRtc, ReplyPayload::None),
        },

        (Opcode::Activity, _) => {
            (Status::Success, ReplyPayload::Activity(collab.sources.activity()))
        }

        (Opcode::Smoothing, _) => {
            (Status::Success, ReplyPayload::Smoothing(collab.smooth.report()))
        }

        (Opcode::ManualList, _) => {
            (Status::Success, ReplyPayload::ManualList(collab.manual.samples()))
        }

        (Opcode::ClientAccessesByIndex, RequestPayload::Paging(req)) => {
            if !collab.client_log.is_active() {
                return (Status::Inactive, ReplyPayload::None);
            }
            let n = (req.n_clients as usize).min(MAX_CLIENT_ACCESSES_PER_REPLY) as u32;
            let page = collab.client_log.page(req.first_index, n);
            (Status::Success, ReplyPayload::ClientAccesses(page))
        }

        (
            Opcode::Allow | Opcode::Allowall | Opcode::Deny | Opcode::Denyall,
            RequestPayload::AccessSubnet(req),
        ) => apply_access_rule(collab, Namespace::Ntp, opcode, req),

        (
            Opcode::Cmdallow | Opcode::Cmdallowall | Opcode::Cmddeny | Opcode::Cmddenyall,
            RequestPayload::AccessSubnet(req),
        ) => apply_access_rule(collab, Namespace::Cmdmon, opcode, req),

        (Opcode::Accheck, RequestPayload::SourceAddress(ip)) => access_check(collab, Namespace::Ntp, ip),
        (Opcode::Cmdaccheck, RequestPayload::SourceAddress(ip)) => {
            access_check(collab, Namespace::Cmdmon, ip)
        }

        (Opcode::Manual, RequestPayload::Manual(req)) => {
            collab.manual.set_mode(req.mode);
            (Status::Success, ReplyPayload::None)
        }

        (Opcode::ManualDelete, RequestPayload::ManualDelete(index)) => {
            match collab.manual.delete_sample(index) {
                Ok(()) => (Status::Success, ReplyPayload::None),
                Err(_) => (Status::BadSample, ReplyPayload::None),
            }
        }

        (Opcode::Smoothtime, RequestPayload::Smoothtime(mode)) => {
            collab.smooth.apply(mode);
            (Status::Success, ReplyPayload::None)
        }

        (Opcode::Writertc, _) => match collab.rtc.write() {
            Ok(()) => (Status::Success, ReplyPayload::None),
            Err(RtcError::Unsupported) => (Status::NoRtc, ReplyPayload::None),
        },

        (Opcode::Trimrtc, _) => match collab.rtc.trim() {
            Ok(()) => (Status::Success, ReplyPayload::None),
            Err(RtcError::Unsupported) => (Status::NoRtc, ReplyPayload::None),
        },

        (Opcode::Dump, _) => match collab.config.dump() {
            Ok(_) => (Status::Success, ReplyPayload::None),
            Err(_) => (Status::Failed, ReplyPayload::None),
        },

        (Opcode::Cyclelogs, _) => {
            collab.scheduler.cycle_logs();
            (Status::Success, ReplyPayload::None)
        }

        // Authentication is out of scope for this daemon build (§1
        // "Deliberately out of scope"); LOGON always fails rather than
        // pretending to grant a session it can't back.
        (Opcode::Logon, _) => (Status::Failed, ReplyPayload::None),

        // Any opcode/payload combination reaching here means the payload
        // parser and this match fell out of sync; that is a programming
        // error in this crate, not a malformed request (the dispatcher
        // already validated the request against this same opcode table).
        _ => (Status::Failed, ReplyPayload::None),
    }
}

fn status_from_match_count(n: usize) -> (Status, ReplyPayload) {
    if n == 0 {
        (Status::NoSuchSource, ReplyPayload::None)
    } else {
        (Status::Success, ReplyPayload::None)
    }
}

fn status_from_control(outcome: cmdmon_collab::SourceControlOutcome) -> (Status, ReplyPayload) {
    match outcome {
        cmdmon_collab::SourceControlOutcome::Ok => (Status::Success, ReplyPayload::None),
        cmdmon_collab::SourceControlOutcome::NoSuchSource => {
            (Status::NoSuchSource, ReplyPayload::None)
        }
    }
}

fn with_address(
    ip: cmdmon_wire::WireIpAddr,
    f: impl FnOnce(std::net::IpAddr) -> cmdmon_collab::SourceControlOutcome,
) -> (Status, ReplyPayload) {
    match ip.to_ip_addr() {
        Some(addr) => status_from_control(f(addr)),
        None => (Status::InvalidAf, ReplyPayload::None),
    }
}

fn add_source(
    collab: &mut Collaborators,
    address: cmdmon_wire::SourceAddress,
    params: cmdmon_wire::SourceParams,
    is_peer: bool,
) -> (Status, ReplyPayload) {
    let Some(addr) = address.ip.to_ip_addr() else {
        return (Status::InvalidAf, ReplyPayload::None);
    };

    let outcome = if is_peer {
        collab.sources.add_peer(addr, address.port, params)
    } else {
        collab.sources.add_server(addr, address.port, params)
    };

    match outcome {
        cmdmon_collab::SourceAddOutcome::Added => (Status::Success, ReplyPayload::None),
        cmdmon_collab::SourceAddOutcome::AlreadyKnown => {
            (Status::SourceAlreadyKnown, ReplyPayload::None)
        }
        cmdmon_collab::SourceAddOutcome::TooMany => (Status::TooManySources, ReplyPayload::None),
        cmdmon_collab::SourceAddOutcome::InvalidAf => (Status::InvalidAf, ReplyPayload::None),
    }
}

fn apply_access_rule(
    collab: &mut Collaborators,
    namespace: Namespace,
    opcode: Opcode,
    req: cmdmon_wire::AccessSubnetRequest,
) -> (Status, ReplyPayload) {
    let Some(addr) = req.ip.to_ip_addr() else {
        return (Status::InvalidAf, ReplyPayload::None);
    };

    let Ok(net) = IpNet::new(addr, req.subnet_bits.clamp(0, 128) as u8) else {
        return (Status::BadSubnet, ReplyPayload::None);
    };

    match opcode {
        Opcode::Allow | Opcode::Cmdallow => collab.access.allow(namespace, net),
        Opcode::Allowall | Opcode::Cmdallowall => collab.access.allow_all(namespace, net),
        Opcode::Deny | Opcode::Cmddeny => collab.access.deny(namespace, net),
        Opcode::Denyall | Opcode::Cmddenyall => collab.access.deny_all(namespace, net),
        _ => unreachable!("apply_access_rule only called for ALLOW/DENY family opcodes"),
    }

    (Status::Success, ReplyPayload::None)
}

fn access_check(
    collab: &Collaborators,
    namespace: Namespace,
    ip: cmdmon_wire::WireIpAddr,
) -> (Status, ReplyPayload) {
    let Some(addr) = ip.to_ip_addr() else {
        return (Status::InvalidAf, ReplyPayload::None);
    };

    match collab.access.check(namespace, addr) {
        cmdmon_collab::AccessVerdict::Allowed => (Status::AccessAllowed, ReplyPayload::None),
        cmdmon_collab::AccessVerdict::Denied => (Status::AccessDenied, ReplyPayload::None),
    }
}
