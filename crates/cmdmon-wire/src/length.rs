//! Opcode-dependent packet lengths (§4.1 "Contract").
//!
//! These are consulted twice during dispatch: to compute the expected
//! length of an incoming request (§4.4 step 3/7) and to bound the outgoing
//! `sendto` length for a reply (§4.2 "Send side").

use crate::{
    constants::{REPLY_HEADER_SIZE, REQUEST_HEADER_SIZE},
    Opcode, ReplyPayload, ReplyTag,
};

/// Reserved trailing bytes within a nonzero-length request's fixed payload
/// area (GLOSSARY "Padding length"). Kept deliberately small and uniform:
/// this is a from-scratch protocol with no legacy clients to preserve byte
/// offsets for.
const REQUEST_PADDING: usize = 4;

fn request_payload_len(opcode: Opcode) -> usize {
    use Opcode::*;

    match opcode {
        Null | Tracking | NSources | Rtcreport | Activity | Smoothing | ManualList | Reselect
        | Refresh | Rekey | Makestep | Dump | Cyclelogs | Logon | Writertc | Trimrtc => 0,

        SourceData | Sourcestats => 4, // by-index u32

        Online | Offline => 40, // AddressPattern (mask + address)
        Burst => 48,            // AddressPattern + n_good + n_total

        DelSource | Accheck | Cmdaccheck => 20, // single WireIpAddr

        AddServer | AddPeer => 58, // SourceAddress(22) + SourceParams(36)

        ModifyMinpoll | ModifyMaxpoll | ModifyMinstratum | ModifyPolltarget => 24,
        ModifyMaxdelay | ModifyMaxdelayratio | ModifyMaxdelaydevratio => 24,

        ModifyMaxupdateskew => 4,
        ModifyMakestep => 8,
        Local => 7,
        Reselectdistance => 4,
        Settime => 8,
        Dfreq => 4,
        Doffset => 4,
        ClientAccessesByIndex => 8,

        Allow | Allowall | Deny | Denyall | Cmdallow | Cmdallowall | Cmddeny | Cmddenyall => 24,

        Manual => 1,
        ManualDelete => 4,
        Smoothtime => 1,
    }
}

/// Total on-the-wire length of a request carrying `opcode` (§4.1
/// "Contract"). Equal to the header size alone for payload-less opcodes.
pub fn request_wire_length(opcode: Opcode) -> usize {
    let payload = request_payload_len(opcode);
    if payload == 0 {
        return REQUEST_HEADER_SIZE;
    }

    REQUEST_HEADER_SIZE + payload + padding_length(opcode)
}

/// Trailing unused bytes within `opcode`'s fixed payload area.
pub fn padding_length(opcode: Opcode) -> usize {
    if request_payload_len(opcode) == 0 {
        0
    } else {
        REQUEST_PADDING
    }
}

fn reply_payload_len(payload: &ReplyPayload) -> usize {
    match payload {
        ReplyPayload::None => 0,
        ReplyPayload::NSources(_) => 4,
        ReplyPayload::SourceData(_) => 32,
        ReplyPayload::Sourcestats(_) => 44,
        ReplyPayload::Tracking(_) => 76,
        ReplyPayload::Rtc(_) => 20,
        ReplyPayload::Activity(_) => 20,
        ReplyPayload::Smoothing(_) => 26,
        ReplyPayload::ManualList(rows) => rows.len() * 20,
        ReplyPayload::ClientAccesses(page) => 8 + page.rows.len() * 16,
    }
}

/// Total on-the-wire length of a reply carrying this payload (§4.1
/// "Contract"). Paged reply variants (`MANUAL-LIST`,
/// `CLIENT-ACCESSES-BY-INDEX`) are not fixed size; their length is derived
/// from the number of rows actually packed.
pub fn reply_wire_length(payload: &ReplyPayload) -> usize {
    REPLY_HEADER_SIZE + reply_payload_len(payload)
}
