//! Shared fixtures for smithsnmp integration tests.

// Allow dead code since not all test files use all utilities
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use bytes::Bytes;

use smithsnmp::agent::Agent;
use smithsnmp::ber::{EncodeBuf, tag};
use smithsnmp::handler::{ScalarHandler, SetResult, TableHandler};
use smithsnmp::message::{Datagram, decode_message};
use smithsnmp::mib::{Access, Acl};
use smithsnmp::v3::{AuthProtocol, ENGINE_ID, PrivProtocol};
use smithsnmp::varbind::VarBind;
use smithsnmp::{Oid, Value, Version, oid};

pub const AUTH_PASS: &[u8] = b"authpass";
pub const PRIV_PASS: &[u8] = b"privpass";

// =============================================================================
// Well-known OIDs
// =============================================================================

pub fn sys_descr() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)
}
pub fn sys_uptime() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1, 3, 0)
}
pub fn sys_name() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1, 5, 0)
}
pub fn if_index_column() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 1)
}

// =============================================================================
// Test agent
// =============================================================================

/// Writable sysName state shared with the test body.
pub fn sys_name_cell() -> Arc<AtomicI32> {
    Arc::new(AtomicI32::new(0))
}

/// The standard test agent:
///
/// - community `public`: read view 1.3.6.1
/// - community `private`: read + write views 1.3.6.1
/// - community `narrow`: read view 1.3.6.1.2.1.1 only
/// - user `alice` (SHA-1 / AES-128): read + write views 1.3.6.1
/// - sysDescr.0 = "SmithSNMP", sysUpTime.0 = TimeTicks, writable counter at
///   sysName.0, ifIndex column with rows 1 and 2
pub fn test_agent(sys_name_value: Arc<AtomicI32>) -> Agent {
    let read_cell = Arc::clone(&sys_name_value);
    Agent::builder()
        .community_read(oid!(1, 3, 6, 1), "public")
        .community_read(oid!(1, 3, 6, 1), "private")
        .community_write(oid!(1, 3, 6, 1), "private")
        .community_read(oid!(1, 3, 6, 1, 2, 1, 1), "narrow")
        .user_create(
            "alice",
            Some((AuthProtocol::Sha1, AUTH_PASS)),
            Some((PrivProtocol::Aes128, PRIV_PASS)),
        )
        .user_read(oid!(1, 3, 6, 1), "alice")
        .user_write(oid!(1, 3, 6, 1), "alice")
        .register(
            oid!(1, 3, 6, 1, 2, 1, 1, 1),
            ScalarHandler::read_only(|| Value::from("SmithSNMP")),
        )
        .register(
            oid!(1, 3, 6, 1, 2, 1, 1, 3),
            ScalarHandler::read_only(|| Value::TimeTicks(123456)),
        )
        .register(
            oid!(1, 3, 6, 1, 2, 1, 1, 5),
            ScalarHandler::read_write(
                move || Value::Integer(read_cell.load(Ordering::Relaxed)),
                move |value| match value {
                    Value::Integer(v) => {
                        sys_name_value.store(*v, Ordering::Relaxed);
                        SetResult::Ok
                    }
                    _ => SetResult::WrongType,
                },
            ),
        )
        .register(
            if_index_column(),
            TableHandler::read_only(vec![
                (oid!(1), Value::Integer(1)),
                (oid!(2), Value::Integer(2)),
            ]),
        )
        .build()
}

/// An ACL holding the manager-side copy of the v3 credentials, used to
/// parse (decrypt + verify) agent responses in tests.
pub fn manager_acl() -> Acl {
    let mut acl = Acl::new();
    acl.user_create(
        "alice",
        Some((AuthProtocol::Sha1, AUTH_PASS)),
        Some((PrivProtocol::Aes128, PRIV_PASS)),
        &ENGINE_ID,
    )
    .unwrap();
    acl
}

// =============================================================================
// Request builders
// =============================================================================

/// Encode a v1/v2c request datagram.
pub fn community_request(
    version: Version,
    community: &[u8],
    pdu_tag: u8,
    request_id: i32,
    field1: i32,
    field2: i32,
    varbinds: &[VarBind],
) -> Vec<u8> {
    let mut buf = EncodeBuf::new();
    buf.push_sequence(|buf| {
        buf.push_constructed(pdu_tag, |buf| {
            VarBind::encode_list(buf, varbinds);
            buf.push_integer(field2);
            buf.push_integer(field1);
            buf.push_integer(request_id);
        });
        buf.push_octet_string(community);
        buf.push_integer(version.as_i32());
    });
    buf.finish_vec()
}

/// Encode a v2c GET for a list of OIDs.
pub fn v2c_get(community: &[u8], request_id: i32, oids: &[Oid]) -> Vec<u8> {
    let varbinds: Vec<VarBind> = oids.iter().cloned().map(VarBind::null).collect();
    community_request(
        Version::V2c,
        community,
        tag::pdu::GET_REQUEST,
        request_id,
        0,
        0,
        &varbinds,
    )
}

/// Encode a v2c GETNEXT for a list of OIDs.
pub fn v2c_get_next(community: &[u8], request_id: i32, oids: &[Oid]) -> Vec<u8> {
    let varbinds: Vec<VarBind> = oids.iter().cloned().map(VarBind::null).collect();
    community_request(
        Version::V2c,
        community,
        tag::pdu::GET_NEXT_REQUEST,
        request_id,
        0,
        0,
        &varbinds,
    )
}

/// Encode a v2c SET.
pub fn v2c_set(community: &[u8], request_id: i32, varbinds: &[VarBind]) -> Vec<u8> {
    community_request(
        Version::V2c,
        community,
        tag::pdu::SET_REQUEST,
        request_id,
        0,
        0,
        varbinds,
    )
}

/// Encode a v2c GETBULK.
pub fn v2c_get_bulk(
    community: &[u8],
    request_id: i32,
    non_repeaters: i32,
    max_repetitions: i32,
    oids: &[Oid],
) -> Vec<u8> {
    let varbinds: Vec<VarBind> = oids.iter().cloned().map(VarBind::null).collect();
    community_request(
        Version::V2c,
        community,
        tag::pdu::GET_BULK_REQUEST,
        request_id,
        non_repeaters,
        max_repetitions,
        &varbinds,
    )
}

// =============================================================================
// Response decoding
// =============================================================================

/// Parse a response datagram with the manager-side credentials.
pub fn parse_response(wire: &[u8], acl: &Acl) -> Datagram {
    decode_message(wire, acl).expect("response must parse")
}

/// Parse a v1/v2c response (no credentials needed beyond the community).
pub fn parse_community_response(wire: &[u8]) -> Datagram {
    let mut acl = Acl::new();
    acl.community_register(&oid!(1, 3, 6, 1), "public", Access::ReadOnly);
    decode_message(wire, &acl).expect("response must parse")
}

/// Shorthand asserting a response PDU's header fields.
pub fn assert_header(datagram: &Datagram, request_id: i32, status: i32, index: i32) {
    let pdu = datagram.pdu();
    assert_eq!(pdu.pdu_type, smithsnmp::message::PduType::Response);
    assert_eq!(pdu.request_id, request_id);
    assert_eq!(pdu.error_status, status, "error status");
    assert_eq!(pdu.error_index, index, "error index");
}

/// Extract Bytes from an OctetString value.
pub fn octets(value: &Value) -> Bytes {
    match value {
        Value::OctetString(bytes) => bytes.clone(),
        other => panic!("expected OctetString, got {other:?}"),
    }
}
