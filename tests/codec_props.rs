//! Property tests for the OID ordering laws and BER codec round trips.

use bytes::Bytes;
use proptest::prelude::*;

use smithsnmp::ber::{Decoder, EncodeBuf, tag};
use smithsnmp::error::ErrorStatus;
use smithsnmp::message::{Pdu, decode_message, encode_community_response};
use smithsnmp::mib::{Access, Acl};
use smithsnmp::value::Value;
use smithsnmp::varbind::VarBind;
use smithsnmp::{Oid, Version, oid};

// =============================================================================
// Strategies
// =============================================================================

/// Arbitrary OID arcs, wire-valid head included.
fn wire_oid() -> impl Strategy<Value = Oid> {
    (
        0u32..=2,
        0u32..40,
        prop::collection::vec(any::<u32>(), 0..10),
    )
        .prop_map(|(first, second, rest)| {
            let mut arcs = vec![first, second];
            arcs.extend(rest);
            Oid::from_slice(&arcs)
        })
}

/// Arbitrary arc sequences for ordering laws (no wire constraints).
fn any_oid() -> impl Strategy<Value = Oid> {
    prop::collection::vec(any::<u32>(), 1..12).prop_map(|arcs| Oid::from_slice(&arcs))
}

fn any_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Boolean),
        any::<i32>().prop_map(Value::Integer),
        prop::collection::vec(any::<u8>(), 0..64)
            .prop_map(|v| Value::OctetString(Bytes::from(v))),
        Just(Value::Null),
        wire_oid().prop_map(Value::ObjectIdentifier),
        any::<[u8; 4]>().prop_map(Value::IpAddress),
        any::<u32>().prop_map(Value::Counter32),
        any::<u32>().prop_map(Value::Gauge32),
        any::<u32>().prop_map(Value::TimeTicks),
        prop::collection::vec(any::<u8>(), 0..64).prop_map(|v| Value::Opaque(Bytes::from(v))),
        any::<u64>().prop_map(Value::Counter64),
        Just(Value::NoSuchObject),
        Just(Value::NoSuchInstance),
        Just(Value::EndOfMibView),
    ]
}

// =============================================================================
// OID ordering laws
// =============================================================================

proptest! {
    #[test]
    fn oid_cmp_antisymmetric(a in any_oid(), b in any_oid()) {
        prop_assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
    }

    #[test]
    fn oid_cmp_transitive(a in any_oid(), b in any_oid(), c in any_oid()) {
        let mut sorted = [a, b, c];
        sorted.sort();
        prop_assert!(sorted[0] <= sorted[1] && sorted[1] <= sorted[2]);
        prop_assert!(sorted[0] <= sorted[2]);
    }

    #[test]
    fn oid_strict_prefix_is_lesser(a in any_oid(), extra in 1usize..4) {
        let longer = a.join(&vec![1; extra]);
        prop_assert!(a < longer);
        prop_assert!(longer.starts_with(&a));
    }

    #[test]
    fn oid_display_parse_roundtrip(a in wire_oid()) {
        let parsed: Oid = a.to_string().parse().unwrap();
        prop_assert_eq!(a, parsed);
    }
}

// =============================================================================
// BER round trips
// =============================================================================

proptest! {
    #[test]
    fn integer_roundtrip(v in any::<i32>()) {
        let mut buf = EncodeBuf::new();
        buf.push_integer(v);
        let mut decoder = Decoder::new(buf.finish());
        prop_assert_eq!(decoder.read_integer().unwrap(), v);
        prop_assert!(decoder.is_empty());
    }

    #[test]
    fn unsigned32_roundtrip(v in any::<u32>()) {
        for t in [
            tag::application::COUNTER32,
            tag::application::GAUGE32,
            tag::application::TIMETICKS,
        ] {
            let mut buf = EncodeBuf::new();
            buf.push_unsigned32(t, v);
            let mut decoder = Decoder::new(buf.finish());
            prop_assert_eq!(decoder.read_unsigned32(t).unwrap(), v);
        }
    }

    #[test]
    fn counter64_roundtrip(v in any::<u64>()) {
        let mut buf = EncodeBuf::new();
        buf.push_integer64(v);
        let mut decoder = Decoder::new(buf.finish());
        prop_assert_eq!(decoder.read_integer64().unwrap(), v);
    }

    #[test]
    fn octet_string_roundtrip(v in prop::collection::vec(any::<u8>(), 0..512)) {
        let mut buf = EncodeBuf::new();
        buf.push_octet_string(&v);
        let mut decoder = Decoder::new(buf.finish());
        prop_assert_eq!(&decoder.read_octet_string().unwrap()[..], &v[..]);
    }

    #[test]
    fn oid_ber_roundtrip(a in wire_oid()) {
        let mut buf = EncodeBuf::new();
        buf.push_oid(&a);
        let mut decoder = Decoder::new(buf.finish());
        prop_assert_eq!(decoder.read_oid().unwrap(), a);
    }

    #[test]
    fn value_roundtrip(v in any_value()) {
        let mut buf = EncodeBuf::new();
        v.encode(&mut buf);
        let mut decoder = Decoder::new(buf.finish());
        prop_assert_eq!(Value::decode(&mut decoder).unwrap(), v);
        prop_assert!(decoder.is_empty());
    }

    #[test]
    fn varbind_roundtrip(a in wire_oid(), v in any_value()) {
        let vb = VarBind::new(a, v);
        let mut buf = EncodeBuf::new();
        vb.encode(&mut buf);
        let mut decoder = Decoder::new(buf.finish());
        prop_assert_eq!(VarBind::decode(&mut decoder).unwrap(), vb);
    }
}

// =============================================================================
// Message round trip
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn response_message_roundtrip(
        request_id in any::<i32>(),
        status in 0i32..19,
        index in 0i32..8,
        binds in prop::collection::vec((wire_oid(), any_value()), 0..6),
    ) {
        let varbinds: Vec<VarBind> = binds
            .into_iter()
            .map(|(oid, value)| VarBind::new(oid, value))
            .collect();
        let pdu = Pdu::response(
            request_id,
            ErrorStatus::from_i32(status),
            index,
            varbinds,
        );

        let wire = encode_community_response(Version::V2c, b"public", &pdu);

        let mut acl = Acl::new();
        acl.community_register(&oid!(1, 3, 6, 1), "public", Access::ReadOnly);
        let parsed = decode_message(&wire, &acl).unwrap();

        prop_assert_eq!(parsed.version, Version::V2c);
        prop_assert_eq!(parsed.community.as_deref(), Some(&b"public"[..]));
        prop_assert_eq!(parsed.pdu(), &pdu);
    }
}

// =============================================================================
// View cover
// =============================================================================

proptest! {
    #[test]
    fn view_cover_matches_prefix_relation(prefix in any_oid(), query in any_oid()) {
        let mut acl = Acl::new();
        acl.community_register(&prefix, "c", Access::ReadOnly);
        let id = acl.community_search(b"c").unwrap();
        let covered = acl.covers(
            smithsnmp::mib::Principal::Community(id),
            Access::ReadOnly,
            &query,
        );

        let expected = query.starts_with(&prefix) || prefix.starts_with(&query);
        prop_assert_eq!(covered, expected);
    }
}
