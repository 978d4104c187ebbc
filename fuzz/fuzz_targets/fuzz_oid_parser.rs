#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;

use smithsnmp::ber::Decoder;
use smithsnmp::oid::Oid;

fuzz_target!(|data: &[u8]| {
    // Fuzz OID from BER encoding
    let mut decoder = Decoder::new(Bytes::copy_from_slice(data));
    if let Ok(oid) = decoder.read_oid() {
        // Accepted OIDs must re-encode
        let _ = oid.to_ber_smallvec();
    }

    // Fuzz OID from dotted string notation (if data is valid UTF-8)
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = s.parse::<Oid>();
    }
});
