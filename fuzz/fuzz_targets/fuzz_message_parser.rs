#![no_main]

use std::sync::OnceLock;

use libfuzzer_sys::fuzz_target;

use smithsnmp::agent::Agent;
use smithsnmp::handler::ScalarHandler;
use smithsnmp::v3::{AuthProtocol, PrivProtocol};
use smithsnmp::{Value, oid};

// An agent with both community and v3 principals so every parse path
// (community resolution, user resolution, decrypt, authenticate) is
// reachable from attacker-controlled bytes. Built once: key localization
// is deliberately expensive.
fn agent() -> &'static Agent {
    static AGENT: OnceLock<Agent> = OnceLock::new();
    AGENT.get_or_init(|| {
        Agent::builder()
            .community_read(oid!(1, 3, 6, 1), "public")
            .user_create(
                "fuzz",
                Some((AuthProtocol::Sha1, b"fuzzauthpass".as_slice())),
                Some((PrivProtocol::Aes128, b"fuzzprivpass".as_slice())),
            )
            .user_read(oid!(1, 3, 6, 1), "fuzz")
            .register(
                oid!(1, 3, 6, 1, 2, 1, 1, 1),
                ScalarHandler::read_only(|| Value::from("fuzz")),
            )
            .build()
    })
}

fuzz_target!(|data: &[u8]| {
    let _ = agent().process(data);
});
