//! smithd: a small demonstration agent daemon.
//!
//! Serves a read-mostly system MIB plus a toy interface table, with an
//! optional SNMPv3 user. Intended as a working reference for embedding the
//! engine, not as a production agent.

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use smithsnmp::agent::{Agent, SecurityMode};
use smithsnmp::handler::{ScalarHandler, SetResult, TableHandler};
use smithsnmp::transport;
use smithsnmp::v3::{AuthProtocol, PrivProtocol};
use smithsnmp::{Value, oid};

/// Serve a demonstration SNMP agent.
#[derive(Debug, Parser)]
#[command(name = "smithd", version, about)]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:161", value_name = "ADDR")]
    listen: SocketAddr,

    /// Read-only community name.
    #[arg(long, default_value = "public")]
    community: String,

    /// Read-write community name.
    #[arg(long, default_value = "private")]
    rw_community: String,

    /// SNMPv3 user name (enables v3 when set).
    #[arg(long)]
    user: Option<String>,

    /// SNMPv3 authentication passphrase (MD5|SHA via --auth-proto).
    #[arg(long, requires = "user")]
    auth_pass: Option<String>,

    /// SNMPv3 authentication protocol.
    #[arg(long, default_value = "SHA")]
    auth_proto: AuthProtocol,

    /// SNMPv3 privacy passphrase (AES-128).
    #[arg(long, requires = "auth_pass")]
    priv_pass: Option<String>,

    /// Require authentication (and privacy with --require-priv) from v3.
    #[arg(long)]
    require_auth: bool,

    /// Require authentication and privacy from v3.
    #[arg(long)]
    require_priv: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let security_mode = if args.require_priv {
        SecurityMode::RequireAuthPriv
    } else if args.require_auth {
        SecurityMode::RequireAuth
    } else {
        SecurityMode::None
    };

    let started = Instant::now();
    let mib2 = oid!(1, 3, 6, 1, 2, 1);

    let mut builder = Agent::builder()
        .security_mode(security_mode)
        .community_read(mib2.clone(), args.community.as_bytes())
        .community_read(mib2.clone(), args.rw_community.as_bytes())
        .community_write(mib2.clone(), args.rw_community.as_bytes())
        // system group
        .register(
            oid!(1, 3, 6, 1, 2, 1, 1, 1),
            ScalarHandler::read_only(|| Value::from("SmithSNMP demonstration agent")),
        )
        .register(
            oid!(1, 3, 6, 1, 2, 1, 1, 3),
            ScalarHandler::read_only(move || {
                Value::TimeTicks((started.elapsed().as_millis() / 10) as u32)
            }),
        )
        .register(
            oid!(1, 3, 6, 1, 2, 1, 1, 5),
            ScalarHandler::read_write(
                || Value::from("smithd"),
                |value| match value {
                    Value::OctetString(_) => SetResult::Ok,
                    _ => SetResult::WrongType,
                },
            ),
        )
        // ifIndex / ifDescr columns of a two-port device
        .register(
            oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 1),
            TableHandler::read_only(vec![
                (oid!(1), Value::Integer(1)),
                (oid!(2), Value::Integer(2)),
            ]),
        )
        .register(
            oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2),
            TableHandler::read_only(vec![
                (oid!(1), Value::from("lo")),
                (oid!(2), Value::from("eth0")),
            ]),
        );

    if let Some(user) = &args.user {
        let auth = args
            .auth_pass
            .as_ref()
            .map(|pass| (args.auth_proto, pass.as_bytes()));
        let privacy = args
            .priv_pass
            .as_ref()
            .map(|pass| (PrivProtocol::Aes128, pass.as_bytes()));
        builder = builder
            .user_create(user.as_bytes(), auth, privacy)
            .user_read(mib2.clone(), user.as_bytes())
            .user_write(mib2.clone(), user.as_bytes());
    }

    let agent = Arc::new(builder.build());

    eprintln!("smithd listening on {}", args.listen);
    match transport::serve_on(args.listen, agent).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}
