//! The SNMP agent engine.
//!
//! [`Agent`] owns the MIB tree, the access-control registries, and the
//! engine identity, and turns one inbound datagram into at most one
//! response via [`Agent::process`]. The engine is single-threaded per
//! datagram: varbinds are handled in order and handlers are called
//! synchronously.
//!
//! # Example
//!
//! ```rust
//! use smithsnmp::agent::Agent;
//! use smithsnmp::handler::ScalarHandler;
//! use smithsnmp::{Value, oid};
//!
//! let agent = Agent::builder()
//!     .community_read(oid!(1, 3, 6, 1), "public")
//!     .register(
//!         oid!(1, 3, 6, 1, 2, 1, 1, 1),
//!         ScalarHandler::read_only(|| Value::from("SmithSNMP")),
//!     )
//!     .build();
//!
//! // agent.process(&datagram) -> Option<Bytes>
//! ```

mod processor;

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::handler::InstanceHandler;
use crate::message::{self, FLAG_AUTH, FLAG_PRIV};
use crate::mib::{Access, Acl, MibTree, Principal, RegisterError, UserError, UserId};
use crate::oid::Oid;
use crate::v3::{AuthProtocol, ENGINE_ID, PrivProtocol, SaltCounter};
use crate::version::Version;

/// Minimum security the agent demands of v3 requests, applied uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecurityMode {
    /// Accept any security level.
    #[default]
    None,
    /// Require authentication.
    RequireAuth,
    /// Require authentication and privacy.
    RequireAuthPriv,
}

impl SecurityMode {
    /// Whether msgFlags satisfy this mode.
    pub fn permits(self, msg_flags: u8) -> bool {
        match self {
            Self::None => true,
            Self::RequireAuth => msg_flags & FLAG_AUTH != 0,
            Self::RequireAuthPriv => {
                msg_flags & FLAG_AUTH != 0 && msg_flags & FLAG_PRIV != 0
            }
        }
    }
}

/// The authoritative engine clock: boots count and seconds since start.
pub(crate) struct EngineClock {
    started: Instant,
}

impl EngineClock {
    fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    /// Engine boots. Nothing persists across restarts, so this is always 1.
    pub(crate) fn boots(&self) -> u32 {
        1
    }

    /// Seconds since the engine started.
    pub(crate) fn time(&self) -> u32 {
        self.started.elapsed().as_secs() as u32
    }
}

/// The SNMP agent engine.
pub struct Agent {
    pub(crate) mib: MibTree,
    pub(crate) acl: Acl,
    pub(crate) security_mode: SecurityMode,
    pub(crate) clock: EngineClock,
    pub(crate) salt: SaltCounter,
}

impl Agent {
    /// Start building an agent.
    pub fn builder() -> AgentBuilder {
        AgentBuilder {
            agent: Self::new(),
        }
    }

    /// Create an agent with empty registries.
    pub fn new() -> Self {
        Self {
            mib: MibTree::new(),
            acl: Acl::new(),
            security_mode: SecurityMode::default(),
            clock: EngineClock::new(),
            salt: SaltCounter::new(),
        }
    }

    /// The agent's authoritative engine ID.
    pub fn engine_id(&self) -> &'static [u8] {
        &ENGINE_ID
    }

    /// Set the v3 security floor.
    pub fn set_security_mode(&mut self, mode: SecurityMode) {
        self.security_mode = mode;
    }

    /// Attach a handler at an OID prefix.
    pub fn register(
        &mut self,
        prefix: &Oid,
        handler: Arc<dyn InstanceHandler>,
    ) -> Result<(), RegisterError> {
        debug!(%prefix, "registering handler");
        self.mib.register(prefix, handler)
    }

    /// Detach the handler at an OID prefix.
    pub fn unregister(&mut self, prefix: &Oid) -> Option<Arc<dyn InstanceHandler>> {
        debug!(%prefix, "unregistering handler");
        self.mib.unregister(prefix)
    }

    /// Grant a community access to the view at `prefix`.
    pub fn community_register(&mut self, prefix: &Oid, name: impl AsRef<[u8]>, access: Access) {
        self.acl.community_register(prefix, name, access);
    }

    /// Revoke all of a community's views for one attribute.
    pub fn community_unregister(&mut self, name: impl AsRef<[u8]>, access: Access) {
        self.acl.community_unregister(name, access);
    }

    /// Create a v3 user. Keys are localized against this agent's engine ID
    /// once; passphrases are not retained.
    pub fn user_create(
        &mut self,
        name: impl AsRef<[u8]>,
        auth: Option<(AuthProtocol, &[u8])>,
        privacy: Option<(PrivProtocol, &[u8])>,
    ) -> Result<UserId, UserError> {
        self.acl.user_create(name, auth, privacy, &ENGINE_ID)
    }

    /// Grant a user access to the view at `prefix`.
    ///
    /// Returns `false` when the user has not been created.
    pub fn user_register(&mut self, prefix: &Oid, name: impl AsRef<[u8]>, access: Access) -> bool {
        self.acl.user_register(prefix, name, access)
    }

    /// Revoke all of a user's views for one attribute.
    pub fn user_unregister(&mut self, name: impl AsRef<[u8]>, access: Access) {
        self.acl.user_unregister(name, access);
    }

    /// Process one datagram to completion.
    ///
    /// Returns the wire-format response, or `None` when the datagram is
    /// dropped (parse failure, unknown user, unserviceable PDU).
    pub fn process(&self, buf: &[u8]) -> Option<Bytes> {
        let datagram = match message::decode_message(buf, &self.acl) {
            Ok(datagram) => datagram,
            Err(err) => {
                debug!(%err, "dropping datagram");
                return None;
            }
        };

        let response = processor::dispatch(self, &datagram)?;

        match datagram.version {
            Version::V1 | Version::V2c => {
                let community = datagram.community.as_deref().unwrap_or_default();
                Some(message::encode_community_response(
                    datagram.version,
                    community,
                    &response,
                ))
            }
            Version::V3 => {
                let header = datagram.v3.as_ref()?;
                let Some(Principal::User(user_id)) = datagram.principal else {
                    return None;
                };
                let user = self.acl.user(user_id);
                match message::encode_v3_response(
                    header,
                    &datagram.scoped.context_name,
                    user,
                    self.clock.boots(),
                    self.clock.time(),
                    self.salt.next_salt(),
                    &response,
                ) {
                    Ok(wire) => Some(wire),
                    Err(err) => {
                        warn!(%err, "failed to encode v3 response");
                        None
                    }
                }
            }
        }
    }
}

impl Default for Agent {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`Agent`].
pub struct AgentBuilder {
    agent: Agent,
}

impl AgentBuilder {
    /// Set the v3 security floor.
    pub fn security_mode(mut self, mode: SecurityMode) -> Self {
        self.agent.security_mode = mode;
        self
    }

    /// Attach a handler at an OID prefix.
    ///
    /// A conflicting registration is skipped with a warning; use
    /// [`Agent::register`] for the fallible form.
    pub fn register(mut self, prefix: Oid, handler: impl InstanceHandler) -> Self {
        if let Err(err) = self.agent.register(&prefix, Arc::new(handler)) {
            warn!(%err, "skipping handler registration");
        }
        self
    }

    /// Grant a community read access to the view at `prefix`.
    pub fn community_read(mut self, prefix: Oid, name: impl AsRef<[u8]>) -> Self {
        self.agent.community_register(&prefix, name, Access::ReadOnly);
        self
    }

    /// Grant a community write access to the view at `prefix`.
    pub fn community_write(mut self, prefix: Oid, name: impl AsRef<[u8]>) -> Self {
        self.agent
            .community_register(&prefix, name, Access::ReadWrite);
        self
    }

    /// Create a v3 user.
    ///
    /// A duplicate or inconsistent user definition is skipped with a
    /// warning; use [`Agent::user_create`] for the fallible form.
    pub fn user_create(
        mut self,
        name: impl AsRef<[u8]>,
        auth: Option<(AuthProtocol, &[u8])>,
        privacy: Option<(PrivProtocol, &[u8])>,
    ) -> Self {
        if let Err(err) = self.agent.user_create(name, auth, privacy) {
            warn!(%err, "skipping user creation");
        }
        self
    }

    /// Grant a user read access to the view at `prefix`.
    pub fn user_read(mut self, prefix: Oid, name: impl AsRef<[u8]>) -> Self {
        if !self.agent.user_register(&prefix, name, Access::ReadOnly) {
            warn!("skipping view grant for unknown user");
        }
        self
    }

    /// Grant a user write access to the view at `prefix`.
    pub fn user_write(mut self, prefix: Oid, name: impl AsRef<[u8]>) -> Self {
        if !self.agent.user_register(&prefix, name, Access::ReadWrite) {
            warn!("skipping view grant for unknown user");
        }
        self
    }

    /// Finish building.
    pub fn build(self) -> Agent {
        self.agent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_mode_permits() {
        assert!(SecurityMode::None.permits(0x00));
        assert!(SecurityMode::None.permits(0x03));
        assert!(!SecurityMode::RequireAuth.permits(0x00));
        assert!(SecurityMode::RequireAuth.permits(0x01));
        assert!(SecurityMode::RequireAuth.permits(0x03));
        assert!(!SecurityMode::RequireAuthPriv.permits(0x01));
        assert!(SecurityMode::RequireAuthPriv.permits(0x03));
    }

    #[test]
    fn test_engine_clock() {
        let clock = EngineClock::new();
        assert_eq!(clock.boots(), 1);
        assert!(clock.time() < 5);
    }

    #[test]
    fn test_process_drops_garbage() {
        let agent = Agent::builder().build();
        assert!(agent.process(&[0xFF, 0x00, 0x01]).is_none());
        assert!(agent.process(&[]).is_none());
    }
}
