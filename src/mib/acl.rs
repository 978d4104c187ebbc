//! View-based access control for communities and users.
//!
//! A view names an OID subtree. Communities (v1/v2c) and users (v3) each
//! hold two ordered lists of views, one per access attribute. The original
//! intrusive back-pointer graph is modeled as index lists kept symmetric by
//! the paired register/unregister operations: a view knows its principals,
//! a principal knows its views, and one call updates both sides.
//!
//! Records are append-only so indices stay stable; unregistering removes
//! associations, not records.

use bytes::Bytes;

use crate::oid::Oid;
use crate::v3::{AuthProtocol, LocalizedKey, PrivKey, PrivProtocol, localize_key};

/// Access attribute of a view association.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Covers GET, GETNEXT, and GETBULK.
    ReadOnly,
    /// Covers SET.
    ReadWrite,
}

/// Index of a community record within the ACL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommunityId(usize);

/// Index of a user record within the ACL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserId(usize);

/// The principal a datagram authenticated as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Principal {
    /// v1/v2c community.
    Community(CommunityId),
    /// v3 USM user.
    User(UserId),
}

/// A named OID subtree with its association back-references.
#[derive(Debug)]
pub struct View {
    prefix: Oid,
    communities: Vec<(usize, Access)>,
    users: Vec<(usize, Access)>,
}

impl View {
    /// The subtree prefix.
    pub fn prefix(&self) -> &Oid {
        &self.prefix
    }

    /// Whether this view covers `oid`: either the view prefix is a prefix
    /// of the OID, or the OID is a prefix of the view prefix. The second
    /// direction lets a GETNEXT that starts above the view jump into it.
    pub fn covers(&self, oid: &Oid) -> bool {
        oid.starts_with(&self.prefix) || self.prefix.starts_with(oid)
    }
}

/// A v1/v2c community record.
#[derive(Debug, Default)]
struct Community {
    name: Bytes,
    ro_views: Vec<usize>,
    rw_views: Vec<usize>,
}

/// A v3 user record. Only derived keys are stored, never passphrases.
pub struct User {
    name: Bytes,
    auth_key: Option<LocalizedKey>,
    priv_protocol: Option<PrivProtocol>,
    priv_key: Option<PrivKey>,
    ro_views: Vec<usize>,
    rw_views: Vec<usize>,
}

impl User {
    /// The user name as it appears in msgUserName.
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    /// The localized authentication key, if the user has auth credentials.
    pub fn auth_key(&self) -> Option<&LocalizedKey> {
        self.auth_key.as_ref()
    }

    /// The authentication protocol, if any.
    pub fn auth_protocol(&self) -> Option<AuthProtocol> {
        self.auth_key.as_ref().map(|k| k.protocol())
    }

    /// The privacy key, if the user has privacy credentials.
    pub fn priv_key(&self) -> Option<&PrivKey> {
        self.priv_key.as_ref()
    }

    /// The privacy protocol, if any.
    pub fn priv_protocol(&self) -> Option<PrivProtocol> {
        self.priv_protocol
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("name", &self.name)
            .field("auth", &self.auth_protocol())
            .field("priv", &self.priv_protocol)
            .finish_non_exhaustive()
    }
}

/// Error from [`Acl::user_create`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum UserError {
    /// A user with this name already exists.
    #[error("user {0:?} already exists")]
    Duplicate(String),
    /// Privacy credentials require authentication credentials.
    #[error("privacy requires authentication credentials")]
    PrivWithoutAuth,
}

/// The access-control registries: views, communities, users.
#[derive(Default)]
pub struct Acl {
    views: Vec<View>,
    communities: Vec<Community>,
    users: Vec<User>,
}

impl Acl {
    /// Create empty registries.
    pub fn new() -> Self {
        Self::default()
    }

    fn view_index(&mut self, prefix: &Oid) -> usize {
        match self.views.iter().position(|v| v.prefix == *prefix) {
            Some(idx) => idx,
            None => {
                self.views.push(View {
                    prefix: prefix.clone(),
                    communities: Vec::new(),
                    users: Vec::new(),
                });
                self.views.len() - 1
            }
        }
    }

    fn community_index(&mut self, name: &[u8]) -> usize {
        match self.communities.iter().position(|c| c.name == name) {
            Some(idx) => idx,
            None => {
                self.communities.push(Community {
                    name: Bytes::copy_from_slice(name),
                    ..Community::default()
                });
                self.communities.len() - 1
            }
        }
    }

    /// Associate a community with the view at `prefix`, creating either
    /// record as needed.
    pub fn community_register(&mut self, prefix: &Oid, name: impl AsRef<[u8]>, access: Access) {
        let view_idx = self.view_index(prefix);
        let comm_idx = self.community_index(name.as_ref());

        let list = match access {
            Access::ReadOnly => &mut self.communities[comm_idx].ro_views,
            Access::ReadWrite => &mut self.communities[comm_idx].rw_views,
        };
        if !list.contains(&view_idx) {
            list.push(view_idx);
            self.views[view_idx].communities.push((comm_idx, access));
        }
    }

    /// Drop all of a community's view associations for one attribute.
    ///
    /// Both sides of each association are removed.
    pub fn community_unregister(&mut self, name: impl AsRef<[u8]>, access: Access) {
        let Some(comm_idx) = self.communities.iter().position(|c| c.name == name.as_ref())
        else {
            return;
        };

        let list = match access {
            Access::ReadOnly => std::mem::take(&mut self.communities[comm_idx].ro_views),
            Access::ReadWrite => std::mem::take(&mut self.communities[comm_idx].rw_views),
        };
        for view_idx in list {
            self.views[view_idx]
                .communities
                .retain(|&(c, a)| !(c == comm_idx && a == access));
        }
    }

    /// Create a user with derived keys.
    ///
    /// Key localization runs once, against `engine_id`; the passphrases are
    /// not retained. Privacy requires auth (the privacy key is cut from the
    /// localized auth key).
    pub fn user_create(
        &mut self,
        name: impl AsRef<[u8]>,
        auth: Option<(AuthProtocol, &[u8])>,
        privacy: Option<(PrivProtocol, &[u8])>,
        engine_id: &[u8],
    ) -> Result<UserId, UserError> {
        let name = name.as_ref();
        if self.users.iter().any(|u| u.name == name) {
            return Err(UserError::Duplicate(
                String::from_utf8_lossy(name).into_owned(),
            ));
        }

        let auth_key = auth.map(|(protocol, passphrase)| localize_key(protocol, passphrase, engine_id));

        let (priv_protocol, priv_key) = match privacy {
            None => (None, None),
            Some((protocol, passphrase)) => {
                let Some((auth_protocol, _)) = auth else {
                    return Err(UserError::PrivWithoutAuth);
                };
                // RFC 3414: the privacy key is derived with the same
                // localization algorithm as the auth key.
                let localized = localize_key(auth_protocol, passphrase, engine_id);
                let key = PrivKey::from_localized(&localized)
                    .map_err(|_| UserError::PrivWithoutAuth)?;
                (Some(protocol), Some(key))
            }
        };

        self.users.push(User {
            name: Bytes::copy_from_slice(name),
            auth_key,
            priv_protocol,
            priv_key,
            ro_views: Vec::new(),
            rw_views: Vec::new(),
        });
        Ok(UserId(self.users.len() - 1))
    }

    /// Associate an existing user with the view at `prefix`.
    ///
    /// Returns `false` if no such user has been created.
    pub fn user_register(&mut self, prefix: &Oid, name: impl AsRef<[u8]>, access: Access) -> bool {
        let Some(user_idx) = self.users.iter().position(|u| u.name == name.as_ref()) else {
            return false;
        };
        let view_idx = self.view_index(prefix);

        let list = match access {
            Access::ReadOnly => &mut self.users[user_idx].ro_views,
            Access::ReadWrite => &mut self.users[user_idx].rw_views,
        };
        if !list.contains(&view_idx) {
            list.push(view_idx);
            self.views[view_idx].users.push((user_idx, access));
        }
        true
    }

    /// Drop all of a user's view associations for one attribute.
    pub fn user_unregister(&mut self, name: impl AsRef<[u8]>, access: Access) {
        let Some(user_idx) = self.users.iter().position(|u| u.name == name.as_ref()) else {
            return;
        };

        let list = match access {
            Access::ReadOnly => std::mem::take(&mut self.users[user_idx].ro_views),
            Access::ReadWrite => std::mem::take(&mut self.users[user_idx].rw_views),
        };
        for view_idx in list {
            self.views[view_idx]
                .users
                .retain(|&(u, a)| !(u == user_idx && a == access));
        }
    }

    /// Look up a community by name.
    pub fn community_search(&self, name: &[u8]) -> Option<CommunityId> {
        self.communities
            .iter()
            .position(|c| c.name == name)
            .map(CommunityId)
    }

    /// Look up a user by name.
    pub fn user_search(&self, name: &[u8]) -> Option<UserId> {
        self.users.iter().position(|u| u.name == name).map(UserId)
    }

    /// Access a user record.
    pub fn user(&self, id: UserId) -> &User {
        &self.users[id.0]
    }

    /// The views of a principal for one attribute, in insertion order.
    pub fn views(
        &self,
        principal: Principal,
        access: Access,
    ) -> impl Iterator<Item = &View> + '_ {
        let list: &[usize] = match principal {
            Principal::Community(CommunityId(idx)) => match access {
                Access::ReadOnly => &self.communities[idx].ro_views,
                Access::ReadWrite => &self.communities[idx].rw_views,
            },
            Principal::User(UserId(idx)) => match access {
                Access::ReadOnly => &self.users[idx].ro_views,
                Access::ReadWrite => &self.users[idx].rw_views,
            },
        };
        list.iter().map(|&view_idx| &self.views[view_idx])
    }

    /// Whether any of the principal's views for `access` covers `oid`.
    pub fn covers(&self, principal: Principal, access: Access, oid: &Oid) -> bool {
        self.views(principal, access).any(|view| view.covers(oid))
    }
}
