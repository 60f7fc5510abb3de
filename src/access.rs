use std::{collections::BTreeSet, sync::Arc};

use crate::{error::Result, session::UserId, settings_db::SettingsDb};

/// Outcome of removing a user from the access list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Revocation {
    Removed,
    NotPresent,
    /// The main admin always keeps access.
    MainAdmin,
    /// The id comes from the configuration file and cannot be removed at
    /// runtime.
    Configured,
}

/// Pure access rule.
///
/// With no access list and no main admin the deployment is open. Otherwise
/// only the main admin and listed users pass.
pub fn is_authorized(
    user: UserId,
    main_admin: Option<UserId>,
    access_list: &BTreeSet<UserId>,
) -> bool {
    (access_list.is_empty() && main_admin.is_none())
        || main_admin == Some(user)
        || access_list.contains(&user)
}

/// Access guard consulted before every request.
///
/// The access list is the union of ids from the configuration file and ids
/// granted at runtime, which are persisted in the settings database.
#[derive(Debug, Clone)]
pub struct AccessGuard {
    main_admin: Option<UserId>,
    configured: BTreeSet<UserId>,
    settings: Arc<SettingsDb>,
}

impl AccessGuard {
    pub fn new(
        main_admin: Option<UserId>,
        configured: impl IntoIterator<Item = UserId>,
        settings: Arc<SettingsDb>,
    ) -> Self {
        Self {
            main_admin,
            configured: configured.into_iter().collect(),
            settings,
        }
    }

    pub fn main_admin(&self) -> Option<UserId> {
        self.main_admin
    }

    pub fn is_main_admin(&self, user: UserId) -> bool {
        self.main_admin == Some(user)
    }

    /// Configured and granted ids, sorted.
    pub fn access_list(&self) -> Result<BTreeSet<UserId>> {
        let mut list = self.configured.clone();
        list.extend(self.settings.list_granted()?);
        Ok(list)
    }

    pub fn check(&self, user: UserId) -> Result<bool> {
        if self.is_main_admin(user) || self.configured.contains(&user) {
            return Ok(true);
        }
        Ok(is_authorized(user, self.main_admin, &self.access_list()?))
    }

    /// Grant access; `false` when the user already had it.
    pub fn grant(&self, user: UserId, granted_by: UserId) -> Result<bool> {
        if self.is_main_admin(user) || self.configured.contains(&user) {
            return Ok(false);
        }
        self.settings.grant(user, granted_by)
    }

    pub fn revoke(&self, user: UserId) -> Result<Revocation> {
        if self.is_main_admin(user) {
            return Ok(Revocation::MainAdmin);
        }
        if self.configured.contains(&user) {
            return Ok(Revocation::Configured);
        }
        Ok(if self.settings.revoke(user)? {
            Revocation::Removed
        } else {
            Revocation::NotPresent
        })
    }
}
