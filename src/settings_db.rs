use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use crate::{error::Result, session::UserId};

/// User id -> id of the admin who granted access (0 when granted offline).
const ACCESS_LIST: TableDefinition<u64, u64> = TableDefinition::new("access_list");
/// User id -> daily birthday broadcast preference.
const BROADCAST: TableDefinition<u64, bool> = TableDefinition::new("broadcast");

/// Persistent per-deployment settings: the access list and each user's
/// broadcast preference. Conversation sessions are not stored here.
pub struct SettingsDb {
    db: Database,
}

impl SettingsDb {
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path)?;

        // Ensure all tables exist by opening them in a write transaction.
        let txn = db.begin_write()?;
        txn.open_table(ACCESS_LIST)?;
        txn.open_table(BROADCAST)?;
        txn.commit()?;

        Ok(Self { db })
    }

    // -- Access list --

    /// Grant access to `user`. Returns `false` if it was already granted.
    pub fn grant(&self, user: UserId, granted_by: UserId) -> Result<bool> {
        let txn = self.db.begin_write()?;
        let added = {
            let mut table = txn.open_table(ACCESS_LIST)?;
            if table.get(user)?.is_some() {
                false
            } else {
                table.insert(user, granted_by)?;
                true
            }
        };
        txn.commit()?;
        Ok(added)
    }

    pub fn revoke(&self, user: UserId) -> Result<bool> {
        let txn = self.db.begin_write()?;
        let removed = {
            let mut table = txn.open_table(ACCESS_LIST)?;
            table.remove(user)?.is_some()
        };
        txn.commit()?;
        Ok(removed)
    }

    pub fn is_granted(&self, user: UserId) -> Result<bool> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ACCESS_LIST)?;
        Ok(table.get(user)?.is_some())
    }

    /// Granted user ids in ascending order.
    pub fn list_granted(&self) -> Result<Vec<UserId>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ACCESS_LIST)?;
        let mut result = Vec::new();
        for entry in table.iter()? {
            let (k, _v) = entry?;
            result.push(k.value());
        }
        Ok(result)
    }

    // -- Broadcast preference --

    pub fn set_broadcast(&self, user: UserId, enabled: bool) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(BROADCAST)?;
            table.insert(user, enabled)?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_broadcast(&self, user: UserId) -> Result<Option<bool>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(BROADCAST)?;
        Ok(table.get(user)?.map(|v| v.value()))
    }

    /// Broadcast preference with the default (enabled) applied.
    pub fn broadcast_or_default(&self, user: UserId) -> Result<bool> {
        Ok(self.get_broadcast(user)?.unwrap_or(true))
    }
}

impl std::fmt::Debug for SettingsDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsDb").finish_non_exhaustive()
    }
}
