//! Fault injection for exercising store failure paths in tests.

use super::connection::CacheDb;
use crate::Error;

impl CacheDb {
    /// Make every deletion of store `name` fail with a constraint error.
    pub async fn fail_deletes_of(&self, name: &str) -> Result<(), Error> {
        let sql = format!(
            "CREATE TRIGGER IF NOT EXISTS keep_{tag} BEFORE DELETE ON cache_stores
             WHEN OLD.name = '{name}'
             BEGIN SELECT RAISE(ABORT, 'store {name} is locked'); END;",
            tag = name.chars().map(|c| if c.is_ascii_alphanumeric() { c } else { '_' }).collect::<String>(),
            name = name.replace('\'', "''"),
        );
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute_batch(&sql)?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Drop the store tables so enumeration and lookups fail.
    pub async fn drop_store_tables(&self) -> Result<(), Error> {
        self.conn
            .call(|conn| -> Result<(), Error> {
                conn.execute_batch("DROP TABLE cache_entries; DROP TABLE cache_stores;")?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}
