use crate::models::{datetime_to_timestamp, timestamp_to_datetime, Timestamp};
use crate::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// One row of the settings table.
#[derive(Debug, Clone, PartialEq)]
pub struct Setting {
    pub key: String,
    pub value: Value,
    pub updated_at: DateTime<Utc>,
}

/// Key-value settings with JSON values.
pub struct SettingsRepository;

impl SettingsRepository {
    /// Get a setting's value, `None` when unset
    pub fn get(conn: &Connection, key: &str) -> Result<Option<Value>> {
        let raw = conn.query_row(
            "SELECT value FROM settings WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match raw {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Get a setting decoded into `T`
    pub fn get_as<T: DeserializeOwned>(conn: &Connection, key: &str) -> Result<Option<T>> {
        match Self::get(conn, key)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Insert or replace a setting
    pub fn set<T: Serialize>(conn: &Connection, key: &str, value: &T, now: Timestamp) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        conn.execute(
            "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, raw, now],
        )?;
        Ok(())
    }

    /// Set a setting stamped with the current time
    pub fn set_now<T: Serialize>(conn: &Connection, key: &str, value: &T) -> Result<()> {
        Self::set(conn, key, value, datetime_to_timestamp(&Utc::now()))
    }

    /// Delete a setting. Returns whether it existed.
    pub fn delete(conn: &Connection, key: &str) -> Result<bool> {
        let removed = conn.execute("DELETE FROM settings WHERE key = ?1", params![key])?;
        Ok(removed > 0)
    }

    /// All settings ordered by key
    pub fn all(conn: &Connection) -> Result<Vec<Setting>> {
        let mut stmt = conn.prepare("SELECT key, value, updated_at FROM settings ORDER BY key")?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(key, raw, updated_at)| {
                Ok(Setting {
                    key,
                    value: serde_json::from_str(&raw)?,
                    updated_at: timestamp_to_datetime(updated_at),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use serde_json::json;

    #[test]
    fn test_set_and_get() {
        let conn = Database::in_memory().unwrap();
        assert_eq!(SettingsRepository::get(&conn, "theme").unwrap(), None);

        SettingsRepository::set(&conn, "theme", &json!({"hue": 210}), 5).unwrap();
        assert_eq!(
            SettingsRepository::get(&conn, "theme").unwrap(),
            Some(json!({"hue": 210}))
        );

        SettingsRepository::set(&conn, "theme", &"dark", 6).unwrap();
        let theme: Option<String> = SettingsRepository::get_as(&conn, "theme").unwrap();
        assert_eq!(theme.as_deref(), Some("dark"));
    }

    #[test]
    fn test_delete_and_list() {
        let conn = Database::in_memory().unwrap();
        SettingsRepository::set(&conn, "b", &2, 1).unwrap();
        SettingsRepository::set(&conn, "a", &true, 2).unwrap();

        let all = SettingsRepository::all(&conn).unwrap();
        let keys: Vec<_> = all.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(all[1].value, json!(2));

        assert!(SettingsRepository::delete(&conn, "a").unwrap());
        assert!(!SettingsRepository::delete(&conn, "a").unwrap());
        assert_eq!(SettingsRepository::all(&conn).unwrap().len(), 1);
    }
}
