use crate::api::models::Conversation;
use crate::directory::{Profile, UserDirectory};
use crate::error::StorageError;
use crate::phone::Identity;
use directories::ProjectDirs;
use rusqlite::{Connection, OptionalExtension, params};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

type Result<T> = std::result::Result<T, StorageError>;

fn db_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("com", "example", "iChat")?;
    Some(proj.data_dir().join("cache.sqlite"))
}

fn now_secs() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
}

// Caches the directory and the last conversation list so a cold start has something to show
pub struct Cache {
    conn: Connection,
}

impl Cache {
    pub fn open_default() -> Result<Self> {
        let path = db_path().ok_or_else(|| rusqlite::Error::InvalidPath("no data dir".into()))?;
        Self::open(&path)
    }

    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                log::warn!("could not create {}: {e}", parent.display());
            }
        }
        let cache = Self { conn: Connection::open(path)? };
        cache.init()?;
        Ok(cache)
    }

    fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            CREATE TABLE IF NOT EXISTS users (
                phone TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                profile_pic TEXT,
                updated_at INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS conversations (
                counterparty TEXT PRIMARY KEY,
                display_name TEXT NOT NULL,
                avatar_url TEXT,
                summary TEXT NOT NULL,
                last_ts INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    pub fn upsert_users(&mut self, directory: &UserDirectory) -> Result<()> {
        let now = now_secs();
        let tx = self.conn.transaction()?;
        for (id, profile) in directory.iter() {
            tx.execute(
                r#"
                INSERT INTO users (phone, name, profile_pic, updated_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(phone) DO UPDATE SET
                    name=excluded.name,
                    profile_pic=excluded.profile_pic,
                    updated_at=excluded.updated_at
                "#,
                params![id.as_str(), profile.name, profile.avatar_url, now],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn load_directory(&self) -> Result<UserDirectory> {
        let mut stmt = self.conn.prepare("SELECT phone, name, profile_pic FROM users")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, Option<String>>(2)?))
        })?;
        let mut dir = UserDirectory::new();
        for r in rows {
            let (phone, name, avatar_url) = r?;
            if let Some(id) = Identity::parse(&phone) {
                dir.insert(id, Profile { name, avatar_url });
            }
        }
        Ok(dir)
    }

    /// Swap the cached list for `conversations` in one transaction.
    pub fn replace_conversations(&mut self, conversations: &[Conversation]) -> Result<()> {
        let now = now_secs();
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM conversations", [])?;
        for c in conversations {
            tx.execute(
                r#"
                INSERT INTO conversations (counterparty, display_name, avatar_url, summary, last_ts, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    c.counterparty.as_str(),
                    c.display_name,
                    c.avatar_url,
                    c.last_message_summary,
                    c.last_timestamp,
                    now
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get_conversations(&self, limit: Option<usize>) -> Result<Vec<Conversation>> {
        let mut stmt = self.conn.prepare(
            "SELECT counterparty, display_name, avatar_url, summary, last_ts FROM conversations \
             ORDER BY last_ts DESC, display_name ASC LIMIT ?1",
        )?;
        let lim = limit.unwrap_or(500) as i64;
        let rows = stmt.query_map(params![lim], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?;
        let mut out = Vec::new();
        for r in rows {
            let (counterparty, display_name, avatar_url, summary, last_ts) = r?;
            let Some(counterparty) = Identity::parse(&counterparty) else { continue };
            out.push(Conversation {
                counterparty,
                display_name,
                avatar_url,
                last_message_summary: summary,
                last_timestamp: last_ts,
            });
        }
        Ok(out)
    }

    pub fn last_conversation_ts(&self, counterparty: &Identity) -> Result<Option<i64>> {
        let ts = self
            .conn
            .query_row(
                "SELECT last_ts FROM conversations WHERE counterparty = ?1",
                params![counterparty.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(ts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conv(id: &str, name: &str, ts: i64) -> Conversation {
        Conversation {
            counterparty: Identity::parse(id).unwrap(),
            display_name: name.into(),
            avatar_url: None,
            last_message_summary: format!("from {name}"),
            last_timestamp: ts,
        }
    }

    #[test]
    fn conversations_come_back_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = Cache::open(&dir.path().join("data").join("cache.sqlite")).unwrap();
        cache
            .replace_conversations(&[conv("1110001111", "Bea", 10), conv("2220002222", "Al", 30), conv("3330003333", "Ann", 10)])
            .unwrap();
        let names: Vec<_> = cache.get_conversations(None).unwrap().into_iter().map(|c| c.display_name).collect();
        assert_eq!(names, vec!["Al", "Ann", "Bea"]);
        assert_eq!(cache.get_conversations(Some(1)).unwrap().len(), 1);
    }

    #[test]
    fn replace_drops_stale_entries() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = Cache::open(&dir.path().join("cache.sqlite")).unwrap();
        cache.replace_conversations(&[conv("1110001111", "Bea", 10)]).unwrap();
        cache.replace_conversations(&[conv("2220002222", "Al", 30)]).unwrap();
        let bea = Identity::parse("1110001111").unwrap();
        assert_eq!(cache.last_conversation_ts(&bea).unwrap(), None);
        let al = Identity::parse("2220002222").unwrap();
        assert_eq!(cache.last_conversation_ts(&al).unwrap(), Some(30));
    }

    #[test]
    fn directory_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.sqlite");
        let id = Identity::parse("8880002222").unwrap();
        {
            let mut cache = Cache::open(&path).unwrap();
            let mut users = UserDirectory::new();
            users.insert(id.clone(), Profile { name: "Bob".into(), avatar_url: Some("https://cdn/b.jpg".into()) });
            cache.upsert_users(&users).unwrap();
        }
        let loaded = Cache::open(&path).unwrap().load_directory().unwrap();
        assert_eq!(loaded.display_name(&id), "Bob");
        assert_eq!(loaded.avatar_url(&id).as_deref(), Some("https://cdn/b.jpg"));
    }
}
