use crate::error::{Result, StoreError};
use crate::model::{ContentId, ContentItem, User, UserContext, UserImage};
use crate::repository::{ContentRepository, JobOutcome};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::fs;
use std::path::{Path, PathBuf};

/// SQLite-backed content store
pub struct ContentDb {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ContentRow {
    pub id: String,
    pub kind: String,
    pub prompt: String,
    pub data: String,
    pub status: String,
    pub schedule: Option<String>,
    pub error_message: Option<String>,
    pub generation_job_id: Option<String>,
}

impl ContentRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            kind: row.get(1)?,
            prompt: row.get(2)?,
            data: row.get(3)?,
            status: row.get(4)?,
            schedule: row.get(5)?,
            error_message: row.get(6)?,
            generation_job_id: row.get(7)?,
        })
    }
}

impl TryFrom<ContentRow> for ContentItem {
    type Error = StoreError;

    fn try_from(row: ContentRow) -> Result<Self> {
        let kind = row.kind.parse().map_err(|_| StoreError::Corrupt {
            field: "content kind",
            value: row.kind.clone(),
        })?;
        let status = row.status.parse().map_err(|_| StoreError::Corrupt {
            field: "content status",
            value: row.status.clone(),
        })?;
        let schedule = match row.schedule {
            Some(raw) => Some(
                DateTime::parse_from_rfc3339(&raw)
                    .map_err(|_| StoreError::Corrupt {
                        field: "schedule",
                        value: raw.clone(),
                    })?
                    .with_timezone(&Utc),
            ),
            None => None,
        };
        Ok(ContentItem {
            id: ContentId(row.id),
            kind,
            prompt: row.prompt,
            data: row.data,
            status,
            schedule,
            error_message: row.error_message,
            generation_job_id: row.generation_job_id,
        })
    }
}

const CONTENT_COLUMNS: &str =
    "id, kind, prompt, data, status, schedule, error_message, generation_job_id";

impl ContentDb {
    pub fn open_or_create(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", &"WAL")?;
        conn.pragma_update(None, "synchronous", &"NORMAL")?;
        apply_migrations(&conn)?;
        tracing::debug!("content db opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn query_content(conn: &Connection, id: &str) -> Result<Option<ContentItem>> {
        let row = conn
            .query_row(
                &format!("SELECT {CONTENT_COLUMNS} FROM content_items WHERE id = ?1"),
                params![id],
                ContentRow::from_row,
            )
            .optional()?;
        row.map(ContentItem::try_from).transpose()
    }

    fn write_content(tx: &Transaction<'_>, item: &ContentItem) -> Result<()> {
        let now = Utc::now().timestamp();
        tx.execute(
            "UPDATE content_items SET prompt = ?2, data = ?3, status = ?4, schedule = ?5,
                 error_message = ?6, generation_job_id = ?7, updated_at = ?8
             WHERE id = ?1",
            params![
                item.id.as_str(),
                item.prompt,
                item.data,
                item.status.as_str(),
                item.schedule.map(|s| s.to_rfc3339()),
                item.error_message,
                item.generation_job_id,
                now
            ],
        )?;
        Ok(())
    }
}

impl ContentRepository for ContentDb {
    fn user(&self) -> Result<Option<User>> {
        let conn = self.conn.lock();
        let user = conn
            .query_row(
                "SELECT id, name, email FROM users WHERE slot = 0",
                [],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        email: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    fn set_user(&self, user: Option<&User>) -> Result<()> {
        let conn = self.conn.lock();
        match user {
            Some(user) => conn.execute(
                "INSERT OR REPLACE INTO users(slot, id, name, email) VALUES(0, ?1, ?2, ?3)",
                params![user.id, user.name, user.email],
            )?,
            None => conn.execute("DELETE FROM users", [])?,
        };
        Ok(())
    }

    fn context(&self) -> Result<UserContext> {
        let conn = self.conn.lock();
        let context = conn
            .query_row(
                "SELECT notes, links FROM user_context WHERE slot = 0",
                [],
                |row| {
                    Ok(UserContext {
                        notes: row.get(0)?,
                        links: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(context.unwrap_or_default())
    }

    fn save_context(&self, context: &UserContext) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO user_context(slot, notes, links, updated_at) VALUES(0, ?1, ?2, ?3)",
            params![context.notes, context.links, Utc::now().timestamp()],
        )?;
        Ok(())
    }

    fn list_images(&self) -> Result<Vec<UserImage>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT id, name, url FROM images ORDER BY rowid")?;
        let rows = stmt.query_map([], |row| {
            Ok(UserImage {
                id: row.get(0)?,
                name: row.get(1)?,
                url: row.get(2)?,
            })
        })?;
        let mut images = Vec::new();
        for row in rows {
            images.push(row?);
        }
        Ok(images)
    }

    fn get_image(&self, id: &str) -> Result<Option<UserImage>> {
        let conn = self.conn.lock();
        let image = conn
            .query_row(
                "SELECT id, name, url FROM images WHERE id = ?1",
                params![id],
                |row| {
                    Ok(UserImage {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        url: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(image)
    }

    fn insert_image(&self, image: &UserImage) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO images(id, name, url, created_at) VALUES(?1, ?2, ?3, ?4)",
            params![image.id, image.name, image.url, Utc::now().timestamp()],
        )?;
        Ok(())
    }

    fn update_image_url(&self, id: &str, url: &str) -> Result<Option<UserImage>> {
        {
            let conn = self.conn.lock();
            let changed = conn.execute(
                "UPDATE images SET url = ?2 WHERE id = ?1",
                params![id, url],
            )?;
            if changed == 0 {
                return Ok(None);
            }
        }
        self.get_image(id)
    }

    fn delete_image(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let changed = conn.execute("DELETE FROM images WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    fn list_content(&self) -> Result<Vec<ContentItem>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {CONTENT_COLUMNS} FROM content_items ORDER BY created_ms DESC, batch_index ASC"
        ))?;
        let rows = stmt.query_map([], ContentRow::from_row)?;
        let mut items = Vec::new();
        for row in rows {
            items.push(ContentItem::try_from(row?)?);
        }
        Ok(items)
    }

    fn get_content(&self, id: &ContentId) -> Result<Option<ContentItem>> {
        let conn = self.conn.lock();
        Self::query_content(&conn, id.as_str())
    }

    fn insert_content(&self, items: &[ContentItem]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let now = Utc::now().timestamp();
        for item in items {
            tx.execute(
                "INSERT INTO content_items(id, created_ms, batch_index, kind, prompt, data, status,
                     schedule, error_message, generation_job_id, updated_at)
                 VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    item.id.as_str(),
                    item.id.created_ms(),
                    item.id.batch_index() as i64,
                    item.kind.as_str(),
                    item.prompt,
                    item.data,
                    item.status.as_str(),
                    item.schedule.map(|s| s.to_rfc3339()),
                    item.error_message,
                    item.generation_job_id,
                    now
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn update_content(
        &self,
        id: &ContentId,
        apply: &mut dyn FnMut(&mut ContentItem),
    ) -> Result<Option<ContentItem>> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let Some(mut item) = Self::query_content(&tx, id.as_str())? else {
            return Ok(None);
        };
        apply(&mut item);
        Self::write_content(&tx, &item)?;
        tx.commit()?;
        Ok(Some(item))
    }

    fn delete_content(&self, id: &ContentId) -> Result<bool> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "DELETE FROM content_items WHERE id = ?1",
            params![id.as_str()],
        )?;
        Ok(changed > 0)
    }

    fn apply_job_outcomes(&self, outcomes: &[JobOutcome]) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut applied = 0;
        for outcome in outcomes {
            let Some(mut item) = Self::query_content(&tx, outcome.id.as_str())? else {
                continue;
            };
            if outcome.apply_to(&mut item) {
                Self::write_content(&tx, &item)?;
                applied += 1;
            }
        }
        tx.commit()?;
        Ok(applied)
    }
}

fn apply_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(include_str!("../migrations/V0001__init.sql"))?;
    conn.execute(
        "INSERT OR IGNORE INTO migrations(name, applied_at) VALUES(?1, strftime('%s','now'))",
        params!["V0001__init"],
    )?;
    Ok(())
}
