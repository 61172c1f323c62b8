pub mod resolver;

use crate::utils::digits_only;
use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, params};
use std::path::Path;
use tracing::debug;

/// A CRM contact record, the unit identified by a phone number.
///
/// `phone` holds the local number (digits only); the country code lives in
/// its own column. Leads are never hard-deleted here — deletion is a CRUD
/// concern of the surrounding application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lead {
    pub id: i64,
    pub phone: String,
    pub country_code: String,
    pub name: Option<String>,
    pub whatsapp_name: Option<String>,
    pub stage: String,
    pub temperature: String,
    pub assigned_to: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub struct LeadStore {
    conn: std::sync::Mutex<Connection>,
}

impl LeadStore {
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!(
                    "Failed to create database parent directory: {}",
                    parent.display()
                )
            })?;
        }

        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database at: {}", db_path.display()))?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA busy_timeout=3000;
             PRAGMA foreign_keys=ON;",
        )?;

        let store = Self {
            conn: std::sync::Mutex::new(conn),
        };
        store.ensure_schema().with_context(|| {
            format!(
                "Failed to initialize database schema at: {}",
                db_path.display()
            )
        })?;
        Ok(store)
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: std::sync::Mutex::new(conn),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS leads (
                id INTEGER PRIMARY KEY,
                phone TEXT NOT NULL,
                country_code TEXT NOT NULL DEFAULT '55',
                name TEXT,
                whatsapp_name TEXT,
                stage TEXT NOT NULL DEFAULT 'new',
                temperature TEXT NOT NULL DEFAULT 'warm',
                assigned_to TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (country_code, phone)
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_leads_phone ON leads (phone)",
            [],
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))
    }

    /// Exact match of the `phone` column against a set of variations,
    /// oldest lead first.
    pub fn find_exact(&self, variations: &[String]) -> Result<Option<Lead>> {
        if variations.is_empty() {
            return Ok(None);
        }
        let conn = self.lock()?;
        let placeholders = vec!["?"; variations.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM leads WHERE phone IN ({}) ORDER BY id LIMIT 1",
            LEAD_COLUMNS, placeholders
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(rusqlite::params_from_iter(variations.iter()))?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_lead(row)?)),
            None => Ok(None),
        }
    }

    /// Leads whose stored phone ends with `suffix`, oldest first.
    ///
    /// `suffix` must be digits only — anything else would act as a LIKE
    /// wildcard.
    pub fn find_by_suffix(&self, suffix: &str, limit: usize) -> Result<Vec<Lead>> {
        let suffix = digits_only(suffix);
        if suffix.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM leads WHERE phone LIKE ?1 ORDER BY id LIMIT ?2",
            LEAD_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let pattern = format!("%{}", suffix);
        let rows = stmt.query_map(params![pattern, limit as i64], row_to_lead)?;
        let mut leads = Vec::new();
        for lead in rows {
            leads.push(lead?);
        }
        Ok(leads)
    }

    pub fn get(&self, id: i64) -> Result<Option<Lead>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {} FROM leads WHERE id = ?1", LEAD_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params![id])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_lead(row)?)),
            None => Ok(None),
        }
    }

    /// Insert a new lead for a first inbound contact.
    ///
    /// The `UNIQUE (country_code, phone)` constraint closes the race where
    /// two concurrent inbound messages both conclude "no lead found": the
    /// losing insert re-resolves and returns the winner instead of creating
    /// a duplicate.
    pub fn create_lead(
        &self,
        phone: &str,
        country_code: &str,
        whatsapp_name: Option<&str>,
    ) -> Result<Lead> {
        let now = Utc::now().to_rfc3339();
        let inserted = {
            let conn = self.lock()?;
            conn.execute(
                "INSERT INTO leads (phone, country_code, whatsapp_name, stage, temperature, created_at, updated_at)
                 VALUES (?1, ?2, ?3, 'new', 'warm', ?4, ?4)",
                params![phone, country_code, whatsapp_name, now],
            )
            .map(|_| conn.last_insert_rowid())
        };

        match inserted {
            Ok(id) => self
                .get(id)?
                .context("lead vanished immediately after insert"),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                debug!(
                    "lead store: concurrent insert for {}/{}, using existing row",
                    country_code, phone
                );
                self.find_by_phone_exact(phone, country_code)?
                    .context("constraint hit but winning lead not found")
            }
            Err(e) => Err(e.into()),
        }
    }

    fn find_by_phone_exact(&self, phone: &str, country_code: &str) -> Result<Option<Lead>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM leads WHERE phone = ?1 AND country_code = ?2",
            LEAD_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params![phone, country_code])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_lead(row)?)),
            None => Ok(None),
        }
    }

    pub fn count(&self) -> Result<i64> {
        let conn = self.lock()?;
        let count = conn.query_row("SELECT COUNT(*) FROM leads", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Refresh the pushed display name on re-contact. No-op when unchanged.
    pub fn update_whatsapp_name(&self, id: i64, whatsapp_name: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let conn = self.lock()?;
        conn.execute(
            "UPDATE leads SET whatsapp_name = ?1, updated_at = ?2
             WHERE id = ?3 AND (whatsapp_name IS NULL OR whatsapp_name != ?1)",
            params![whatsapp_name, now, id],
        )?;
        Ok(())
    }
}

const LEAD_COLUMNS: &str =
    "id, phone, country_code, name, whatsapp_name, stage, temperature, assigned_to, created_at, updated_at";

fn row_to_lead(row: &rusqlite::Row<'_>) -> rusqlite::Result<Lead> {
    Ok(Lead {
        id: row.get(0)?,
        phone: row.get(1)?,
        country_code: row.get(2)?,
        name: row.get(3)?,
        whatsapp_name: row.get(4)?,
        stage: row.get(5)?,
        temperature: row.get(6)?,
        assigned_to: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}
