use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use warden_core::{Result, WardenError};

use crate::entry::{ActionResult, AuditEntry, AuditEventKind, Severity};

/// Filter for [`AuditJournal::query`] and [`AuditJournal::export`].
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub kinds: Vec<AuditEventKind>,
    pub severities: Vec<Severity>,
    pub agent_id: Option<Uuid>,
    pub session_id: Option<Uuid>,
    /// Substring match over action and target.
    pub contains: Option<String>,
    pub offset: usize,
    /// 0 = journal default (100).
    pub limit: usize,
}

impl AuditFilter {
    fn effective_limit(&self) -> usize {
        if self.limit == 0 {
            100
        } else {
            self.limit
        }
    }
}

/// Append-only journal backed by SQLite.
///
/// The only write path is `INSERT`; the crate contains no UPDATE or DELETE
/// statement. Writes are cheap single-row inserts — callers that must never
/// be poisoned by audit failures go through [`AuditJournal::record`], which
/// drops the entry after logging to stderr.
pub struct AuditJournal {
    db: Arc<Mutex<Connection>>,
}

impl AuditJournal {
    /// Open or create the journal database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        info!(?path, "opening audit journal");
        let conn =
            Connection::open(path).map_err(|e| WardenError::Storage(e.to_string()))?;
        Self::init(conn)
    }

    /// In-memory journal for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| WardenError::Storage(e.to_string()))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| WardenError::Storage(e.to_string()))?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS audit_entries (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL,
                event_type TEXT NOT NULL,
                severity TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                agent_id TEXT,
                session_id TEXT,
                user TEXT NOT NULL,
                action TEXT NOT NULL,
                target TEXT,
                result TEXT NOT NULL,
                detail TEXT,
                host TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_entries(timestamp);
            CREATE INDEX IF NOT EXISTS idx_audit_event_type ON audit_entries(event_type);
            CREATE INDEX IF NOT EXISTS idx_audit_session ON audit_entries(session_id);
            ",
        )
        .map_err(|e| WardenError::Storage(e.to_string()))?;

        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
        })
    }

    /// Append one entry. Fails only on storage unavailability.
    pub fn log(&self, entry: &AuditEntry) -> Result<()> {
        let detail = entry
            .detail
            .as_ref()
            .map(|d| serde_json::to_string(d))
            .transpose()?;
        let db = self.db.lock();
        db.execute(
            "INSERT INTO audit_entries
                (id, event_type, severity, timestamp, agent_id, session_id, user, action, target, result, detail, host)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            rusqlite::params![
                entry.id.to_string(),
                entry.kind.as_str(),
                entry.severity.as_str(),
                entry.timestamp.to_rfc3339(),
                entry.agent_id.map(|a| a.to_string()),
                entry.session_id.map(|s| s.to_string()),
                entry.user,
                entry.action,
                entry.target,
                entry.result.as_str(),
                detail,
                entry.host,
            ],
        )
        .map_err(|e| WardenError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Append one entry, swallowing storage failures. Audit must not poison
    /// a user task: on failure the entry is dropped after logging to stderr.
    pub fn record(&self, entry: AuditEntry) {
        if let Err(e) = self.log(&entry) {
            eprintln!("audit write failed, dropping entry '{}': {e}", entry.action);
            tracing::error!(error = %e, action = %entry.action, "audit write failed");
        }
    }

    /// Return matching entries, newest first, with offset+limit pagination.
    pub fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>> {
        let mut sql = String::from(
            "SELECT id, event_type, severity, timestamp, agent_id, session_id, user, action, target, result, detail, host
             FROM audit_entries WHERE 1=1",
        );
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(from) = filter.from {
            sql.push_str(" AND timestamp >= ?");
            params.push(Box::new(from.to_rfc3339()));
        }
        if let Some(to) = filter.to {
            sql.push_str(" AND timestamp <= ?");
            params.push(Box::new(to.to_rfc3339()));
        }
        if !filter.kinds.is_empty() {
            sql.push_str(" AND event_type IN (");
            for (i, kind) in filter.kinds.iter().enumerate() {
                if i > 0 {
                    sql.push(',');
                }
                sql.push('?');
                params.push(Box::new(kind.as_str().to_string()));
            }
            sql.push(')');
        }
        if !filter.severities.is_empty() {
            sql.push_str(" AND severity IN (");
            for (i, sev) in filter.severities.iter().enumerate() {
                if i > 0 {
                    sql.push(',');
                }
                sql.push('?');
                params.push(Box::new(sev.as_str().to_string()));
            }
            sql.push(')');
        }
        if let Some(agent_id) = filter.agent_id {
            sql.push_str(" AND agent_id = ?");
            params.push(Box::new(agent_id.to_string()));
        }
        if let Some(session_id) = filter.session_id {
            sql.push_str(" AND session_id = ?");
            params.push(Box::new(session_id.to_string()));
        }
        if let Some(needle) = &filter.contains {
            sql.push_str(" AND (action LIKE ? OR target LIKE ?)");
            let pattern = format!("%{needle}%");
            params.push(Box::new(pattern.clone()));
            params.push(Box::new(pattern));
        }

        sql.push_str(" ORDER BY timestamp DESC, seq DESC LIMIT ? OFFSET ?");
        params.push(Box::new(filter.effective_limit() as i64));
        params.push(Box::new(filter.offset as i64));

        let db = self.db.lock();
        let mut stmt = db
            .prepare(&sql)
            .map_err(|e| WardenError::Storage(e.to_string()))?;
        let rows = stmt
            .query_map(
                rusqlite::params_from_iter(params.iter().map(|p| p.as_ref())),
                row_to_entry,
            )
            .map_err(|e| WardenError::Storage(e.to_string()))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    /// Total number of entries, for monitoring and tests.
    pub fn count(&self) -> Result<usize> {
        let db = self.db.lock();
        let n: i64 = db
            .query_row("SELECT COUNT(*) FROM audit_entries", [], |row| row.get(0))
            .map_err(|e| WardenError::Storage(e.to_string()))?;
        Ok(n as usize)
    }

    /// Materialize matching entries as CSV in the process temp directory.
    ///
    /// Header and cell layout are stable; commas inside `action` are
    /// replaced with semicolons so the row stays ten cells wide.
    pub fn export(&self, filter: &AuditFilter) -> Result<PathBuf> {
        let entries = self.query(filter)?;
        let path = std::env::temp_dir().join(format!(
            "warden-audit-{}.csv",
            Uuid::new_v4().as_simple()
        ));
        let mut file = std::fs::File::create(&path)?;
        writeln!(
            file,
            "id,event_type,severity,timestamp,agent_id,session_id,user_id,action,target,result"
        )?;
        for e in &entries {
            writeln!(
                file,
                "{},{},{},{},{},{},{},{},{},{}",
                e.id,
                e.kind.as_str(),
                e.severity.as_str(),
                e.timestamp.to_rfc3339(),
                e.agent_id.map(|a| a.to_string()).unwrap_or_default(),
                e.session_id.map(|s| s.to_string()).unwrap_or_default(),
                e.user,
                e.action.replace(',', ";"),
                e.target.as_deref().unwrap_or(""),
                e.result.as_str(),
            )?;
        }
        info!(?path, entries = entries.len(), "exported audit entries");
        Ok(path)
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuditEntry> {
    let id: String = row.get(0)?;
    let kind: String = row.get(1)?;
    let severity: String = row.get(2)?;
    let timestamp: String = row.get(3)?;
    let agent_id: Option<String> = row.get(4)?;
    let session_id: Option<String> = row.get(5)?;
    let detail: Option<String> = row.get(10)?;

    Ok(AuditEntry {
        id: id.parse().unwrap_or_default(),
        kind: AuditEventKind::parse(&kind).unwrap_or(AuditEventKind::CommandExecuted),
        severity: Severity::parse(&severity).unwrap_or(Severity::Info),
        timestamp: DateTime::parse_from_rfc3339(&timestamp)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        agent_id: agent_id.and_then(|a| a.parse().ok()),
        session_id: session_id.and_then(|s| s.parse().ok()),
        user: row.get(6)?,
        action: row.get(7)?,
        target: row.get(8)?,
        result: ActionResult::parse(&row.get::<_, String>(9)?).unwrap_or(ActionResult::Success),
        detail: detail.and_then(|d| serde_json::from_str(&d).ok()),
        host: row.get(11)?,
    })
}
