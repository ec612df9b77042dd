//! SQLite-backed ticket store implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, types::Type, Connection, OptionalExtension};

use super::{
    NewTicket, Ticket, TicketCategory, TicketError, TicketFilter, TicketStatus, TicketStore,
    TicketUrgency, Transition, TriageResult,
};

const SELECT_COLUMNS: &str = "SELECT id, subject, message, requester_name, requester_email, status, \
     category, sentiment_score, urgency, draft_response, error, created_at, updated_at, resolved_at \
     FROM tickets";

/// SQLite-backed ticket store.
pub struct SqliteTicketStore {
    conn: Mutex<Connection>,
}

impl SqliteTicketStore {
    /// Create a new SQLite ticket store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, TicketError> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite ticket store (useful for testing).
    pub fn in_memory() -> Result<Self, TicketError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), TicketError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS tickets (
                id TEXT PRIMARY KEY,
                subject TEXT NOT NULL,
                message TEXT NOT NULL,
                requester_name TEXT,
                requester_email TEXT,
                status TEXT NOT NULL DEFAULT 'PENDING',
                category TEXT,
                sentiment_score INTEGER,
                urgency TEXT,
                draft_response TEXT,
                error TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                resolved_at TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_tickets_status ON tickets(status);
            CREATE INDEX IF NOT EXISTS idx_tickets_created_at ON tickets(created_at DESC);
            "#,
        )
        .map_err(db_err)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, TicketError> {
        self.conn
            .lock()
            .map_err(|_| TicketError::Database("connection lock poisoned".to_string()))
    }

    fn fetch(conn: &Connection, id: &str) -> Result<Option<Ticket>, TicketError> {
        conn.query_row(
            &format!("{} WHERE id = ?", SELECT_COLUMNS),
            params![id],
            Self::row_to_ticket,
        )
        .optional()
        .map_err(db_err)
    }

    /// Run `write` only if the ticket's current status passes `allowed`.
    ///
    /// Check and write happen under one connection lock.
    fn guarded_update<F>(
        &self,
        id: &str,
        allowed: fn(&TicketStatus) -> bool,
        write: F,
    ) -> Result<Option<Transition>, TicketError>
    where
        F: FnOnce(&Connection, &str) -> rusqlite::Result<usize>,
    {
        let conn = self.lock()?;

        let current = match Self::fetch(&conn, id)? {
            Some(ticket) => ticket,
            None => return Ok(None),
        };

        if !allowed(&current.status) {
            return Ok(Some(Transition::Refused(current)));
        }

        write(&conn, &timestamp(Utc::now())).map_err(db_err)?;

        let updated =
            Self::fetch(&conn, id)?.ok_or_else(|| TicketError::NotFound(id.to_string()))?;
        Ok(Some(Transition::Applied(updated)))
    }

    fn build_where_clause(filter: &TicketFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        let where_clause = match filter.status {
            Some(status) => {
                params.push(Box::new(status.as_str()));
                "WHERE status = ?".to_string()
            }
            None => String::new(),
        };

        (where_clause, params)
    }

    fn row_to_ticket(row: &rusqlite::Row) -> rusqlite::Result<Ticket> {
        let status: String = row.get(5)?;
        let category: Option<String> = row.get(6)?;
        let urgency: Option<String> = row.get(8)?;
        let created_at: String = row.get(11)?;
        let updated_at: String = row.get(12)?;
        let resolved_at: Option<String> = row.get(13)?;

        Ok(Ticket {
            id: row.get(0)?,
            subject: row.get(1)?,
            message: row.get(2)?,
            requester_name: row.get(3)?,
            requester_email: row.get(4)?,
            status: status.parse::<TicketStatus>().map_err(|e| conversion_err(5, e))?,
            category: category
                .map(|c| c.parse::<TicketCategory>())
                .transpose()
                .map_err(|e| conversion_err(6, e))?,
            sentiment_score: row.get(7)?,
            urgency: urgency
                .map(|u| u.parse::<TicketUrgency>())
                .transpose()
                .map_err(|e| conversion_err(8, e))?,
            draft_response: row.get(9)?,
            error: row.get(10)?,
            created_at: parse_timestamp(&created_at).map_err(|e| conversion_err(11, e))?,
            updated_at: parse_timestamp(&updated_at).map_err(|e| conversion_err(12, e))?,
            resolved_at: resolved_at
                .as_deref()
                .map(parse_timestamp)
                .transpose()
                .map_err(|e| conversion_err(13, e))?,
        })
    }
}

impl TicketStore for SqliteTicketStore {
    fn create(&self, ticket: NewTicket) -> Result<Ticket, TicketError> {
        let conn = self.lock()?;

        let id = uuid::Uuid::new_v4().to_string();
        let now = timestamp(Utc::now());

        conn.execute(
            "INSERT INTO tickets (id, subject, message, requester_name, requester_email, status, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                id,
                ticket.subject,
                ticket.message,
                ticket.requester_name,
                ticket.requester_email,
                TicketStatus::Pending.as_str(),
                now,
                now,
            ],
        )
        .map_err(db_err)?;

        Self::fetch(&conn, &id)?.ok_or(TicketError::NotFound(id))
    }

    fn get(&self, id: &str) -> Result<Option<Ticket>, TicketError> {
        let conn = self.lock()?;
        Self::fetch(&conn, id)
    }

    fn list(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, TicketError> {
        let conn = self.lock()?;

        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!(
            "{} {} ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?",
            SELECT_COLUMNS, where_clause
        );

        let mut stmt = conn.prepare(&sql).map_err(db_err)?;

        // SQLite treats a negative LIMIT as "no limit"
        let mut all_params: Vec<Box<dyn rusqlite::ToSql>> = params;
        all_params.push(Box::new(filter.limit.unwrap_or(-1)));
        all_params.push(Box::new(filter.offset));

        let param_refs: Vec<&dyn rusqlite::ToSql> = all_params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), Self::row_to_ticket)
            .map_err(db_err)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(db_err)
    }

    fn count(&self, filter: &TicketFilter) -> Result<i64, TicketError> {
        let conn = self.lock()?;

        let (where_clause, params) = Self::build_where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM tickets {}", where_clause);
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(db_err)
    }

    fn apply_triage_success(
        &self,
        id: &str,
        result: &TriageResult,
    ) -> Result<Option<Transition>, TicketError> {
        self.guarded_update(id, TicketStatus::accepts_triage_outcome, |conn, now| {
            conn.execute(
                "UPDATE tickets SET category = ?, sentiment_score = ?, urgency = ?, draft_response = ?, status = ?, error = NULL, updated_at = ? WHERE id = ?",
                params![
                    result.category.as_str(),
                    result.sentiment_score,
                    result.urgency.as_str(),
                    result.draft_response,
                    TicketStatus::Triaged.as_str(),
                    now,
                    id,
                ],
            )
        })
    }

    fn apply_triage_failure(&self, id: &str, message: &str) -> Result<(), TicketError> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE tickets SET status = ?, error = ?, updated_at = ? WHERE id = ? AND status != ?",
            params![
                TicketStatus::Failed.as_str(),
                message,
                timestamp(Utc::now()),
                id,
                TicketStatus::Resolved.as_str(),
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    fn mark_pending(&self, id: &str) -> Result<Option<Transition>, TicketError> {
        self.guarded_update(id, TicketStatus::is_retryable, |conn, now| {
            conn.execute(
                "UPDATE tickets SET status = ?, error = NULL, updated_at = ? WHERE id = ?",
                params![TicketStatus::Pending.as_str(), now, id],
            )
        })
    }

    fn update_draft(
        &self,
        id: &str,
        draft_response: &str,
    ) -> Result<Option<Transition>, TicketError> {
        self.guarded_update(id, TicketStatus::accepts_manual_update, |conn, now| {
            conn.execute(
                "UPDATE tickets SET draft_response = ?, updated_at = ? WHERE id = ?",
                params![draft_response, now, id],
            )
        })
    }

    fn resolve(
        &self,
        id: &str,
        draft_response: Option<&str>,
    ) -> Result<Option<Transition>, TicketError> {
        self.guarded_update(id, TicketStatus::accepts_manual_update, |conn, now| {
            conn.execute(
                "UPDATE tickets SET status = ?, draft_response = COALESCE(?, draft_response), resolved_at = ?, updated_at = ? WHERE id = ?",
                params![TicketStatus::Resolved.as_str(), draft_response, now, now, id],
            )
        })
    }
}

fn db_err(e: rusqlite::Error) -> TicketError {
    TicketError::Database(e.to_string())
}

fn conversion_err(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, message.into())
}

/// Fixed-width RFC 3339 so text ordering matches time ordering.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("Invalid timestamp '{}': {}", value, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_store() -> SqliteTicketStore {
        SqliteTicketStore::in_memory().unwrap()
    }

    fn create_test_ticket() -> NewTicket {
        NewTicket::new("Payment failed", "Card declined").with_requester(
            Some("Ari".to_string()),
            Some("ari@example.com".to_string()),
        )
    }

    fn billing_result() -> TriageResult {
        TriageResult {
            category: TicketCategory::Billing,
            sentiment_score: 6,
            urgency: TicketUrgency::Medium,
            draft_response: "We're looking into it.".to_string(),
        }
    }

    #[test]
    fn test_create_ticket() {
        let store = create_test_store();
        let ticket = store.create(create_test_ticket()).unwrap();

        assert!(!ticket.id.is_empty());
        assert_eq!(ticket.subject, "Payment failed");
        assert_eq!(ticket.message, "Card declined");
        assert_eq!(ticket.requester_name.as_deref(), Some("Ari"));
        assert_eq!(ticket.requester_email.as_deref(), Some("ari@example.com"));
        assert_eq!(ticket.status, TicketStatus::Pending);
        assert!(ticket.category.is_none());
        assert!(ticket.error.is_none());
        assert!(ticket.resolved_at.is_none());
    }

    #[test]
    fn test_get_nonexistent_ticket() {
        let store = create_test_store();
        assert!(store.get("nonexistent-id").unwrap().is_none());
    }

    #[test]
    fn test_list_newest_first() {
        let store = create_test_store();
        let first = store.create(NewTicket::new("first", "m")).unwrap();
        let second = store.create(NewTicket::new("second", "m")).unwrap();

        let tickets = store.list(&TicketFilter::new()).unwrap();
        assert_eq!(tickets.len(), 2);
        assert_eq!(tickets[0].id, second.id);
        assert_eq!(tickets[1].id, first.id);
    }

    #[test]
    fn test_list_with_status_filter() {
        let store = create_test_store();
        store.create(create_test_ticket()).unwrap();
        let failed = store.create(create_test_ticket()).unwrap();
        store.apply_triage_failure(&failed.id, "boom").unwrap();

        let pending = store
            .list(&TicketFilter::new().with_status(TicketStatus::Pending))
            .unwrap();
        assert_eq!(pending.len(), 1);

        let failed_list = store
            .list(&TicketFilter::new().with_status(TicketStatus::Failed))
            .unwrap();
        assert_eq!(failed_list.len(), 1);
        assert_eq!(failed_list[0].id, failed.id);

        let count = store
            .count(&TicketFilter::new().with_status(TicketStatus::Failed))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_list_pagination() {
        let store = create_test_store();
        for _ in 0..5 {
            store.create(create_test_ticket()).unwrap();
        }

        let page = store
            .list(&TicketFilter::new().with_limit(2).with_offset(4))
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(store.count(&TicketFilter::new().with_limit(2)).unwrap(), 5);
    }

    #[test]
    fn test_triage_success_sets_fields_and_clears_error() {
        let store = create_test_store();
        let ticket = store.create(create_test_ticket()).unwrap();
        store.apply_triage_failure(&ticket.id, "rate limited").unwrap();

        let transition = store
            .apply_triage_success(&ticket.id, &billing_result())
            .unwrap()
            .unwrap();
        assert!(transition.is_applied());

        let updated = transition.into_ticket();
        assert_eq!(updated.status, TicketStatus::Triaged);
        assert_eq!(updated.category, Some(TicketCategory::Billing));
        assert_eq!(updated.sentiment_score, Some(6));
        assert_eq!(updated.urgency, Some(TicketUrgency::Medium));
        assert_eq!(updated.draft_response.as_deref(), Some("We're looking into it."));
        assert!(updated.error.is_none());
    }

    #[test]
    fn test_triage_success_refused_when_resolved() {
        let store = create_test_store();
        let ticket = store.create(create_test_ticket()).unwrap();
        store.resolve(&ticket.id, Some("done")).unwrap();

        let transition = store
            .apply_triage_success(&ticket.id, &billing_result())
            .unwrap()
            .unwrap();
        assert!(!transition.is_applied());

        let fetched = store.get(&ticket.id).unwrap().unwrap();
        assert_eq!(fetched.status, TicketStatus::Resolved);
        assert!(fetched.category.is_none());
        assert_eq!(fetched.draft_response.as_deref(), Some("done"));
    }

    #[test]
    fn test_triage_success_missing_ticket() {
        let store = create_test_store();
        let result = store.apply_triage_success("missing", &billing_result()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_triage_failure_keeps_classification() {
        let store = create_test_store();
        let ticket = store.create(create_test_ticket()).unwrap();
        store.apply_triage_success(&ticket.id, &billing_result()).unwrap();

        store.apply_triage_failure(&ticket.id, "rate limited").unwrap();

        let fetched = store.get(&ticket.id).unwrap().unwrap();
        assert_eq!(fetched.status, TicketStatus::Failed);
        assert_eq!(fetched.error.as_deref(), Some("rate limited"));
        assert_eq!(fetched.category, Some(TicketCategory::Billing));
        assert_eq!(fetched.sentiment_score, Some(6));
    }

    #[test]
    fn test_triage_failure_ignores_resolved() {
        let store = create_test_store();
        let ticket = store.create(create_test_ticket()).unwrap();
        store.resolve(&ticket.id, None).unwrap();

        store.apply_triage_failure(&ticket.id, "late failure").unwrap();

        let fetched = store.get(&ticket.id).unwrap().unwrap();
        assert_eq!(fetched.status, TicketStatus::Resolved);
        assert!(fetched.error.is_none());
    }

    #[test]
    fn test_mark_pending_from_failed() {
        let store = create_test_store();
        let ticket = store.create(create_test_ticket()).unwrap();
        store.apply_triage_failure(&ticket.id, "rate limited").unwrap();

        let transition = store.mark_pending(&ticket.id).unwrap().unwrap();
        assert!(transition.is_applied());
        assert_eq!(transition.ticket().status, TicketStatus::Pending);
        assert!(transition.ticket().error.is_none());
    }

    #[test]
    fn test_mark_pending_refused_for_other_states() {
        let store = create_test_store();
        let ticket = store.create(create_test_ticket()).unwrap();
        store.apply_triage_success(&ticket.id, &billing_result()).unwrap();

        let transition = store.mark_pending(&ticket.id).unwrap().unwrap();
        assert!(!transition.is_applied());
        assert_eq!(transition.ticket().status, TicketStatus::Triaged);
        assert!(store.mark_pending("missing").unwrap().is_none());
    }

    #[test]
    fn test_update_draft_keeps_status() {
        let store = create_test_store();
        let ticket = store.create(create_test_ticket()).unwrap();
        store.apply_triage_success(&ticket.id, &billing_result()).unwrap();

        let transition = store.update_draft(&ticket.id, "Edited reply").unwrap().unwrap();
        assert!(transition.is_applied());
        let updated = transition.into_ticket();
        assert_eq!(updated.status, TicketStatus::Triaged);
        assert_eq!(updated.draft_response.as_deref(), Some("Edited reply"));
    }

    #[test]
    fn test_update_draft_refused_when_failed() {
        let store = create_test_store();
        let ticket = store.create(create_test_ticket()).unwrap();
        store.apply_triage_failure(&ticket.id, "boom").unwrap();

        let transition = store.update_draft(&ticket.id, "Edited").unwrap().unwrap();
        assert!(!transition.is_applied());
        assert!(transition.ticket().draft_response.is_none());
    }

    #[test]
    fn test_resolve_keeps_draft_when_none_given() {
        let store = create_test_store();
        let ticket = store.create(create_test_ticket()).unwrap();
        store.apply_triage_success(&ticket.id, &billing_result()).unwrap();

        let resolved = store.resolve(&ticket.id, None).unwrap().unwrap().into_ticket();
        assert_eq!(resolved.status, TicketStatus::Resolved);
        assert!(resolved.resolved_at.is_some());
        assert_eq!(resolved.draft_response.as_deref(), Some("We're looking into it."));
    }

    #[test]
    fn test_resolve_twice_is_refused() {
        let store = create_test_store();
        let ticket = store.create(create_test_ticket()).unwrap();
        let first = store.resolve(&ticket.id, Some("a")).unwrap().unwrap();
        let second = store.resolve(&ticket.id, Some("b")).unwrap().unwrap();

        assert!(first.is_applied());
        assert!(!second.is_applied());
        assert_eq!(second.ticket().draft_response.as_deref(), Some("a"));
    }

    #[test]
    fn test_file_based_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("tickets.db");

        let ticket = {
            let store = SqliteTicketStore::new(&db_path).unwrap();
            store.create(create_test_ticket()).unwrap()
        };

        assert!(db_path.exists());

        let reopened = SqliteTicketStore::new(&db_path).unwrap();
        let fetched = reopened.get(&ticket.id).unwrap().unwrap();
        assert_eq!(fetched.status, TicketStatus::Pending);
        assert_eq!(fetched.created_at, ticket.created_at);
    }

    #[test]
    fn test_corrupt_timestamp_is_an_error() {
        let store = create_test_store();
        let ticket = store.create(create_test_ticket()).unwrap();
        store
            .lock()
            .unwrap()
            .execute(
                "UPDATE tickets SET created_at = 'yesterday' WHERE id = ?",
                params![ticket.id],
            )
            .unwrap();

        assert!(matches!(
            store.get(&ticket.id),
            Err(TicketError::Database(_))
        ));
        assert!(store.list(&TicketFilter::new()).is_err());
    }
}
