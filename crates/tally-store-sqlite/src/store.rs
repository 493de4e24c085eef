//! [`SqliteStore`] — the SQLite implementation of [`LedgerStore`].

use std::path::Path;

use chrono::{Days, NaiveDate, Utc};
use rusqlite::OptionalExtension as _;

use tally_core::{
  ledger::TaskLedger,
  store::{
    LedgerItem, LedgerSnapshot, LedgerStore, MeetingRecord, NewLedgerRecord,
    NewMeetingRecord, WorkloadRow,
  },
};

use crate::{
  encode::{
    decode_date, encode_category, encode_date, encode_dt, encode_names,
    encode_status, RawLedgerItem, RawLedgerRecord, RawMeetingRecord,
  },
  schema::SCHEMA,
  Error, Result,
};

const RECORD_COLUMNS: &str = "id, container_id, analysis_date, analysis_at, \
   window_start, window_end, total_messages, model, raw_output, status, \
   created_at, updated_at";

const MEETING_COLUMNS: &str = "id, recorded_at, transcript, summary_text, \
   participants, meeting_type, model, created_at";

fn read_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawLedgerRecord> {
  Ok(RawLedgerRecord {
    id:             row.get(0)?,
    container_id:   row.get(1)?,
    analysis_date:  row.get(2)?,
    analysis_at:    row.get(3)?,
    window_start:   row.get(4)?,
    window_end:     row.get(5)?,
    total_messages: row.get(6)?,
    model:          row.get(7)?,
    raw_output:     row.get(8)?,
    status:         row.get(9)?,
    created_at:     row.get(10)?,
    updated_at:     row.get(11)?,
  })
}

fn read_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawLedgerItem> {
  Ok(RawLedgerItem {
    id:        row.get(0)?,
    record_id: row.get(1)?,
    category:  row.get(2)?,
    assignee:  row.get(3)?,
    task_text: row.get(4)?,
    position:  row.get(5)?,
  })
}

fn read_meeting(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawMeetingRecord> {
  Ok(RawMeetingRecord {
    id:           row.get(0)?,
    recorded_at:  row.get(1)?,
    transcript:   row.get(2)?,
    summary_text: row.get(3)?,
    participants: row.get(4)?,
    meeting_type: row.get(5)?,
    model:        row.get(6)?,
    created_at:   row.get(7)?,
  })
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Tally ledger store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── LedgerStore impl ────────────────────────────────────────────────────────

impl LedgerStore for SqliteStore {
  type Error = Error;

  async fn upsert(&self, record: NewLedgerRecord, ledger: TaskLedger) -> Result<i64> {
    let container_id   = record.window.container_id.clone();
    let date_str       = encode_date(record.window.analysis_date);
    let analysis_at    = encode_dt(record.analysis_at);
    let window_start   = encode_dt(record.window.start);
    let window_end     = encode_dt(record.window.end);
    let total_messages = record.total_messages;
    let model          = record.model;
    let raw_output     = record.raw_output;
    let status_str     = encode_status(record.status).to_owned();
    let now_str        = encode_dt(Utc::now());

    let items: Vec<(String, String, String, u32)> = ledger
      .rows()
      .into_iter()
      .map(|(category, assignee, position, task)| {
        (
          encode_category(category).to_owned(),
          assignee.to_owned(),
          task.to_owned(),
          position,
        )
      })
      .collect();

    let id: i64 = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        tx.execute(
          "INSERT INTO ledger_records (
             container_id, analysis_date, analysis_at,
             window_start, window_end, total_messages,
             model, raw_output, status, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
           ON CONFLICT (container_id, analysis_date) DO UPDATE SET
             analysis_at    = excluded.analysis_at,
             window_start   = excluded.window_start,
             window_end     = excluded.window_end,
             total_messages = excluded.total_messages,
             model          = excluded.model,
             raw_output     = excluded.raw_output,
             status         = excluded.status,
             updated_at     = excluded.updated_at",
          rusqlite::params![
            container_id,
            date_str,
            analysis_at,
            window_start,
            window_end,
            total_messages,
            model,
            raw_output,
            status_str,
            now_str,
            now_str,
          ],
        )?;

        let id: i64 = tx.query_row(
          "SELECT id FROM ledger_records
           WHERE container_id = ?1 AND analysis_date = ?2",
          rusqlite::params![container_id, date_str],
          |row| row.get(0),
        )?;

        // Replace, never merge: the new run's items are the whole truth.
        tx.execute(
          "DELETE FROM ledger_items WHERE record_id = ?1",
          rusqlite::params![id],
        )?;

        for (category, assignee, task_text, position) in &items {
          tx.execute(
            "INSERT INTO ledger_items (record_id, category, assignee, task_text, position)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![id, category, assignee, task_text, position],
          )?;
        }

        tx.commit()?;
        Ok(id)
      })
      .await?;

    Ok(id)
  }

  async fn latest(&self, container_id: Option<String>) -> Result<Option<LedgerSnapshot>> {
    let found: Option<(RawLedgerRecord, Vec<RawLedgerItem>)> = self
      .conn
      .call(move |conn| {
        let raw = if let Some(container) = container_id {
          conn
            .query_row(
              &format!(
                "SELECT {RECORD_COLUMNS} FROM ledger_records
                 WHERE container_id = ?1
                 ORDER BY analysis_date DESC, updated_at DESC
                 LIMIT 1"
              ),
              rusqlite::params![container],
              read_record,
            )
            .optional()?
        } else {
          conn
            .query_row(
              &format!(
                "SELECT {RECORD_COLUMNS} FROM ledger_records
                 ORDER BY analysis_date DESC, updated_at DESC
                 LIMIT 1"
              ),
              [],
              read_record,
            )
            .optional()?
        };

        let Some(raw) = raw else { return Ok(None) };

        let mut stmt = conn.prepare(
          "SELECT id, record_id, category, assignee, task_text, position
           FROM ledger_items
           WHERE record_id = ?1
           ORDER BY category, assignee, position",
        )?;
        let items = stmt
          .query_map(rusqlite::params![raw.id], read_item)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some((raw, items)))
      })
      .await?;

    let Some((raw, raw_items)) = found else { return Ok(None) };

    let record = raw.into_record()?;
    let mut ledger = TaskLedger::default();
    for raw_item in raw_items {
      let item = raw_item.into_item()?;
      ledger.push(item.category, item.assignee, item.task_text);
    }

    Ok(Some(LedgerSnapshot { record, ledger }))
  }

  async fn items_by_date(&self, date: NaiveDate) -> Result<Vec<LedgerItem>> {
    let date_str = encode_date(date);

    let raws: Vec<RawLedgerItem> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT i.id, i.record_id, i.category, i.assignee, i.task_text, i.position
           FROM ledger_items i
           JOIN ledger_records r ON r.id = i.record_id
           WHERE r.analysis_date = ?1
           ORDER BY i.category, i.assignee, i.position",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![date_str], read_item)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawLedgerItem::into_item).collect()
  }

  async fn workload(&self, since_days: u32) -> Result<Vec<WorkloadRow>> {
    let cutoff = Utc::now()
      .date_naive()
      .checked_sub_days(Days::new(since_days as u64))
      .unwrap_or(NaiveDate::MIN);
    let cutoff_str = encode_date(cutoff);

    let raws: Vec<(String, String, u32, u32, u32, u32)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT
             r.analysis_date,
             i.assignee,
             SUM(CASE WHEN i.category = 'pending'   THEN 1 ELSE 0 END),
             SUM(CASE WHEN i.category = 'completed' THEN 1 ELSE 0 END),
             SUM(CASE WHEN i.category = 'issue'     THEN 1 ELSE 0 END),
             COUNT(*)
           FROM ledger_items i
           JOIN ledger_records r ON r.id = i.record_id
           WHERE r.analysis_date >= ?1
           GROUP BY r.analysis_date, i.assignee
           ORDER BY r.analysis_date DESC, COUNT(*) DESC, i.assignee",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![cutoff_str], |row| {
            Ok((
              row.get(0)?,
              row.get(1)?,
              row.get(2)?,
              row.get(3)?,
              row.get(4)?,
              row.get(5)?,
            ))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(date, assignee, pending, completed, issues, total)| {
        Ok(WorkloadRow {
          analysis_date: decode_date(&date)?,
          assignee,
          pending,
          completed,
          issues,
          total,
        })
      })
      .collect::<Result<Vec<_>, Error>>()
  }

  async fn save_meeting(&self, record: NewMeetingRecord) -> Result<i64> {
    let recorded_at  = encode_dt(record.recorded_at);
    let participants = encode_names(&record.participants)?;
    let transcript   = record.transcript;
    let summary_text = record.summary_text;
    let meeting_type = record.meeting_type;
    let model        = record.model;
    let created_at   = encode_dt(Utc::now());

    let id: i64 = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO meeting_summaries (
             recorded_at, transcript, summary_text,
             participants, meeting_type, model, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            recorded_at,
            transcript,
            summary_text,
            participants,
            meeting_type,
            model,
            created_at,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(id)
  }

  async fn recent_meetings(&self, limit: u32) -> Result<Vec<MeetingRecord>> {
    let raws: Vec<RawMeetingRecord> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {MEETING_COLUMNS} FROM meeting_summaries
           ORDER BY recorded_at DESC, id DESC
           LIMIT ?1"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![limit], read_meeting)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMeetingRecord::into_record).collect()
  }
}
