use std::path::Path;

use chrono::{SecondsFormat, Utc};
use csidaq_wire::CsiFrame;
use rusqlite::{params, Connection};
use tracing::{debug, info, warn};

use crate::error::Result;

/// Capture table DDL. Column order mirrors the wire field order, with
/// the batch metadata columns first. Idempotent; the table is never
/// dropped or migrated.
const CSI_TABLE_DDL: &str = "\
CREATE TABLE IF NOT EXISTS csi_data (
    id                INTEGER PRIMARY KEY,
    timestamp         TEXT,
    scenario          TEXT,
    type              TEXT,
    seq               INTEGER,
    mac               TEXT,
    rssi              INTEGER,
    rate              REAL,
    sig_mode          INTEGER,
    mcs               INTEGER,
    bandwidth         INTEGER,
    smoothing         INTEGER,
    not_sounding      INTEGER,
    aggregation       INTEGER,
    stbc              INTEGER,
    fec_coding        INTEGER,
    sgi               INTEGER,
    noise_floor       INTEGER,
    ampdu_cnt         INTEGER,
    channel           INTEGER,
    secondary_channel INTEGER,
    local_timestamp   INTEGER,
    ant               INTEGER,
    sig_len           INTEGER,
    rx_state          INTEGER,
    len               INTEGER,
    first_word        INTEGER,
    data              TEXT
)";

const INSERT_SQL: &str = "\
INSERT INTO csi_data (
    timestamp, scenario, type, seq, mac, rssi, rate, sig_mode, mcs,
    bandwidth, smoothing, not_sounding, aggregation, stbc, fec_coding,
    sgi, noise_floor, ampdu_cnt, channel, secondary_channel,
    local_timestamp, ant, sig_len, rx_state, len, first_word, data
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
          ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27)";

/// Durable store for captured CSI frames.
pub struct CsiStore {
    conn: Connection,
}

impl CsiStore {
    /// Open (or create) a store at `path` and ensure the schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// In-memory store.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute(CSI_TABLE_DDL, [])?;
        Ok(Self { conn })
    }

    /// Persist a session's capture buffer as one batch.
    ///
    /// The buffer is drained up front and stays empty whether or not the
    /// write succeeds; a failed batch is not retriable. Records that do
    /// not parse as CSI frames are excluded without failing the batch.
    /// Every written row shares one capture timestamp, taken at the start
    /// of the call, plus the supplied scenario label. Returns the number
    /// of rows written.
    pub fn persist(&mut self, buffer: &mut Vec<String>, scenario: &str) -> Result<usize> {
        let raw_records = std::mem::take(buffer);
        let captured_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

        let mut frames = Vec::with_capacity(raw_records.len());
        for raw in &raw_records {
            match CsiFrame::parse(raw) {
                Ok(frame) => frames.push(frame),
                Err(err) => debug!(%err, "skipping malformed record"),
            }
        }
        let skipped = raw_records.len() - frames.len();
        if skipped > 0 {
            warn!(skipped, "malformed records excluded from batch");
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(INSERT_SQL)?;
            for frame in &frames {
                stmt.execute(params![
                    captured_at,
                    scenario,
                    frame.frame_type,
                    frame.seq,
                    frame.mac,
                    frame.rssi,
                    frame.rate,
                    frame.sig_mode,
                    frame.mcs,
                    frame.bandwidth,
                    frame.smoothing,
                    frame.not_sounding,
                    frame.aggregation,
                    frame.stbc,
                    frame.fec_coding,
                    frame.sgi,
                    frame.noise_floor,
                    frame.ampdu_cnt,
                    frame.channel,
                    frame.secondary_channel,
                    frame.local_timestamp,
                    frame.ant,
                    frame.sig_len,
                    frame.rx_state,
                    frame.len,
                    frame.first_word,
                    frame.data,
                ])?;
            }
        }
        tx.commit()?;

        info!(written = frames.len(), scenario, "capture batch committed");
        Ok(frames.len())
    }

    /// Number of rows currently in the capture table.
    pub fn row_count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM csi_data", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn well_formed(seq: u32, data: &str) -> String {
        format!(
            "CSI_DATA,{seq},AA:BB:CC:DD:EE:FF,-40,11.0,1,7,1,0,0,0,0,0,1,-92,3,6,1,123456789,0,100,0,128,1,{data}"
        )
    }

    #[test]
    fn schema_creation_is_idempotent() {
        let store = CsiStore::open_in_memory().expect("store should open");
        store
            .conn
            .execute(CSI_TABLE_DDL, [])
            .expect("re-running the DDL should be a no-op");
    }

    #[test]
    fn persists_only_well_formed_records() {
        let mut store = CsiStore::open_in_memory().expect("store should open");
        let mut buffer = vec![
            well_formed(1, "01 02"),
            "CSI_DATA,truncated".to_string(),
            well_formed(2, "03 04"),
            "noise".to_string(),
        ];

        let written = store
            .persist(&mut buffer, "walking")
            .expect("persist should succeed");
        assert_eq!(written, 2);
        assert!(buffer.is_empty(), "buffer must be drained by the attempt");
        assert_eq!(store.row_count().expect("count"), 2);
    }

    #[test]
    fn batch_shares_one_timestamp_and_scenario() {
        let mut store = CsiStore::open_in_memory().expect("store should open");
        let mut buffer = vec![well_formed(1, "a"), well_formed(2, "b")];
        store
            .persist(&mut buffer, "walking")
            .expect("persist should succeed");

        let mut stmt = store
            .conn
            .prepare("SELECT DISTINCT timestamp, scenario FROM csi_data")
            .expect("query should prepare");
        let rows: Vec<(String, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .expect("query should run")
            .collect::<rusqlite::Result<_>>()
            .expect("rows should decode");

        assert_eq!(rows.len(), 1, "one timestamp and scenario per batch");
        assert_eq!(rows[0].1, "walking");
    }

    #[test]
    fn quoted_data_field_is_stored_unquoted() {
        let mut store = CsiStore::open_in_memory().expect("store should open");
        let mut buffer = vec![well_formed(7, "\"01 02 03\"")];
        store
            .persist(&mut buffer, "walking")
            .expect("persist should succeed");

        let (seq, data): (u32, String) = store
            .conn
            .query_row("SELECT seq, data FROM csi_data", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .expect("row should exist");
        assert_eq!(seq, 7);
        assert_eq!(data, "01 02 03");
    }

    #[test]
    fn empty_buffer_writes_nothing() {
        let mut store = CsiStore::open_in_memory().expect("store should open");
        let mut buffer = Vec::new();
        let written = store
            .persist(&mut buffer, "idle")
            .expect("persist should succeed");
        assert_eq!(written, 0);
        assert_eq!(store.row_count().expect("count"), 0);
    }

    #[test]
    fn successive_batches_accumulate() {
        let mut store = CsiStore::open_in_memory().expect("store should open");
        let mut first = vec![well_formed(1, "a")];
        let mut second = vec![well_formed(2, "b")];
        store.persist(&mut first, "one").expect("persist");
        store.persist(&mut second, "two").expect("persist");
        assert_eq!(store.row_count().expect("count"), 2);
    }
}
