//! SQLite reader for the legacy `authoring` table.
//!
//! The table may have been dropped in some deployments. Its presence is probed
//! once by [`SqliteLegacyAuthoringRepository::open`]; an unavailable source
//! answers every read with an empty list instead of querying.

use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, warn};

use crate::adapters::sqlite::{distinct_ids, ID_CHUNK_SIZE};
use crate::domain::errors::DomainResult;
use crate::domain::models::{LegacyAuthoringRecord, LegacyAvailability, SongId};
use crate::domain::ports::LegacyAuthoringSource;

const SELECT_COLUMNS: &str = "SELECT song_id, demucs, midi, tempo_map, fake_ending, drums, bass, guitar, vocals, \
     harmonies, pro_keys, keys, animations, drum_fills, overdrive, compile FROM authoring";

#[derive(Clone)]
pub struct SqliteLegacyAuthoringRepository {
    pool: SqlitePool,
    availability: LegacyAvailability,
}

impl SqliteLegacyAuthoringRepository {
    pub fn new(pool: SqlitePool, availability: LegacyAvailability) -> Self {
        Self { pool, availability }
    }

    /// Probe for the legacy table and build a source bound to the result.
    ///
    /// A failed probe is treated as unavailable.
    pub async fn open(pool: SqlitePool) -> Self {
        let availability = match probe_legacy_table(&pool).await {
            Ok(true) => LegacyAvailability::Available,
            Ok(false) => {
                debug!("legacy authoring table not present");
                LegacyAvailability::Unavailable
            }
            Err(e) => {
                warn!(error = %e, "legacy authoring probe failed; legacy fallback disabled");
                LegacyAvailability::Unavailable
            }
        };
        Self::new(pool, availability)
    }
}

async fn probe_legacy_table(pool: &SqlitePool) -> Result<bool, sqlx::Error> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'authoring'")
            .fetch_one(pool)
            .await?;
    Ok(count > 0)
}

#[async_trait]
impl LegacyAuthoringSource for SqliteLegacyAuthoringRepository {
    fn availability(&self) -> LegacyAvailability {
        self.availability
    }

    async fn records_for_songs(&self, song_ids: &[SongId]) -> DomainResult<Vec<LegacyAuthoringRecord>> {
        if !self.availability.is_available() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for chunk in distinct_ids(song_ids).chunks(ID_CHUNK_SIZE) {
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_COLUMNS);
            builder.push(" WHERE song_id IN (");
            let mut separated = builder.separated(", ");
            for id in chunk {
                separated.push_bind(*id);
            }
            separated.push_unseparated(")");

            let rows: Vec<AuthoringRow> = builder.build_query_as().fetch_all(&self.pool).await?;
            records.extend(rows.into_iter().map(LegacyAuthoringRecord::from));
        }

        Ok(records)
    }

    async fn records_after(&self, after_song_id: SongId, limit: usize) -> DomainResult<Vec<LegacyAuthoringRecord>> {
        if !self.availability.is_available() {
            return Ok(Vec::new());
        }

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let sql = format!("{SELECT_COLUMNS} WHERE song_id > ? ORDER BY song_id LIMIT ?");
        let rows: Vec<AuthoringRow> = sqlx::query_as(&sql)
            .bind(after_song_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(LegacyAuthoringRecord::from).collect())
    }
}

/// Legacy columns are nullable; NULL reads as not done.
#[derive(sqlx::FromRow)]
struct AuthoringRow {
    song_id: i64,
    demucs: Option<bool>,
    midi: Option<bool>,
    tempo_map: Option<bool>,
    fake_ending: Option<bool>,
    drums: Option<bool>,
    bass: Option<bool>,
    guitar: Option<bool>,
    vocals: Option<bool>,
    harmonies: Option<bool>,
    pro_keys: Option<bool>,
    keys: Option<bool>,
    animations: Option<bool>,
    drum_fills: Option<bool>,
    overdrive: Option<bool>,
    compile: Option<bool>,
}

impl From<AuthoringRow> for LegacyAuthoringRecord {
    fn from(row: AuthoringRow) -> Self {
        Self {
            song_id: row.song_id,
            demucs: row.demucs.unwrap_or(false),
            midi: row.midi.unwrap_or(false),
            tempo_map: row.tempo_map.unwrap_or(false),
            fake_ending: row.fake_ending.unwrap_or(false),
            drums: row.drums.unwrap_or(false),
            bass: row.bass.unwrap_or(false),
            guitar: row.guitar.unwrap_or(false),
            vocals: row.vocals.unwrap_or(false),
            harmonies: row.harmonies.unwrap_or(false),
            pro_keys: row.pro_keys.unwrap_or(false),
            keys: row.keys.unwrap_or(false),
            animations: row.animations.unwrap_or(false),
            drum_fills: row.drum_fills.unwrap_or(false),
            overdrive: row.overdrive.unwrap_or(false),
            compile: row.compile.unwrap_or(false),
        }
    }
}
