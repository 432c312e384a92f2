use std::path::PathBuf;

use serde_json::{from_str, to_string};
use sqlx::{Pool, Sqlite, SqlitePool, sqlite::SqliteConnectOptions};

use crate::{
    Error, Result,
    models::{LastPlayedTrack, Track},
};

pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Opens the database at `path`, or at the platform data directory when
    /// no path is given.
    pub async fn new(path: Option<PathBuf>) -> Result<Self> {
        let database_url = match path {
            Some(path) => path,
            None => {
                let Some(mut url) = dirs::data_local_dir() else {
                    return Err(Error::DatabaseLocationError);
                };
                url.push("swing-player");

                if !url.exists() {
                    let Ok(_) = std::fs::create_dir_all(&url) else {
                        return Err(Error::DatabaseLocationError);
                    };
                }

                url.push("data.db");

                url
            }
        };

        tracing::debug!("Opening database at {}", database_url.display());

        let options = SqliteConnectOptions::new()
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .filename(database_url)
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options).await?;

        Database::init(pool).await
    }

    #[cfg(test)]
    pub(crate) async fn in_memory() -> Result<Self> {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        Database::init(pool).await
    }

    async fn init(pool: Pool<Sqlite>) -> Result<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;

        create_configuration(&pool).await?;

        Ok(Self { pool })
    }

    pub async fn set_base_url(&self, base_url: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE configuration
            SET base_url=?1
            WHERE ROWID = 1
            "#,
        )
        .bind(base_url)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn set_access_token(&self, access_token: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE configuration
            SET access_token=?1
            WHERE ROWID = 1
            "#,
        )
        .bind(access_token)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_configuration(&self) -> Result<DatabaseConfiguration> {
        Ok(sqlx::query_as::<_, DatabaseConfiguration>(
            r#"
            SELECT base_url, access_token FROM configuration
            WHERE ROWID = 1;
            "#,
        )
        .fetch_one(&self.pool)
        .await?)
    }

    pub async fn set_queue(&self, tracks: &[Track]) -> Result<()> {
        let serialized = to_string(tracks)?;

        let mut transaction = self.pool.begin().await?;

        sqlx::query("DELETE FROM queue")
            .execute(&mut *transaction)
            .await?;

        sqlx::query("INSERT INTO queue (tracks) VALUES (?1)")
            .bind(serialized)
            .execute(&mut *transaction)
            .await?;

        transaction.commit().await?;

        Ok(())
    }

    /// The saved queue in natural order. Empty when nothing was saved.
    pub async fn get_queue(&self) -> Result<Vec<Track>> {
        let row = sqlx::query_as::<_, QueueDb>("SELECT tracks FROM queue")
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(from_str(&row.tracks)?),
            None => Ok(Vec::new()),
        }
    }

    pub async fn clear_queue(&self) -> Result<()> {
        sqlx::query("DELETE FROM queue").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn set_last_played(&self, last_played: &LastPlayedTrack) -> Result<()> {
        let mut transaction = self.pool.begin().await?;

        sqlx::query("DELETE FROM last_played")
            .execute(&mut *transaction)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO last_played (track_hash, index_in_queue, last_play_position_ms)
            VALUES (?1, ?2, ?3);
            "#,
        )
        .bind(&last_played.track_hash)
        .bind(last_played.index_in_queue as i64)
        .bind(last_played.last_play_position_ms as i64)
        .execute(&mut *transaction)
        .await?;

        transaction.commit().await?;

        Ok(())
    }

    pub async fn get_last_played(&self) -> Result<Option<LastPlayedTrack>> {
        let row = sqlx::query_as::<_, LastPlayedDb>(
            "SELECT track_hash, index_in_queue, last_play_position_ms FROM last_played",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| LastPlayedTrack {
            track_hash: row.track_hash,
            index_in_queue: row.index_in_queue.max(0) as usize,
            last_play_position_ms: row.last_play_position_ms.max(0) as u64,
        }))
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct DatabaseConfiguration {
    pub base_url: Option<String>,
    pub access_token: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct QueueDb {
    tracks: String,
}

#[derive(Debug, sqlx::FromRow)]
struct LastPlayedDb {
    track_hash: String,
    index_in_queue: i64,
    last_play_position_ms: i64,
}

async fn create_configuration(pool: &Pool<Sqlite>) -> Result<()> {
    let rowid = 1;
    sqlx::query(
        r#"
            INSERT OR IGNORE INTO configuration (ROWID) VALUES (?1);
            "#,
    )
    .bind(rowid)
    .execute(pool)
    .await?;
    Ok(())
}
