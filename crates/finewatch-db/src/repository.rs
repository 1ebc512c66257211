use chrono::NaiveDate;
use finewatch_core::error::AppError;
use finewatch_core::models::{ActionType, EnforcementRecord};
use finewatch_core::traits::{RecordStore, RecordTransaction};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};

const SELECT_COLUMNS: &str = "SELECT url, pdf_id, pdf_url, action_type, date, title, description, \
     abbreviated_description, penalty_amount, tweet_sent FROM enforcement_records";

// `tweet_sent` only ever moves from false to true.
const UPSERT: &str = r#"
    INSERT INTO enforcement_records
        (url, pdf_id, pdf_url, action_type, date, title, description,
         abbreviated_description, penalty_amount, tweet_sent)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
    ON CONFLICT(url) DO UPDATE SET
        pdf_id = excluded.pdf_id,
        pdf_url = excluded.pdf_url,
        action_type = excluded.action_type,
        date = excluded.date,
        title = excluded.title,
        description = excluded.description,
        abbreviated_description = excluded.abbreviated_description,
        penalty_amount = excluded.penalty_amount,
        tweet_sent = MAX(enforcement_records.tweet_sent, excluded.tweet_sent)
"#;

/// Repository for enforcement records in SQLite.
#[derive(Clone)]
pub struct RecordRepository {
    pool: SqlitePool,
}

impl RecordRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a transaction for a batch of writes.
    pub async fn begin(&self) -> Result<SqliteRecordTransaction, AppError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        Ok(SqliteRecordTransaction { tx })
    }

    /// Records not yet delivered, oldest first. Undated records sort first.
    pub async fn find_unsent(&self) -> Result<Vec<EnforcementRecord>, AppError> {
        let rows = sqlx::query_as::<_, RecordRow>(&format!(
            "{SELECT_COLUMNS} WHERE tweet_sent = 0 ORDER BY date ASC, url ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(EnforcementRecord::try_from).collect()
    }

    pub async fn find_one(&self, url: &str) -> Result<Option<EnforcementRecord>, AppError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        fetch_one_by_url(&mut conn, url).await
    }
}

/// An open SQLite transaction. Dropped without commit, it rolls back.
pub struct SqliteRecordTransaction {
    tx: Transaction<'static, Sqlite>,
}

impl SqliteRecordTransaction {
    pub async fn find_one(&mut self, url: &str) -> Result<Option<EnforcementRecord>, AppError> {
        fetch_one_by_url(&mut self.tx, url).await
    }

    pub async fn upsert(&mut self, record: &EnforcementRecord) -> Result<(), AppError> {
        sqlx::query(UPSERT)
            .bind(&record.url)
            .bind(&record.pdf_id)
            .bind(&record.pdf_url)
            .bind(record.action_type.as_ref().map(ActionType::as_str))
            .bind(record.date)
            .bind(&record.title)
            .bind(&record.description)
            .bind(&record.abbreviated_description)
            .bind(&record.penalty_amount)
            .bind(record.tweet_sent)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        Ok(())
    }

    pub async fn commit(self) -> Result<(), AppError> {
        self.tx
            .commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Commit failed: {e}")))
    }

    pub async fn rollback(self) -> Result<(), AppError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Rollback failed: {e}")))
    }
}

async fn fetch_one_by_url(
    conn: &mut SqliteConnection,
    url: &str,
) -> Result<Option<EnforcementRecord>, AppError> {
    let row = sqlx::query_as::<_, RecordRow>(&format!("{SELECT_COLUMNS} WHERE url = ?1"))
        .bind(url)
        .fetch_optional(conn)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

    row.map(EnforcementRecord::try_from).transpose()
}

// -- Internal row type for sqlx deserialization --

#[derive(sqlx::FromRow)]
struct RecordRow {
    url: String,
    pdf_id: Option<String>,
    pdf_url: Option<String>,
    action_type: Option<String>,
    date: Option<NaiveDate>,
    title: Option<String>,
    description: String,
    abbreviated_description: String,
    penalty_amount: Option<String>,
    tweet_sent: bool,
}

impl TryFrom<RecordRow> for EnforcementRecord {
    type Error = AppError;

    fn try_from(row: RecordRow) -> Result<Self, AppError> {
        let action_type = row
            .action_type
            .as_deref()
            .map(str::parse::<ActionType>)
            .transpose()
            .map_err(|e| {
                AppError::DatabaseError(format!("Corrupt action_type for {}: {e}", row.url))
            })?;

        Ok(EnforcementRecord {
            url: row.url,
            pdf_id: row.pdf_id,
            pdf_url: row.pdf_url,
            action_type,
            date: row.date,
            title: row.title,
            description: row.description,
            abbreviated_description: row.abbreviated_description,
            penalty_amount: row.penalty_amount,
            tweet_sent: row.tweet_sent,
        })
    }
}

// -- Trait implementation --

impl RecordStore for RecordRepository {
    type Tx = SqliteRecordTransaction;

    async fn begin(&self) -> Result<SqliteRecordTransaction, AppError> {
        RecordRepository::begin(self).await
    }

    async fn find_unsent(&self) -> Result<Vec<EnforcementRecord>, AppError> {
        RecordRepository::find_unsent(self).await
    }

    async fn find_one(&self, url: &str) -> Result<Option<EnforcementRecord>, AppError> {
        RecordRepository::find_one(self, url).await
    }
}

impl RecordTransaction for SqliteRecordTransaction {
    async fn find_one(&mut self, url: &str) -> Result<Option<EnforcementRecord>, AppError> {
        SqliteRecordTransaction::find_one(self, url).await
    }

    async fn upsert(&mut self, record: &EnforcementRecord) -> Result<(), AppError> {
        SqliteRecordTransaction::upsert(self, record).await
    }

    async fn commit(self) -> Result<(), AppError> {
        SqliteRecordTransaction::commit(self).await
    }

    async fn rollback(self) -> Result<(), AppError> {
        SqliteRecordTransaction::rollback(self).await
    }
}
