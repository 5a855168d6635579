use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct StoredRecordRow {
    pub record_key: String,
    pub payload: String,
    pub updated_at: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct SyncLockRow {
    pub name: String,
    pub holder: String,
    pub expires_at: i64,
}
