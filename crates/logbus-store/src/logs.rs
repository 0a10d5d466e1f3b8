use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use crate::error::Result;
use crate::types::{LogRecord, Principal};

/// Lookup interface the delivery path consumes.
///
/// Visibility is the store's responsibility: a record the principal may not
/// see is simply absent from the result, indistinguishable from a record
/// that does not exist. The broker never re-checks authorization.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// All records with this id visible to `principal`: zero or one in
    /// practice, but the contract allows more.
    async fn find_by_id(&self, id: i64, principal: &Principal) -> Result<Vec<LogRecord>>;
}

/// `logs`-table store. Admins see every record; everyone else only records
/// whose object they own.
pub struct PgLogStore {
    pool: PgPool,
}

impl PgLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LogStore for PgLogStore {
    #[instrument(skip(self, principal), fields(user = %principal.uuid))]
    async fn find_by_id(&self, id: i64, principal: &Principal) -> Result<Vec<LogRecord>> {
        let records = sqlx::query_as::<_, LogRecord>(
            "SELECT id, uuid, object_uuid, object_owner_uuid, event_type,
                    summary, properties, event_at, created_at, updated_at
             FROM logs
             WHERE id = $1
               AND ($2 OR object_owner_uuid = $3)",
        )
        .bind(id)
        .bind(principal.is_admin)
        .bind(&principal.uuid)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
