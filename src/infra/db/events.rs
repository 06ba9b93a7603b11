use sqlx::types::Json;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{CreateConnectionEventParams, EventsRepo, RepoError};
use crate::domain::entities::ConnectionEventRecord;
use crate::domain::types::ConnectionEventKind;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(Debug, sqlx::FromRow)]
struct ConnectionEventRow {
    id: Uuid,
    connection_id: Uuid,
    site_id: String,
    kind: String,
    payload: Json<serde_json::Value>,
    created_at: OffsetDateTime,
}

impl TryFrom<ConnectionEventRow> for ConnectionEventRecord {
    type Error = RepoError;

    fn try_from(row: ConnectionEventRow) -> Result<Self, Self::Error> {
        let kind = ConnectionEventKind::parse(&row.kind).ok_or_else(|| RepoError::Integrity {
            message: format!("unknown connection event kind `{}`", row.kind),
        })?;

        Ok(ConnectionEventRecord {
            id: row.id,
            connection_id: row.connection_id,
            site_id: row.site_id,
            kind,
            payload: row.payload.0,
            created_at: row.created_at,
        })
    }
}

#[async_trait::async_trait]
impl EventsRepo for PostgresRepositories {
    async fn append_event(&self, params: CreateConnectionEventParams) -> Result<bool, RepoError> {
        let result = sqlx::query(
            r#"
            INSERT INTO connection_events (id, connection_id, site_id, kind, payload, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(params.connection_id)
        .bind(&params.site_id)
        .bind(params.kind.as_str())
        .bind(Json(&params.payload))
        .bind(OffsetDateTime::now_utc())
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_events(
        &self,
        connection_id: Uuid,
    ) -> Result<Vec<ConnectionEventRecord>, RepoError> {
        let rows = sqlx::query_as::<_, ConnectionEventRow>(
            r#"
            SELECT id, connection_id, site_id, kind, payload, created_at
            FROM connection_events
            WHERE connection_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(connection_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(ConnectionEventRecord::try_from)
            .collect()
    }
}
