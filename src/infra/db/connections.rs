use sqlx::{query, types::Json};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{ConnectionsRepo, CreateConnectionParams, RepoError};
use crate::domain::entities::ConnectionRecord;
use crate::domain::types::{ConnectionMethod, ConnectionStatus};
use siteline_api_types::DnsRecord;

use super::{PostgresRepositories, map_sqlx_error, util::clamp_limit};

const CONNECTION_COLUMNS: &str = "id, domain, site_id, project_id, agency_id, lead_id, user_id, \
    method, status, dns_records, host_state, ownership_state, cert_state, verification_token, \
    dns_attempts, ssl_attempts, poll_count, error_message, last_checked_at, next_check_at, \
    connected_at, disconnected_at, created_at, updated_at";

const INACTIVE_STATUSES: &str = "('error', 'verification_failed', 'disconnected')";

#[derive(Debug, sqlx::FromRow)]
struct ConnectionRow {
    id: Uuid,
    domain: Option<String>,
    site_id: String,
    project_id: String,
    agency_id: String,
    lead_id: String,
    user_id: String,
    method: ConnectionMethod,
    status: ConnectionStatus,
    dns_records: Json<Vec<DnsRecord>>,
    host_state: Option<String>,
    ownership_state: Option<String>,
    cert_state: Option<String>,
    verification_token: Option<String>,
    dns_attempts: i32,
    ssl_attempts: i32,
    poll_count: i32,
    error_message: Option<String>,
    last_checked_at: Option<OffsetDateTime>,
    next_check_at: Option<OffsetDateTime>,
    connected_at: Option<OffsetDateTime>,
    disconnected_at: Option<OffsetDateTime>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<ConnectionRow> for ConnectionRecord {
    fn from(row: ConnectionRow) -> Self {
        ConnectionRecord {
            id: row.id,
            domain: row.domain,
            site_id: row.site_id,
            project_id: row.project_id,
            agency_id: row.agency_id,
            lead_id: row.lead_id,
            user_id: row.user_id,
            method: row.method,
            status: row.status,
            dns_records: row.dns_records.0,
            host_state: row.host_state,
            ownership_state: row.ownership_state,
            cert_state: row.cert_state,
            verification_token: row.verification_token,
            dns_attempts: row.dns_attempts,
            ssl_attempts: row.ssl_attempts,
            poll_count: row.poll_count,
            error_message: row.error_message,
            last_checked_at: row.last_checked_at,
            next_check_at: row.next_check_at,
            connected_at: row.connected_at,
            disconnected_at: row.disconnected_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait::async_trait]
impl ConnectionsRepo for PostgresRepositories {
    async fn find_connection(&self, id: Uuid) -> Result<Option<ConnectionRecord>, RepoError> {
        let sql = format!("SELECT {CONNECTION_COLUMNS} FROM domain_connections WHERE id = $1");
        let row = sqlx::query_as::<_, ConnectionRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(ConnectionRecord::from))
    }

    async fn find_active_by_domain(
        &self,
        domain: &str,
    ) -> Result<Option<ConnectionRecord>, RepoError> {
        let sql = format!(
            "SELECT {CONNECTION_COLUMNS} FROM domain_connections \
             WHERE domain = $1 AND status NOT IN {INACTIVE_STATUSES} \
             ORDER BY created_at DESC LIMIT 1"
        );
        let row = sqlx::query_as::<_, ConnectionRow>(&sql)
            .bind(domain)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(ConnectionRecord::from))
    }

    async fn create_connection(
        &self,
        params: CreateConnectionParams,
    ) -> Result<ConnectionRecord, RepoError> {
        let sql = format!(
            r#"
            INSERT INTO domain_connections (id, domain, site_id, project_id, agency_id, lead_id, user_id, method, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'creating_site', $9, $9)
            RETURNING {CONNECTION_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, ConnectionRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(&params.domain)
            .bind(&params.site_id)
            .bind(&params.project_id)
            .bind(&params.agency_id)
            .bind(&params.lead_id)
            .bind(&params.user_id)
            .bind(params.method)
            .bind(OffsetDateTime::now_utc())
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_connection_status(
        &self,
        id: Uuid,
        status: ConnectionStatus,
        error_message: Option<String>,
    ) -> Result<(), RepoError> {
        let result = query(
            r#"
            UPDATE domain_connections
            SET status = $2, error_message = $3, updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(error_message)
        .bind(OffsetDateTime::now_utc())
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn save_connection(&self, record: &ConnectionRecord) -> Result<(), RepoError> {
        let result = query(
            r#"
            UPDATE domain_connections
            SET site_id = $2,
                status = $3,
                dns_records = $4,
                host_state = $5,
                ownership_state = $6,
                cert_state = $7,
                verification_token = $8,
                dns_attempts = $9,
                ssl_attempts = $10,
                poll_count = $11,
                error_message = $12,
                last_checked_at = $13,
                next_check_at = $14,
                updated_at = $15
            WHERE id = $1
            "#,
        )
        .bind(record.id)
        .bind(&record.site_id)
        .bind(record.status)
        .bind(Json(&record.dns_records))
        .bind(&record.host_state)
        .bind(&record.ownership_state)
        .bind(&record.cert_state)
        .bind(&record.verification_token)
        .bind(record.dns_attempts)
        .bind(record.ssl_attempts)
        .bind(record.poll_count)
        .bind(&record.error_message)
        .bind(record.last_checked_at)
        .bind(record.next_check_at)
        .bind(OffsetDateTime::now_utc())
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn mark_connected(&self, id: Uuid, at: OffsetDateTime) -> Result<bool, RepoError> {
        let result = query(
            r#"
            UPDATE domain_connections
            SET status = 'connected', connected_at = $2, error_message = NULL, updated_at = $2
            WHERE id = $1 AND connected_at IS NULL
            "#,
        )
        .bind(id)
        .bind(at)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_disconnected(&self, id: Uuid, at: OffsetDateTime) -> Result<(), RepoError> {
        let result = query(
            r#"
            UPDATE domain_connections
            SET status = 'disconnected', disconnected_at = $2, next_check_at = NULL, updated_at = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(at)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn list_by_status(
        &self,
        statuses: &[ConnectionStatus],
        limit: u32,
    ) -> Result<Vec<ConnectionRecord>, RepoError> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        let names: Vec<String> = statuses
            .iter()
            .map(|status| status.as_str().to_string())
            .collect();
        let sql = format!(
            "SELECT {CONNECTION_COLUMNS} FROM domain_connections \
             WHERE status::text = ANY($1) \
             ORDER BY last_checked_at ASC NULLS FIRST, created_at ASC \
             LIMIT $2"
        );

        let rows = sqlx::query_as::<_, ConnectionRow>(&sql)
            .bind(&names)
            .bind(clamp_limit(limit))
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ConnectionRecord::from).collect())
    }
}
