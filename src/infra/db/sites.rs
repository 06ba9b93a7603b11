use sqlx::query;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{RepoError, SiteDomainParams, SitesRepo, UpsertSiteParams};
use crate::domain::entities::SiteRecord;
use crate::domain::types::{SiteKind, SiteStatus, TlsStatus};

use super::{PostgresRepositories, map_sqlx_error};

const SITE_COLUMNS: &str = "site_id, project_id, agency_id, lead_id, user_id, business_name, \
    site_kind, default_url, status, last_deployed_at, current_version_id, current_release_id, \
    custom_domain, connection_id, tls_status, error_message, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct SiteRow {
    site_id: String,
    project_id: String,
    agency_id: String,
    lead_id: String,
    user_id: String,
    business_name: String,
    site_kind: SiteKind,
    default_url: String,
    status: SiteStatus,
    last_deployed_at: Option<OffsetDateTime>,
    current_version_id: Option<String>,
    current_release_id: Option<String>,
    custom_domain: Option<String>,
    connection_id: Option<Uuid>,
    tls_status: Option<TlsStatus>,
    error_message: Option<String>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<SiteRow> for SiteRecord {
    fn from(row: SiteRow) -> Self {
        SiteRecord {
            site_id: row.site_id,
            project_id: row.project_id,
            agency_id: row.agency_id,
            lead_id: row.lead_id,
            user_id: row.user_id,
            business_name: row.business_name,
            site_kind: row.site_kind,
            default_url: row.default_url,
            status: row.status,
            last_deployed_at: row.last_deployed_at,
            current_version_id: row.current_version_id,
            current_release_id: row.current_release_id,
            custom_domain: row.custom_domain,
            connection_id: row.connection_id,
            tls_status: row.tls_status,
            error_message: row.error_message,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait::async_trait]
impl SitesRepo for PostgresRepositories {
    async fn find_site(&self, site_id: &str) -> Result<Option<SiteRecord>, RepoError> {
        let sql = format!("SELECT {SITE_COLUMNS} FROM sites WHERE site_id = $1");
        let row = sqlx::query_as::<_, SiteRow>(&sql)
            .bind(site_id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(SiteRecord::from))
    }

    async fn upsert_site(&self, params: UpsertSiteParams) -> Result<SiteRecord, RepoError> {
        let sql = format!(
            r#"
            INSERT INTO sites (site_id, project_id, agency_id, lead_id, user_id, business_name, site_kind, default_url, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'creating', $9, $9)
            ON CONFLICT (site_id) DO UPDATE SET
                project_id = EXCLUDED.project_id,
                agency_id = EXCLUDED.agency_id,
                lead_id = EXCLUDED.lead_id,
                user_id = EXCLUDED.user_id,
                business_name = EXCLUDED.business_name,
                default_url = EXCLUDED.default_url,
                updated_at = EXCLUDED.updated_at
            RETURNING {SITE_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, SiteRow>(&sql)
            .bind(&params.site_id)
            .bind(&params.project_id)
            .bind(&params.agency_id)
            .bind(&params.lead_id)
            .bind(&params.user_id)
            .bind(&params.business_name)
            .bind(params.site_kind)
            .bind(&params.default_url)
            .bind(OffsetDateTime::now_utc())
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_site_status(
        &self,
        site_id: &str,
        status: SiteStatus,
        error_message: Option<String>,
    ) -> Result<(), RepoError> {
        let result = query(
            r#"
            UPDATE sites
            SET status = $2, error_message = $3, updated_at = $4
            WHERE site_id = $1
            "#,
        )
        .bind(site_id)
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

    async fn record_release(
        &self,
        site_id: &str,
        version_id: &str,
        release_id: &str,
        deployed_at: OffsetDateTime,
    ) -> Result<(), RepoError> {
        let result = query(
            r#"
            UPDATE sites
            SET status = 'active',
                current_version_id = $2,
                current_release_id = $3,
                last_deployed_at = $4,
                error_message = NULL,
                updated_at = $4
            WHERE site_id = $1
            "#,
        )
        .bind(site_id)
        .bind(version_id)
        .bind(release_id)
        .bind(deployed_at)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn attach_domain(&self, params: SiteDomainParams) -> Result<(), RepoError> {
        let result = query(
            r#"
            UPDATE sites
            SET custom_domain = $2,
                connection_id = $3,
                tls_status = $4,
                status = $5,
                updated_at = $6
            WHERE site_id = $1
            "#,
        )
        .bind(&params.site_id)
        .bind(&params.custom_domain)
        .bind(params.connection_id)
        .bind(params.tls_status)
        .bind(params.status)
        .bind(OffsetDateTime::now_utc())
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn detach_domain(&self, site_id: &str) -> Result<(), RepoError> {
        query(
            r#"
            UPDATE sites
            SET custom_domain = NULL,
                connection_id = NULL,
                tls_status = NULL,
                status = 'active',
                updated_at = $2
            WHERE site_id = $1
            "#,
        )
        .bind(site_id)
        .bind(OffsetDateTime::now_utc())
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }
}
