use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Row};

use partflow_core::domain::request::{
    ModificationRequest, RequestId, RequestPayload, RequestStatus, ReturnedBy, ValidationStatus,
};
use partflow_core::workflow::views::{category_matches, RoleView, SortKey, StatusFilter};

use super::{RepositoryError, RequestRepository};
use crate::DbPool;

#[derive(Clone)]
pub struct SqlRequestRepository {
    pool: DbPool,
}

impl SqlRequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const COLUMNS: &str = "id, plant, part_code, description, hsn_code, from_state_to_state, \
     tax, sales_views, supplying_plant, receiving_plant, tax_indication, procurement_type, \
     storage_location, production_version, quality_management, \
     status, validation_status, remarks, validator_remarks, last_returned_by_role, \
     created_by, approved_by, rejected_by, validated_by, \
     created_at, submitted_at, last_modified_at, approved_at, rejected_at, validated_at";

fn decode<T>(result: Result<T, sqlx::Error>) -> Result<T, RepositoryError> {
    result.map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn parse_ts(column: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("bad timestamp in `{column}`: {e}")))
}

fn parse_opt_ts(
    column: &str,
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    value.map(|v| parse_ts(column, &v)).transpose()
}

fn row_to_request(row: &sqlx::sqlite::SqliteRow) -> Result<ModificationRequest, RepositoryError> {
    let id: String = decode(row.try_get("id"))?;

    let payload = RequestPayload {
        plant: decode(row.try_get("plant"))?,
        part_code: decode(row.try_get("part_code"))?,
        description: decode(row.try_get("description"))?,
        hsn_code: decode(row.try_get("hsn_code"))?,
        from_state_to_state: decode(row.try_get("from_state_to_state"))?,
        tax: decode(row.try_get("tax"))?,
        sales_views: decode(row.try_get("sales_views"))?,
        supplying_plant: decode(row.try_get("supplying_plant"))?,
        receiving_plant: decode(row.try_get("receiving_plant"))?,
        tax_indication: decode(row.try_get("tax_indication"))?,
        procurement_type: decode(row.try_get("procurement_type"))?,
        storage_location: decode(row.try_get("storage_location"))?,
        production_version: decode(row.try_get("production_version"))?,
        quality_management: decode(row.try_get("quality_management"))?,
    };

    let status_str: String = decode(row.try_get("status"))?;
    let status = RequestStatus::parse(&status_str)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown status `{status_str}`")))?;

    let validation_status_str: Option<String> = decode(row.try_get("validation_status"))?;
    let validation_status = validation_status_str
        .map(|v| {
            ValidationStatus::parse(&v)
                .ok_or_else(|| RepositoryError::Decode(format!("unknown validation status `{v}`")))
        })
        .transpose()?;

    let returned_by_str: Option<String> = decode(row.try_get("last_returned_by_role"))?;
    let last_returned_by_role = returned_by_str
        .map(|v| {
            ReturnedBy::parse(&v)
                .ok_or_else(|| RepositoryError::Decode(format!("unknown returning role `{v}`")))
        })
        .transpose()?;

    let created_at_str: String = decode(row.try_get("created_at"))?;
    let submitted_at_str: String = decode(row.try_get("submitted_at"))?;
    let last_modified_at_str: String = decode(row.try_get("last_modified_at"))?;

    Ok(ModificationRequest {
        id: RequestId(id),
        payload,
        status,
        validation_status,
        remarks: decode(row.try_get("remarks"))?,
        validator_remarks: decode(row.try_get("validator_remarks"))?,
        last_returned_by_role,
        created_by: decode(row.try_get("created_by"))?,
        approved_by: decode(row.try_get("approved_by"))?,
        rejected_by: decode(row.try_get("rejected_by"))?,
        validated_by: decode(row.try_get("validated_by"))?,
        created_at: parse_ts("created_at", &created_at_str)?,
        submitted_at: parse_ts("submitted_at", &submitted_at_str)?,
        last_modified_at: parse_ts("last_modified_at", &last_modified_at_str)?,
        approved_at: parse_opt_ts("approved_at", decode(row.try_get("approved_at"))?)?,
        rejected_at: parse_opt_ts("rejected_at", decode(row.try_get("rejected_at"))?)?,
        validated_at: parse_opt_ts("validated_at", decode(row.try_get("validated_at"))?)?,
    })
}

fn sort_column(key: SortKey) -> &'static str {
    match key {
        SortKey::CreatedAt => "created_at",
        SortKey::SubmittedAt => "submitted_at",
        SortKey::LastModifiedAt => "last_modified_at",
    }
}

#[async_trait::async_trait]
impl RequestRepository for SqlRequestRepository {
    async fn insert(&self, request: ModificationRequest) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO modification_request (id, plant, part_code, description, hsn_code, \
                 from_state_to_state, tax, sales_views, supplying_plant, receiving_plant, \
                 tax_indication, procurement_type, storage_location, production_version, \
                 quality_management, status, validation_status, remarks, validator_remarks, \
                 last_returned_by_role, created_by, approved_by, rejected_by, validated_by, \
                 created_at, submitted_at, last_modified_at, approved_at, rejected_at, validated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.id.0)
        .bind(&request.payload.plant)
        .bind(&request.payload.part_code)
        .bind(&request.payload.description)
        .bind(&request.payload.hsn_code)
        .bind(&request.payload.from_state_to_state)
        .bind(&request.payload.tax)
        .bind(&request.payload.sales_views)
        .bind(&request.payload.supplying_plant)
        .bind(&request.payload.receiving_plant)
        .bind(&request.payload.tax_indication)
        .bind(&request.payload.procurement_type)
        .bind(&request.payload.storage_location)
        .bind(&request.payload.production_version)
        .bind(&request.payload.quality_management)
        .bind(request.status.as_str())
        .bind(request.validation_status.map(|v| v.as_str()))
        .bind(&request.remarks)
        .bind(&request.validator_remarks)
        .bind(request.last_returned_by_role.map(|r| r.as_str()))
        .bind(&request.created_by)
        .bind(&request.approved_by)
        .bind(&request.rejected_by)
        .bind(&request.validated_by)
        .bind(request.created_at.to_rfc3339())
        .bind(request.submitted_at.to_rfc3339())
        .bind(request.last_modified_at.to_rfc3339())
        .bind(request.approved_at.map(|t| t.to_rfc3339()))
        .bind(request.rejected_at.map(|t| t.to_rfc3339()))
        .bind(request.validated_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &RequestId,
    ) -> Result<Option<ModificationRequest>, RepositoryError> {
        let row =
            sqlx::query(&format!("SELECT {COLUMNS} FROM modification_request WHERE id = ?"))
                .bind(&id.0)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_request(r)?)),
            None => Ok(None),
        }
    }

    async fn update_guarded(
        &self,
        request: ModificationRequest,
        expected_status: RequestStatus,
    ) -> Result<bool, RepositoryError> {
        // Single-statement compare-and-set: the status read during
        // validation guards the write, so two racing transitions cannot
        // both land on the same snapshot.
        let result = sqlx::query(
            "UPDATE modification_request SET \
                 plant = ?, part_code = ?, description = ?, hsn_code = ?, \
                 from_state_to_state = ?, tax = ?, sales_views = ?, supplying_plant = ?, \
                 receiving_plant = ?, tax_indication = ?, procurement_type = ?, \
                 storage_location = ?, production_version = ?, quality_management = ?, \
                 status = ?, validation_status = ?, remarks = ?, validator_remarks = ?, \
                 last_returned_by_role = ?, approved_by = ?, rejected_by = ?, validated_by = ?, \
                 submitted_at = ?, last_modified_at = ?, approved_at = ?, rejected_at = ?, \
                 validated_at = ? \
             WHERE id = ? AND status = ?",
        )
        .bind(&request.payload.plant)
        .bind(&request.payload.part_code)
        .bind(&request.payload.description)
        .bind(&request.payload.hsn_code)
        .bind(&request.payload.from_state_to_state)
        .bind(&request.payload.tax)
        .bind(&request.payload.sales_views)
        .bind(&request.payload.supplying_plant)
        .bind(&request.payload.receiving_plant)
        .bind(&request.payload.tax_indication)
        .bind(&request.payload.procurement_type)
        .bind(&request.payload.storage_location)
        .bind(&request.payload.production_version)
        .bind(&request.payload.quality_management)
        .bind(request.status.as_str())
        .bind(request.validation_status.map(|v| v.as_str()))
        .bind(&request.remarks)
        .bind(&request.validator_remarks)
        .bind(request.last_returned_by_role.map(|r| r.as_str()))
        .bind(&request.approved_by)
        .bind(&request.rejected_by)
        .bind(&request.validated_by)
        .bind(request.submitted_at.to_rfc3339())
        .bind(request.last_modified_at.to_rfc3339())
        .bind(request.approved_at.map(|t| t.to_rfc3339()))
        .bind(request.rejected_at.map(|t| t.to_rfc3339()))
        .bind(request.validated_at.map(|t| t.to_rfc3339()))
        .bind(&request.id.0)
        .bind(expected_status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn list(
        &self,
        view: RoleView,
        category: Option<&str>,
    ) -> Result<Vec<ModificationRequest>, RepositoryError> {
        if !category_matches(category) {
            return Ok(Vec::new());
        }

        let mut builder =
            QueryBuilder::new(format!("SELECT {COLUMNS} FROM modification_request"));

        match view.status_filter() {
            StatusFilter::Any => {}
            StatusFilter::Is(status) => {
                builder.push(" WHERE status = ");
                builder.push_bind(status.as_str());
            }
            StatusFilter::IsNot(status) => {
                builder.push(" WHERE status != ");
                builder.push_bind(status.as_str());
            }
            StatusFilter::In(statuses) => {
                builder.push(" WHERE status IN (");
                let mut separated = builder.separated(", ");
                for status in statuses {
                    separated.push_bind(status.as_str());
                }
                separated.push_unseparated(")");
            }
        }

        builder.push(format!(" ORDER BY {} DESC", sort_column(view.sort_key())));

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_request).collect()
    }
}
