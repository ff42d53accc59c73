use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl RequestId {
    /// Mint a fresh opaque id (`PCR-` + 12 hex chars of a v4 uuid).
    pub fn generate() -> Self {
        let raw = Uuid::new_v4().simple().to_string();
        Self(format!("PCR-{}", &raw[..12]))
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    PendingForApproval,
    Approved,
    Rejected,
    ReturnedForCorrection,
    Validated,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingForApproval => "PENDING_FOR_APPROVAL",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::ReturnedForCorrection => "RETURNED_FOR_CORRECTION",
            Self::Validated => "VALIDATED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING_FOR_APPROVAL" => Some(Self::PendingForApproval),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            "RETURNED_FOR_CORRECTION" => Some(Self::ReturnedForCorrection),
            "VALIDATED" => Some(Self::Validated),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationStatus {
    Valid,
    Invalid,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "VALID",
            Self::Invalid => "INVALID",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "VALID" => Some(Self::Valid),
            "INVALID" => Some(Self::Invalid),
            _ => None,
        }
    }
}

/// Which role sent the request back for correction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnedBy {
    Approver,
    Validator,
}

impl ReturnedBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approver => "APPROVER",
            Self::Validator => "VALIDATOR",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "APPROVER" => Some(Self::Approver),
            "VALIDATOR" => Some(Self::Validator),
            _ => None,
        }
    }
}

/// Free-form metadata describing the change. Set at creation and only
/// mutable through a correction resubmission.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPayload {
    pub plant: Option<String>,
    pub part_code: Option<String>,
    pub description: Option<String>,
    pub hsn_code: Option<String>,
    pub from_state_to_state: Option<String>,
    pub tax: Option<String>,
    pub sales_views: Option<String>,
    pub supplying_plant: Option<String>,
    pub receiving_plant: Option<String>,
    pub tax_indication: Option<String>,
    pub procurement_type: Option<String>,
    pub storage_location: Option<String>,
    pub production_version: Option<String>,
    pub quality_management: Option<String>,
}

impl RequestPayload {
    /// Merge a correction patch: fields present in the patch overwrite,
    /// absent fields keep their previous value.
    pub fn merged_with(&self, patch: &RequestPayload) -> RequestPayload {
        fn pick(current: &Option<String>, patched: &Option<String>) -> Option<String> {
            patched.clone().or_else(|| current.clone())
        }

        RequestPayload {
            plant: pick(&self.plant, &patch.plant),
            part_code: pick(&self.part_code, &patch.part_code),
            description: pick(&self.description, &patch.description),
            hsn_code: pick(&self.hsn_code, &patch.hsn_code),
            from_state_to_state: pick(&self.from_state_to_state, &patch.from_state_to_state),
            tax: pick(&self.tax, &patch.tax),
            sales_views: pick(&self.sales_views, &patch.sales_views),
            supplying_plant: pick(&self.supplying_plant, &patch.supplying_plant),
            receiving_plant: pick(&self.receiving_plant, &patch.receiving_plant),
            tax_indication: pick(&self.tax_indication, &patch.tax_indication),
            procurement_type: pick(&self.procurement_type, &patch.procurement_type),
            storage_location: pick(&self.storage_location, &patch.storage_location),
            production_version: pick(&self.production_version, &patch.production_version),
            quality_management: pick(&self.quality_management, &patch.quality_management),
        }
    }
}

/// One part-code modification workflow instance. Never physically deleted;
/// the status either terminates or cycles back to pending.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModificationRequest {
    pub id: RequestId,
    pub payload: RequestPayload,

    pub status: RequestStatus,
    pub validation_status: Option<ValidationStatus>,
    pub remarks: Option<String>,
    pub validator_remarks: Option<String>,
    pub last_returned_by_role: Option<ReturnedBy>,

    pub created_by: Option<String>,
    pub approved_by: Option<String>,
    pub rejected_by: Option<String>,
    pub validated_by: Option<String>,

    pub created_at: DateTime<Utc>,
    pub submitted_at: DateTime<Utc>,
    pub last_modified_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub validated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::{RequestPayload, RequestStatus, ReturnedBy, ValidationStatus};

    #[test]
    fn status_round_trips_through_wire_strings() {
        for status in [
            RequestStatus::PendingForApproval,
            RequestStatus::Approved,
            RequestStatus::Rejected,
            RequestStatus::ReturnedForCorrection,
            RequestStatus::Validated,
        ] {
            assert_eq!(RequestStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(RequestStatus::parse("DRAFT"), None);
        assert_eq!(ValidationStatus::parse("VALID"), Some(ValidationStatus::Valid));
        assert_eq!(ReturnedBy::parse("VALIDATOR"), Some(ReturnedBy::Validator));
    }

    #[test]
    fn merge_keeps_absent_fields_and_overwrites_present_ones() {
        let current = RequestPayload {
            plant: Some("P01".to_string()),
            part_code: Some("P100".to_string()),
            hsn_code: Some("8471".to_string()),
            ..RequestPayload::default()
        };
        let patch = RequestPayload { plant: Some("P02".to_string()), ..RequestPayload::default() };

        let merged = current.merged_with(&patch);
        assert_eq!(merged.plant.as_deref(), Some("P02"));
        assert_eq!(merged.part_code.as_deref(), Some("P100"));
        assert_eq!(merged.hsn_code.as_deref(), Some("8471"));
        assert_eq!(merged.description, None);
    }

    #[test]
    fn generated_ids_are_prefixed_and_unique() {
        let a = super::RequestId::generate();
        let b = super::RequestId::generate();
        assert!(a.0.starts_with("PCR-"));
        assert_eq!(a.0.len(), "PCR-".len() + 12);
        assert_ne!(a, b);
    }
}
