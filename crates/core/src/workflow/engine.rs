use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::request::{
    ModificationRequest, RequestId, RequestPayload, RequestStatus, ReturnedBy, ValidationStatus,
};

/// Action requested against a pending (approver) or approved (validator)
/// request. Parsed case-insensitively from the wire strings the original
/// clients send.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkflowAction {
    Approve,
    Reject,
    Return,
}

impl WorkflowAction {
    pub fn parse(value: &str) -> Result<Self, WorkflowError> {
        match value.trim().to_ascii_uppercase().as_str() {
            "APPROVE" => Ok(Self::Approve),
            "REJECT" => Ok(Self::Reject),
            "RETURN" => Ok(Self::Return),
            _ => Err(WorkflowError::UnknownAction { action: value.trim().to_string() }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "APPROVE",
            Self::Reject => "REJECT",
            Self::Return => "RETURN",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("request `{id}` not found")]
    NotFound { id: String },
    #[error("action {action} is not valid while the request is {status:?}")]
    InvalidStateTransition { status: RequestStatus, action: &'static str },
    #[error("required field `{field}` is missing or blank")]
    MissingRequiredField { field: &'static str },
    #[error("unknown action `{action}`")]
    UnknownAction { action: String },
}

/// Pure transition core. Collaborating store, identity, and clock are all
/// supplied by the caller: the engine receives the current record, the
/// resolved actor, and the timestamp, and returns the updated record
/// without touching the input on failure.
#[derive(Clone, Copy, Debug, Default)]
pub struct WorkflowEngine;

impl WorkflowEngine {
    /// Enter the workflow. The only way into `PENDING_FOR_APPROVAL`.
    pub fn create(
        &self,
        payload: RequestPayload,
        remarks: Option<String>,
        actor: &str,
        now: DateTime<Utc>,
    ) -> ModificationRequest {
        ModificationRequest {
            id: RequestId::generate(),
            payload,
            status: RequestStatus::PendingForApproval,
            validation_status: None,
            remarks: remarks.filter(|r| !r.trim().is_empty()),
            validator_remarks: None,
            last_returned_by_role: None,
            created_by: Some(actor.to_string()),
            approved_by: None,
            rejected_by: None,
            validated_by: None,
            created_at: now,
            submitted_at: now,
            last_modified_at: now,
            approved_at: None,
            rejected_at: None,
            validated_at: None,
        }
    }

    /// Approver acting on a pending request.
    pub fn approver_act(
        &self,
        request: &ModificationRequest,
        action: WorkflowAction,
        remarks: Option<&str>,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<ModificationRequest, WorkflowError> {
        if request.status != RequestStatus::PendingForApproval {
            return Err(WorkflowError::InvalidStateTransition {
                status: request.status,
                action: action.as_str(),
            });
        }

        let mut next = request.clone();
        match action {
            WorkflowAction::Approve => {
                next.status = RequestStatus::Approved;
                next.approved_by = Some(actor.to_string());
                next.approved_at = Some(now);
                if let Some(text) = non_blank(remarks) {
                    next.remarks = Some(text);
                }
            }
            WorkflowAction::Reject => {
                next.remarks = Some(require_remarks(remarks)?);
                next.status = RequestStatus::Rejected;
                next.rejected_by = Some(actor.to_string());
                next.rejected_at = Some(now);
            }
            WorkflowAction::Return => {
                next.remarks = Some(require_remarks(remarks)?);
                next.status = RequestStatus::ReturnedForCorrection;
                next.last_returned_by_role = Some(ReturnedBy::Approver);
            }
        }
        next.last_modified_at = now;
        Ok(next)
    }

    /// Validator sign-off on an approved request. Remarks are mandatory for
    /// every validator outcome and land in the validator-scoped field.
    pub fn validator_act(
        &self,
        request: &ModificationRequest,
        action: WorkflowAction,
        remarks: Option<&str>,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<ModificationRequest, WorkflowError> {
        if request.status != RequestStatus::Approved {
            return Err(WorkflowError::InvalidStateTransition {
                status: request.status,
                action: action.as_str(),
            });
        }

        let remarks = require_remarks(remarks)?;
        let mut next = request.clone();
        next.validator_remarks = Some(remarks);
        match action {
            WorkflowAction::Approve => {
                next.status = RequestStatus::Validated;
                next.validation_status = Some(ValidationStatus::Valid);
                next.validated_by = Some(actor.to_string());
                next.validated_at = Some(now);
            }
            WorkflowAction::Reject => {
                next.status = RequestStatus::Rejected;
                next.validation_status = Some(ValidationStatus::Invalid);
                next.rejected_by = Some(actor.to_string());
                next.rejected_at = Some(now);
            }
            WorkflowAction::Return => {
                next.status = RequestStatus::ReturnedForCorrection;
                next.validation_status = Some(ValidationStatus::Invalid);
                next.last_returned_by_role = Some(ReturnedBy::Validator);
            }
        }
        next.last_modified_at = now;
        Ok(next)
    }

    /// Creator resubmitting after a return. Merges the correction patch
    /// into the payload and re-enters the approval queue.
    pub fn resubmit(
        &self,
        request: &ModificationRequest,
        patch: &RequestPayload,
        now: DateTime<Utc>,
    ) -> Result<ModificationRequest, WorkflowError> {
        if request.status != RequestStatus::ReturnedForCorrection {
            return Err(WorkflowError::InvalidStateTransition {
                status: request.status,
                action: "RESUBMIT",
            });
        }

        let mut next = request.clone();
        next.payload = request.payload.merged_with(patch);
        next.status = RequestStatus::PendingForApproval;
        next.submitted_at = now;
        next.last_modified_at = now;
        Ok(next)
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(ToString::to_string)
}

fn require_remarks(value: Option<&str>) -> Result<String, WorkflowError> {
    non_blank(value).ok_or(WorkflowError::MissingRequiredField { field: "remarks" })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use crate::domain::request::{
        RequestPayload, RequestStatus, ReturnedBy, ValidationStatus,
    };
    use crate::workflow::engine::{WorkflowAction, WorkflowEngine, WorkflowError};

    fn payload(part_code: &str) -> RequestPayload {
        RequestPayload {
            plant: Some("P01".to_string()),
            part_code: Some(part_code.to_string()),
            description: Some("bracket revision".to_string()),
            ..RequestPayload::default()
        }
    }

    #[test]
    fn create_enters_pending_with_aligned_timestamps() {
        let engine = WorkflowEngine;
        let now = Utc::now();
        let request = engine.create(payload("P100"), None, "creator@demo.local", now);

        assert_eq!(request.status, RequestStatus::PendingForApproval);
        assert_eq!(request.created_at, now);
        assert_eq!(request.submitted_at, now);
        assert_eq!(request.last_modified_at, now);
        assert_eq!(request.created_by.as_deref(), Some("creator@demo.local"));
        assert_eq!(request.approved_at, None);
        assert_eq!(request.rejected_at, None);
        assert_eq!(request.validated_at, None);
        assert_eq!(request.payload.part_code.as_deref(), Some("P100"));
    }

    #[test]
    fn create_drops_blank_remarks() {
        let engine = WorkflowEngine;
        let request = engine.create(payload("P1"), Some("   ".to_string()), "c", Utc::now());
        assert_eq!(request.remarks, None);
    }

    #[test]
    fn approve_moves_pending_to_approved() {
        let engine = WorkflowEngine;
        let created = engine.create(payload("P100"), None, "creator", Utc::now());
        let later = created.created_at + Duration::seconds(5);

        let approved = engine
            .approver_act(&created, WorkflowAction::Approve, None, "approver", later)
            .expect("pending -> approved");

        assert_eq!(approved.status, RequestStatus::Approved);
        assert_eq!(approved.approved_by.as_deref(), Some("approver"));
        assert_eq!(approved.approved_at, Some(later));
        assert_eq!(approved.last_modified_at, later);
        // Approval remarks stay optional.
        assert_eq!(approved.remarks, None);
    }

    #[test]
    fn reject_requires_remarks_and_records_them_exactly() {
        let engine = WorkflowEngine;
        let created = engine.create(payload("P100"), None, "creator", Utc::now());

        let blank = engine
            .approver_act(&created, WorkflowAction::Reject, Some("  "), "approver", Utc::now())
            .expect_err("blank remarks must be rejected");
        assert_eq!(blank, WorkflowError::MissingRequiredField { field: "remarks" });

        let rejected = engine
            .approver_act(
                &created,
                WorkflowAction::Reject,
                Some("duplicate part"),
                "approver",
                Utc::now(),
            )
            .expect("pending -> rejected");
        assert_eq!(rejected.status, RequestStatus::Rejected);
        assert_eq!(rejected.remarks.as_deref(), Some("duplicate part"));
        assert!(rejected.rejected_at.is_some());
        assert_eq!(rejected.rejected_by.as_deref(), Some("approver"));
    }

    #[test]
    fn return_marks_the_returning_role() {
        let engine = WorkflowEngine;
        let created = engine.create(payload("P100"), None, "creator", Utc::now());

        let returned = engine
            .approver_act(
                &created,
                WorkflowAction::Return,
                Some("fix plant"),
                "approver",
                Utc::now(),
            )
            .expect("pending -> returned");
        assert_eq!(returned.status, RequestStatus::ReturnedForCorrection);
        assert_eq!(returned.last_returned_by_role, Some(ReturnedBy::Approver));
        assert_eq!(returned.remarks.as_deref(), Some("fix plant"));
    }

    #[test]
    fn resubmit_merges_patch_and_refreshes_submission_time() {
        let engine = WorkflowEngine;
        let created = engine.create(payload("P100"), None, "creator", Utc::now());
        let returned = engine
            .approver_act(
                &created,
                WorkflowAction::Return,
                Some("fix plant"),
                "approver",
                Utc::now(),
            )
            .expect("return");

        let later = returned.last_modified_at + Duration::seconds(30);
        let patch = RequestPayload { plant: Some("X".to_string()), ..RequestPayload::default() };
        let resubmitted = engine.resubmit(&returned, &patch, later).expect("returned -> pending");

        assert_eq!(resubmitted.status, RequestStatus::PendingForApproval);
        assert_eq!(resubmitted.submitted_at, later);
        assert_eq!(resubmitted.payload.plant.as_deref(), Some("X"));
        // Untouched fields survive the merge.
        assert_eq!(resubmitted.payload.part_code.as_deref(), Some("P100"));
        assert_eq!(resubmitted.created_at, created.created_at);
    }

    #[test]
    fn resubmit_is_only_valid_from_returned() {
        let engine = WorkflowEngine;
        let created = engine.create(payload("P100"), None, "creator", Utc::now());

        let error = engine
            .resubmit(&created, &RequestPayload::default(), Utc::now())
            .expect_err("pending cannot be resubmitted");
        assert!(matches!(
            error,
            WorkflowError::InvalidStateTransition { status: RequestStatus::PendingForApproval, .. }
        ));
    }

    #[test]
    fn validator_actions_require_approved_state_and_remarks() {
        let engine = WorkflowEngine;
        let created = engine.create(payload("P100"), None, "creator", Utc::now());

        let wrong_state = engine
            .validator_act(&created, WorkflowAction::Approve, Some("ok"), "validator", Utc::now())
            .expect_err("pending is not validatable");
        assert!(matches!(wrong_state, WorkflowError::InvalidStateTransition { .. }));

        let approved = engine
            .approver_act(&created, WorkflowAction::Approve, None, "approver", Utc::now())
            .expect("approve");

        let blank = engine
            .validator_act(&approved, WorkflowAction::Approve, None, "validator", Utc::now())
            .expect_err("validator remarks are mandatory");
        assert_eq!(blank, WorkflowError::MissingRequiredField { field: "remarks" });
    }

    #[test]
    fn validate_approve_terminates_as_validated() {
        let engine = WorkflowEngine;
        let created = engine.create(payload("P100"), None, "creator", Utc::now());
        let approved = engine
            .approver_act(&created, WorkflowAction::Approve, None, "approver", Utc::now())
            .expect("approve");

        let validated = engine
            .validator_act(
                &approved,
                WorkflowAction::Approve,
                Some("matches SAP master"),
                "validator",
                Utc::now(),
            )
            .expect("approved -> validated");

        assert_eq!(validated.status, RequestStatus::Validated);
        assert_eq!(validated.validation_status, Some(ValidationStatus::Valid));
        assert_eq!(validated.validated_by.as_deref(), Some("validator"));
        assert!(validated.validated_at.is_some());
        assert_eq!(validated.validator_remarks.as_deref(), Some("matches SAP master"));
    }

    #[test]
    fn validate_reject_then_approve_again_fails() {
        let engine = WorkflowEngine;
        let created = engine.create(payload("P100"), None, "creator", Utc::now());
        let approved = engine
            .approver_act(&created, WorkflowAction::Approve, None, "approver", Utc::now())
            .expect("approve");

        let rejected = engine
            .validator_act(
                &approved,
                WorkflowAction::Reject,
                Some("bad data"),
                "validator",
                Utc::now(),
            )
            .expect("approved -> rejected");
        assert_eq!(rejected.status, RequestStatus::Rejected);
        assert_eq!(rejected.validation_status, Some(ValidationStatus::Invalid));

        let error = engine
            .approver_act(&rejected, WorkflowAction::Approve, None, "approver", Utc::now())
            .expect_err("rejected is terminal");
        assert_eq!(
            error,
            WorkflowError::InvalidStateTransition {
                status: RequestStatus::Rejected,
                action: "APPROVE",
            }
        );
    }

    #[test]
    fn validator_return_cycles_back_through_correction() {
        let engine = WorkflowEngine;
        let created = engine.create(payload("P100"), None, "creator", Utc::now());
        let approved = engine
            .approver_act(&created, WorkflowAction::Approve, None, "approver", Utc::now())
            .expect("approve");
        let returned = engine
            .validator_act(
                &approved,
                WorkflowAction::Return,
                Some("wrong HSN"),
                "validator",
                Utc::now(),
            )
            .expect("approved -> returned");

        assert_eq!(returned.status, RequestStatus::ReturnedForCorrection);
        assert_eq!(returned.validation_status, Some(ValidationStatus::Invalid));
        assert_eq!(returned.last_returned_by_role, Some(ReturnedBy::Validator));
        // First-pass approval timestamp survives the cycle.
        assert_eq!(returned.approved_at, approved.approved_at);

        let resubmitted = engine
            .resubmit(&returned, &RequestPayload::default(), Utc::now())
            .expect("returned -> pending");
        assert_eq!(resubmitted.status, RequestStatus::PendingForApproval);
    }

    #[test]
    fn failed_transitions_leave_the_input_untouched() {
        let engine = WorkflowEngine;
        let created = engine.create(payload("P100"), None, "creator", Utc::now());
        let snapshot = created.clone();

        let _ = engine.validator_act(&created, WorkflowAction::Reject, Some("x"), "v", Utc::now());
        let _ = engine.approver_act(&created, WorkflowAction::Reject, None, "a", Utc::now());
        let _ = engine.resubmit(&created, &RequestPayload::default(), Utc::now());

        assert_eq!(created, snapshot);
    }

    #[test]
    fn action_strings_parse_case_insensitively() {
        assert_eq!(WorkflowAction::parse("approve"), Ok(WorkflowAction::Approve));
        assert_eq!(WorkflowAction::parse(" REJECT "), Ok(WorkflowAction::Reject));
        assert_eq!(WorkflowAction::parse("Return"), Ok(WorkflowAction::Return));
        assert_eq!(
            WorkflowAction::parse("ESCALATE"),
            Err(WorkflowError::UnknownAction { action: "ESCALATE".to_string() })
        );
    }
}
