use crate::domain::request::{ModificationRequest, RequestStatus};

/// The single workflow category that exists today. The `function` query
/// parameter is a placeholder for future multi-workflow support: anything
/// other than this value, `all`, or empty yields an empty result set.
pub const KNOWN_CATEGORY: &str = "part-code-modification";

pub fn category_matches(filter: Option<&str>) -> bool {
    match filter.map(str::trim) {
        None | Some("") | Some("all") => true,
        Some(value) => value == KNOWN_CATEGORY,
    }
}

/// Role-scoped queue/history projections. Each view is a status filter plus
/// a descending sort key; the store maps both onto its query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoleView {
    CreatorHistory,
    ApproverQueue,
    ApproverHistory,
    ValidatorQueue,
    ValidatorHistory,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusFilter {
    Any,
    Is(RequestStatus),
    IsNot(RequestStatus),
    In(&'static [RequestStatus]),
}

impl StatusFilter {
    pub fn matches(&self, request: &ModificationRequest) -> bool {
        match self {
            Self::Any => true,
            Self::Is(status) => request.status == *status,
            Self::IsNot(status) => request.status != *status,
            Self::In(statuses) => statuses.contains(&request.status),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortKey {
    CreatedAt,
    SubmittedAt,
    LastModifiedAt,
}

impl RoleView {
    pub fn status_filter(&self) -> StatusFilter {
        match self {
            Self::CreatorHistory => StatusFilter::Any,
            Self::ApproverQueue => StatusFilter::Is(RequestStatus::PendingForApproval),
            Self::ApproverHistory => StatusFilter::IsNot(RequestStatus::PendingForApproval),
            Self::ValidatorQueue => StatusFilter::Is(RequestStatus::Approved),
            Self::ValidatorHistory => {
                StatusFilter::In(&[RequestStatus::Validated, RequestStatus::Rejected])
            }
        }
    }

    /// Sort key, always descending (most recent first).
    pub fn sort_key(&self) -> SortKey {
        match self {
            Self::CreatorHistory => SortKey::CreatedAt,
            Self::ApproverQueue | Self::ValidatorQueue => SortKey::SubmittedAt,
            Self::ApproverHistory | Self::ValidatorHistory => SortKey::LastModifiedAt,
        }
    }
}
