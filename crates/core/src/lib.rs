pub mod config;
pub mod domain;
pub mod workflow;

pub use domain::request::{
    ModificationRequest, RequestId, RequestPayload, RequestStatus, ReturnedBy, ValidationStatus,
};
pub use workflow::engine::{WorkflowAction, WorkflowEngine, WorkflowError};
pub use workflow::views::{category_matches, RoleView, SortKey, StatusFilter, KNOWN_CATEGORY};
