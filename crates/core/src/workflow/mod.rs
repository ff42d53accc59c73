pub mod engine;
pub mod views;

pub use engine::{WorkflowAction, WorkflowEngine, WorkflowError};
pub use views::{category_matches, RoleView, SortKey, StatusFilter, KNOWN_CATEGORY};
