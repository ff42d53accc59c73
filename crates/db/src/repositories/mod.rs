use async_trait::async_trait;
use thiserror::Error;

use partflow_core::domain::request::{ModificationRequest, RequestId, RequestStatus};
use partflow_core::workflow::views::RoleView;

pub mod memory;
pub mod request;

pub use memory::InMemoryRequestRepository;
pub use request::SqlRequestRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Persistence seam for the workflow engine. One record per request;
/// requests are never deleted.
#[async_trait]
pub trait RequestRepository: Send + Sync {
    async fn insert(&self, request: ModificationRequest) -> Result<(), RepositoryError>;

    async fn find_by_id(
        &self,
        id: &RequestId,
    ) -> Result<Option<ModificationRequest>, RepositoryError>;

    /// Compare-and-set overwrite: the row is only written when its stored
    /// status still equals `expected_status`. Returns `false` when a
    /// concurrent writer moved the request first; nothing is committed in
    /// that case.
    async fn update_guarded(
        &self,
        request: ModificationRequest,
        expected_status: RequestStatus,
    ) -> Result<bool, RepositoryError>;

    /// Role view projection, sorted descending by the view's sort key. A
    /// category filter outside the known workflow category short-circuits
    /// to an empty list.
    async fn list(
        &self,
        view: RoleView,
        category: Option<&str>,
    ) -> Result<Vec<ModificationRequest>, RepositoryError>;
}
