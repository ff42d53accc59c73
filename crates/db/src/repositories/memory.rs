use std::collections::HashMap;

use tokio::sync::RwLock;

use partflow_core::domain::request::{ModificationRequest, RequestId, RequestStatus};
use partflow_core::workflow::views::{category_matches, RoleView, SortKey};

use super::{RepositoryError, RequestRepository};

/// Store-backed tests without sqlite. Mirrors the SQL repository's
/// guarded-update and view semantics.
#[derive(Default)]
pub struct InMemoryRequestRepository {
    requests: RwLock<HashMap<String, ModificationRequest>>,
}

#[async_trait::async_trait]
impl RequestRepository for InMemoryRequestRepository {
    async fn insert(&self, request: ModificationRequest) -> Result<(), RepositoryError> {
        let mut requests = self.requests.write().await;
        requests.insert(request.id.0.clone(), request);
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &RequestId,
    ) -> Result<Option<ModificationRequest>, RepositoryError> {
        let requests = self.requests.read().await;
        Ok(requests.get(&id.0).cloned())
    }

    async fn update_guarded(
        &self,
        request: ModificationRequest,
        expected_status: RequestStatus,
    ) -> Result<bool, RepositoryError> {
        let mut requests = self.requests.write().await;
        match requests.get(&request.id.0) {
            Some(stored) if stored.status == expected_status => {
                requests.insert(request.id.0.clone(), request);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list(
        &self,
        view: RoleView,
        category: Option<&str>,
    ) -> Result<Vec<ModificationRequest>, RepositoryError> {
        if !category_matches(category) {
            return Ok(Vec::new());
        }

        let requests = self.requests.read().await;
        let filter = view.status_filter();
        let mut matched: Vec<ModificationRequest> =
            requests.values().filter(|r| filter.matches(r)).cloned().collect();

        matched.sort_by_key(|r| {
            std::cmp::Reverse(match view.sort_key() {
                SortKey::CreatedAt => r.created_at,
                SortKey::SubmittedAt => r.submitted_at,
                SortKey::LastModifiedAt => r.last_modified_at,
            })
        });

        Ok(matched)
    }
}
