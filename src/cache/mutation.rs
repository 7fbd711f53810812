use std::future::Future;

use tracing::{debug, warn};

use crate::cache::key::Resource;
use crate::cache::store::QueryCache;
use crate::error::ApiResult;

/// Server writes the client performs, with the reads each one makes stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Register,
    Login,
    UpdateProfile,
    AnalyzeFood,
    SaveFood,
    DiscardFood,
}

impl MutationKind {
    pub fn invalidates(self) -> &'static [Resource] {
        match self {
            MutationKind::SaveFood => &[
                Resource::FoodEntries,
                Resource::DailyReport,
                Resource::WeeklyReport,
                Resource::MonthlyReport,
            ],
            MutationKind::UpdateProfile => &[Resource::CurrentUser],
            MutationKind::Register
            | MutationKind::Login
            | MutationKind::AnalyzeFood
            | MutationKind::DiscardFood => &[],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MutationStatus {
    #[default]
    Idle,
    Pending,
    Success,
    Error(String),
}

#[derive(Debug, Clone)]
pub struct Mutation {
    kind: MutationKind,
    status: MutationStatus,
}

impl Mutation {
    pub fn new(kind: MutationKind) -> Self {
        Self {
            kind,
            status: MutationStatus::Idle,
        }
    }

    pub fn kind(&self) -> MutationKind {
        self.kind
    }

    pub fn status(&self) -> &MutationStatus {
        &self.status
    }

    pub fn is_pending(&self) -> bool {
        self.status == MutationStatus::Pending
    }

    pub fn reset(&mut self) {
        self.status = MutationStatus::Idle;
    }

    /// Drives `request`; dependent keys are invalidated only once it succeeded.
    pub async fn run<T, Fut>(&mut self, cache: &QueryCache, request: Fut) -> ApiResult<T>
    where
        Fut: Future<Output = ApiResult<T>>,
    {
        self.status = MutationStatus::Pending;
        match request.await {
            Ok(v) => {
                cache.invalidate(self.kind.invalidates());
                debug!(kind = ?self.kind, "mutation succeeded");
                self.status = MutationStatus::Success;
                Ok(v)
            }
            Err(e) => {
                warn!(kind = ?self.kind, error = %e, "mutation failed");
                self.status = MutationStatus::Error(e.to_string());
                Err(e)
            }
        }
    }
}
