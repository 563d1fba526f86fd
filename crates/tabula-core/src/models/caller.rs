use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of the caller submitting a file, resolved by an external authenticator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    pub user_id: Uuid,
    pub organization_id: Uuid,
}

impl CallerIdentity {
    pub fn new(user_id: Uuid, organization_id: Uuid) -> Self {
        Self {
            user_id,
            organization_id,
        }
    }
}
