use serde::{Deserialize, Serialize};
use tabula_core::models::CallerIdentity;
use uuid::Uuid;

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: Uuid, // user_id
    pub organization_id: Uuid,
    pub exp: i64, // expiration timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

impl JwtClaims {
    pub fn caller(&self) -> CallerIdentity {
        CallerIdentity::new(self.sub, self.organization_id)
    }
}
