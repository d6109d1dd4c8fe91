use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    #[serde(default)]
    pub typ: String,
}

/// Claims issued by the marketplace's login service. Older tokens carry the
/// subject as `userId`.
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    #[serde(alias = "userId")]
    pub sub: String,
    pub exp: Option<u64>,
    pub iat: Option<u64>,
    pub email: Option<String>,
    #[serde(default, rename = "isAdmin")]
    pub is_admin: bool,
    #[serde(default, rename = "isReceptionist")]
    pub is_receptionist: bool,
    #[serde(default, rename = "isSuperAdmin")]
    pub is_super_admin: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub is_admin: bool,
    pub is_receptionist: bool,
    pub is_super_admin: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn can_book_for_walk_ins(&self) -> bool {
        self.is_receptionist || self.is_admin
    }
}
