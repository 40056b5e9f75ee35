use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::Role;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub last_login: DateTime<Utc>,
}
