use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// A registered participant. Admins ("MC"s) additionally control the
/// live game state and manage users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub student_id: String,
    pub is_admin: bool,
}

/// Payload for creating a user, either singly or via bulk import.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub student_id: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// Outcome of a bulk user import. Duplicated student ids are skipped
/// and reported, everything else is inserted.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BulkImportReport {
    pub inserted: Vec<User>,
    pub duplicates: Vec<String>,
}
