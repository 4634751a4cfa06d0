use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tank {
    pub id: String,
    pub name: String,
    /// Opaque credential that grants sitter access to this tank's tasks.
    pub share_token: String,
    pub created_at: String,
}
