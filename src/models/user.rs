use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub sub: String, // rater ID
    #[serde(default)]
    pub is_admin: bool,
    pub exp: usize, // expiration time
}

impl Claims {
    pub fn rater_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}
