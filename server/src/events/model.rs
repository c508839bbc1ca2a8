use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Client event as posted to the api
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiEvent {
    pub dt: DateTime<Utc>,
    pub event: String,
    pub user_id: String,
    #[serde(default)]
    pub screen: String,
    #[serde(default)]
    pub elem: String,
    #[serde(default)]
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidEvent {
    pub field: &'static str,
}

impl std::fmt::Display for InvalidEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "field {} is required", self.field)
    }
}

impl std::error::Error for InvalidEvent {}

impl ApiEvent {
    pub fn validate(&self) -> Result<(), InvalidEvent> {
        let required = [("Event", &self.event), ("UserId", &self.user_id)];
        match required.into_iter().find(|(_, value)| value.is_empty()) {
            Some((field, _)) => Err(InvalidEvent { field }),
            None => Ok(()),
        }
    }
}
