use serde::Serialize;

/// One row of the `user_data` table: the latest workflow state an employee
/// page has pushed, stored as the raw JSON text it was written with.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct UserState {
    pub username: String,
    pub state_json: String,
    pub last_updated: Option<String>,
}

impl UserState {
    /// Parses `state_json`, returning `None` for rows written by clients
    /// that did not store valid JSON.
    pub fn state_value(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.state_json).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_value_tolerates_non_json_rows() {
        let mut row = UserState {
            username: "alice".to_string(),
            state_json: r#"{"step":3}"#.to_string(),
            last_updated: None,
        };
        assert_eq!(row.state_value(), Some(serde_json::json!({"step": 3})));

        row.state_json = "not json".to_string();
        assert_eq!(row.state_value(), None);
    }
}
