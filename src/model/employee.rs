use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Gender {
    #[strum(serialize = "male", serialize = "m")]
    Male,
    #[strum(serialize = "female", serialize = "f")]
    Female,
}

/// Who the chat session is talking to, as far as the transport told us.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeIdentity {
    pub name: String,
    pub email: Option<String>,
    pub gender: Option<Gender>,
}

impl EmployeeIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: None,
            gender: None,
        }
    }

    /// Records belong to an employee by email when both sides have one,
    /// otherwise by display name.
    pub fn owns(&self, name: &str, email: Option<&str>) -> bool {
        match (self.email.as_deref(), email) {
            (Some(mine), Some(theirs)) => mine.eq_ignore_ascii_case(theirs),
            _ => self.name.eq_ignore_ascii_case(name),
        }
    }
}
