use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub optional: bool,
}

fn default_kind() -> String {
    "Public".to_string()
}

/// On-disk layout of a holiday calendar file.
#[derive(Debug, Clone, Deserialize)]
pub struct HolidayFile {
    #[serde(default)]
    pub year: Option<i32>,
    pub holidays: Vec<Holiday>,
}
