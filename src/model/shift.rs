use chrono::NaiveTime;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Shift reference data. Immutable; roster assignments copy name/color
/// at write time instead of referencing these fields live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shift {
    pub id: String,
    pub name: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub color: String,
}

/// Stand-in rendered when a record references a shift id that no longer
/// resolves. The rest of the day still reconciles.
pub static PLACEHOLDER_SHIFT: Lazy<Shift> = Lazy::new(|| Shift {
    id: String::new(),
    name: "Unknown Shift".to_string(),
    start_time: NaiveTime::from_hms_opt(0, 0, 0).unwrap_or_default(),
    end_time: NaiveTime::from_hms_opt(0, 0, 0).unwrap_or_default(),
    color: "#9e9e9e".to_string(),
});
