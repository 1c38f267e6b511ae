//! Resolved capture date of a photo.

use serde::{Deserialize, Serialize};

/// Capture date as `(year, month, day)` components, or the unknown sentinel.
///
/// Components are kept as zero-padded strings because the filename source
/// performs no calendar validation; `20241399` yields month `13`, day `99`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TakenDate {
    Known {
        year: String,
        month: String,
        day: String,
    },
    Unknown,
}

impl TakenDate {
    pub fn known(
        year: impl Into<String>,
        month: impl Into<String>,
        day: impl Into<String>,
    ) -> Self {
        Self::Known {
            year: year.into(),
            month: month.into(),
            day: day.into(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Returns `YYYY-MM-DD`, or `None` for the unknown sentinel.
    pub fn to_date_string(&self) -> Option<String> {
        match self {
            Self::Known { year, month, day } => Some(format!("{year}-{month}-{day}")),
            Self::Unknown => None,
        }
    }

    /// Parses the persisted `YYYY-MM-DD` form; anything else maps to unknown.
    pub(crate) fn from_stored(value: Option<&str>) -> Self {
        let Some(value) = value else {
            return Self::Unknown;
        };
        let mut parts = value.splitn(3, '-');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(year), Some(month), Some(day))
                if !year.is_empty() && !month.is_empty() && !day.is_empty() =>
            {
                Self::known(year, month, day)
            }
            _ => Self::Unknown,
        }
    }
}
