//! Per-tab list filters

use std::fmt;
use std::str::FromStr;

use crate::kinds::RecordKind;
use crate::models::Record;

/// The four filter inputs, stored as typed so the UI can echo them back
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub search: String,
    pub notes: String,
    pub min_price: String,
    pub max_price: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    Search,
    Notes,
    MinPrice,
    MaxPrice,
}

impl FromStr for FilterField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "search" => Ok(FilterField::Search),
            "notes" => Ok(FilterField::Notes),
            "minPrice" | "min" => Ok(FilterField::MinPrice),
            "maxPrice" | "max" => Ok(FilterField::MaxPrice),
            other => Err(format!("unknown filter '{}'", other)),
        }
    }
}

impl FilterState {
    pub fn get(&self, field: FilterField) -> &str {
        match field {
            FilterField::Search => &self.search,
            FilterField::Notes => &self.notes,
            FilterField::MinPrice => &self.min_price,
            FilterField::MaxPrice => &self.max_price,
        }
    }

    pub fn set(&mut self, field: FilterField, value: impl Into<String>) {
        let slot = match field {
            FilterField::Search => &mut self.search,
            FilterField::Notes => &mut self.notes,
            FilterField::MinPrice => &mut self.min_price,
            FilterField::MaxPrice => &mut self.max_price,
        };
        *slot = value.into();
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether a record passes every active filter.
    ///
    /// Text filters are case-insensitive substring matches of the input as
    /// typed, spaces included. A record with no
    /// notes never matches a non-empty notes filter. Bounds apply to the
    /// kind's numeric column, with a missing value counted as 0; a bound that
    /// is empty or not a number is ignored.
    pub fn matches(&self, record: &Record) -> bool {
        let search = self.search.to_lowercase();
        if !search.is_empty() && !record.name().to_lowercase().contains(&search) {
            return false;
        }

        let notes = self.notes.to_lowercase();
        if !notes.is_empty() {
            match record.notes() {
                Some(text) if text.to_lowercase().contains(&notes) => {}
                _ => return false,
            }
        }

        let value = record.numeric_value().unwrap_or(0.0);
        if let Some(min) = bound(&self.min_price) {
            if value < min {
                return false;
            }
        }
        if let Some(max) = bound(&self.max_price) {
            if value > max {
                return false;
            }
        }
        true
    }

    /// Records passing the filters, in their original order
    pub fn apply<'a>(&self, records: &'a [Record]) -> Vec<&'a Record> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}

fn bound(input: &str) -> Option<f64> {
    input.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

impl fmt::Display for FilterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = [
            ("search", &self.search),
            ("notes", &self.notes),
            ("min", &self.min_price),
            ("max", &self.max_price),
        ]
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(name, value)| format!("{}={}", name, value))
        .collect();
        f.write_str(&parts.join(" "))
    }
}

/// Filter state for each tab, kept independently
#[derive(Debug, Clone, Default)]
pub struct Filters {
    by_kind: [FilterState; 3],
}

impl Filters {
    pub fn get(&self, kind: RecordKind) -> &FilterState {
        &self.by_kind[kind.index()]
    }

    pub fn get_mut(&mut self, kind: RecordKind) -> &mut FilterState {
        &mut self.by_kind[kind.index()]
    }

    pub fn clear(&mut self, kind: RecordKind) {
        self.by_kind[kind.index()] = FilterState::default();
    }
}
