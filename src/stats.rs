//! Summary figures for a tab

use std::fmt;

use crate::kinds::RecordKind;
use crate::models::Record;

/// Count, total and mean of the numeric column over a record set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aggregates {
    pub kind: RecordKind,
    pub count: usize,
    pub total: f64,
    pub average: f64,
}

impl Aggregates {
    /// Missing values count as 0; the average of nothing is 0.
    pub fn compute(kind: RecordKind, records: &[Record]) -> Self {
        let count = records.len();
        let total: f64 = records
            .iter()
            .map(|r| r.numeric_value().unwrap_or(0.0))
            .sum();
        let average = if count == 0 { 0.0 } else { total / count as f64 };
        Self {
            kind,
            count,
            total,
            average,
        }
    }

    /// The three summary cards as (title, value) pairs
    pub fn cards(&self) -> [(String, String); 3] {
        [
            (format!("Total {}", self.kind.title()), self.count.to_string()),
            ("Average cost".to_string(), money(self.average)),
            ("Total cost".to_string(), money(self.total)),
        ]
    }
}

/// Currency with two decimals
pub fn money(value: f64) -> String {
    format!("${:.2}", value)
}

impl fmt::Display for Aggregates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (title, value) in self.cards() {
            writeln!(f, "{:<20} {:>14}", title, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn supplier(id: i64, cost: Option<f64>) -> Record {
        Record::from_value(
            RecordKind::Supplier,
            json!({ "id": id, "name": format!("Proveedor {}", id), "cost": cost }),
        )
        .unwrap()
    }

    #[test]
    fn empty_set_averages_to_zero() {
        let stats = Aggregates::compute(RecordKind::Supplier, &[]);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.total, 0.0);
        assert_eq!(stats.average, 0.0);
    }

    #[test]
    fn missing_costs_count_as_zero() {
        let records = vec![supplier(1, Some(100.0)), supplier(2, None), supplier(3, Some(50.0))];
        let stats = Aggregates::compute(RecordKind::Supplier, &records);
        assert_eq!(stats.count, 3);
        assert_eq!(stats.total, 150.0);
        assert_eq!(stats.average, 50.0);
    }

    #[test]
    fn cards_use_two_decimals() {
        let records = vec![supplier(1, Some(10.0)), supplier(2, Some(5.126))];
        let cards = Aggregates::compute(RecordKind::Supplier, &records).cards();
        assert_eq!(cards[0], ("Total Suppliers".to_string(), "2".to_string()));
        assert_eq!(cards[2].1, "$15.13");
        assert_eq!(money(0.0), "$0.00");
    }
}
