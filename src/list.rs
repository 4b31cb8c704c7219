//! List presentation with edit and delete actions

use std::fmt;

use serde_json::Value;

use crate::kinds::{Icon, RecordKind};
use crate::models::{Record, RecordId};
use crate::stats::money;

/// A template slot rendered for one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detail {
    pub icon: Icon,
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub id: RecordId,
    pub title: String,
    pub details: Vec<Detail>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListView {
    Empty {
        message: &'static str,
        hint: &'static str,
    },
    Rows(Vec<RowView>),
}

/// The visible records of one tab
#[derive(Debug)]
pub struct RecordList<'a> {
    kind: RecordKind,
    items: Vec<&'a Record>,
}

impl<'a> RecordList<'a> {
    pub fn new(kind: RecordKind, items: impl IntoIterator<Item = &'a Record>) -> Self {
        Self {
            kind,
            items: items.into_iter().collect(),
        }
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &RecordId) -> Option<&'a Record> {
        self.items.iter().copied().find(|r| r.id() == id)
    }

    pub fn view(&self) -> ListView {
        if self.items.is_empty() {
            return ListView::Empty {
                message: "No records",
                hint: "Add a new one",
            };
        }
        let spec = self.kind.spec();
        ListView::Rows(
            self.items
                .iter()
                .map(|record| {
                    let columns = record.columns();
                    RowView {
                        id: record.id().clone(),
                        title: record.name().to_string(),
                        details: spec
                            .template
                            .iter()
                            .map(|slot| Detail {
                                icon: slot.icon,
                                label: spec.field(slot.field).map_or(slot.field, |f| f.label),
                                value: display_value(
                                    columns.get(slot.field),
                                    slot.field == spec.numeric_field,
                                ),
                            })
                            .collect(),
                        notes: record.notes().map(str::to_string),
                    }
                })
                .collect(),
        )
    }

    /// Hands the full record to `on_edit`; `false` if it is not listed
    pub fn edit(&self, id: &RecordId, on_edit: impl FnOnce(&Record)) -> bool {
        match self.get(id) {
            Some(record) => {
                on_edit(record);
                true
            }
            None => false,
        }
    }

    /// Asks for confirmation before deleting a listed record
    pub fn request_delete(&self, id: &RecordId) -> Option<DeleteConfirmation> {
        self.get(id).map(|record| DeleteConfirmation {
            id: record.id().clone(),
            name: record.name().to_string(),
        })
    }
}

fn display_value(value: Option<&Value>, money_column: bool) -> String {
    match value {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::Number(n)) if money_column => money(n.as_f64().unwrap_or(0.0)),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) if s.is_empty() => "-".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// A pending delete. Nothing happens until [`confirm`](Self::confirm).
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a delete only happens once confirmed"]
pub struct DeleteConfirmation {
    id: RecordId,
    name: String,
}

impl DeleteConfirmation {
    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn message(&self) -> String {
        format!(
            "Delete \"{}\"? This action cannot be undone.",
            self.name
        )
    }

    pub fn confirm<R>(self, on_delete: impl FnOnce(RecordId) -> R) -> R {
        on_delete(self.id)
    }

    pub fn dismiss(self) {}
}

impl fmt::Display for ListView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListView::Empty { message, hint } => writeln!(f, "{}. {}.", message, hint),
            ListView::Rows(rows) => {
                for row in rows {
                    writeln!(f, "[{}] {}", row.id, row.title)?;
                    let details: Vec<String> = row
                        .details
                        .iter()
                        .map(|d| format!("{} {}", d.icon.symbol(), d.value))
                        .collect();
                    writeln!(f, "    {}", details.join("   "))?;
                    if let Some(notes) = &row.notes {
                        writeln!(f, "    {}", notes)?;
                    }
                }
                Ok(())
            }
        }
    }
}
