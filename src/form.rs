//! Create and edit form for any record kind

use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{Error, Result};
use crate::kinds::{FieldSpec, FieldType, RecordKind};
use crate::models::{Identity, Record, RecordId};
use crate::store::{Payload, RecordStore};

/// What a successful submit did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submitted {
    Created,
    Updated,
}

impl Submitted {
    pub fn message(self) -> &'static str {
        match self {
            Submitted::Created => "Record added",
            Submitted::Updated => "Record updated",
        }
    }
}

/// Form state: one text input per field of the kind, notes last.
#[derive(Debug, Clone)]
pub struct RecordForm {
    kind: RecordKind,
    editing: Option<RecordId>,
    values: Vec<(&'static FieldSpec, String)>,
}

impl RecordForm {
    /// Blank form for a new record
    pub fn create(kind: RecordKind) -> Self {
        Self {
            kind,
            editing: None,
            values: kind.spec().form_fields().map(|f| (f, String::new())).collect(),
        }
    }

    /// Form pre-filled from an existing record
    pub fn edit(record: &Record) -> Self {
        let kind = record.kind();
        let columns = record.columns();
        let values = kind
            .spec()
            .form_fields()
            .map(|f| (f, columns.get(f.name).map(input_text).unwrap_or_default()))
            .collect();
        Self {
            kind,
            editing: Some(record.id().clone()),
            values,
        }
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn editing(&self) -> Option<&RecordId> {
        self.editing.as_ref()
    }

    pub fn title(&self) -> String {
        let verb = if self.editing.is_some() { "Edit" } else { "Add" };
        format!("{} {}", verb, self.kind.title())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'static FieldSpec, &str)> {
        self.values.iter().map(|(f, v)| (*f, v.as_str()))
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(f, _)| f.name == name)
            .map(|(_, v)| v.as_str())
    }

    /// Sets an input; names outside the kind are rejected
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        let slot = self
            .values
            .iter_mut()
            .find(|(f, _)| f.name == name)
            .ok_or_else(|| Error::UnknownField(name.to_string()))?;
        slot.1 = value.into();
        Ok(())
    }

    /// Validated column values.
    ///
    /// Required text must not be blank and numbers must parse; empty
    /// optional inputs become null.
    pub fn payload(&self) -> Result<Payload> {
        let mut payload = Payload::new();
        for (field, raw) in &self.values {
            let trimmed = raw.trim();
            let value = match field.ty {
                FieldType::Text if trimmed.is_empty() && field.required => {
                    return Err(Error::validation(field.name, "is required"));
                }
                FieldType::Text if trimmed.is_empty() => Value::Null,
                FieldType::Text => Value::String(raw.clone()),
                FieldType::Number if trimmed.is_empty() && field.required => {
                    return Err(Error::validation(field.name, "is required"));
                }
                FieldType::Number if trimmed.is_empty() => Value::Null,
                FieldType::Number => match trimmed.parse::<f64>() {
                    Ok(n) if n.is_finite() => json!(n),
                    _ => return Err(Error::validation(field.name, "must be a number")),
                },
            };
            payload.insert(field.name.to_string(), value);
        }
        Ok(payload)
    }

    /// Writes the form to the store.
    ///
    /// Creates stamp `createdAt` and `createdBy`; updates stamp
    /// `updatedAt`. Nothing is sent without a signed-in user.
    pub async fn submit<S>(&self, store: &S, identity: Option<&Identity>) -> Result<Submitted>
    where
        S: RecordStore + ?Sized,
    {
        let identity = identity.ok_or(Error::AuthRequired)?;
        let mut payload = self.payload()?;
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

        match &self.editing {
            Some(id) => {
                debug!(table = self.kind.table(), %id, "updating record");
                payload.insert("updatedAt".to_string(), json!(now));
                store.update(self.kind, id, payload).await?;
                Ok(Submitted::Updated)
            }
            None => {
                debug!(table = self.kind.table(), "creating record");
                payload.insert("createdAt".to_string(), json!(now));
                payload.insert("createdBy".to_string(), json!(identity.id));
                store.insert(self.kind, payload).await?;
                Ok(Submitted::Created)
            }
        }
    }
}

fn input_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.as_f64().map(|f| f.to_string()).unwrap_or_else(|| n.to_string()),
        other => other.to_string(),
    }
}
