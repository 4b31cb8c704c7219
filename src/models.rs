//! Record types stored in the three dashboard tables

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::kinds::RecordKind;

/// Server-assigned row identifier.
///
/// The tables may use integer or UUID keys, so both JSON numbers and strings
/// are accepted and kept in their textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(s) => Ok(Self(s)),
            Value::Number(n) => Ok(Self(n.to_string())),
            other => Err(de::Error::custom(format!(
                "expected a string or number id, found {}",
                other
            ))),
        }
    }
}

/// Columns every table carries besides its own fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMeta {
    pub id: RecordId,
    #[serde(rename = "createdAt", default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt", default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "createdBy", default)]
    pub created_by: Option<String>,
}

/// Reads a timestamp written by any client.
///
/// RFC 3339 and Postgres' own `timestamptz` text are read as given; values
/// without an offset are taken as UTC. Anything else is treated as absent
/// so one odd row cannot fail a whole table.
fn lenient_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    let Some(Value::String(raw)) = Option::<Value>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let raw = raw.trim();
    let parsed = DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z"))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|naive| naive.and_utc())
        });
    Ok(parsed)
}

/// Reads a number that may arrive as JSON number, numeric string or null.
fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Supplier {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(rename = "supplierType", default)]
    pub supplier_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub cost: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub name: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub price: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A unit of paid piece work ("destajo")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieceWorkJob {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub name: String,
    #[serde(default)]
    pub worker: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub cost: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A row from any of the three tables
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Record {
    Supplier(Supplier),
    Material(Material),
    PieceWork(PieceWorkJob),
}

impl Record {
    /// Decodes a table row as the given kind.
    pub fn from_value(kind: RecordKind, value: Value) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            RecordKind::Supplier => Record::Supplier(serde_json::from_value(value)?),
            RecordKind::Material => Record::Material(serde_json::from_value(value)?),
            RecordKind::PieceWork => Record::PieceWork(serde_json::from_value(value)?),
        })
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Supplier(_) => RecordKind::Supplier,
            Record::Material(_) => RecordKind::Material,
            Record::PieceWork(_) => RecordKind::PieceWork,
        }
    }

    pub fn meta(&self) -> &RecordMeta {
        match self {
            Record::Supplier(r) => &r.meta,
            Record::Material(r) => &r.meta,
            Record::PieceWork(r) => &r.meta,
        }
    }

    pub fn id(&self) -> &RecordId {
        &self.meta().id
    }

    pub fn name(&self) -> &str {
        match self {
            Record::Supplier(r) => &r.name,
            Record::Material(r) => &r.name,
            Record::PieceWork(r) => &r.name,
        }
    }

    pub fn notes(&self) -> Option<&str> {
        match self {
            Record::Supplier(r) => r.notes.as_deref(),
            Record::Material(r) => r.notes.as_deref(),
            Record::PieceWork(r) => r.notes.as_deref(),
        }
        .filter(|notes| !notes.is_empty())
    }

    /// Wire representation keyed by column name
    pub fn columns(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Value of a column, `None` when absent or null
    pub fn field(&self, column: &str) -> Option<Value> {
        self.columns().remove(column).filter(|v| !v.is_null())
    }

    /// The column the kind aggregates and filters on (`price` or `cost`)
    pub fn numeric_value(&self) -> Option<f64> {
        match self {
            Record::Supplier(r) => r.cost,
            Record::Material(r) => r.price,
            Record::PieceWork(r) => r.cost,
        }
    }
}

/// The signed-in user as seen by the dashboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub email: Option<String>,
}

impl Identity {
    pub fn new(id: impl Into<String>, email: Option<String>) -> Self {
        Self {
            id: id.into(),
            email,
        }
    }

    /// Email when known, the user id otherwise
    pub fn display_name(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.id)
    }
}

impl From<&rocal_auth::User> for Identity {
    fn from(user: &rocal_auth::User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
        }
    }
}
