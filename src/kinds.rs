//! The three record kinds and the table that describes each of them.
//!
//! Everything kind-specific (backing table, form fields, the numeric column
//! used for filtering and totals, the list template) lives in [`KindSpec`];
//! the rest of the dashboard is written once against it.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKind {
    Supplier,
    Material,
    PieceWork,
}

impl RecordKind {
    /// All kinds in tab order
    pub const ALL: [RecordKind; 3] = [
        RecordKind::Supplier,
        RecordKind::Material,
        RecordKind::PieceWork,
    ];

    pub fn spec(self) -> &'static KindSpec {
        &SPECS[self.index()]
    }

    pub fn table(self) -> &'static str {
        self.spec().table
    }

    pub fn title(self) -> &'static str {
        self.spec().title
    }

    pub(crate) fn index(self) -> usize {
        match self {
            RecordKind::Supplier => 0,
            RecordKind::Material => 1,
            RecordKind::PieceWork => 2,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKind(pub String);

impl fmt::Display for UnknownKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown record kind '{}' (expected suppliers, materials or jobs)",
            self.0
        )
    }
}

impl std::error::Error for UnknownKind {}

impl FromStr for RecordKind {
    type Err = UnknownKind;

    /// Accepts the English tab name, its singular, or the table name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "suppliers" | "supplier" | "proveedores" => Ok(RecordKind::Supplier),
            "materials" | "material" | "materiales" => Ok(RecordKind::Material),
            "jobs" | "job" | "piece-work" | "piecework" | "destajos" => Ok(RecordKind::PieceWork),
            _ => Err(UnknownKind(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Number,
}

/// One editable column
#[derive(Debug, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub ty: FieldType,
    pub required: bool,
}

/// Icons used by the list template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Icon {
    Phone,
    Tag,
    Dollar,
    Package,
    User,
}

impl Icon {
    pub fn symbol(self) -> &'static str {
        match self {
            Icon::Phone => "☎",
            Icon::Tag => "#",
            Icon::Dollar => "$",
            Icon::Package => "▪",
            Icon::User => "@",
        }
    }
}

/// A column shown under the record name in the list
#[derive(Debug, PartialEq, Eq)]
pub struct DisplaySlot {
    pub field: &'static str,
    pub icon: Icon,
}

#[derive(Debug, PartialEq, Eq)]
pub struct KindSpec {
    pub kind: RecordKind,
    pub table: &'static str,
    pub title: &'static str,
    pub fields: &'static [FieldSpec],
    pub numeric_field: &'static str,
    pub template: &'static [DisplaySlot],
}

/// Free-text column shared by every kind, always last in the form
pub const NOTES: FieldSpec = FieldSpec {
    name: "notes",
    label: "Notes",
    ty: FieldType::Text,
    required: false,
};

impl KindSpec {
    /// Form fields in display order, notes included
    pub fn form_fields(&self) -> impl Iterator<Item = &'static FieldSpec> {
        self.fields.iter().chain(std::iter::once(&NOTES))
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.form_fields().find(|f| f.name == name)
    }
}

const fn text(name: &'static str, label: &'static str, required: bool) -> FieldSpec {
    FieldSpec {
        name,
        label,
        ty: FieldType::Text,
        required,
    }
}

const fn number(name: &'static str, label: &'static str, required: bool) -> FieldSpec {
    FieldSpec {
        name,
        label,
        ty: FieldType::Number,
        required,
    }
}

static SPECS: [KindSpec; 3] = [
    KindSpec {
        kind: RecordKind::Supplier,
        table: "proveedores",
        title: "Suppliers",
        fields: &[
            text("name", "Name", true),
            text("phone", "Phone", true),
            text("supplierType", "Supplier type", true),
            number("cost", "Cost", true),
        ],
        numeric_field: "cost",
        template: &[
            DisplaySlot {
                field: "phone",
                icon: Icon::Phone,
            },
            DisplaySlot {
                field: "supplierType",
                icon: Icon::Tag,
            },
            DisplaySlot {
                field: "cost",
                icon: Icon::Dollar,
            },
        ],
    },
    KindSpec {
        kind: RecordKind::Material,
        table: "materiales",
        title: "Materials",
        fields: &[
            text("name", "Material", true),
            text("unit", "Unit", false),
            number("price", "Price", false),
            text("category", "Category", false),
        ],
        numeric_field: "price",
        template: &[
            DisplaySlot {
                field: "unit",
                icon: Icon::Package,
            },
            DisplaySlot {
                field: "price",
                icon: Icon::Dollar,
            },
            DisplaySlot {
                field: "category",
                icon: Icon::Tag,
            },
        ],
    },
    KindSpec {
        kind: RecordKind::PieceWork,
        table: "destajos",
        title: "Piece work",
        fields: &[
            text("name", "Job", true),
            text("worker", "Worker", false),
            number("cost", "Cost", false),
            text("status", "Status", false),
        ],
        numeric_field: "cost",
        template: &[
            DisplaySlot {
                field: "worker",
                icon: Icon::User,
            },
            DisplaySlot {
                field: "cost",
                icon: Icon::Dollar,
            },
            DisplaySlot {
                field: "status",
                icon: Icon::Tag,
            },
        ],
    },
];
