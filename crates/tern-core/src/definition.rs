//! Table definition builders.
//!
//! These types describe the tables an application expects to exist. They are
//! the input to [`create_snapshot`](crate::snapshot::create_snapshot) and are
//! deliberately thin: column types are logical type names (`"uuid"`,
//! `"text"`, an enum name, ...) that each dialect maps to an engine type.

use std::collections::BTreeMap;

/// Definition of a single column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    /// Column name.
    pub name: String,
    /// Logical type name.
    pub type_name: String,
    /// Whether the column allows NULL values.
    pub nullable: bool,
    /// Whether this column is part of the primary key.
    pub primary_key: bool,
    /// Whether this column has a UNIQUE constraint.
    pub unique: bool,
    /// Default value as a raw SQL expression.
    pub default: Option<String>,
    /// Free-form annotations carried into the snapshot.
    pub annotations: Vec<String>,
    /// Foreign key target as `(table, column)`.
    pub references: Option<(String, String)>,
}

impl ColumnDefinition {
    /// Creates a new NOT NULL column definition.
    #[must_use]
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            nullable: false,
            primary_key: false,
            unique: false,
            default: None,
            annotations: Vec::new(),
            references: None,
        }
    }

    /// Allows NULL values.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Sets the column as NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Marks the column as (part of) the primary key.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false; // Primary keys are always NOT NULL
        self
    }

    /// Sets the column as unique.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets the default value expression.
    #[must_use]
    pub fn default(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }

    /// Adds an annotation.
    #[must_use]
    pub fn annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotations.push(annotation.into());
        self
    }

    /// Declares a foreign key to `table.column`.
    #[must_use]
    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.references = Some((table.into(), column.into()));
        self
    }
}

/// Definition of a secondary index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition {
    /// Explicit index name; generated from the columns when absent.
    pub name: Option<String>,
    /// Indexed columns, in order.
    pub columns: Vec<String>,
    /// Whether this is a unique index.
    pub unique: bool,
}

/// Complete definition of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    /// Table name.
    pub name: String,
    /// Column definitions, in declaration order.
    pub columns: Vec<ColumnDefinition>,
    /// Index definitions.
    pub indexes: Vec<IndexDefinition>,
    /// Opaque metadata copied verbatim into the snapshot.
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl TableDefinition {
    /// Creates a new table definition.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            indexes: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Adds a column to the table.
    #[must_use]
    pub fn column(mut self, column: ColumnDefinition) -> Self {
        self.columns.push(column);
        self
    }

    /// Adds a non-unique index over `columns`.
    #[must_use]
    pub fn index<I, S>(self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push_index(None, columns, false)
    }

    /// Adds a unique index over `columns`.
    #[must_use]
    pub fn unique_index<I, S>(self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push_index(None, columns, true)
    }

    /// Adds an explicitly named index.
    #[must_use]
    pub fn named_index<I, S>(self, name: impl Into<String>, columns: I, unique: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push_index(Some(name.into()), columns, unique)
    }

    /// Attaches a metadata entry.
    #[must_use]
    pub fn metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    fn push_index<I, S>(mut self, name: Option<String>, columns: I, unique: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.indexes.push(IndexDefinition {
            name,
            columns: columns.into_iter().map(Into::into).collect(),
            unique,
        });
        self
    }

    /// Gets a column by name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Definition of an enumerated type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDefinition {
    /// Enum type name, referenced by columns as their type name.
    pub name: String,
    /// Allowed values, in declaration order.
    pub values: Vec<String>,
}

impl EnumDefinition {
    /// Creates a new enum definition.
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}
