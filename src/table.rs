//! Column-oriented catalog tables.
//!
//! A [`Catalog`] is a list of typed columns of equal length together with a [`Schema`]
//! that is resolved once, so name lookups do not have to search through all fields.
//! Masked cells are represented as `None` inside a [`ColumnData`]; the numeric sentinel
//! [`SENTINEL`] only shows up once [`Catalog::filled`] is called on a result.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use itertools::Itertools;

use crate::error::{CatalogError, Result};

/// Value written into structurally absent cells of merged catalogs.
pub const SENTINEL: f64 = -999.;

/// Type of the values stored in a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    /// 64 bit floating point numbers.
    Float,
    /// 64 bit signed integers.
    Int,
    /// Strings.
    Str,
}

/// A single, dynamically typed cell.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Floating point value.
    Float(f64),
    /// Integer value.
    Int(i64),
    /// String value.
    Str(String),
    /// Masked cell.
    Missing,
}

impl Value {
    /// Type of the value, or `None` if the cell is masked.
    pub fn kind(&self) -> Option<ColumnKind> {
        match self {
            Value::Float(_) => Some(ColumnKind::Float),
            Value::Int(_) => Some(ColumnKind::Int),
            Value::Str(_) => Some(ColumnKind::Str),
            Value::Missing => None,
        }
    }

    /// Whether this is a masked cell.
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Numeric value of the cell. Integers are converted to floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// The text of a string cell.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Float(v) if v.is_finite() && v.fract() == 0. => write!(f, "{v:.0}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Missing => write!(f, "--"),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Missing, Into::into)
    }
}

/// The cells of one column. `None` marks a masked cell.
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnData {
    /// 64-bit floats.
    Float(Vec<Option<f64>>),
    /// 64-bit integers.
    Int(Vec<Option<i64>>),
    /// Strings.
    Str(Vec<Option<String>>),
}

impl ColumnData {
    /// A fully masked column.
    pub fn missing(kind: ColumnKind, len: usize) -> Self {
        match kind {
            ColumnKind::Float => ColumnData::Float(vec![None; len]),
            ColumnKind::Int => ColumnData::Int(vec![None; len]),
            ColumnKind::Str => ColumnData::Str(vec![None; len]),
        }
    }

    /// Type of the stored values.
    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnData::Float(_) => ColumnKind::Float,
            ColumnData::Int(_) => ColumnKind::Int,
            ColumnData::Str(_) => ColumnKind::Str,
        }
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Float(v) => v.len(),
            ColumnData::Int(v) => v.len(),
            ColumnData::Str(v) => v.len(),
        }
    }

    /// Whether the column has no cells.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cell at `row`, or `None` if `row` is out of bounds.
    pub fn get(&self, row: usize) -> Option<Value> {
        match self {
            ColumnData::Float(v) => v.get(row).map(|c| Value::from(*c)),
            ColumnData::Int(v) => v.get(row).map(|c| Value::from(*c)),
            ColumnData::Str(v) => v.get(row).map(|c| Value::from(c.clone())),
        }
    }

    /// Whether the cell at `row` is masked.
    ///
    /// # Panics
    /// If `row` is out of bounds.
    pub fn is_missing(&self, row: usize) -> bool {
        match self {
            ColumnData::Float(v) => v[row].is_none(),
            ColumnData::Int(v) => v[row].is_none(),
            ColumnData::Str(v) => v[row].is_none(),
        }
    }

    /// Number of masked cells.
    pub fn n_missing(&self) -> usize {
        match self {
            ColumnData::Float(v) => v.iter().filter(|c| c.is_none()).count(),
            ColumnData::Int(v) => v.iter().filter(|c| c.is_none()).count(),
            ColumnData::Str(v) => v.iter().filter(|c| c.is_none()).count(),
        }
    }

    /// Numeric cell at `row`. `None` for masked cells and string columns.
    pub fn f64_at(&self, row: usize) -> Option<f64> {
        match self {
            ColumnData::Float(v) => v[row],
            ColumnData::Int(v) => v[row].map(|i| i as f64),
            ColumnData::Str(_) => None,
        }
    }

    /// All cells as floats, or `None` for a string column.
    pub fn to_f64(&self) -> Option<Vec<Option<f64>>> {
        match self {
            ColumnData::Float(v) => Some(v.clone()),
            ColumnData::Int(v) => Some(v.iter().map(|c| c.map(|i| i as f64)).collect()),
            ColumnData::Str(_) => None,
        }
    }

    /// Select rows by index.
    ///
    /// # Panics
    /// If any index is out of bounds.
    pub fn take(&self, rows: &[usize]) -> Self {
        match self {
            ColumnData::Float(v) => ColumnData::Float(rows.iter().map(|&r| v[r]).collect()),
            ColumnData::Int(v) => ColumnData::Int(rows.iter().map(|&r| v[r]).collect()),
            ColumnData::Str(v) => ColumnData::Str(rows.iter().map(|&r| v[r].clone()).collect()),
        }
    }

    /// Select rows by index, producing a masked cell wherever the index is `None`.
    ///
    /// # Panics
    /// If any index is out of bounds.
    pub fn gather(&self, rows: &[Option<usize>]) -> Self {
        match self {
            ColumnData::Float(v) => {
                ColumnData::Float(rows.iter().map(|r| r.and_then(|r| v[r])).collect())
            }
            ColumnData::Int(v) => {
                ColumnData::Int(rows.iter().map(|r| r.and_then(|r| v[r])).collect())
            }
            ColumnData::Str(v) => {
                ColumnData::Str(rows.iter().map(|r| r.and_then(|r| v[r].clone())).collect())
            }
        }
    }

    /// Replace masked cells by `value`, converted to the type of the column.
    ///
    /// Integer columns filled with a non-integral float are promoted to floats,
    /// string columns receive the textual representation of `value`.
    /// Filling with [`Value::Missing`] is a no-op.
    pub fn filled(&self, value: &Value) -> Self {
        if value.is_missing() {
            return self.clone();
        }
        match self {
            ColumnData::Float(v) => match value.as_f64() {
                Some(fill) => {
                    ColumnData::Float(v.iter().map(|c| Some(c.unwrap_or(fill))).collect())
                }
                None => self.clone(),
            },
            ColumnData::Int(v) => match value {
                Value::Int(fill) => {
                    ColumnData::Int(v.iter().map(|c| Some(c.unwrap_or(*fill))).collect())
                }
                Value::Float(fill) if fill.fract() == 0. => {
                    let fill = *fill as i64;
                    ColumnData::Int(v.iter().map(|c| Some(c.unwrap_or(fill))).collect())
                }
                Value::Float(fill) => ColumnData::Float(
                    v.iter()
                        .map(|c| Some(c.map_or(*fill, |i| i as f64)))
                        .collect(),
                ),
                _ => self.clone(),
            },
            ColumnData::Str(v) => {
                let fill = value.to_string();
                ColumnData::Str(
                    v.iter()
                        .map(|c| Some(c.clone().unwrap_or_else(|| fill.clone())))
                        .collect(),
                )
            }
        }
    }

    /// Convert an integer column into a float column. Other columns are returned as they are.
    pub(crate) fn promoted(self) -> Self {
        match self {
            ColumnData::Int(v) => {
                ColumnData::Float(v.into_iter().map(|c| c.map(|i| i as f64)).collect())
            }
            other => other,
        }
    }

    /// Append the cells of `other`. Integers and floats are unified to floats.
    fn append(self, other: ColumnData, name: &str) -> Result<Self> {
        match (self, other) {
            (ColumnData::Float(mut a), ColumnData::Float(b)) => {
                a.extend(b);
                Ok(ColumnData::Float(a))
            }
            (ColumnData::Int(mut a), ColumnData::Int(b)) => {
                a.extend(b);
                Ok(ColumnData::Int(a))
            }
            (ColumnData::Str(mut a), ColumnData::Str(b)) => {
                a.extend(b);
                Ok(ColumnData::Str(a))
            }
            (
                a @ (ColumnData::Float(_) | ColumnData::Int(_)),
                b @ (ColumnData::Float(_) | ColumnData::Int(_)),
            ) => a.promoted().append(b.promoted(), name),
            (a, b) => Err(CatalogError::TypeMismatch {
                column: name.to_owned(),
                expected: a.kind(),
                actual: b.kind(),
            }),
        }
    }

    /// Order of two cells. Masked cells sort last, NaN after all numbers.
    fn cmp_rows(&self, a: usize, b: usize) -> Ordering {
        fn masked_last<T>(
            a: &Option<T>,
            b: &Option<T>,
            cmp: impl Fn(&T, &T) -> Ordering,
        ) -> Ordering {
            match (a, b) {
                (Some(a), Some(b)) => cmp(a, b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        }
        match self {
            ColumnData::Float(v) => masked_last(&v[a], &v[b], |a, b| a.total_cmp(b)),
            ColumnData::Int(v) => masked_last(&v[a], &v[b], Ord::cmp),
            ColumnData::Str(v) => masked_last(&v[a], &v[b], Ord::cmp),
        }
    }
}

impl From<Vec<f64>> for ColumnData {
    fn from(value: Vec<f64>) -> Self {
        ColumnData::Float(value.into_iter().map(Some).collect())
    }
}

impl From<Vec<Option<f64>>> for ColumnData {
    fn from(value: Vec<Option<f64>>) -> Self {
        ColumnData::Float(value)
    }
}

impl From<Vec<i64>> for ColumnData {
    fn from(value: Vec<i64>) -> Self {
        ColumnData::Int(value.into_iter().map(Some).collect())
    }
}

impl From<Vec<Option<i64>>> for ColumnData {
    fn from(value: Vec<Option<i64>>) -> Self {
        ColumnData::Int(value)
    }
}

impl From<Vec<&str>> for ColumnData {
    fn from(value: Vec<&str>) -> Self {
        ColumnData::Str(value.into_iter().map(|s| Some(s.to_owned())).collect())
    }
}

impl From<Vec<String>> for ColumnData {
    fn from(value: Vec<String>) -> Self {
        ColumnData::Str(value.into_iter().map(Some).collect())
    }
}

/// Name, type, and unit of a column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    /// Column name, unique within a catalog.
    pub name: String,
    /// Type of the values.
    pub kind: ColumnKind,
    /// Physical unit, e.g. `deg`.
    pub unit: Option<String>,
}

impl Field {
    /// A field without unit.
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
            unit: None,
        }
    }

    /// Set the unit of the field.
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }
}

/// Ordered fields of a catalog with a cached name lookup.
#[derive(Clone, Debug, Default)]
pub struct Schema {
    fields: Vec<Field>,
    lookup: HashMap<String, usize>,
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl Schema {
    /// Build a schema, rejecting duplicate names.
    pub fn new(fields: Vec<Field>) -> Result<Self> {
        let mut schema = Self::default();
        for field in fields {
            schema.push(field)?;
        }
        Ok(schema)
    }

    /// Fields in column order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether there are no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Position of the field called `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.lookup.get(name).copied()
    }

    /// Whether a field called `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.lookup.contains_key(name)
    }

    /// Field names in column order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    fn push(&mut self, field: Field) -> Result<()> {
        if self.lookup.contains_key(&field.name) {
            return Err(CatalogError::DuplicateColumn { column: field.name });
        }
        self.lookup.insert(field.name.clone(), self.fields.len());
        self.fields.push(field);
        Ok(())
    }

    fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        let idx = self
            .index_of(old)
            .ok_or_else(|| CatalogError::missing_column(old))?;
        if old == new {
            return Ok(());
        }
        if self.contains(new) {
            return Err(CatalogError::DuplicateColumn {
                column: new.to_owned(),
            });
        }
        self.lookup.remove(old);
        self.lookup.insert(new.to_owned(), idx);
        self.fields[idx].name = new.to_owned();
        Ok(())
    }

    fn remove(&mut self, name: &str) -> Result<usize> {
        let idx = self
            .lookup
            .remove(name)
            .ok_or_else(|| CatalogError::missing_column(name))?;
        self.fields.remove(idx);
        for i in self.lookup.values_mut() {
            if *i > idx {
                *i -= 1;
            }
        }
        Ok(idx)
    }
}

/// A table of astronomical sources, one row per object.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Catalog {
    schema: Schema,
    columns: Vec<ColumnData>,
    n_rows: usize,
    meta: BTreeMap<String, String>,
}

impl Catalog {
    /// An empty catalog without any columns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from named columns.
    ///
    /// # Example
    /// ```
    /// # use catmatch::{Catalog, ColumnData};
    /// let catalog = Catalog::from_columns([
    ///     ("ra", ColumnData::from(vec![10., 11.])),
    ///     ("dec", ColumnData::from(vec![-5., -6.])),
    /// ])
    /// .unwrap();
    /// assert_eq!(catalog.len(), 2);
    /// ```
    pub fn from_columns<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, ColumnData)>,
        S: Into<String>,
    {
        let mut catalog = Self::new();
        for (name, data) in columns {
            catalog.add_column(name, data)?;
        }
        Ok(catalog)
    }

    /// Build a catalog from a schema and matching columns.
    pub(crate) fn from_parts(schema: Schema, columns: Vec<ColumnData>, n_rows: usize) -> Self {
        debug_assert_eq!(schema.len(), columns.len());
        debug_assert!(columns.iter().all(|c| c.len() == n_rows));
        Self {
            schema,
            columns,
            n_rows,
            meta: BTreeMap::new(),
        }
    }

    /// Add a column and return the catalog.
    pub fn with_column(mut self, name: impl Into<String>, data: ColumnData) -> Result<Self> {
        self.add_column(name, data)?;
        Ok(self)
    }

    /// Set a metadata entry and return the catalog.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Append a column at the end.
    ///
    /// The first column of an empty catalog defines the number of rows.
    pub fn add_column(&mut self, name: impl Into<String>, data: ColumnData) -> Result<()> {
        let name = name.into();
        if self.columns.is_empty() && self.n_rows == 0 {
            self.n_rows = data.len();
        } else if data.len() != self.n_rows {
            return Err(CatalogError::LengthMismatch {
                column: name,
                expected: self.n_rows,
                actual: data.len(),
            });
        }
        self.schema.push(Field::new(name, data.kind()))?;
        self.columns.push(data);
        Ok(())
    }

    /// Replace the data of an existing column, keeping its position and unit.
    pub fn replace_column(&mut self, name: &str, data: ColumnData) -> Result<()> {
        let idx = self.index(name)?;
        if data.len() != self.n_rows {
            return Err(CatalogError::LengthMismatch {
                column: name.to_owned(),
                expected: self.n_rows,
                actual: data.len(),
            });
        }
        self.schema.fields[idx].kind = data.kind();
        self.columns[idx] = data;
        Ok(())
    }

    /// Rename column `old` to `new`, keeping its position.
    pub fn rename_column(&mut self, old: &str, new: &str) -> Result<()> {
        self.schema.rename(old, new)
    }

    /// Remove a column and return its data.
    pub fn remove_column(&mut self, name: &str) -> Result<ColumnData> {
        let idx = self.schema.remove(name)?;
        Ok(self.columns.remove(idx))
    }

    /// Set the unit of a column.
    pub fn set_unit(&mut self, name: &str, unit: impl Into<String>) -> Result<()> {
        let idx = self.index(name)?;
        self.schema.fields[idx].unit = Some(unit.into());
        Ok(())
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.n_rows
    }

    /// Whether the catalog has no rows.
    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    /// Number of columns.
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Names, types and units of the columns.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Metadata such as the `survey` name.
    pub fn meta(&self) -> &BTreeMap<String, String> {
        &self.meta
    }

    /// Mutable access to the metadata.
    pub fn meta_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.meta
    }

    /// Column names in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.schema.names()
    }

    /// Whether a column called `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.schema.contains(name)
    }

    fn index(&self, name: &str) -> Result<usize> {
        self.schema
            .index_of(name)
            .ok_or_else(|| CatalogError::missing_column(name))
    }

    /// Data of column `name`.
    pub fn column(&self, name: &str) -> Result<&ColumnData> {
        Ok(&self.columns[self.index(name)?])
    }

    /// Column at position `idx` of the schema.
    pub(crate) fn column_at(&self, idx: usize) -> &ColumnData {
        &self.columns[idx]
    }

    /// Field of column `name`.
    pub fn field(&self, name: &str) -> Result<&Field> {
        Ok(&self.schema.fields[self.index(name)?])
    }

    /// Iterate over fields and their data in column order.
    pub fn columns(&self) -> impl Iterator<Item = (&Field, &ColumnData)> {
        self.schema.fields.iter().zip(&self.columns)
    }

    /// Cell of column `name` in `row`.
    ///
    /// # Panics
    /// If `row` is out of bounds.
    pub fn value(&self, row: usize, name: &str) -> Result<Value> {
        assert!(row < self.n_rows, "row {row} out of bounds");
        Ok(self.column(name)?.get(row).unwrap_or(Value::Missing))
    }

    /// All cells of a row in column order, or `None` if `row` is out of bounds.
    pub fn row(&self, row: usize) -> Option<Vec<Value>> {
        (row < self.n_rows).then(|| {
            self.columns
                .iter()
                .map(|c| c.get(row).unwrap_or(Value::Missing))
                .collect()
        })
    }

    /// Select rows by index, in the given order.
    ///
    /// # Panics
    /// If any index is out of bounds.
    pub fn take(&self, rows: &[usize]) -> Catalog {
        Catalog {
            schema: self.schema.clone(),
            columns: self.columns.iter().map(|c| c.take(rows)).collect(),
            n_rows: rows.len(),
            meta: self.meta.clone(),
        }
    }

    /// Copy of the catalog with every masked cell replaced by `value`.
    pub fn filled(&self, value: impl Into<Value>) -> Catalog {
        let value = value.into();
        let columns = self.columns.iter().map(|c| c.filled(&value)).collect_vec();
        let mut schema = self.schema.clone();
        for (field, column) in schema.fields.iter_mut().zip(&columns) {
            field.kind = column.kind();
        }
        Catalog {
            schema,
            columns,
            n_rows: self.n_rows,
            meta: self.meta.clone(),
        }
    }

    /// Whether any cell is masked.
    pub fn has_missing(&self) -> bool {
        self.columns.iter().any(|c| c.n_missing() > 0)
    }

    /// Stable order of the rows sorted by column `name`.
    pub fn argsort(&self, name: &str) -> Result<Vec<usize>> {
        let column = self.column(name)?;
        Ok((0..self.n_rows)
            .sorted_by(|&a, &b| column.cmp_rows(a, b))
            .collect())
    }

    /// Stack catalogs vertically.
    ///
    /// The result holds the union of all columns in order of first appearance.
    /// Cells of columns a catalog does not have are masked.
    /// Integer and float columns of the same name are unified to floats.
    pub fn vstack(catalogs: &[&Catalog]) -> Result<Catalog> {
        let mut fields: Vec<Field> = Vec::new();
        let mut lookup: HashMap<&str, usize> = HashMap::new();
        for field in catalogs.iter().flat_map(|c| c.schema.fields.iter()) {
            match lookup.get(field.name.as_str()) {
                Some(&idx) => {
                    let kind = &mut fields[idx].kind;
                    if *kind != field.kind {
                        match (*kind, field.kind) {
                            (ColumnKind::Int, ColumnKind::Float) => *kind = ColumnKind::Float,
                            (ColumnKind::Float, ColumnKind::Int) => {}
                            (expected, actual) => {
                                return Err(CatalogError::TypeMismatch {
                                    column: field.name.clone(),
                                    expected,
                                    actual,
                                });
                            }
                        }
                    }
                }
                None => {
                    lookup.insert(field.name.as_str(), fields.len());
                    fields.push(field.clone());
                }
            }
        }

        let n_rows = catalogs.iter().map(|c| c.len()).sum();
        let mut columns = Vec::with_capacity(fields.len());
        for field in &fields {
            let mut stacked = ColumnData::missing(field.kind, 0);
            for catalog in catalogs {
                let part = match catalog.schema.index_of(&field.name) {
                    Some(idx) => catalog.columns[idx].clone(),
                    None => ColumnData::missing(field.kind, catalog.len()),
                };
                stacked = stacked.append(part, &field.name)?;
            }
            columns.push(stacked);
        }

        let mut stacked = Catalog::from_parts(Schema::new(fields)?, columns, n_rows);
        if let Some(first) = catalogs.first() {
            stacked.meta = first.meta.clone();
        }
        Ok(stacked)
    }
}
