/*!
 * Catalog entity models.
 *
 * The video table varies between deployed schema versions, so a video row is
 * carried as column names paired with dynamically typed values instead of a
 * fixed struct. Attribute tables (category, cast, genre, country) and their
 * junction tables are fixed and described by `AttributeKind` and `LinkKind`.
 */

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, Value, ValueRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::schema::VideoColumn;

/// Category id stored on a video that has never been looked up
pub const SENTINEL_CATEGORY: i64 = 0;

/// Year stored on a video that has never been looked up
pub const SENTINEL_YEAR: i64 = 1895;

/// A single column value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Real(v) => Some(*v),
            FieldValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "NULL"),
            FieldValue::Integer(v) => write!(f, "{}", v),
            FieldValue::Real(v) => write!(f, "{}", v),
            FieldValue::Text(v) => write!(f, "{}", v),
            FieldValue::Blob(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            FieldValue::Null => ToSqlOutput::Owned(Value::Null),
            FieldValue::Integer(v) => ToSqlOutput::Borrowed(ValueRef::Integer(*v)),
            FieldValue::Real(v) => ToSqlOutput::Borrowed(ValueRef::Real(*v)),
            FieldValue::Text(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
            FieldValue::Blob(v) => ToSqlOutput::Borrowed(ValueRef::Blob(v)),
        })
    }
}

impl FromSql for FieldValue {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Ok(match value {
            ValueRef::Null => FieldValue::Null,
            ValueRef::Integer(v) => FieldValue::Integer(v),
            ValueRef::Real(v) => FieldValue::Real(v),
            ValueRef::Text(v) => FieldValue::Text(String::from_utf8_lossy(v).into_owned()),
            ValueRef::Blob(v) => FieldValue::Blob(v.to_vec()),
        })
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(value.into())
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Integer(value as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Real(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

/// A full `videometadata` row: live column names paired positionally with values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataRecord {
    columns: Vec<String>,
    values: Vec<FieldValue>,
}

impl MetadataRecord {
    pub(crate) fn new(columns: Vec<String>, values: Vec<FieldValue>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Column names in table order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Values in table order
    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    /// Value of the named column, if the table has it
    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .map(|i| &self.values[i])
    }

    pub fn id(&self) -> Option<i64> {
        self.get("intid").and_then(FieldValue::as_i64)
    }

    pub fn title(&self) -> Option<&str> {
        self.get("title").and_then(FieldValue::as_str)
    }

    pub fn filename(&self) -> Option<&str> {
        self.get("filename").and_then(FieldValue::as_str)
    }

    /// True unless the row carries the (category 0, year 1895) "never looked up" marker
    pub fn has_metadata(&self) -> bool {
        let category = self.get("category").and_then(FieldValue::as_i64);
        let year = self.get("year").and_then(FieldValue::as_i64);
        !is_sentinel(category, year)
    }

    pub fn into_map(self) -> BTreeMap<String, FieldValue> {
        self.columns.into_iter().zip(self.values).collect()
    }
}

/// Whether a category/year pair is the "no metadata" sentinel
pub fn is_sentinel(category: Option<i64>, year: Option<i64>) -> bool {
    category == Some(SENTINEL_CATEGORY) && year == Some(SENTINEL_YEAR)
}

/// Named attributes a video can reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    Category,
    Cast,
    Genre,
    Country,
}

impl AttributeKind {
    pub const ALL: [AttributeKind; 4] = [
        AttributeKind::Category,
        AttributeKind::Cast,
        AttributeKind::Genre,
        AttributeKind::Country,
    ];

    /// Table holding the attribute names
    pub fn table(self) -> &'static str {
        match self {
            AttributeKind::Category => "videocategory",
            AttributeKind::Cast => "videocast",
            AttributeKind::Genre => "videogenre",
            AttributeKind::Country => "videocountry",
        }
    }

    /// Column holding the display name
    pub fn name_column(self) -> &'static str {
        match self {
            AttributeKind::Category => "category",
            AttributeKind::Cast => "cast",
            AttributeKind::Genre => "genre",
            AttributeKind::Country => "country",
        }
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name_column())
    }
}

/// Attributes linked to videos through a junction table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    Cast,
    Genre,
    Country,
}

impl LinkKind {
    pub const ALL: [LinkKind; 3] = [LinkKind::Cast, LinkKind::Genre, LinkKind::Country];

    pub fn attribute(self) -> AttributeKind {
        match self {
            LinkKind::Cast => AttributeKind::Cast,
            LinkKind::Genre => AttributeKind::Genre,
            LinkKind::Country => AttributeKind::Country,
        }
    }

    /// Junction table name
    pub fn junction_table(self) -> &'static str {
        match self {
            LinkKind::Cast => "videometadatacast",
            LinkKind::Genre => "videometadatagenre",
            LinkKind::Country => "videometadatacountry",
        }
    }

    /// Junction column referencing the attribute table
    pub fn attribute_column(self) -> &'static str {
        match self {
            LinkKind::Cast => "idcast",
            LinkKind::Genre => "idgenre",
            LinkKind::Country => "idcountry",
        }
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.attribute().fmt(f)
    }
}

/// Field/value pairs to write to a video row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataUpdate {
    fields: Vec<(VideoColumn, FieldValue)>,
}

impl MetadataUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing an earlier value for the same column
    pub fn set(mut self, column: VideoColumn, value: impl Into<FieldValue>) -> Self {
        let value = value.into();
        match self.fields.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((column, value)),
        }
        self
    }

    /// Set a field by its column name
    pub fn set_named(self, column: &str, value: impl Into<FieldValue>) -> anyhow::Result<Self> {
        let column: VideoColumn = column.parse()?;
        Ok(self.set(column, value))
    }

    pub fn fields(&self) -> &[(VideoColumn, FieldValue)] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Title search with optional narrowing fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoQuery {
    pub title: String,
    pub subtitle: Option<String>,
    pub season: Option<i64>,
    pub episode: Option<i64>,
}

impl VideoQuery {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn season(mut self, season: i64) -> Self {
        self.season = Some(season);
        self
    }

    pub fn episode(mut self, episode: i64) -> Self {
        self.episode = Some(episode);
        self
    }
}

/// Capitalize a display name: first character upper-case, the rest lower-case
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
