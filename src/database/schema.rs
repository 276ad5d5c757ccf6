/*!
 * Catalog schema: table bootstrap, live introspection and the schema descriptor.
 *
 * Deployed catalogs carry different generations of the `videometadata`
 * table. Rather than asking the database whether a column exists every time
 * a query is built, the store detects the layout once at startup and keeps a
 * `SchemaDescriptor`. SQL identifiers are only ever taken from `VideoColumn`
 * or the descriptor; values are always bound as parameters.
 */

use anyhow::{Context, Result};
use log::{debug, info, warn};
use rusqlite::{Connection, OptionalExtension};
use std::fmt;
use std::str::FromStr;

use super::models::{AttributeKind, FieldValue, LinkKind};
use crate::errors::StoreError;

/// Table holding one row per video file
pub const VIDEO_TABLE: &str = "videometadata";

/// Storage affinity of a video column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
}

impl ColumnType {
    /// Whether a value may be written to a column of this type. NULL fits
    /// anywhere and integers widen to reals.
    pub fn accepts(self, value: &FieldValue) -> bool {
        match (self, value) {
            (_, FieldValue::Null) => true,
            (ColumnType::Integer, v) => v.as_i64().is_some(),
            (ColumnType::Real, v) => v.as_f64().is_some(),
            (ColumnType::Text, v) => v.as_str().is_some(),
        }
    }

    fn sql(self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql())
    }
}

/// Known generations of the `videometadata` layout, oldest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SchemaVersion {
    /// Film-only layout without episode fields
    Legacy,
    /// Adds subtitle, season and episode plus artwork columns
    Episodic,
    /// Adds tagline, studio, release date, play tracking and hashes
    Extended,
}

impl SchemaVersion {
    pub const ALL: [SchemaVersion; 3] = [
        SchemaVersion::Legacy,
        SchemaVersion::Episodic,
        SchemaVersion::Extended,
    ];

    pub const LATEST: SchemaVersion = SchemaVersion::Extended;

    /// Columns present in this layout, in table order
    pub fn columns(self) -> Vec<VideoColumn> {
        VideoColumn::ALL
            .iter()
            .copied()
            .filter(|c| c.introduced_in() <= self)
            .collect()
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaVersion::Legacy => write!(f, "legacy"),
            SchemaVersion::Episodic => write!(f, "episodic"),
            SchemaVersion::Extended => write!(f, "extended"),
        }
    }
}

/// Every `videometadata` column any known layout carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoColumn {
    Intid,
    Title,
    Subtitle,
    Tagline,
    Director,
    Studio,
    Plot,
    Rating,
    Inetref,
    Collectionref,
    Homepage,
    Year,
    Releasedate,
    Userrating,
    Length,
    Playcount,
    Season,
    Episode,
    Showlevel,
    Filename,
    Hash,
    Coverfile,
    Childid,
    Browse,
    Watched,
    Processed,
    Playcommand,
    Category,
    Trailer,
    Host,
    Screenshot,
    Banner,
    Fanart,
    Insertdate,
    Contenttype,
}

impl VideoColumn {
    pub const ALL: [VideoColumn; 35] = [
        VideoColumn::Intid,
        VideoColumn::Title,
        VideoColumn::Subtitle,
        VideoColumn::Tagline,
        VideoColumn::Director,
        VideoColumn::Studio,
        VideoColumn::Plot,
        VideoColumn::Rating,
        VideoColumn::Inetref,
        VideoColumn::Collectionref,
        VideoColumn::Homepage,
        VideoColumn::Year,
        VideoColumn::Releasedate,
        VideoColumn::Userrating,
        VideoColumn::Length,
        VideoColumn::Playcount,
        VideoColumn::Season,
        VideoColumn::Episode,
        VideoColumn::Showlevel,
        VideoColumn::Filename,
        VideoColumn::Hash,
        VideoColumn::Coverfile,
        VideoColumn::Childid,
        VideoColumn::Browse,
        VideoColumn::Watched,
        VideoColumn::Processed,
        VideoColumn::Playcommand,
        VideoColumn::Category,
        VideoColumn::Trailer,
        VideoColumn::Host,
        VideoColumn::Screenshot,
        VideoColumn::Banner,
        VideoColumn::Fanart,
        VideoColumn::Insertdate,
        VideoColumn::Contenttype,
    ];

    /// Columns the store cannot work without
    pub const CORE: [VideoColumn; 5] = [
        VideoColumn::Intid,
        VideoColumn::Title,
        VideoColumn::Filename,
        VideoColumn::Category,
        VideoColumn::Year,
    ];

    /// SQL column name
    pub fn name(self) -> &'static str {
        match self {
            VideoColumn::Intid => "intid",
            VideoColumn::Title => "title",
            VideoColumn::Subtitle => "subtitle",
            VideoColumn::Tagline => "tagline",
            VideoColumn::Director => "director",
            VideoColumn::Studio => "studio",
            VideoColumn::Plot => "plot",
            VideoColumn::Rating => "rating",
            VideoColumn::Inetref => "inetref",
            VideoColumn::Collectionref => "collectionref",
            VideoColumn::Homepage => "homepage",
            VideoColumn::Year => "year",
            VideoColumn::Releasedate => "releasedate",
            VideoColumn::Userrating => "userrating",
            VideoColumn::Length => "length",
            VideoColumn::Playcount => "playcount",
            VideoColumn::Season => "season",
            VideoColumn::Episode => "episode",
            VideoColumn::Showlevel => "showlevel",
            VideoColumn::Filename => "filename",
            VideoColumn::Hash => "hash",
            VideoColumn::Coverfile => "coverfile",
            VideoColumn::Childid => "childid",
            VideoColumn::Browse => "browse",
            VideoColumn::Watched => "watched",
            VideoColumn::Processed => "processed",
            VideoColumn::Playcommand => "playcommand",
            VideoColumn::Category => "category",
            VideoColumn::Trailer => "trailer",
            VideoColumn::Host => "host",
            VideoColumn::Screenshot => "screenshot",
            VideoColumn::Banner => "banner",
            VideoColumn::Fanart => "fanart",
            VideoColumn::Insertdate => "insertdate",
            VideoColumn::Contenttype => "contenttype",
        }
    }

    pub fn column_type(self) -> ColumnType {
        match self {
            VideoColumn::Intid
            | VideoColumn::Collectionref
            | VideoColumn::Year
            | VideoColumn::Length
            | VideoColumn::Playcount
            | VideoColumn::Season
            | VideoColumn::Episode
            | VideoColumn::Showlevel
            | VideoColumn::Childid
            | VideoColumn::Browse
            | VideoColumn::Watched
            | VideoColumn::Processed
            | VideoColumn::Category
            | VideoColumn::Contenttype => ColumnType::Integer,
            VideoColumn::Userrating => ColumnType::Real,
            _ => ColumnType::Text,
        }
    }

    /// Oldest layout carrying this column
    pub fn introduced_in(self) -> SchemaVersion {
        match self {
            VideoColumn::Intid
            | VideoColumn::Title
            | VideoColumn::Director
            | VideoColumn::Plot
            | VideoColumn::Rating
            | VideoColumn::Inetref
            | VideoColumn::Year
            | VideoColumn::Userrating
            | VideoColumn::Length
            | VideoColumn::Showlevel
            | VideoColumn::Filename
            | VideoColumn::Coverfile
            | VideoColumn::Childid
            | VideoColumn::Browse
            | VideoColumn::Playcommand
            | VideoColumn::Category => SchemaVersion::Legacy,
            VideoColumn::Subtitle
            | VideoColumn::Season
            | VideoColumn::Episode
            | VideoColumn::Trailer
            | VideoColumn::Host
            | VideoColumn::Screenshot
            | VideoColumn::Banner
            | VideoColumn::Fanart
            | VideoColumn::Insertdate => SchemaVersion::Episodic,
            VideoColumn::Tagline
            | VideoColumn::Studio
            | VideoColumn::Collectionref
            | VideoColumn::Homepage
            | VideoColumn::Releasedate
            | VideoColumn::Playcount
            | VideoColumn::Hash
            | VideoColumn::Watched
            | VideoColumn::Processed
            | VideoColumn::Contenttype => SchemaVersion::Extended,
        }
    }

    // Year 1895 and category 0 double as the "no metadata" sentinel.
    fn constraints(self) -> &'static str {
        match self {
            VideoColumn::Intid => "PRIMARY KEY AUTOINCREMENT",
            VideoColumn::Title
            | VideoColumn::Subtitle
            | VideoColumn::Director
            | VideoColumn::Rating
            | VideoColumn::Inetref
            | VideoColumn::Homepage
            | VideoColumn::Filename
            | VideoColumn::Hash
            | VideoColumn::Coverfile
            | VideoColumn::Host => "NOT NULL DEFAULT ''",
            VideoColumn::Collectionref
            | VideoColumn::Childid => "NOT NULL DEFAULT -1",
            VideoColumn::Year => "NOT NULL DEFAULT 1895",
            VideoColumn::Userrating
            | VideoColumn::Length
            | VideoColumn::Playcount
            | VideoColumn::Season
            | VideoColumn::Episode
            | VideoColumn::Watched
            | VideoColumn::Processed
            | VideoColumn::Category
            | VideoColumn::Contenttype => "NOT NULL DEFAULT 0",
            VideoColumn::Showlevel
            | VideoColumn::Browse => "NOT NULL DEFAULT 1",
            VideoColumn::Insertdate => "DEFAULT CURRENT_TIMESTAMP",
            _ => "",
        }
    }

    fn definition(self) -> String {
        format!("{} {} {}", self.name(), self.column_type().sql(), self.constraints())
            .trim_end()
            .to_string()
    }
}

impl fmt::Display for VideoColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VideoColumn {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VideoColumn::ALL
            .iter()
            .copied()
            .find(|c| c.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| StoreError::UnknownColumn(s.to_string()))
    }
}

/// Quote an SQL identifier
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Create any missing catalog tables in the layout of `version`.
///
/// Existing tables are left exactly as they are.
pub fn initialize_schema(conn: &Connection, version: SchemaVersion) -> Result<()> {
    if list_columns(conn, VIDEO_TABLE)?.is_none() {
        info!("Creating catalog tables ({} layout)", version);
    } else {
        debug!("Catalog tables already present, creating only missing ones");
    }

    let columns: Vec<String> = version.columns().into_iter().map(VideoColumn::definition).collect();
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n);",
        VIDEO_TABLE,
        columns.join(",\n    ")
    ))
    .context("Failed to create videometadata table")?;

    for kind in AttributeKind::ALL {
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                intid INTEGER PRIMARY KEY AUTOINCREMENT,
                {name} TEXT NOT NULL
            );
            "#,
            table = kind.table(),
            name = quote_ident(kind.name_column()),
        ))
        .with_context(|| format!("Failed to create {} table", kind.table()))?;
    }

    for link in LinkKind::ALL {
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                idvideo INTEGER NOT NULL,
                {column} INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_{table}_video ON {table}(idvideo);
            "#,
            table = link.junction_table(),
            column = link.attribute_column(),
        ))
        .with_context(|| format!("Failed to create {} table", link.junction_table()))?;
    }

    Ok(())
}

/// Column names of `table` in declaration order, or `None` if no such table exists
pub fn list_columns(conn: &Connection, table: &str) -> Result<Option<Vec<String>>> {
    let mut stmt = conn
        .prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")
        .context("Failed to prepare column introspection")?;

    let columns = stmt
        .query_map([table], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<String>>>()
        .with_context(|| format!("Failed to describe table {}", table))?;

    // Every table has at least one column, so nothing back means no table.
    if columns.is_empty() {
        Ok(None)
    } else {
        Ok(Some(columns))
    }
}

/// Whether a table of that name exists
pub fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Startup snapshot of the deployed `videometadata` layout
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDescriptor {
    version: Option<SchemaVersion>,
    live_columns: Vec<String>,
    present: Vec<VideoColumn>,
}

impl SchemaDescriptor {
    /// Introspect the video table once and describe it
    pub fn detect(conn: &Connection) -> Result<Self> {
        let live_columns = list_columns(conn, VIDEO_TABLE)?
            .ok_or_else(|| StoreError::MissingTable(VIDEO_TABLE.to_string()))?;

        let descriptor = Self::from_columns(live_columns)?;
        debug!(
            "Detected videometadata layout {} with {} known columns",
            descriptor
                .version
                .map_or_else(|| "custom".to_string(), |v| v.to_string()),
            descriptor.present.len()
        );
        Ok(descriptor)
    }

    /// Describe a layout from its column names
    pub fn from_columns(live_columns: Vec<String>) -> Result<Self> {
        let mut present = Vec::new();
        for name in &live_columns {
            match name.parse::<VideoColumn>() {
                Ok(column) => present.push(column),
                Err(_) => warn!("Ignoring unknown videometadata column for writes: {}", name),
            }
        }

        let missing: Vec<String> = VideoColumn::CORE
            .iter()
            .filter(|c| !present.contains(c))
            .map(|c| c.name().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(StoreError::UnsupportedSchema { missing }.into());
        }

        let version = SchemaVersion::ALL
            .iter()
            .rev()
            .copied()
            .find(|v| v.columns().iter().all(|c| present.contains(c)));

        Ok(Self {
            version,
            live_columns,
            present,
        })
    }

    /// Newest known layout fully present, `None` for a partial custom layout
    pub fn version(&self) -> Option<SchemaVersion> {
        self.version
    }

    /// Live column names in table order
    pub fn live_columns(&self) -> &[String] {
        &self.live_columns
    }

    pub fn has(&self, column: VideoColumn) -> bool {
        self.present.contains(&column)
    }

    /// Fail with `UnknownColumn` unless the deployed table has `column`
    pub fn require(&self, column: VideoColumn) -> Result<(), StoreError> {
        if self.has(column) {
            Ok(())
        } else {
            Err(StoreError::UnknownColumn(column.name().to_string()))
        }
    }

    /// Quoted, comma-separated live columns for a full-row SELECT
    pub(crate) fn select_list(&self) -> String {
        self.live_columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Drop all catalog tables (for testing purposes only)
#[cfg(test)]
pub fn drop_all_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DROP TABLE IF EXISTS videometadatacast;
        DROP TABLE IF EXISTS videometadatagenre;
        DROP TABLE IF EXISTS videometadatacountry;
        DROP TABLE IF EXISTS videocast;
        DROP TABLE IF EXISTS videogenre;
        DROP TABLE IF EXISTS videocountry;
        DROP TABLE IF EXISTS videocategory;
        DROP TABLE IF EXISTS videometadata;
        "#,
    )?;
    Ok(())
}
