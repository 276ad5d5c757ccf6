/*!
 * Metadata store: lookup, lookup-or-create and cross-reference maintenance
 * over the video catalog tables.
 *
 * Single statements autocommit. Operations made of several statements
 * (pruning one video, linking, unlinking) run inside one transaction each.
 */

use anyhow::{Context, Result};
use log::{debug, info};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use super::connection::{DatabaseConnection, UNICODE_LOWER};
use super::models::{
    capitalize, is_sentinel, AttributeKind, FieldValue, LinkKind, MetadataRecord,
    MetadataUpdate, VideoQuery, SENTINEL_CATEGORY, SENTINEL_YEAR,
};
use super::schema::{self, quote_ident, SchemaDescriptor, VideoColumn, VIDEO_TABLE};
use crate::app_config::Config;
use crate::errors::StoreError;
use crate::file_utils::{FileManager, PathProbe};

/// Catalog data-access layer
pub struct MetadataStore {
    /// Database connection
    db: DatabaseConnection,
    /// Video table layout detected at startup
    descriptor: SchemaDescriptor,
    /// Existence check used by the prune pass
    probe: Box<dyn PathProbe>,
}

impl MetadataStore {
    /// Create a store over an open connection, detecting the video table layout
    pub fn new(db: DatabaseConnection) -> Result<Self> {
        Self::with_probe(db, FileManager)
    }

    /// Create a store with a custom filesystem existence check
    pub fn with_probe<P: PathProbe + 'static>(db: DatabaseConnection, probe: P) -> Result<Self> {
        let descriptor = db
            .execute(SchemaDescriptor::detect)
            .context("Failed to detect catalog schema")?;

        Ok(Self {
            db,
            descriptor,
            probe: Box::new(probe),
        })
    }

    /// Open the store described by the configuration
    pub fn open(config: &Config) -> Result<Self> {
        config.validate()?;
        let db = DatabaseConnection::from_config(&config.database)?;
        Self::new(db)
    }

    /// Create a store over an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        Self::new(DatabaseConnection::new_in_memory()?)
    }

    /// Video table layout detected when the store was created
    pub fn descriptor(&self) -> &SchemaDescriptor {
        &self.descriptor
    }

    /// Underlying connection handle
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    // =========================================================================
    // Pruning
    // =========================================================================

    /// Remove every video whose file no longer exists, with its cast, genre and
    /// country links
    pub fn prune_missing(&self) -> Result<()> {
        let videos: Vec<(i64, String)> = self.db.execute(|conn| {
            let mut stmt = conn.prepare("SELECT intid, filename FROM videometadata")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get(0)?, row.get::<_, Option<String>>(1)?.unwrap_or_default()))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })?;

        let mut removed = 0usize;
        for (id, filename) in &videos {
            if self.probe.exists(Path::new(filename)) {
                continue;
            }

            info!("{} does not exist, removing metadata", filename);
            self.db
                .transaction(|tx| {
                    tx.execute("DELETE FROM videometadata WHERE intid = ?1", [id])?;
                    for link in LinkKind::ALL {
                        Self::unlink_all_sync(tx, link, *id)?;
                    }
                    Ok(())
                })
                .with_context(|| format!("Failed to remove metadata for video {}", id))?;
            removed += 1;
        }

        debug!("Prune checked {} videos, removed {}", videos.len(), removed);
        Ok(())
    }

    // =========================================================================
    // Attribute Operations
    // =========================================================================

    /// Find a category by name (case-insensitive), creating it when missing
    pub fn lookup_or_create_category(&self, name: &str) -> Result<i64> {
        self.lookup_or_create(AttributeKind::Category, name)
    }

    /// Find a genre by name (case-insensitive), creating it when missing
    pub fn lookup_or_create_genre(&self, name: &str) -> Result<i64> {
        self.lookup_or_create(AttributeKind::Genre, name)
    }

    /// Find a country by name (case-insensitive), creating it when missing
    pub fn lookup_or_create_country(&self, name: &str) -> Result<i64> {
        self.lookup_or_create(AttributeKind::Country, name)
    }

    /// Find a cast member by name (case-insensitive), creating it when missing
    pub fn lookup_or_create_cast_member(&self, name: &str) -> Result<i64> {
        self.lookup_or_create(AttributeKind::Cast, name)
    }

    /// Find an attribute by name, inserting the capitalized name when missing
    ///
    /// Names compare case-insensitively under Unicode rules. Surrounding
    /// whitespace is kept and takes part in the comparison; a name made only of
    /// whitespace is rejected.
    pub fn lookup_or_create(&self, kind: AttributeKind, name: &str) -> Result<i64> {
        self.db.execute(|conn| Self::lookup_or_create_sync(conn, kind, name))
    }

    fn lookup_or_create_sync(conn: &Connection, kind: AttributeKind, name: &str) -> Result<i64> {
        if name.trim().is_empty() {
            return Err(StoreError::InvalidName(name.to_string()).into());
        }

        let column = quote_ident(kind.name_column());
        let existing = conn
            .query_row(
                &format!(
                    "SELECT intid FROM {table} WHERE {lower}({column}) = {lower}(?1) \
                     ORDER BY intid LIMIT 1",
                    table = kind.table(),
                    lower = UNICODE_LOWER,
                    column = column
                ),
                [name],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;

        if let Some(id) = existing {
            return Ok(id);
        }

        let display = capitalize(name);
        conn.execute(
            &format!("INSERT INTO {} ({}) VALUES (?1)", kind.table(), column),
            [&display],
        )?;
        let id = conn.last_insert_rowid();
        debug!("Created {} {:?} with id {}", kind, display, id);
        Ok(id)
    }

    // =========================================================================
    // Video Lookups
    // =========================================================================

    /// Id of the video stored at exactly this path
    pub fn get_video_id_by_path(&self, path: &str) -> Result<Option<i64>> {
        self.db.execute(|conn| {
            let id = conn
                .query_row(
                    "SELECT intid FROM videometadata WHERE filename = ?1 ORDER BY intid LIMIT 1",
                    [path],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(id)
        })
    }

    /// Lowest id among videos matching the query
    ///
    /// Narrowing fields whose column the deployed table lacks are ignored.
    pub fn find_video_id(&self, query: &VideoQuery) -> Result<Option<i64>> {
        Ok(self.query_video_ids(query, Some(1))?.into_iter().next())
    }

    /// All ids of videos matching the query, ascending; `None` when nothing matches
    pub fn find_video_ids(&self, query: &VideoQuery) -> Result<Option<Vec<i64>>> {
        let ids = self.query_video_ids(query, None)?;
        Ok(if ids.is_empty() { None } else { Some(ids) })
    }

    fn query_video_ids(&self, query: &VideoQuery, limit: Option<usize>) -> Result<Vec<i64>> {
        let mut sql = String::from("SELECT intid FROM videometadata WHERE title = ?1");
        let mut values = vec![FieldValue::from(query.title.as_str())];

        let filters = [
            (VideoColumn::Subtitle, query.subtitle.clone().filter(|s| !s.is_empty()).map(FieldValue::from)),
            (VideoColumn::Season, query.season.map(FieldValue::from)),
            (VideoColumn::Episode, query.episode.map(FieldValue::from)),
        ];
        for (column, value) in filters {
            let Some(value) = value else { continue };
            if !self.descriptor.has(column) {
                debug!("Ignoring {} filter, column not in videometadata", column);
                continue;
            }
            values.push(value);
            sql.push_str(&format!(" AND {} = ?{}", quote_ident(column.name()), values.len()));
        }

        sql.push_str(" ORDER BY intid");
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        self.db.execute(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let ids = stmt
                .query_map(params_from_iter(values.iter()), |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<i64>>>()?;
            Ok(ids)
        })
    }

    /// Whether the video at this path has been looked up.
    ///
    /// False when there is no row, and when the row still carries the
    /// category 0 / year 1895 placeholder.
    pub fn has_metadata(&self, path: &str) -> Result<bool> {
        self.db.execute(|conn| {
            let row = conn
                .query_row(
                    "SELECT category, year FROM videometadata WHERE filename = ?1 ORDER BY intid LIMIT 1",
                    [path],
                    |row| Ok((row.get::<_, Option<i64>>(0)?, row.get::<_, Option<i64>>(1)?)),
                )
                .optional()?;

            Ok(match row {
                Some((category, year)) => !is_sentinel(category, year),
                None => false,
            })
        })
    }

    // =========================================================================
    // Video Records
    // =========================================================================

    /// Full row for a video id
    pub fn get_metadata_record(&self, id: i64) -> Result<Option<MetadataRecord>> {
        let columns = self.descriptor.live_columns().to_vec();
        let sql = format!(
            "SELECT {} FROM videometadata WHERE intid = ?1",
            self.descriptor.select_list()
        );

        self.db.execute(|conn| {
            let values = conn
                .query_row(&sql, [id], |row| {
                    (0..columns.len())
                        .map(|i| row.get::<_, FieldValue>(i))
                        .collect::<rusqlite::Result<Vec<_>>>()
                })
                .optional()?;
            Ok(values.map(|values| MetadataRecord::new(columns, values)))
        })
    }

    /// Full row for a video id keyed by column name
    pub fn get_metadata_map(&self, id: i64) -> Result<Option<BTreeMap<String, FieldValue>>> {
        Ok(self.get_metadata_record(id)?.map(MetadataRecord::into_map))
    }

    /// Insert a new video row (`id` is `None`) or update an existing one.
    ///
    /// An insert returns the new id. An update touches only the supplied
    /// fields and returns `None`.
    pub fn upsert_metadata(&self, update: &MetadataUpdate, id: Option<i64>) -> Result<Option<i64>> {
        for (column, value) in update.fields() {
            self.descriptor.require(*column)?;
            let expected = column.column_type();
            if !expected.accepts(value) {
                return Err(StoreError::TypeMismatch {
                    column: column.name().to_string(),
                    expected,
                }
                .into());
            }
        }

        let columns: Vec<String> = update
            .fields()
            .iter()
            .map(|(column, _)| quote_ident(column.name()))
            .collect();
        let values: Vec<&FieldValue> = update.fields().iter().map(|(_, value)| value).collect();

        match id {
            None => {
                let sql = if update.is_empty() {
                    format!("INSERT INTO {} DEFAULT VALUES", VIDEO_TABLE)
                } else {
                    let placeholders: Vec<String> =
                        (1..=columns.len()).map(|i| format!("?{}", i)).collect();
                    format!(
                        "INSERT INTO {} ({}) VALUES ({})",
                        VIDEO_TABLE,
                        columns.join(", "),
                        placeholders.join(", ")
                    )
                };

                let new_id = self.db.execute(|conn| {
                    conn.execute(&sql, params_from_iter(values.iter()))?;
                    Ok(conn.last_insert_rowid())
                })?;
                debug!("Inserted metadata with id {}", new_id);
                Ok(Some(new_id))
            }
            Some(id) => {
                debug!("Updating metadata for {}", id);
                if update.is_empty() {
                    return Ok(None);
                }

                let assignments: Vec<String> = columns
                    .iter()
                    .enumerate()
                    .map(|(i, column)| format!("{} = ?{}", column, i + 1))
                    .collect();
                let sql = format!(
                    "UPDATE {} SET {} WHERE intid = ?{}",
                    VIDEO_TABLE,
                    assignments.join(", "),
                    columns.len() + 1
                );

                let id_value = FieldValue::Integer(id);
                self.db.execute(|conn| {
                    conn.execute(
                        &sql,
                        params_from_iter(values.iter().copied().chain(std::iter::once(&id_value))),
                    )?;
                    Ok(())
                })?;
                Ok(None)
            }
        }
    }

    // =========================================================================
    // Link Operations
    // =========================================================================

    /// Link a cast member to a video, creating the cast member if needed
    pub fn link_cast_member(&self, name: &str, video_id: i64) -> Result<i64> {
        self.link(LinkKind::Cast, name, video_id)
    }

    /// Link a genre to a video, creating the genre if needed
    pub fn link_genre(&self, name: &str, video_id: i64) -> Result<i64> {
        self.link(LinkKind::Genre, name, video_id)
    }

    /// Link a country to a video, creating the country if needed
    pub fn link_country(&self, name: &str, video_id: i64) -> Result<i64> {
        self.link(LinkKind::Country, name, video_id)
    }

    /// Link an attribute to a video; linking an already linked pair is a no-op.
    /// Returns the attribute id.
    pub fn link(&self, kind: LinkKind, name: &str, video_id: i64) -> Result<i64> {
        self.db.transaction(|tx| {
            let video_exists = tx
                .query_row(
                    "SELECT 1 FROM videometadata WHERE intid = ?1",
                    [video_id],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if !video_exists {
                return Err(StoreError::VideoNotFound(video_id).into());
            }

            let attribute_id = Self::lookup_or_create_sync(tx, kind.attribute(), name)?;

            let linked = tx
                .query_row(
                    &format!(
                        "SELECT 1 FROM {} WHERE idvideo = ?1 AND {} = ?2",
                        kind.junction_table(),
                        kind.attribute_column()
                    ),
                    params![video_id, attribute_id],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();

            if !linked {
                tx.execute(
                    &format!(
                        "INSERT INTO {} (idvideo, {}) VALUES (?1, ?2)",
                        kind.junction_table(),
                        kind.attribute_column()
                    ),
                    params![video_id, attribute_id],
                )?;
            }

            Ok(attribute_id)
        })
    }

    /// Remove every genre link of a video
    pub fn unlink_all_genres(&self, video_id: i64) -> Result<()> {
        self.unlink_all(LinkKind::Genre, video_id)
    }

    /// Remove every country link of a video
    pub fn unlink_all_countries(&self, video_id: i64) -> Result<()> {
        self.unlink_all(LinkKind::Country, video_id)
    }

    /// Remove every cast link of a video
    pub fn unlink_all_cast_members(&self, video_id: i64) -> Result<()> {
        self.unlink_all(LinkKind::Cast, video_id)
    }

    /// Remove every link of one kind for a video
    pub fn unlink_all(&self, kind: LinkKind, video_id: i64) -> Result<()> {
        self.db.transaction(|tx| Self::unlink_all_sync(tx, kind, video_id))
    }

    fn unlink_all_sync(conn: &Connection, kind: LinkKind, video_id: i64) -> Result<()> {
        conn.execute(
            &format!("DELETE FROM {} WHERE idvideo = ?1", kind.junction_table()),
            [video_id],
        )?;
        Ok(())
    }

    /// Names linked to a video, sorted
    pub fn linked_names(&self, kind: LinkKind, video_id: i64) -> Result<Vec<String>> {
        let attribute = kind.attribute();
        let sql = format!(
            "SELECT a.{name} FROM {junction} j JOIN {table} a ON a.intid = j.{column} \
             WHERE j.idvideo = ?1 ORDER BY a.{name}",
            name = quote_ident(attribute.name_column()),
            junction = kind.junction_table(),
            table = attribute.table(),
            column = kind.attribute_column(),
        );

        self.db.execute(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let names = stmt
                .query_map([video_id], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(names)
        })
    }

    /// Number of junction rows of one kind for a video
    pub fn link_count(&self, kind: LinkKind, video_id: i64) -> Result<i64> {
        self.db.execute(|conn| {
            Ok(conn.query_row(
                &format!("SELECT COUNT(*) FROM {} WHERE idvideo = ?1", kind.junction_table()),
                [video_id],
                |row| row.get(0),
            )?)
        })
    }

    // =========================================================================
    // Schema
    // =========================================================================

    /// Column names of a table from the live schema, `None` if it does not exist
    pub fn list_columns(&self, table: &str) -> Result<Option<Vec<String>>> {
        self.db.execute(|conn| schema::list_columns(conn, table))
    }

    /// Row counts across the catalog
    pub fn stats(&self) -> Result<CatalogStats> {
        self.db.execute(|conn| {
            let count = |table: &str| -> Result<i64> {
                Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?)
            };

            let placeholder_count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM videometadata WHERE category = ?1 AND year = ?2",
                params![SENTINEL_CATEGORY, SENTINEL_YEAR],
                |row| row.get(0),
            )?;
            let videos = count(VIDEO_TABLE)?;

            Ok(CatalogStats {
                videos,
                videos_with_metadata: videos - placeholder_count,
                categories: count(AttributeKind::Category.table())?,
                cast_members: count(AttributeKind::Cast.table())?,
                genres: count(AttributeKind::Genre.table())?,
                countries: count(AttributeKind::Country.table())?,
            })
        })
    }
}

impl fmt::Debug for MetadataStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataStore")
            .field("db", &self.db)
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Catalog statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogStats {
    /// Number of video rows
    pub videos: i64,
    /// Video rows not carrying the "no metadata" placeholder
    pub videos_with_metadata: i64,
    pub categories: i64,
    pub cast_members: i64,
    pub genres: i64,
    pub countries: i64,
}

impl fmt::Display for CatalogStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Videos: {} ({} with metadata), Categories: {}, Cast: {}, Genres: {}, Countries: {}",
            self.videos,
            self.videos_with_metadata,
            self.categories,
            self.cast_members,
            self.genres,
            self.countries
        )
    }
}
