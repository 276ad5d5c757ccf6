/*!
 * Database module for the video metadata catalog.
 *
 * This module provides SQLite-based access to:
 * - Video records and their schema-dependent columns
 * - Categories, cast, genres and countries, created on first reference
 * - The junction tables linking videos to cast, genres and countries
 */

pub mod connection;
pub mod models;
pub mod schema;
pub mod store;

// Re-export main types
pub use connection::DatabaseConnection;
pub use models::{
    AttributeKind, FieldValue, LinkKind, MetadataRecord, MetadataUpdate, VideoQuery,
};
pub use schema::{ColumnType, SchemaDescriptor, SchemaVersion, VideoColumn};
pub use store::{CatalogStats, MetadataStore};
