/*!
 * # mythvideo
 *
 * A data-access layer for a MythVideo-style media metadata catalog.
 *
 * ## Features
 *
 * - Read and write descriptive video records (title, episode fields, year...)
 * - Case-insensitive lookup-or-create of categories, cast, genres and countries
 * - Idempotent linking of videos to cast, genres and countries
 * - Pruning of records whose video file no longer exists
 * - Schema detection at startup, so older catalog layouts keep working
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `database`: SQLite access:
 *   - `database::connection`: Shared connection and transactions
 *   - `database::schema`: Table bootstrap, introspection and schema descriptor
 *   - `database::models`: Column values, records, attribute kinds
 *   - `database::store`: The `MetadataStore` operations
 * - `file_utils`: Filesystem existence checks
 * - `errors`: Custom error types for the store
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]

// Public modules
pub mod app_config;
pub mod database;
pub mod errors;
pub mod file_utils;

// Re-export main types for easier usage
pub use app_config::{Config, DatabaseConfig, LogLevel};
pub use database::{
    AttributeKind, CatalogStats, ColumnType, DatabaseConnection, FieldValue, LinkKind,
    MetadataRecord, MetadataStore, MetadataUpdate, SchemaVersion, VideoColumn, VideoQuery,
};
pub use errors::StoreError;
pub use file_utils::{FileManager, PathProbe};
