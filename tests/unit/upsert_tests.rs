/*!
 * Tests for inserting and updating video rows
 */

use anyhow::Result;
use mythvideo::{ColumnType, FieldValue, MetadataUpdate, StoreError, VideoColumn};
use crate::common;

/// Insert without id returns a fresh id per row
#[test]
fn test_upsertMetadata_withoutId_shouldReturnNewIds() -> Result<()> {
    let store = common::create_store()?;

    let first = common::insert_video(&store, "Alien", "/videos/alien.mkv")?;
    let second = common::insert_video(&store, "Aliens", "/videos/aliens.mkv")?;

    assert_ne!(first, second);
    assert_eq!(store.get_video_id_by_path("/videos/aliens.mkv")?, Some(second));
    Ok(())
}

/// Update writes the supplied fields and leaves the rest untouched
#[test]
fn test_upsertMetadata_withId_shouldUpdateOnlySuppliedFields() -> Result<()> {
    let store = common::create_store()?;
    let id = store
        .upsert_metadata(
            &MetadataUpdate::new()
                .set(VideoColumn::Title, "Alien")
                .set(VideoColumn::Director, "Ridley Scott")
                .set(VideoColumn::Filename, "/videos/alien.mkv")
                .set(VideoColumn::Length, 117),
            None,
        )?
        .expect("insert returns an id");
    let before = store.get_metadata_map(id)?.expect("row exists");

    let result = store.upsert_metadata(
        &MetadataUpdate::new()
            .set(VideoColumn::Plot, "In space no one can hear you scream.")
            .set(VideoColumn::Year, 1979)
            .set(VideoColumn::Userrating, 8.5),
        Some(id),
    )?;
    assert_eq!(result, None);

    let after = store.get_metadata_map(id)?.expect("row exists");
    assert_eq!(after["plot"], FieldValue::from("In space no one can hear you scream."));
    assert_eq!(after["year"], FieldValue::Integer(1979));
    assert_eq!(after["userrating"], FieldValue::Real(8.5));

    for (column, value) in &before {
        if !["plot", "year", "userrating"].contains(&column.as_str()) {
            assert_eq!(&after[column], value, "{} changed", column);
        }
    }
    Ok(())
}

/// Fields can be named by their column string
#[test]
fn test_upsertMetadata_withNamedFields_shouldWrite() -> Result<()> {
    let store = common::create_store()?;

    let update = MetadataUpdate::new()
        .set_named("title", "Brazil")?
        .set_named("FILENAME", "/videos/brazil.mkv")?
        .set_named("inetref", "tt0088846")?;
    let id = store.upsert_metadata(&update, None)?.expect("insert returns an id");

    let record = store.get_metadata_record(id)?.expect("row exists");
    assert_eq!(record.get("inetref"), Some(&FieldValue::from("tt0088846")));
    Ok(())
}

/// Unknown field names are rejected before any SQL is built
#[test]
fn test_setNamed_withUnknownColumn_shouldFail() {
    let error = MetadataUpdate::new()
        .set_named("title = 'x'; --", "Brazil")
        .unwrap_err();

    assert!(matches!(
        StoreError::find(&error),
        Some(StoreError::UnknownColumn(_))
    ));
}

/// NULL can be written to nullable columns
#[test]
fn test_upsertMetadata_withNullValue_shouldStoreNull() -> Result<()> {
    let store = common::create_store()?;
    let id = store
        .upsert_metadata(
            &MetadataUpdate::new()
                .set(VideoColumn::Title, "Alien")
                .set(VideoColumn::Plot, "Draft"),
            None,
        )?
        .expect("insert returns an id");

    store.upsert_metadata(
        &MetadataUpdate::new().set(VideoColumn::Plot, Option::<String>::None),
        Some(id),
    )?;

    let map = store.get_metadata_map(id)?.expect("row exists");
    assert!(map["plot"].is_null());
    Ok(())
}

/// The map form exports cleanly as JSON
#[test]
fn test_getMetadataMap_shouldSerializeToJson() -> Result<()> {
    let store = common::create_store()?;
    let id = common::insert_video(&store, "Alien", "/videos/alien.mkv")?;

    let map = store.get_metadata_map(id)?.expect("row exists");
    let json = serde_json::to_value(&map)?;

    assert_eq!(json["title"], "Alien");
    assert_eq!(json["year"], 1895);
    assert_eq!(json["intid"], id);
    Ok(())
}

/// Values are checked against the column type before anything is written
#[test]
fn test_upsertMetadata_withTextInIntegerColumn_shouldReturnTypeMismatch() -> Result<()> {
    let store = common::create_store()?;
    let id = common::insert_video(&store, "Alien", "/videos/alien.mkv")?;

    let error = store
        .upsert_metadata(
            &MetadataUpdate::new()
                .set(VideoColumn::Plot, "Draft")
                .set(VideoColumn::Year, "nineteen seventy-nine"),
            Some(id),
        )
        .unwrap_err();

    assert_eq!(
        StoreError::find(&error),
        Some(&StoreError::TypeMismatch {
            column: "year".to_string(),
            expected: ColumnType::Integer,
        })
    );
    let record = store.get_metadata_record(id)?.expect("row exists");
    assert_ne!(record.get("plot"), Some(&FieldValue::from("Draft")));
    Ok(())
}

/// Inserts are checked too, and no row is created on a mismatch
#[test]
fn test_upsertMetadata_insertWithTextRating_shouldNotCreateRow() -> Result<()> {
    let store = common::create_store()?;

    let error = store
        .upsert_metadata(
            &MetadataUpdate::new()
                .set(VideoColumn::Title, "Alien")
                .set(VideoColumn::Userrating, "high"),
            None,
        )
        .unwrap_err();

    assert!(matches!(
        StoreError::find(&error),
        Some(StoreError::TypeMismatch { .. })
    ));
    assert_eq!(store.stats()?.videos, 0);
    Ok(())
}
