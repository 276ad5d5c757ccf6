/*!
 * Tests for title, path and metadata lookups
 */

use anyhow::Result;
use mythvideo::{MetadataUpdate, VideoColumn, VideoQuery};
use crate::common;

/// Episode lookup returns exactly the rows inserted with those values
#[test]
fn test_findVideoIds_withSeasonAndEpisode_shouldReturnExactMatches() -> Result<()> {
    let store = common::create_store()?;
    let a = common::insert_episode(&store, "Show", 2, 5, "/tv/show-s02e05.mkv")?;
    let b = common::insert_episode(&store, "Show", 2, 5, "/tv/show-s02e05-hd.mkv")?;
    common::insert_episode(&store, "Show", 2, 6, "/tv/show-s02e06.mkv")?;
    common::insert_episode(&store, "Show", 1, 5, "/tv/show-s01e05.mkv")?;
    common::insert_episode(&store, "Other Show", 2, 5, "/tv/other-s02e05.mkv")?;

    let query = VideoQuery::title("Show").season(2).episode(5);

    assert_eq!(store.find_video_ids(&query)?, Some(vec![a, b]));
    Ok(())
}

/// The single-match form picks the lowest matching id
#[test]
fn test_findVideoId_withSeveralMatches_shouldReturnLowestId() -> Result<()> {
    let store = common::create_store()?;
    let a = common::insert_episode(&store, "Show", 2, 5, "/tv/a.mkv")?;
    let b = common::insert_episode(&store, "Show", 2, 5, "/tv/b.mkv")?;

    let query = VideoQuery::title("Show").season(2).episode(5);
    let found = store.find_video_id(&query)?.expect("one match expected");

    assert_eq!(found, a.min(b));
    Ok(())
}

/// Title-only lookup ignores season and episode
#[test]
fn test_findVideoIds_withTitleOnly_shouldReturnEveryEpisode() -> Result<()> {
    let store = common::create_store()?;
    let a = common::insert_episode(&store, "Show", 1, 1, "/tv/a.mkv")?;
    let b = common::insert_episode(&store, "Show", 1, 2, "/tv/b.mkv")?;

    assert_eq!(store.find_video_ids(&VideoQuery::title("Show"))?, Some(vec![a, b]));
    Ok(())
}

/// Subtitle narrows the match when supplied
#[test]
fn test_findVideoIds_withSubtitle_shouldNarrowMatches() -> Result<()> {
    let store = common::create_store()?;
    common::insert_video(&store, "Star Trek", "/videos/st1.mkv")?;
    let wrath = store
        .upsert_metadata(
            &MetadataUpdate::new()
                .set(VideoColumn::Title, "Star Trek")
                .set(VideoColumn::Subtitle, "The Wrath of Khan")
                .set(VideoColumn::Filename, "/videos/st2.mkv"),
            None,
        )?
        .expect("insert returns an id");

    let query = VideoQuery::title("Star Trek").subtitle("The Wrath of Khan");

    assert_eq!(store.find_video_ids(&query)?, Some(vec![wrath]));
    Ok(())
}

/// No matches is reported as absence
#[test]
fn test_findVideoIds_withNoMatches_shouldReturnNone() -> Result<()> {
    let store = common::create_store()?;
    common::insert_episode(&store, "Show", 1, 1, "/tv/a.mkv")?;

    let query = VideoQuery::title("Show").season(9);

    assert_eq!(store.find_video_ids(&query)?, None);
    assert_eq!(store.find_video_id(&query)?, None);
    Ok(())
}

/// Titles that look like SQL are matched literally
#[test]
fn test_findVideoIds_withQuoteInTitle_shouldMatchLiterally() -> Result<()> {
    let store = common::create_store()?;
    let id = common::insert_video(&store, "Schindler's List", "/videos/schindler.mkv")?;

    assert_eq!(store.find_video_id(&VideoQuery::title("Schindler's List"))?, Some(id));
    assert_eq!(store.find_video_id(&VideoQuery::title("' OR '1'='1"))?, None);
    Ok(())
}

/// has_metadata distinguishes absent rows, placeholder rows and real rows
#[test]
fn test_hasMetadata_withAbsentPlaceholderAndRealRows_shouldDistinguish() -> Result<()> {
    let store = common::create_store()?;
    let placeholder = common::insert_video(&store, "Unknown", "/videos/unknown.mkv")?;
    let real = common::insert_video(&store, "Alien", "/videos/alien.mkv")?;
    let category = store.lookup_or_create_category("Horror")?;
    store.upsert_metadata(
        &MetadataUpdate::new()
            .set(VideoColumn::Category, category)
            .set(VideoColumn::Year, 1895),
        Some(real),
    )?;

    assert!(!store.has_metadata("/videos/nothing-here.mkv")?);
    assert!(!store.has_metadata("/videos/unknown.mkv")?);
    assert!(store.has_metadata("/videos/alien.mkv")?);

    // Only the exact (0, 1895) pair counts as a placeholder
    store.upsert_metadata(&MetadataUpdate::new().set(VideoColumn::Year, 1896), Some(placeholder))?;
    assert!(store.has_metadata("/videos/unknown.mkv")?);
    Ok(())
}

/// Missing ids are reported as absence
#[test]
fn test_getMetadataRecord_withUnknownId_shouldReturnNone() -> Result<()> {
    let store = common::create_store()?;

    assert!(store.get_metadata_record(12345)?.is_none());
    assert!(store.get_metadata_map(12345)?.is_none());
    Ok(())
}

/// The record carries every live column in table order
#[test]
fn test_getMetadataRecord_shouldFollowLiveColumnOrder() -> Result<()> {
    let store = common::create_store()?;
    let id = common::insert_video(&store, "Alien", "/videos/alien.mkv")?;

    let record = store.get_metadata_record(id)?.expect("record exists");
    let columns = store.list_columns("videometadata")?.expect("table exists");

    assert_eq!(record.columns(), columns.as_slice());
    assert_eq!(record.values().len(), columns.len());
    assert_eq!(record.title(), Some("Alien"));
    assert_eq!(record.filename(), Some("/videos/alien.mkv"));
    Ok(())
}

/// Column listing reports missing tables as absence
#[test]
fn test_listColumns_withJunctionAndMissingTables() -> Result<()> {
    let store = common::create_store()?;

    assert_eq!(
        store.list_columns("videometadatacountry")?,
        Some(vec!["idvideo".to_string(), "idcountry".to_string()])
    );
    assert_eq!(store.list_columns("videometadata_backup")?, None);
    Ok(())
}
