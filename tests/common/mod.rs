/*!
 * Common test utilities for the mythvideo test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use mythvideo::{MetadataStore, MetadataUpdate, VideoColumn};

/// Route `log` output through the test harness
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a stand-in video file in the specified directory
pub fn create_video_file(dir: &Path, filename: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, b"not really a video")?;
    Ok(file_path)
}

/// Creates an in-memory store with the latest layout
pub fn create_store() -> Result<MetadataStore> {
    init_logging();
    MetadataStore::new_in_memory()
}

/// Inserts a bare video row and returns its id
pub fn insert_video(store: &MetadataStore, title: &str, filename: &str) -> Result<i64> {
    let update = MetadataUpdate::new()
        .set(VideoColumn::Title, title)
        .set(VideoColumn::Filename, filename);
    store
        .upsert_metadata(&update, None)?
        .ok_or_else(|| anyhow::anyhow!("insert did not return an id"))
}

/// Inserts an episode row and returns its id
pub fn insert_episode(
    store: &MetadataStore,
    title: &str,
    season: i64,
    episode: i64,
    filename: &str,
) -> Result<i64> {
    let update = MetadataUpdate::new()
        .set(VideoColumn::Title, title)
        .set(VideoColumn::Season, season)
        .set(VideoColumn::Episode, episode)
        .set(VideoColumn::Filename, filename);
    store
        .upsert_metadata(&update, None)?
        .ok_or_else(|| anyhow::anyhow!("insert did not return an id"))
}
