//! Asset catalog: the worker's view of its storage directories.

use rand::prelude::IndexedRandom;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};

/// Source video containers picked up from the input directory.
pub const INPUT_EXTENSIONS: &[&str] = &["mp4", "webm"];
/// Container of finished renders.
pub const PROCESSED_EXTENSIONS: &[&str] = &["mp4"];
/// Formats accepted as background music.
pub const MUSIC_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a"];

/// Extension of publishing identity files.
const IDENTITY_EXTENSION: &str = "cookie";
/// Prefix stripped from identity file names.
const IDENTITY_PREFIX: &str = "tiktok_session-";

/// Lists and locates inputs, renders, music and identities.
#[derive(Debug, Clone)]
pub struct AssetCatalog {
    input_dir: PathBuf,
    processed_dir: PathBuf,
    music_dir: PathBuf,
    cookies_dir: PathBuf,
}

impl AssetCatalog {
    pub fn new(
        input_dir: impl Into<PathBuf>,
        processed_dir: impl Into<PathBuf>,
        music_dir: impl Into<PathBuf>,
        cookies_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            input_dir: input_dir.into(),
            processed_dir: processed_dir.into(),
            music_dir: music_dir.into(),
            cookies_dir: cookies_dir.into(),
        }
    }

    pub fn from_config(config: &WorkerConfig) -> Self {
        Self::new(
            &config.input_dir,
            &config.processed_dir,
            &config.music_dir,
            &config.cookies_dir,
        )
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    pub fn processed_dir(&self) -> &Path {
        &self.processed_dir
    }

    pub async fn list_inputs(&self) -> WorkerResult<Vec<PathBuf>> {
        list_files(&self.input_dir, INPUT_EXTENSIONS).await
    }

    pub async fn list_processed(&self) -> WorkerResult<Vec<PathBuf>> {
        list_files(&self.processed_dir, PROCESSED_EXTENSIONS).await
    }

    pub async fn list_music(&self) -> WorkerResult<Vec<PathBuf>> {
        list_files(&self.music_dir, MUSIC_EXTENSIONS).await
    }

    /// Identity names, in file name order.
    pub async fn list_identities(&self) -> WorkerResult<Vec<String>> {
        let files = list_files(&self.cookies_dir, &[IDENTITY_EXTENSION]).await?;
        Ok(files.iter().filter_map(|path| identity_name(path)).collect())
    }

    /// Cookie file backing `identity`, if it exists.
    pub async fn identity_cookie(&self, identity: &str) -> WorkerResult<Option<PathBuf>> {
        let files = list_files(&self.cookies_dir, &[IDENTITY_EXTENSION]).await?;
        Ok(files
            .into_iter()
            .find(|path| identity_name(path).as_deref() == Some(identity)))
    }

    /// A uniformly random music file, or `None` when the library is empty.
    pub async fn random_music(&self) -> WorkerResult<Option<PathBuf>> {
        let music = self.list_music().await?;
        let mut rng = rand::rng();
        Ok(music.choose(&mut rng).cloned())
    }

    /// Locate a music file by name (or absolute path).
    pub fn music_path(&self, name: &str) -> PathBuf {
        resolve_in(&self.music_dir, name)
    }

    /// Where a render named `output` is written.
    pub fn processed_path(&self, output: &str) -> PathBuf {
        resolve_in(&self.processed_dir, output)
    }

    /// Locate an overlay or source asset relative to the input directory.
    pub fn input_path(&self, name: &str) -> PathBuf {
        resolve_in(&self.input_dir, name)
    }

    /// Create every catalog directory that is missing.
    pub async fn ensure_dirs(&self) -> WorkerResult<()> {
        for dir in [&self.input_dir, &self.processed_dir, &self.music_dir, &self.cookies_dir] {
            tokio::fs::create_dir_all(dir).await?;
        }
        Ok(())
    }
}

fn resolve_in(dir: &Path, name: &str) -> PathBuf {
    let path = Path::new(name);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        dir.join(path)
    }
}

fn identity_name(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let name = stem.strip_prefix(IDENTITY_PREFIX).unwrap_or(stem);
    (!name.is_empty()).then(|| name.to_string())
}

/// Regular files in `dir` with one of `extensions`, sorted by path.
///
/// A missing directory lists as empty.
async fn list_files(dir: &Path, extensions: &[&str]) -> WorkerResult<Vec<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(dir = %dir.display(), "Directory does not exist, listing as empty");
            return Ok(Vec::new());
        }
        Err(e) => return Err(WorkerError::Io(e)),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
            .unwrap_or(false);
        if matches {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join(name), b"x").unwrap();
    }

    fn catalog(root: &Path) -> AssetCatalog {
        AssetCatalog::from_config(&WorkerConfig::with_data_dir(root))
    }

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_list_inputs_filters_and_sorts() {
        let root = TempDir::new().unwrap();
        let catalog = catalog(root.path());
        touch(catalog.input_dir(), "b.webm");
        touch(catalog.input_dir(), "a.MP4");
        touch(catalog.input_dir(), "notes.txt");
        touch(catalog.input_dir(), "clip.mkv");
        std::fs::create_dir_all(catalog.input_dir().join("nested.mp4")).unwrap();

        let inputs = catalog.list_inputs().await.unwrap();
        assert_eq!(names(&inputs), vec!["a.MP4", "b.webm"]);
    }

    #[tokio::test]
    async fn test_missing_directories_list_empty() {
        let root = TempDir::new().unwrap();
        let catalog = catalog(&root.path().join("nowhere"));

        assert!(catalog.list_inputs().await.unwrap().is_empty());
        assert!(catalog.list_processed().await.unwrap().is_empty());
        assert!(catalog.random_music().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_identities_strip_prefix() {
        let root = TempDir::new().unwrap();
        let catalog = catalog(root.path());
        let cookies = root.path().join("cookies");
        touch(&cookies, "tiktok_session-alice.cookie");
        touch(&cookies, "bob.cookie");
        touch(&cookies, "readme.md");

        let identities = catalog.list_identities().await.unwrap();
        assert_eq!(identities, vec!["bob", "alice"]);

        let cookie = catalog.identity_cookie("alice").await.unwrap().unwrap();
        assert!(cookie.ends_with("tiktok_session-alice.cookie"));
        assert!(catalog.identity_cookie("carol").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_random_music_picks_from_library() {
        let root = TempDir::new().unwrap();
        let catalog = catalog(root.path());
        let music = root.path().join("music");
        touch(&music, "one.mp3");
        touch(&music, "two.wav");
        touch(&music, "cover.jpg");

        let library = catalog.list_music().await.unwrap();
        assert_eq!(library.len(), 2);
        for _ in 0..10 {
            let pick = catalog.random_music().await.unwrap().unwrap();
            assert!(library.contains(&pick));
        }
    }

    #[test]
    fn test_relative_names_resolve_into_directories() {
        let catalog = AssetCatalog::new("/in", "/out", "/music", "/cookies");
        assert_eq!(catalog.processed_path("final.mp4"), PathBuf::from("/out/final.mp4"));
        assert_eq!(catalog.music_path("/abs/song.mp3"), PathBuf::from("/abs/song.mp3"));
        assert_eq!(catalog.input_path("logo.png"), PathBuf::from("/in/logo.png"));
    }
}
