//! Filesystem-backed applet persistence.
//!
//! Each applet owns one directory named by its UUID under the upload root:
//!
//! - `index.html` — current HTML, overwritten wholesale per generation
//! - `index-<timestamp>.html` — append-only snapshots, one per generation
//! - `storage.json` — localStorage blob, fully replaced on each write
//! - `<timestamp>_initial_prompt.webm` / `<timestamp>_change_prompt.webm`
//!   — raw uploaded audio, with sibling `.prompt` transcript files
//!
//! Writes are not atomic; the storage reader tolerates truncated or corrupt
//! content by falling back to an empty object.

use chrono::Local;
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const INDEX_FILE: &str = "index.html";
const STORAGE_FILE: &str = "storage.json";
const TRANSCRIPT_EXTENSION: &str = "prompt";

/// Snapshot timestamps have second granularity; two generation runs within
/// the same second silently overwrite the same snapshot file.
const SNAPSHOT_TIMESTAMP_FMT: &str = "%Y%m%d_%H%M%S";

/// Audio filenames carry microseconds so rapid uploads stay distinct.
const AUDIO_TIMESTAMP_FMT: &str = "%Y%m%d_%H%M%S_%6f";

/// Whether an uploaded recording creates an applet or changes one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioKind {
    Initial,
    Change,
}

impl AudioKind {
    fn file_label(self) -> &'static str {
        match self {
            AudioKind::Initial => "initial_prompt",
            AudioKind::Change => "change_prompt",
        }
    }
}

/// Translates applet operations into file operations scoped to a
/// per-UUID directory.
#[derive(Debug, Clone)]
pub struct AppletStore {
    root: PathBuf,
}

impl AppletStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn applet_dir(&self, id: &Uuid) -> PathBuf {
        self.root.join(id.to_string())
    }

    pub fn html_path(&self, id: &Uuid) -> PathBuf {
        self.applet_dir(id).join(INDEX_FILE)
    }

    pub fn storage_path(&self, id: &Uuid) -> PathBuf {
        self.applet_dir(id).join(STORAGE_FILE)
    }

    pub fn exists(&self, id: &Uuid) -> bool {
        self.applet_dir(id).is_dir()
    }

    pub fn create_applet_dir(&self, id: &Uuid) -> io::Result<()> {
        std::fs::create_dir_all(self.applet_dir(id))
    }

    /// Save uploaded audio under a server-generated timestamped filename and
    /// return that filename.
    pub fn save_audio(&self, id: &Uuid, kind: AudioKind, audio: &[u8]) -> io::Result<String> {
        let file_name = format!(
            "{}_{}.webm",
            Local::now().format(AUDIO_TIMESTAMP_FMT),
            kind.file_label()
        );
        std::fs::write(self.applet_dir(id).join(&file_name), audio)?;
        Ok(file_name)
    }

    /// Write the transcript next to its audio file, sharing the base name
    /// with a `.prompt` extension.
    pub fn write_transcript(
        &self,
        id: &Uuid,
        audio_file_name: &str,
        text: &str,
    ) -> io::Result<PathBuf> {
        let path = self
            .applet_dir(id)
            .join(audio_file_name)
            .with_extension(TRANSCRIPT_EXTENSION);
        std::fs::write(&path, text)?;
        Ok(path)
    }

    /// Write the current HTML plus a timestamped snapshot copy. Returns both
    /// paths (current, snapshot).
    pub fn write_html(&self, id: &Uuid, html: &str) -> io::Result<(PathBuf, PathBuf)> {
        let dir = self.applet_dir(id);
        let index_path = dir.join(INDEX_FILE);
        let snapshot_path = dir.join(format!(
            "index-{}.html",
            Local::now().format(SNAPSHOT_TIMESTAMP_FMT)
        ));

        std::fs::write(&index_path, html)?;
        std::fs::write(&snapshot_path, html)?;

        Ok((index_path, snapshot_path))
    }

    /// Read the current HTML. `Ok(None)` when the file does not exist.
    pub fn read_html(&self, id: &Uuid) -> io::Result<Option<String>> {
        match std::fs::read_to_string(self.html_path(id)) {
            Ok(html) => Ok(Some(html)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Write storage text verbatim. Validation (JSON well-formedness, size)
    /// is the caller's responsibility.
    pub fn write_storage(&self, id: &Uuid, text: &str) -> io::Result<()> {
        std::fs::write(self.storage_path(id), text)
    }

    /// Read the storage object. A missing file or unparsable content yields
    /// an empty object; only other I/O failures surface as errors.
    pub fn read_storage(&self, id: &Uuid) -> io::Result<Value> {
        let path = self.storage_path(id);
        match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(value) => Ok(value),
                Err(e) => {
                    log::error!("JSON decoding error in {:?}: {}", path, e);
                    Ok(empty_object())
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(empty_object()),
            Err(e) => Err(e),
        }
    }

    /// List transcript texts for an applet, sorted by filename. Filenames
    /// embed the upload timestamp, so this is chronological order.
    pub fn list_prompts(&self, id: &Uuid) -> io::Result<Vec<String>> {
        let dir = self.applet_dir(id);
        let mut transcript_paths: Vec<PathBuf> = std::fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| has_transcript_extension(path))
            .collect();
        transcript_paths.sort();

        let mut prompts = Vec::with_capacity(transcript_paths.len());
        for path in transcript_paths {
            prompts.push(std::fs::read_to_string(path)?);
        }
        Ok(prompts)
    }
}

fn has_transcript_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext == TRANSCRIPT_EXTENSION)
        .unwrap_or(false)
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn test_store() -> (AppletStore, TempDir, Uuid) {
        let dir = TempDir::new().unwrap();
        let store = AppletStore::new(dir.path().to_path_buf());
        let id = Uuid::new_v4();
        store.create_applet_dir(&id).unwrap();
        (store, dir, id)
    }

    #[test]
    fn test_exists_after_create() {
        let (store, _dir, id) = test_store();
        assert!(store.exists(&id));
        assert!(!store.exists(&Uuid::new_v4()));
    }

    #[test]
    fn test_write_html_creates_current_and_snapshot() {
        let (store, _dir, id) = test_store();
        let (index, snapshot) = store.write_html(&id, "<html>A</html>").unwrap();

        assert_eq!(std::fs::read_to_string(&index).unwrap(), "<html>A</html>");
        assert_eq!(std::fs::read_to_string(&snapshot).unwrap(), "<html>A</html>");
        assert!(snapshot
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("index-"));
        assert_eq!(store.read_html(&id).unwrap().as_deref(), Some("<html>A</html>"));
    }

    #[test]
    fn test_read_html_missing_is_none() {
        let (store, _dir, id) = test_store();
        assert_eq!(store.read_html(&id).unwrap(), None);
    }

    #[test]
    fn test_read_storage_missing_is_empty_object() {
        let (store, _dir, id) = test_store();
        assert_eq!(store.read_storage(&id).unwrap(), json!({}));
    }

    #[test]
    fn test_read_storage_corrupt_is_empty_object() {
        let (store, _dir, id) = test_store();
        store.write_storage(&id, "INVALID Json Data").unwrap();
        assert_eq!(store.read_storage(&id).unwrap(), json!({}));
    }

    #[test]
    fn test_storage_round_trip() {
        let (store, _dir, id) = test_store();
        store.write_storage(&id, r#"{"key":"value"}"#).unwrap();
        assert_eq!(store.read_storage(&id).unwrap(), json!({"key": "value"}));
    }

    #[test]
    fn test_transcript_shares_audio_base_name() {
        let (store, _dir, id) = test_store();
        let audio_name = store.save_audio(&id, AudioKind::Initial, b"bytes").unwrap();
        assert!(audio_name.ends_with("_initial_prompt.webm"));

        let transcript = store.write_transcript(&id, &audio_name, "hello").unwrap();
        assert_eq!(transcript.extension().unwrap(), "prompt");
        assert_eq!(
            transcript.file_stem().unwrap(),
            Path::new(&audio_name).file_stem().unwrap()
        );
    }

    #[test]
    fn test_list_prompts_sorted_by_filename() {
        let (store, _dir, id) = test_store();
        store
            .write_transcript(&id, "20240101_000002_change_prompt.webm", "second")
            .unwrap();
        store
            .write_transcript(&id, "20240101_000001_initial_prompt.webm", "first")
            .unwrap();
        // Non-transcript files are skipped.
        store.write_storage(&id, "{}").unwrap();

        assert_eq!(store.list_prompts(&id).unwrap(), vec!["first", "second"]);
    }
}
