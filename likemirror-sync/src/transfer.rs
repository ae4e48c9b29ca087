//! Transfer pipeline — download, stage, upload, clean up.
//!
//! ## Steps
//!
//! 1. GET the resolved download URL.
//! 2. Write the bytes to `<staging_dir>/<filename>`.
//! 3. Upload the staged bytes to `<destination_prefix>/<filename>` without
//!    overwriting. A conflict means the track is already mirrored and counts
//!    as success.
//! 4. Remove the staged file on every exit path ([`StagedFile`] drop guard).

use std::path::{Path, PathBuf};

use sanitize_filename::Options;

use likemirror_core::{HttpFetch, ObjectStore, Track, UploadOutcome};

use crate::error::{staging_err, TrackError};

/// Extension given to staged and uploaded files. Progressive streams are MP3.
pub const AUDIO_EXTENSION: &str = "mp3";

/// Upper bound on the sanitized stem, leaving room for the extension within
/// common 255-byte filename limits.
const MAX_STEM_BYTES: usize = 200;

/// Where a transfer stages and uploads its file.
#[derive(Debug, Clone)]
pub struct TransferTarget {
    pub staging_dir: PathBuf,
    /// Remote folder, leading slash and no trailing slash. Empty means the
    /// account root.
    pub destination_prefix: String,
}

/// Successful end of a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The file was uploaded to `destination`.
    Uploaded { destination: String },
    /// Remote storage already held `destination`; nothing was overwritten.
    AlreadyPresent { destination: String },
}

impl TransferOutcome {
    pub fn destination(&self) -> &str {
        match self {
            TransferOutcome::Uploaded { destination }
            | TransferOutcome::AlreadyPresent { destination } => destination,
        }
    }
}

/// Local file holding one track's audio between download and upload.
///
/// Removed when dropped, whichever step returned.
pub struct StagedFile {
    path: PathBuf,
}

impl StagedFile {
    /// Write `bytes` to `path` and take ownership of the file.
    pub fn create(path: PathBuf, bytes: &[u8]) -> Result<Self, TrackError> {
        // Own the path before writing so a partial write is cleaned up too.
        let staged = StagedFile { path };
        std::fs::write(&staged.path, bytes).map_err(|e| staging_err(&staged.path, e))?;
        Ok(staged)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> Result<Vec<u8>, TrackError> {
        std::fs::read(&self.path).map_err(|e| staging_err(&self.path, e))
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                "could not remove staged file {}: {e}",
                self.path.display()
            ),
        }
    }
}

/// File name used both for staging and for the remote destination.
///
/// Path separators and other characters that are unsafe in file names are
/// replaced with `_`. A title that sanitizes to nothing falls back to the
/// track id.
pub fn staged_file_name(track: &Track) -> String {
    let options = Options {
        truncate: false,
        windows: true,
        replacement: "_",
    };
    let mut stem = sanitize_filename::sanitize_with_options(track.title.trim(), options);
    if stem.trim_matches(|c: char| c == '_' || c.is_whitespace()).is_empty() {
        stem = sanitize_filename::sanitize(&track.id.0);
    }
    truncate_at_char_boundary(&mut stem, MAX_STEM_BYTES);
    format!("{stem}.{AUDIO_EXTENSION}")
}

fn truncate_at_char_boundary(s: &mut String, max_bytes: usize) {
    if s.len() <= max_bytes {
        return;
    }
    let mut cut = max_bytes;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
}

/// Download `download_url`, stage it, and upload it for `track`.
pub fn transfer(
    http: &dyn HttpFetch,
    store: &dyn ObjectStore,
    target: &TransferTarget,
    track: &Track,
    download_url: &str,
) -> Result<TransferOutcome, TrackError> {
    let file_name = staged_file_name(track);
    let destination = format!(
        "{}/{}",
        target.destination_prefix.trim_end_matches('/'),
        file_name
    );

    // Step 1: fetch.
    tracing::info!("downloading '{}'", track.title);
    let response = http
        .get(download_url)
        .map_err(|e| TrackError::DownloadFailed {
            title: track.title.clone(),
            reason: e.to_string(),
        })?;
    if !response.is_success() {
        return Err(TrackError::DownloadFailed {
            title: track.title.clone(),
            reason: format!("HTTP {}", response.status),
        });
    }

    // Step 2: stage.
    std::fs::create_dir_all(&target.staging_dir)
        .map_err(|e| staging_err(&target.staging_dir, e))?;
    let staged = StagedFile::create(target.staging_dir.join(&file_name), &response.body)?;
    drop(response);

    // Step 3: upload the staged bytes. `staged` is removed on return.
    let bytes = staged.read()?;
    tracing::info!("uploading '{}' to {destination}", track.title);
    match store.upload(&bytes, &destination) {
        Ok(UploadOutcome::Created) => Ok(TransferOutcome::Uploaded { destination }),
        Ok(UploadOutcome::AlreadyExists) => {
            tracing::info!("{destination} already exists, upload skipped");
            Ok(TransferOutcome::AlreadyPresent { destination })
        }
        Err(source) => Err(TrackError::UploadFailed {
            title: track.title.clone(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use likemirror_core::{FetchError, HttpResponse, StoreError, TrackId};
    use rstest::rstest;
    use tempfile::TempDir;

    use super::*;

    struct FixedHttp(Option<HttpResponse>);

    impl HttpFetch for FixedHttp {
        fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
            self.0.clone().ok_or_else(|| FetchError {
                url: url.to_string(),
                reason: "timed out".to_string(),
            })
        }
    }

    struct RecordingStore {
        reply: fn(&str) -> Result<UploadOutcome, StoreError>,
        uploads: Mutex<Vec<(String, Vec<u8>)>>,
        staged_seen: Mutex<Vec<bool>>,
        staging_dir: PathBuf,
    }

    impl RecordingStore {
        fn new(
            staging_dir: &Path,
            reply: fn(&str) -> Result<UploadOutcome, StoreError>,
        ) -> Self {
            Self {
                reply,
                uploads: Mutex::new(Vec::new()),
                staged_seen: Mutex::new(Vec::new()),
                staging_dir: staging_dir.to_path_buf(),
            }
        }
    }

    impl ObjectStore for RecordingStore {
        fn upload(&self, bytes: &[u8], destination: &str) -> Result<UploadOutcome, StoreError> {
            let staged = std::fs::read_dir(&self.staging_dir)
                .map(|mut entries| entries.next().is_some())
                .unwrap_or(false);
            self.staged_seen.lock().unwrap().push(staged);
            self.uploads
                .lock()
                .unwrap()
                .push((destination.to_string(), bytes.to_vec()));
            (self.reply)(destination)
        }
    }

    fn track(title: &str) -> Track {
        Track {
            id: TrackId::from("42"),
            title: title.to_string(),
            transcodings: vec![],
        }
    }

    fn target(tmp: &TempDir) -> TransferTarget {
        TransferTarget {
            staging_dir: tmp.path().join("staging"),
            destination_prefix: "/SoundCloudDownloads".to_string(),
        }
    }

    fn staging_is_empty(target: &TransferTarget) -> bool {
        match std::fs::read_dir(&target.staging_dir) {
            Ok(mut entries) => entries.next().is_none(),
            Err(_) => true,
        }
    }

    #[rstest]
    #[case("Night Drive", "Night Drive.mp3")]
    #[case("AC/DC - Thunder", "AC_DC - Thunder.mp3")]
    #[case("back\\slash", "back_slash.mp3")]
    #[case("what?: \"live\"", "what__ _live_.mp3")]
    fn file_names_are_sanitized(#[case] title: &str, #[case] expected: &str) {
        assert_eq!(staged_file_name(&track(title)), expected);
    }

    #[test]
    fn empty_title_falls_back_to_id() {
        assert_eq!(staged_file_name(&track("  ")), "42.mp3");
        assert_eq!(staged_file_name(&track("/")), "42.mp3");
    }

    #[test]
    fn long_titles_are_truncated() {
        let name = staged_file_name(&track(&"é".repeat(300)));
        assert!(name.len() <= MAX_STEM_BYTES + 4);
        assert!(name.ends_with(".mp3"));
    }

    #[test]
    fn uploads_staged_bytes_and_cleans_up() {
        let tmp = TempDir::new().unwrap();
        let target = target(&tmp);
        let http = FixedHttp(Some(HttpResponse::new(200, b"ID3audio".to_vec())));
        let store = RecordingStore::new(&target.staging_dir, |_| Ok(UploadOutcome::Created));

        let outcome = transfer(&http, &store, &target, &track("A/B"), "https://cdn/x").unwrap();

        assert_eq!(
            outcome,
            TransferOutcome::Uploaded {
                destination: "/SoundCloudDownloads/A_B.mp3".to_string()
            }
        );
        let uploads = store.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].1, b"ID3audio".to_vec());
        assert_eq!(*store.staged_seen.lock().unwrap(), vec![true]);
        assert!(staging_is_empty(&target), "staged file must be removed");
    }

    #[rstest]
    #[case("")]
    #[case("/")]
    fn root_destination_has_single_slash(#[case] prefix: &str) {
        let tmp = TempDir::new().unwrap();
        let target = TransferTarget {
            staging_dir: tmp.path().join("staging"),
            destination_prefix: prefix.to_string(),
        };
        let http = FixedHttp(Some(HttpResponse::new(200, b"bytes".to_vec())));
        let store = RecordingStore::new(&target.staging_dir, |_| Ok(UploadOutcome::Created));

        let outcome = transfer(&http, &store, &target, &track("Song"), "https://cdn/x").unwrap();

        assert_eq!(
            outcome,
            TransferOutcome::Uploaded {
                destination: "/Song.mp3".to_string()
            }
        );
        assert_eq!(store.uploads.lock().unwrap()[0].0, "/Song.mp3");
    }

    #[test]
    fn conflict_counts_as_success() {
        let tmp = TempDir::new().unwrap();
        let target = target(&tmp);
        let http = FixedHttp(Some(HttpResponse::new(200, b"bytes".to_vec())));
        let store = RecordingStore::new(&target.staging_dir, |_| {
            Ok(UploadOutcome::AlreadyExists)
        });

        let outcome = transfer(&http, &store, &target, &track("Song"), "https://cdn/x").unwrap();
        assert!(matches!(outcome, TransferOutcome::AlreadyPresent { .. }));
        assert!(staging_is_empty(&target));
    }

    #[test]
    fn upload_error_fails_and_cleans_up() {
        let tmp = TempDir::new().unwrap();
        let target = target(&tmp);
        let http = FixedHttp(Some(HttpResponse::new(200, b"bytes".to_vec())));
        let store = RecordingStore::new(&target.staging_dir, |destination| {
            Err(StoreError {
                destination: destination.to_string(),
                reason: "insufficient_space".to_string(),
            })
        });

        let err = transfer(&http, &store, &target, &track("Song"), "https://cdn/x").unwrap_err();
        assert!(matches!(err, TrackError::UploadFailed { .. }));
        assert!(staging_is_empty(&target));
    }

    #[rstest]
    #[case(Some(HttpResponse::new(403, b"denied".to_vec())))]
    #[case(None)]
    fn download_failure_never_uploads(#[case] reply: Option<HttpResponse>) {
        let tmp = TempDir::new().unwrap();
        let target = target(&tmp);
        let http = FixedHttp(reply);
        let store = RecordingStore::new(&target.staging_dir, |_| Ok(UploadOutcome::Created));

        let err = transfer(&http, &store, &target, &track("Song"), "https://cdn/x").unwrap_err();
        assert!(matches!(err, TrackError::DownloadFailed { .. }));
        assert!(store.uploads.lock().unwrap().is_empty());
        assert!(staging_is_empty(&target));
    }

    #[test]
    fn staging_failure_is_a_track_error() {
        let tmp = TempDir::new().unwrap();
        // A regular file where the staging directory should be.
        let blocked = tmp.path().join("staging");
        std::fs::write(&blocked, b"not a dir").unwrap();
        let target = TransferTarget {
            staging_dir: blocked,
            destination_prefix: "/x".to_string(),
        };
        let http = FixedHttp(Some(HttpResponse::new(200, b"bytes".to_vec())));
        let store = RecordingStore::new(tmp.path(), |_| Ok(UploadOutcome::Created));

        let err = transfer(&http, &store, &target, &track("Song"), "https://cdn/x").unwrap_err();
        assert_eq!(err.kind(), "staging_failed");
    }
}
