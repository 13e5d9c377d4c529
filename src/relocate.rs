//! Relocation of downloaded artifacts
//!
//! After every download attempt the temporary working directory is swept:
//! every regular file found there (the download command may produce auxiliary
//! files beyond the requested one) is moved into the request's output
//! directory, which is created on demand. Same-named files at the destination
//! are replaced. Individual move failures are logged and skipped; relocation
//! never fails a download or a batch.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Moves everything out of the temporary download directory
pub struct Relocator {
    temp_dir: PathBuf,
}

impl Relocator {
    /// Create a relocator sweeping the given temporary directory
    pub fn new(temp_dir: PathBuf) -> Self {
        Self { temp_dir }
    }

    /// Move all regular files from the temporary directory into `output_dir`
    ///
    /// The output directory is created if absent (an existing one is fine).
    /// Every failure along the way is reported and skipped.
    pub async fn relocate(&self, output_dir: &Path) {
        let files = match self.list_files().await {
            Ok(files) => files,
            Err(error) => {
                warn!(
                    dir = %self.temp_dir.display(),
                    error = %error,
                    "could not list temporary download folder"
                );
                return;
            }
        };
        if files.is_empty() {
            return;
        }
        info!(count = files.len(), "found file(s) in temporary download folder");

        if let Err(error) = tokio::fs::create_dir_all(output_dir).await {
            warn!(
                dir = %output_dir.display(),
                error = %error,
                "could not create output directory"
            );
            return;
        }

        for file in files {
            let Some(name) = file.file_name() else {
                continue;
            };
            let destination = output_dir.join(name);
            if tokio::fs::try_exists(&destination).await.unwrap_or(false) {
                info!(file = %destination.display(), "file already exists, we try to replace it");
            }
            info!(
                file = %file.display(),
                dir = %output_dir.display(),
                "attempt to move file to output directory"
            );
            if let Err(error) = move_file(&file, &destination).await {
                warn!(
                    file = %file.display(),
                    dir = %output_dir.display(),
                    error = %error,
                    "could not move the file"
                );
            }
        }
    }

    /// Regular files currently present in the temporary directory
    async fn list_files(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(&self.temp_dir).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                files.push(entry.path());
            }
        }
        // Deterministic sweep order, read_dir gives none
        files.sort();
        Ok(files)
    }
}

/// Move one file, falling back to copy+remove across filesystems
async fn move_file(source: &Path, destination: &Path) -> std::io::Result<()> {
    match tokio::fs::rename(source, destination).await {
        Ok(()) => Ok(()),
        Err(_) => {
            // Rename fails across mount points; the temp dir and output dir
            // commonly live on different filesystems
            tokio::fs::copy(source, destination).await?;
            tokio::fs::remove_file(source).await
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn moves_every_regular_file_into_the_output_directory() {
        let temp_dir = TempDir::new().unwrap();
        let out_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("a.mkv"), "video a").unwrap();
        std::fs::write(temp_dir.path().join("a.mkv.aria2"), "control file").unwrap();

        let relocator = Relocator::new(temp_dir.path().to_path_buf());
        relocator.relocate(out_dir.path()).await;

        assert!(out_dir.path().join("a.mkv").exists());
        assert!(out_dir.path().join("a.mkv.aria2").exists());
        assert!(!temp_dir.path().join("a.mkv").exists());
        assert!(!temp_dir.path().join("a.mkv.aria2").exists());
    }

    #[tokio::test]
    async fn creates_missing_output_directory() {
        let temp_dir = TempDir::new().unwrap();
        let out_root = TempDir::new().unwrap();
        let out_dir = out_root.path().join("series/s01");
        std::fs::write(temp_dir.path().join("a.mkv"), "video").unwrap();

        let relocator = Relocator::new(temp_dir.path().to_path_buf());
        relocator.relocate(&out_dir).await;

        assert!(out_dir.join("a.mkv").exists());
    }

    #[tokio::test]
    async fn replaces_existing_destination_files() {
        let temp_dir = TempDir::new().unwrap();
        let out_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("a.mkv"), "new contents").unwrap();
        std::fs::write(out_dir.path().join("a.mkv"), "old contents").unwrap();

        let relocator = Relocator::new(temp_dir.path().to_path_buf());
        relocator.relocate(out_dir.path()).await;

        assert_eq!(
            std::fs::read_to_string(out_dir.path().join("a.mkv")).unwrap(),
            "new contents"
        );
    }

    #[tokio::test]
    async fn subdirectories_are_left_in_place() {
        let temp_dir = TempDir::new().unwrap();
        let out_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join("partial")).unwrap();
        std::fs::write(temp_dir.path().join("a.mkv"), "video").unwrap();

        let relocator = Relocator::new(temp_dir.path().to_path_buf());
        relocator.relocate(out_dir.path()).await;

        assert!(temp_dir.path().join("partial").is_dir());
        assert!(!out_dir.path().join("partial").exists());
        assert!(out_dir.path().join("a.mkv").exists());
    }

    #[tokio::test]
    async fn empty_temporary_directory_is_a_no_op() {
        let temp_dir = TempDir::new().unwrap();
        let out_root = TempDir::new().unwrap();
        let out_dir = out_root.path().join("never-created");

        let relocator = Relocator::new(temp_dir.path().to_path_buf());
        relocator.relocate(&out_dir).await;

        // Nothing to move, so the output directory is not even created
        assert!(!out_dir.exists());
    }

    #[tokio::test]
    async fn missing_temporary_directory_is_survivable() {
        let out_dir = TempDir::new().unwrap();
        let relocator = Relocator::new(PathBuf::from("/nonexistent/push-dl-temp"));
        relocator.relocate(out_dir.path()).await;
    }
}
