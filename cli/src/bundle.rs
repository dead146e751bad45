use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use eyre::WrapErr;
use std::io::{Cursor, Write};
use std::path::Path;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;

/// The handlers' code, zipped from a local directory
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Bundle {
    /// Derived from the archive's content, so unchanged code keeps its object
    pub(crate) key: String,
    pub(crate) bytes: Vec<u8>,
}

impl Bundle {
    /// Zip every file under the directory, named relative to it
    pub(crate) fn from_dir(dir: &Path) -> eyre::Result<Self> {
        if !dir.is_dir() {
            eyre::bail!("Handlers' code directory {dir:?} does not exist");
        }

        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let mut files = 0;

        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.wrap_err(format!("Failed to walk {dir:?}"))?;

            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(dir)
                .wrap_err("Failed to strip the bundle directory")?;

            // Archive paths use forward slashes on every platform
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            let content = std::fs::read(entry.path())
                .wrap_err(format!("Could not read the file {:?}", entry.path()))?;

            // Fixed timestamps keep the archive, and thus the key, the same for the same files
            let options = SimpleFileOptions::default().last_modified_time(zip::DateTime::default());

            zip.start_file(name, options)
                .wrap_err("Could not open ZIP file")?;

            zip.write_all(&content)
                .wrap_err("Could not write to ZIP file")?;

            files += 1;
        }

        if files == 0 {
            eyre::bail!("Handlers' code directory {dir:?} is empty");
        }

        let bytes = zip
            .finish()
            .wrap_err("Could not close ZIP file")?
            .into_inner();

        log::debug!("Bundled {files} files from {dir:?}, {} bytes", bytes.len());

        Ok(Bundle {
            key: format!("lambda-{}.zip", sha256::digest(&bytes)),
            bytes,
        })
    }

    /// Same as `from_dir`, off the async runtime
    pub(crate) async fn build(dir: &Path) -> eyre::Result<Self> {
        let dir = dir.to_path_buf();

        // Zip crate doesn't have async support, so we have to use a blocking task here
        tokio::task::spawn_blocking(move || Self::from_dir(&dir))
            .await
            .wrap_err("Failed to spawn the blocking task")?
    }
}

/// Publishes bundles for the handlers to be created from
#[async_trait]
pub(crate) trait Uploader: Send + Sync {
    /// Returns `false` when the bundle is already there
    async fn upload(&self, bucket: &str, bundle: &Bundle) -> eyre::Result<bool>;
}

/// Uploader backed by AWS S3
pub(crate) struct S3 {
    client: aws_sdk_s3::Client,
}

impl S3 {
    pub(crate) async fn new(region: Option<&str>) -> Self {
        S3 {
            client: aws_sdk_s3::Client::new(&crate::provision::sdk_config(region).await),
        }
    }
}

#[async_trait]
impl Uploader for S3 {
    async fn upload(&self, bucket: &str, bundle: &Bundle) -> eyre::Result<bool> {
        let head = self
            .client
            .head_object()
            .bucket(bucket)
            .key(&bundle.key)
            .send()
            .await;

        match head {
            Ok(_) => {
                log::debug!("s3://{bucket}/{} exists, skipping upload", bundle.key);
                return Ok(false);
            }

            Err(e) if e.as_service_error().is_some_and(|e| e.is_not_found()) => {}

            Err(e) => {
                return Err(e).wrap_err(format!("Failed to check s3://{bucket}/{}", bundle.key))
            }
        }

        self.client
            .put_object()
            .bucket(bucket)
            .key(&bundle.key)
            .body(ByteStream::from(bundle.bytes.clone()))
            .send()
            .await
            .wrap_err("Failed to upload file to S3")?;

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn handlers() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("getItem.js"), "exports.handler = async () => {}").unwrap();
        fs::create_dir(dir.path().join("lib")).unwrap();
        fs::write(dir.path().join("lib").join("db.js"), "module.exports = {}").unwrap();
        dir
    }

    #[test]
    fn archive_holds_files_relative_to_the_directory() {
        let dir = handlers();
        let bundle = Bundle::from_dir(dir.path()).unwrap();

        let archive = zip::ZipArchive::new(Cursor::new(bundle.bytes)).unwrap();
        let mut names = archive.file_names().collect::<Vec<_>>();
        names.sort();

        assert_eq!(names, vec!["getItem.js", "lib/db.js"]);
        assert!(bundle.key.starts_with("lambda-"));
        assert!(bundle.key.ends_with(".zip"));
    }

    #[test]
    fn key_follows_the_content() {
        let dir = handlers();
        let first = Bundle::from_dir(dir.path()).unwrap();
        let again = Bundle::from_dir(dir.path()).unwrap();
        assert_eq!(first.key, again.key);

        fs::write(dir.path().join("getItem.js"), "exports.handler = async () => 1").unwrap();
        let changed = Bundle::from_dir(dir.path()).unwrap();
        assert_ne!(first.key, changed.key);
    }

    #[test]
    fn missing_or_empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Bundle::from_dir(dir.path()).is_err());
        assert!(Bundle::from_dir(&dir.path().join("lambda")).is_err());
    }

    #[tokio::test]
    async fn builds_off_the_runtime() {
        let dir = handlers();
        let bundle = Bundle::build(dir.path()).await.unwrap();
        assert_eq!(bundle, Bundle::from_dir(dir.path()).unwrap());
    }
}
