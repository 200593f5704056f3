//! Directory-backed blob store. One file per handle; reads are streamed in
//! fixed-size chunks rather than loaded whole.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncReadExt;

use super::{validate_handle, Blob, BlobStore, Result};

const CHUNK_SIZE: usize = 64 * 1024;

pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub async fn open_dir(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    fn path_for(&self, handle: &str) -> Result<PathBuf> {
        validate_handle(handle)?;
        Ok(self.root.join(handle))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, handle: &str, _content_type: Option<&str>, bytes: Vec<u8>) -> Result<()> {
        let path = self.path_for(handle)?;
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    async fn open(&self, handle: &str) -> Result<Option<Blob>> {
        let path = self.path_for(handle)?;
        let file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let size = file.metadata().await?.len();

        let stream = futures::stream::try_unfold(file, |mut file| async move {
            let mut chunk = vec![0u8; CHUNK_SIZE];
            let read = file.read(&mut chunk).await?;
            if read == 0 {
                return Ok(None);
            }
            chunk.truncate(read);
            Ok::<_, std::io::Error>(Some((chunk, file)))
        });

        Ok(Some(Blob {
            content_type: content_type_for(handle).map(str::to_string),
            size: Some(size),
            stream: Box::pin(stream),
        }))
    }
}

fn content_type_for(handle: &str) -> Option<&'static str> {
    let ext = handle.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "bin" | "npy" => Some("application/octet-stream"),
        "json" => Some("application/json"),
        _ => None,
    }
}
