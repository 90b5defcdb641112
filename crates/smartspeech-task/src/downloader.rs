use crate::service::StorageService;
use futures_util::StreamExt;
use smartspeech_core::{ArtifactHandle, ClientError};
use std::path::Path;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Writes a finished task's output to a local sink.
///
/// Chunks are written in receipt order with no integrity check. A failure
/// mid-transfer leaves whatever was already written in place.
pub struct ResultDownloader<S> {
    storage: S,
}

impl<S: StorageService> ResultDownloader<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Returns the number of bytes written.
    pub async fn download_to<W>(
        &mut self,
        artifact: &ArtifactHandle,
        sink: &mut W,
    ) -> Result<u64, ClientError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let mut chunks = self.storage.download(artifact).await?;
        let mut written = 0u64;

        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            sink.write_all(&chunk)
                .await
                .map_err(|e| ClientError::application(format!("failed to write output: {e}")))?;
            written += chunk.len() as u64;
            tracing::trace!(len = chunk.len(), written, "artifact chunk written");
        }

        sink.flush()
            .await
            .map_err(|e| ClientError::application(format!("failed to write output: {e}")))?;
        Ok(written)
    }

    pub async fn download_to_path(
        &mut self,
        artifact: &ArtifactHandle,
        path: &Path,
    ) -> Result<u64, ClientError> {
        let mut file = tokio::fs::File::create(path).await.map_err(|e| {
            ClientError::application(format!("failed to create {}: {e}", path.display()))
        })?;
        let outcome = self.download_to(artifact, &mut file).await;
        // Settle the partial output before reporting a failure.
        let _ = file.flush().await;
        let bytes = outcome?;
        tracing::info!(artifact = %artifact, bytes, path = %path.display(), "artifact downloaded");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::ChunkStream;
    use async_trait::async_trait;
    use bytes::Bytes;
    use smartspeech_core::{TaskSnapshot, TaskStatus};
    use tonic::Status;

    struct Chunks(Vec<Result<Bytes, Status>>);

    #[async_trait]
    impl StorageService for Chunks {
        async fn download(&mut self, _artifact: &ArtifactHandle) -> Result<ChunkStream, Status> {
            Ok(futures_util::stream::iter(std::mem::take(&mut self.0)).boxed())
        }
    }

    struct Missing;

    #[async_trait]
    impl StorageService for Missing {
        async fn download(&mut self, artifact: &ArtifactHandle) -> Result<ChunkStream, Status> {
            Err(Status::not_found(format!("no file {artifact}")))
        }
    }

    fn artifact() -> ArtifactHandle {
        TaskSnapshot::new("t", TaskStatus::Done)
            .with_response_file_id("file-1")
            .artifact()
            .unwrap()
    }

    #[tokio::test]
    async fn test_chunks_are_concatenated_in_order() {
        let mut downloader = ResultDownloader::new(Chunks(vec![
            Ok(Bytes::from_static(b"b1")),
            Ok(Bytes::from_static(b"-b2")),
            Ok(Bytes::from_static(b"-b3")),
        ]));
        let mut sink = Vec::new();
        let written = downloader.download_to(&artifact(), &mut sink).await.unwrap();
        assert_eq!(sink, b"b1-b2-b3");
        assert_eq!(written, 8);
    }

    #[tokio::test]
    async fn test_empty_artifact_writes_nothing() {
        let mut downloader = ResultDownloader::new(Chunks(vec![]));
        let mut sink = Vec::new();
        assert_eq!(downloader.download_to(&artifact(), &mut sink).await.unwrap(), 0);
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_refused_download_is_transport_error() {
        let mut downloader = ResultDownloader::new(Missing);
        let mut sink = Vec::new();
        match downloader.download_to(&artifact(), &mut sink).await {
            Err(ClientError::Transport { code, message }) => {
                assert_eq!(code, tonic::Code::NotFound);
                assert!(message.contains("file-1"));
            }
            other => panic!("expected Transport, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failure_mid_transfer_keeps_partial_output() {
        let dir = std::env::temp_dir().join("smartspeech_download_partial");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("out.bin");
        let _ = std::fs::remove_file(&path);

        let mut downloader = ResultDownloader::new(Chunks(vec![
            Ok(Bytes::from_static(b"first")),
            Err(Status::unavailable("connection reset")),
            Ok(Bytes::from_static(b"never")),
        ]));
        let result = downloader.download_to_path(&artifact(), &path).await;
        assert!(matches!(
            result,
            Err(ClientError::Transport {
                code: tonic::Code::Unavailable,
                ..
            })
        ));
        assert_eq!(std::fs::read(&path).unwrap(), b"first");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_uncreatable_output_is_application_error() {
        let mut downloader = ResultDownloader::new(Chunks(vec![]));
        let path = Path::new("/nonexistent-dir/out.bin");
        assert!(matches!(
            downloader.download_to_path(&artifact(), path).await,
            Err(ClientError::Application(_))
        ));
    }
}
