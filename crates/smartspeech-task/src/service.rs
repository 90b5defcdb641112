use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use smartspeech_core::{ArtifactHandle, ClientError, TaskReply};
use tonic::Status;

/// Artifact bytes in the order the server sends them.
pub type ChunkStream = BoxStream<'static, Result<Bytes, Status>>;

/// The task service's unary calls.
#[async_trait]
pub trait TaskService: Send {
    async fn get_task(&mut self, task_id: &str) -> Result<TaskReply, ClientError>;
    async fn cancel_task(&mut self, task_id: &str) -> Result<TaskReply, ClientError>;
}

/// Retrieval of finished task output.
#[async_trait]
pub trait StorageService: Send {
    async fn download(&mut self, artifact: &ArtifactHandle) -> Result<ChunkStream, Status>;
}
