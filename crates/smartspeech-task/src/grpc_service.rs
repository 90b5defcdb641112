use crate::service::{ChunkStream, StorageService, TaskService};
use async_trait::async_trait;
use futures_util::StreamExt;
use smartspeech_core::{ArtifactHandle, ClientError, TaskReply, TaskSnapshot};
use smartspeech_grpc::proto::storage::DownloadRequest;
use smartspeech_grpc::proto::task::{CancelTaskRequest, GetTaskRequest, Task};
use smartspeech_grpc::{request_id, CallMetadata, SmartSpeechClient};
use tonic::{Response, Status};

pub struct GrpcTaskService {
    client: SmartSpeechClient,
    metadata: CallMetadata,
}

impl GrpcTaskService {
    pub fn new(client: SmartSpeechClient, metadata: CallMetadata) -> Self {
        Self { client, metadata }
    }
}

fn reply(response: Response<Task>) -> Result<TaskReply, ClientError> {
    let request_id = request_id(response.metadata());
    let task = TaskSnapshot::try_from(response.into_inner())?;
    Ok(TaskReply { task, request_id })
}

#[async_trait]
impl TaskService for GrpcTaskService {
    async fn get_task(&mut self, task_id: &str) -> Result<TaskReply, ClientError> {
        let request = self.metadata.request(GetTaskRequest {
            task_id: task_id.to_string(),
        });
        reply(self.client.get_task(request).await?)
    }

    async fn cancel_task(&mut self, task_id: &str) -> Result<TaskReply, ClientError> {
        let request = self.metadata.request(CancelTaskRequest {
            task_id: task_id.to_string(),
        });
        reply(self.client.cancel_task(request).await?)
    }
}

pub struct GrpcStorage {
    client: SmartSpeechClient,
    metadata: CallMetadata,
}

impl GrpcStorage {
    pub fn new(client: SmartSpeechClient, metadata: CallMetadata) -> Self {
        Self { client, metadata }
    }
}

#[async_trait]
impl StorageService for GrpcStorage {
    async fn download(&mut self, artifact: &ArtifactHandle) -> Result<ChunkStream, Status> {
        let request = self.metadata.request(DownloadRequest {
            response_file_id: artifact.as_str().to_string(),
        });
        let response = self.client.download(request).await?;
        if let Some(id) = request_id(response.metadata()) {
            tracing::debug!(request_id = %id, artifact = %artifact, "download started");
        }
        Ok(response
            .into_inner()
            .map(|chunk| chunk.map(|c| c.file_chunk))
            .boxed())
    }
}
