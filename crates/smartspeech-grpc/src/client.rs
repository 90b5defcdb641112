use crate::proto::recognition::smart_speech_client::SmartSpeechClient as RecognitionClient;
use crate::proto::storage::smart_speech_client::SmartSpeechClient as StorageClient;
use crate::proto::task::smart_speech_client::SmartSpeechClient as TaskClient;
use crate::proto::{recognition, storage, task};
use tonic::codec::Streaming;
use tonic::transport::Channel;
use tonic::{Request, Response, Status};

/// The recognition, task and storage services over one shared channel.
#[derive(Debug, Clone)]
pub struct SmartSpeechClient {
    recognition: RecognitionClient<Channel>,
    task: TaskClient<Channel>,
    storage: StorageClient<Channel>,
}

impl SmartSpeechClient {
    pub fn new(channel: Channel) -> Self {
        Self {
            recognition: RecognitionClient::new(channel.clone()),
            task: TaskClient::new(channel.clone()),
            storage: StorageClient::new(channel),
        }
    }

    pub async fn recognize<S>(
        &mut self,
        request: Request<S>,
    ) -> Result<Response<Streaming<recognition::RecognitionResponse>>, Status>
    where
        S: futures_util::Stream<Item = recognition::RecognitionRequest> + Send + 'static,
    {
        self.recognition.recognize(request).await
    }

    pub async fn get_task(
        &mut self,
        request: Request<task::GetTaskRequest>,
    ) -> Result<Response<task::Task>, Status> {
        self.task.get_task(request).await
    }

    pub async fn cancel_task(
        &mut self,
        request: Request<task::CancelTaskRequest>,
    ) -> Result<Response<task::Task>, Status> {
        self.task.cancel_task(request).await
    }

    pub async fn download(
        &mut self,
        request: Request<storage::DownloadRequest>,
    ) -> Result<Response<Streaming<storage::DownloadResponse>>, Status> {
        self.storage.download(request).await
    }
}

/// Reads the correlation id the server attaches to a call's initial metadata.
pub fn request_id(metadata: &tonic::metadata::MetadataMap) -> Option<String> {
    metadata
        .get(crate::REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
