use crate::transport::{RecognitionCall, RecognitionTransport, RequestStream};
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use futures_util::StreamExt;
use smartspeech_grpc::proto::recognition::RecognitionResponse;
use smartspeech_grpc::{request_id, CallMetadata, SmartSpeechClient};
use tonic::codec::Streaming;
use tonic::{Request, Response, Status};

/// [`RecognitionTransport`] over a live gRPC channel.
pub struct GrpcRecognition {
    client: SmartSpeechClient,
    metadata: CallMetadata,
}

impl GrpcRecognition {
    pub fn new(client: SmartSpeechClient, metadata: CallMetadata) -> Self {
        Self { client, metadata }
    }
}

// Boxing the call future with an explicit `Send` bound sidesteps a rustc
// higher-ranked lifetime inference failure when the
// request stream is a boxed trait object.
fn recognize(
    client: &mut SmartSpeechClient,
    request: Request<RequestStream>,
) -> BoxFuture<'_, Result<Response<Streaming<RecognitionResponse>>, Status>> {
    Box::pin(client.recognize(request))
}

#[async_trait]
impl RecognitionTransport for GrpcRecognition {
    async fn open(&mut self, requests: RequestStream) -> Result<RecognitionCall, Status> {
        let response = recognize(&mut self.client, self.metadata.request(requests)).await?;
        let request_id = request_id(response.metadata());
        Ok(RecognitionCall {
            request_id,
            responses: response.into_inner().boxed(),
        })
    }
}
