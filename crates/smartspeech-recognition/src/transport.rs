use async_trait::async_trait;
use futures_util::stream::BoxStream;
use smartspeech_grpc::proto::recognition::{RecognitionRequest, RecognitionResponse};
use tonic::Status;

pub type RequestStream = BoxStream<'static, RecognitionRequest>;
pub type ResponseStream = BoxStream<'static, Result<RecognitionResponse, Status>>;

/// An established bidirectional recognition call.
pub struct RecognitionCall {
    /// Correlation id from the call's initial metadata, if the server sent one.
    pub request_id: Option<String>,
    pub responses: ResponseStream,
}

/// Opens a `Recognize` call.
///
/// The implementation owns the outbound side once `open` is called: it must
/// keep pulling `requests` for as long as the call lives, and dropping the
/// returned response stream must end the call.
#[async_trait]
pub trait RecognitionTransport: Send {
    async fn open(&mut self, requests: RequestStream) -> Result<RecognitionCall, Status>;
}
