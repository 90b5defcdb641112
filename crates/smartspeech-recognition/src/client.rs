use crate::transport::RecognitionTransport;
use futures_util::StreamExt;
use smartspeech_audio::ChunkStreamer;
use smartspeech_core::{ClientError, RecognitionEvent, RecognitionOptions, RecognitionSummary};
use smartspeech_grpc::proto::recognition::{self as pb, RecognitionRequest};
use smartspeech_grpc::request_id;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio_stream::wrappers::ReceiverStream;

/// Requests buffered between the audio producer and the call.
const OUTBOUND_BUFFER: usize = 8;

/// Aborts the wrapped task when dropped.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Future for AbortOnDrop<T> {
    type Output = Result<T, JoinError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx)
    }
}

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Drives one `Recognize` call per [`recognize`](Self::recognize).
pub struct StreamingRecognitionClient<T> {
    transport: T,
    request_id: Option<String>,
}

impl<T: RecognitionTransport> StreamingRecognitionClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            request_id: None,
        }
    }

    /// Correlation id of the most recent call. Kept after a failure as long
    /// as the server sent one.
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Stream `audio` under `options` and publish every response on `events`.
    ///
    /// The options message is sent first and exactly once, followed by the
    /// audio chunks in order. Responses are consumed while audio is still
    /// being sent. Returns once the server closes the response stream.
    pub async fn recognize<R>(
        &mut self,
        options: &RecognitionOptions,
        audio: ChunkStreamer<R>,
        events: mpsc::UnboundedSender<RecognitionEvent>,
    ) -> Result<RecognitionSummary, ClientError>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        self.request_id = None;

        let (tx, rx) = mpsc::channel(OUTBOUND_BUFFER);
        let first = RecognitionRequest::options(pb::RecognitionOptions::from(options));
        let mut producer = AbortOnDrop(tokio::spawn(send_audio(first, audio, tx)));

        let call = match self.transport.open(ReceiverStream::new(rx).boxed()).await {
            Ok(call) => call,
            Err(status) => {
                self.request_id = request_id(status.metadata());
                return Err(status.into());
            }
        };
        self.request_id = call.request_id;
        if let Some(id) = &self.request_id {
            tracing::info!(request_id = %id, "recognition call opened");
        }

        let mut responses = call.responses;
        let mut summary = RecognitionSummary::default();
        let mut producer_done = false;

        loop {
            tokio::select! {
                biased;
                sent = &mut producer, if !producer_done => {
                    producer_done = true;
                    summary.chunks_sent = producer_result(sent)?;
                    tracing::debug!(chunks = ?summary.chunks_sent, "audio stream finished");
                }
                item = responses.next() => match item {
                    Some(Ok(response)) => {
                        let event = RecognitionEvent::from(response);
                        if event.is_final() {
                            summary.utterances += 1;
                        } else {
                            summary.partials += 1;
                        }
                        let _ = events.send(event);
                    }
                    Some(Err(status)) => {
                        if self.request_id.is_none() {
                            self.request_id = request_id(status.metadata());
                        }
                        tracing::warn!(code = ?status.code(), "recognition call failed");
                        return Err(status.into());
                    }
                    None => break,
                }
            }
        }

        // A producer that already failed explains why the server hung up.
        if !producer_done && producer.0.is_finished() {
            summary.chunks_sent = producer_result((&mut producer).await)?;
        }
        if summary.chunks_sent.is_none() {
            tracing::warn!("server closed the call before all audio was sent");
        }
        tracing::info!(
            partials = summary.partials,
            utterances = summary.utterances,
            "recognition finished"
        );
        Ok(summary)
    }
}

fn producer_result(
    joined: Result<Result<Option<usize>, ClientError>, JoinError>,
) -> Result<Option<usize>, ClientError> {
    match joined {
        Ok(sent) => sent,
        Err(e) => Err(ClientError::application(format!(
            "audio producer stopped: {e}"
        ))),
    }
}

/// Sends `options`, then every chunk of `audio`. Yields the number of chunks
/// sent, or `None` if the call stopped taking requests before the audio ran
/// out.
async fn send_audio<R>(
    options: RecognitionRequest,
    mut audio: ChunkStreamer<R>,
    tx: mpsc::Sender<RecognitionRequest>,
) -> Result<Option<usize>, ClientError>
where
    R: AsyncRead + Unpin,
{
    if tx.send(options).await.is_err() {
        tracing::debug!("request stream closed before options were sent");
        return Ok(None);
    }

    let mut sent = 0;
    while let Some(chunk) = audio
        .next_chunk()
        .await
        .map_err(|e| ClientError::application(format!("failed to read audio: {e}")))?
    {
        if tx.send(RecognitionRequest::audio_chunk(chunk)).await.is_err() {
            tracing::debug!(
                sent,
                read = audio.chunks_yielded(),
                "request stream closed, stopping audio"
            );
            return Ok(None);
        }
        sent += 1;
    }
    Ok(Some(sent))
}
