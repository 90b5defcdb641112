pub mod client;
pub mod grpc_transport;
pub mod transport;

pub use client::StreamingRecognitionClient;
pub use grpc_transport::GrpcRecognition;
pub use transport::{RecognitionCall, RecognitionTransport, RequestStream, ResponseStream};
