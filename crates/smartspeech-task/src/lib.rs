pub mod downloader;
pub mod grpc_service;
pub mod poller;
pub mod service;

pub use downloader::ResultDownloader;
pub use grpc_service::{GrpcStorage, GrpcTaskService};
pub use poller::{TaskPoller, WaitOutcome, DEFAULT_POLL_INTERVAL};
pub use service::{ChunkStream, StorageService, TaskService};
