use crate::downloader::ResultDownloader;
use crate::service::{StorageService, TaskService};
use smartspeech_core::{ClientError, TaskEvent, TaskReply, TaskStatus};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// How a [`TaskPoller::wait`] that did not fail came to an end.
#[derive(Debug, Clone, PartialEq)]
pub enum WaitOutcome {
    Canceled(TaskReply),
    Downloaded { reply: TaskReply, bytes: u64 },
}

/// Drives one task through its lifecycle: a single poll, a cancel, or a
/// wait until it reaches a terminal status.
///
/// Progress is published on the event channel as it is observed.
pub struct TaskPoller<T> {
    service: T,
    interval: Duration,
    events: mpsc::UnboundedSender<TaskEvent>,
}

impl<T: TaskService> TaskPoller<T> {
    pub fn new(service: T, events: mpsc::UnboundedSender<TaskEvent>) -> Self {
        Self {
            service,
            interval: DEFAULT_POLL_INTERVAL,
            events,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    fn emit(&self, event: TaskEvent) {
        let _ = self.events.send(event);
    }

    /// One status request, reported whatever the status is.
    pub async fn poll_once(&mut self, task_id: &str) -> Result<TaskReply, ClientError> {
        let reply = self.service.get_task(task_id).await?;
        tracing::debug!(task_id, status = ?reply.task.status, "task polled");
        Ok(reply)
    }

    /// One cancel request. Never polls and never downloads.
    pub async fn cancel(&mut self, task_id: &str) -> Result<TaskReply, ClientError> {
        let reply = self.service.cancel_task(task_id).await?;
        tracing::info!(task_id, status = ?reply.task.status, "cancel requested");
        Ok(reply)
    }

    /// Poll every interval until the task is terminal.
    ///
    /// On `DONE` the task's artifact is downloaded to `output`; that is the
    /// only path that downloads. `ERROR` ends in [`ClientError::TaskFailed`].
    pub async fn wait<S: StorageService>(
        &mut self,
        task_id: &str,
        downloader: &mut ResultDownloader<S>,
        output: &Path,
    ) -> Result<WaitOutcome, ClientError> {
        let mut last: Option<TaskStatus> = None;

        loop {
            tokio::time::sleep(self.interval).await;
            let reply = self.service.get_task(task_id).await?;
            let status = reply.task.status;

            if let Some(previous) = last {
                if status.progress() < previous.progress() {
                    tracing::warn!(task_id, ?previous, ?status, "task status moved backwards");
                }
            }
            last = Some(status);

            match status {
                TaskStatus::New => self.emit(TaskEvent::Pending),
                TaskStatus::Running => self.emit(TaskEvent::Running),
                TaskStatus::Canceled => {
                    tracing::info!(task_id, "task was canceled");
                    self.emit(TaskEvent::Canceled);
                    return Ok(WaitOutcome::Canceled(reply));
                }
                TaskStatus::Error => {
                    let message = reply.task.error().unwrap_or_default().to_string();
                    tracing::warn!(task_id, error = %message, "task failed");
                    self.emit(TaskEvent::Failed {
                        message: message.clone(),
                    });
                    return Err(ClientError::TaskFailed {
                        task_id: reply.task.id,
                        message,
                    });
                }
                TaskStatus::Done => {
                    let artifact = reply.task.artifact().ok_or_else(|| {
                        ClientError::application(format!(
                            "task {} finished without a result file",
                            reply.task.id
                        ))
                    })?;
                    tracing::info!(task_id, artifact = %artifact, "task finished");
                    self.emit(TaskEvent::Done {
                        artifact: artifact.clone(),
                    });

                    let bytes = downloader.download_to_path(&artifact, output).await?;
                    self.emit(TaskEvent::Downloaded {
                        path: output.to_path_buf(),
                        bytes,
                    });
                    return Ok(WaitOutcome::Downloaded { reply, bytes });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::ChunkStream;
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures_util::StreamExt;
    use smartspeech_core::{ArtifactHandle, TaskSnapshot};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tonic::Status;

    /// Replays one snapshot per `get_task`; cancel returns a fixed snapshot.
    struct Scripted {
        polls: VecDeque<TaskSnapshot>,
        cancel_reply: TaskSnapshot,
        gets: Arc<AtomicUsize>,
    }

    impl Scripted {
        fn new(statuses: &[TaskStatus]) -> Self {
            Self {
                polls: statuses.iter().map(|s| snapshot(*s)).collect(),
                cancel_reply: snapshot(TaskStatus::Canceled),
                gets: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    fn snapshot(status: TaskStatus) -> TaskSnapshot {
        TaskSnapshot::new("task-1", status)
            .with_response_file_id("file-1")
            .with_error("bad audio")
    }

    #[async_trait]
    impl TaskService for Scripted {
        async fn get_task(&mut self, _task_id: &str) -> Result<TaskReply, ClientError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            let task = self
                .polls
                .pop_front()
                .ok_or_else(|| ClientError::application("script exhausted"))?;
            Ok(TaskReply {
                task,
                request_id: Some("req-7".to_string()),
            })
        }

        async fn cancel_task(&mut self, _task_id: &str) -> Result<TaskReply, ClientError> {
            Ok(TaskReply {
                task: self.cancel_reply.clone(),
                request_id: None,
            })
        }
    }

    #[derive(Clone, Default)]
    struct CountingStorage {
        downloads: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl StorageService for CountingStorage {
        async fn download(&mut self, _artifact: &ArtifactHandle) -> Result<ChunkStream, Status> {
            self.downloads.fetch_add(1, Ordering::SeqCst);
            Ok(futures_util::stream::iter(vec![Ok(Bytes::from_static(b"{}"))]).boxed())
        }
    }

    fn output_path(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join("smartspeech_poller_test");
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<TaskEvent>) -> Vec<TaskEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_done_downloads_once() {
        use TaskStatus::*;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut poller = TaskPoller::new(Scripted::new(&[New, New, Running, Done]), tx);
        let storage = CountingStorage::default();
        let downloads = storage.downloads.clone();
        let mut downloader = ResultDownloader::new(storage);
        let path = output_path("done.json");

        let start = tokio::time::Instant::now();
        let outcome = poller.wait("task-1", &mut downloader, &path).await.unwrap();
        assert!(start.elapsed() >= DEFAULT_POLL_INTERVAL * 4);

        assert!(matches!(outcome, WaitOutcome::Downloaded { bytes: 2, .. }));
        assert_eq!(downloads.load(Ordering::SeqCst), 1);

        let events = drain(&mut rx);
        let artifact = snapshot(Done).artifact().unwrap();
        assert_eq!(
            events,
            vec![
                TaskEvent::Pending,
                TaskEvent::Pending,
                TaskEvent::Running,
                TaskEvent::Done { artifact },
                TaskEvent::Downloaded {
                    path: path.clone(),
                    bytes: 2
                },
            ]
        );
        assert_eq!(std::fs::read(&path).unwrap(), b"{}");
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_stops_at_canceled_without_download() {
        use TaskStatus::*;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let service = Scripted::new(&[Running, Canceled, Done]);
        let gets = service.gets.clone();
        let mut poller = TaskPoller::new(service, tx);
        let storage = CountingStorage::default();
        let downloads = storage.downloads.clone();
        let mut downloader = ResultDownloader::new(storage);

        let outcome = poller
            .wait("task-1", &mut downloader, &output_path("canceled.json"))
            .await
            .unwrap();
        assert!(matches!(outcome, WaitOutcome::Canceled(_)));
        assert_eq!(gets.load(Ordering::SeqCst), 2);
        assert_eq!(downloads.load(Ordering::SeqCst), 0);
        assert_eq!(drain(&mut rx), vec![TaskEvent::Running, TaskEvent::Canceled]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_reports_task_error() {
        use TaskStatus::*;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut poller = TaskPoller::new(Scripted::new(&[New, Error]), tx);
        let storage = CountingStorage::default();
        let downloads = storage.downloads.clone();
        let mut downloader = ResultDownloader::new(storage);

        match poller
            .wait("task-1", &mut downloader, &output_path("error.json"))
            .await
        {
            Err(ClientError::TaskFailed { task_id, message }) => {
                assert_eq!(task_id, "task-1");
                assert_eq!(message, "bad audio");
            }
            other => panic!("expected TaskFailed, got {other:?}"),
        }
        assert_eq!(downloads.load(Ordering::SeqCst), 0);
        assert_eq!(
            drain(&mut rx),
            vec![
                TaskEvent::Pending,
                TaskEvent::Failed {
                    message: "bad audio".to_string()
                }
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_done_without_file_id_is_application_error() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut service = Scripted::new(&[]);
        service
            .polls
            .push_back(TaskSnapshot::new("task-1", TaskStatus::Done));
        let mut poller = TaskPoller::new(service, tx);
        let storage = CountingStorage::default();
        let downloads = storage.downloads.clone();
        let mut downloader = ResultDownloader::new(storage);

        let result = poller
            .wait("task-1", &mut downloader, &output_path("nofile.json"))
            .await;
        assert!(matches!(result, Err(ClientError::Application(_))));
        assert_eq!(downloads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_interval_is_honoured() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut poller = TaskPoller::new(
            Scripted::new(&[TaskStatus::Running, TaskStatus::Canceled]),
            tx,
        )
        .with_interval(Duration::from_millis(250));
        let mut downloader = ResultDownloader::new(CountingStorage::default());

        let start = tokio::time::Instant::now();
        poller
            .wait("task-1", &mut downloader, &output_path("interval.json"))
            .await
            .unwrap();
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(500));
        assert!(elapsed < Duration::from_millis(750));
    }

    #[tokio::test]
    async fn test_poll_once_reports_any_status() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut poller = TaskPoller::new(Scripted::new(&[TaskStatus::Running]), tx);
        let reply = poller.poll_once("task-1").await.unwrap();
        assert_eq!(reply.task.status, TaskStatus::Running);
        assert_eq!(reply.request_id.as_deref(), Some("req-7"));
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_cancel_of_done_task_never_downloads() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut service = Scripted::new(&[]);
        service.cancel_reply = snapshot(TaskStatus::Done);
        let gets = service.gets.clone();
        let mut poller = TaskPoller::new(service, tx);
        let storage = CountingStorage::default();
        let downloads = storage.downloads.clone();
        let _downloader = ResultDownloader::new(storage);

        let reply = poller.cancel("task-1").await.unwrap();
        assert_eq!(reply.task.status, TaskStatus::Done);
        assert_eq!(gets.load(Ordering::SeqCst), 0);
        assert_eq!(downloads.load(Ordering::SeqCst), 0);
        assert!(drain(&mut rx).is_empty());
    }
}
