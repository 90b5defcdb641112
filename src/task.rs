use clap::Args;
use smartspeech_core::{AppConfig, ClientError, TaskEvent, TaskReply};
use smartspeech_task::{GrpcStorage, GrpcTaskService, ResultDownloader, TaskPoller, WaitOutcome};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Args)]
pub struct TaskArgs {
    #[arg(long)]
    task_id: String,

    /// Cancel the task
    #[arg(long, conflicts_with = "wait")]
    cancel: bool,

    /// Wait for the task to finish and download its result to OUTPUT
    #[arg(long, value_name = "OUTPUT")]
    wait: Option<PathBuf>,

    /// Seconds between status requests while waiting
    #[arg(long, value_name = "SECS")]
    poll_interval: Option<u64>,
}

/// Progress output for one event. `Failed` prints nothing: the error
/// itself is reported when the run returns.
fn progress_text(event: &TaskEvent) -> Option<String> {
    match event {
        TaskEvent::Pending => Some("-".to_string()),
        TaskEvent::Running => Some("+".to_string()),
        TaskEvent::Canceled => Some("\nTask has been canceled\n".to_string()),
        TaskEvent::Failed { .. } => None,
        TaskEvent::Done { artifact } => {
            Some(format!("\nTask has finished successfully: {artifact}\n"))
        }
        TaskEvent::Downloaded { .. } => Some("Output file has been downloaded\n".to_string()),
    }
}

fn print_reply(reply: &TaskReply) {
    if let Some(id) = &reply.request_id {
        println!("RequestID: {id}");
    }
    println!("Response: {:#?}", reply.task);
}

pub async fn run(config: &AppConfig, metadata: &[String], args: TaskArgs) -> Result<(), ClientError> {
    let interval = Duration::from_secs(
        args.poll_interval
            .unwrap_or(config.task.poll_interval_secs),
    );
    let (client, metadata) = crate::Connection::prepare(&config.connection, metadata)?
        .connect()
        .await?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        let mut stdout = std::io::stdout();
        while let Some(event) = rx.recv().await {
            if let Some(text) = progress_text(&event) {
                let _ = write!(stdout, "{text}");
                let _ = stdout.flush();
            }
        }
    });

    let mut poller =
        TaskPoller::new(GrpcTaskService::new(client.clone(), metadata.clone()), tx)
            .with_interval(interval);

    let result = if args.cancel {
        poller.cancel(&args.task_id).await.map(Some)
    } else if let Some(output) = &args.wait {
        let mut downloader = ResultDownloader::new(GrpcStorage::new(client, metadata));
        poller
            .wait(&args.task_id, &mut downloader, output)
            .await
            .map(|outcome| match outcome {
                WaitOutcome::Canceled(reply) => Some(reply),
                WaitOutcome::Downloaded { .. } => None,
            })
    } else {
        poller.poll_once(&args.task_id).await.map(Some)
    };

    drop(poller);
    let _ = printer.await;

    if let Some(reply) = result? {
        print_reply(&reply);
    }
    Ok(())
}
