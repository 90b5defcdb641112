use std::path::PathBuf;
use std::time::SystemTime;

/// One candidate transcription. `rank` 1 is the most preferred.
#[derive(Debug, Clone, PartialEq)]
pub struct Hypothesis {
    pub rank: usize,
    pub text: String,
    pub normalized_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmotionScores {
    pub positive: f32,
    pub neutral: f32,
    pub negative: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionEvent {
    /// In-progress transcription, may still change.
    Partial { hypotheses: Vec<Hypothesis> },
    /// Finalized utterance boundary.
    Utterance {
        hypotheses: Vec<Hypothesis>,
        emotions: Option<EmotionScores>,
    },
}

impl RecognitionEvent {
    pub fn hypotheses(&self) -> &[Hypothesis] {
        match self {
            RecognitionEvent::Partial { hypotheses } => hypotheses,
            RecognitionEvent::Utterance { hypotheses, .. } => hypotheses,
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, RecognitionEvent::Utterance { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecognitionSummary {
    pub partials: usize,
    pub utterances: usize,
    /// `None` when the server closed the call before all audio was sent.
    pub chunks_sent: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    New,
    Running,
    Canceled,
    Error,
    Done,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Canceled | TaskStatus::Error | TaskStatus::Done
        )
    }

    /// Position along the lifecycle; terminal states share the last step.
    pub fn progress(&self) -> u8 {
        match self {
            TaskStatus::New => 0,
            TaskStatus::Running => 1,
            TaskStatus::Canceled | TaskStatus::Error | TaskStatus::Done => 2,
        }
    }
}

/// Server-issued id of a finished task's output.
///
/// Only [`TaskSnapshot::artifact`] hands these out, and only for `DONE` tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactHandle(String);

impl ArtifactHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ArtifactHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Client-side copy of a task as returned by the last poll.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSnapshot {
    pub id: String,
    pub status: TaskStatus,
    pub created_at: Option<SystemTime>,
    pub updated_at: Option<SystemTime>,
    error: String,
    response_file_id: String,
}

impl TaskSnapshot {
    pub fn new(id: impl Into<String>, status: TaskStatus) -> Self {
        Self {
            id: id.into(),
            status,
            created_at: None,
            updated_at: None,
            error: String::new(),
            response_file_id: String::new(),
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = error.into();
        self
    }

    pub fn with_response_file_id(mut self, id: impl Into<String>) -> Self {
        self.response_file_id = id.into();
        self
    }

    /// The server's error text; only meaningful in `ERROR`.
    pub fn error(&self) -> Option<&str> {
        (self.status == TaskStatus::Error).then_some(self.error.as_str())
    }

    /// The download handle; only present in `DONE` with a non-empty file id.
    pub fn artifact(&self) -> Option<ArtifactHandle> {
        if self.status == TaskStatus::Done && !self.response_file_id.is_empty() {
            Some(ArtifactHandle(self.response_file_id.clone()))
        } else {
            None
        }
    }
}

/// A task snapshot together with the correlation id of the call that fetched it.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskReply {
    pub task: TaskSnapshot,
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent {
    Pending,
    Running,
    Canceled,
    Failed { message: String },
    Done { artifact: ArtifactHandle },
    Downloaded { path: PathBuf, bytes: u64 },
}
