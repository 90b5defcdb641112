pub mod config;
pub mod duration;
pub mod error;
pub mod options;
pub mod types;

pub use config::AppConfig;
pub use duration::SpeechDuration;
pub use error::{ClientError, ConfigError, ValidationError};
pub use options::{Encoding, Hints, OptionValue, OptionsBuilder, RecognitionOptions, SpeakerSeparation};
pub use types::{
    ArtifactHandle, EmotionScores, Hypothesis, RecognitionEvent, RecognitionSummary, TaskEvent,
    TaskReply, TaskSnapshot, TaskStatus,
};
