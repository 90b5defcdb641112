use crate::proto::recognition as pb;
use crate::proto::task as task_pb;
use smartspeech_core::{
    ClientError, EmotionScores, Encoding, Hypothesis, RecognitionEvent, RecognitionOptions,
    SpeechDuration, TaskSnapshot, TaskStatus,
};
use std::time::SystemTime;

fn duration(d: SpeechDuration) -> prost_types::Duration {
    prost_types::Duration {
        seconds: d.seconds(),
        nanos: d.nanos(),
    }
}

fn encoding(e: Encoding) -> pb::recognition_options::AudioEncoding {
    use pb::recognition_options::AudioEncoding;
    match e {
        Encoding::Pcm16le => AudioEncoding::PcmS16le,
        Encoding::Opus => AudioEncoding::Opus,
        Encoding::Mp3 => AudioEncoding::Mp3,
        Encoding::Flac => AudioEncoding::Flac,
        Encoding::Alaw => AudioEncoding::Alaw,
        Encoding::Mulaw => AudioEncoding::Mulaw,
    }
}

fn clamp_i32(v: u32) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

impl From<&RecognitionOptions> for pb::RecognitionOptions {
    fn from(o: &RecognitionOptions) -> Self {
        Self {
            audio_encoding: encoding(o.encoding) as i32,
            sample_rate: clamp_i32(o.sample_rate),
            model: o.model.clone(),
            hypotheses_count: clamp_i32(o.hypotheses_count),
            enable_profanity_filter: o.enable_profanity_filter,
            enable_multi_utterance: o.enable_multi_utterance,
            enable_partial_results: o.enable_partial_results,
            no_speech_timeout: Some(duration(o.no_speech_timeout)),
            max_speech_timeout: Some(duration(o.max_speech_timeout)),
            eou_timeout: o.eou_timeout.map(duration),
            channels_count: clamp_i32(o.channels_count),
            hints: o.hints.as_ref().map(|h| pb::Hints {
                words: h.words.clone().unwrap_or_default(),
                enable_letters: h.enable_letters,
                eou_timeout: h.eou_timeout.map(duration),
            }),
            speaker_separation_options: o.speaker_separation.as_ref().map(|s| {
                pb::SpeakerSeparationOptions {
                    enable: s.enable,
                    enable_only_main_speaker: s.enable_only_main_speaker,
                    count: clamp_i32(s.count),
                }
            }),
        }
    }
}

impl From<pb::RecognitionResponse> for RecognitionEvent {
    fn from(resp: pb::RecognitionResponse) -> Self {
        let hypotheses = resp
            .results
            .into_iter()
            .enumerate()
            .map(|(i, h)| Hypothesis {
                rank: i + 1,
                text: h.text,
                normalized_text: h.normalized_text,
            })
            .collect();

        if resp.eou {
            RecognitionEvent::Utterance {
                hypotheses,
                emotions: resp.emotions_result.map(|e| EmotionScores {
                    positive: e.positive,
                    neutral: e.neutral,
                    negative: e.negative,
                }),
            }
        } else {
            RecognitionEvent::Partial { hypotheses }
        }
    }
}

fn timestamp(ts: Option<prost_types::Timestamp>) -> Option<SystemTime> {
    ts.and_then(|ts| SystemTime::try_from(ts).ok())
}

impl TryFrom<task_pb::Task> for TaskSnapshot {
    type Error = ClientError;

    fn try_from(task: task_pb::Task) -> Result<Self, Self::Error> {
        use task_pb::task::Status;
        let status = match Status::try_from(task.status) {
            Ok(Status::New) => TaskStatus::New,
            Ok(Status::Running) => TaskStatus::Running,
            Ok(Status::Canceled) => TaskStatus::Canceled,
            Ok(Status::Done) => TaskStatus::Done,
            Ok(Status::Error) => TaskStatus::Error,
            Ok(Status::Unspecified) | Err(_) => {
                return Err(ClientError::application(format!(
                    "server returned unknown status {} for task {}",
                    task.status, task.id
                )))
            }
        };

        let mut snapshot = TaskSnapshot::new(task.id, status)
            .with_error(task.error)
            .with_response_file_id(task.response_file_id);
        snapshot.created_at = timestamp(task.created_at);
        snapshot.updated_at = timestamp(task.updated_at);
        Ok(snapshot)
    }
}
