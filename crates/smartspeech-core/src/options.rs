//! Recognition options and the builder that assembles them from flat keys.
//!
//! Keys are routed through static tables: `hints_*` keys land in [`Hints`],
//! `speaker_separation_options_*` keys land in [`SpeakerSeparation`], every
//! other key is looked up in the top-level table. Unknown keys fail the build.

use crate::duration::SpeechDuration;
use crate::error::ValidationError;
use std::str::FromStr;

pub const HINTS_PREFIX: &str = "hints_";
pub const SPEAKER_SEPARATION_PREFIX: &str = "speaker_separation_options_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Pcm16le,
    Opus,
    Mp3,
    Flac,
    Alaw,
    Mulaw,
}

impl Encoding {
    pub const ALL: [Encoding; 6] = [
        Encoding::Pcm16le,
        Encoding::Opus,
        Encoding::Mp3,
        Encoding::Flac,
        Encoding::Alaw,
        Encoding::Mulaw,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Pcm16le => "pcm",
            Encoding::Opus => "opus",
            Encoding::Mp3 => "mp3",
            Encoding::Flac => "flac",
            Encoding::Alaw => "alaw",
            Encoding::Mulaw => "mulaw",
        }
    }
}

impl FromStr for Encoding {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Encoding::ALL
            .into_iter()
            .find(|e| e.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ValidationError::UnknownEncoding(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Hints {
    /// `None` unless at least one word was supplied.
    pub words: Option<Vec<String>>,
    pub enable_letters: bool,
    pub eou_timeout: Option<SpeechDuration>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpeakerSeparation {
    pub enable: bool,
    pub enable_only_main_speaker: bool,
    pub count: u32,
}

/// Validated options sent as the first message of a recognition stream.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionOptions {
    pub encoding: Encoding,
    pub sample_rate: u32,
    pub model: String,
    pub hypotheses_count: u32,
    pub enable_profanity_filter: bool,
    pub enable_multi_utterance: bool,
    pub enable_partial_results: bool,
    pub no_speech_timeout: SpeechDuration,
    pub max_speech_timeout: SpeechDuration,
    pub eou_timeout: Option<SpeechDuration>,
    pub channels_count: u32,
    pub hints: Option<Hints>,
    pub speaker_separation: Option<SpeakerSeparation>,
}

impl Default for RecognitionOptions {
    fn default() -> Self {
        Self {
            encoding: Encoding::Pcm16le,
            sample_rate: 16000,
            model: String::new(),
            hypotheses_count: 1,
            enable_profanity_filter: false,
            enable_multi_utterance: false,
            enable_partial_results: false,
            no_speech_timeout: SpeechDuration::from_secs(7),
            max_speech_timeout: SpeechDuration::from_secs(20),
            eou_timeout: None,
            channels_count: 1,
            hints: None,
            speaker_separation: None,
        }
    }
}

/// A raw, untyped option value as it arrives from flags or a config table.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Text(String),
    Flag(bool),
    Integer(i64),
    List(Vec<String>),
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        OptionValue::Text(v.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(v: String) -> Self {
        OptionValue::Text(v)
    }
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        OptionValue::Flag(v)
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        OptionValue::Integer(v)
    }
}

impl From<u32> for OptionValue {
    fn from(v: u32) -> Self {
        OptionValue::Integer(v as i64)
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(v: Vec<String>) -> Self {
        OptionValue::List(v)
    }
}

impl OptionValue {
    fn from_toml(field: &str, value: &toml::Value) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidValue {
            field: field.to_string(),
            expected: "a string, boolean, integer or list of strings",
        };
        match value {
            toml::Value::String(s) => Ok(OptionValue::Text(s.clone())),
            toml::Value::Boolean(b) => Ok(OptionValue::Flag(*b)),
            toml::Value::Integer(i) => Ok(OptionValue::Integer(*i)),
            toml::Value::Array(items) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string).ok_or_else(invalid))
                .collect::<Result<Vec<_>, _>>()
                .map(OptionValue::List),
            _ => Err(invalid()),
        }
    }

    fn text(self, field: &str) -> Result<String, ValidationError> {
        match self {
            OptionValue::Text(s) => Ok(s),
            _ => Err(ValidationError::InvalidValue {
                field: field.to_string(),
                expected: "a string",
            }),
        }
    }

    fn flag(self, field: &str) -> Result<bool, ValidationError> {
        match self {
            OptionValue::Flag(b) => Ok(b),
            OptionValue::Text(s) if s.eq_ignore_ascii_case("true") => Ok(true),
            OptionValue::Text(s) if s.eq_ignore_ascii_case("false") => Ok(false),
            _ => Err(ValidationError::InvalidValue {
                field: field.to_string(),
                expected: "a boolean",
            }),
        }
    }

    fn count(self, field: &str) -> Result<u32, ValidationError> {
        let invalid = || ValidationError::InvalidValue {
            field: field.to_string(),
            expected: "a non-negative integer",
        };
        match self {
            OptionValue::Integer(i) => u32::try_from(i).map_err(|_| invalid()),
            OptionValue::Text(s) => s.trim().parse::<u32>().map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }

    fn duration(self, field: &str) -> Result<SpeechDuration, ValidationError> {
        let text = self.text(field)?;
        text.parse()
            .map_err(|_| ValidationError::InvalidDuration {
                field: field.to_string(),
                value: text,
            })
    }

    fn list(self, field: &str) -> Result<Vec<String>, ValidationError> {
        match self {
            OptionValue::List(items) => Ok(items),
            OptionValue::Text(s) if s.trim().is_empty() => Ok(Vec::new()),
            OptionValue::Text(s) => Ok(vec![s]),
            _ => Err(ValidationError::InvalidValue {
                field: field.to_string(),
                expected: "a list of strings",
            }),
        }
    }
}

type Setter<T> = fn(&mut T, &str, OptionValue) -> Result<(), ValidationError>;

static TOP_LEVEL: &[(&str, Setter<RecognitionOptions>)] = &[
    ("audio_encoding", |o, k, v| {
        o.encoding = v.text(k)?.parse()?;
        Ok(())
    }),
    ("sample_rate", |o, k, v| {
        o.sample_rate = v.count(k)?;
        Ok(())
    }),
    ("model", |o, k, v| {
        o.model = v.text(k)?;
        Ok(())
    }),
    ("hypotheses_count", |o, k, v| {
        o.hypotheses_count = v.count(k)?;
        Ok(())
    }),
    ("enable_profanity_filter", |o, k, v| {
        o.enable_profanity_filter = v.flag(k)?;
        Ok(())
    }),
    ("enable_multi_utterance", |o, k, v| {
        o.enable_multi_utterance = v.flag(k)?;
        Ok(())
    }),
    ("enable_partial_results", |o, k, v| {
        o.enable_partial_results = v.flag(k)?;
        Ok(())
    }),
    ("no_speech_timeout", |o, k, v| {
        o.no_speech_timeout = v.duration(k)?;
        Ok(())
    }),
    ("max_speech_timeout", |o, k, v| {
        o.max_speech_timeout = v.duration(k)?;
        Ok(())
    }),
    ("eou_timeout", |o, k, v| {
        o.eou_timeout = Some(v.duration(k)?);
        Ok(())
    }),
    ("channels_count", |o, k, v| {
        o.channels_count = v.count(k)?;
        Ok(())
    }),
];

static HINTS: &[(&str, Setter<RecognitionOptions>)] = &[
    ("words", |o, k, v| {
        let words = v.list(k)?;
        if !words.is_empty() {
            o.hints.get_or_insert_with(Hints::default).words = Some(words);
        }
        Ok(())
    }),
    ("enable_letters", |o, k, v| {
        o.hints.get_or_insert_with(Hints::default).enable_letters = v.flag(k)?;
        Ok(())
    }),
    ("eou_timeout", |o, k, v| {
        o.hints.get_or_insert_with(Hints::default).eou_timeout = Some(v.duration(k)?);
        Ok(())
    }),
];

static SPEAKER_SEPARATION: &[(&str, Setter<RecognitionOptions>)] = &[
    ("enable", |o, k, v| {
        o.speaker_separation
            .get_or_insert_with(SpeakerSeparation::default)
            .enable = v.flag(k)?;
        Ok(())
    }),
    ("enable_only_main_speaker", |o, k, v| {
        o.speaker_separation
            .get_or_insert_with(SpeakerSeparation::default)
            .enable_only_main_speaker = v.flag(k)?;
        Ok(())
    }),
    ("count", |o, k, v| {
        o.speaker_separation
            .get_or_insert_with(SpeakerSeparation::default)
            .count = v.count(k)?;
        Ok(())
    }),
];

fn route(key: &str) -> Option<Setter<RecognitionOptions>> {
    let (table, field) = if let Some(field) = key.strip_prefix(HINTS_PREFIX) {
        (HINTS, field)
    } else if let Some(field) = key.strip_prefix(SPEAKER_SEPARATION_PREFIX) {
        (SPEAKER_SEPARATION, field)
    } else {
        (TOP_LEVEL, key)
    };
    table
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, setter)| *setter)
}

fn normalize_key(key: &str) -> String {
    key.trim().replace('-', "_").to_ascii_lowercase()
}

/// Collects flat `name = value` entries and validates them into a
/// [`RecognitionOptions`]. Later entries override earlier ones.
#[derive(Debug, Clone, Default)]
pub struct OptionsBuilder {
    entries: Vec<(String, OptionValue)>,
}

impl OptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: impl AsRef<str>, value: impl Into<OptionValue>) -> Self {
        self.entries.push((normalize_key(name.as_ref()), value.into()));
        self
    }

    pub fn set_opt<V: Into<OptionValue>>(self, name: impl AsRef<str>, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(name, v),
            None => self,
        }
    }

    /// Append every entry of a TOML table (typically `[recognition]`).
    pub fn extend_from_table(mut self, table: &toml::Table) -> Result<Self, ValidationError> {
        for (name, value) in table {
            let key = normalize_key(name);
            let value = OptionValue::from_toml(&key, value)?;
            self.entries.push((key, value));
        }
        Ok(self)
    }

    pub fn build(self) -> Result<RecognitionOptions, ValidationError> {
        let mut options = RecognitionOptions::default();
        for (key, value) in self.entries {
            let setter = route(&key).ok_or_else(|| ValidationError::UnknownOption(key.clone()))?;
            setter(&mut options, &key, value)?;
        }
        tracing::debug!(?options, "recognition options built");
        Ok(options)
    }
}
