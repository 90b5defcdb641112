use clap::Args;
use smartspeech_audio::{ChunkStreamer, PacingPolicy};
use smartspeech_core::{
    AppConfig, ClientError, OptionsBuilder, RecognitionEvent, RecognitionOptions, ValidationError,
};
use smartspeech_recognition::{GrpcRecognition, StreamingRecognitionClient};
use std::path::PathBuf;
use tokio::sync::mpsc;

#[derive(Args)]
pub struct RecognizeArgs {
    /// Audio file to recognize
    #[arg(long)]
    file: PathBuf,

    /// Print normalized text instead of raw text
    #[arg(long)]
    normalized_result: bool,

    /// Print emotion scores for finished utterances
    #[arg(long)]
    emotions_result: bool,

    /// One of pcm, opus, mp3, flac, alaw, mulaw
    #[arg(long, value_name = "ENCODING")]
    audio_encoding: Option<String>,

    /// PCM only
    #[arg(long)]
    sample_rate: Option<u32>,

    #[arg(long)]
    model: Option<String>,

    #[arg(long)]
    hypotheses_count: Option<u32>,

    #[arg(long)]
    enable_profanity_filter: bool,

    #[arg(long)]
    enable_multi_utterance: bool,

    #[arg(long)]
    enable_partial_results: bool,

    #[arg(long, value_name = "DURATION")]
    no_speech_timeout: Option<String>,

    #[arg(long, value_name = "DURATION")]
    max_speech_timeout: Option<String>,

    #[arg(long, value_name = "DURATION")]
    eou_timeout: Option<String>,

    #[arg(long, num_args = 1..)]
    hints_words: Vec<String>,

    #[arg(long)]
    hints_enable_letters: bool,

    #[arg(long, value_name = "DURATION")]
    hints_eou_timeout: Option<String>,

    #[arg(long)]
    channels_count: Option<u32>,

    #[arg(long)]
    speaker_separation_options_enable: bool,

    #[arg(long)]
    speaker_separation_options_enable_only_main_speaker: bool,

    #[arg(long)]
    speaker_separation_options_count: Option<u32>,

    /// Bytes per audio chunk
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Delay between audio chunks; 0 sends as fast as possible
    #[arg(long)]
    pacing_ms: Option<u64>,
}

impl RecognizeArgs {
    /// Config file entries first, flags on top. Boolean flags only ever switch
    /// an option on.
    fn options(&self, table: &toml::Table) -> Result<RecognitionOptions, ValidationError> {
        let on = |flag: bool| flag.then_some(true);
        OptionsBuilder::new()
            .extend_from_table(table)?
            .set_opt("audio_encoding", self.audio_encoding.clone())
            .set_opt("sample_rate", self.sample_rate)
            .set_opt("model", self.model.clone())
            .set_opt("hypotheses_count", self.hypotheses_count)
            .set_opt("enable_profanity_filter", on(self.enable_profanity_filter))
            .set_opt("enable_multi_utterance", on(self.enable_multi_utterance))
            .set_opt("enable_partial_results", on(self.enable_partial_results))
            .set_opt("no_speech_timeout", self.no_speech_timeout.clone())
            .set_opt("max_speech_timeout", self.max_speech_timeout.clone())
            .set_opt("eou_timeout", self.eou_timeout.clone())
            .set_opt(
                "hints_words",
                (!self.hints_words.is_empty()).then(|| self.hints_words.clone()),
            )
            .set_opt("hints_enable_letters", on(self.hints_enable_letters))
            .set_opt("hints_eou_timeout", self.hints_eou_timeout.clone())
            .set_opt("channels_count", self.channels_count)
            .set_opt(
                "speaker_separation_options_enable",
                on(self.speaker_separation_options_enable),
            )
            .set_opt(
                "speaker_separation_options_enable_only_main_speaker",
                on(self.speaker_separation_options_enable_only_main_speaker),
            )
            .set_opt(
                "speaker_separation_options_count",
                self.speaker_separation_options_count,
            )
            .build()
    }
}

#[derive(Debug, Clone, Copy)]
struct ResultStyle {
    normalized: bool,
    emotions: bool,
}

fn render(event: &RecognitionEvent, style: ResultStyle) -> String {
    let mut out = String::from(if event.is_final() {
        "Got end-of-utterance result:\n"
    } else {
        "Got partial result:\n"
    });
    for hyp in event.hypotheses() {
        let text = if style.normalized {
            &hyp.normalized_text
        } else {
            &hyp.text
        };
        out.push_str(&format!("  Hyp #{}: {}\n", hyp.rank, text));
    }
    if let RecognitionEvent::Utterance {
        emotions: Some(e), ..
    } = event
    {
        if style.emotions {
            out.push_str(&format!(
                "  Emotions: pos={}, neu={}, neg={}\n",
                e.positive, e.neutral, e.negative
            ));
        }
    }
    out
}

pub async fn run(
    config: &AppConfig,
    metadata: &[String],
    args: RecognizeArgs,
) -> Result<(), ClientError> {
    let options = args.options(&config.recognition)?;
    let connection = crate::Connection::prepare(&config.connection, metadata)?;
    let chunk_size = args.chunk_size.unwrap_or(config.streaming.chunk_size);
    let pacing = PacingPolicy::from_millis(args.pacing_ms.unwrap_or(config.streaming.pacing_ms));
    let audio = ChunkStreamer::open(&args.file, chunk_size, pacing)
        .await
        .map_err(|e| {
            ClientError::application(format!("failed to open {}: {e}", args.file.display()))
        })?;

    let (client, metadata) = connection.connect().await?;
    let mut recognizer = StreamingRecognitionClient::new(GrpcRecognition::new(client, metadata));

    let style = ResultStyle {
        normalized: args.normalized_result,
        emotions: args.emotions_result,
    };
    let (tx, mut rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            print!("{}", render(&event, style));
        }
    });

    let result = recognizer.recognize(&options, audio, tx).await;
    let _ = printer.await;

    if let Ok(summary) = &result {
        tracing::debug!(?summary, "recognition summary");
        println!("Recognition has finished");
    }
    if let Some(id) = recognizer.request_id() {
        println!("RequestID: {id}");
    }
    result.map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use smartspeech_core::{EmotionScores, Encoding, Hypothesis};

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: RecognizeArgs,
    }

    fn parse(extra: &[&str]) -> RecognizeArgs {
        let mut argv = vec!["recognize", "--file", "audio.pcm"];
        argv.extend_from_slice(extra);
        Harness::parse_from(argv).args
    }

    fn hyp(rank: usize, text: &str) -> Hypothesis {
        Hypothesis {
            rank,
            text: text.to_string(),
            normalized_text: format!("{text}."),
        }
    }

    #[test]
    fn test_flags_override_config_table() {
        let table: toml::Table = toml::from_str(
            r#"
            model = "general"
            sample_rate = 8000
            hints_words = ["alpha"]
            "#,
        )
        .unwrap();
        let options = parse(&["--sample-rate", "48000", "--audio-encoding", "opus"])
            .options(&table)
            .unwrap();
        assert_eq!(options.model, "general");
        assert_eq!(options.sample_rate, 48000);
        assert_eq!(options.encoding, Encoding::Opus);
        assert_eq!(
            options.hints.unwrap().words,
            Some(vec!["alpha".to_string()])
        );
    }

    #[test]
    fn test_unset_flags_leave_defaults() {
        let options = parse(&[]).options(&toml::Table::new()).unwrap();
        assert_eq!(options, RecognitionOptions::default());
    }

    #[test]
    fn test_nested_flags_are_routed() {
        let options = parse(&[
            "--hints-words",
            "sber",
            "salute",
            "--hints-eou-timeout",
            "2s",
            "--speaker-separation-options-enable",
            "--speaker-separation-options-count",
            "2",
        ])
        .options(&toml::Table::new())
        .unwrap();
        let hints = options.hints.unwrap();
        assert_eq!(hints.words.unwrap(), vec!["sber", "salute"]);
        assert_eq!(hints.eou_timeout.unwrap().to_string(), "2s");
        let separation = options.speaker_separation.unwrap();
        assert!(separation.enable);
        assert_eq!(separation.count, 2);
    }

    #[test]
    fn test_bad_duration_flag_is_validation_error() {
        let err = parse(&["--no-speech-timeout", "7x"])
            .options(&toml::Table::new())
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidDuration { .. }));
    }

    #[tokio::test]
    async fn test_validation_runs_before_audio_is_opened() {
        let missing = ["--file", "/nonexistent/audio.pcm"];
        let args = Harness::parse_from(["recognize"].into_iter().chain(missing)).args;
        let odd = vec!["x-only-key".to_string()];
        assert!(matches!(
            run(&AppConfig::default(), &odd, args).await,
            Err(ClientError::Validation(_))
        ));

        let mut config = AppConfig::default();
        config.connection.cert = Some(PathBuf::from("client.pem"));
        let args = Harness::parse_from(["recognize"].into_iter().chain(missing)).args;
        assert!(matches!(
            run(&config, &[], args).await,
            Err(ClientError::Validation(_))
        ));
    }

    #[test]
    fn test_render_partial() {
        let event = RecognitionEvent::Partial {
            hypotheses: vec![hyp(1, "hello"), hyp(2, "yellow")],
        };
        let style = ResultStyle {
            normalized: false,
            emotions: true,
        };
        assert_eq!(
            render(&event, style),
            "Got partial result:\n  Hyp #1: hello\n  Hyp #2: yellow\n"
        );
    }

    #[test]
    fn test_render_utterance_with_emotions() {
        let event = RecognitionEvent::Utterance {
            hypotheses: vec![hyp(1, "hello")],
            emotions: Some(EmotionScores {
                positive: 0.5,
                neutral: 0.25,
                negative: 0.25,
            }),
        };
        let normalized = ResultStyle {
            normalized: true,
            emotions: true,
        };
        assert_eq!(
            render(&event, normalized),
            "Got end-of-utterance result:\n  Hyp #1: hello.\n  Emotions: pos=0.5, neu=0.25, neg=0.25\n"
        );

        let plain = ResultStyle {
            normalized: false,
            emotions: false,
        };
        assert_eq!(
            render(&event, plain),
            "Got end-of-utterance result:\n  Hyp #1: hello\n"
        );
    }
}
