//! Message types and client stubs generated from `proto/*.proto`.

pub mod recognition {
    tonic::include_proto!("smartspeech.recognition.v1");

    impl RecognitionRequest {
        pub fn options(options: RecognitionOptions) -> Self {
            Self {
                request: Some(recognition_request::Request::Options(options)),
            }
        }

        pub fn audio_chunk(chunk: ::bytes::Bytes) -> Self {
            Self {
                request: Some(recognition_request::Request::AudioChunk(chunk)),
            }
        }

        pub fn is_options(&self) -> bool {
            matches!(
                self.request,
                Some(recognition_request::Request::Options(_))
            )
        }
    }
}

pub mod task {
    tonic::include_proto!("smartspeech.task.v1");
}

pub mod storage {
    tonic::include_proto!("smartspeech.storage.v1");
}
