//! Recording adapter for the `GenerationBackend` port.
//!
//! A stream call is recorded once its body ends (or is dropped), as a
//! single [`RecordedStream`] holding every chunk that was read.

use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::Stream;
use serde::Serialize;
use serde_json::json;

use super::{record_typed_result, redact};
use crate::cassette::format::RecordedStream;
use crate::cassette::recorder::CassetteRecorder;
use crate::error::BackendError;
use crate::ports::{
    ByteStream, CostFuture, CostRequest, GenerationBackend, GenerationRequest, StreamFuture,
};

/// Records backend calls while delegating to an inner implementation.
pub struct RecordingGenerationBackend {
    inner: Arc<dyn GenerationBackend>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingGenerationBackend {
    /// Creates a new recording backend wrapping the given implementation.
    pub fn new(
        inner: Arc<dyn GenerationBackend>,
        recorder: Arc<Mutex<CassetteRecorder>>,
    ) -> Self {
        Self { inner, recorder }
    }
}

#[derive(Serialize)]
struct CostInput<'a> {
    username: &'a str,
    repo: &'a str,
    instructions: &'a str,
    github_pat: Option<&'static str>,
}

impl<'a> From<&'a CostRequest> for CostInput<'a> {
    fn from(r: &'a CostRequest) -> Self {
        Self {
            username: &r.username,
            repo: &r.repo,
            instructions: &r.instructions,
            github_pat: redact(r.github_pat.as_ref()),
        }
    }
}

#[derive(Serialize)]
struct StreamInput {
    username: String,
    repo: String,
    instructions: String,
    api_key: Option<&'static str>,
    github_pat: Option<&'static str>,
}

impl From<&GenerationRequest> for StreamInput {
    fn from(r: &GenerationRequest) -> Self {
        Self {
            username: r.username.clone(),
            repo: r.repo.clone(),
            instructions: r.instructions.clone(),
            api_key: redact(r.api_key.as_ref()),
            github_pat: redact(r.github_pat.as_ref()),
        }
    }
}

impl GenerationBackend for RecordingGenerationBackend {
    fn estimate_cost(&self, request: &CostRequest) -> CostFuture<'_> {
        let request = request.clone();

        Box::pin(async move {
            let result = self.inner.estimate_cost(&request).await;
            let input = CostInput::from(&request);
            record_typed_result(&self.recorder, "backend", "estimate_cost", &input, &result);
            result
        })
    }

    fn stream(&self, request: &GenerationRequest) -> StreamFuture<'_> {
        let request = request.clone();

        Box::pin(async move {
            let input = StreamInput::from(&request);
            match self.inner.stream(&request).await {
                Ok(body) => Ok(Box::pin(RecordingStream {
                    inner: body,
                    pending: Some(Pending {
                        recorder: Arc::clone(&self.recorder),
                        input,
                        recorded: RecordedStream::default(),
                    }),
                }) as ByteStream),
                Err(err) => {
                    let result: Result<RecordedStream, BackendError> = Err(err.clone());
                    record_typed_result(&self.recorder, "backend", "stream", &input, &result);
                    Err(err)
                }
            }
        })
    }
}

struct Pending {
    recorder: Arc<Mutex<CassetteRecorder>>,
    input: StreamInput,
    recorded: RecordedStream,
}

impl Pending {
    fn flush(self) {
        let input = serde_json::to_value(&self.input).expect("failed to serialize recording input");
        let output = json!({ "Ok": self.recorded });
        let mut guard = self.recorder.lock().expect("recorder lock poisoned");
        guard.record("backend", "stream", input, output);
    }
}

/// Passes chunks through unchanged while collecting them for the cassette.
struct RecordingStream {
    inner: ByteStream,
    pending: Option<Pending>,
}

impl Stream for RecordingStream {
    type Item = Result<Bytes, BackendError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let polled = self.inner.as_mut().poll_next(cx);
        match &polled {
            Poll::Ready(Some(Ok(chunk))) => {
                if let Some(pending) = self.pending.as_mut() {
                    pending.recorded.chunks.push(String::from_utf8_lossy(chunk).into_owned());
                }
            }
            Poll::Ready(Some(Err(err))) => {
                if let Some(mut pending) = self.pending.take() {
                    pending.recorded.error = Some(err.clone());
                    pending.flush();
                }
            }
            Poll::Ready(None) => {
                if let Some(pending) = self.pending.take() {
                    pending.flush();
                }
            }
            Poll::Pending => {}
        }
        polled
    }
}

impl Drop for RecordingStream {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::replaying::ReplayingGenerationBackend;
    use crate::cassette::config::CassetteConfig;
    use crate::ports::CostEstimate;
    use futures_util::{stream, StreamExt};

    struct Scripted;

    impl GenerationBackend for Scripted {
        fn estimate_cost(&self, _request: &CostRequest) -> CostFuture<'_> {
            Box::pin(async { Err(BackendError::RateLimited) })
        }

        fn stream(&self, _request: &GenerationRequest) -> StreamFuture<'_> {
            let body = stream::iter(vec![
                Ok(Bytes::from_static(b"data: {\"status\":\"started\"}\n\n")),
                Ok(Bytes::from_static(b"data: {\"status\":\"complete\"}\n\n")),
                Err(BackendError::Transport("connection reset".into())),
            ]);
            Box::pin(async move { Ok(Box::pin(body) as ByteStream) })
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            username: "octo".into(),
            repo: "hello".into(),
            instructions: String::new(),
            api_key: Some("sk-secret".into()),
            github_pat: None,
        }
    }

    #[tokio::test]
    async fn stream_is_recorded_once_with_its_error_and_replays() {
        let dir = std::env::temp_dir().join("gitdiagram_rec_backend_test");
        let path = dir.join("backend.cassette.yaml");
        let recorder = Arc::new(Mutex::new(CassetteRecorder::new(&path, "test", "0.1.0")));

        let live_chunks: Vec<Result<Bytes, BackendError>> = {
            let backend = RecordingGenerationBackend::new(Arc::new(Scripted), Arc::clone(&recorder));
            let cost = CostRequest {
                username: "octo".into(),
                repo: "hello".into(),
                instructions: String::new(),
                github_pat: Some("ghp_secret".into()),
            };
            assert_eq!(backend.estimate_cost(&cost).await, Err(BackendError::RateLimited));
            let body = backend.stream(&request()).await.unwrap();
            body.collect().await
        };
        assert_eq!(live_chunks.len(), 3);

        let recorder = Arc::try_unwrap(recorder).unwrap().into_inner().unwrap();
        recorder.finish().unwrap();

        let yaml = std::fs::read_to_string(&path).unwrap();
        assert!(!yaml.contains("sk-secret"));
        assert!(!yaml.contains("ghp_secret"));

        let replay = ReplayingGenerationBackend::new(CassetteConfig::load_monolithic(&path).unwrap());
        let cost = CostRequest {
            username: "octo".into(),
            repo: "hello".into(),
            instructions: String::new(),
            github_pat: None,
        };
        assert_eq!(replay.estimate_cost(&cost).await, Err::<CostEstimate, _>(BackendError::RateLimited));
        let replayed: Vec<Result<Bytes, BackendError>> =
            replay.stream(&request()).await.unwrap().collect().await;
        assert_eq!(replayed, live_chunks);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn abandoned_stream_is_recorded_on_drop() {
        let dir = std::env::temp_dir().join("gitdiagram_rec_backend_drop_test");
        let path = dir.join("backend.cassette.yaml");
        let recorder = Arc::new(Mutex::new(CassetteRecorder::new(&path, "test", "0.1.0")));

        {
            let backend = RecordingGenerationBackend::new(Arc::new(Scripted), Arc::clone(&recorder));
            let mut body = backend.stream(&request()).await.unwrap();
            let _ = body.next().await;
        }

        let recorder = Arc::try_unwrap(recorder).unwrap().into_inner().unwrap();
        recorder.finish().unwrap();

        let mut replayer = CassetteConfig::load_monolithic(&path).unwrap();
        let output = replayer.next_interaction("backend", "stream").output;
        let recorded: RecordedStream = serde_json::from_value(output["Ok"].clone()).unwrap();
        assert_eq!(recorded.chunks.len(), 1);
        assert_eq!(recorded.error, None);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
