//! Speech input service.
//!
//! Each recognition request runs on its own thread (capture + VAD + Whisper are
//! all blocking) and posts exactly one outcome back to the session.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, warn};

use super::recognizer::Recognizer;
use crate::audio;
use crate::controller::services::{RecognitionOutcome, RecognitionRequest, SpeechInput};
use crate::error::SpeechError;

/// Speech input backed by a local recognizer, if one could be loaded.
pub struct ListeningService {
    recognizer: Option<Arc<Recognizer>>,
    outcomes: UnboundedSender<RecognitionOutcome>,
}

impl ListeningService {
    /// Wrap a recognizer load result. A failed load makes the service report itself unavailable.
    pub fn new(recognizer: Result<Recognizer, SpeechError>, outcomes: UnboundedSender<RecognitionOutcome>) -> Self {
        let recognizer = match recognizer {
            Ok(r) => Some(Arc::new(r)),
            Err(e) => {
                warn!("❌ {}", e);
                None
            }
        };
        Self { recognizer, outcomes }
    }

    fn post(&self, outcome: RecognitionOutcome) {
        if self.outcomes.send(outcome).is_err() {
            debug!("Recognition outcome channel closed");
        }
    }
}

impl SpeechInput for ListeningService {
    fn is_available(&self) -> bool {
        self.recognizer.is_some() && audio::input_device_available()
    }

    fn request_recognition(&mut self, request: RecognitionRequest) {
        let Some(recognizer) = self.recognizer.clone() else {
            self.post(RecognitionOutcome::Failure(SpeechError::RecognizerUnavailable("no recognizer loaded".to_string())));
            return;
        };

        let outcomes = self.outcomes.clone();

        let spawned = std::thread::Builder::new().name("recognition".to_string()).spawn(move || {
            let outcome = match recognizer.recognize(&request) {
                Ok(Some(text)) => RecognitionOutcome::Success(text),
                Ok(None) => RecognitionOutcome::NoResult,
                Err(e) => RecognitionOutcome::Failure(e),
            };
            if outcomes.send(outcome).is_err() {
                debug!("Recognition outcome channel closed");
            }
        });

        if let Err(e) = spawned {
            error!("Failed to spawn recognition thread: {}", e);
            self.post(RecognitionOutcome::Failure(SpeechError::Recognition(e.to_string())));
        }
    }
}
