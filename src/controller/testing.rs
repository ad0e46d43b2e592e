//! Recording fakes for the service traits.
//!
//! All three fakes share one [`Recorder`], so tests can assert the order of
//! calls across services.

use std::sync::Arc;

use parking_lot::Mutex;

use super::services::{
    Directive, FlushPolicy, LocaleStatus, Presenter, RecognitionRequest, SpeechInput, SpeechOutput, UtteranceTag,
};

/// A call made by the controller on one of its services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SetLocale(String),
    Speak { text: String, flush: FlushPolicy, tag: Option<UtteranceTag> },
    Recognize(RecognitionRequest),
    ShowText(String),
    TriggerEnabled(bool),
    Direct(Directive),
}

impl Call {
    /// Calls the user can hear or is asked to act on.
    pub fn is_output(&self) -> bool {
        matches!(self, Call::Speak { .. } | Call::Direct(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<Call>>>);

impl Recorder {
    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().clone()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }

    fn push(&self, call: Call) {
        self.0.lock().push(call);
    }
}

pub struct FakeOutput {
    recorder: Recorder,
    locale_status: LocaleStatus,
}

impl SpeechOutput for FakeOutput {
    fn set_voice_locale(&mut self, locale: &str) -> LocaleStatus {
        self.recorder.push(Call::SetLocale(locale.to_string()));
        self.locale_status
    }

    fn speak(&mut self, text: &str, flush: FlushPolicy, tag: Option<UtteranceTag>) {
        self.recorder.push(Call::Speak { text: text.to_string(), flush, tag });
    }
}

pub struct FakeInput {
    recorder: Recorder,
    available: bool,
}

impl SpeechInput for FakeInput {
    fn is_available(&self) -> bool {
        self.available
    }

    fn request_recognition(&mut self, request: RecognitionRequest) {
        self.recorder.push(Call::Recognize(request));
    }
}

pub struct FakePresenter {
    recorder: Recorder,
}

impl Presenter for FakePresenter {
    fn show_text(&mut self, text: &str) {
        self.recorder.push(Call::ShowText(text.to_string()));
    }

    fn set_trigger_enabled(&mut self, enabled: bool) {
        self.recorder.push(Call::TriggerEnabled(enabled));
    }

    fn direct(&mut self, directive: Directive) {
        self.recorder.push(Call::Direct(directive));
    }
}

/// Build the three fakes around a fresh recorder.
pub fn fake_services(recognizer_available: bool, locale_status: LocaleStatus) -> (FakeOutput, FakeInput, FakePresenter, Recorder) {
    let recorder = Recorder::default();
    (
        FakeOutput { recorder: recorder.clone(), locale_status },
        FakeInput { recorder: recorder.clone(), available: recognizer_available },
        FakePresenter { recorder: recorder.clone() },
        recorder,
    )
}
