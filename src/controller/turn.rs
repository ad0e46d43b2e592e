//! Voice-interaction turn controller.
//!
//! One turn is: speak the menu → wait for that utterance to finish → check the
//! recognizer → listen → classify → speak the answer. The controller is driven
//! entirely by the session loop, one event at a time, so turn state needs no
//! locking. Stray notifications are filtered by phase and typed tag, not by
//! comparing strings.

use tracing::{debug, info, warn};

use super::services::{
    Directive, FlushPolicy, InitStatus, LanguageModel, LocaleStatus, Presenter, RecognitionOutcome, RecognitionRequest, SpeechInput,
    SpeechOutput, UtteranceTag,
};
use crate::error::SpeechError;
use crate::menu::{self, Classification};

/// Where the current turn is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnPhase {
    /// No turn in progress; the trigger is enabled.
    #[default]
    Idle,
    /// The menu prompt is being spoken.
    AwaitingSynthesis,
    /// A recognition request is outstanding.
    AwaitingRecognition,
    /// No recognizer was found. The trigger stays disabled for the rest of the session.
    Blocked,
}

/// Per-session turn state.
#[derive(Debug, Clone, Default)]
pub struct TurnState {
    displayed_text: String, // Text region contents ("" shows the menu note)
    phase: TurnPhase,       // Current turn phase
    synthesis_ready: bool,  // Engine initialized successfully
}

impl TurnState {
    pub fn displayed_text(&self) -> &str {
        &self.displayed_text
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn synthesis_ready(&self) -> bool {
        self.synthesis_ready
    }

    /// The trigger is enabled exactly while no turn is running.
    pub fn input_enabled(&self) -> bool {
        self.phase == TurnPhase::Idle
    }
}

/// Drives turns against a speech output, a speech input and a presenter.
pub struct TurnController<O, I, P> {
    output: O,
    input: I,
    presenter: P,
    locale: String,
    state: TurnState,
}

impl<O, I, P> TurnController<O, I, P>
where
    O: SpeechOutput,
    I: SpeechInput,
    P: Presenter,
{
    /// Create a controller for the given voice/recognition locale.
    ///
    /// The presenter is immediately put into its initial state: menu note shown,
    /// trigger enabled.
    pub fn new(output: O, input: I, mut presenter: P, locale: impl Into<String>) -> Self {
        let state = TurnState::default();
        presenter.show_text(&state.displayed_text);
        presenter.set_trigger_enabled(state.input_enabled());

        Self { output, input, presenter, locale: locale.into(), state }
    }

    pub fn state(&self) -> &TurnState {
        &self.state
    }

    /// Handle the synthesis engine's initialization result.
    pub fn on_synthesis_initialized(&mut self, status: InitStatus) {
        match status {
            InitStatus::Ready => {
                info!("🔊 Speech synthesis ready");
                self.state.synthesis_ready = true;

                match self.output.set_voice_locale(&self.locale) {
                    LocaleStatus::Ok => debug!("Voice locale set to {}", self.locale),
                    status => {
                        let err = match status {
                            LocaleStatus::MissingData => SpeechError::VoiceDataMissing(self.locale.clone()),
                            _ => SpeechError::UnsupportedLocale(self.locale.clone()),
                        };
                        warn!("❌ {}", err);
                        self.presenter.direct(Directive::InstallVoiceData { locale: self.locale.clone() });
                    }
                }

                self.output.speak(menu::GREETING, FlushPolicy::Flush, None);
            }
            InitStatus::Failed(e) => {
                warn!("❌ {}", e);
                self.presenter.direct(Directive::InstallSynthesisEngine);
            }
        }
    }

    /// Start a turn in response to the trigger.
    ///
    /// Does nothing unless synthesis is ready and no turn is running.
    pub fn start_turn(&mut self) {
        if !self.state.synthesis_ready {
            debug!("Trigger ignored: speech synthesis not ready");
            return;
        }
        if !self.state.input_enabled() {
            debug!("Trigger ignored: turn in progress ({:?})", self.state.phase);
            return;
        }

        info!("▶️  Turn started");
        self.set_displayed_text(String::new());
        self.output.speak(menu::MENU_NOTE, FlushPolicy::Flush, Some(UtteranceTag::TurnPrompt));
        self.set_phase(TurnPhase::AwaitingSynthesis);
    }

    pub fn on_utterance_started(&mut self, tag: Option<UtteranceTag>) {
        debug!("Utterance started: {:?}", tag);
    }

    /// Handle completion of an utterance.
    ///
    /// Only the completion of this turn's menu prompt moves the turn forward.
    pub fn on_synthesis_done(&mut self, tag: Option<UtteranceTag>) {
        if tag != Some(UtteranceTag::TurnPrompt) || self.state.phase != TurnPhase::AwaitingSynthesis {
            debug!("Utterance done: {:?} (no action in {:?})", tag, self.state.phase);
            return;
        }

        if !self.input.is_available() {
            warn!("❌ No speech recognizer available");
            self.output.speak(menu::NOT_DETECTED, FlushPolicy::Flush, None);
            self.presenter.direct(Directive::InstallRecognizer);
            self.set_phase(TurnPhase::Blocked);
            return;
        }

        info!("🎤 Listening ({})", self.locale);
        self.input.request_recognition(RecognitionRequest {
            locale: self.locale.clone(),
            language_model: LanguageModel::FreeForm,
            prompt: menu::RECOGNITION_PROMPT.to_string(),
        });
        self.set_phase(TurnPhase::AwaitingRecognition);
    }

    pub fn on_utterance_error(&mut self, tag: Option<UtteranceTag>) {
        warn!("Speech error for utterance {:?}", tag);
        self.abandon_prompt(tag);
    }

    pub fn on_utterance_stopped(&mut self, tag: Option<UtteranceTag>) {
        debug!("Utterance stopped: {:?}", tag);
        self.abandon_prompt(tag);
    }

    /// Handle the answer to the outstanding recognition request.
    pub fn on_recognition_result(&mut self, outcome: RecognitionOutcome) {
        if self.state.phase != TurnPhase::AwaitingRecognition {
            warn!("Recognition outcome without an outstanding request, ignoring");
            return;
        }

        match outcome {
            RecognitionOutcome::Success(heard) => self.answer(heard),
            RecognitionOutcome::NoResult => {
                info!("No transcription for the captured speech");
                self.answer(menu::EMPTY_RESULT_TEXT.to_string());
            }
            RecognitionOutcome::Failure(e) => {
                warn!("❌ {}", e);
                self.set_displayed_text(menu::FAILURE_TEXT.to_string());
            }
        }

        self.set_phase(TurnPhase::Idle);
    }

    /// Show what was heard and speak the matching response or the fallback.
    fn answer(&mut self, heard: String) {
        info!("🗣️ You: {}", heard);

        let classification = menu::classify(&heard);
        debug!("Normalized transcript: \"{}\"", classification.normalized());
        self.set_displayed_text(heard);

        let tag = match &classification {
            Classification::Choice { choice, .. } => {
                info!("✅ Option {} selected", choice.number());
                None
            }
            Classification::Unclassified { normalized } => {
                info!("❓ No option matched \"{}\"", normalized);
                Some(UtteranceTag::RetryPrompt)
            }
        };
        self.output.speak(&classification.spoken_text(), FlushPolicy::Flush, tag);
    }

    /// A turn prompt that will never finish ends the turn instead of leaving the trigger disabled.
    fn abandon_prompt(&mut self, tag: Option<UtteranceTag>) {
        if tag == Some(UtteranceTag::TurnPrompt) && self.state.phase == TurnPhase::AwaitingSynthesis {
            info!("Turn prompt did not finish, turn abandoned");
            self.set_phase(TurnPhase::Idle);
        }
    }

    fn set_displayed_text(&mut self, text: String) {
        self.state.displayed_text = text;
        self.presenter.show_text(&self.state.displayed_text);
    }

    fn set_phase(&mut self, phase: TurnPhase) {
        let was_enabled = self.state.input_enabled();
        self.state.phase = phase;
        if self.state.input_enabled() != was_enabled {
            self.presenter.set_trigger_enabled(self.state.input_enabled());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::testing::{Call, Recorder, fake_services};

    type TestController = TurnController<
        crate::controller::testing::FakeOutput,
        crate::controller::testing::FakeInput,
        crate::controller::testing::FakePresenter,
    >;

    fn ready_controller(recognizer_available: bool) -> (TestController, Recorder) {
        let (output, input, presenter, recorder) = fake_services(recognizer_available, LocaleStatus::Ok);
        let mut controller = TurnController::new(output, input, presenter, "id-ID");
        controller.on_synthesis_initialized(InitStatus::Ready);
        recorder.clear();
        (controller, recorder)
    }

    fn menu_prompt() -> Call {
        Call::Speak { text: menu::MENU_NOTE.to_string(), flush: FlushPolicy::Flush, tag: Some(UtteranceTag::TurnPrompt) }
    }

    #[test]
    fn test_new_shows_menu_and_enables_trigger() {
        let (output, input, presenter, recorder) = fake_services(true, LocaleStatus::Ok);
        let controller = TurnController::new(output, input, presenter, "id-ID");

        assert_eq!(recorder.calls(), vec![Call::ShowText(String::new()), Call::TriggerEnabled(true)]);
        assert!(controller.state().input_enabled());
        assert!(!controller.state().synthesis_ready());
    }

    #[test]
    fn test_ready_sets_locale_and_greets() {
        let (output, input, presenter, recorder) = fake_services(true, LocaleStatus::Ok);
        let mut controller = TurnController::new(output, input, presenter, "id-ID");
        recorder.clear();

        controller.on_synthesis_initialized(InitStatus::Ready);

        assert!(controller.state().synthesis_ready());
        assert_eq!(
            recorder.calls(),
            vec![
                Call::SetLocale("id-ID".to_string()),
                Call::Speak { text: menu::GREETING.to_string(), flush: FlushPolicy::Flush, tag: None },
            ]
        );
    }

    #[test]
    fn test_missing_voice_data_directs_install_then_greets() {
        let (output, input, presenter, recorder) = fake_services(true, LocaleStatus::MissingData);
        let mut controller = TurnController::new(output, input, presenter, "id-ID");
        recorder.clear();

        controller.on_synthesis_initialized(InitStatus::Ready);

        assert_eq!(
            recorder.calls(),
            vec![
                Call::SetLocale("id-ID".to_string()),
                Call::Direct(Directive::InstallVoiceData { locale: "id-ID".to_string() }),
                Call::Speak { text: menu::GREETING.to_string(), flush: FlushPolicy::Flush, tag: None },
            ]
        );
    }

    #[test]
    fn test_init_failure_leaves_controller_inert() {
        let (output, input, presenter, recorder) = fake_services(true, LocaleStatus::Ok);
        let mut controller = TurnController::new(output, input, presenter, "id-ID");
        recorder.clear();

        controller.on_synthesis_initialized(InitStatus::Failed(SpeechError::SynthesisInit("model missing".to_string())));
        controller.start_turn();
        controller.start_turn();

        assert_eq!(recorder.calls(), vec![Call::Direct(Directive::InstallSynthesisEngine)]);
        assert!(!controller.state().synthesis_ready());
        assert_eq!(controller.state().displayed_text(), "");
    }

    #[test]
    fn test_start_turn_speaks_menu_and_disables_trigger() {
        let (mut controller, recorder) = ready_controller(true);

        controller.start_turn();

        assert_eq!(recorder.calls(), vec![Call::ShowText(String::new()), menu_prompt(), Call::TriggerEnabled(false)]);
        assert_eq!(controller.state().phase(), TurnPhase::AwaitingSynthesis);
        assert!(!controller.state().input_enabled());
    }

    #[test]
    fn test_start_turn_while_disabled_is_noop() {
        let (mut controller, recorder) = ready_controller(true);
        controller.start_turn();
        recorder.clear();

        controller.start_turn();
        assert!(recorder.calls().is_empty());

        controller.on_synthesis_done(Some(UtteranceTag::TurnPrompt));
        recorder.clear();
        controller.start_turn();
        assert!(recorder.calls().is_empty());
        assert_eq!(controller.state().phase(), TurnPhase::AwaitingRecognition);
    }

    #[test]
    fn test_prompt_done_requests_recognition() {
        let (mut controller, recorder) = ready_controller(true);
        controller.start_turn();
        recorder.clear();

        controller.on_synthesis_done(Some(UtteranceTag::TurnPrompt));

        assert_eq!(
            recorder.calls(),
            vec![Call::Recognize(RecognitionRequest {
                locale: "id-ID".to_string(),
                language_model: LanguageModel::FreeForm,
                prompt: menu::RECOGNITION_PROMPT.to_string(),
            })]
        );
        assert_eq!(controller.state().phase(), TurnPhase::AwaitingRecognition);
    }

    #[test]
    fn test_unrelated_completion_does_not_start_recognition() {
        let (mut controller, recorder) = ready_controller(true);
        controller.start_turn();
        recorder.clear();

        controller.on_synthesis_done(None);
        controller.on_synthesis_done(Some(UtteranceTag::RetryPrompt));

        assert!(recorder.calls().is_empty());
        assert_eq!(controller.state().phase(), TurnPhase::AwaitingSynthesis);
    }

    #[test]
    fn test_prompt_done_outside_turn_is_ignored() {
        let (mut controller, recorder) = ready_controller(true);

        controller.on_synthesis_done(Some(UtteranceTag::TurnPrompt));

        assert!(recorder.calls().is_empty());
        assert_eq!(controller.state().phase(), TurnPhase::Idle);
    }

    #[test]
    fn test_recognizer_unavailable_blocks_turn() {
        let (mut controller, recorder) = ready_controller(false);

        controller.start_turn();
        controller.on_synthesis_done(Some(UtteranceTag::TurnPrompt));

        let outputs: Vec<Call> = recorder.calls().into_iter().filter(Call::is_output).collect();
        assert_eq!(
            outputs,
            vec![
                menu_prompt(),
                Call::Speak { text: menu::NOT_DETECTED.to_string(), flush: FlushPolicy::Flush, tag: None },
                Call::Direct(Directive::InstallRecognizer),
            ]
        );
        assert!(!recorder.calls().iter().any(|c| matches!(c, Call::Recognize(_))));
        assert_eq!(controller.state().phase(), TurnPhase::Blocked);

        // The lockout is permanent
        recorder.clear();
        controller.start_turn();
        assert!(recorder.calls().is_empty());
    }

    #[test]
    fn test_matched_transcript_speaks_response_and_reenables() {
        let (mut controller, recorder) = ready_controller(true);
        controller.start_turn();
        controller.on_synthesis_done(Some(UtteranceTag::TurnPrompt));
        recorder.clear();

        controller.on_recognition_result(RecognitionOutcome::Success("Dua".to_string()));

        assert_eq!(
            recorder.calls(),
            vec![
                Call::ShowText("Dua".to_string()),
                Call::Speak { text: "dua, Pubertas dan Menstruasi.".to_string(), flush: FlushPolicy::Flush, tag: None },
                Call::TriggerEnabled(true),
            ]
        );
        assert_eq!(controller.state().displayed_text(), "Dua");
        assert!(controller.state().input_enabled());
    }

    #[test]
    fn test_unmatched_transcript_echoes_with_retry_tag() {
        let (mut controller, recorder) = ready_controller(true);
        controller.start_turn();
        controller.on_synthesis_done(Some(UtteranceTag::TurnPrompt));
        recorder.clear();

        controller.on_recognition_result(RecognitionOutcome::Success("Tidak jelas!".to_string()));

        assert!(recorder.calls().contains(&Call::Speak {
            text: "input is tidak jelas".to_string(),
            flush: FlushPolicy::Flush,
            tag: Some(UtteranceTag::RetryPrompt),
        }));

        // Completion of the retry prompt triggers nothing
        recorder.clear();
        controller.on_synthesis_done(Some(UtteranceTag::RetryPrompt));
        assert!(recorder.calls().is_empty());
        assert_eq!(controller.state().phase(), TurnPhase::Idle);
    }

    #[test]
    fn test_blank_transcript_is_shown_and_read_back_verbatim() {
        let (mut controller, recorder) = ready_controller(true);
        controller.start_turn();
        controller.on_synthesis_done(Some(UtteranceTag::TurnPrompt));
        recorder.clear();

        controller.on_recognition_result(RecognitionOutcome::Success("  ".to_string()));

        assert_eq!(controller.state().displayed_text(), "  ");
        assert!(recorder.calls().contains(&Call::Speak {
            text: "input is ".to_string(),
            flush: FlushPolicy::Flush,
            tag: Some(UtteranceTag::RetryPrompt),
        }));
        assert_eq!(controller.state().phase(), TurnPhase::Idle);
    }

    #[test]
    fn test_no_result_is_reported_as_no_speech() {
        let (mut controller, recorder) = ready_controller(true);
        controller.start_turn();
        controller.on_synthesis_done(Some(UtteranceTag::TurnPrompt));
        recorder.clear();

        controller.on_recognition_result(RecognitionOutcome::NoResult);

        assert_eq!(controller.state().displayed_text(), menu::EMPTY_RESULT_TEXT);
        assert!(recorder.calls().contains(&Call::Speak {
            text: "input is no speech detected".to_string(),
            flush: FlushPolicy::Flush,
            tag: Some(UtteranceTag::RetryPrompt),
        }));
        assert_eq!(controller.state().phase(), TurnPhase::Idle);
    }

    #[test]
    fn test_recognition_failure_shows_message_without_speaking() {
        let (mut controller, recorder) = ready_controller(true);
        controller.start_turn();
        controller.on_synthesis_done(Some(UtteranceTag::TurnPrompt));
        recorder.clear();

        controller.on_recognition_result(RecognitionOutcome::Failure(SpeechError::NoSpeech(std::time::Duration::from_secs(8))));

        assert_eq!(recorder.calls(), vec![Call::ShowText(menu::FAILURE_TEXT.to_string()), Call::TriggerEnabled(true)]);
        assert!(controller.state().input_enabled());
    }

    #[test]
    fn test_stray_recognition_outcome_is_ignored() {
        let (mut controller, recorder) = ready_controller(true);

        controller.on_recognition_result(RecognitionOutcome::Success("satu".to_string()));

        assert!(recorder.calls().is_empty());
        assert_eq!(controller.state().displayed_text(), "");
    }

    #[test]
    fn test_prompt_error_abandons_turn() {
        let (mut controller, recorder) = ready_controller(true);
        controller.start_turn();
        recorder.clear();

        controller.on_utterance_error(Some(UtteranceTag::TurnPrompt));

        assert_eq!(recorder.calls(), vec![Call::TriggerEnabled(true)]);
        assert_eq!(controller.state().phase(), TurnPhase::Idle);
    }

    #[test]
    fn test_stopped_greeting_does_not_touch_turn() {
        let (mut controller, recorder) = ready_controller(true);
        controller.start_turn();
        recorder.clear();

        controller.on_utterance_stopped(None);

        assert!(recorder.calls().is_empty());
        assert_eq!(controller.state().phase(), TurnPhase::AwaitingSynthesis);
    }

    #[test]
    fn test_second_turn_after_completion() {
        let (mut controller, recorder) = ready_controller(true);
        controller.start_turn();
        controller.on_synthesis_done(Some(UtteranceTag::TurnPrompt));
        controller.on_recognition_result(RecognitionOutcome::Success("4".to_string()));
        recorder.clear();

        controller.start_turn();

        assert_eq!(recorder.calls(), vec![Call::ShowText(String::new()), menu_prompt(), Call::TriggerEnabled(false)]);
    }
}
