//! Session loop: the one task that owns the turn controller.
//!
//! Trigger presses, speech-output events and recognition outcomes arrive on
//! separate channels and are handed to the controller one at a time.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::controller::TurnController;
use crate::controller::services::{Presenter, RecognitionOutcome, SpeechEvent, SpeechInput, SpeechOutput};

/// Receiving ends of everything that can drive a turn.
pub struct SessionChannels {
    pub triggers: mpsc::Receiver<()>,
    pub speech_events: mpsc::UnboundedReceiver<SpeechEvent>,
    pub recognition: mpsc::UnboundedReceiver<RecognitionOutcome>,
}

/// Dispatch events to `controller` until `shutdown` is cancelled.
///
/// A closed trigger channel (stdin at EOF) only stops trigger handling; the
/// session keeps serving services until shutdown. Returns the controller so
/// the final state can be inspected.
pub async fn run<O, I, P>(
    mut controller: TurnController<O, I, P>,
    channels: SessionChannels,
    shutdown: CancellationToken,
) -> TurnController<O, I, P>
where
    O: SpeechOutput,
    I: SpeechInput,
    P: Presenter,
{
    let SessionChannels { mut triggers, mut speech_events, mut recognition } = channels;
    let mut triggers_open = true;

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                debug!("Session loop cancelled");
                break;
            }
            Some(event) = speech_events.recv() => dispatch_speech_event(&mut controller, event),
            Some(outcome) = recognition.recv() => controller.on_recognition_result(outcome),
            press = triggers.recv(), if triggers_open => match press {
                Some(()) => controller.start_turn(),
                None => {
                    info!("Trigger input closed, waiting for shutdown");
                    triggers_open = false;
                }
            },
        }
    }

    controller
}

fn dispatch_speech_event<O, I, P>(controller: &mut TurnController<O, I, P>, event: SpeechEvent)
where
    O: SpeechOutput,
    I: SpeechInput,
    P: Presenter,
{
    debug!("Speech event: {:?}", event);
    match event {
        SpeechEvent::Initialized(status) => controller.on_synthesis_initialized(status),
        SpeechEvent::Started(tag) => controller.on_utterance_started(tag),
        SpeechEvent::Done(tag) => controller.on_synthesis_done(tag),
        SpeechEvent::Error(tag) => controller.on_utterance_error(tag),
        SpeechEvent::Stopped(tag) => controller.on_utterance_stopped(tag),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::controller::TurnPhase;
    use crate::controller::services::{FlushPolicy, InitStatus, LocaleStatus, UtteranceTag};
    use crate::controller::testing::{Call, FakeInput, FakeOutput, FakePresenter, Recorder, fake_services};
    use crate::menu;

    struct Harness {
        triggers: mpsc::Sender<()>,
        speech: mpsc::UnboundedSender<SpeechEvent>,
        recognition: mpsc::UnboundedSender<RecognitionOutcome>,
        recorder: Recorder,
        shutdown: CancellationToken,
    }

    type FakeController = TurnController<FakeOutput, FakeInput, FakePresenter>;

    fn start(available: bool) -> (Harness, tokio::task::JoinHandle<FakeController>) {
        let (output, input, presenter, recorder) = fake_services(available, LocaleStatus::Ok);
        let controller = TurnController::new(output, input, presenter, "id-ID");

        let (trigger_tx, triggers) = mpsc::channel(4);
        let (speech_tx, speech_events) = mpsc::unbounded_channel();
        let (recognition_tx, recognition) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn(run(controller, SessionChannels { triggers, speech_events, recognition }, shutdown.clone()));
        let harness = Harness { triggers: trigger_tx, speech: speech_tx, recognition: recognition_tx, recorder, shutdown };
        (harness, handle)
    }

    /// Wait until the recorder holds a call matching `pred`.
    async fn wait_for(recorder: &Recorder, pred: impl Fn(&Call) -> bool) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !recorder.calls().iter().any(&pred) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_full_turn_through_session_loop() {
        let (h, handle) = start(true);

        h.speech.send(SpeechEvent::Initialized(InitStatus::Ready)).unwrap();
        wait_for(&h.recorder, |c| matches!(c, Call::Speak { text, .. } if text == menu::GREETING)).await;

        h.triggers.send(()).await.unwrap();
        wait_for(&h.recorder, |c| matches!(c, Call::Speak { tag: Some(UtteranceTag::TurnPrompt), .. })).await;

        h.speech.send(SpeechEvent::Done(Some(UtteranceTag::TurnPrompt))).unwrap();
        wait_for(&h.recorder, |c| matches!(c, Call::Recognize(_))).await;

        h.recognition.send(RecognitionOutcome::Success("Dua".to_string())).unwrap();
        wait_for(&h.recorder, |c| matches!(c, Call::ShowText(t) if t == "Dua")).await;

        h.shutdown.cancel();
        let controller = handle.await.unwrap();
        assert_eq!(controller.state().phase(), TurnPhase::Idle);

        let last_speak = h.recorder.calls().into_iter().rev().find(|c| matches!(c, Call::Speak { .. }));
        match last_speak {
            Some(Call::Speak { text, flush, tag }) => {
                assert!(text.starts_with("dua, "));
                assert_eq!(flush, FlushPolicy::Flush);
                assert_eq!(tag, None);
            }
            other => panic!("unexpected call: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_closed_triggers_keep_session_alive_until_shutdown() {
        let (h, handle) = start(true);
        let Harness { triggers, speech, recorder, shutdown, .. } = h;
        drop(triggers);

        speech.send(SpeechEvent::Initialized(InitStatus::Ready)).unwrap();
        wait_for(&recorder, |c| matches!(c, Call::Speak { text, .. } if text == menu::GREETING)).await;
        assert!(!handle.is_finished());

        shutdown.cancel();
        let controller = handle.await.unwrap();
        assert!(controller.state().synthesis_ready());
    }
}
