//! The state machine behind the prompt page.
//!
//! [`SessionController`] owns the [`Session`], runs generation attempts and
//! keeps the durable copy of input, output and mode up to date through a
//! trailing-edge debounce. All mutation goes through `&self` so a host can
//! share the controller behind an `Arc`; results of superseded generation
//! attempts are dropped instead of overwriting newer state.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;

use architect_core::{build_prompt, KeyValueStore, Mode, PersistedRecord, Session, StoreError};
use architect_core::SYSTEM_INSTRUCTION;

use crate::clipboard::ClipboardWriter;
use crate::client::Generator;
use crate::timer::TimerSlot;

pub const EMPTY_INPUT_MESSAGE: &str = "Please enter a prompt or idea.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Quiet period after the last edit before state is written.
    pub autosave_delay: Duration,
    /// How long `is_saving` stays up after a write.
    pub saving_pulse: Duration,
    /// How long `copied` stays up after a copy.
    pub copied_flash: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            autosave_delay: Duration::from_millis(1000),
            saving_pulse: Duration::from_millis(800),
            copied_flash: Duration::from_millis(2000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerateOutcome {
    /// Output now holds the generated text.
    Completed,
    /// `error_message` holds the failure.
    Failed,
    /// Input was blank; nothing was sent.
    Rejected,
    /// A newer attempt started while this one was in flight; its result was dropped.
    Superseded,
}

struct State {
    session: Session,
    /// Identity of the most recent generation attempt.
    attempt: u64,
}

/// What the delayed tasks need to reach.
struct Shared {
    state: Mutex<State>,
    store: Arc<dyn KeyValueStore>,
    timings: Timings,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn write_record(&self) -> Result<(), StoreError> {
        let record = self.lock().session.to_record();
        let result = record.store(self.store.as_ref());
        match &result {
            Ok(()) => self.lock().session.last_saved = Some(Utc::now()),
            Err(e) => log::error!("auto-save failed: {e}"),
        }
        result
    }

    /// Debounce target: raise the saving flag, write, and drop the flag again
    /// after the pulse. The pulse runs on its own task so neither a later
    /// save nor an abort of this one leaves the flag stuck.
    async fn autosave(self: Arc<Self>) {
        self.lock().session.is_saving = true;
        let pulse = self.timings.saving_pulse;
        let shared = Arc::clone(&self);
        tokio::spawn(async move {
            tokio::time::sleep(pulse).await;
            shared.lock().session.is_saving = false;
        });

        // File-backed stores block, so the write runs on the blocking pool.
        // Failure is already logged; the next edit retries.
        if let Err(e) = tokio::task::spawn_blocking(move || self.write_record()).await {
            log::error!("auto-save task failed: {e}");
        }
    }
}

pub struct SessionController {
    shared: Arc<Shared>,
    generator: Arc<dyn Generator>,
    clipboard: Arc<dyn ClipboardWriter>,
    autosave: TimerSlot,
    copied_reset: TimerSlot,
}

impl SessionController {
    /// Build a controller, restoring whatever the store holds. This is the
    /// only read of persisted state.
    pub fn load(
        generator: Arc<dyn Generator>,
        store: Arc<dyn KeyValueStore>,
        clipboard: Arc<dyn ClipboardWriter>,
        timings: Timings,
    ) -> Self {
        let mut session = Session::default();
        session.restore(PersistedRecord::load(store.as_ref()));
        log::debug!(
            "restored session: mode={}, {} input chars, {} output chars",
            session.mode,
            session.input_text.chars().count(),
            session.output_text.chars().count()
        );

        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State { session, attempt: 0 }),
                store,
                timings,
            }),
            generator,
            clipboard,
            autosave: TimerSlot::new(),
            copied_reset: TimerSlot::new(),
        }
    }

    pub fn snapshot(&self) -> Session {
        self.shared.lock().session.clone()
    }

    pub fn set_input(&self, text: impl Into<String>) {
        let text = text.into();
        {
            let mut state = self.shared.lock();
            if state.session.input_text == text {
                return;
            }
            state.session.input_text = text;
        }
        self.schedule_autosave();
    }

    pub fn set_mode(&self, mode: Mode) {
        {
            let mut state = self.shared.lock();
            if state.session.mode == mode {
                return;
            }
            state.session.mode = mode;
        }
        self.schedule_autosave();
    }

    /// Whether a host should offer the generate action right now.
    pub fn can_generate(&self) -> bool {
        let state = self.shared.lock();
        !state.session.is_loading && !state.session.input_text.trim().is_empty()
    }

    /// Run one generation attempt for the current input and mode.
    pub async fn generate(&self) -> GenerateOutcome {
        let (prompt, attempt) = {
            let mut state = self.shared.lock();
            if state.session.input_text.trim().is_empty() {
                state.session.error_message = EMPTY_INPUT_MESSAGE.to_string();
                return GenerateOutcome::Rejected;
            }
            state.attempt += 1;
            let session = &mut state.session;
            session.is_loading = true;
            session.error_message.clear();
            session.output_text.clear();
            let prompt = build_prompt(&session.input_text, session.mode);
            (prompt, state.attempt)
        };
        self.schedule_autosave();

        let result = self.generator.generate(&prompt, SYSTEM_INSTRUCTION).await;

        let outcome = {
            let mut state = self.shared.lock();
            if state.attempt != attempt {
                log::debug!(
                    "dropping result of attempt {attempt}; attempt {} is current",
                    state.attempt
                );
                return GenerateOutcome::Superseded;
            }
            let session = &mut state.session;
            session.is_loading = false;
            match result {
                Ok(text) => {
                    session.output_text = text;
                    GenerateOutcome::Completed
                }
                Err(e) => {
                    session.error_message = e.to_string();
                    GenerateOutcome::Failed
                }
            }
        };

        if outcome == GenerateOutcome::Completed {
            self.schedule_autosave();
        }
        outcome
    }

    /// Copy the output to the clipboard. Failures are logged only.
    /// Returns whether anything was copied.
    pub fn copy_output(&self) -> bool {
        let output = self.shared.lock().session.output_text.clone();
        if output.is_empty() {
            return false;
        }

        if let Err(e) = self.clipboard.write_text(&output) {
            log::error!("Failed to copy: {e}");
            return false;
        }

        self.shared.lock().session.copied = true;
        let shared = Arc::clone(&self.shared);
        self.copied_reset
            .schedule(self.shared.timings.copied_flash, async move {
                shared.lock().session.copied = false;
            });
        true
    }

    /// Write immediately, dropping any pending debounce. For hosts that are
    /// about to exit.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.autosave.cancel();
        self.shared.write_record()
    }

    pub fn has_pending_save(&self) -> bool {
        self.autosave.is_pending()
    }

    fn schedule_autosave(&self) {
        let shared = Arc::clone(&self.shared);
        self.autosave
            .schedule(self.shared.timings.autosave_delay, shared.autosave());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::ClipboardError;
    use crate::client::GenerationError;
    use architect_core::{MemoryStore, INPUT_KEY, MODE_KEY, OUTPUT_KEY};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::future::Future;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;
    use tokio::time::sleep;

    enum Step {
        Ready(Result<String, GenerationError>),
        Wait(oneshot::Receiver<Result<String, GenerationError>>),
    }

    #[derive(Default)]
    struct ScriptedGenerator {
        steps: Mutex<VecDeque<Step>>,
        prompts: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedGenerator {
        fn replying(steps: Vec<Step>) -> Arc<Self> {
            Arc::new(Self {
                steps: Mutex::new(steps.into()),
                prompts: Mutex::default(),
            })
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Generator for ScriptedGenerator {
        async fn generate(
            &self,
            prompt: &str,
            system_instruction: &str,
        ) -> Result<String, GenerationError> {
            self.prompts
                .lock()
                .unwrap()
                .push((prompt.to_string(), system_instruction.to_string()));
            let step = self
                .steps
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected generate call");
            match step {
                Step::Ready(result) => result,
                Step::Wait(rx) => rx.await.expect("test dropped the sender"),
            }
        }
    }

    /// Counts every key write so debounce batches can be observed.
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryStore,
        writes: AtomicUsize,
    }

    impl CountingStore {
        fn batches(&self) -> usize {
            self.writes.load(Ordering::SeqCst) / 3
        }
    }

    impl KeyValueStore for CountingStore {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.set(key, value)
        }
    }

    #[derive(Default)]
    struct FakeClipboard {
        fail: bool,
        copied: Mutex<Vec<String>>,
    }

    impl ClipboardWriter for FakeClipboard {
        fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
            if self.fail {
                return Err(ClipboardError::Unavailable("denied".to_string()));
            }
            self.copied.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    struct Harness {
        controller: SessionController,
        generator: Arc<ScriptedGenerator>,
        store: Arc<CountingStore>,
        clipboard: Arc<FakeClipboard>,
    }

    fn harness_with(steps: Vec<Step>, store: Arc<CountingStore>, clipboard: FakeClipboard) -> Harness {
        let generator = ScriptedGenerator::replying(steps);
        let clipboard = Arc::new(clipboard);
        let controller = SessionController::load(
            generator.clone(),
            store.clone(),
            clipboard.clone(),
            Timings::default(),
        );
        Harness {
            controller,
            generator,
            store,
            clipboard,
        }
    }

    fn harness(steps: Vec<Step>) -> Harness {
        harness_with(steps, Arc::default(), FakeClipboard::default())
    }

    #[tokio::test(start_paused = true)]
    async fn blank_input_never_reaches_the_generator() {
        let h = harness(vec![]);
        for input in ["", "   ", "\n\t"] {
            h.controller.set_input(input);
            assert!(!h.controller.can_generate());
            assert_eq!(h.controller.generate().await, GenerateOutcome::Rejected);
            let session = h.controller.snapshot();
            assert_eq!(session.error_message, EMPTY_INPUT_MESSAGE);
            assert!(!session.is_loading);
        }
        assert_eq!(h.generator.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn success_sets_output_and_clears_error() {
        let h = harness(vec![Step::Ready(Ok("Hello".to_string()))]);
        h.controller.set_input("todo app");
        h.controller.set_mode(Mode::Idea);

        assert_eq!(h.controller.generate().await, GenerateOutcome::Completed);

        let session = h.controller.snapshot();
        assert_eq!(session.output_text, "Hello");
        assert_eq!(session.error_message, "");
        assert!(!session.is_loading);

        let prompts = h.generator.prompts.lock().unwrap().clone();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].0, build_prompt("todo app", Mode::Idea));
        assert_eq!(prompts[0].1, SYSTEM_INSTRUCTION);
    }

    #[tokio::test(start_paused = true)]
    async fn loading_clears_previous_error_and_output() {
        let (tx, rx) = oneshot::channel();
        let h = harness(vec![
            Step::Ready(Ok("first".to_string())),
            Step::Wait(rx),
        ]);
        h.controller.set_input("idea");
        h.controller.generate().await;
        assert_eq!(h.controller.snapshot().output_text, "first");

        let in_flight = h.controller.generate();
        tokio::pin!(in_flight);
        assert!(poll_once(in_flight.as_mut()).await.is_none());

        let session = h.controller.snapshot();
        assert!(session.is_loading);
        assert!(session.output_text.is_empty());
        assert!(!h.controller.can_generate());

        tx.send(Ok("second".to_string())).unwrap();
        assert_eq!(in_flight.await, GenerateOutcome::Completed);
        assert_eq!(h.controller.snapshot().output_text, "second");
    }

    #[tokio::test(start_paused = true)]
    async fn failure_sets_error_and_leaves_output_empty() {
        let h = harness(vec![
            Step::Ready(Ok("earlier".to_string())),
            Step::Ready(Err(GenerationError::Server("quota exceeded".to_string()))),
        ]);
        h.controller.set_input("idea");
        h.controller.generate().await;

        assert_eq!(h.controller.generate().await, GenerateOutcome::Failed);
        let session = h.controller.snapshot();
        assert_eq!(session.error_message, "quota exceeded");
        assert_eq!(session.output_text, "");
        assert!(!session.is_loading);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_result_does_not_overwrite_newer_attempt() {
        let (old_tx, old_rx) = oneshot::channel();
        let h = harness(vec![
            Step::Wait(old_rx),
            Step::Ready(Ok("new".to_string())),
        ]);
        h.controller.set_input("idea");

        let first = h.controller.generate();
        tokio::pin!(first);
        assert!(poll_once(first.as_mut()).await.is_none());

        let second = h.controller.generate().await;
        old_tx.send(Ok("old".to_string())).unwrap();
        let first = first.await;

        assert_eq!(first, GenerateOutcome::Superseded);
        assert_eq!(second, GenerateOutcome::Completed);
        let session = h.controller.snapshot();
        assert_eq!(session.output_text, "new");
        assert!(!session.is_loading);
    }

    #[tokio::test(start_paused = true)]
    async fn input_edits_do_not_clear_output() {
        let h = harness(vec![Step::Ready(Ok("kept".to_string()))]);
        h.controller.set_input("idea");
        h.controller.generate().await;
        h.controller.set_input("a different idea");
        assert_eq!(h.controller.snapshot().output_text, "kept");
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_edits_saves_once_after_quiet_period() {
        let h = harness(vec![]);

        h.controller.set_input("a");
        sleep(Duration::from_millis(200)).await;
        h.controller.set_input("ab");
        sleep(Duration::from_millis(200)).await;
        h.controller.set_mode(Mode::Expert);

        sleep(Duration::from_millis(999)).await;
        assert_eq!(h.store.writes.load(Ordering::SeqCst), 0);
        assert!(h.controller.has_pending_save());

        sleep(Duration::from_millis(2)).await;
        assert_eq!(h.store.batches(), 1);
        assert_eq!(h.store.inner.get(INPUT_KEY).unwrap().as_deref(), Some("ab"));
        assert_eq!(h.store.inner.get(MODE_KEY).unwrap().as_deref(), Some("expert"));

        sleep(Duration::from_secs(10)).await;
        assert_eq!(h.store.batches(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn saving_flag_pulses_and_timestamp_is_recorded() {
        let h = harness(vec![]);
        h.controller.set_input("x");

        sleep(Duration::from_millis(1001)).await;
        let session = h.controller.snapshot();
        assert!(session.is_saving);
        assert!(session.last_saved.is_some());

        sleep(Duration::from_millis(800)).await;
        assert!(!h.controller.snapshot().is_saving);
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_values_do_not_rearm_the_timer() {
        let h = harness(vec![]);
        h.controller.set_mode(Mode::Improve);
        h.controller.set_input("");
        assert!(!h.controller.has_pending_save());
    }

    #[tokio::test(start_paused = true)]
    async fn generation_result_is_persisted() {
        let h = harness(vec![Step::Ready(Ok("B".to_string()))]);
        h.controller.set_input("A");
        h.controller.generate().await;

        sleep(Duration::from_millis(1001)).await;
        assert_eq!(h.store.inner.get(OUTPUT_KEY).unwrap().as_deref(), Some("B"));
        assert_eq!(h.store.batches(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_load_restores_persisted_fields() {
        let store = Arc::new(CountingStore::default());
        {
            let h = harness_with(
                vec![Step::Ready(Ok("B".to_string()))],
                store.clone(),
                FakeClipboard::default(),
            );
            h.controller.set_input("A");
            h.controller.set_mode(Mode::Expert);
            h.controller.generate().await;
            sleep(Duration::from_millis(1500)).await;
        }

        let reloaded = harness_with(vec![], store, FakeClipboard::default());
        let session = reloaded.controller.snapshot();
        assert_eq!(session.input_text, "A");
        assert_eq!(session.output_text, "B");
        assert_eq!(session.mode, Mode::Expert);
        assert!(!session.is_loading);
        assert!(session.error_message.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn flush_writes_now_and_cancels_pending_save() {
        let h = harness(vec![]);
        h.controller.set_input("last words");
        h.controller.flush().unwrap();

        assert_eq!(h.store.batches(), 1);
        assert!(!h.controller.has_pending_save());
        sleep(Duration::from_secs(5)).await;
        assert_eq!(h.store.batches(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn copy_sets_flag_for_two_seconds() {
        let h = harness(vec![Step::Ready(Ok("copy me".to_string()))]);
        h.controller.set_input("idea");
        h.controller.generate().await;

        assert!(h.controller.copy_output());
        assert_eq!(*h.clipboard.copied.lock().unwrap(), vec!["copy me".to_string()]);
        assert!(h.controller.snapshot().copied);

        sleep(Duration::from_millis(1999)).await;
        assert!(h.controller.snapshot().copied);
        sleep(Duration::from_millis(2)).await;
        assert!(!h.controller.snapshot().copied);
    }

    #[tokio::test(start_paused = true)]
    async fn second_copy_restarts_the_flag_window() {
        let h = harness(vec![Step::Ready(Ok("copy me".to_string()))]);
        h.controller.set_input("idea");
        h.controller.generate().await;

        assert!(h.controller.copy_output());
        sleep(Duration::from_millis(1500)).await;
        assert!(h.controller.copy_output());

        sleep(Duration::from_millis(1000)).await;
        assert!(h.controller.snapshot().copied);
        sleep(Duration::from_millis(1001)).await;
        assert!(!h.controller.snapshot().copied);
        assert_eq!(h.clipboard.copied.lock().unwrap().len(), 2);
    }

    /// Records which thread each write lands on.
    #[derive(Default)]
    struct ThreadStore {
        inner: MemoryStore,
        threads: Mutex<Vec<std::thread::ThreadId>>,
    }

    impl KeyValueStore for ThreadStore {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            self.threads.lock().unwrap().push(std::thread::current().id());
            self.inner.set(key, value)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn autosave_writes_off_the_runtime_thread() {
        let store = Arc::new(ThreadStore::default());
        let controller = SessionController::load(
            ScriptedGenerator::replying(vec![]),
            store.clone(),
            Arc::new(FakeClipboard::default()),
            Timings::default(),
        );
        controller.set_input("x");
        sleep(Duration::from_millis(1001)).await;

        let runtime_thread = std::thread::current().id();
        let threads = store.threads.lock().unwrap().clone();
        assert_eq!(threads.len(), 3);
        assert!(threads.iter().all(|id| *id != runtime_thread));
        assert_eq!(store.inner.get(INPUT_KEY).unwrap().as_deref(), Some("x"));
        assert!(controller.snapshot().last_saved.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn copy_with_empty_output_does_nothing() {
        let h = harness(vec![]);
        assert!(!h.controller.copy_output());
        assert!(h.clipboard.copied.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn clipboard_failure_is_soft() {
        let h = harness_with(
            vec![Step::Ready(Ok("text".to_string()))],
            Arc::default(),
            FakeClipboard {
                fail: true,
                ..FakeClipboard::default()
            },
        );
        h.controller.set_input("idea");
        h.controller.generate().await;

        assert!(!h.controller.copy_output());
        let session = h.controller.snapshot();
        assert!(!session.copied);
        assert!(session.error_message.is_empty());
    }

    /// Poll a future exactly once, returning its output if it finished.
    async fn poll_once<F: Future + Unpin>(mut fut: F) -> Option<F::Output> {
        std::future::poll_fn(|cx| {
            std::task::Poll::Ready(match std::pin::Pin::new(&mut fut).poll(cx) {
                std::task::Poll::Ready(out) => Some(out),
                std::task::Poll::Pending => None,
            })
        })
        .await
    }
}
