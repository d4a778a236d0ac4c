//! End-to-end research pipeline: topic → seven generation stages → package → store.
//!
//! Stages run strictly in [`STAGES`] order, one at a time. Every stage sees the
//! same user context; none sees another stage's output. The first failure
//! stops the run, emits exactly one `error` event, and nothing is persisted.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, instrument, warn};

use deepcut_generation::GenerationClient;
use deepcut_shared::{DeepCutError, GenerationRequest, IdeaId, ResearchPackage, Result};
use deepcut_storage::IdeaStore;

use crate::assembler::{self, SectionResults};
use crate::parser::parse_section;
use crate::progress::{ProgressEmitter, ProgressEvent};
use crate::prompts::{DAILY_TOPIC_PROMPT, DAILY_TOPIC_REQUEST};
use crate::stages::{DAILY_TOPIC_TEMPERATURE, STAGES};

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub id: IdeaId,
    pub topic: String,
    pub style: Option<String>,
    pub package: ResearchPackage,
}

impl RunOutcome {
    /// First generated title, or the topic when there is none.
    pub fn top_title(&self) -> String {
        self.package.display_title(&self.topic)
    }
}

/// The stage orchestrator.
///
/// Cheap to clone; the server hands a clone to each spawned run.
#[derive(Clone)]
pub struct Pipeline {
    client: Arc<dyn GenerationClient>,
    store: Arc<dyn IdeaStore>,
}

impl Pipeline {
    pub fn new(client: Arc<dyn GenerationClient>, store: Arc<dyn IdeaStore>) -> Self {
        Self { client, store }
    }

    /// Run all stages for a user-supplied request and persist the package.
    ///
    /// Emits `generating`/`complete` per stage, then `done`. On failure emits a
    /// single `error` event and returns the error.
    pub async fn run(
        &self,
        request: &GenerationRequest,
        emitter: &dyn ProgressEmitter,
    ) -> Result<RunOutcome> {
        let result = self.execute(request, false, emitter).await;
        report(result, emitter)
    }

    /// Pick a topic with the generation service, then run as [`Pipeline::run`]
    /// with the idea marked as automated.
    pub async fn run_automated(&self, emitter: &dyn ProgressEmitter) -> Result<RunOutcome> {
        let result = async {
            let topic = self.discover_topic().await?;
            let request = GenerationRequest::new(topic, None)?;
            self.execute(&request, true, emitter).await
        }
        .await;
        report(result, emitter)
    }

    /// Ask the generation service for today's topic.
    #[instrument(skip_all)]
    pub async fn discover_topic(&self) -> Result<String> {
        let raw = self
            .client
            .generate_section(DAILY_TOPIC_PROMPT, DAILY_TOPIC_REQUEST, DAILY_TOPIC_TEMPERATURE)
            .await?;
        let topic = clean_topic(&raw).ok_or_else(|| {
            DeepCutError::Generation("topic discovery returned an empty topic".into())
        })?;
        info!(%topic, "daily topic selected");
        Ok(topic)
    }

    #[instrument(skip_all, fields(topic = %request.topic(), automated = automated))]
    async fn execute(
        &self,
        request: &GenerationRequest,
        automated: bool,
        emitter: &dyn ProgressEmitter,
    ) -> Result<RunOutcome> {
        let start = Instant::now();
        let context = user_context(request);
        let mut results = SectionResults::new();

        info!(stages = STAGES.len(), "starting research pipeline");

        for stage in &STAGES {
            if emitter.is_closed() {
                return Err(DeepCutError::Cancelled);
            }

            emitter.emit(ProgressEvent::Generating {
                section: stage.key,
                label: stage.label.to_string(),
            });

            let stage_start = Instant::now();
            let raw = tokio::select! {
                biased;
                () = emitter.cancelled() => return Err(DeepCutError::Cancelled),
                raw = self.client.generate_section(stage.prompt, &context, stage.temperature) => raw?,
            };

            let payload = parse_section(&raw);
            if payload.is_fallback() {
                warn!(section = %stage.key, "stage output was not a JSON object, keeping raw text");
            }
            debug!(
                section = %stage.key,
                elapsed_ms = stage_start.elapsed().as_millis() as u64,
                "stage complete"
            );

            emitter.emit(ProgressEvent::Complete {
                section: stage.key,
                data: payload.clone(),
            });
            results.push(stage.key, payload);
        }

        debug!(sections = results.len(), "assembling research package");
        let package = assembler::assemble(results)?;
        let id = IdeaId::new();
        assembler::persist(
            self.store.as_ref(),
            &id,
            request.topic(),
            request.style(),
            &package,
            automated,
        )
        .await?;

        info!(
            %id,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "research package complete"
        );

        emitter.emit(ProgressEvent::Done {
            id: id.clone(),
            research_data: package.clone(),
        });

        Ok(RunOutcome {
            id,
            topic: request.topic().to_string(),
            style: request.style().map(str::to_string),
            package,
        })
    }
}

/// Log a failed run and emit its single `error` event.
fn report(result: Result<RunOutcome>, emitter: &dyn ProgressEmitter) -> Result<RunOutcome> {
    if let Err(e) = &result {
        match e {
            DeepCutError::Cancelled => info!("consumer went away, run abandoned"),
            other => error!(error = %other, "research pipeline failed"),
        }
        emitter.emit(ProgressEvent::Error { error: e.message() });
    }
    result
}

/// The user message shared by every stage.
pub fn user_context(request: &GenerationRequest) -> String {
    let mut context = format!("Documentary topic: \"{}\"", request.topic());
    if let Some(style) = request.style() {
        context.push_str(&format!(" The documentary style/tone should be: {style}."));
    }
    context
}

/// Trim the model's topic and drop one wrapping quote at either end.
fn clean_topic(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix(['"', '\''])
        .unwrap_or(trimmed);
    let trimmed = trimmed
        .strip_suffix(['"', '\''])
        .unwrap_or(trimmed);
    let topic = trimmed.trim();
    (!topic.is_empty()).then(|| topic.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use deepcut_shared::{Idea, SectionKey};
    use tokio::sync::mpsc;

    use crate::progress::{ChannelEmitter, SilentEmitter};

    // -- fakes ---------------------------------------------------------------

    #[derive(Debug, Clone)]
    struct Call {
        prompt: String,
        context: String,
        temperature: f32,
    }

    /// Answers each stage with a fenced JSON object naming its index.
    #[derive(Default)]
    struct ScriptedClient {
        calls: Mutex<Vec<Call>>,
        fail_at: Option<usize>,
        prose_at: Option<usize>,
        topic: String,
    }

    impl ScriptedClient {
        fn failing_at(stage: usize) -> Self {
            Self {
                fail_at: Some(stage),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GenerationClient for ScriptedClient {
        async fn generate_section(
            &self,
            prompt: &str,
            user_context: &str,
            temperature: f32,
        ) -> Result<String> {
            let mut calls = self.calls.lock().unwrap();
            let index = calls
                .iter()
                .filter(|c| c.prompt != DAILY_TOPIC_PROMPT)
                .count();
            calls.push(Call {
                prompt: prompt.to_string(),
                context: user_context.to_string(),
                temperature,
            });

            if prompt == DAILY_TOPIC_PROMPT {
                return Ok(self.topic.clone());
            }
            if self.fail_at == Some(index) {
                return Err(DeepCutError::Generation("HTTP 500: upstream exploded".into()));
            }
            if self.prose_at == Some(index) {
                return Ok("I could not produce JSON for this one.".into());
            }
            Ok(format!("```json\n{{\"stage\": {index}, \"titles\": [\"Title {index}\"]}}\n```"))
        }
    }

    type Saved = (IdeaId, String, Option<String>, ResearchPackage, bool);

    #[derive(Default)]
    struct MemoryStore {
        saved: Mutex<Vec<Saved>>,
        fail: bool,
    }

    impl MemoryStore {
        fn saved(&self) -> Vec<Saved> {
            self.saved.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl IdeaStore for MemoryStore {
        async fn save_idea(
            &self,
            id: &IdeaId,
            topic: &str,
            style: Option<&str>,
            package: &ResearchPackage,
            automated: bool,
        ) -> Result<()> {
            if self.fail {
                return Err(DeepCutError::Persistence("database is locked".into()));
            }
            self.saved.lock().unwrap().push((
                id.clone(),
                topic.to_string(),
                style.map(str::to_string),
                package.clone(),
                automated,
            ));
            Ok(())
        }

        async fn get_idea_by_id(&self, _id: &IdeaId) -> Result<Option<Idea>> {
            Ok(None)
        }

        async fn get_all_ideas(&self, _search: Option<&str>) -> Result<Vec<Idea>> {
            Ok(Vec::new())
        }

        async fn delete_idea(&self, _id: &IdeaId) -> Result<bool> {
            Ok(false)
        }
    }

    #[derive(Default)]
    struct CollectingEmitter {
        events: Mutex<Vec<ProgressEvent>>,
    }

    impl CollectingEmitter {
        fn events(&self) -> Vec<ProgressEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl ProgressEmitter for CollectingEmitter {
        fn emit(&self, event: ProgressEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    fn pipeline(client: &Arc<ScriptedClient>, store: &Arc<MemoryStore>) -> Pipeline {
        Pipeline::new(client.clone(), store.clone())
    }

    fn request(topic: &str, style: Option<&str>) -> GenerationRequest {
        GenerationRequest::new(topic, style.map(str::to_string)).unwrap()
    }

    fn count(events: &[ProgressEvent], kind: &str) -> usize {
        events
            .iter()
            .filter(|e| match e {
                ProgressEvent::Generating { .. } => kind == "generating",
                ProgressEvent::Complete { .. } => kind == "complete",
                ProgressEvent::Done { .. } => kind == "done",
                ProgressEvent::Error { .. } => kind == "error",
            })
            .count()
    }

    // -- interactive runs ----------------------------------------------------

    #[tokio::test]
    async fn success_emits_pairs_in_stage_order_then_done() {
        let client = Arc::new(ScriptedClient::default());
        let store = Arc::new(MemoryStore::default());
        let emitter = CollectingEmitter::default();

        let outcome = pipeline(&client, &store)
            .run(&request("Operation Paperclip", None), &emitter)
            .await
            .unwrap();

        let events = emitter.events();
        assert_eq!(events.len(), 2 * STAGES.len() + 1);
        for (i, stage) in STAGES.iter().enumerate() {
            match &events[2 * i] {
                ProgressEvent::Generating { section, label } => {
                    assert_eq!(*section, stage.key);
                    assert_eq!(label, stage.label);
                }
                other => panic!("expected generating, got {other:?}"),
            }
            match &events[2 * i + 1] {
                ProgressEvent::Complete { section, data } => {
                    assert_eq!(*section, stage.key);
                    assert_eq!(data.to_value()["stage"], i);
                }
                other => panic!("expected complete, got {other:?}"),
            }
        }

        let ProgressEvent::Done { id, research_data } = events.last().unwrap() else {
            panic!("last event must be done");
        };
        assert_eq!(*id, outcome.id);
        assert_eq!(*research_data, outcome.package);
        assert_eq!(outcome.top_title(), "Title 0");

        let value = serde_json::to_value(research_data).unwrap();
        let keys: BTreeSet<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        let expected: BTreeSet<&str> = SectionKey::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(keys, expected);

        let saved = store.saved();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].0, outcome.id);
        assert_eq!(saved[0].1, "Operation Paperclip");
        assert!(!saved[0].4);
    }

    #[tokio::test]
    async fn every_stage_gets_same_context_and_its_temperature() {
        let client = Arc::new(ScriptedClient::default());
        let store = Arc::new(MemoryStore::default());

        pipeline(&client, &store)
            .run(&request("MKUltra", Some("noir, true crime")), &SilentEmitter)
            .await
            .unwrap();

        let calls = client.calls();
        assert_eq!(calls.len(), STAGES.len());
        for (call, stage) in calls.iter().zip(STAGES.iter()) {
            assert_eq!(call.prompt, stage.prompt);
            assert_eq!(call.temperature, stage.temperature);
            assert_eq!(
                call.context,
                "Documentary topic: \"MKUltra\" The documentary style/tone should be: noir, true crime."
            );
        }
        assert_eq!(store.saved()[0].2.as_deref(), Some("noir, true crime"));
    }

    #[tokio::test]
    async fn failure_at_any_stage_stops_run_without_persisting() {
        for k in 1..=STAGES.len() {
            let client = Arc::new(ScriptedClient::failing_at(k - 1));
            let store = Arc::new(MemoryStore::default());
            let emitter = CollectingEmitter::default();

            let err = pipeline(&client, &store)
                .run(&request("Radium Girls", None), &emitter)
                .await
                .unwrap_err();
            assert!(matches!(err, DeepCutError::Generation(_)));

            let events = emitter.events();
            assert_eq!(count(&events, "generating"), k, "stage {k}");
            assert_eq!(count(&events, "complete"), k - 1, "stage {k}");
            assert_eq!(count(&events, "error"), 1, "stage {k}");
            assert_eq!(count(&events, "done"), 0, "stage {k}");
            assert_eq!(
                events.last(),
                Some(&ProgressEvent::Error {
                    error: "HTTP 500: upstream exploded".into()
                })
            );
            assert_eq!(client.calls().len(), k, "no calls after the failing stage");
            assert!(store.saved().is_empty());
        }
    }

    #[tokio::test]
    async fn unparseable_stage_still_completes() {
        let client = Arc::new(ScriptedClient {
            prose_at: Some(4),
            ..ScriptedClient::default()
        });
        let store = Arc::new(MemoryStore::default());

        let outcome = pipeline(&client, &store)
            .run(&request("The Dyatlov Pass", None), &SilentEmitter)
            .await
            .unwrap();

        assert_eq!(
            outcome.package.foia_suggestions.raw(),
            Some("I could not produce JSON for this one.")
        );
        assert_eq!(outcome.package.fallback_sections(), vec![SectionKey::FoiaSuggestions]);
        assert_eq!(store.saved().len(), 1);
    }

    #[tokio::test]
    async fn persistence_failure_emits_error_not_done() {
        let client = Arc::new(ScriptedClient::default());
        let store = Arc::new(MemoryStore {
            fail: true,
            ..MemoryStore::default()
        });
        let emitter = CollectingEmitter::default();

        let err = pipeline(&client, &store)
            .run(&request("Operation Paperclip", None), &emitter)
            .await
            .unwrap_err();
        assert!(matches!(err, DeepCutError::Persistence(_)));

        let events = emitter.events();
        assert_eq!(count(&events, "complete"), STAGES.len());
        assert_eq!(count(&events, "done"), 0);
        assert_eq!(
            events.last(),
            Some(&ProgressEvent::Error {
                error: "database is locked".into()
            })
        );
    }

    #[tokio::test]
    async fn each_run_gets_a_fresh_id() {
        let client = Arc::new(ScriptedClient::default());
        let store = Arc::new(MemoryStore::default());
        let p = pipeline(&client, &store);

        let a = p.run(&request("Topic", None), &SilentEmitter).await.unwrap();
        let b = p.run(&request("Topic", None), &SilentEmitter).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(store.saved().len(), 2);
    }

    // -- cancellation --------------------------------------------------------

    #[tokio::test]
    async fn closed_consumer_before_start_makes_no_calls() {
        let client = Arc::new(ScriptedClient::default());
        let store = Arc::new(MemoryStore::default());
        let (emitter, rx) = ChannelEmitter::channel();
        drop(rx);

        let err = pipeline(&client, &store)
            .run(&request("Topic", None), &emitter)
            .await
            .unwrap_err();
        assert!(matches!(err, DeepCutError::Cancelled));
        assert!(client.calls().is_empty());
        assert!(store.saved().is_empty());
    }

    /// Hangs on its second call after dropping the consumer's receiver.
    struct DisconnectingClient {
        rx: Mutex<Option<mpsc::UnboundedReceiver<ProgressEvent>>>,
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl GenerationClient for DisconnectingClient {
        async fn generate_section(&self, _: &str, _: &str, _: f32) -> Result<String> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                *calls += 1;
                *calls
            };
            if call == 2 {
                drop(self.rx.lock().unwrap().take());
                std::future::pending::<()>().await;
            }
            Ok("{}".into())
        }
    }

    #[tokio::test]
    async fn disconnect_abandons_in_flight_stage() {
        let (emitter, rx) = ChannelEmitter::channel();
        let client = Arc::new(DisconnectingClient {
            rx: Mutex::new(Some(rx)),
            calls: Mutex::new(0),
        });
        let store = Arc::new(MemoryStore::default());
        let p = Pipeline::new(client.clone(), store.clone());

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            p.run(&request("Topic", None), &emitter),
        )
        .await
        .expect("run should stop once the consumer disconnects");

        assert!(matches!(result, Err(DeepCutError::Cancelled)));
        assert_eq!(*client.calls.lock().unwrap(), 2);
        assert!(store.saved().is_empty());
    }

    // -- automated runs ------------------------------------------------------

    #[tokio::test]
    async fn automated_run_discovers_topic_and_marks_idea() {
        let client = Arc::new(ScriptedClient {
            topic: "  \"Operation Paperclip\"\n".into(),
            ..ScriptedClient::default()
        });
        let store = Arc::new(MemoryStore::default());

        let outcome = pipeline(&client, &store)
            .run_automated(&SilentEmitter)
            .await
            .unwrap();
        assert_eq!(outcome.topic, "Operation Paperclip");
        assert_eq!(outcome.style, None);

        let calls = client.calls();
        assert_eq!(calls.len(), STAGES.len() + 1);
        assert_eq!(calls[0].prompt, DAILY_TOPIC_PROMPT);
        assert_eq!(calls[0].context, DAILY_TOPIC_REQUEST);
        assert_eq!(calls[0].temperature, DAILY_TOPIC_TEMPERATURE);
        assert_eq!(calls[1].context, "Documentary topic: \"Operation Paperclip\"");

        let saved = store.saved();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].1, "Operation Paperclip");
        assert!(saved[0].4);
    }

    #[tokio::test]
    async fn automated_run_with_blank_topic_fails_before_stages() {
        let client = Arc::new(ScriptedClient {
            topic: " '' ".into(),
            ..ScriptedClient::default()
        });
        let store = Arc::new(MemoryStore::default());
        let emitter = CollectingEmitter::default();

        let err = pipeline(&client, &store)
            .run_automated(&emitter)
            .await
            .unwrap_err();
        assert!(matches!(err, DeepCutError::Generation(_)));
        assert_eq!(client.calls().len(), 1);
        assert_eq!(emitter.events().len(), 1);
        assert!(store.saved().is_empty());
    }

    #[test]
    fn clean_topic_strips_one_quote_each_side() {
        assert_eq!(clean_topic("\"MKUltra\"").as_deref(), Some("MKUltra"));
        assert_eq!(clean_topic("'Radium Girls'").as_deref(), Some("Radium Girls"));
        assert_eq!(clean_topic("  Love Canal  ").as_deref(), Some("Love Canal"));
        assert_eq!(clean_topic("\"\"Nested\"\"").as_deref(), Some("\"Nested\""));
        assert_eq!(clean_topic("It's Tuskegee").as_deref(), Some("It's Tuskegee"));
        assert_eq!(clean_topic("\"\""), None);
        assert_eq!(clean_topic("   "), None);
    }

    #[test]
    fn context_without_style() {
        assert_eq!(
            user_context(&request("  Love Canal ", Some("  "))),
            "Documentary topic: \"Love Canal\""
        );
    }
}
