use anyhow::{anyhow, bail, Result};
use promptmaster_contracts::dispatch::{
    AdapterCall, Completion, Dispatcher, ModeResult, RequestTicket,
};
use promptmaster_contracts::events::{EventKind, EventPayload, EventWriter};
use promptmaster_contracts::models::{ModelLineup, ModelSelector};
use promptmaster_contracts::modes::AspectRatio;
use promptmaster_contracts::results::AudioArtifact;
use promptmaster_contracts::session::{
    AuthStrategy, Credential, CredentialSession, HostOptions, KeyValueStore, Readiness,
};
use promptmaster_engine::{GeminiAdapter, GenerateTransport, HttpTransport};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::config::{AppConfig, AppPaths};
use crate::host::EnvKeyHost;

/// Everything a user action needs: configuration, the credential gate and the
/// activity log.
pub struct App {
    pub paths: AppPaths,
    pub config: AppConfig,
    pub session: CredentialSession,
    pub events: EventWriter,
    pub models: ModelLineup,
}

/// What the user supplied for one submission. Which fields matter depends on
/// the selected mode's route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionInput {
    pub text: Option<String>,
    pub aspect_ratio: AspectRatio,
    pub image: Option<String>,
    pub instruction: Option<String>,
}

impl App {
    pub fn open(paths: AppPaths, config: AppConfig) -> Result<Self> {
        let session = match config.auth_strategy {
            AuthStrategy::SelfSupplied => CredentialSession::self_supplied(
                KeyValueStore::new(&paths.credentials),
                config.min_token_len(),
            ),
            AuthStrategy::HostDelegated => CredentialSession::host_delegated(
                Box::new(EnvKeyHost::new(
                    config.host_key_env(),
                    config.host_select_command.clone(),
                )),
                HostOptions {
                    endpoint: config.endpoint.clone(),
                    assume_selection: config.assume_host_selection,
                },
            ),
        };

        let mut selector = ModelSelector::default();
        let (models, warnings) = ModelLineup::resolve(&mut selector, &config.model_overrides())
            .map_err(|err| anyhow!(err))?;
        for warning in &warnings {
            warn!("{warning}");
        }

        let events = EventWriter::for_new_session(&paths.events);
        events.emit(
            EventKind::SessionStarted,
            payload(json!({
                "auth_strategy": config.auth_strategy,
                "models": {
                    "text": models.text,
                    "vision": models.vision,
                    "image": models.image,
                    "edit": models.edit,
                    "speech": models.speech,
                },
                "model_warnings": warnings,
            })),
        )?;

        Ok(Self {
            paths,
            config,
            session,
            events,
            models,
        })
    }

    /// An adapter bound to the credential active right now.
    pub fn adapter(&self) -> Result<GeminiAdapter<HttpTransport>> {
        let auth = self.session.active_auth()?;
        let transport = HttpTransport::new(
            &auth,
            self.config.host_key_env(),
            self.config.retry_policy(),
            self.config.timeout(),
        )?;
        Ok(GeminiAdapter::new(transport, self.models.clone()))
    }

    pub fn login(&mut self, token: &str, endpoint: Option<&str>) -> Result<Credential> {
        let credential = self.session.login(token, endpoint)?.clone();
        self.emit_credential_changed("login", &credential)?;
        Ok(credential)
    }

    pub fn switch_credential(&mut self, token: &str, endpoint: Option<&str>) -> Result<Credential> {
        let previous = self.session.switch_credential(token, endpoint)?;
        let credential = self
            .session
            .get_active()
            .cloned()
            .ok_or_else(|| anyhow!("credential switch did not take effect"))?;
        self.emit_credential_changed("switch", &credential)?;
        if let Some(previous) = previous {
            info!(previous = %previous.masked_token(), "credential replaced");
        }
        Ok(credential)
    }

    pub fn logout(&mut self, confirm: impl FnOnce() -> bool) -> Result<bool> {
        let cleared = self.session.logout(confirm)?;
        if cleared {
            self.events
                .emit(EventKind::CredentialCleared, EventPayload::new())?;
        }
        Ok(cleared)
    }

    pub fn connect_via_host(&mut self) -> Result<Readiness> {
        let readiness = self.session.connect_via_host()?;
        if readiness == Readiness::Assumed {
            warn!("host reports no selected key; continuing on the assumption one was chosen");
        }
        self.events.emit(
            EventKind::CredentialChanged,
            payload(json!({"via": "host", "readiness": readiness_label(readiness)})),
        )?;
        Ok(readiness)
    }

    /// Runs the selected mode's adapter call and hands the result to the
    /// dispatcher. A late or mismatched answer is dropped, never shown.
    pub fn run_action<T: GenerateTransport>(
        &self,
        adapter: &GeminiAdapter<T>,
        dispatcher: &mut Dispatcher,
        input: &ActionInput,
    ) -> Result<Completion> {
        let route = dispatcher.route();
        check_input(route.call, input)?;
        let ticket = dispatcher.begin()?;
        self.events.emit(
            EventKind::ActionStarted,
            payload(json!({"mode": route.mode, "seq": ticket.seq})),
        )?;

        let outcome = perform(adapter, route.call, input);
        self.settle(dispatcher, ticket, outcome)
    }

    /// Every started request ends in exactly one of `action_completed`,
    /// `result_discarded` or `action_failed`.
    fn settle(
        &self,
        dispatcher: &mut Dispatcher,
        ticket: RequestTicket,
        outcome: Result<ModeResult>,
    ) -> Result<Completion> {
        let settled = outcome.and_then(|result| {
            let summary = summarize(&result);
            let completion = dispatcher.complete(ticket, result)?;
            Ok((completion, summary))
        });
        match settled {
            Ok((completion, summary)) => {
                let kind = match completion {
                    Completion::Accepted => EventKind::ActionCompleted,
                    Completion::Discarded => EventKind::ResultDiscarded,
                };
                let mut event = payload(json!({"mode": ticket.mode, "seq": ticket.seq}));
                event.extend(summary);
                self.events.emit(kind, event)?;
                Ok(completion)
            }
            Err(err) => {
                dispatcher.fail(ticket);
                self.events.emit(
                    EventKind::ActionFailed,
                    payload(json!({
                        "mode": ticket.mode,
                        "seq": ticket.seq,
                        "error": err.to_string(),
                    })),
                )?;
                Err(err)
            }
        }
    }

    /// Speech is produced on demand from a result's text and never replaces it.
    pub fn speak<T: GenerateTransport>(
        &self,
        adapter: &GeminiAdapter<T>,
        text: &str,
    ) -> Result<AudioArtifact> {
        if text.trim().is_empty() {
            bail!("nothing to read aloud");
        }
        self.events.emit(
            EventKind::ActionStarted,
            payload(json!({"mode": "speech", "chars": text.chars().count()})),
        )?;
        match adapter.synthesize_speech(text) {
            Ok(audio) => {
                self.events.emit(
                    EventKind::ActionCompleted,
                    payload(json!({
                        "mode": "speech",
                        "duration_secs": audio.duration_secs(),
                    })),
                )?;
                Ok(audio)
            }
            Err(err) => {
                self.events.emit(
                    EventKind::ActionFailed,
                    payload(json!({"mode": "speech", "error": err.to_string()})),
                )?;
                Err(err.into())
            }
        }
    }

    fn emit_credential_changed(&self, via: &str, credential: &Credential) -> Result<()> {
        self.events.emit(
            EventKind::CredentialChanged,
            payload(json!({
                "via": via,
                "masked_key": credential.masked_token(),
                "flavour": credential.flavour().label(),
                "endpoint": credential.endpoint(),
            })),
        )?;
        Ok(())
    }
}

pub fn readiness_label(readiness: Readiness) -> &'static str {
    match readiness {
        Readiness::Ready => "ready",
        Readiness::NotReady => "not ready",
        Readiness::Assumed => "assumed (unconfirmed)",
    }
}

fn check_input(call: AdapterCall, input: &ActionInput) -> Result<()> {
    let has = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.trim().is_empty());
    match call {
        AdapterCall::TransformPrompt(_) | AdapterCall::GenerateImage if !has(&input.text) => {
            bail!("enter a prompt first")
        }
        AdapterCall::AnalyzeImage | AdapterCall::EditImage if !has(&input.image) => {
            bail!("choose an image first")
        }
        AdapterCall::EditImage if !has(&input.instruction) => {
            bail!("describe the edit to make")
        }
        _ => Ok(()),
    }
}

fn perform<T: GenerateTransport>(
    adapter: &GeminiAdapter<T>,
    call: AdapterCall,
    input: &ActionInput,
) -> Result<ModeResult> {
    let text = input.text.as_deref().unwrap_or_default().trim();
    let image = input.image.as_deref().unwrap_or_default();
    let instruction = input.instruction.as_deref();
    Ok(match call {
        AdapterCall::TransformPrompt(mode) => {
            ModeResult::Optimized(adapter.transform_prompt(text, mode)?)
        }
        AdapterCall::GenerateImage => {
            ModeResult::Image(adapter.generate_image(text, input.aspect_ratio)?)
        }
        AdapterCall::AnalyzeImage => {
            ModeResult::Analysis(adapter.analyze_image(image, instruction)?)
        }
        AdapterCall::EditImage => ModeResult::Image(
            adapter.edit_image(image, instruction.unwrap_or_default().trim())?,
        ),
    })
}

fn summarize(result: &ModeResult) -> EventPayload {
    payload(match result {
        ModeResult::Optimized(optimized) => json!({
            "result": "optimized",
            "chars": optimized.optimized.chars().count(),
            "tags": optimized.tags,
            "sources": optimized.sources.len(),
        }),
        ModeResult::Image(artifact) => json!({
            "result": "image",
            "source": artifact.source,
            "bytes": artifact.bytes.len(),
        }),
        ModeResult::Analysis(text) => json!({
            "result": "analysis",
            "chars": text.chars().count(),
        }),
    })
}

fn payload(value: Value) -> EventPayload {
    match value {
        Value::Object(map) => map,
        _ => EventPayload::new(),
    }
}
