//! AppState construction extracted from `main.rs`.
//!
//! [`build_app_state`] is the production boot path used by `serve`.  It
//! resolves real collaborators and then calls [`assemble`], which tests use
//! directly with fakes.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use vm_domain::catalog::PromptCatalog;
use vm_domain::config::Config;
use vm_providers::util::resolve_api_key;
use vm_providers::{LlmProvider, OpenAiCompatProvider};
use vm_transcripts::{SqliteTranscriptStore, SummaryGenerator, TranscriptRecorder, TranscriptStore};

use crate::realtime::{CallControl, RealtimeClient, WebhookVerifier};
use crate::runtime::{AgentResolver, CallAcceptor, SessionContext, SessionSupervisor};
use crate::state::AppState;

/// The external seams of the gateway.
pub struct Collaborators {
    pub control: Arc<dyn CallControl>,
    pub llm: Arc<dyn LlmProvider>,
    pub store: Arc<dyn TranscriptStore>,
    pub webhook_secret: String,
}

/// Validate config, connect every collaborator and return a fully-wired
/// [`AppState`].
pub async fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        tracing::error!("config: {issue}");
    }
    if !issues.is_empty() {
        anyhow::bail!("config validation failed with {} error(s)", issues.len());
    }

    // ── Prompt catalog ───────────────────────────────────────────────
    let catalog = Arc::new(
        PromptCatalog::load(&config.catalog.path, &config.catalog.default_agent)
            .context("loading prompt catalog")?,
    );
    tracing::info!(
        path = %config.catalog.path.display(),
        centre = catalog.centre_name(),
        agents = ?catalog.agent_ids().collect::<Vec<_>>(),
        functions = catalog.functions().len(),
        "prompt catalog loaded"
    );

    // ── Secrets ──────────────────────────────────────────────────────
    let api_key = resolve_api_key(&config.provider.auth).context("resolving provider API key")?;
    let webhook_secret = std::env::var(&config.provider.webhook_secret_env)
        .ok()
        .filter(|s| !s.is_empty())
        .with_context(|| {
            format!(
                "webhook secret not set (export {})",
                config.provider.webhook_secret_env
            )
        })?;

    // ── Collaborators ────────────────────────────────────────────────
    let store = open_store(&config)?;
    let llm = summary_llm(&config)?;
    let control: Arc<dyn CallControl> = Arc::new(
        RealtimeClient::from_config(&config.provider, api_key)
            .context("building realtime provider client")?,
    );

    assemble(
        config,
        catalog,
        Collaborators {
            control,
            llm,
            store,
            webhook_secret,
        },
    )
}

/// Wire collaborators into the acceptor and supervisor.  Must run inside a
/// Tokio runtime since it starts the supervisor loop.
pub fn assemble(
    config: Arc<Config>,
    catalog: Arc<PromptCatalog>,
    collab: Collaborators,
) -> anyhow::Result<AppState> {
    let resolver = AgentResolver::new(catalog.clone());

    let recorder = if config.transcription.enabled {
        Some(TranscriptRecorder::new(collab.store.clone()))
    } else {
        tracing::info!("transcription disabled, segments will not be recorded");
        None
    };
    let summaries = summary_generator(&config, collab.store.clone(), collab.llm);

    let ctx = Arc::new(SessionContext {
        control: collab.control.clone(),
        resolver: resolver.clone(),
        model: config.provider.model.clone(),
        recorder,
        summaries,
        idle_timeout: Duration::from_millis(config.provider.stream_idle_timeout_ms),
    });
    let (supervisor, _loop) = SessionSupervisor::start(ctx);

    let verifier = WebhookVerifier::new(
        &collab.webhook_secret,
        config.provider.signature_tolerance_secs,
    )
    .context("webhook secret")?;

    let acceptor = Arc::new(CallAcceptor::new(
        verifier,
        resolver,
        collab.control,
        supervisor.clone(),
        config.provider.model.clone(),
        config.transcription.clone(),
    ));

    Ok(AppState {
        config,
        catalog,
        acceptor,
        supervisor,
    })
}

/// Open the configured SQLite transcript store.
pub fn open_store(config: &Config) -> anyhow::Result<Arc<dyn TranscriptStore>> {
    let store = SqliteTranscriptStore::open(&config.storage.db_path).with_context(|| {
        format!(
            "opening transcript store {}",
            config.storage.db_path.display()
        )
    })?;
    tracing::info!(path = %config.storage.db_path.display(), "transcript store ready");
    Ok(Arc::new(store))
}

/// The completion provider used for summaries and sentiment.
pub fn summary_llm(config: &Config) -> anyhow::Result<Arc<dyn LlmProvider>> {
    let provider = OpenAiCompatProvider::from_config(&config.summary, &config.provider)
        .context("building summary provider")?;
    Ok(Arc::new(provider))
}

pub fn summary_generator(
    config: &Config,
    store: Arc<dyn TranscriptStore>,
    llm: Arc<dyn LlmProvider>,
) -> SummaryGenerator {
    SummaryGenerator::new(store, llm, config.summary.clone())
}
