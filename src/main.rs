//! Stacksmith - bulk metadata companion for catalog document hubs.

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stacksmith::{
    api::{CatalogClient, RequestEngine, TokenManager, TokenRefresher},
    cache::CollectionCache,
    config::{Args, Command},
    hierarchy,
    profile::{JsonProfileStore, SharedProfile},
    sheet::{build_sheet_spec, CsvSheetStore, SheetStore},
    types::{LogSink, StacksmithError, TracingSink},
    upload::{UploadPipeline, UploadTarget},
    worker::{self, UiEvent},
    SessionState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("stacksmith={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Stacksmith - catalog bulk metadata");
    info!("======================================");
    info!("Profile: {}", args.profile.display());
    info!("Cache dir: {}", args.cache_dir.display());
    info!("Log dir: {}", args.log_dir.display());
    info!("Visual config path: {}", args.visual_config_path);
    info!("Token refresh path: {}", args.token_refresh_path);
    info!("======================================");

    let store = JsonProfileStore::new(&args.profile);
    if !store.exists() {
        error!(
            "No connection profile at {}. Create it with base_url, access_token, and refresh_token.",
            args.profile.display()
        );
        std::process::exit(1);
    }
    let profile = store.load()?;
    let shared = SharedProfile::new(profile, Arc::new(store));

    let engine = Arc::new(RequestEngine::new(shared.clone()));
    let token_manager = Arc::new(TokenManager::new(
        Arc::clone(&engine),
        shared.clone(),
        args.token_refresh_path.clone(),
    ));
    let refresher: Arc<dyn TokenRefresher> = Arc::clone(&token_manager) as Arc<dyn TokenRefresher>;
    let log: Arc<dyn LogSink> = Arc::new(TracingSink);

    let client = Arc::new(CatalogClient::new(
        engine,
        refresher,
        CollectionCache::new(&args.cache_dir),
        args.visual_config_path.clone(),
        Arc::clone(&log),
    ));

    match args.command.clone() {
        Command::CheckToken => {
            let (valid, message) = token_manager.validate().await;
            info!("{}", message);
            if !valid {
                std::process::exit(1);
            }
        }

        Command::RefreshToken => {
            let (refreshed, message) = token_manager.refresh().await;
            info!("{}", message);
            if !refreshed {
                std::process::exit(1);
            }
        }

        Command::Hubs { force } => {
            let state = load_session(Arc::clone(&client), force).await?;
            let hubs = state.hubs();
            if hubs.is_empty() {
                warn!("No document hubs found.");
            }
            for hub in hubs {
                info!("{}", hierarchy::format_label(hub.title.as_deref(), hub.id));
            }
        }

        Command::Folders { hub } => {
            let mut state = load_session(Arc::clone(&client), false).await?;
            let hub_id = state.select_hub(&hub)?;
            // Detail endpoint has the canonical title; fall back to the
            // cached collection when it is unavailable.
            let hub_title = match client.hub_details(hub_id).await {
                Some(details) => details.title,
                None => state
                    .hubs()
                    .iter()
                    .find(|h| h.id == hub_id)
                    .and_then(|h| h.title.clone()),
            };

            info!("{}", hierarchy::root_of_hub_label(hub_title.as_deref(), hub_id));
            for folder in client.folders_for_hub(hub_id).await {
                info!(
                    "{}",
                    hierarchy::format_folder_label(folder.title.as_deref(), folder.id)
                );
            }
        }

        Command::Templates { hub, scope, force } => {
            let mut state = load_session(Arc::clone(&client), force).await?;
            state.select_hub(&hub)?;
            let templates = state.compatible_templates(scope);
            if templates.is_empty() {
                warn!("No compatible templates found for this hub.");
            }
            for template in templates {
                info!("{}", hierarchy::format_label(template.title.as_deref(), template.id));
            }
        }

        Command::Generate { hub, folder, template, out } => {
            let mut state = load_session(Arc::clone(&client), false).await?;
            let hub_id = state.select_hub(&hub)?;
            let folder_id = folder.unwrap_or(hub_id);
            let template_id = state.select_template(&template)?;
            let template = resolve_template(&client, &state, template_id).await?;

            let spec = build_sheet_spec(&template, hub_id, folder_id)?;
            CsvSheetStore.write_spec(&spec, &out)?;
            info!(
                "Generated sheet for '{}' with {} columns at {}",
                spec.name,
                spec.columns.len(),
                out.display()
            );
        }

        Command::Upload { file, hub, folder, template, on_duplicate } => {
            let mut state = load_session(Arc::clone(&client), false).await?;
            let hub_id = state.select_hub(&hub)?;
            let folder_id = folder.unwrap_or(hub_id);
            let template_id = state.select_template(&template)?;
            let template = resolve_template(&client, &state, template_id).await?;

            let rows = CsvSheetStore.read_rows(&file)?;
            let target = UploadTarget { hub_id, folder_id };
            let context = format!("Sheet upload from {}", file_label(&file));

            let pipeline =
                UploadPipeline::new(Arc::clone(&client), Arc::clone(&log), args.log_dir.clone());
            let refetch = || info!("Document list will be refetched on the next run.");
            let outcome = pipeline
                .upload_from_rows(
                    &rows,
                    target,
                    &template,
                    &state.documents,
                    &on_duplicate,
                    &context,
                    Some(&refetch),
                )
                .await?;

            report_outcome(&outcome);
        }

        Command::CreateEmpty { hub, folder, template, count, title_prefix } => {
            let mut state = load_session(Arc::clone(&client), false).await?;
            let hub_id = state.select_hub(&hub)?;
            let folder_id = folder.unwrap_or(hub_id);

            let payloads = (1..=count)
                .map(|n| stacksmith::api::models::DocumentPayload {
                    title: format!("{} {}", title_prefix, n),
                    document_hub_id: hub_id,
                    parent_folder_id: folder_id,
                    template_id: template,
                    description: String::new(),
                    custom_fields: Vec::new(),
                })
                .collect();

            let pipeline =
                UploadPipeline::new(Arc::clone(&client), Arc::clone(&log), args.log_dir.clone());
            let outcome = pipeline.create_empty_documents(payloads, None).await?;
            report_outcome(&outcome);
        }

        Command::ExportHub { hub, out_dir } => {
            let mut state = load_session(Arc::clone(&client), false).await?;
            let hub_id = state.select_hub(&hub)?;

            let exported =
                stacksmith::export::export_hub_structure(&client, log.as_ref(), hub_id, &out_dir)
                    .await?;
            info!(
                "Hub structure with {} folder(s) created under {}",
                exported.folder_dirs.len(),
                exported.root.display()
            );
        }
    }

    Ok(())
}

/// Run the background refresh worker and wait for its data handoff.
async fn load_session(
    client: Arc<CatalogClient>,
    force_refresh: bool,
) -> stacksmith::Result<SessionState> {
    let mut rx = worker::spawn_refresh(client, force_refresh);
    let mut state = SessionState::new();

    while let Some(event) = rx.recv().await {
        match event {
            UiEvent::Log(line) => info!("{}", line),
            UiEvent::DataReady { documents, templates, visual_configs } => {
                info!(
                    "Data loaded: {} documents, {} templates, {} visual configs.",
                    documents.len(),
                    templates.len(),
                    visual_configs.len()
                );
                state.set_data(documents, templates, visual_configs);
                return Ok(state);
            }
            UiEvent::Failed(message) => {
                return Err(StacksmithError::Config(format!(
                    "could not load catalog data: {}",
                    message
                )));
            }
        }
    }

    Err(StacksmithError::Config(
        "data refresh ended without a result".into(),
    ))
}

/// The list endpoint elides field schemas; fetch the full template and
/// fall back to the session copy if the detail call fails.
async fn resolve_template(
    client: &CatalogClient,
    state: &SessionState,
    template_id: i64,
) -> stacksmith::Result<stacksmith::api::models::Template> {
    if let Some(full) = client.template_details(template_id).await {
        return Ok(full);
    }
    state
        .templates
        .iter()
        .find(|t| t.id == template_id)
        .cloned()
        .ok_or_else(|| {
            StacksmithError::Config(format!("template {} is not known to this catalog", template_id))
        })
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn report_outcome(outcome: &stacksmith::upload::UploadOutcome) {
    if outcome.cancelled {
        warn!("Operation cancelled; nothing was uploaded.");
        return;
    }
    info!(
        "Prepared: {}, succeeded: {}, failed: {}",
        outcome.prepared, outcome.succeeded, outcome.failed
    );
    if let Some(job_id) = &outcome.job_id {
        info!("Accepted as background job {}.", job_id);
    }
    if let Some(path) = &outcome.log_path {
        info!("Audit log: {}", path.display());
    }
    if outcome.failed > 0 {
        std::process::exit(1);
    }
}
