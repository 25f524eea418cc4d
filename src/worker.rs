//! Background data refresh over a channel.
//!
//! The slow collection fetches run on a spawned task; the caller drains
//! a receiver for progress messages and the final data handoff, so an
//! interactive shell never blocks on the network.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::api::models::{Document, Template, VisualConfig};
use crate::api::CatalogClient;
use crate::types::LogSink;

/// Messages flowing from the refresh task to the shell.
#[derive(Debug)]
pub enum UiEvent {
    /// An operator-facing progress line
    Log(String),
    /// The refreshed collections, sent exactly once on success
    DataReady {
        documents: Vec<Document>,
        templates: Vec<Template>,
        visual_configs: Vec<VisualConfig>,
    },
    /// The refresh produced nothing usable
    Failed(String),
}

/// LogSink that forwards messages into the event channel, so client
/// progress lines reach the shell instead of a console it may not have.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<UiEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<UiEvent>) -> Self {
        Self { tx }
    }
}

impl LogSink for ChannelSink {
    fn log(&self, message: &str) {
        // Receiver gone means the shell stopped listening; nothing to do
        let _ = self.tx.send(UiEvent::Log(message.to_string()));
    }
}

/// Fetch documents, templates, and visual configs off-thread and hand
/// the results back over the returned receiver.
///
/// The task's client carries a `ChannelSink`, so its progress lines
/// arrive as `UiEvent::Log` on the same channel as the data handoff.
pub fn spawn_refresh(
    client: Arc<CatalogClient>,
    force_refresh: bool,
) -> mpsc::UnboundedReceiver<UiEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    let client = client.with_log(Arc::new(ChannelSink::new(tx.clone())));

    tokio::spawn(async move {
        debug!(force_refresh, "background refresh started");
        let documents = client.documents(force_refresh).await;
        let templates = client.templates(force_refresh).await;
        let visual_configs = client.visual_configs().await;

        let event = if documents.is_empty() && templates.is_empty() {
            UiEvent::Failed("no documents or templates could be fetched".to_string())
        } else {
            UiEvent::DataReady { documents, templates, visual_configs }
        };
        let _ = tx.send(event);
    });

    rx
}
