//! Print queue
//!
//! Serializes all print jobs of a session through one worker task, so a
//! kitchen docket and a payment bill never write to a printer at the same
//! time. The worker only checks for shutdown between jobs; a job that has
//! started always runs to completion.

use std::sync::Arc;

use shared::models::Settings;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::dispatcher::PrintDispatcher;
use super::document::TicketDocument;
use super::{PrintError, PrintReport};

struct PrintJob {
    document: TicketDocument,
    settings: Settings,
    reply: oneshot::Sender<Result<PrintReport, PrintError>>,
}

/// Handle to a running print worker
#[derive(Debug, Clone)]
pub struct PrintQueue {
    tx: mpsc::Sender<PrintJob>,
    shutdown: CancellationToken,
}

impl PrintQueue {
    /// Spawn the worker; the handle resolves once it has stopped
    pub fn spawn(dispatcher: Arc<PrintDispatcher>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(run(dispatcher, rx, shutdown.clone()));
        (Self { tx, shutdown }, handle)
    }

    /// Queue a job and wait for its result
    pub async fn submit(
        &self,
        document: TicketDocument,
        settings: Settings,
    ) -> Result<PrintReport, PrintError> {
        let (reply, rx) = oneshot::channel();
        let job = PrintJob {
            document,
            settings,
            reply,
        };
        self.tx
            .send(job)
            .await
            .map_err(|_| PrintError::QueueClosed)?;
        rx.await.map_err(|_| PrintError::QueueClosed)?
    }

    /// Stop the worker after the job in progress, if any
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled() || self.tx.is_closed()
    }
}

async fn run(
    dispatcher: Arc<PrintDispatcher>,
    mut rx: mpsc::Receiver<PrintJob>,
    shutdown: CancellationToken,
) {
    info!("Print worker started");
    loop {
        let job = tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                info!("Print worker received shutdown signal");
                break;
            }
            job = rx.recv() => match job {
                Some(job) => job,
                None => {
                    info!("Print channel closed, worker stopping");
                    break;
                }
            },
        };

        let result = dispatcher.dispatch(&job.document, &job.settings).await;
        if job.reply.send(result).is_err() {
            debug!(job_id = %job.document.job_id, "Submitter gone before job finished");
        }
    }
}
