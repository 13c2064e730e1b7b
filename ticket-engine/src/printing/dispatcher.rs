//! Print job dispatcher
//!
//! Routes a rendered document to its assigned network printer, or to the
//! fallback renderer when there is none, it is misconfigured, or sending
//! fails. Nothing is retried.

use std::sync::Arc;

use ocna_printer::PrintResult;
use shared::models::Settings;
use tracing::{info, instrument, warn};

use super::document::TicketDocument;
use super::fallback::FallbackRenderer;
use super::renderer::TicketRenderer;
use super::transport::Transport;
use super::{FallbackReason, PrintError, PrintOutcome, PrintReport};

pub struct PrintDispatcher {
    renderer: TicketRenderer,
    transport: Arc<dyn Transport>,
    fallback: Arc<dyn FallbackRenderer>,
}

impl PrintDispatcher {
    pub fn new(
        renderer: TicketRenderer,
        transport: Arc<dyn Transport>,
        fallback: Arc<dyn FallbackRenderer>,
    ) -> Self {
        Self {
            renderer,
            transport,
            fallback,
        }
    }

    /// Run one job to completion
    #[instrument(skip(self, doc, settings), fields(job_id = %doc.job_id, function = %doc.function.as_str()))]
    pub async fn dispatch(
        &self,
        doc: &TicketDocument,
        settings: &Settings,
    ) -> Result<PrintReport, PrintError> {
        let sink = settings.assignment(doc.function);

        let reason = match settings.printer(sink) {
            None => FallbackReason::Unassigned,
            Some(printer) => match printer.endpoint() {
                None => {
                    warn!(%sink, host = %printer.host, port = %printer.port, "Invalid printer address");
                    FallbackReason::InvalidEndpoint {
                        sink,
                        host: printer.host.clone(),
                        port: printer.port.clone(),
                    }
                }
                Some((host, port)) => match self.send(doc, host, port).await {
                    Ok(bytes) => {
                        info!(%sink, host, port, bytes, "Print job sent");
                        return Ok(PrintReport {
                            job_id: doc.job_id,
                            function: doc.function,
                            outcome: PrintOutcome::Network { sink, bytes },
                        });
                    }
                    Err(e) => {
                        warn!(%sink, host, port, error = %e, "Printer failed, using fallback");
                        FallbackReason::Network {
                            sink,
                            message: e.to_string(),
                        }
                    }
                },
            },
        };

        self.fallback(doc, reason).await
    }

    async fn send(&self, doc: &TicketDocument, host: &str, port: u16) -> PrintResult<usize> {
        let data = self.renderer.render(doc)?;
        self.transport.send(host, port, &data).await?;
        Ok(data.len())
    }

    async fn fallback(
        &self,
        doc: &TicketDocument,
        reason: FallbackReason,
    ) -> Result<PrintReport, PrintError> {
        match self.fallback.render(doc).await {
            Ok(location) => {
                info!(%reason, %location, "Printed via fallback renderer");
                Ok(PrintReport {
                    job_id: doc.job_id,
                    function: doc.function,
                    outcome: PrintOutcome::Fallback { reason, location },
                })
            }
            Err(e) => {
                warn!(%reason, error = %e, "Fallback renderer failed");
                Err(PrintError::Fallback {
                    job_id: doc.job_id,
                    reason,
                    message: e.to_string(),
                })
            }
        }
    }
}

impl std::fmt::Debug for PrintDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrintDispatcher")
            .field("width", &self.renderer.width())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::Quantities;
    use crate::menu::MenuCatalog;
    use crate::printing::fallback::MemoryRenderer;
    use async_trait::async_trait;
    use ocna_printer::PrintError as NetworkError;
    use shared::models::{MenuItem, PrinterConfig, SinkId};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<(String, u16, usize)>>,
        fail: bool,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send(&self, host: &str, port: u16, data: &[u8]) -> PrintResult<()> {
            self.sent
                .lock()
                .unwrap()
                .push((host.to_string(), port, data.len()));
            if self.fail {
                return Err(NetworkError::Connection("refused".to_string()));
            }
            Ok(())
        }
    }

    fn kitchen_doc() -> TicketDocument {
        TicketDocument::kitchen(
            "Bàn 1",
            &Quantities::from([(1, 2)]),
            &MenuCatalog::new(vec![MenuItem::new(1, "Ốc hương", 50_000, None)], vec![]),
            &Settings::default(),
            chrono_tz::Asia::Ho_Chi_Minh,
        )
    }

    fn settings_with_kitchen(host: &str, port: &str) -> Settings {
        Settings {
            printer1: PrinterConfig::new("Bếp", host, port),
            kitchen_printer_id: SinkId::Printer1,
            ..Default::default()
        }
    }

    fn dispatcher(
        transport: Arc<RecordingTransport>,
        fallback: Arc<MemoryRenderer>,
    ) -> PrintDispatcher {
        PrintDispatcher::new(TicketRenderer::new(48), transport, fallback)
    }

    #[tokio::test]
    async fn test_unassigned_goes_to_fallback() {
        let transport = Arc::new(RecordingTransport::default());
        let fallback = Arc::new(MemoryRenderer::new());
        let report = dispatcher(transport.clone(), fallback.clone())
            .dispatch(&kitchen_doc(), &Settings::default())
            .await
            .unwrap();

        assert_eq!(report.fallback_reason(), Some(&FallbackReason::Unassigned));
        assert!(transport.sent.lock().unwrap().is_empty());
        assert_eq!(fallback.documents().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_endpoints_never_connect() {
        let cases = [
            ("192.168.1.100", "0"),
            ("192.168.1.100", "70000"),
            ("", "9100"),
            ("  ", "9100"),
            ("10.0.0.2", "abc"),
        ];
        for (host, port) in cases {
            let transport = Arc::new(RecordingTransport::default());
            let fallback = Arc::new(MemoryRenderer::new());
            let report = dispatcher(transport.clone(), fallback.clone())
                .dispatch(&kitchen_doc(), &settings_with_kitchen(host, port))
                .await
                .unwrap();

            assert!(matches!(
                report.fallback_reason(),
                Some(FallbackReason::InvalidEndpoint { sink: SinkId::Printer1, .. })
            ));
            assert!(transport.sent.lock().unwrap().is_empty(), "{}:{}", host, port);
        }
    }

    #[tokio::test]
    async fn test_valid_endpoint_uses_network() {
        let transport = Arc::new(RecordingTransport::default());
        let fallback = Arc::new(MemoryRenderer::new());
        let report = dispatcher(transport.clone(), fallback.clone())
            .dispatch(&kitchen_doc(), &settings_with_kitchen(" 192.168.1.100 ", "9100"))
            .await
            .unwrap();

        assert!(report.is_network());
        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!((sent[0].0.as_str(), sent[0].1), ("192.168.1.100", 9100));
        assert!(fallback.documents().is_empty());
    }

    #[tokio::test]
    async fn test_send_failure_falls_back_once() {
        let transport = Arc::new(RecordingTransport {
            fail: true,
            ..Default::default()
        });
        let fallback = Arc::new(MemoryRenderer::new());
        let report = dispatcher(transport.clone(), fallback.clone())
            .dispatch(&kitchen_doc(), &settings_with_kitchen("192.168.1.100", "9100"))
            .await
            .unwrap();

        assert!(matches!(
            report.fallback_reason(),
            Some(FallbackReason::Network { sink: SinkId::Printer1, .. })
        ));
        assert_eq!(transport.sent.lock().unwrap().len(), 1);
        assert_eq!(fallback.documents().len(), 1);
    }

    #[tokio::test]
    async fn test_fallback_failure_is_reported() {
        let transport = Arc::new(RecordingTransport::default());
        let doc = kitchen_doc();
        let err = dispatcher(transport, Arc::new(MemoryRenderer::failing()))
            .dispatch(&doc, &Settings::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PrintError::Fallback { job_id, reason: FallbackReason::Unassigned, .. } if job_id == doc.job_id
        ));
    }
}
