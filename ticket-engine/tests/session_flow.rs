use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use ocna_printer::PrintResult;
use shared::models::{Category, MenuItem, PrinterConfig, Settings, SinkId};
use ticket_engine::printing::TicketRenderer;
use ticket_engine::{
    BackendError, BackendOp, DocketOutcome, EngineError, EventBus, FallbackReason, MemoryBackend,
    MemoryRenderer, MenuSeed, OrderSync, PrintDispatcher, PrintQueue, Quantities, SessionContext,
    SessionEvent, TableSession, TcpTransport, Transport, ValidationError,
};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;

const OC_HUONG: i64 = 1;
const NGHEU: i64 = 2;

fn menu_seed() -> MenuSeed {
    MenuSeed {
        categories: vec![Category {
            id: 1,
            name: "Ốc".to_string(),
        }],
        items: vec![
            MenuItem::new(OC_HUONG, "Ốc hương xào bơ", 50_000, Some(1)),
            MenuItem::new(NGHEU, "Nghêu hấp sả", 30_000, Some(1)),
        ],
    }
}

/// Counts connection attempts without touching the network
#[derive(Default)]
struct CountingTransport {
    attempts: AtomicUsize,
}

#[async_trait]
impl Transport for CountingTransport {
    async fn send(&self, _host: &str, _port: u16, _data: &[u8]) -> PrintResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct Harness {
    backend: MemoryBackend,
    fallback: Arc<MemoryRenderer>,
    ctx: SessionContext,
}

impl Harness {
    async fn new(settings: Settings, transport: Arc<dyn Transport>) -> Self {
        Self::with_fallback(settings, transport, Arc::new(MemoryRenderer::new())).await
    }

    async fn with_fallback(
        settings: Settings,
        transport: Arc<dyn Transport>,
        fallback: Arc<MemoryRenderer>,
    ) -> Self {
        let backend = MemoryBackend::with_menu(menu_seed());
        let sync = Arc::new(OrderSync::new(Arc::new(backend.clone())));
        let dispatcher =
            PrintDispatcher::new(TicketRenderer::new(48), transport, fallback.clone());
        let (queue, _worker) = PrintQueue::spawn(Arc::new(dispatcher), 8);

        let ctx = SessionContext {
            menu: Arc::new(sync.load_menu().await.unwrap()),
            sync,
            queue,
            settings,
            bus: EventBus::new(),
            timezone: chrono_tz::Asia::Ho_Chi_Minh,
        };
        Self {
            backend,
            fallback,
            ctx,
        }
    }

    async fn open(&self, table: &str) -> TableSession {
        TableSession::open(self.ctx.clone(), table).await.unwrap()
    }
}

fn kitchen_on(host: &str, port: &str) -> Settings {
    Settings {
        printer1: PrinterConfig::new("Bếp", host, port),
        kitchen_printer_id: SinkId::Printer1,
        ..Default::default()
    }
}

#[tokio::test]
async fn reference_bill_with_and_without_vat() {
    let settings = Settings {
        is_vat_enabled: true,
        vat_percent: "8".to_string(),
        ..Default::default()
    };
    let harness = Harness::new(settings.clone(), Arc::new(CountingTransport::default())).await;
    let mut session = harness.open("Bàn 1").await;

    session.adjust(OC_HUONG, 1);
    session.adjust(OC_HUONG, 1);
    session.adjust(NGHEU, 1);
    session.set_discount_input("10");

    let totals = session.totals();
    assert_eq!(totals.subtotal, 130_000);
    assert_eq!(totals.discount_amount, 13_000);
    assert_eq!(totals.after_discount(), 117_000);
    assert_eq!(totals.vat_amount, 9_360);
    assert_eq!(totals.final_total, 126_360);

    session.set_settings(Settings {
        is_vat_enabled: false,
        ..settings
    });
    let totals = session.totals();
    assert_eq!(totals.vat_amount, 0);
    assert_eq!(totals.final_total, 117_000);

    session.set_discount_input("không");
    assert_eq!(session.totals().discount_amount, 0);
}

#[tokio::test]
async fn unassigned_kitchen_prints_through_fallback_without_connecting() {
    let transport = Arc::new(CountingTransport::default());
    let harness = Harness::new(Settings::default(), transport.clone()).await;
    let mut session = harness.open("Bàn 2").await;

    session.adjust(OC_HUONG, 2);
    let flow = session.save_and_print_kitchen().await.unwrap();

    let DocketOutcome::Printed { docket, report } = &flow.docket else {
        panic!("expected a printed docket, got {:?}", flow.docket);
    };
    assert_eq!(docket.get(OC_HUONG), Some(2));
    assert_eq!(report.fallback_reason(), Some(&FallbackReason::Unassigned));
    assert_eq!(transport.attempts.load(Ordering::SeqCst), 0);
    assert_eq!(harness.fallback.documents().len(), 1);
    assert_eq!(session.cart().snapshot(), session.cart().cart());

    // Nothing changed since, so the second save prints nothing
    let flow = session.save_and_print_kitchen().await.unwrap();
    assert_eq!(flow.docket, DocketOutcome::NothingNew);
    assert_eq!(harness.fallback.documents().len(), 1);
}

#[tokio::test]
async fn out_of_range_ports_fall_back_without_connecting() {
    for port in ["0", "70000"] {
        let transport = Arc::new(CountingTransport::default());
        let harness = Harness::new(kitchen_on("192.168.1.100", port), transport.clone()).await;
        let mut session = harness.open("Bàn 3").await;

        session.adjust(NGHEU, 1);
        let flow = session.save_and_print_kitchen().await.unwrap();

        let DocketOutcome::Printed { report, .. } = flow.docket else {
            panic!("expected a printed docket");
        };
        assert!(matches!(
            report.fallback_reason(),
            Some(FallbackReason::InvalidEndpoint { sink: SinkId::Printer1, .. })
        ));
        assert_eq!(transport.attempts.load(Ordering::SeqCst), 0, "port {}", port);
    }
}

#[tokio::test]
async fn kitchen_docket_reaches_a_tcp_printer() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let printer = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        socket.read_to_end(&mut received).await.unwrap();
        received
    });

    let harness = Harness::new(
        kitchen_on("127.0.0.1", &port.to_string()),
        Arc::new(TcpTransport::default()),
    )
    .await;
    let mut session = harness.open("Bàn 4").await;
    session.adjust(OC_HUONG, 1);

    let flow = session.save_and_print_kitchen().await.unwrap();
    let DocketOutcome::Printed { report, .. } = flow.docket else {
        panic!("expected a printed docket");
    };
    assert!(report.is_network());

    let received = printer.await.unwrap();
    assert_eq!(&received[..5], &[0x1B, 0x40, 0x1B, 0x74, 52]);
    assert_eq!(&received[received.len() - 4..], &[0x1D, 0x56, 0x42, 4]);
    assert!(harness.fallback.documents().is_empty());
}

#[tokio::test]
async fn refused_connection_falls_back_and_still_advances_snapshot() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let harness = Harness::new(
        kitchen_on("127.0.0.1", &port.to_string()),
        Arc::new(TcpTransport::default()),
    )
    .await;
    let mut events = harness.ctx.bus.subscribe();
    let mut session = harness.open("Bàn 5").await;
    session.adjust(NGHEU, 3);

    let flow = session.save_and_print_kitchen().await.unwrap();
    let DocketOutcome::Printed { report, .. } = flow.docket else {
        panic!("expected a printed docket");
    };
    assert!(matches!(
        report.fallback_reason(),
        Some(FallbackReason::Network { .. })
    ));
    assert_eq!(session.cart().snapshot(), &Quantities::from([(NGHEU, 3)]));

    let mut saw_fallback_event = false;
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::Printed { report, .. } = event {
            saw_fallback_event |= report.fallback_reason().is_some();
        }
    }
    assert!(saw_fallback_event);
}

#[tokio::test]
async fn only_additions_reach_the_kitchen() {
    let harness = Harness::new(Settings::default(), Arc::new(CountingTransport::default())).await;
    let mut session = harness.open("Bàn 6").await;

    session.adjust(OC_HUONG, 2);
    session.adjust(NGHEU, 1);
    session.save_and_print_kitchen().await.unwrap();

    session.adjust(OC_HUONG, 1);
    session.adjust(NGHEU, -1);
    let flow = session.save_and_print_kitchen().await.unwrap();
    let docket = flow.docket.docket().unwrap();
    assert_eq!(docket.lines(), &Quantities::from([(OC_HUONG, 1)]));

    let documents = harness.fallback.documents();
    assert_eq!(documents.len(), 2);
    assert_eq!(documents[1].lines.len(), 1);
    assert_eq!(documents[1].lines[0].quantity, 1);
}

#[tokio::test]
async fn docket_of_unknown_items_is_not_printed() {
    let transport = Arc::new(CountingTransport::default());
    let harness = Harness::new(kitchen_on("192.168.1.50", "9100"), transport.clone()).await;
    let mut session = harness.open("Bàn 11").await;

    session.adjust(404, 2);
    let flow = session.save_and_print_kitchen().await.unwrap();

    assert_eq!(flow.docket, DocketOutcome::NothingNew);
    assert_eq!(transport.attempts.load(Ordering::SeqCst), 0);
    assert!(harness.fallback.documents().is_empty());
    assert_eq!(session.cart().snapshot(), &Quantities::from([(404, 2)]));

    // Known items added later still reach the kitchen, without the unknown one
    session.adjust(OC_HUONG, 1);
    let flow = session.save_and_print_kitchen().await.unwrap();
    let docket = flow.docket.docket().unwrap();
    assert_eq!(docket.lines(), &Quantities::from([(OC_HUONG, 1)]));
    assert_eq!(transport.attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn snapshot_is_the_cart_at_dispatch() {
    let harness = Harness::new(Settings::default(), Arc::new(CountingTransport::default())).await;
    let mut session = harness.open("Bàn 7").await;

    session.adjust(OC_HUONG, 2);
    session.adjust(NGHEU, 1);
    session.save_and_print_kitchen().await.unwrap();
    let dispatched = Quantities::from([(OC_HUONG, 2), (NGHEU, 1)]);

    session.adjust(NGHEU, -1);
    assert_eq!(session.cart().snapshot(), &dispatched);
    assert!(session.cart().pending().is_empty());
}

#[tokio::test]
async fn failed_save_leaves_local_state_untouched() {
    let harness = Harness::new(Settings::default(), Arc::new(CountingTransport::default())).await;
    let mut events = harness.ctx.bus.subscribe();
    let mut session = harness.open("Bàn 8").await;
    session.adjust(OC_HUONG, 1);

    harness.backend.fail_on(BackendOp::UpsertItems);
    let err = session.save_and_print_kitchen().await.unwrap_err();
    assert!(matches!(err, EngineError::Remote(BackendError::Unavailable(_))));
    assert!(session.order_id().is_none());
    assert!(session.cart().snapshot().is_empty());
    assert!(harness.fallback.documents().is_empty());

    let mut saw_remote_failure = false;
    while let Ok(event) = events.try_recv() {
        saw_remote_failure |= matches!(event, SessionEvent::RemoteFailed { operation: "save_items", .. });
    }
    assert!(saw_remote_failure);

    harness.backend.recover();
    let flow = session.save_and_print_kitchen().await.unwrap();
    assert!(matches!(flow.docket, DocketOutcome::Printed { .. }));
}

#[tokio::test]
async fn fallback_failure_still_counts_as_attempted() {
    let harness = Harness::with_fallback(
        Settings::default(),
        Arc::new(CountingTransport::default()),
        Arc::new(MemoryRenderer::failing()),
    )
    .await;
    let mut session = harness.open("Bàn 9").await;
    session.adjust(OC_HUONG, 1);

    let flow = session.save_and_print_kitchen().await.unwrap();
    assert!(matches!(flow.docket, DocketOutcome::Failed { .. }));
    assert_eq!(session.cart().snapshot(), session.cart().cart());
}

#[tokio::test]
async fn reopening_a_table_restores_its_order() {
    let harness = Harness::new(Settings::default(), Arc::new(CountingTransport::default())).await;
    let mut session = harness.open("Bàn 10").await;
    session.adjust(OC_HUONG, 2);
    session.save_and_print_kitchen().await.unwrap();
    let order_id = session.order_id();
    drop(session);

    let reopened = harness.open("Bàn 10").await;
    assert_eq!(reopened.order_id(), order_id);
    assert_eq!(reopened.cart().quantity(OC_HUONG), 2);
    assert!(reopened.cart().pending().is_empty());
}

#[tokio::test]
async fn pay_closes_the_order() {
    let harness = Harness::new(Settings::default(), Arc::new(CountingTransport::default())).await;
    let mut session = harness.open("Bàn 11").await;

    assert!(matches!(
        session.print_and_pay().await,
        Err(EngineError::Validation(ValidationError::EmptyCart))
    ));

    session.adjust(OC_HUONG, 1);
    assert!(matches!(
        session.print_and_pay().await,
        Err(EngineError::Validation(ValidationError::NoOrder(_)))
    ));

    session.save_and_print_kitchen().await.unwrap();
    let order_id = session.order_id().unwrap();
    assert_eq!(
        harness.ctx.sync.active_tables().await.unwrap(),
        vec!["Bàn 11".to_string()]
    );

    session.set_discount_input("10");
    let flow = session.print_and_pay().await.unwrap();
    assert_eq!(flow.totals.final_total, 45_000);
    assert_eq!(flow.print.fallback_reason(), Some(&FallbackReason::Unassigned));

    assert!(session.cart().is_empty());
    assert!(session.order_id().is_none());
    assert!(!harness.backend.order(order_id).unwrap().is_open());
    assert!(harness.ctx.sync.cached_active_tables().is_empty());

    let bill = harness.fallback.documents().pop().unwrap();
    assert_eq!(bill.totals.map(|t| t.final_total), Some(45_000));
}

#[tokio::test]
async fn failed_payment_status_keeps_the_cart() {
    let harness = Harness::new(Settings::default(), Arc::new(CountingTransport::default())).await;
    let mut session = harness.open("Bàn 12").await;
    session.adjust(NGHEU, 2);
    session.save_and_print_kitchen().await.unwrap();

    harness.backend.fail_on(BackendOp::UpdateStatus);
    let err = session.print_and_pay().await.unwrap_err();
    assert!(matches!(err, EngineError::Remote(_)));
    assert_eq!(session.cart().quantity(NGHEU), 2);
    assert!(session.order_id().is_some());
}
