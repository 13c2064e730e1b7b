//! `ticket` command line
//!
//! Drives the engine end to end against an in-process backend seeded from
//! a JSON menu file.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use shared::models::SettingsPatch;
use ticket_engine::{
    DocketOutcome, EngineConfig, EventBus, MemoryBackend, MenuSeed, OrderSync, PrintDispatcher,
    PrintOutcome, PrintQueue, PrintReport, SessionContext, SettingsStore, SpoolRenderer,
    TableList, TableSession, TcpTransport, format_money, init_logger,
};
use ticket_engine::printing::TicketRenderer;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "ticket", version, about = "Order ticket engine")]
struct Cli {
    /// Menu file ({"categories": [...], "items": [...]})
    #[arg(long, env = "TICKET_MENU_PATH")]
    menu: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the bill for a set of items
    Totals {
        /// Item as `id=quantity`, repeatable
        #[arg(long = "item", value_parser = parse_item)]
        items: Vec<(i64, u32)>,
        #[arg(long, default_value = "")]
        discount: String,
    },
    /// Save items for a table and print the kitchen docket
    Kitchen {
        #[arg(long)]
        table: String,
        #[arg(long = "item", value_parser = parse_item)]
        items: Vec<(i64, u32)>,
    },
    /// Save items, print the bill and close the order
    Pay {
        #[arg(long)]
        table: String,
        #[arg(long = "item", value_parser = parse_item)]
        items: Vec<(i64, u32)>,
        #[arg(long, default_value = "")]
        discount: String,
    },
    /// List tables, or add and remove one
    Tables {
        #[command(subcommand)]
        action: Option<TablesAction>,
    },
    /// Show or change settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand)]
enum TablesAction {
    Add { name: String },
    Remove { name: String },
}

#[derive(Subcommand)]
enum SettingsAction {
    Show,
    /// Merge a JSON patch, e.g. '{"kitchenPrinterId": "printer1"}'
    Set { patch: String },
}

fn parse_item(s: &str) -> Result<(i64, u32), String> {
    let (id, qty) = s
        .split_once('=')
        .ok_or_else(|| format!("expected id=quantity, got {:?}", s))?;
    let id = id.trim().parse().map_err(|_| format!("bad item id: {:?}", id))?;
    let qty = qty.trim().parse().map_err(|_| format!("bad quantity: {:?}", qty))?;
    Ok((id, qty))
}

struct App {
    config: EngineConfig,
    settings: SettingsStore,
    sync: Arc<OrderSync>,
    bus: EventBus,
}

impl App {
    async fn load(config: EngineConfig, menu_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let settings = SettingsStore::load(&config.settings_path)
            .await
            .with_context(|| format!("loading {}", config.settings_path.display()))?;

        let menu_path = menu_path.unwrap_or_else(|| config.menu_path.clone());
        let seed = match tokio::fs::read(&menu_path).await {
            Ok(bytes) => serde_json::from_slice::<MenuSeed>(&bytes)
                .with_context(|| format!("parsing {}", menu_path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %menu_path.display(), "No menu file, starting with an empty menu");
                MenuSeed::default()
            }
            Err(e) => return Err(e).with_context(|| format!("reading {}", menu_path.display())),
        };

        let backend = MemoryBackend::with_menu(seed);
        let sync = Arc::new(OrderSync::new(Arc::new(backend)));
        Ok(Self {
            config,
            settings,
            sync,
            bus: EventBus::new(),
        })
    }

    async fn session(&self, table: &str) -> anyhow::Result<(TableSession, PrintQueue)> {
        let logo = self.config.logo_path.as_ref().and_then(|p| {
            let logo = p.to_str().and_then(ocna_printer::process_logo);
            if logo.is_none() {
                warn!(path = %p.display(), "Logo not usable, printing without it");
            }
            logo
        });

        let dispatcher = PrintDispatcher::new(
            TicketRenderer::new(self.config.paper_width).with_logo(logo),
            Arc::new(TcpTransport::new(self.config.print_timeout())),
            Arc::new(SpoolRenderer::new(
                &self.config.spool_dir,
                self.config.paper_width,
            )),
        );
        let (queue, _worker) = PrintQueue::spawn(Arc::new(dispatcher), self.config.queue_capacity);

        let ctx = SessionContext {
            sync: self.sync.clone(),
            queue: queue.clone(),
            menu: Arc::new(self.sync.load_menu().await?),
            settings: self.settings.settings().clone(),
            bus: self.bus.clone(),
            timezone: self.config.timezone,
        };
        Ok((TableSession::open(ctx, table).await?, queue))
    }
}

fn fill(session: &mut TableSession, items: &[(i64, u32)]) -> anyhow::Result<()> {
    if items.is_empty() {
        bail!("no items given (use --item id=quantity)");
    }
    for (id, qty) in items {
        session.adjust(*id, i64::from(*qty));
    }
    Ok(())
}

fn describe(report: &PrintReport) -> String {
    match &report.outcome {
        PrintOutcome::Network { sink, bytes } => format!("sent {} bytes to {}", bytes, sink),
        PrintOutcome::Fallback { reason, location } => {
            format!("fallback ({}) -> {}", reason, location)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let config = EngineConfig::from_env();
    let _guard = init_logger(&config.log_level, config.log_dir.as_deref());

    info!(work_dir = %config.work_dir.display(), "Starting ticket");
    let mut app = App::load(config, cli.menu).await?;

    match cli.command {
        Command::Totals { items, discount } => {
            let (mut session, queue) = app.session("").await?;
            fill(&mut session, &items)?;
            session.set_discount_input(discount);
            let totals = session.totals();
            println!("Tiền hàng: {}", format_money(totals.subtotal));
            println!("Giảm giá:  -{}", format_money(totals.discount_amount));
            println!("VAT:       +{}", format_money(totals.vat_amount));
            println!("TỔNG:      {}", format_money(totals.final_total));
            queue.shutdown();
        }
        Command::Kitchen { table, items } => {
            let (mut session, queue) = app.session(&table).await?;
            fill(&mut session, &items)?;
            let flow = session.save_and_print_kitchen().await?;
            println!("order {}: {} lines saved", flow.save.order_id, flow.save.lines);
            match flow.docket {
                DocketOutcome::NothingNew => println!("kitchen: nothing new to print"),
                DocketOutcome::Printed { docket, report } => {
                    println!("kitchen: {} lines, {}", docket.len(), describe(&report))
                }
                DocketOutcome::Failed { error, .. } => println!("kitchen: print failed: {}", error),
            }
            queue.shutdown();
        }
        Command::Pay {
            table,
            items,
            discount,
        } => {
            let (mut session, queue) = app.session(&table).await?;
            fill(&mut session, &items)?;
            session.save_and_print_kitchen().await?;
            session.set_discount_input(discount);
            let flow = session.print_and_pay().await?;
            println!("bill: {}", describe(&flow.print));
            println!("paid: {}", format_money(flow.totals.final_total));
            queue.shutdown();
        }
        Command::Tables { action } => {
            let mut tables = TableList::load(&app.config.tables_path).await?;
            match action {
                Some(TablesAction::Add { name }) => {
                    if !tables.add(&name).await? {
                        bail!("table {:?} not added", name);
                    }
                }
                Some(TablesAction::Remove { name }) => {
                    if !tables.remove(&name).await? {
                        bail!("no table named {:?}", name);
                    }
                }
                None => {}
            }
            for name in tables.names() {
                println!("{}", name);
            }
        }
        Command::Settings { action } => match action {
            SettingsAction::Show => {
                println!("{}", serde_json::to_string_pretty(app.settings.settings())?);
            }
            SettingsAction::Set { patch } => {
                let patch: SettingsPatch =
                    serde_json::from_str(&patch).context("parsing settings patch")?;
                let saved = app.settings.update(patch).await?;
                println!("{}", serde_json::to_string_pretty(saved)?);
            }
        },
    }

    Ok(())
}
