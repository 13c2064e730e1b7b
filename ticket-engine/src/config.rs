//! Engine configuration
//!
//! # Environment variables
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | TICKET_WORK_DIR | ./ticket-data | Working directory |
//! | TICKET_SETTINGS_PATH | <work_dir>/settings.json | Settings document |
//! | TICKET_SPOOL_DIR | <work_dir>/spool | Fallback renderer output |
//! | TICKET_PAPER_WIDTH | 48 | Characters per line (32 or 48) |
//! | TICKET_PRINT_TIMEOUT_MS | 5000 | Printer connect + write window |
//! | TICKET_TIMEZONE | Asia/Ho_Chi_Minh | Timezone printed on documents |
//! | TICKET_LOGO_PATH | (unset) | Logo image for payment bills |
//! | TICKET_LOG_LEVEL | info | Default log filter |
//! | TICKET_LOG_DIR | (unset) | Daily rolling log files |
//! | TICKET_QUEUE_CAPACITY | 32 | Pending print jobs per session |
//!
//! Unparseable values fall back to the default.
//!
//! ```ignore
//! TICKET_WORK_DIR=/data/ocna TICKET_PAPER_WIDTH=32 ticket tables
//! ```

use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;

pub const DEFAULT_WORK_DIR: &str = "./ticket-data";
pub const DEFAULT_PAPER_WIDTH: usize = 48;
pub const DEFAULT_PRINT_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Ho_Chi_Minh;
pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub work_dir: PathBuf,
    pub settings_path: PathBuf,
    pub tables_path: PathBuf,
    pub menu_path: PathBuf,
    pub spool_dir: PathBuf,
    /// 58mm paper: 32, 80mm paper: 48
    pub paper_width: usize,
    pub print_timeout_ms: u64,
    pub timezone: Tz,
    pub logo_path: Option<PathBuf>,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
    pub queue_capacity: usize,
}

impl EngineConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let work_dir = PathBuf::from(var("TICKET_WORK_DIR").unwrap_or_else(|| DEFAULT_WORK_DIR.into()));

        let paper_width = var("TICKET_PAPER_WIDTH")
            .and_then(|v| v.trim().parse().ok())
            .filter(|w| matches!(*w, 32 | 48))
            .unwrap_or(DEFAULT_PAPER_WIDTH);

        Self {
            settings_path: var("TICKET_SETTINGS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| work_dir.join("settings.json")),
            tables_path: work_dir.join("tables.json"),
            menu_path: work_dir.join("menu.json"),
            spool_dir: var("TICKET_SPOOL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| work_dir.join("spool")),
            paper_width,
            print_timeout_ms: var("TICKET_PRINT_TIMEOUT_MS")
                .and_then(|v| v.trim().parse().ok())
                .filter(|ms| *ms > 0)
                .unwrap_or(DEFAULT_PRINT_TIMEOUT_MS),
            timezone: var("TICKET_TIMEZONE")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_TIMEZONE),
            logo_path: var("TICKET_LOGO_PATH").map(PathBuf::from),
            log_level: var("TICKET_LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_dir: var("TICKET_LOG_DIR").map(PathBuf::from),
            queue_capacity: var("TICKET_QUEUE_CAPACITY")
                .and_then(|v| v.trim().parse().ok())
                .filter(|c| *c > 0)
                .unwrap_or(DEFAULT_QUEUE_CAPACITY),
            work_dir,
        }
    }

    /// Re-root every derived path under `work_dir`
    ///
    /// Mostly used by tests.
    pub fn with_overrides(work_dir: impl Into<PathBuf>) -> Self {
        let work_dir = work_dir.into();
        let mut config = Self::from_lookup(|_| None);
        config.settings_path = work_dir.join("settings.json");
        config.tables_path = work_dir.join("tables.json");
        config.menu_path = work_dir.join("menu.json");
        config.spool_dir = work_dir.join("spool");
        config.work_dir = work_dir;
        config
    }

    pub fn print_timeout(&self) -> Duration {
        Duration::from_millis(self.print_timeout_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
