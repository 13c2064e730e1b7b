//! Printer Model
//!
//! Two configurable network printers and an assignment of each print
//! function (kitchen docket, payment bill) to one of them or to none.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Network printer slot
///
/// Host and port are stored as entered; they are only validated when a
/// job is routed to this printer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PrinterConfig {
    pub name: String,
    pub host: String,
    pub port: String,
}

impl PrinterConfig {
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port: port.into(),
        }
    }

    /// Parse from the legacy `"192.168.1.100:9100"` form
    pub fn from_host_port(s: &str) -> Self {
        let (host, port) = match s.rsplit_once(':') {
            Some((host, port)) => (host, port),
            None => (s, ""),
        };
        Self::new("", host.trim(), port.trim())
    }

    /// Resolved `(host, port)` if the slot is usable
    ///
    /// Returns `None` for an empty host or a port outside 1-65535.
    pub fn endpoint(&self) -> Option<(&str, u16)> {
        let host = self.host.trim();
        if host.is_empty() {
            return None;
        }
        let port: u32 = self.port.trim().parse().ok()?;
        if !(1..=65535).contains(&port) {
            return None;
        }
        Some((host, port as u16))
    }

    pub fn is_blank(&self) -> bool {
        self.host.trim().is_empty() && self.port.trim().is_empty()
    }
}

impl<'de> Deserialize<'de> for PrinterConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Legacy(String),
            Full {
                #[serde(default)]
                name: String,
                #[serde(default)]
                host: String,
                #[serde(default)]
                port: PortRepr,
            },
        }

        #[derive(Deserialize, Default)]
        #[serde(untagged)]
        enum PortRepr {
            Text(String),
            Number(i64),
            #[default]
            Missing,
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Legacy(s) => PrinterConfig::from_host_port(&s),
            Repr::Full { name, host, port } => PrinterConfig {
                name,
                host,
                port: match port {
                    PortRepr::Text(s) => s,
                    PortRepr::Number(n) => n.to_string(),
                    PortRepr::Missing => String::new(),
                },
            },
        })
    }
}

/// Printer slot a print function is routed to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SinkId {
    /// Not assigned, documents go to the fallback renderer
    #[default]
    None,
    Printer1,
    Printer2,
}

impl SinkId {
    pub fn as_key(self) -> Option<&'static str> {
        match self {
            SinkId::None => None,
            SinkId::Printer1 => Some("printer1"),
            SinkId::Printer2 => Some("printer2"),
        }
    }

    pub fn from_key(key: Option<&str>) -> Option<Self> {
        match key {
            None | Some("") | Some("none") => Some(SinkId::None),
            Some("printer1") => Some(SinkId::Printer1),
            Some("printer2") => Some(SinkId::Printer2),
            Some(_) => None,
        }
    }
}

impl std::fmt::Display for SinkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_key().unwrap_or("none"))
    }
}

impl Serialize for SinkId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_key() {
            Some(key) => serializer.serialize_str(key),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for SinkId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = Option::<String>::deserialize(deserializer)?;
        SinkId::from_key(key.as_deref()).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "unknown printer id: {}",
                key.as_deref().unwrap_or_default()
            ))
        })
    }
}

/// What a document is printed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrintFunction {
    Kitchen,
    Payment,
}

impl PrintFunction {
    pub fn as_str(self) -> &'static str {
        match self {
            PrintFunction::Kitchen => "kitchen",
            PrintFunction::Payment => "payment",
        }
    }
}

impl std::fmt::Display for PrintFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
