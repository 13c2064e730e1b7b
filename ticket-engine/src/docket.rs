//! Kitchen docket diff
//!
//! The kitchen only ever hears about additions. Lowering or removing an
//! item that was already printed produces no line.

use crate::cart::Quantities;
use crate::printing::{PrintError, PrintReport};

/// Quantities to send to the kitchen, all strictly positive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Docket {
    lines: Quantities,
}

impl Docket {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn lines(&self) -> &Quantities {
        &self.lines
    }

    pub fn get(&self, item_id: i64) -> Option<u32> {
        self.lines.get(&item_id).copied()
    }

    pub fn total_quantity(&self) -> u64 {
        self.lines.values().map(|q| u64::from(*q)).sum()
    }
}

/// `cart - snapshot`, keeping positive differences only
pub fn diff(cart: &Quantities, snapshot: &Quantities) -> Docket {
    let lines = cart
        .iter()
        .filter_map(|(id, qty)| {
            let printed = snapshot.get(id).copied().unwrap_or(0);
            let delta = qty.saturating_sub(printed);
            (delta > 0).then_some((*id, delta))
        })
        .collect();
    Docket { lines }
}

/// What happened to the kitchen docket after a save
#[derive(Debug, Clone, PartialEq)]
pub enum DocketOutcome {
    /// Cart holds nothing the kitchen has not seen
    NothingNew,
    /// Delivered to a printer or the fallback renderer
    Printed { docket: Docket, report: PrintReport },
    /// Even the fallback renderer failed; the snapshot was still advanced
    Failed { docket: Docket, error: PrintError },
}

impl DocketOutcome {
    pub fn docket(&self) -> Option<&Docket> {
        match self {
            DocketOutcome::NothingNew => None,
            DocketOutcome::Printed { docket, .. } | DocketOutcome::Failed { docket, .. } => {
                Some(docket)
            }
        }
    }
}
