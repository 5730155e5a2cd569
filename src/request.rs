//! Wire-shaped request and reply types for the scheduler.
//!
//! A `ScheduleRequest` carries the order demand, one inventory per supplier,
//! the rider count and the flat distance table. A `ScheduleReply` carries the
//! chosen rider and the per-supplier pick lists in visit order. Both sides are
//! plain serde documents so the surrounding transport stays free to move them
//! however it likes.

use crate::distance::DistanceError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;

/// Errors surfaced to the caller for malformed requests and I/O failures.
///
/// Infeasibility is never an error: it is reported as a well-formed empty
/// reply.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Distance(#[from] DistanceError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A named multiset of items with real-valued quantities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemList {
    #[serde(default)]
    pub items: BTreeMap<String, f64>,
}

/// One scheduling request: order demand, supplier inventories, rider count
/// and the flat pairwise distance table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRequest {
    /// The order's item demand.
    pub request: ItemList,
    /// Entry `k` holds supplier `k+1`'s inventory.
    #[serde(default)]
    pub itemlists: Vec<ItemList>,
    /// Number of riders `R`.
    pub num_deliverer: usize,
    /// Flat distance table laid out as documented in [`crate::distance`].
    #[serde(default)]
    pub distance: Vec<f64>,
}

/// One visited supplier in a reply, with its pick list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStop {
    pub supplier_id: usize,
    pub itemlist: ItemList,
}

/// The delivery plan sent back to the caller.
///
/// `deliverer_id` is the rider's external 1-based id and is absent when the
/// catalogue cannot satisfy the demand; an infeasible reply has no stops.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deliverer_id: Option<usize>,
    #[serde(default)]
    pub route: Vec<RouteStop>,
}

impl ScheduleReply {
    /// The reply for an unfulfillable order: no rider, no stops.
    pub fn empty() -> Self {
        ScheduleReply::default()
    }

    /// True when the reply carries no plan.
    pub fn is_empty(&self) -> bool {
        self.deliverer_id.is_none() && self.route.is_empty()
    }
}

impl ScheduleRequest {
    /// Parse a request from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScheduleError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let request: ScheduleRequest = serde_json::from_reader(reader)?;
        Ok(request)
    }

    /// Number of suppliers `S`.
    #[inline]
    pub fn num_suppliers(&self) -> usize {
        self.itemlists.len()
    }

    /// Number of riders `R`.
    #[inline]
    pub fn num_riders(&self) -> usize {
        self.num_deliverer
    }

    /// Reject structurally unusable requests before any scheduling work.
    ///
    /// The distance table length is checked by the oracle itself when the
    /// scheduler wraps it; an empty catalogue is not an error (it yields the
    /// empty reply).
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.num_deliverer == 0 {
            return Err(ScheduleError::BadRequest(
                "num_deliverer must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Summarise the request for inspection tooling.
    pub fn statistics(&self) -> RequestStatistics {
        let demand: BTreeMap<String, f64> = self
            .request
            .items
            .iter()
            .filter(|(_, &qty)| qty > 0.0)
            .map(|(item, &qty)| (item.clone(), qty))
            .collect();

        let mut coverage: BTreeMap<String, ItemCoverage> = demand
            .iter()
            .map(|(item, &qty)| {
                (
                    item.clone(),
                    ItemCoverage {
                        demanded: qty,
                        available: 0.0,
                        suppliers: 0,
                    },
                )
            })
            .collect();
        let mut catalogue_items: BTreeSet<&str> = BTreeSet::new();
        for list in &self.itemlists {
            for (item, &qty) in &list.items {
                if qty <= 0.0 {
                    continue;
                }
                catalogue_items.insert(item.as_str());
                if let Some(entry) = coverage.get_mut(item) {
                    entry.available += qty;
                    entry.suppliers += 1;
                }
            }
        }
        let fulfillable = !demand.is_empty()
            && coverage.values().all(|c| c.available >= c.demanded);

        let s = self.num_suppliers();
        let indexable = s + s * self.num_deliverer + s * s.saturating_sub(1) / 2;
        let prefix = &self.distance[..indexable.min(self.distance.len())];
        let avg_distance = if prefix.is_empty() {
            0.0
        } else {
            prefix.iter().sum::<f64>() / prefix.len() as f64
        };
        let max_distance = prefix.iter().cloned().fold(0.0, f64::max);

        RequestStatistics {
            num_suppliers: s,
            num_riders: self.num_deliverer,
            num_requested_items: demand.len(),
            total_demand: demand.values().sum(),
            num_catalogue_items: catalogue_items.len(),
            coverage,
            fulfillable,
            distance_entries: self.distance.len(),
            avg_distance,
            max_distance,
        }
    }
}

/// Aggregate availability of one requested item across the catalogue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemCoverage {
    pub demanded: f64,
    pub available: f64,
    /// Number of suppliers stocking the item.
    pub suppliers: usize,
}

/// Statistics about a request, for the `analyze` front-end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestStatistics {
    pub num_suppliers: usize,
    pub num_riders: usize,
    pub num_requested_items: usize,
    pub total_demand: f64,
    pub num_catalogue_items: usize,
    pub coverage: BTreeMap<String, ItemCoverage>,
    pub fulfillable: bool,
    pub distance_entries: usize,
    pub avg_distance: f64,
    pub max_distance: f64,
}

impl std::fmt::Display for RequestStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Request")?;
        writeln!(f, "  Suppliers: {}", self.num_suppliers)?;
        writeln!(f, "  Riders: {}", self.num_riders)?;
        writeln!(
            f,
            "  Requested items: {} (total demand {:.2})",
            self.num_requested_items, self.total_demand
        )?;
        writeln!(f, "  Catalogue items: {}", self.num_catalogue_items)?;
        for (item, c) in &self.coverage {
            writeln!(
                f,
                "    {}: demanded {:.2}, available {:.2} across {} suppliers",
                item, c.demanded, c.available, c.suppliers
            )?;
        }
        writeln!(f, "  Fulfillable: {}", self.fulfillable)?;
        writeln!(f, "  Distance entries: {}", self.distance_entries)?;
        writeln!(f, "  Avg distance: {:.2}", self.avg_distance)?;
        writeln!(f, "  Max distance: {:.2}", self.max_distance)
    }
}
