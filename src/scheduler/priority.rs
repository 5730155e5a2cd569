//! Priority heuristic over proximity, local density and inventory coverage.
//!
//! The score starts from the (negated) distances to the order point and the
//! nearest rider, gets a prosperity bonus for sparsely connected suppliers
//! and is scaled by how much of the demanded assortment the inventory
//! covers. Higher is better; all ranking sorts are stable and descending.

use super::SchedulerState;
use std::collections::BTreeMap;

/// Weight of the prosperity and coverage bonuses.
const PRIORITY_ALPHA: f64 = 0.1;

impl SchedulerState {
    /// Priority of a single supplier against the order demand.
    pub fn supplier_priority(&self, sid: usize) -> f64 {
        self.priority_over_items(sid, &self.supplier(sid).items)
    }

    /// Priority of the cluster a supplier belongs to.
    ///
    /// A center is scored like a supplier whose inventory is the whole
    /// cluster's rolled-up stock; a member delegates to its center. An
    /// unclustered supplier falls back to its own priority.
    pub fn cluster_priority(&self, sid: usize) -> f64 {
        match self.supplier(sid).cluster_center {
            Some(center) if center == sid => {
                self.priority_over_items(center, &self.supplier(center).cluster_items)
            }
            Some(center) => self.cluster_priority(center),
            None => self.supplier_priority(sid),
        }
    }

    fn priority_over_items(&self, sid: usize, items: &BTreeMap<String, f64>) -> f64 {
        let supplier = self.supplier(sid);
        let rider_distance = supplier.nearest_rider_distance().unwrap_or(0.0);
        let around_riders = supplier.around_riders.len() as f64;
        let around_suppliers = supplier.around_suppliers.len() as f64;

        let mut priority = -supplier.distance_to_order - rider_distance;
        priority *= 1.0 + PRIORITY_ALPHA * (-around_riders - around_suppliers).exp();

        let coverage: f64 = self
            .order
            .items
            .keys()
            .filter_map(|item| items.get(item))
            .map(|&qty| 1.0 + PRIORITY_ALPHA * (-qty).exp())
            .sum();
        priority * coverage
    }
}
