//! Greedy cover clustering of the supplier catalogue.
//!
//! Candidates are ranked by how many peers sit within scope; the best
//! connected supplier is promoted to cluster center and claims every peer
//! that is not already closer to an earlier center. Claimed peers leave the
//! candidate list whether or not they re-homed, so the loop terminates with
//! every supplier in exactly one cluster.

use super::SchedulerState;
use crate::distance::DistanceError;
use std::cmp::Reverse;

impl SchedulerState {
    /// Partition the catalogue into clusters; fills `self.clusters` with the
    /// center ids in promotion order.
    pub(crate) fn cluster_suppliers(&mut self) -> Result<(), DistanceError> {
        let mut candidates: Vec<usize> = (1..=self.suppliers.len()).collect();
        candidates.sort_by_key(|&sid| Reverse(self.supplier(sid).around_suppliers.len()));

        while !candidates.is_empty() {
            let center = candidates.remove(0);
            self.promote_center(center);
            self.clusters.push(center);

            let around = self.supplier(center).around_suppliers.clone();
            for &sid in &around {
                let distance = self.distances.get(sid, center)?;
                self.update_cluster_if_closer(sid, center, distance);
                candidates.retain(|&candidate| candidate != sid);
            }
        }
        Ok(())
    }

    /// Make a supplier the center of its own fresh cluster.
    fn promote_center(&mut self, sid: usize) {
        let supplier = &mut self.suppliers[sid - 1];
        supplier.cluster_center = Some(sid);
        supplier.distance_to_center = 0.0;
        supplier.cluster_members = vec![sid];
        supplier.cluster_items = supplier.items.clone();
    }

    /// Re-home a supplier to `center` iff it is strictly closer than its
    /// current center. Membership and the rolled-up cluster inventory move
    /// with it.
    fn update_cluster_if_closer(&mut self, sid: usize, center: usize, distance: f64) {
        if self.supplier(sid).distance_to_center <= distance {
            return;
        }
        let items = self.supplier(sid).items.clone();

        if let Some(old_center) = self.supplier(sid).cluster_center {
            let old = &mut self.suppliers[old_center - 1];
            old.cluster_members.retain(|&member| member != sid);
            for (item, qty) in &items {
                if let Some(total) = old.cluster_items.get_mut(item) {
                    *total -= qty;
                }
            }
        }

        let supplier = &mut self.suppliers[sid - 1];
        supplier.cluster_center = Some(center);
        supplier.distance_to_center = distance;

        let new = &mut self.suppliers[center - 1];
        new.cluster_members.push(sid);
        for (item, qty) in items {
            *new.cluster_items.entry(item).or_insert(0.0) += qty;
        }
    }
}
