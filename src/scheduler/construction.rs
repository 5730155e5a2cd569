//! Greedy construction of the initial route.
//!
//! Clusters are ranked by cluster priority, members inside each cluster by
//! supplier priority, and the flattened sequence is fed through
//! `Route::add_supplier` until the demand is covered. The route starts from
//! the nearest rider of the first ranked supplier.

use super::SchedulerState;
use crate::distance::DistanceError;
use crate::route::Route;
use ordered_float::OrderedFloat;
use std::cmp::Reverse;

impl SchedulerState {
    /// Build the initial route from the priority ranking.
    ///
    /// Re-ranks `self.clusters` and each cluster's member list in place, so
    /// the local search starts from the same ordering the route was built
    /// from.
    pub fn greedy_initialization(&mut self) -> Result<Route, DistanceError> {
        let mut ranked_clusters: Vec<(usize, f64)> = self
            .clusters
            .iter()
            .map(|&center| (center, self.cluster_priority(center)))
            .collect();
        ranked_clusters.sort_by_key(|&(_, priority)| Reverse(OrderedFloat(priority)));
        self.clusters = ranked_clusters.into_iter().map(|(center, _)| center).collect();

        for index in 0..self.clusters.len() {
            let center = self.clusters[index];
            self.sort_cluster_members(center);
        }

        let ranked = self.ranked_suppliers(&self.clusters);
        self.construct_route(&ranked)
    }

    /// Stable descending re-sort of a cluster's member list by supplier
    /// priority.
    pub(crate) fn sort_cluster_members(&mut self, center: usize) {
        let members = std::mem::take(&mut self.suppliers[center - 1].cluster_members);
        let mut keyed: Vec<(usize, f64)> = members
            .into_iter()
            .map(|sid| (sid, self.supplier_priority(sid)))
            .collect();
        keyed.sort_by_key(|&(_, priority)| Reverse(OrderedFloat(priority)));
        self.suppliers[center - 1].cluster_members =
            keyed.into_iter().map(|(sid, _)| sid).collect();
    }

    /// Flatten the current member lists cluster by cluster.
    pub(crate) fn ranked_suppliers(&self, clusters: &[usize]) -> Vec<usize> {
        let mut ranked = Vec::with_capacity(self.suppliers.len());
        for &center in clusters {
            ranked.extend_from_slice(&self.supplier(center).cluster_members);
        }
        ranked
    }

    /// Materialise and evaluate a route from a ranked supplier sequence.
    pub(crate) fn construct_route(&self, ranked: &[usize]) -> Result<Route, DistanceError> {
        let mut route = Route::new();
        if let Some(&first) = ranked.first() {
            if let Some(rider) = self.supplier(first).nearest_rider() {
                route.set_rider(rider);
            }
        }
        for &sid in ranked {
            route.add_supplier(&self.order, self.supplier(sid));
        }
        route.cost = self.evaluate_route(&route)?;
        Ok(route)
    }
}
