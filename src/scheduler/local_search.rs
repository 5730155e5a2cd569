//! Stochastic neighbourhood search over the cluster ordering.
//!
//! Each iteration proposes a mutated copy of the cluster order (swap two
//! cluster positions) or reorders one cluster's members in place (re-sort by
//! priority or uniform shuffle), rebuilds a route from scratch and keeps the
//! proposal only on strict cost improvement. Member reorderings survive
//! rejected iterations on purpose: the next proposal starts from the mutated
//! member lists, which widens the explored neighbourhood.

use super::SchedulerState;
use crate::distance::DistanceError;
use rand::seq::SliceRandom;
use rand::Rng;

impl SchedulerState {
    /// Fixed-budget improvement loop over `self.best_route`.
    pub fn local_search(&mut self, max_iteration: usize) -> Result<(), DistanceError> {
        for iteration in 0..max_iteration {
            let clusters = self.propose_cluster_order();
            let ranked = self.ranked_suppliers(&clusters);
            let route = self.construct_route(&ranked)?;
            if route.cost < self.best_route.cost {
                log::debug!(
                    "iteration {}: cost {:.2} -> {:.2}",
                    iteration,
                    self.best_route.cost,
                    route.cost
                );
                self.best_route = route;
                self.clusters = clusters;
            }
        }
        Ok(())
    }

    /// One neighbourhood move.
    ///
    /// With `k` the number of clusters contributing to the incumbent route:
    /// half the time two cluster positions are swapped in a copy of the
    /// order (the first drawn from the contributing prefix, the second from
    /// either the prefix or the tail), otherwise one contributing cluster's
    /// member list is re-sorted by priority (p = 0.1) or shuffled (p = 0.9).
    fn propose_cluster_order(&mut self) -> Vec<usize> {
        let mut clusters = self.clusters.clone();
        let k = self.best_route.num_supplier_each_cluster.len();
        if k == 0 || clusters.is_empty() {
            return clusters;
        }

        if self.rng.gen_bool(0.5) {
            let first = clusters[self.rng.gen_range(0..k)];
            let second = if self.rng.gen_bool(0.5) {
                clusters[self.rng.gen_range(0..k)]
            } else {
                clusters[self.rng.gen_range(k - 1..clusters.len())]
            };
            let i = clusters.iter().position(|&c| c == first);
            let j = clusters.iter().position(|&c| c == second);
            if let (Some(i), Some(j)) = (i, j) {
                clusters.swap(i, j);
            }
        } else {
            let center = clusters[self.rng.gen_range(0..k)];
            if self.rng.gen_bool(0.1) {
                self.sort_cluster_members(center);
            } else {
                let mut members = std::mem::take(&mut self.suppliers[center - 1].cluster_members);
                members.shuffle(&mut self.rng);
                self.suppliers[center - 1].cluster_members = members;
            }
        }
        clusters
    }
}
