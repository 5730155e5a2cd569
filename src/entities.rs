//! Per-request entities: the order, the supplier catalogue and the rider
//! fleet.
//!
//! Entities live in arenas indexed by identity (order = 0, suppliers =
//! 1..=S, riders = S+1..=S+R) and refer to each other by id, never by
//! owning reference. Cluster membership, around-sets and cached distances
//! are derived during scheduler initialization and belong to exactly one
//! scheduling call.

use std::collections::BTreeMap;

/// Drop non-positive quantities; a demand or inventory only ever carries
/// amounts that can actually be picked.
fn sanitize_items(items: BTreeMap<String, f64>) -> BTreeMap<String, f64> {
    items.into_iter().filter(|(_, qty)| *qty > 0.0).collect()
}

/// The demand to be fulfilled. Always id 0.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: usize,
    pub items: BTreeMap<String, f64>,
}

impl Order {
    pub fn new(items: BTreeMap<String, f64>) -> Self {
        Order {
            id: 0,
            items: sanitize_items(items),
        }
    }
}

/// A merchant carrying a partial inventory.
///
/// A supplier doubles as a cluster record: when it is promoted to center it
/// owns the member-id list (itself included) and the rolled-up inventory of
/// the whole cluster.
#[derive(Debug, Clone)]
pub struct Supplier {
    pub id: usize,
    pub items: BTreeMap<String, f64>,
    /// Id of this supplier's cluster center; `None` until clustered.
    pub cluster_center: Option<usize>,
    pub distance_to_center: f64,
    /// Member ids, only meaningful on a center (which lists itself).
    pub cluster_members: Vec<usize>,
    /// Summed inventory of all members, only meaningful on a center.
    pub cluster_items: BTreeMap<String, f64>,
    /// Peer suppliers within the scope radius.
    pub around_suppliers: Vec<usize>,
    /// `(rider id, distance)` pairs attached by the neighbourhood pass.
    pub around_riders: Vec<(usize, f64)>,
    pub distance_to_order: f64,
}

impl Supplier {
    pub fn new(id: usize, items: BTreeMap<String, f64>) -> Self {
        Supplier {
            id,
            items: sanitize_items(items),
            cluster_center: None,
            distance_to_center: f64::INFINITY,
            cluster_members: Vec::new(),
            cluster_items: BTreeMap::new(),
            around_suppliers: Vec::new(),
            around_riders: Vec::new(),
            distance_to_order: 0.0,
        }
    }

    /// Closest attached rider; the first minimum wins on ties.
    pub fn nearest_rider(&self) -> Option<usize> {
        self.nearest_rider_entry().map(|(rider, _)| rider)
    }

    /// Distance to the closest attached rider.
    pub fn nearest_rider_distance(&self) -> Option<f64> {
        self.nearest_rider_entry().map(|(_, distance)| distance)
    }

    fn nearest_rider_entry(&self) -> Option<(usize, f64)> {
        let mut nearest: Option<(usize, f64)> = None;
        for &(rider, distance) in &self.around_riders {
            match nearest {
                None => nearest = Some((rider, distance)),
                Some((_, best)) if distance < best => nearest = Some((rider, distance)),
                _ => {}
            }
        }
        nearest
    }

    pub fn is_clustered(&self) -> bool {
        self.cluster_center.is_some()
    }

    pub fn is_cluster_center(&self) -> bool {
        self.cluster_center == Some(self.id)
    }
}

/// A deliverer. Internal id `S+1..=S+R`, external `response_id` `1..=R`.
#[derive(Debug, Clone)]
pub struct Rider {
    pub id: usize,
    pub response_id: usize,
    pub nearest_supplier: Option<usize>,
    pub distance_to_nearest_supplier: f64,
}

impl Rider {
    pub fn new(id: usize, response_id: usize) -> Self {
        Rider {
            id,
            response_id,
            nearest_supplier: None,
            distance_to_nearest_supplier: f64::INFINITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_non_positive_quantities_are_stripped() {
        let order = Order::new(items(&[("a", 1.5), ("b", 0.0), ("c", -2.0)]));
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items["a"], 1.5);

        let supplier = Supplier::new(1, items(&[("a", 0.0), ("b", 3.0)]));
        assert_eq!(supplier.items.len(), 1);
        assert_eq!(supplier.items["b"], 3.0);
    }

    #[test]
    fn test_nearest_rider_first_minimum_wins() {
        let mut supplier = Supplier::new(1, BTreeMap::new());
        assert_eq!(supplier.nearest_rider(), None);

        supplier.around_riders = vec![(4, 7.0), (5, 3.0), (6, 3.0)];
        assert_eq!(supplier.nearest_rider(), Some(5));
        assert_eq!(supplier.nearest_rider_distance(), Some(3.0));
    }

    #[test]
    fn test_cluster_center_flags() {
        let mut supplier = Supplier::new(2, BTreeMap::new());
        assert!(!supplier.is_clustered());
        supplier.cluster_center = Some(1);
        assert!(supplier.is_clustered());
        assert!(!supplier.is_cluster_center());
        supplier.cluster_center = Some(2);
        assert!(supplier.is_cluster_center());
    }
}
