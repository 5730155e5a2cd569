//! The delivery plan under construction: one rider, an ordered supplier
//! sequence and the per-supplier pick lists.

use crate::entities::{Order, Supplier};
use std::collections::BTreeMap;

/// A route ties a rider to a supplier visit sequence.
///
/// `total_items` is an optimistic counter: adding a supplier credits its
/// full stock of every demanded item, even the share the pick list clamps
/// away. Feasibility is judged against this counter, so "enough" means
/// "enough if everything counted so far were taken". The pick lists in
/// `items_for_each_supplier` are the clamped amounts actually carried.
#[derive(Debug, Clone)]
pub struct Route {
    /// Internal id of the assigned rider.
    pub rider: Option<usize>,
    /// Visited supplier ids in visit order.
    pub suppliers: Vec<usize>,
    /// Optimistic cumulative stock per demanded item.
    pub total_items: BTreeMap<String, f64>,
    /// Pick list per visited supplier id.
    pub items_for_each_supplier: BTreeMap<usize, BTreeMap<String, f64>>,
    /// How many chosen suppliers each cluster center contributed.
    pub num_supplier_each_cluster: BTreeMap<usize, usize>,
    pub cost: f64,
}

impl Route {
    pub fn new() -> Self {
        Route {
            rider: None,
            suppliers: Vec::new(),
            total_items: BTreeMap::new(),
            items_for_each_supplier: BTreeMap::new(),
            num_supplier_each_cluster: BTreeMap::new(),
            cost: f64::INFINITY,
        }
    }

    pub fn set_rider(&mut self, rider: usize) {
        self.rider = Some(rider);
    }

    /// Try to append a supplier.
    ///
    /// Rejected outright when the route is already feasible. Otherwise each
    /// demanded item contributes the clamped amount the supplier can still
    /// usefully deliver, while `total_items` is credited with the full
    /// stock. A supplier whose clamped contributions sum to zero is not
    /// appended; the optimistic credit is not rolled back in that case.
    pub fn add_supplier(&mut self, order: &Order, supplier: &Supplier) -> bool {
        if self.is_enough_suppliers(order) {
            return false;
        }
        let mut itemlist = BTreeMap::new();
        for (item, &wanted) in &order.items {
            let total = self.total_items.entry(item.clone()).or_insert(0.0);
            let stock = supplier.items.get(item).copied().unwrap_or(0.0);
            let picked = if *total > wanted {
                0.0
            } else if *total + stock > wanted {
                wanted - *total
            } else {
                stock
            };
            itemlist.insert(item.clone(), picked);
            *total += stock;
        }
        if itemlist.values().sum::<f64>() > 0.0 {
            self.items_for_each_supplier.insert(supplier.id, itemlist);
            self.suppliers.push(supplier.id);
            if let Some(center) = supplier.cluster_center {
                *self.num_supplier_each_cluster.entry(center).or_insert(0) += 1;
            }
            true
        } else {
            false
        }
    }

    /// True when the optimistic counter covers every demanded item.
    pub fn is_enough_suppliers(&self, order: &Order) -> bool {
        order.items.iter().all(|(item, &wanted)| {
            self.total_items.get(item).copied().unwrap_or(0.0) >= wanted
        })
    }

    pub fn num_suppliers(&self) -> usize {
        self.suppliers.len()
    }
}

impl Default for Route {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Route")?;
        match self.rider {
            Some(rider) => writeln!(f, "  Rider: {}", rider)?,
            None => writeln!(f, "  Rider: none")?,
        }
        writeln!(f, "  Cost: {:.2}", self.cost)?;
        writeln!(f, "  Suppliers: {:?}", self.suppliers)
    }
}
