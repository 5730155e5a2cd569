//! The route scheduler.
//!
//! One scheduling call flows through `initialize → cluster →
//! greedy-construct → local-search → encode-reply`. [`RouteScheduler`] holds
//! the tuning knobs and drives a fresh [`SchedulerState`] per request; the
//! state owns the entity arenas, the distance table, the cluster list and
//! the best route found so far. Everything is single-threaded and request
//! scoped, so concurrent callers each construct their own scheduler.

mod clustering;
mod construction;
mod local_search;
mod priority;

use crate::distance::{DistanceError, DistanceTable};
use crate::entities::{Order, Rider, Supplier};
use crate::request::{ItemList, RouteStop, ScheduleError, ScheduleReply, ScheduleRequest};
use crate::route::Route;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Default scope radius for the around-supplier and around-rider relations.
pub const DEFAULT_AROUND_SCOPE: f64 = 100.0;
/// Default local search budget.
pub const DEFAULT_MAX_ITERATION: usize = 100;

/// Scheduler configuration: scope radius, local search budget and PRNG seed.
#[derive(Debug, Clone)]
pub struct RouteScheduler {
    pub around_scope: f64,
    pub max_iteration: usize,
    pub seed: u64,
}

impl RouteScheduler {
    pub fn new() -> Self {
        RouteScheduler {
            around_scope: DEFAULT_AROUND_SCOPE,
            max_iteration: DEFAULT_MAX_ITERATION,
            seed: 0,
        }
    }

    pub fn with_params(around_scope: f64, max_iteration: usize, seed: u64) -> Self {
        RouteScheduler {
            around_scope,
            max_iteration,
            seed,
        }
    }

    /// Produce a delivery plan for one request.
    ///
    /// Malformed requests fail with [`ScheduleError`]; an unfulfillable
    /// demand yields the well-formed empty reply instead.
    pub fn schedule(&self, request: &ScheduleRequest) -> Result<ScheduleReply, ScheduleError> {
        request.validate()?;
        let rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut state = SchedulerState::initialize(request, self.around_scope, rng)?;

        if state.suppliers.is_empty() || state.order.items.is_empty() {
            return Ok(ScheduleReply::empty());
        }

        let initial = state.greedy_initialization()?;
        if !initial.is_enough_suppliers(&state.order) {
            log::debug!("catalogue cannot satisfy the demand, returning empty reply");
            return Ok(ScheduleReply::empty());
        }
        log::debug!("greedy route cost {:.2}", initial.cost);
        state.best_route = initial;

        state.local_search(self.max_iteration)?;
        log::debug!("best route cost {:.2}", state.best_route.cost);

        Ok(state.encode_reply(&state.best_route))
    }
}

impl Default for RouteScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// All state of one scheduling call: entity arenas, distance table, cluster
/// list and the incumbent route.
#[derive(Debug)]
pub struct SchedulerState {
    pub order: Order,
    /// Supplier arena, indexed by `id - 1`.
    pub suppliers: Vec<Supplier>,
    /// Rider arena, indexed by `id - S - 1`.
    pub riders: Vec<Rider>,
    pub distances: DistanceTable,
    /// Cluster center ids in promotion order (re-ranked by the constructor).
    pub clusters: Vec<usize>,
    pub best_route: Route,
    pub rng: ChaCha8Rng,
}

impl SchedulerState {
    /// Build the arenas, the neighbourhood relations and the clustering for
    /// one request.
    pub fn initialize(
        request: &ScheduleRequest,
        around_scope: f64,
        rng: ChaCha8Rng,
    ) -> Result<Self, ScheduleError> {
        let order = Order::new(request.request.items.clone());
        let mut suppliers: Vec<Supplier> = request
            .itemlists
            .iter()
            .enumerate()
            .map(|(index, list)| Supplier::new(index + 1, list.items.clone()))
            .collect();
        let num_suppliers = suppliers.len();
        let num_riders = request.num_deliverer;
        let mut riders: Vec<Rider> = (0..num_riders)
            .map(|index| Rider::new(num_suppliers + index + 1, index + 1))
            .collect();
        let distances = DistanceTable::new(request.distance.clone(), num_suppliers, num_riders)?;

        // Around-supplier relations and cached order distances, in ascending
        // id order so downstream tie-breaks stay deterministic.
        for a in 1..=num_suppliers {
            suppliers[a - 1].distance_to_order = distances.get(a, 0)?;
            for b in 1..=num_suppliers {
                if a == b {
                    continue;
                }
                if distances.get(a, b)? <= around_scope {
                    suppliers[a - 1].around_suppliers.push(b);
                }
            }
        }

        // Each rider attaches to its nearest supplier (first minimum wins).
        for rider in riders.iter_mut() {
            let mut nearest: Option<(usize, f64)> = None;
            for s in 1..=num_suppliers {
                let distance = distances.get(rider.id, s)?;
                match nearest {
                    None => nearest = Some((s, distance)),
                    Some((_, best)) if distance < best => nearest = Some((s, distance)),
                    _ => {}
                }
            }
            if let Some((s, distance)) = nearest {
                rider.nearest_supplier = Some(s);
                rider.distance_to_nearest_supplier = distance;
                suppliers[s - 1].around_riders.push((rider.id, distance));
            }
        }

        // A supplier no rider attached to still needs a rider to start its
        // route from: give it the globally nearest one. The `<=` keeps the
        // last tied rider, unlike the strict scan above.
        for s in 1..=num_suppliers {
            if !suppliers[s - 1].around_riders.is_empty() {
                continue;
            }
            let mut nearest: Option<(usize, f64)> = None;
            for rider in &riders {
                let distance = distances.get(s, rider.id)?;
                match nearest {
                    None => nearest = Some((rider.id, distance)),
                    Some((_, best)) if distance <= best => nearest = Some((rider.id, distance)),
                    _ => {}
                }
            }
            if let Some((rider_id, distance)) = nearest {
                suppliers[s - 1].around_riders.push((rider_id, distance));
            }
        }

        let mut state = SchedulerState {
            order,
            suppliers,
            riders,
            distances,
            clusters: Vec::new(),
            best_route: Route::new(),
            rng,
        };
        state.cluster_suppliers()?;
        Ok(state)
    }

    #[inline]
    pub fn supplier(&self, id: usize) -> &Supplier {
        &self.suppliers[id - 1]
    }

    #[inline]
    pub fn rider(&self, id: usize) -> &Rider {
        &self.riders[id - self.suppliers.len() - 1]
    }

    /// Travel cost of a route: rider to first supplier, supplier to
    /// supplier, last supplier to the order point. An empty route costs
    /// infinity.
    pub fn evaluate_route(&self, route: &Route) -> Result<f64, DistanceError> {
        let (first, rider) = match (route.suppliers.first(), route.rider) {
            (Some(&first), Some(rider)) => (first, rider),
            _ => return Ok(f64::INFINITY),
        };
        let mut total = self.distances.get(rider, first)?;
        for pair in route.suppliers.windows(2) {
            total += self.distances.get(pair[0], pair[1])?;
        }
        let last = route.suppliers[route.suppliers.len() - 1];
        total += self.distances.get(last, self.order.id)?;
        Ok(total)
    }

    /// Emit the canonical reply for a route: the rider's external id and one
    /// stop per visited supplier, in visit order.
    pub fn encode_reply(&self, route: &Route) -> ScheduleReply {
        let deliverer_id = route.rider.map(|rider| self.rider(rider).response_id);
        let stops = route
            .suppliers
            .iter()
            .map(|&sid| RouteStop {
                supplier_id: sid,
                itemlist: ItemList {
                    items: route
                        .items_for_each_supplier
                        .get(&sid)
                        .cloned()
                        .unwrap_or_default(),
                },
            })
            .collect();
        ScheduleReply {
            deliverer_id,
            route: stops,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn items(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn single_supplier_request(demand: f64) -> ScheduleRequest {
        ScheduleRequest {
            request: ItemList {
                items: items(&[("a", demand)]),
            },
            itemlists: vec![ItemList {
                items: items(&[("a", 2.0)]),
            }],
            num_deliverer: 1,
            distance: vec![3.0, 5.0, 5.0],
        }
    }

    #[test]
    fn test_single_supplier_feasible() {
        let request = single_supplier_request(1.0);
        let reply = RouteScheduler::new().schedule(&request).unwrap();

        assert_eq!(reply.deliverer_id, Some(1));
        assert_eq!(reply.route.len(), 1);
        assert_eq!(reply.route[0].supplier_id, 1);
        assert_eq!(reply.route[0].itemlist.items["a"], 1.0);
    }

    #[test]
    fn test_single_supplier_cost() {
        let request = single_supplier_request(1.0);
        let mut state = SchedulerState::initialize(
            &request,
            DEFAULT_AROUND_SCOPE,
            ChaCha8Rng::seed_from_u64(0),
        )
        .unwrap();
        let route = state.greedy_initialization().unwrap();

        // rider -> supplier -> order: 5 + 3
        assert_eq!(route.cost, 8.0);
        assert_eq!(state.evaluate_route(&route).unwrap(), route.cost);
    }

    #[test]
    fn test_infeasible_demand_yields_empty_reply() {
        let request = single_supplier_request(3.0);
        let reply = RouteScheduler::new().schedule(&request).unwrap();

        assert!(reply.is_empty());
        assert_eq!(reply.deliverer_id, None);
        assert!(reply.route.is_empty());
    }

    #[test]
    fn test_demand_split_across_two_suppliers() {
        let request = ScheduleRequest {
            request: ItemList {
                items: items(&[("a", 3.0)]),
            },
            itemlists: vec![
                ItemList {
                    items: items(&[("a", 2.0)]),
                },
                ItemList {
                    items: items(&[("a", 5.0)]),
                },
            ],
            num_deliverer: 1,
            distance: vec![3.0, 10.0, 2.0, 4.0, 50.0],
        };
        let reply = RouteScheduler::new().schedule(&request).unwrap();

        assert_eq!(reply.route.len(), 2);
        let picked: f64 = reply
            .route
            .iter()
            .map(|stop| stop.itemlist.items.get("a").copied().unwrap_or(0.0))
            .sum();
        assert_eq!(picked, 3.0);
        for stop in &reply.route {
            let stock = request.itemlists[stop.supplier_id - 1]
                .items
                .get("a")
                .copied()
                .unwrap_or(0.0);
            assert!(stop.itemlist.items["a"] <= stock);
        }
        // The first-picked supplier contributes everything it can.
        assert_eq!(reply.route[0].supplier_id, 1);
        assert_eq!(reply.route[0].itemlist.items["a"], 2.0);
    }

    #[test]
    fn test_multi_item_order_visits_both_suppliers() {
        let request = ScheduleRequest {
            request: ItemList {
                items: items(&[("a", 1.0), ("b", 1.0)]),
            },
            itemlists: vec![
                ItemList {
                    items: items(&[("a", 1.0)]),
                },
                ItemList {
                    items: items(&[("b", 1.0)]),
                },
            ],
            num_deliverer: 1,
            distance: vec![5.0, 6.0, 3.0, 4.0, 7.0],
        };
        let reply = RouteScheduler::new().schedule(&request).unwrap();

        assert_eq!(reply.deliverer_id, Some(1));
        assert_eq!(reply.route.len(), 2);
        let by_supplier: BTreeMap<usize, &RouteStop> = reply
            .route
            .iter()
            .map(|stop| (stop.supplier_id, stop))
            .collect();
        assert_eq!(by_supplier[&1].itemlist.items["a"], 1.0);
        assert_eq!(by_supplier[&2].itemlist.items["b"], 1.0);
    }

    #[test]
    fn test_fulfilled_exactly_per_item() {
        let request = ScheduleRequest {
            request: ItemList {
                items: items(&[("a", 4.0), ("b", 2.0)]),
            },
            itemlists: vec![
                ItemList {
                    items: items(&[("a", 3.0), ("b", 1.0)]),
                },
                ItemList {
                    items: items(&[("a", 3.0), ("b", 3.0)]),
                },
            ],
            num_deliverer: 1,
            distance: vec![5.0, 6.0, 3.0, 4.0, 7.0],
        };
        let reply = RouteScheduler::new().schedule(&request).unwrap();
        assert!(!reply.is_empty());

        for item in ["a", "b"] {
            let picked: f64 = reply
                .route
                .iter()
                .map(|stop| stop.itemlist.items.get(item).copied().unwrap_or(0.0))
                .sum();
            assert_eq!(picked, request.request.items[item]);
        }
    }

    #[test]
    fn test_local_search_recovers_better_visit_order() {
        // Rider next to supplier 2, order point next to supplier 1; greedy
        // ranks supplier 1 first and pays 510, the swapped order pays 165.
        let request = ScheduleRequest {
            request: ItemList {
                items: items(&[("a", 1.0), ("b", 1.0)]),
            },
            itemlists: vec![
                ItemList {
                    items: items(&[("a", 1.0)]),
                },
                ItemList {
                    items: items(&[("b", 1.0)]),
                },
            ],
            num_deliverer: 1,
            distance: vec![5.0, 200.0, 150.0, 160.0, 10.0],
        };
        let reply = RouteScheduler::new().schedule(&request).unwrap();

        let visited: Vec<usize> = reply.route.iter().map(|stop| stop.supplier_id).collect();
        assert_eq!(visited, vec![2, 1]);
        assert_eq!(reply.deliverer_id, Some(1));
    }

    #[test]
    fn test_deterministic_under_fixed_seed() {
        let request = ScheduleRequest {
            request: ItemList {
                items: items(&[("a", 2.0), ("b", 1.0)]),
            },
            itemlists: vec![
                ItemList {
                    items: items(&[("a", 1.0), ("b", 1.0)]),
                },
                ItemList {
                    items: items(&[("a", 1.0)]),
                },
                ItemList {
                    items: items(&[("a", 2.0), ("b", 2.0)]),
                },
            ],
            num_deliverer: 2,
            // S = 3, R = 2 (m = 5): order row, then 4 + 3 + 2 entries.
            distance: vec![
                7.0, 12.0, 9.0, // order row
                5.0, 30.0, 8.0, 21.0, // supplier 1 row
                28.0, 17.0, 6.0, // supplier 2 row
                11.0, 16.0, // supplier 3 row
            ],
        };
        let scheduler = RouteScheduler::with_params(100.0, 100, 42);
        let first = scheduler.schedule(&request).unwrap();
        let second = scheduler.schedule(&request).unwrap();

        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn test_rider_with_smallest_distance_is_chosen() {
        // One supplier, two riders at 9 and 5; the closer rider's external
        // id is 2.
        let request = ScheduleRequest {
            request: ItemList {
                items: items(&[("a", 1.0)]),
            },
            itemlists: vec![ItemList {
                items: items(&[("a", 1.0)]),
            }],
            num_deliverer: 2,
            distance: vec![3.0, 9.0, 5.0],
        };
        let reply = RouteScheduler::new().schedule(&request).unwrap();

        assert_eq!(reply.deliverer_id, Some(2));
    }

    #[test]
    fn test_empty_catalogue_yields_empty_reply() {
        let request = ScheduleRequest {
            request: ItemList {
                items: items(&[("a", 1.0)]),
            },
            itemlists: vec![],
            num_deliverer: 1,
            distance: vec![],
        };
        let reply = RouteScheduler::new().schedule(&request).unwrap();
        assert!(reply.is_empty());
    }

    #[test]
    fn test_empty_demand_yields_empty_reply() {
        let request = ScheduleRequest {
            request: ItemList {
                items: items(&[("a", 0.0), ("b", -1.0)]),
            },
            itemlists: vec![ItemList {
                items: items(&[("a", 2.0)]),
            }],
            num_deliverer: 1,
            distance: vec![3.0, 5.0],
        };
        let reply = RouteScheduler::new().schedule(&request).unwrap();
        assert!(reply.is_empty());
    }

    #[test]
    fn test_truncated_distance_table_is_an_error() {
        let mut request = single_supplier_request(1.0);
        request.distance = vec![3.0];
        let result = RouteScheduler::new().schedule(&request);
        assert!(matches!(result, Err(ScheduleError::Distance(_))));
    }

    #[test]
    fn test_zero_riders_is_an_error() {
        let mut request = single_supplier_request(1.0);
        request.num_deliverer = 0;
        let result = RouteScheduler::new().schedule(&request);
        assert!(matches!(result, Err(ScheduleError::BadRequest(_))));
    }
}
