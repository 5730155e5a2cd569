//! Distance oracle over the flattened pairwise table carried by a request.
//!
//! The table covers the order point (id 0), suppliers (1..=S) and riders
//! (S+1..=S+R). Only the upper triangle is transmitted: the first S entries
//! are order-to-supplier distances, then each supplier row holds the
//! distances to every higher-indexed supplier or rider. Order-to-rider
//! distances are never indexed.

use thiserror::Error;

/// Usage errors of the distance table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DistanceError {
    /// An id outside `0..=S+R`.
    #[error("id {0} is out of range for this distance table")]
    InvalidId(usize),
    /// A pair the flat layout has no entry for (order-to-rider, rider-to-rider).
    #[error("no distance is defined between ids {0} and {1}")]
    InvalidPair(usize, usize),
    /// The flat table is shorter than the layout requires.
    #[error("distance table holds {got} entries but the layout needs {need}")]
    Truncated { got: usize, need: usize },
}

/// Constant-time lookup over the flat upper-triangular distance table.
#[derive(Debug, Clone)]
pub struct DistanceTable {
    entries: Vec<f64>,
    /// Number of suppliers (`n`).
    num_suppliers: usize,
    /// Number of suppliers plus riders (`m`).
    num_units: usize,
}

impl DistanceTable {
    /// Wrap a flat table for `num_suppliers` suppliers and `num_riders` riders.
    ///
    /// The table must hold at least `S + S*R + S*(S-1)/2` entries; surplus
    /// entries are tolerated and never indexed.
    pub fn new(
        entries: Vec<f64>,
        num_suppliers: usize,
        num_riders: usize,
    ) -> Result<Self, DistanceError> {
        let need = num_suppliers
            + num_suppliers * num_riders
            + num_suppliers * num_suppliers.saturating_sub(1) / 2;
        if entries.len() < need {
            return Err(DistanceError::Truncated {
                got: entries.len(),
                need,
            });
        }
        Ok(DistanceTable {
            entries,
            num_suppliers,
            num_units: num_suppliers + num_riders,
        })
    }

    /// Number of suppliers covered by the table.
    #[inline]
    pub fn num_suppliers(&self) -> usize {
        self.num_suppliers
    }

    /// Highest valid unit id (`S + R`).
    #[inline]
    pub fn num_units(&self) -> usize {
        self.num_units
    }

    /// Distance between two unit ids. Symmetric; zero on the diagonal.
    pub fn get(&self, id1: usize, id2: usize) -> Result<f64, DistanceError> {
        let (i, j) = if id1 > id2 { (id2, id1) } else { (id1, id2) };
        if j > self.num_units {
            return Err(DistanceError::InvalidId(j));
        }
        if i == j {
            return Ok(0.0);
        }
        if i == 0 {
            if j > self.num_suppliers {
                return Err(DistanceError::InvalidPair(id1, id2));
            }
            return Ok(self.entries[j - 1]);
        }
        if i > self.num_suppliers {
            // Both ids are riders; the layout carries no such entry.
            return Err(DistanceError::InvalidPair(id1, id2));
        }
        let n = self.num_suppliers;
        let m = self.num_units;
        let series = i - 1;
        let index = n + series * (m - 1) - series * series.saturating_sub(1) / 2 + (j - i - 1);
        Ok(self.entries[index])
    }
}
