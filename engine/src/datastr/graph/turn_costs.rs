//! Turn costs and turn restrictions between pairs of edges at a node.

use super::*;
use crate::error::{Error, Result};
use crate::io::*;
use crate::util::is_valid_cost;
use std::collections::HashMap;

/// Read-only lookup of the cost of turning from one edge onto another at a via node.
/// Costs are in seconds, `INFINITY` marks a turn restriction.
/// Turns without an entry are free.
#[derive(Debug, Clone, Default)]
pub struct TurnCostTable {
    costs: HashMap<(EdgeId, NodeId, EdgeId), Weight>,
}

impl TurnCostTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cost for turning from `from_edge` onto `to_edge` at `via`.
    pub fn set(&mut self, from_edge: EdgeId, via: NodeId, to_edge: EdgeId, cost: Weight) -> Result<()> {
        if !is_valid_cost(cost) {
            return Err(Error::InvalidWeighting(format!(
                "turn cost {} for {} -> {} -> {} is negative or NaN",
                cost, from_edge, via, to_edge
            )));
        }
        self.costs.insert((from_edge, via, to_edge), cost);
        Ok(())
    }

    /// Forbid turning from `from_edge` onto `to_edge` at `via`.
    pub fn add_restriction(&mut self, from_edge: EdgeId, via: NodeId, to_edge: EdgeId) {
        self.costs.insert((from_edge, via, to_edge), INFINITY);
    }

    #[inline]
    pub fn turn_cost(&self, from_edge: EdgeId, via: NodeId, to_edge: EdgeId) -> Weight {
        self.costs.get(&(from_edge, via, to_edge)).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.costs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }
}

impl Deconstruct for TurnCostTable {
    fn store_each(&self, store: &dyn Fn(&str, &dyn Store) -> std::io::Result<()>) -> std::io::Result<()> {
        let mut entries: Vec<_> = self.costs.iter().map(|(&key, &cost)| (key, cost)).collect();
        entries.sort_by_key(|&(key, _)| key);

        store("turn_from", &entries.iter().map(|&((from, _, _), _)| from).collect::<Vec<EdgeId>>())?;
        store("turn_via", &entries.iter().map(|&((_, via, _), _)| via).collect::<Vec<NodeId>>())?;
        store("turn_to", &entries.iter().map(|&((_, _, to), _)| to).collect::<Vec<EdgeId>>())?;
        store("turn_cost", &entries.iter().map(|&(_, cost)| cost).collect::<Vec<Weight>>())?;
        Ok(())
    }
}

impl Reconstruct for TurnCostTable {
    fn reconstruct_with(loader: Loader) -> std::io::Result<Self> {
        let from: Vec<EdgeId> = loader.load("turn_from")?;
        let via: Vec<NodeId> = loader.load("turn_via")?;
        let to: Vec<EdgeId> = loader.load("turn_to")?;
        let cost: Vec<Weight> = loader.load("turn_cost")?;

        if via.len() != from.len() || to.len() != from.len() || cost.len() != from.len() {
            return Err(invalid_data("turn cost files differ in length".to_string()));
        }

        let mut table = TurnCostTable::new();
        for i in 0..from.len() {
            table.set(from[i], via[i], to[i], cost[i]).map_err(|e| invalid_data(e.to_string()))?;
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_defaults_to_free_turns() {
        let mut table = TurnCostTable::new();
        table.set(0, 1, 2, 5.0).unwrap();
        table.add_restriction(2, 1, 0);

        assert_eq!(table.turn_cost(0, 1, 2), 5.0);
        assert_eq!(table.turn_cost(2, 1, 0), INFINITY);
        assert_eq!(table.turn_cost(0, 2, 2), 0.0);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn invalid_costs_are_rejected() {
        let mut table = TurnCostTable::new();
        assert!(table.set(0, 1, 2, -1.0).is_err());
        assert!(table.set(0, 1, 2, f64::NAN).is_err());
        assert!(table.is_empty());
    }
}
