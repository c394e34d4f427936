//! Contraction Hierarchies, node based and turn aware.
//!
//! Preparation contracts the nodes of a directed graph one after another, inserting shortcuts
//! where a contracted node was part of a shortest path. Queries then only ever need to go upward in
//! the resulting hierarchy. For the turn aware variant the same contraction runs on the line graph,
//! where every directed road edge is a node and every allowed turn an arc.

use super::*;
use crate::datastr::node_order::NodeOrder;
use crate::io::*;

mod preparation;
pub mod query;
mod witness_search;

pub use self::preparation::PrepareContractionHierarchies;
pub use self::query::Server as ContractionHierarchyQuery;

/// Index into the arcs of a hierarchy
pub type ArcId = u32;

const NO_ARC: ArcId = std::u32::MAX;

// Default preparation parameters. Can be overwritten through env vars at build time.
#[cfg(not(override_ch_periodic_updates))]
pub const PERIODIC_UPDATES: u32 = 20;
#[cfg(override_ch_periodic_updates)]
pub const PERIODIC_UPDATES: u32 = include!(concat!(env!("OUT_DIR"), "/CH_PERIODIC_UPDATES"));

#[cfg(not(override_ch_lazy_updates))]
pub const LAZY_UPDATES: u32 = 10;
#[cfg(override_ch_lazy_updates)]
pub const LAZY_UPDATES: u32 = include!(concat!(env!("OUT_DIR"), "/CH_LAZY_UPDATES"));

#[cfg(not(override_ch_neighbor_updates))]
pub const NEIGHBOR_UPDATES: u32 = 100;
#[cfg(override_ch_neighbor_updates)]
pub const NEIGHBOR_UPDATES: u32 = include!(concat!(env!("OUT_DIR"), "/CH_NEIGHBOR_UPDATES"));

#[cfg(not(override_ch_contracted_nodes))]
pub const CONTRACTED_NODES: u32 = 100;
#[cfg(override_ch_contracted_nodes)]
pub const CONTRACTED_NODES: u32 = include!(concat!(env!("OUT_DIR"), "/CH_CONTRACTED_NODES"));

/// Tuning knobs of the preparation. Percentages are in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrepareParams {
    /// Recompute all priorities each time this share of nodes was contracted. 0 disables it.
    pub periodic_updates: u32,
    /// Recompute the priority of popped nodes during the last share of the contraction.
    pub lazy_updates: u32,
    /// Share of the neighbors of a contracted node whose priority is recomputed.
    pub neighbor_updates: u32,
    /// Share of the nodes to contract. The remaining nodes form the core.
    pub contracted_nodes: u32,
    /// Witness search budget, relative to the mean degree, when estimating priorities.
    pub max_poll_factor_heuristic: f64,
    /// Witness search budget, relative to the mean degree, when contracting.
    pub max_poll_factor_contraction: f64,
    pub edge_difference_weight: f64,
    pub original_edges_count_weight: f64,
    pub depth_weight: f64,
    /// Seed for choosing the neighbors to update.
    pub seed: u64,
}

impl Default for PrepareParams {
    fn default() -> Self {
        PrepareParams {
            periodic_updates: PERIODIC_UPDATES,
            lazy_updates: LAZY_UPDATES,
            neighbor_updates: NEIGHBOR_UPDATES,
            contracted_nodes: CONTRACTED_NODES,
            max_poll_factor_heuristic: 5.0,
            max_poll_factor_contraction: 200.0,
            edge_difference_weight: 10.0,
            original_edges_count_weight: 1.0,
            depth_weight: 1.0,
            seed: 456,
        }
    }
}

impl PrepareParams {
    pub fn periodic_updates(mut self, percent: u32) -> Self {
        self.periodic_updates = percent.min(100);
        self
    }

    pub fn lazy_updates(mut self, percent: u32) -> Self {
        self.lazy_updates = percent.min(100);
        self
    }

    pub fn neighbor_updates(mut self, percent: u32) -> Self {
        self.neighbor_updates = percent.min(100);
        self
    }

    pub fn contracted_nodes(mut self, percent: u32) -> Self {
        self.contracted_nodes = percent.min(100);
        self
    }
}

/// Travel direction of a `ChArc` relative to its `base` node.
pub const FORWARD: u8 = 1;
pub const BACKWARD: u8 = 2;

/// An arc of the hierarchy. `base` is the endpoint with the lower level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChArc {
    pub base: u32,
    pub adj: u32,
    pub weight: Weight,
    /// meters
    pub distance: f64,
    /// `FORWARD` for travel from base to adj, `BACKWARD` for travel from adj to base
    pub flags: u8,
    /// For shortcuts the arc entering the skipped node and the arc leaving it, in travel order.
    pub skipped: Option<(ArcId, ArcId)>,
    /// For original arcs: the road edge key (node based) or the edge key the turn leads onto (edge based).
    pub original: u32,
}

impl ChArc {
    pub fn tail(&self) -> u32 {
        if self.flags & FORWARD != 0 {
            self.base
        } else {
            self.adj
        }
    }

    pub fn head(&self) -> u32 {
        if self.flags & FORWARD != 0 {
            self.adj
        } else {
            self.base
        }
    }

    pub fn is_shortcut(&self) -> bool {
        self.skipped.is_some()
    }
}

/// The result of the preparation.
/// The nodes of the hierarchy are road nodes in node based mode and edge keys in edge based mode.
#[derive(Debug, Clone)]
pub struct ContractionHierarchy {
    mode: TraversalMode,
    num_nodes: usize,
    levels: Vec<u32>,
    arcs: Vec<ChArc>,
    // arcs leaving each node upward, for the forward search
    forward: AdjacencyArray<ArcId>,
    // arcs entering each node from above, for the backward search
    backward: AdjacencyArray<ArcId>,
    consistency: std::result::Result<(), String>,
}

impl ContractionHierarchy {
    /// Assemble a hierarchy from levels and arcs.
    /// The data is not trusted: if it is inconsistent, every query on it fails.
    pub fn new(mode: TraversalMode, num_nodes: usize, levels: Vec<u32>, arcs: Vec<ChArc>) -> Self {
        let consistency = check_levels(num_nodes, &levels, &arcs);
        let mut forward = vec![Vec::new(); num_nodes];
        let mut backward = vec![Vec::new(); num_nodes];

        if consistency.is_ok() {
            for (id, arc) in arcs.iter().enumerate() {
                let (tail, head) = (arc.tail(), arc.head());
                if levels[tail as usize] <= levels[head as usize] {
                    forward[tail as usize].push(id as ArcId);
                }
                if levels[head as usize] <= levels[tail as usize] {
                    backward[head as usize].push(id as ArcId);
                }
            }
        }

        ContractionHierarchy {
            mode,
            num_nodes,
            levels,
            arcs,
            forward: AdjacencyArray::from_adjacency_lists(forward),
            backward: AdjacencyArray::from_adjacency_lists(backward),
            consistency,
        }
    }

    pub fn mode(&self) -> TraversalMode {
        self.mode
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub fn levels(&self) -> &[u32] {
        &self.levels
    }

    pub fn arcs(&self) -> &[ChArc] {
        &self.arcs
    }

    pub fn num_shortcuts(&self) -> usize {
        self.arcs.iter().filter(|arc| arc.is_shortcut()).count()
    }

    /// Fails with `PreparationInvariantViolation` if levels and arcs do not form a valid hierarchy.
    pub fn check(&self) -> Result<()> {
        self.consistency.clone().map_err(crate::error::Error::PreparationInvariantViolation)
    }

    /// Nodes sorted by level, ties broken by id.
    pub fn order(&self) -> NodeOrder {
        let mut order: Vec<NodeId> = (0..self.levels.len() as NodeId).collect();
        order.sort_by_key(|&node| (self.levels[node as usize], node));
        NodeOrder::from_node_order(order)
    }

    pub(super) fn upward_arcs(&self, node: u32) -> &[ArcId] {
        self.forward.neighbors(node)
    }

    pub(super) fn downward_arcs(&self, node: u32) -> &[ArcId] {
        self.backward.neighbors(node)
    }

    /// Replace an arc by the original arcs it consists of, in travel order.
    /// Requires a hierarchy which passes `check`.
    pub fn unpack(&self, arc: ArcId, originals: &mut Vec<ArcId>) {
        let mut stack = vec![arc];
        while let Some(arc) = stack.pop() {
            match self.arcs[arc as usize].skipped {
                Some((first, second)) => {
                    stack.push(second);
                    stack.push(first);
                }
                None => originals.push(arc),
            }
        }
    }
}

fn check_levels(num_nodes: usize, levels: &[u32], arcs: &[ChArc]) -> std::result::Result<(), String> {
    if levels.len() != num_nodes {
        return Err(format!("expected {} levels, got {}", num_nodes, levels.len()));
    }
    if let Some(node) = levels.iter().position(|&level| level as usize >= num_nodes) {
        return Err(format!("level {} of node {} out of range", levels[node], node));
    }
    for (id, arc) in arcs.iter().enumerate() {
        if arc.base as usize >= num_nodes || arc.adj as usize >= num_nodes {
            return Err(format!("arc {} has an endpoint out of range", id));
        }
        if levels[arc.base as usize] > levels[arc.adj as usize] {
            return Err(format!(
                "arc {} from level {} down to level {}",
                id, levels[arc.base as usize], levels[arc.adj as usize]
            ));
        }
        if arc.flags != FORWARD && arc.flags != BACKWARD {
            return Err(format!("arc {} has invalid direction flags {}", id, arc.flags));
        }
        if let Some((first, second)) = arc.skipped {
            if first as usize >= arcs.len() || second as usize >= arcs.len() {
                return Err(format!("shortcut {} skips arcs out of range", id));
            }
        }
    }
    // A shortcut replaces two arcs through a node below both of its endpoints.
    // Unpacking descends strictly in level and thus always terminates.
    for (id, arc) in arcs.iter().enumerate() {
        if let Some((first, second)) = arc.skipped {
            let (first, second) = (&arcs[first as usize], &arcs[second as usize]);
            let mid = first.head();
            if first.tail() != arc.tail() || second.tail() != mid || second.head() != arc.head() {
                return Err(format!("shortcut {} does not replace a path of two arcs", id));
            }
            if levels[mid as usize] >= levels[arc.base as usize] || levels[mid as usize] >= levels[arc.adj as usize] {
                return Err(format!("shortcut {} skips node {} which is not below its endpoints", id, mid));
            }
        }
    }
    Ok(())
}

impl Deconstruct for ContractionHierarchy {
    fn store_each(&self, store: &dyn Fn(&str, &dyn Store) -> std::io::Result<()>) -> std::io::Result<()> {
        store("ch_mode", &vec![self.mode.is_edge_based() as u8])?;
        store("ch_num_nodes", &vec![self.num_nodes as u32])?;
        store("ch_levels", &self.levels)?;
        store("ch_arc_base", &self.arcs.iter().map(|arc| arc.base).collect::<Vec<_>>())?;
        store("ch_arc_adj", &self.arcs.iter().map(|arc| arc.adj).collect::<Vec<_>>())?;
        store("ch_arc_weight", &self.arcs.iter().map(|arc| arc.weight).collect::<Vec<_>>())?;
        store("ch_arc_distance", &self.arcs.iter().map(|arc| arc.distance).collect::<Vec<_>>())?;
        store("ch_arc_flags", &self.arcs.iter().map(|arc| arc.flags).collect::<Vec<_>>())?;
        store(
            "ch_arc_skipped_first",
            &self.arcs.iter().map(|arc| arc.skipped.map_or(NO_ARC, |(first, _)| first)).collect::<Vec<_>>(),
        )?;
        store(
            "ch_arc_skipped_second",
            &self.arcs.iter().map(|arc| arc.skipped.map_or(NO_ARC, |(_, second)| second)).collect::<Vec<_>>(),
        )?;
        store("ch_arc_original", &self.arcs.iter().map(|arc| arc.original).collect::<Vec<_>>())
    }
}

impl Reconstruct for ContractionHierarchy {
    fn reconstruct_with(loader: Loader) -> std::io::Result<Self> {
        let mode: Vec<u8> = loader.load("ch_mode")?;
        let mode = match mode.first() {
            Some(0) => TraversalMode::NodeBased,
            Some(1) => TraversalMode::EdgeBased,
            _ => return Err(invalid_data("invalid ch_mode".to_string())),
        };
        let num_nodes: Vec<u32> = loader.load("ch_num_nodes")?;
        let num_nodes = *num_nodes.first().ok_or_else(|| invalid_data("empty ch_num_nodes".to_string()))? as usize;
        let levels: Vec<u32> = loader.load("ch_levels")?;

        let base: Vec<u32> = loader.load("ch_arc_base")?;
        let adj: Vec<u32> = loader.load("ch_arc_adj")?;
        let weight: Vec<Weight> = loader.load("ch_arc_weight")?;
        let distance: Vec<f64> = loader.load("ch_arc_distance")?;
        let flags: Vec<u8> = loader.load("ch_arc_flags")?;
        let skipped_first: Vec<ArcId> = loader.load("ch_arc_skipped_first")?;
        let skipped_second: Vec<ArcId> = loader.load("ch_arc_skipped_second")?;
        let original: Vec<u32> = loader.load("ch_arc_original")?;

        let m = base.len();
        if [adj.len(), weight.len(), distance.len(), flags.len(), skipped_first.len(), skipped_second.len(), original.len()]
            .iter()
            .any(|&len| len != m)
        {
            return Err(invalid_data("arc files differ in length".to_string()));
        }

        let arcs = (0..m)
            .map(|i| ChArc {
                base: base[i],
                adj: adj[i],
                weight: weight[i],
                distance: distance[i],
                flags: flags[i],
                skipped: if skipped_first[i] == NO_ARC {
                    None
                } else {
                    Some((skipped_first[i], skipped_second[i]))
                },
                original: original[i],
            })
            .collect();

        Ok(ContractionHierarchy::new(mode, num_nodes, levels, arcs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arc(base: u32, adj: u32, weight: Weight, flags: u8, skipped: Option<(ArcId, ArcId)>) -> ChArc {
        ChArc {
            base,
            adj,
            weight,
            distance: weight,
            flags,
            skipped,
            original: 0,
        }
    }

    #[test]
    fn levels_are_validated() {
        let arcs = vec![arc(0, 1, 1.0, FORWARD, None), arc(0, 2, 1.0, BACKWARD, None)];
        assert!(ContractionHierarchy::new(TraversalMode::NodeBased, 3, vec![0, 1, 2], arcs.clone()).check().is_ok());
        assert!(ContractionHierarchy::new(TraversalMode::NodeBased, 3, vec![0, 1], arcs.clone()).check().is_err());
        assert!(ContractionHierarchy::new(TraversalMode::NodeBased, 3, vec![0, 1, 7], arcs.clone()).check().is_err());
        assert!(matches!(
            ContractionHierarchy::new(TraversalMode::NodeBased, 3, vec![2, 1, 0], arcs).check(),
            Err(crate::error::Error::PreparationInvariantViolation(_))
        ));
    }

    // 0 -> 1 -> 2 -> 3, node 1 contracted first, then node 2
    fn line_with_shortcuts() -> Vec<ChArc> {
        vec![
            arc(1, 0, 1.0, BACKWARD, None),
            arc(1, 2, 1.0, FORWARD, None),
            arc(2, 3, 1.0, FORWARD, None),
            arc(2, 0, 2.0, BACKWARD, Some((0, 1))),
            arc(0, 3, 3.0, FORWARD, Some((3, 2))),
        ]
    }

    #[test]
    fn unpacking_follows_travel_order() {
        let ch = ContractionHierarchy::new(TraversalMode::NodeBased, 4, vec![2, 0, 1, 3], line_with_shortcuts());
        assert!(ch.check().is_ok());
        let mut originals = Vec::new();
        ch.unpack(4, &mut originals);
        assert_eq!(originals, vec![0, 1, 2]);
        assert_eq!(ch.order().order(), &[1, 2, 0, 3]);
        assert_eq!(ch.num_shortcuts(), 2);
    }

    #[test]
    fn shortcuts_must_skip_a_lower_node() {
        let skips_itself = vec![arc(0, 2, 1.0, FORWARD, Some((0, 0)))];
        assert!(ContractionHierarchy::new(TraversalMode::NodeBased, 3, vec![0, 1, 2], skips_itself).check().is_err());

        let mut cyclic = line_with_shortcuts();
        cyclic[3].skipped = Some((4, 1));
        cyclic[4].skipped = Some((3, 2));
        assert!(ContractionHierarchy::new(TraversalMode::NodeBased, 4, vec![2, 0, 1, 3], cyclic).check().is_err());

        // node 1 shares its level with the endpoint 2 of the shortcut skipping it
        assert!(matches!(
            ContractionHierarchy::new(TraversalMode::NodeBased, 4, vec![2, 1, 1, 3], line_with_shortcuts()).check(),
            Err(crate::error::Error::PreparationInvariantViolation(_))
        ));
    }
}
