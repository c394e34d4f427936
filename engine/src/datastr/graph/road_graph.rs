//! The road network: undirected edge storage with per direction access and speed.
//!
//! Each edge connects a `base` and an `adj` node and may be traversed in both directions
//! subject to its access flags. Searches work on directed views of edges, addressed through `EdgeKey`s.
//! For every node we keep the keys leaving it (`out_keys`) and the keys entering it (`in_keys`)
//! so forward and backward searches can both iterate their neighborhood directly.

use super::*;
use crate::error::{Error, Result};
use crate::io::*;

const ACCESS_FWD: u8 = 1;
const ACCESS_BWD: u8 = 2;

/// Everything a weighting or a filter may want to know about a directed edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeView {
    pub key: EdgeKey,
    pub edge: EdgeId,
    pub tail: NodeId,
    pub head: NodeId,
    /// meters
    pub distance: f64,
    /// access in the direction of this view
    pub access: bool,
    /// km/h in the direction of this view
    pub speed: f64,
    /// in `[0, 1]`, consumed by the priority weighting
    pub priority: f64,
}

#[derive(Debug, Clone)]
pub struct RoadGraph {
    num_nodes: usize,
    base: Vec<NodeId>,
    adj: Vec<NodeId>,
    distance: Vec<f64>,
    speed_fwd: Vec<f64>,
    speed_bwd: Vec<f64>,
    priority: Vec<f64>,
    access: Vec<u8>,
    // degrees in lat/lng, either empty or one per node
    latitude: Vec<f64>,
    longitude: Vec<f64>,
    out_keys: AdjacencyArray<EdgeKey>,
    in_keys: AdjacencyArray<EdgeKey>,
}

impl RoadGraph {
    pub fn num_edges(&self) -> usize {
        self.base.len()
    }

    /// The number of directed edge views, `2 * num_edges`.
    pub fn num_keys(&self) -> usize {
        2 * self.num_edges()
    }

    /// Base and adj node of an edge.
    pub fn endpoints(&self, edge: EdgeId) -> (NodeId, NodeId) {
        (self.base[edge as usize], self.adj[edge as usize])
    }

    pub fn distance(&self, edge: EdgeId) -> f64 {
        self.distance[edge as usize]
    }

    #[inline]
    pub fn tail(&self, key: EdgeKey) -> NodeId {
        let edge = key_edge(key) as usize;
        if key_is_reverse(key) {
            self.adj[edge]
        } else {
            self.base[edge]
        }
    }

    #[inline]
    pub fn head(&self, key: EdgeKey) -> NodeId {
        let edge = key_edge(key) as usize;
        if key_is_reverse(key) {
            self.base[edge]
        } else {
            self.adj[edge]
        }
    }

    #[inline]
    pub fn view(&self, key: EdgeKey) -> EdgeView {
        let edge = key_edge(key);
        let e = edge as usize;
        let reverse = key_is_reverse(key);
        let (tail, head) = if reverse { (self.adj[e], self.base[e]) } else { (self.base[e], self.adj[e]) };
        let access_mask = if reverse { ACCESS_BWD } else { ACCESS_FWD };

        EdgeView {
            key,
            edge,
            tail,
            head,
            distance: self.distance[e],
            access: self.access[e] & access_mask != 0,
            speed: if reverse { self.speed_bwd[e] } else { self.speed_fwd[e] },
            priority: self.priority[e],
        }
    }

    /// Keys of all directed edges with `tail == node`, regardless of access.
    #[inline]
    pub fn out_keys(&self, node: NodeId) -> &[EdgeKey] {
        self.out_keys.neighbors(node)
    }

    /// Keys of all directed edges with `head == node`, regardless of access.
    #[inline]
    pub fn in_keys(&self, node: NodeId) -> &[EdgeKey] {
        self.in_keys.neighbors(node)
    }

    pub fn has_coordinates(&self) -> bool {
        !self.latitude.is_empty()
    }

    /// Latitude and longitude in degrees, if the graph has coordinates.
    pub fn coordinates(&self, node: NodeId) -> Option<(f64, f64)> {
        if self.has_coordinates() {
            Some((self.latitude[node as usize], self.longitude[node as usize]))
        } else {
            None
        }
    }

    /// The largest speed of any edge in any direction.
    pub fn max_speed(&self) -> f64 {
        self.speed_fwd.iter().chain(self.speed_bwd.iter()).fold(0.0, |max, &speed| f64::max(max, speed))
    }

    fn build_adjacency(num_nodes: usize, base: &[NodeId], adj: &[NodeId]) -> (AdjacencyArray<EdgeKey>, AdjacencyArray<EdgeKey>) {
        let mut outgoing: Vec<Vec<EdgeKey>> = vec![Vec::new(); num_nodes];
        let mut incoming: Vec<Vec<EdgeKey>> = vec![Vec::new(); num_nodes];

        // keys are pushed in ascending order, so every list ends up sorted
        for (edge, (&base, &adj)) in base.iter().zip(adj.iter()).enumerate() {
            let forward = edge_key(edge as EdgeId, false);
            let backward = edge_key(edge as EdgeId, true);
            outgoing[base as usize].push(forward);
            incoming[adj as usize].push(forward);
            outgoing[adj as usize].push(backward);
            incoming[base as usize].push(backward);
        }

        (AdjacencyArray::from_adjacency_lists(outgoing), AdjacencyArray::from_adjacency_lists(incoming))
    }
}

impl Graph for RoadGraph {
    fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Number of directed edge views
    fn num_arcs(&self) -> usize {
        self.num_keys()
    }

    fn degree(&self, node: NodeId) -> usize {
        self.out_keys.degree(node)
    }
}

/// Incremental construction of a `RoadGraph`.
/// All numbers are validated here so searches never encounter negative or NaN values.
#[derive(Debug, Clone)]
pub struct RoadGraphBuilder {
    num_nodes: usize,
    base: Vec<NodeId>,
    adj: Vec<NodeId>,
    distance: Vec<f64>,
    speed_fwd: Vec<f64>,
    speed_bwd: Vec<f64>,
    priority: Vec<f64>,
    access: Vec<u8>,
    latitude: Vec<f64>,
    longitude: Vec<f64>,
}

impl RoadGraphBuilder {
    pub fn new(num_nodes: usize) -> Self {
        assert!(num_nodes < <NodeId>::max_value() as usize);
        RoadGraphBuilder {
            num_nodes,
            base: Vec::new(),
            adj: Vec::new(),
            distance: Vec::new(),
            speed_fwd: Vec::new(),
            speed_bwd: Vec::new(),
            priority: Vec::new(),
            access: Vec::new(),
            latitude: Vec::new(),
            longitude: Vec::new(),
        }
    }

    /// Add an edge with full control over both directions. Speeds are in km/h.
    /// A direction without access or with zero speed is impassable.
    #[allow(clippy::too_many_arguments)]
    pub fn add_edge(
        &mut self,
        base: NodeId,
        adj: NodeId,
        distance: f64,
        speed_fwd: f64,
        speed_bwd: f64,
        access_fwd: bool,
        access_bwd: bool,
        priority: f64,
    ) -> Result<EdgeId> {
        for node in [base, adj] {
            if node as usize >= self.num_nodes {
                return Err(Error::InvalidGraph(format!("edge endpoint {} out of range ({} nodes)", node, self.num_nodes)));
            }
        }
        if !(distance.is_finite() && distance >= 0.0) {
            return Err(Error::InvalidGraph(format!("edge {}-{} has invalid distance {}", base, adj, distance)));
        }
        for speed in [speed_fwd, speed_bwd] {
            if !(speed.is_finite() && speed >= 0.0) {
                return Err(Error::InvalidGraph(format!("edge {}-{} has invalid speed {}", base, adj, speed)));
            }
        }
        if !(0.0..=1.0).contains(&priority) {
            return Err(Error::InvalidGraph(format!("edge {}-{} has invalid priority {}", base, adj, priority)));
        }
        if self.base.len() >= (<EdgeKey>::max_value() / 2) as usize {
            return Err(Error::InvalidGraph("too many edges".to_string()));
        }

        let id = self.base.len() as EdgeId;
        self.base.push(base);
        self.adj.push(adj);
        self.distance.push(distance);
        self.speed_fwd.push(speed_fwd);
        self.speed_bwd.push(speed_bwd);
        self.priority.push(priority);
        let mut access = 0;
        if access_fwd {
            access |= ACCESS_FWD;
        }
        if access_bwd {
            access |= ACCESS_BWD;
        }
        self.access.push(access);
        Ok(id)
    }

    /// Add an edge usable in both directions with the same speed.
    pub fn add_bidir_edge(&mut self, base: NodeId, adj: NodeId, distance: f64, speed: f64) -> Result<EdgeId> {
        self.add_edge(base, adj, distance, speed, speed, true, true, 1.0)
    }

    /// Add an edge only usable from `base` to `adj`.
    pub fn add_oneway_edge(&mut self, base: NodeId, adj: NodeId, distance: f64, speed: f64) -> Result<EdgeId> {
        self.add_edge(base, adj, distance, speed, speed, true, false, 1.0)
    }

    /// Set the coordinates of a node. Once any node has coordinates, all unset nodes default to (0, 0).
    pub fn set_coordinates(&mut self, node: NodeId, lat: f64, lng: f64) -> Result<()> {
        if node as usize >= self.num_nodes {
            return Err(Error::InvalidGraph(format!("node {} out of range ({} nodes)", node, self.num_nodes)));
        }
        if !(lat.is_finite() && lng.is_finite()) {
            return Err(Error::InvalidGraph(format!("node {} has invalid coordinates", node)));
        }
        if self.latitude.is_empty() {
            self.latitude = vec![0.0; self.num_nodes];
            self.longitude = vec![0.0; self.num_nodes];
        }
        self.latitude[node as usize] = lat;
        self.longitude[node as usize] = lng;
        Ok(())
    }

    pub fn build(self) -> RoadGraph {
        let (out_keys, in_keys) = RoadGraph::build_adjacency(self.num_nodes, &self.base, &self.adj);

        RoadGraph {
            num_nodes: self.num_nodes,
            base: self.base,
            adj: self.adj,
            distance: self.distance,
            speed_fwd: self.speed_fwd,
            speed_bwd: self.speed_bwd,
            priority: self.priority,
            access: self.access,
            latitude: self.latitude,
            longitude: self.longitude,
            out_keys,
            in_keys,
        }
    }
}

impl Deconstruct for RoadGraph {
    fn store_each(&self, store: &dyn Fn(&str, &dyn Store) -> std::io::Result<()>) -> std::io::Result<()> {
        store("num_nodes", &vec![self.num_nodes as u32])?;
        store("base", &self.base)?;
        store("adj", &self.adj)?;
        store("distance", &self.distance)?;
        store("speed_fwd", &self.speed_fwd)?;
        store("speed_bwd", &self.speed_bwd)?;
        store("priority", &self.priority)?;
        store("access", &self.access)?;
        if self.has_coordinates() {
            store("latitude", &self.latitude)?;
            store("longitude", &self.longitude)?;
        }
        Ok(())
    }
}

impl Reconstruct for RoadGraph {
    fn reconstruct_with(loader: Loader) -> std::io::Result<Self> {
        let num_nodes: Vec<u32> = loader.load("num_nodes")?;
        let num_nodes = *num_nodes.first().ok_or_else(|| invalid_data("empty num_nodes file".to_string()))? as usize;
        if num_nodes >= <NodeId>::max_value() as usize {
            return Err(invalid_data(format!("{} nodes exceed the id range", num_nodes)));
        }

        let base: Vec<NodeId> = loader.load("base")?;
        let adj: Vec<NodeId> = loader.load("adj")?;
        let distance: Vec<f64> = loader.load("distance")?;
        let speed_fwd: Vec<f64> = loader.load("speed_fwd")?;
        let speed_bwd: Vec<f64> = loader.load("speed_bwd")?;
        let priority: Vec<f64> = loader.load("priority")?;
        let access: Vec<u8> = loader.load("access")?;

        let mut builder = RoadGraphBuilder::new(num_nodes);
        let m = base.len();
        if [adj.len(), distance.len(), speed_fwd.len(), speed_bwd.len(), priority.len(), access.len()].iter().any(|&len| len != m) {
            return Err(invalid_data("edge attribute files differ in length".to_string()));
        }
        for e in 0..m {
            builder
                .add_edge(
                    base[e],
                    adj[e],
                    distance[e],
                    speed_fwd[e],
                    speed_bwd[e],
                    access[e] & ACCESS_FWD != 0,
                    access[e] & ACCESS_BWD != 0,
                    priority[e],
                )
                .map_err(|e| invalid_data(e.to_string()))?;
        }

        if let (Some(latitude), Some(longitude)) = (loader.load_optional::<Vec<f64>, _>("latitude")?, loader.load_optional::<Vec<f64>, _>("longitude")?) {
            if latitude.len() != num_nodes || longitude.len() != num_nodes {
                return Err(invalid_data("coordinate files do not match the number of nodes".to_string()));
            }
            for (node, (lat, lng)) in latitude.into_iter().zip(longitude).enumerate() {
                builder.set_coordinates(node as NodeId, lat, lng).map_err(|e| invalid_data(e.to_string()))?;
            }
        }

        Ok(builder.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> RoadGraph {
        //   0 ---- 1 ---> 2
        //          |
        //          3 (loop)
        let mut builder = RoadGraphBuilder::new(4);
        builder.add_bidir_edge(0, 1, 10.0, 60.0).unwrap();
        builder.add_oneway_edge(1, 2, 20.0, 30.0).unwrap();
        builder.add_bidir_edge(1, 3, 5.0, 60.0).unwrap();
        builder.add_oneway_edge(3, 3, 7.0, 60.0).unwrap();
        builder.build()
    }

    #[test]
    fn views_follow_key_direction() {
        let graph = graph();
        let forward = graph.view(edge_key(1, false));
        assert_eq!((forward.tail, forward.head), (1, 2));
        assert!(forward.access);
        assert_eq!(forward.speed, 30.0);

        let backward = graph.view(edge_key(1, true));
        assert_eq!((backward.tail, backward.head), (2, 1));
        assert!(!backward.access);
        assert_eq!(backward.distance, 20.0);
    }

    #[test]
    fn adjacency_contains_both_directions() {
        let graph = graph();
        assert_eq!(graph.out_keys(1), &[edge_key(0, true), edge_key(1, false), edge_key(2, false)]);
        assert_eq!(graph.in_keys(1), &[edge_key(0, false), edge_key(1, true), edge_key(2, true)]);
        // both directions of the loop leave and enter node 3
        assert_eq!(graph.out_keys(3), &[edge_key(2, true), edge_key(3, false), edge_key(3, true)]);
        assert_eq!(graph.in_keys(3), &[edge_key(2, false), edge_key(3, false), edge_key(3, true)]);
        for node in 0..graph.num_nodes() as NodeId {
            for &key in graph.out_keys(node) {
                assert_eq!(graph.tail(key), node);
            }
            for &key in graph.in_keys(node) {
                assert_eq!(graph.head(key), node);
            }
        }
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let mut builder = RoadGraphBuilder::new(2);
        assert!(matches!(builder.add_bidir_edge(0, 1, -1.0, 50.0), Err(Error::InvalidGraph(_))));
        assert!(matches!(builder.add_bidir_edge(0, 1, f64::NAN, 50.0), Err(Error::InvalidGraph(_))));
        assert!(matches!(builder.add_bidir_edge(0, 1, 1.0, f64::NAN), Err(Error::InvalidGraph(_))));
        assert!(matches!(builder.add_bidir_edge(0, 2, 1.0, 50.0), Err(Error::InvalidGraph(_))));
        assert!(matches!(builder.add_edge(0, 1, 1.0, 50.0, 50.0, true, true, 1.5), Err(Error::InvalidGraph(_))));
    }

    #[test]
    fn store_and_reload() {
        let mut builder = RoadGraphBuilder::new(3);
        builder.add_edge(0, 1, 12.5, 50.0, 30.0, true, false, 0.5).unwrap();
        builder.add_bidir_edge(1, 2, 3.0, 10.0).unwrap();
        builder.set_coordinates(2, 49.0, 8.4).unwrap();
        let graph = builder.build();

        let dir = std::env::temp_dir().join(format!("route_engine_road_graph_test_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        graph.deconstruct_to(&dir).unwrap();
        let reloaded = RoadGraph::reconstruct_from(&dir).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        assert_eq!(reloaded.num_nodes(), 3);
        for key in 0..graph.num_keys() as EdgeKey {
            assert_eq!(reloaded.view(key), graph.view(key));
        }
        assert_eq!(reloaded.coordinates(2), Some((49.0, 8.4)));
        assert_eq!(reloaded.coordinates(0), Some((0.0, 0.0)));
    }

    #[test]
    fn node_count_out_of_range_is_rejected() {
        let dir = std::env::temp_dir().join(format!("route_engine_road_graph_range_test_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        vec![u32::MAX].write_to(&dir.join("num_nodes")).unwrap();
        let err = RoadGraph::reconstruct_from(&dir).unwrap_err();
        std::fs::remove_dir_all(&dir).unwrap();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
