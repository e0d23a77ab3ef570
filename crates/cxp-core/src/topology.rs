//! Directional flow topology.
//!
//! Lines are declared once per unordered zone pair. [`Topology::build`] loads
//! them into a `petgraph` undirected graph and derives the two directional
//! pairs `(a, b)` and `(b, a)` of every line, together with the reverse lookup
//! `(from, to) -> line` used by dispatch variables and reports.

use std::collections::HashMap;

use petgraph::algo::connected_components;
use petgraph::graph::{NodeIndex, UnGraph};
use tracing::debug;

use crate::{CxpError, CxpResult, LineId, LoadZone, TransmissionLine, ZoneId};

/// An ordered `(from, to)` zone pair backed by exactly one line.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DirectionalPair {
    pub from: ZoneId,
    pub to: ZoneId,
}

impl DirectionalPair {
    pub fn new(from: ZoneId, to: ZoneId) -> Self {
        Self { from, to }
    }

    pub fn reversed(&self) -> Self {
        Self {
            from: self.to.clone(),
            to: self.from.clone(),
        }
    }
}

impl std::fmt::Display for DirectionalPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}->{}", self.from, self.to)
    }
}

/// Read-only network topology derived from the line set.
#[derive(Debug, Clone)]
pub struct Topology {
    graph: UnGraph<ZoneId, LineId>,
    node_index: HashMap<ZoneId, NodeIndex>,
    pairs: Vec<DirectionalPair>,
    line_of: HashMap<DirectionalPair, LineId>,
}

impl Topology {
    /// Derive the topology from zones and lines.
    ///
    /// A line naming an unknown zone, joining a zone to itself, or duplicating
    /// the unordered pair of an earlier line (in either declared order) is a
    /// configuration error.
    pub fn build(zones: &[LoadZone], lines: &[TransmissionLine]) -> CxpResult<Self> {
        let mut graph = UnGraph::with_capacity(zones.len(), lines.len());
        let mut node_index = HashMap::with_capacity(zones.len());

        for zone in zones {
            if node_index.contains_key(&zone.id) {
                return Err(CxpError::Config(format!(
                    "load zone {} declared more than once",
                    zone.id
                )));
            }
            let idx = graph.add_node(zone.id.clone());
            node_index.insert(zone.id.clone(), idx);
        }

        let mut pairs = Vec::with_capacity(2 * lines.len());
        let mut line_of = HashMap::with_capacity(2 * lines.len());

        for line in lines {
            let a = lookup_zone(&node_index, &line.zone_a, &line.id)?;
            let b = lookup_zone(&node_index, &line.zone_b, &line.id)?;
            if a == b {
                return Err(CxpError::Config(format!(
                    "transmission line {} connects zone {} to itself",
                    line.id, line.zone_a
                )));
            }
            if let Some(existing) = graph.find_edge(a, b) {
                return Err(CxpError::Config(format!(
                    "transmission lines {} and {} both connect {} and {}",
                    graph[existing], line.id, line.zone_a, line.zone_b
                )));
            }
            graph.add_edge(a, b, line.id.clone());

            let forward = DirectionalPair::new(line.zone_a.clone(), line.zone_b.clone());
            let backward = forward.reversed();
            line_of.insert(forward.clone(), line.id.clone());
            line_of.insert(backward.clone(), line.id.clone());
            pairs.push(forward);
            pairs.push(backward);
        }

        debug!(
            zones = graph.node_count(),
            lines = graph.edge_count(),
            directional_pairs = pairs.len(),
            "derived transmission topology"
        );

        Ok(Self {
            graph,
            node_index,
            pairs,
            line_of,
        })
    }

    /// Every directional pair, two per line in line declaration order.
    pub fn directional_pairs(&self) -> &[DirectionalPair] {
        &self.pairs
    }

    /// Zones `m` such that `(m, zone)` is a directional pair, sorted by id.
    pub fn neighbors(&self, zone: &ZoneId) -> CxpResult<Vec<&ZoneId>> {
        let idx = self
            .node_index
            .get(zone)
            .ok_or_else(|| CxpError::Lookup(format!("unknown load zone {}", zone)))?;
        let mut neighbors: Vec<&ZoneId> =
            self.graph.neighbors(*idx).map(|n| &self.graph[n]).collect();
        neighbors.sort();
        Ok(neighbors)
    }

    /// Pairs whose `from` end is `zone`.
    pub fn pairs_from<'a>(&'a self, zone: &'a ZoneId) -> impl Iterator<Item = &'a DirectionalPair> {
        self.pairs.iter().filter(move |p| &p.from == zone)
    }

    /// Pairs whose `to` end is `zone`.
    pub fn pairs_into<'a>(&'a self, zone: &'a ZoneId) -> impl Iterator<Item = &'a DirectionalPair> {
        self.pairs.iter().filter(move |p| &p.to == zone)
    }

    /// The line backing the directional pair `(from, to)`.
    pub fn line_for(&self, from: &ZoneId, to: &ZoneId) -> CxpResult<&LineId> {
        self.line_of
            .get(&DirectionalPair::new(from.clone(), to.clone()))
            .ok_or_else(|| {
                CxpError::Lookup(format!("no transmission line connects {} and {}", from, to))
            })
    }

    pub fn line_for_pair(&self, pair: &DirectionalPair) -> CxpResult<&LineId> {
        self.line_for(&pair.from, &pair.to)
    }

    pub fn zone_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn line_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Number of electrically separate zone groups.
    pub fn island_count(&self) -> usize {
        connected_components(&self.graph)
    }
}

fn lookup_zone(
    index: &HashMap<ZoneId, NodeIndex>,
    zone: &ZoneId,
    line: &LineId,
) -> CxpResult<NodeIndex> {
    index.get(zone).copied().ok_or_else(|| {
        CxpError::Config(format!(
            "transmission line {} references unknown load zone {}",
            line, zone
        ))
    })
}
