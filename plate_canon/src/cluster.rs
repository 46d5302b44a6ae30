//! End-of-stream merging of near-duplicate plates.
//!
//! Plates within a small Hamming distance of each other are linked into an
//! undirected graph. Every connected component collapses into a single entry:
//! the member with the highest frequency names it, frequencies are summed,
//! the image is the surviving member's own and the frame is the frame of the
//! first member of the component.
//!
//! Building the graph compares every pair of plates, which is fine for the
//! tens of distinct plates a video produces but will not scale to large sets.

use petgraph::graph::{NodeIndex, UnGraph};
use tracing::{debug, info};

use crate::error::CanonError;
use crate::metrics;
use crate::plate_map::{PlateMap, PlateRecord};

/// Number of positions at which two equal-length strings differ.
pub fn hamming_distance(left: &str, right: &str) -> Result<usize, CanonError> {
    let (left_len, right_len) = (left.chars().count(), right.chars().count());
    if left_len != right_len {
        return Err(CanonError::LengthMismatch {
            left: left_len,
            right: right_len,
        });
    }
    Ok(left
        .chars()
        .zip(right.chars())
        .filter(|(a, b)| a != b)
        .count())
}

/// Similarity graph over a set of plate strings. Node weights are indices
/// into the key order the graph was built from.
#[derive(Debug, Clone)]
pub struct PlateGraph {
    graph: UnGraph<usize, ()>,
}

impl PlateGraph {
    /// Links every pair of equal-length keys within `max_distance`.
    /// Keys of different lengths are never compared.
    pub fn build<'a, I>(keys: I, max_distance: usize) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let keys: Vec<&str> = keys.into_iter().collect();
        let mut graph = UnGraph::with_capacity(keys.len(), 0);
        let nodes: Vec<NodeIndex> = (0..keys.len()).map(|key| graph.add_node(key)).collect();

        for i in 0..keys.len() {
            for j in (i + 1)..keys.len() {
                if keys[i].chars().count() != keys[j].chars().count() {
                    continue;
                }
                if let Ok(distance) = hamming_distance(keys[i], keys[j]) {
                    if distance <= max_distance {
                        graph.add_edge(nodes[i], nodes[j], ());
                    }
                }
            }
        }

        Self { graph }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Neighbours of `node`, in ascending key order.
    fn neighbours(&self, node: usize) -> Vec<usize> {
        let mut neighbours: Vec<usize> = self
            .graph
            .neighbors(NodeIndex::new(node))
            .map(|next| self.graph[next])
            .collect();
        // petgraph yields the most recent edge first
        neighbours.sort_unstable();
        neighbours
    }

    /// Connected components in depth-first visit order.
    ///
    /// Roots are taken in key order and neighbours are walked in key order,
    /// so the first member of each component is its earliest key. The
    /// explicit stack yields the same order as the recursive walk.
    pub fn components(&self) -> Vec<Vec<usize>> {
        let adjacency: Vec<Vec<usize>> = (0..self.node_count())
            .map(|node| self.neighbours(node))
            .collect();
        let mut visited = vec![false; adjacency.len()];
        let mut components = Vec::new();

        for root in 0..adjacency.len() {
            if visited[root] {
                continue;
            }
            visited[root] = true;
            let mut component = vec![root];
            let mut stack = vec![(root, 0usize)];

            while let Some(top) = stack.last_mut() {
                let (node, cursor) = *top;
                top.1 += 1;
                match adjacency[node].get(cursor) {
                    Some(&next) => {
                        if !visited[next] {
                            visited[next] = true;
                            component.push(next);
                            stack.push((next, 0));
                        }
                    }
                    None => {
                        stack.pop();
                    }
                }
            }

            components.push(component);
        }

        components
    }
}

/// Merges every similarity group of `plates` into one entry.
///
/// The surviving key is the member with the strictly highest frequency, the
/// earliest member winning ties. Its record carries the summed frequency, the
/// survivor's image and the frame of the component's first member.
pub fn cluster_plates(plates: PlateMap, max_distance: usize) -> PlateMap {
    let graph = PlateGraph::build(plates.keys().map(|plate| plate.as_str()), max_distance);
    let groups = graph.components();

    let mut entries: Vec<_> = plates.into_iter().map(Some).collect();
    let mut clustered = PlateMap::new();
    let mut merged_groups = 0usize;

    for group in groups {
        if let [single] = group.as_slice() {
            if let Some((plate, record)) = entries[*single].take() {
                clustered.insert(plate, record);
            }
            continue;
        }

        let members: Vec<_> = group
            .iter()
            .filter_map(|&member| entries[member].take())
            .collect();
        let Some((_, first)) = members.first() else {
            continue;
        };
        let frame = first.frame;
        let frequency: u32 = members.iter().map(|(_, record)| record.frequency).sum();

        let mut survivor = 0;
        for (at, (_, record)) in members.iter().enumerate().skip(1) {
            if record.frequency > members[survivor].1.frequency {
                survivor = at;
            }
        }
        let names: Vec<&str> = members.iter().map(|(plate, _)| plate.as_str()).collect();
        debug!(members = ?names, survivor = names[survivor], frequency, frame, "merging plates");

        metrics::PLATES_MERGED.inc_by((members.len() - 1) as u64);
        merged_groups += 1;

        let Some((plate, record)) = members.into_iter().nth(survivor) else {
            continue;
        };
        clustered.insert(
            plate,
            PlateRecord {
                frequency,
                frame,
                image: record.image,
            },
        );
    }

    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        plates = clustered.len(),
        merged_groups,
        "clustered plates by similarity"
    );
    clustered
}
