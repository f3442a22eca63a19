//! Navmesh generation: cells from raw triangles and neighbour connections
//! from shared edges.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::collection::Collection;
use super::GraphError;
use crate::types::{NetworkId, NetworkKind, NodeId, Triangle};

/// A cell pair that shares more than one edge's worth of corners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedPointFailure {
    /// First cell.
    pub a: NodeId,
    /// Second cell.
    pub b: NodeId,
    /// Number of coincident corners found.
    pub shared: usize,
}

/// Outcome of connection generation for one navmesh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NavmeshReport {
    /// Cell pairs connected in both directions.
    pub connected_pairs: usize,
    /// Pairs skipped because they share more than two points.
    pub failures: Vec<SharedPointFailure>,
}

impl NavmeshReport {
    /// Check whether generation completed without failures.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl Collection {
    /// Connect neighbouring cells of a navmesh.
    ///
    /// Cells sharing exactly two triangle corners get a connection in each
    /// direction whose width is the length of the shared edge. Pairs sharing
    /// more corners are reported and left unconnected.
    pub fn generate_connections(&mut self, network: NetworkId) -> Result<NavmeshReport, GraphError> {
        self.expect_network_kind(network, NetworkKind::Navmesh)?;
        let cells = self.nodes_of(network)?.to_vec();
        let mut report = NavmeshReport::default();

        for (i, &a) in cells.iter().enumerate() {
            for &b in &cells[i + 1..] {
                let (count, points) = {
                    let (Some(first), Some(second)) = (self.node(a)?.as_cell(), self.node(b)?.as_cell()) else {
                        continue;
                    };
                    first.shared_points(second)
                };

                match count {
                    2 => {
                        let width = points[0].distance(points[1]);
                        self.connect(a, b, width)?;
                        self.connect(b, a, width)?;
                        report.connected_pairs += 1;
                    }
                    n if n > 2 => {
                        tracing::warn!(
                            network = %network,
                            a = %a,
                            b = %b,
                            shared = n,
                            "Cells share more than two points; not connected"
                        );
                        report.failures.push(SharedPointFailure { a, b, shared: n });
                    }
                    _ => {}
                }
            }
        }

        tracing::debug!(
            network = %network,
            pairs = report.connected_pairs,
            failures = report.failures.len(),
            "Generated navmesh connections"
        );
        Ok(report)
    }

    /// Build a navmesh from an indexed triangle list.
    ///
    /// Each index triple becomes one cell named `Cell <n>`, positioned at
    /// the midpoint between its first edge's midpoint and its third corner.
    /// Connections are then generated.
    pub fn build_navmesh(
        &mut self,
        name: &str,
        vertices: &[Vec3],
        indices: &[u32],
    ) -> Result<(NetworkId, NavmeshReport), GraphError> {
        if indices.len() % 3 != 0 {
            return Err(GraphError::InvalidMesh(format!(
                "index count {} is not a multiple of three",
                indices.len()
            )));
        }
        let corner = |index: u32| -> Result<Vec3, GraphError> {
            vertices.get(index as usize).copied().ok_or_else(|| {
                GraphError::InvalidMesh(format!(
                    "index {index} out of range for {} vertices",
                    vertices.len()
                ))
            })
        };

        let mut triangles = Vec::with_capacity(indices.len() / 3);
        for triple in indices.chunks_exact(3) {
            triangles.push(Triangle::new(
                corner(triple[0])?,
                corner(triple[1])?,
                corner(triple[2])?,
            ));
        }

        let network = self.add_network(name, NetworkKind::Navmesh);
        for (n, triangle) in triangles.into_iter().enumerate() {
            let centre = triangle.generation_centre();
            self.add_cell(network, &format!("Cell {n}"), centre, vec![triangle])?;
        }

        let report = self.generate_connections(network)?;
        tracing::info!(network = %network, name, cells = indices.len() / 3, "Built navmesh");
        Ok((network, report))
    }
}
