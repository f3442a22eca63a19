//! Node shapes and the spatial capabilities they provide.
//!
//! Waypoints are spheres, navmesh cells are sets of triangles, and grid
//! nodes carry no shape of their own: they resolve to their target node.
//! Triangle tests work on the XZ plane with Y treated as height.

use glam::{Vec2, Vec3, Vec3Swizzles};
use serde::{Deserialize, Serialize};

use super::ids::NodeId;

/// Three-point face of a navmesh cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Triangle {
    /// Corner points in network-local space.
    pub points: [Vec3; 3],
}

impl Triangle {
    /// Create a triangle from its corners.
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self { points: [a, b, c] }
    }

    /// Corners translated into world space.
    pub fn absolute_points(&self, offset: Vec3) -> [Vec3; 3] {
        [
            self.points[0] + offset,
            self.points[1] + offset,
            self.points[2] + offset,
        ]
    }

    /// Corners exactly equal to a corner of another triangle.
    pub fn shared_corners<'a>(&'a self, other: &'a Triangle) -> impl Iterator<Item = Vec3> + 'a {
        self.points.iter().flat_map(move |mine| {
            other
                .points
                .iter()
                .filter(move |theirs| *theirs == mine)
                .map(move |_| *mine)
        })
    }

    /// Centre used when a navmesh is generated from raw triangles:
    /// the midpoint of the first edge, then halfway toward the third corner.
    pub fn generation_centre(&self) -> Vec3 {
        let [a, b, c] = self.points;
        let mid = (a + b) * 0.5;
        (mid + c) * 0.5
    }
}

impl Triangle {
    /// Strict XZ-plane containment of a world-space point.
    ///
    /// `offset` translates network-local corners into world space.
    pub fn contains_point(&self, point: Vec3, offset: Vec3) -> bool {
        let [a, b, c] = self.absolute_points(offset).map(|p| p.xz());
        let p = point.xz();

        let v0 = c - a;
        let v1 = b - a;
        let v2 = p - a;

        let dot00 = v0.dot(v0);
        let dot01 = v0.dot(v1);
        let dot02 = v0.dot(v2);
        let dot11 = v1.dot(v1);
        let dot12 = v1.dot(v2);

        let denom = dot00 * dot11 - dot01 * dot01;
        if denom == 0.0 {
            return false;
        }
        let inv = 1.0 / denom;
        let u = (dot11 * dot02 - dot01 * dot12) * inv;
        let v = (dot00 * dot12 - dot01 * dot02) * inv;

        u > 0.0 && v > 0.0 && u + v < 1.0
    }

    /// Closest point on the triangle's edges, keeping `clearance` from corners.
    pub fn nearest_point(&self, point: Vec3, clearance: f32, offset: Vec3) -> Vec3 {
        let [a, b, c] = self.absolute_points(offset);
        let candidates = [
            closest_point_on_edge(a, b, point, clearance),
            closest_point_on_edge(a, c, point, clearance),
            closest_point_on_edge(c, b, point, clearance),
        ];

        let target = point.xz();
        candidates
            .into_iter()
            .reduce(|best, next| {
                if (next.xz() - target).length() < (best.xz() - target).length() {
                    next
                } else {
                    best
                }
            })
            .unwrap_or(point)
    }
}

/// Closest point on segment `a`-`b` (XZ plane) to `point`, pushed at least
/// `clearance` away from both corners.
fn closest_point_on_edge(a3: Vec3, b3: Vec3, point: Vec3, clearance: f32) -> Vec3 {
    let a = a3.xz();
    let b = b3.xz();
    let p = point.xz();

    let edge = b - a;
    let length = edge.length();
    if length == 0.0 {
        return a3;
    }
    let dir = edge / length;
    let t = dir.dot(p - a);

    let mut result: Vec2 = if t < 0.0 {
        a
    } else if t > length {
        b
    } else {
        a + dir * t
    };

    if (a - result).length() < clearance {
        result = a + dir * clearance;
    } else if (b - result).length() < clearance {
        result = b - dir * clearance;
    }

    let along = ((result - a).length() / length).clamp(0.0, 1.0);
    Vec3::new(result.x, a3.y + (b3.y - a3.y) * along, result.y)
}

/// Spherical waypoint shape. The centre is the owning node's position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaypointShape {
    /// Radius around the waypoint centre.
    pub radius: f32,
    /// Editor hint: hide the waypoint from runtime tools.
    pub disable_runtime: bool,
}

impl Default for WaypointShape {
    fn default() -> Self {
        Self {
            radius: 1.0,
            disable_runtime: false,
        }
    }
}

impl WaypointShape {
    /// Check whether a point lies within the radius of a world-space centre.
    pub fn contains_point(&self, centre: Vec3, point: Vec3) -> bool {
        (point - centre).length() <= self.radius
    }

    /// Pull a point inside `radius - clearance` of the centre.
    ///
    /// Points already inside, or agents wider than the waypoint, are
    /// returned unchanged.
    pub fn nearest_point(&self, centre: Vec3, point: Vec3, clearance: f32) -> Vec3 {
        if self.radius < clearance || self.contains_point(centre, point) {
            return point;
        }
        centre + (point - centre).normalize_or_zero() * (self.radius - clearance)
    }
}

/// Navmesh cell shape: an aggregate of triangles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellShape {
    /// Triangles making up the cell.
    pub triangles: Vec<Triangle>,
}

impl CellShape {
    /// Count exact corner coincidences between two cells.
    ///
    /// Returns the count and up to two of the shared points.
    pub fn shared_points(&self, other: &CellShape) -> (usize, Vec<Vec3>) {
        let mut count = 0;
        let mut points = Vec::with_capacity(2);
        for mine in &self.triangles {
            for theirs in &other.triangles {
                for shared in mine.shared_corners(theirs) {
                    count += 1;
                    if points.len() < 2 {
                        points.push(shared);
                    }
                }
            }
        }
        (count, points)
    }
}

impl CellShape {
    /// Check whether any triangle strictly contains the point.
    pub fn contains_point(&self, point: Vec3, offset: Vec3) -> bool {
        self.triangles.iter().any(|t| t.contains_point(point, offset))
    }

    /// Nearest point over all triangles; the point itself when contained.
    pub fn nearest_point(&self, point: Vec3, clearance: f32, offset: Vec3) -> Vec3 {
        let mut nearest: Option<Vec3> = None;
        for triangle in &self.triangles {
            if triangle.contains_point(point, offset) {
                return point;
            }
            let current = triangle.nearest_point(point, clearance, offset);
            nearest = match nearest {
                Some(best) if (best - point).length() <= (current - point).length() => Some(best),
                _ => Some(current),
            };
        }
        nearest.unwrap_or(point)
    }
}

/// Indirection held by a grid node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridLink {
    /// Node in another network this grid node stands in for.
    pub target: Option<NodeId>,
}

/// Axis-aligned box used for network bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Box centre.
    pub centre: Vec3,
    /// Full size along each axis.
    pub size: Vec3,
}

impl Bounds {
    /// Create bounds from centre and size.
    pub fn new(centre: Vec3, size: Vec3) -> Self {
        Self { centre, size }
    }

    /// Inclusive containment test.
    pub fn contains(&self, point: Vec3) -> bool {
        let extents = self.size.abs() * 0.5;
        let min = self.centre - extents;
        let max = self.centre + extents;
        point.cmpge(min).all() && point.cmple(max).all()
    }
}
