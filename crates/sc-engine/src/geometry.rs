//! Quad reconstruction from triangulated meshes and area-light synthesis.

use std::collections::HashSet;

use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Raw triangle mesh: vertex positions plus a flat index list, three indices
/// per triangle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshData {
    /// Vertex positions.
    pub vertices: Vec<Vec3>,
    /// Triangle indices into `vertices`.
    pub triangles: Vec<u32>,
}

impl MeshData {
    /// Build a mesh from vertices and triangle indices.
    pub fn new(vertices: Vec<Vec3>, triangles: Vec<u32>) -> Self {
        Self {
            vertices,
            triangles,
        }
    }

    /// Number of complete triangles.
    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / 3
    }

    fn triangle(&self, index: usize) -> Option<[u32; 3]> {
        let base = index * 3;
        let tri = [
            *self.triangles.get(base)?,
            *self.triangles.get(base + 1)?,
            *self.triangles.get(base + 2)?,
        ];
        tri.iter()
            .all(|&i| (i as usize) < self.vertices.len())
            .then_some(tri)
    }

    fn vertex(&self, index: u32) -> Vec3 {
        self.vertices[index as usize]
    }
}

/// Four corners of a reconstructed quad and the facing normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    /// Corners in winding order.
    pub corners: [Vec3; 4],
    /// Unit normal of the first triangle.
    pub normal: Vec3,
}

/// Pair triangles that share an edge into quads.
///
/// Two triangles share an edge when one walks it as `(a, b)` and the other as
/// `(b, a)`. Triangles are visited in index order; each pairs with the first
/// later unused match and belongs to at most one quad. Triangles with
/// out-of-range indices are skipped.
pub fn pair_quads(mesh: &MeshData) -> Vec<Quad> {
    let count = mesh.triangle_count();
    let mut used = HashSet::new();
    let mut quads = Vec::new();

    for i in 0..count {
        if used.contains(&i) {
            continue;
        }
        let Some(tri1) = mesh.triangle(i) else {
            log::warn!("triangle {i} references a missing vertex, skipped");
            continue;
        };

        'search: for j in (i + 1)..count {
            if used.contains(&j) {
                continue;
            }
            let Some(tri2) = mesh.triangle(j) else {
                continue;
            };
            for t1 in 0..3 {
                let e1 = tri1[t1];
                let e2 = tri1[(t1 + 1) % 3];
                for t2 in 0..3 {
                    let he1 = tri2[t2];
                    let he2 = tri2[(t2 + 1) % 3];
                    if he1 == e2 && he2 == e1 {
                        used.insert(i);
                        used.insert(j);
                        let e3 = tri1[(t1 + 2) % 3];
                        let he3 = tri2[(t2 + 2) % 3];
                        quads.push(Quad {
                            corners: [
                                mesh.vertex(e2),
                                mesh.vertex(e3),
                                mesh.vertex(e1),
                                mesh.vertex(he3),
                            ],
                            normal: triangle_normal(
                                mesh.vertex(tri1[0]),
                                mesh.vertex(tri1[1]),
                                mesh.vertex(tri1[2]),
                            ),
                        });
                        break 'search;
                    }
                }
            }
        }
    }
    quads
}

/// Unit normal of a triangle, zero for degenerate triangles.
pub fn triangle_normal(p1: Vec3, p2: Vec3, p3: Vec3) -> Vec3 {
    (p2 - p1).cross(p3 - p1).normalize_or_zero()
}

/// Rotation whose forward (+Z) axis points along `forward` with +Y as close
/// to `up` as possible. Degenerate input yields the identity.
pub fn look_rotation(forward: Vec3, up: Vec3) -> Quat {
    let z = forward.normalize_or_zero();
    if z == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    let x = up.cross(z).normalize_or_zero();
    if x == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    let y = z.cross(x);
    Quat::from_mat3(&Mat3::from_cols(x, y, z))
}

/// A baked rectangular light synthesized from a quad.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaLight {
    /// Center of the quad, in the mesh's local space.
    pub position: Vec3,
    /// Facing rotation.
    pub rotation: Quat,
    /// Length of the first quad edge.
    pub width: f32,
    /// Length of the second quad edge.
    pub height: f32,
    /// Light intensity.
    pub intensity: f32,
    /// Whether the light is baked into lightmaps rather than realtime.
    pub baked: bool,
}

impl AreaLight {
    /// Intensity given to lights synthesized from tagged geometry.
    pub const QUAD_INTENSITY: f32 = 3.0;

    /// Fit a light to a quad.
    pub fn from_quad(quad: &Quad) -> Self {
        let [q0, q1, q2, q3] = quad.corners;
        let right = (q1 - q0).normalize_or_zero();
        Self {
            position: (q0 + q1 + q2 + q3) / 4.0,
            rotation: look_rotation(quad.normal, right),
            width: q0.distance(q1),
            height: q1.distance(q2),
            intensity: Self::QUAD_INTENSITY,
            baked: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> MeshData {
        MeshData::new(
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            vec![0, 1, 2, 2, 3, 0],
        )
    }

    #[test]
    fn two_triangles_sharing_an_edge_form_one_quad() {
        let quads = pair_quads(&unit_square());
        assert_eq!(quads.len(), 1);
        let quad = quads[0];
        // Shared edge is 2->0 in the first triangle and 0->2 in the second.
        assert_eq!(
            quad.corners,
            [
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ]
        );
        assert_eq!(quad.normal, Vec3::Z);
    }

    #[test]
    fn same_direction_edges_do_not_pair() {
        let mesh = MeshData::new(unit_square().vertices, vec![0, 1, 2, 2, 0, 3]);
        assert!(pair_quads(&mesh).is_empty());
    }

    #[test]
    fn each_triangle_joins_at_most_one_quad() {
        // Triangle 0 shares an edge with both 1 and 2; only the first pairs.
        let mesh = MeshData::new(
            vec![
                Vec3::ZERO,
                Vec3::X,
                Vec3::Y,
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(-1.0, 0.0, 0.0),
            ],
            vec![0, 1, 2, 2, 1, 3, 0, 2, 4],
        );
        assert_eq!(pair_quads(&mesh).len(), 1);
    }

    #[test]
    fn out_of_range_indices_are_skipped() {
        let mesh = MeshData::new(vec![Vec3::ZERO, Vec3::X], vec![0, 1, 9, 1, 0, 9]);
        assert!(pair_quads(&mesh).is_empty());
    }

    #[test]
    fn area_light_is_centered_and_sized() {
        let quad = pair_quads(&MeshData::new(
            vec![
                Vec3::ZERO,
                Vec3::new(2.0, 0.0, 0.0),
                Vec3::new(2.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            vec![0, 1, 2, 2, 3, 0],
        ))[0];
        let light = AreaLight::from_quad(&quad);
        assert_eq!(light.position, Vec3::new(1.0, 0.5, 0.0));
        assert!((light.width - 2.0).abs() < 1e-6);
        assert!((light.height - 1.0).abs() < 1e-6);
        assert_eq!(light.intensity, 3.0);
        assert!(light.baked);
        let forward = light.rotation * Vec3::Z;
        assert!((forward - Vec3::Z).length() < 1e-5);
        let up = light.rotation * Vec3::Y;
        assert!((up - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn look_rotation_degenerates_to_identity() {
        assert_eq!(look_rotation(Vec3::ZERO, Vec3::Y), Quat::IDENTITY);
        assert_eq!(look_rotation(Vec3::Y, Vec3::Y), Quat::IDENTITY);
    }
}
