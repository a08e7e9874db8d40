//! Procedural geometry.
//!
//! Generates vertex/index data for UV spheres and flat planes. Both follow the
//! usual conventions for these primitives: counter-clockwise front faces,
//! outward normals and `(0,0)` texture coordinate at the top left.

use std::f32::consts::PI;

use crate::data_structures::model::ModelVertex;

#[derive(Clone, Debug, Default)]
pub struct Geometry {
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
}

/// A UV sphere with `width_segments` slices around Y and `height_segments`
/// stacks from pole to pole.
pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Geometry {
    let width_segments = width_segments.max(3);
    let height_segments = height_segments.max(2);

    let mut vertices = Vec::with_capacity(((width_segments + 1) * (height_segments + 1)) as usize);
    for iy in 0..=height_segments {
        let v = iy as f32 / height_segments as f32;
        let theta = v * PI;
        for ix in 0..=width_segments {
            let u = ix as f32 / width_segments as f32;
            let phi = u * 2.0 * PI;
            let normal = [
                -phi.cos() * theta.sin(),
                theta.cos(),
                phi.sin() * theta.sin(),
            ];
            vertices.push(ModelVertex {
                position: [normal[0] * radius, normal[1] * radius, normal[2] * radius],
                tex_coords: [u, v],
                normal,
            });
        }
    }

    let row = width_segments + 1;
    let mut indices = Vec::new();
    for iy in 0..height_segments {
        for ix in 0..width_segments {
            let a = iy * row + ix + 1;
            let b = iy * row + ix;
            let c = (iy + 1) * row + ix;
            let d = (iy + 1) * row + ix + 1;
            // the pole rows collapse to a point, skip their degenerate halves
            if iy != 0 {
                indices.extend_from_slice(&[a, b, d]);
            }
            if iy != height_segments - 1 {
                indices.extend_from_slice(&[b, c, d]);
            }
        }
    }

    Geometry { vertices, indices }
}

/// A single-quad plane of `width` x `height` in the XY plane facing +Z.
pub fn plane(width: f32, height: f32) -> Geometry {
    let (hw, hh) = (width / 2.0, height / 2.0);
    let normal = [0.0, 0.0, 1.0];
    let vertices = vec![
        ModelVertex {
            position: [-hw, hh, 0.0],
            tex_coords: [0.0, 0.0],
            normal,
        },
        ModelVertex {
            position: [hw, hh, 0.0],
            tex_coords: [1.0, 0.0],
            normal,
        },
        ModelVertex {
            position: [-hw, -hh, 0.0],
            tex_coords: [0.0, 1.0],
            normal,
        },
        ModelVertex {
            position: [hw, -hh, 0.0],
            tex_coords: [1.0, 1.0],
            normal,
        },
    ];
    let indices = vec![0, 2, 1, 2, 3, 1];
    Geometry { vertices, indices }
}

impl Geometry {
    /// Multiply texture coordinates, for repeating textures across a surface.
    pub fn repeat_uvs(mut self, repeat: [f32; 2]) -> Self {
        self.vertices.iter_mut().for_each(|v| {
            v.tex_coords = [v.tex_coords[0] * repeat[0], v.tex_coords[1] * repeat[1]];
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use cgmath::InnerSpace;

    use super::*;

    #[test]
    fn sky_sphere_has_expected_counts() {
        let g = sphere(5000.0, 16, 16);
        assert_eq!(g.vertices.len(), 17 * 17);
        // two triangles per quad minus one per quad on each pole row
        assert_eq!(g.indices.len(), (16 * 16 * 2 - 2 * 16) * 3);
        assert!(g.indices.iter().all(|&i| (i as usize) < g.vertices.len()));
    }

    #[test]
    fn sphere_vertices_sit_on_the_radius() {
        let g = sphere(10.0, 8, 6);
        for v in &g.vertices {
            let p: cgmath::Vector3<f32> = v.position.into();
            assert!((p.magnitude() - 10.0).abs() < 1e-3);
        }
    }

    #[test]
    fn sphere_front_faces_point_outwards() {
        let g = sphere(1.0, 8, 6);
        for tri in g.indices.chunks(3) {
            let p = |i: u32| cgmath::Vector3::from(g.vertices[i as usize].position);
            let (a, b, c) = (p(tri[0]), p(tri[1]), p(tri[2]));
            let face_normal = (b - a).cross(c - a);
            let centre = (a + b + c) / 3.0;
            assert!(face_normal.dot(centre) > 0.0);
        }
    }

    #[test]
    fn plane_is_a_counter_clockwise_quad() {
        let g = plane(50.0, 50.0);
        assert_eq!(g.vertices.len(), 4);
        assert_eq!(g.indices.len(), 6);
        let p = |i: u32| cgmath::Vector3::from(g.vertices[i as usize].position);
        let n = (p(g.indices[1]) - p(g.indices[0])).cross(p(g.indices[2]) - p(g.indices[0]));
        assert!(n.z > 0.0);
        assert_eq!(g.vertices[3].position, [25.0, -25.0, 0.0]);
    }

    #[test]
    fn repeat_scales_texture_coordinates() {
        let g = plane(1.0, 1.0).repeat_uvs([2.0, 3.0]);
        assert_eq!(g.vertices[3].tex_coords, [2.0, 3.0]);
    }
}
