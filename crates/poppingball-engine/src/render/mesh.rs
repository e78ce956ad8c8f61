//! Built-in meshes in clip space. Triangles wind clockwise (front-facing).

use std::f32::consts::TAU;

use super::Vertex;

const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// A single triangle spanning the middle of the viewport.
pub fn triangle() -> [Vertex; 3] {
    [
        Vertex::new([0.0, 0.5, 0.0], [1.0, 0.0, 0.0, 1.0]),
        Vertex::new([0.5, -0.5, 0.0], [0.0, 1.0, 0.0, 1.0]),
        Vertex::new([-0.5, -0.5, 0.0], [0.0, 0.0, 1.0, 1.0]),
    ]
}

/// Unit circle around the origin as a triangle list fan of `segments` slices.
///
/// `segments` below 3 is raised to 3.
pub fn circle(segments: u32) -> Vec<Vertex> {
    let segments = segments.max(3);
    let rim = |i: u32| {
        // Negative angles walk the rim clockwise.
        let a = -TAU * i as f32 / segments as f32;
        Vertex::new([a.cos(), a.sin(), 0.0], WHITE)
    };

    let center = Vertex::new([0.0, 0.0, 0.0], WHITE);
    let mut out = Vec::with_capacity(segments as usize * 3);
    for i in 0..segments {
        out.push(center);
        out.push(rim(i));
        out.push(rim(i + 1));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Twice the signed area; negative for clockwise winding with +Y up.
    fn winding(tri: &[Vertex]) -> f32 {
        let [a, b, c] = [tri[0].position, tri[1].position, tri[2].position];
        (b[0] - a[0]) * (c[1] - a[1]) - (c[0] - a[0]) * (b[1] - a[1])
    }

    #[test]
    fn triangle_is_clockwise() {
        assert!(winding(&triangle()) < 0.0);
    }

    #[test]
    fn circle_slices_are_clockwise() {
        let mesh = circle(12);
        assert_eq!(mesh.len(), 36);
        assert!(mesh.chunks(3).all(|tri| winding(tri) < 0.0));
    }

    #[test]
    fn circle_rim_has_unit_radius() {
        for v in circle(8).iter().skip(1).step_by(3) {
            let [x, y, _] = v.position;
            assert!(((x * x + y * y).sqrt() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn too_few_segments_clamped() {
        assert_eq!(circle(0).len(), 9);
        assert_eq!(circle(2).len(), 9);
    }
}
