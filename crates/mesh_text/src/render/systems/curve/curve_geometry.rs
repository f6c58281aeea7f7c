//! Triangulated curve outlines
//!
//! Three parallel arrays, laid out for std430 storage buffers: vertex
//! positions (`vec2`), triangle corner indices (`uvec3`, padded to 16 bytes)
//! and one primitive kind per triangle (`uint`).

use bytemuck::{Pod, Zeroable};

/// Triangles the curve mesh shader emits per instance
pub const MAX_CURVE_TRIANGLES: usize = 32;

/// How the fragment stage treats a triangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum PrimitiveKind {
    /// Interior triangle, filled completely
    Solid = 0,
    /// Quadratic bulging out of the shape; keeps the side inside the curve
    Convex = 1,
    /// Quadratic bending into the shape; keeps the side outside the curve
    Concave = 2,
}

/// Corner indices of one triangle, as a std430 `uvec3`
///
/// Corner order matters for curved triangles: start point, control point,
/// end point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct CurveTriangle {
    /// Vertex indices
    pub corners: [u32; 3],
    /// std430 padding
    pub _pad: u32,
}

impl CurveTriangle {
    /// Triangle over three vertex indices
    pub const fn new(a: u32, b: u32, c: u32) -> Self {
        Self {
            corners: [a, b, c],
            _pad: 0,
        }
    }
}

/// Errors for malformed curve geometry
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CurveError {
    /// No triangles at all
    #[error("Curve geometry has no triangles")]
    Empty,

    /// More triangles than one mesh workgroup can emit
    #[error("Curve geometry has {count} triangles, at most {max} fit in one workgroup")]
    TooManyTriangles {
        /// Triangles supplied
        count: usize,
        /// Per-workgroup limit
        max: usize,
    },

    /// A corner refers to a vertex that doesn't exist
    #[error("Triangle {triangle} refers to vertex {index}, but there are only {vertex_count}")]
    IndexOutOfRange {
        /// Offending triangle
        triangle: usize,
        /// Offending index
        index: u32,
        /// Number of positions
        vertex_count: usize,
    },
}

/// Positions, triangles and primitive kinds of one outline
#[derive(Debug, Clone, PartialEq)]
pub struct CurveGeometry {
    positions: Vec<[f32; 2]>,
    triangles: Vec<CurveTriangle>,
    kinds: Vec<u32>,
}

impl CurveGeometry {
    /// Check and pack a triangulated outline
    pub fn new(positions: Vec<[f32; 2]>, triangles: &[([u32; 3], PrimitiveKind)]) -> Result<Self, CurveError> {
        if triangles.is_empty() {
            return Err(CurveError::Empty);
        }
        if triangles.len() > MAX_CURVE_TRIANGLES {
            return Err(CurveError::TooManyTriangles {
                count: triangles.len(),
                max: MAX_CURVE_TRIANGLES,
            });
        }

        for (triangle, (corners, _)) in triangles.iter().enumerate() {
            if let Some(&index) = corners.iter().find(|&&i| i as usize >= positions.len()) {
                return Err(CurveError::IndexOutOfRange {
                    triangle,
                    index,
                    vertex_count: positions.len(),
                });
            }
        }

        Ok(Self::pack(positions, triangles))
    }

    /// Closing parenthesis from the Loop-Blinn paper, spanning -1..1 vertically
    ///
    /// Two convex quadratics form the outer edge, two concave ones the inner
    /// edge, and six solid triangles fill the space between.
    pub fn closing_paren() -> Self {
        use PrimitiveKind::{Concave, Convex, Solid};

        let positions = vec![
            [0.000, -1.00],
            [0.150, -0.50],
            [0.150, 0.00],
            [0.150, 0.50],
            [0.000, 1.00],
            [-0.300, 1.00],
            [-0.165, 0.50],
            [-0.165, 0.00],
            [-0.165, -0.50],
            [-0.300, -1.00],
        ];
        let triangles = [
            ([0, 1, 2], Convex),
            ([2, 3, 4], Convex),
            ([5, 6, 7], Concave),
            ([7, 8, 9], Concave),
            ([4, 5, 6], Solid),
            ([4, 6, 2], Solid),
            ([6, 7, 2], Solid),
            ([7, 8, 2], Solid),
            ([2, 8, 0], Solid),
            ([9, 0, 8], Solid),
        ];

        Self::pack(positions, &triangles)
    }

    fn pack(positions: Vec<[f32; 2]>, triangles: &[([u32; 3], PrimitiveKind)]) -> Self {
        Self {
            positions,
            triangles: triangles.iter().map(|&([a, b, c], _)| CurveTriangle::new(a, b, c)).collect(),
            kinds: triangles.iter().map(|&(_, kind)| kind as u32).collect(),
        }
    }

    /// Vertex positions in shape space
    pub fn positions(&self) -> &[[f32; 2]] {
        &self.positions
    }

    /// Padded triangle records
    pub fn triangles(&self) -> &[CurveTriangle] {
        &self.triangles
    }

    /// Primitive kind per triangle, as the shader reads it
    pub fn kinds(&self) -> &[u32] {
        &self.kinds
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangle_uses_std430_uvec3_stride() {
        assert_eq!(std::mem::size_of::<CurveTriangle>(), 16);

        let geometry = CurveGeometry::closing_paren();
        let bytes: &[u8] = bytemuck::cast_slice(geometry.triangles());
        assert_eq!(bytes.len(), 10 * 16);
        // Second triangle starts at byte 16 with corner 2
        assert_eq!(&bytes[16..20], &2u32.to_ne_bytes());
        assert_eq!(&bytes[28..32], &0u32.to_ne_bytes());
    }

    #[test]
    fn test_closing_paren_is_valid_geometry() {
        let paren = CurveGeometry::closing_paren();
        let triangles: Vec<_> = paren
            .triangles()
            .iter()
            .zip(paren.kinds())
            .map(|(t, &k)| {
                let kind = match k {
                    0 => PrimitiveKind::Solid,
                    1 => PrimitiveKind::Convex,
                    _ => PrimitiveKind::Concave,
                };
                (t.corners, kind)
            })
            .collect();

        let rebuilt = CurveGeometry::new(paren.positions().to_vec(), &triangles).unwrap();
        assert_eq!(rebuilt, paren);
        assert_eq!(paren.kinds(), &[1, 1, 2, 2, 0, 0, 0, 0, 0, 0]);
        assert!(paren.positions().iter().all(|p| p[1].abs() <= 1.0));
    }

    #[test]
    fn test_out_of_range_corner_is_error() {
        let result = CurveGeometry::new(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]], &[
            ([0, 1, 2], PrimitiveKind::Solid),
            ([0, 3, 2], PrimitiveKind::Convex),
        ]);
        assert_eq!(
            result,
            Err(CurveError::IndexOutOfRange {
                triangle: 1,
                index: 3,
                vertex_count: 3
            })
        );
    }

    #[test]
    fn test_triangle_count_limits() {
        let positions = vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        assert_eq!(CurveGeometry::new(positions.clone(), &[]), Err(CurveError::Empty));

        let too_many = vec![([0, 1, 2], PrimitiveKind::Solid); MAX_CURVE_TRIANGLES + 1];
        assert!(matches!(
            CurveGeometry::new(positions.clone(), &too_many),
            Err(CurveError::TooManyTriangles { count: 33, max: 32 })
        ));

        let at_limit = vec![([0, 1, 2], PrimitiveKind::Solid); MAX_CURVE_TRIANGLES];
        assert_eq!(CurveGeometry::new(positions, &at_limit).unwrap().triangle_count(), 32);
    }
}
