//! Bounding boxes from flattened meshes.

use nalgebra::{Matrix4, Point3};

use super::engine::FlatMesh;
use crate::error::EngineError;
use crate::model::BoundingBox;

/// Floats per vertex in engine buffers: position then normal.
pub const VERTEX_STRIDE: usize = 6;

/// Applies each placement to its vertex positions and folds the results
/// into one world-space box.
pub fn mesh_bounds(mesh: &FlatMesh) -> Result<BoundingBox, EngineError> {
    let mut bbox = BoundingBox::default();

    for placed in &mesh.geometries {
        if placed.vertex_data.len() % VERTEX_STRIDE != 0 {
            return Err(EngineError::Unsupported {
                message: format!(
                    "vertex buffer of #{} has {} floats, not a multiple of {VERTEX_STRIDE}",
                    mesh.express_id,
                    placed.vertex_data.len()
                ),
            });
        }

        let transform = Matrix4::from_column_slice(&placed.transform);
        for vertex in placed.vertex_data.chunks_exact(VERTEX_STRIDE) {
            let local = Point3::new(
                f64::from(vertex[0]),
                f64::from(vertex[1]),
                f64::from(vertex[2]),
            );
            let world = transform.transform_point(&local);
            bbox.include([world.x, world.y, world.z]);
        }
    }

    Ok(bbox)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ifc::engine::PlacedGeometry;
    use approx::assert_relative_eq;

    const IDENTITY: [f64; 16] = [
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ];

    fn placed(positions: &[[f32; 3]], transform: [f64; 16]) -> PlacedGeometry {
        let vertex_data = positions
            .iter()
            .flat_map(|p| [p[0], p[1], p[2], 0.0, 0.0, 1.0])
            .collect();
        PlacedGeometry {
            vertex_data,
            index_data: vec![],
            transform,
        }
    }

    #[test]
    fn translation_lives_in_the_last_column() {
        let mut transform = IDENTITY;
        transform[12] = 10.0;
        transform[13] = 20.0;
        transform[14] = 3.0;
        let mesh = FlatMesh {
            express_id: 1,
            geometries: vec![placed(&[[0.0, 0.0, 0.0], [1.0, 2.0, 3.0]], transform)],
        };

        let bbox = mesh_bounds(&mesh).unwrap();
        assert_eq!(bbox.min(), Some([10.0, 20.0, 3.0]));
        assert_eq!(bbox.max(), Some([11.0, 22.0, 6.0]));
        assert_eq!(bbox.centroid(), Some([10.5, 21.0, 4.5]));
    }

    #[test]
    fn rotation_is_applied_before_folding() {
        // 90 degrees about Z: x -> y, y -> -x
        let transform = [
            0.0, 1.0, 0.0, 0.0, //
            -1.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ];
        let mesh = FlatMesh {
            express_id: 2,
            geometries: vec![
                placed(&[[2.0, 0.0, 0.0]], transform),
                placed(&[[-1.0, -1.0, 5.0]], IDENTITY),
            ],
        };

        let bbox = mesh_bounds(&mesh).unwrap();
        let min = bbox.min().unwrap();
        let max = bbox.max().unwrap();
        assert_relative_eq!(min[0], -1.0);
        assert_relative_eq!(min[1], -1.0);
        assert_relative_eq!(max[1], 2.0);
        assert_relative_eq!(max[2], 5.0);
    }

    #[test]
    fn empty_mesh_gives_empty_box() {
        let bbox = mesh_bounds(&FlatMesh::default()).unwrap();
        assert!(bbox.is_empty());
    }

    #[test]
    fn ragged_buffer_is_an_error() {
        let mesh = FlatMesh {
            express_id: 3,
            geometries: vec![PlacedGeometry {
                vertex_data: vec![0.0; 7],
                index_data: vec![],
                transform: IDENTITY,
            }],
        };
        assert!(mesh_bounds(&mesh).is_err());
    }
}
