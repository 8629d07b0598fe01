//! Built-in engine that reads IFC STEP text directly.
//!
//! Meshes are produced for the explicit geometry kinds common in exported
//! models: extruded profiles, triangulated face sets, faceted breps and
//! mapped items. Other representation items are skipped.

use nalgebra::{Matrix4, Point3, Vector3};
use std::collections::{HashMap, HashSet};
use tracing::{trace, warn};

use super::engine::{
    FlatMesh, GeometryEngine, LineRecord, ModelId, PlacedGeometry, PropertyItem,
    PropertySetRecord, SpatialNode,
};
use super::schema::{self, attr};
use super::value::{FieldValue, IfcValue};
use crate::error::EngineError;
use crate::parser::step::{StepEntity, StepFile, StepValue};

/// Placement chains deeper than this are treated as cyclic.
const MAX_PLACEMENT_DEPTH: usize = 64;
const MAX_ITEM_DEPTH: usize = 8;
const CIRCLE_SEGMENTS: usize = 16;

/// Decomposition relations: (entity, parent attribute, children attribute).
const DECOMPOSITIONS: &[(&str, usize, usize)] = &[
    ("IFCRELAGGREGATES", 4, 5),
    ("IFCRELNESTS", 4, 5),
    ("IFCRELCONTAINEDINSPATIALSTRUCTURE", 5, 4),
];

/// Representation identifiers that describe the solid body.
const BODY_IDENTIFIERS: &[&str] = &["Body", "Facetation"];

#[derive(Debug)]
pub struct StepEngine {
    models: HashMap<i32, StepModel>,
    next_handle: i32,
}

impl StepEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            models: HashMap::new(),
            next_handle: 1,
        }
    }

    fn model(&self, model: ModelId) -> Result<&StepModel, EngineError> {
        self.models
            .get(&model.0)
            .ok_or(EngineError::ModelNotOpen { handle: model.0 })
    }
}

impl Default for StepEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GeometryEngine for StepEngine {
    fn open_model(&mut self, data: &[u8]) -> ModelId {
        let text = String::from_utf8_lossy(data);
        match StepFile::parse(&text) {
            Ok(file) => {
                let handle = self.next_handle;
                self.next_handle += 1;
                self.models.insert(handle, StepModel::new(file));
                ModelId(handle)
            }
            Err(err) => {
                warn!(error = %err, "STEP payload rejected");
                ModelId(0)
            }
        }
    }

    fn close_model(&mut self, model: ModelId) {
        self.models.remove(&model.0);
    }

    fn dispose(&mut self) {
        self.models.clear();
    }

    fn schema(&self, model: ModelId) -> Option<String> {
        let schema = &self.model(model).ok()?.file.schema;
        (!schema.is_empty()).then(|| schema.clone())
    }

    fn line_ids_with_type(&self, model: ModelId, type_code: &str) -> Vec<u64> {
        let Ok(model) = self.model(model) else {
            return Vec::new();
        };
        let mut ids: Vec<u64> = schema::expand_subtypes(type_code)
            .into_iter()
            .flat_map(|code| model.file.ids_by_type(code).iter().copied())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    fn line(&self, model: ModelId, express_id: u64) -> Option<LineRecord> {
        self.model(model).ok()?.line(express_id)
    }

    fn spatial_structure(&self, model: ModelId) -> Option<SpatialNode> {
        self.model(model).ok()?.spatial_structure()
    }

    fn property_sets(
        &self,
        model: ModelId,
        express_id: u64,
    ) -> Result<Vec<PropertySetRecord>, EngineError> {
        self.model(model)?.property_sets(express_id)
    }

    fn flat_mesh(&self, model: ModelId, express_id: u64) -> Result<FlatMesh, EngineError> {
        self.model(model)?.flat_mesh(express_id)
    }
}

/// Vertices of one representation item, in the product's local frame.
struct MeshPart {
    positions: Vec<Point3<f64>>,
    indices: Vec<u32>,
}

impl MeshPart {
    fn placed(self, transform: [f64; 16]) -> PlacedGeometry {
        // Normals are left zeroed; only positions are consumed.
        let vertex_data = self
            .positions
            .iter()
            .flat_map(|p| [p.x as f32, p.y as f32, p.z as f32, 0.0, 0.0, 0.0])
            .collect();
        PlacedGeometry {
            vertex_data,
            index_data: self.indices,
            transform,
        }
    }
}

#[derive(Debug)]
struct StepModel {
    file: StepFile,
    /// Object id to the property definitions attached to it.
    definitions: HashMap<u64, Vec<u64>>,
    /// Spatial or element id to its decomposed or contained children.
    children: HashMap<u64, Vec<u64>>,
}

impl StepModel {
    fn new(file: StepFile) -> Self {
        let mut definitions: HashMap<u64, Vec<u64>> = HashMap::new();
        for rel in file.get_entities_by_type("IFCRELDEFINESBYPROPERTIES") {
            // IFC4 allows a set of definitions here.
            let defs: Vec<u64> = match rel.get(5) {
                Some(StepValue::Reference(id)) => vec![*id],
                _ => rel.references(5),
            };
            for object in rel.references(4) {
                definitions.entry(object).or_default().extend(&defs);
            }
        }

        let mut children: HashMap<u64, Vec<u64>> = HashMap::new();
        for (relation, parent_index, children_index) in DECOMPOSITIONS {
            for rel in file.get_entities_by_type(relation) {
                if let Some(parent) = rel.reference(*parent_index) {
                    children
                        .entry(parent)
                        .or_default()
                        .extend(rel.references(*children_index));
                }
            }
        }

        Self {
            file,
            definitions,
            children,
        }
    }

    fn entity(&self, id: u64) -> Result<&StepEntity, EngineError> {
        self.file
            .get_entity(id)
            .ok_or(EngineError::MissingEntity { id })
    }

    fn line(&self, id: u64) -> Option<LineRecord> {
        let entity = self.file.get_entity(id)?;
        let text = |index: usize| entity.string(index).map(str::to_string);

        let predefined_type = schema::predefined_type_index(&entity.entity_type, &self.file.schema)
            .and_then(|index| entity.get(index))
            .and_then(StepValue::as_enum)
            .filter(|value| !matches!(*value, "NOTDEFINED" | "USERDEFINED"))
            .map(str::to_string);

        Some(LineRecord {
            express_id: id,
            type_code: entity.entity_type.clone(),
            global_id: text(attr::GLOBAL_ID),
            name: text(attr::NAME),
            description: text(attr::DESCRIPTION),
            object_type: text(attr::OBJECT_TYPE),
            predefined_type,
        })
    }

    // Spatial structure

    fn spatial_structure(&self) -> Option<SpatialNode> {
        let root = *self.file.ids_by_type("IFCPROJECT").first()?;
        let mut visited = HashSet::from([root]);
        Some(self.spatial_node(root, &mut visited))
    }

    fn spatial_node(&self, id: u64, visited: &mut HashSet<u64>) -> SpatialNode {
        let entity = self.file.get_entity(id);
        let mut children = Vec::new();
        for &child in self.children.get(&id).into_iter().flatten() {
            if visited.insert(child) {
                children.push(self.spatial_node(child, visited));
            }
        }
        SpatialNode {
            express_id: id,
            type_code: entity.map(|e| e.entity_type.clone()).unwrap_or_default(),
            name: entity
                .and_then(|e| e.string(attr::NAME))
                .map(str::to_string),
            children,
        }
    }

    // Property sets

    fn property_sets(&self, id: u64) -> Result<Vec<PropertySetRecord>, EngineError> {
        let mut sets = Vec::new();
        for &definition_id in self.definitions.get(&id).into_iter().flatten() {
            let definition = self.entity(definition_id)?;
            let items_index = match definition.entity_type.as_str() {
                "IFCPROPERTYSET" => 4,
                "IFCELEMENTQUANTITY" => 5,
                _ => continue,
            };
            let items = definition
                .references(items_index)
                .into_iter()
                .map(|item_id| self.property_item(item_id))
                .collect::<Result<Vec<_>, _>>()?;
            sets.push(PropertySetRecord {
                express_id: definition_id,
                name: definition.string(attr::NAME).map(str::to_string),
                items,
            });
        }
        Ok(sets)
    }

    fn property_item(&self, id: u64) -> Result<PropertyItem, EngineError> {
        let item = self.entity(id)?;
        let name = item.string(0).map(str::to_string);
        let Some(layout) = schema::item_layout(&item.entity_type) else {
            return Ok(PropertyItem {
                name,
                fields: Vec::new(),
                unit: None,
            });
        };

        let fields = layout
            .fields
            .iter()
            .filter_map(|(field, index)| {
                item.get(*index).map(|value| FieldValue {
                    field: *field,
                    value: IfcValue::from(value),
                    raw: value.to_string(),
                })
            })
            .collect();
        let unit = layout
            .unit
            .and_then(|index| item.reference(index))
            .and_then(|unit_id| self.unit_label(unit_id));

        Ok(PropertyItem { name, fields, unit })
    }

    fn unit_label(&self, id: u64) -> Option<String> {
        let unit = self.file.get_entity(id)?;
        match unit.entity_type.as_str() {
            "IFCSIUNIT" => {
                let name = unit.get(3)?.as_enum()?;
                let prefix = unit.get(2).and_then(StepValue::as_enum).unwrap_or("");
                Some(format!("{prefix}{name}"))
            }
            "IFCCONVERSIONBASEDUNIT" | "IFCCONTEXTDEPENDENTUNIT" => {
                unit.string(2).map(str::to_string)
            }
            _ => None,
        }
    }

    // Geometry

    fn flat_mesh(&self, id: u64) -> Result<FlatMesh, EngineError> {
        let product = self.entity(id)?;
        let mut mesh = FlatMesh {
            express_id: id,
            geometries: Vec::new(),
        };

        let Some(shape_id) = product.reference(attr::REPRESENTATION) else {
            return Ok(mesh);
        };
        let placement = match product.reference(attr::OBJECT_PLACEMENT) {
            Some(placement_id) => self.placement_matrix(placement_id, 0)?,
            None => Matrix4::identity(),
        };
        let transform = column_major(&placement);

        let shape = self.entity(shape_id)?;
        for representation in self.body_representations(&shape.references(2))? {
            for item in representation.references(3) {
                for part in self.item_parts(item, &Matrix4::identity(), 0)? {
                    mesh.geometries.push(part.placed(transform));
                }
            }
        }

        Ok(mesh)
    }

    /// Body representations, or every representation when none is
    /// labelled as a body.
    fn body_representations(&self, ids: &[u64]) -> Result<Vec<&StepEntity>, EngineError> {
        let representations = ids
            .iter()
            .map(|id| self.entity(*id))
            .collect::<Result<Vec<_>, _>>()?;
        let bodies: Vec<&StepEntity> = representations
            .iter()
            .copied()
            .filter(|r| r.string(1).is_some_and(|ident| BODY_IDENTIFIERS.contains(&ident)))
            .collect();
        Ok(if bodies.is_empty() {
            representations
        } else {
            bodies
        })
    }

    fn item_parts(
        &self,
        id: u64,
        local: &Matrix4<f64>,
        depth: usize,
    ) -> Result<Vec<MeshPart>, EngineError> {
        if depth >= MAX_ITEM_DEPTH {
            return Err(EngineError::Unsupported {
                message: format!("representation item #{id} nests too deeply"),
            });
        }

        let item = self.entity(id)?;
        match item.entity_type.as_str() {
            "IFCEXTRUDEDAREASOLID" => Ok(vec![self.extrusion(item, local)?]),
            "IFCTRIANGULATEDFACESET" => Ok(vec![self.triangulated(item, local)?]),
            "IFCFACETEDBREP" | "IFCFACETEDBREPWITHVOIDS" => {
                Ok(vec![self.faceted_brep(item, local)?])
            }
            // The first operand bounds the result of a subtraction.
            "IFCBOOLEANRESULT" | "IFCBOOLEANCLIPPINGRESULT" => {
                let first = required_ref(item, 1)?;
                self.item_parts(first, local, depth + 1)
            }
            "IFCMAPPEDITEM" => self.mapped_item(item, local, depth),
            other => {
                trace!(item = id, entity = other, "skipping representation item");
                Ok(Vec::new())
            }
        }
    }

    fn mapped_item(
        &self,
        item: &StepEntity,
        local: &Matrix4<f64>,
        depth: usize,
    ) -> Result<Vec<MeshPart>, EngineError> {
        let source = self.entity(required_ref(item, 0)?)?;
        let origin = match source.reference(0) {
            Some(origin_id) => self.axis2_placement(origin_id)?,
            None => Matrix4::identity(),
        };
        let target = match item.reference(1) {
            Some(target_id) => self.transformation_operator(target_id)?,
            None => Matrix4::identity(),
        };
        let combined = local * target * origin;

        let representation = self.entity(required_ref(source, 1)?)?;
        let mut parts = Vec::new();
        for nested in representation.references(3) {
            parts.extend(self.item_parts(nested, &combined, depth + 1)?);
        }
        Ok(parts)
    }

    fn extrusion(&self, item: &StepEntity, local: &Matrix4<f64>) -> Result<MeshPart, EngineError> {
        let outline = self.profile_outline(required_ref(item, 0)?)?;
        let position = match item.reference(1) {
            Some(position_id) => self.axis2_placement(position_id)?,
            None => Matrix4::identity(),
        };
        let direction = self.direction(required_ref(item, 2)?)?;
        let depth = item.real(3).ok_or(EngineError::UnexpectedAttribute {
            id: item.id,
            index: 3,
            expected: "extrusion depth",
        })?;
        if direction.norm() < 1e-12 {
            return Err(EngineError::Unsupported {
                message: format!("extrusion #{} has a zero direction", item.id),
            });
        }
        let offset = direction.normalize() * depth;

        let frame = local * position;
        let count = outline.len();
        let mut positions = Vec::with_capacity(count * 2);
        positions.extend(outline.iter().map(|p| frame.transform_point(p)));
        positions.extend(outline.iter().map(|p| frame.transform_point(&(p + offset))));

        Ok(MeshPart {
            positions,
            indices: prism_indices(count),
        })
    }

    /// Closed outline of a profile in its placement plane (z = 0).
    fn profile_outline(&self, id: u64) -> Result<Vec<Point3<f64>>, EngineError> {
        let profile = self.entity(id)?;
        let outline = match profile.entity_type.as_str() {
            "IFCRECTANGLEPROFILEDEF"
            | "IFCRECTANGLEHOLLOWPROFILEDEF"
            | "IFCROUNDEDRECTANGLEPROFILEDEF" => {
                let half_x = required_real(profile, 3)? / 2.0;
                let half_y = required_real(profile, 4)? / 2.0;
                vec![
                    Point3::new(-half_x, -half_y, 0.0),
                    Point3::new(half_x, -half_y, 0.0),
                    Point3::new(half_x, half_y, 0.0),
                    Point3::new(-half_x, half_y, 0.0),
                ]
            }
            "IFCCIRCLEPROFILEDEF" | "IFCCIRCLEHOLLOWPROFILEDEF" => {
                let radius = required_real(profile, 3)?;
                (0..CIRCLE_SEGMENTS)
                    .map(|i| {
                        let angle = std::f64::consts::TAU * i as f64 / CIRCLE_SEGMENTS as f64;
                        Point3::new(radius * angle.cos(), radius * angle.sin(), 0.0)
                    })
                    .collect()
            }
            // Arbitrary profiles are already in profile coordinates.
            "IFCARBITRARYCLOSEDPROFILEDEF" | "IFCARBITRARYPROFILEDEFWITHVOIDS" => {
                return self.curve_points(required_ref(profile, 2)?);
            }
            other => {
                return Err(EngineError::Unsupported {
                    message: format!("profile {other} (#{id})"),
                })
            }
        };

        match profile.reference(2) {
            Some(position_id) => {
                let position = self.axis2_placement(position_id)?;
                Ok(outline.iter().map(|p| position.transform_point(p)).collect())
            }
            None => Ok(outline),
        }
    }

    fn curve_points(&self, id: u64) -> Result<Vec<Point3<f64>>, EngineError> {
        let curve = self.entity(id)?;
        match curve.entity_type.as_str() {
            "IFCPOLYLINE" => curve
                .references(0)
                .into_iter()
                .map(|point_id| self.point(point_id))
                .collect(),
            "IFCINDEXEDPOLYCURVE" => {
                let list = self.entity(required_ref(curve, 0)?)?;
                coordinate_list(list)
            }
            other => Err(EngineError::Unsupported {
                message: format!("profile curve {other} (#{id})"),
            }),
        }
    }

    fn triangulated(
        &self,
        item: &StepEntity,
        local: &Matrix4<f64>,
    ) -> Result<MeshPart, EngineError> {
        let coordinates = coordinate_list(self.entity(required_ref(item, 0)?)?)?;
        let count = coordinates.len();

        let mut indices = Vec::new();
        let triangles = item.get(3).and_then(StepValue::as_list).unwrap_or_default();
        for triangle in triangles {
            for corner in triangle.as_list().unwrap_or_default() {
                let index = corner
                    .as_f64()
                    .map(|one_based| one_based as usize)
                    .filter(|i| (1..=count).contains(i))
                    .ok_or(EngineError::UnexpectedAttribute {
                        id: item.id,
                        index: 3,
                        expected: "coordinate index within the point list",
                    })?;
                indices.push((index - 1) as u32);
            }
        }

        Ok(MeshPart {
            positions: coordinates
                .iter()
                .map(|p| local.transform_point(p))
                .collect(),
            indices,
        })
    }

    fn faceted_brep(
        &self,
        item: &StepEntity,
        local: &Matrix4<f64>,
    ) -> Result<MeshPart, EngineError> {
        let shell = self.entity(required_ref(item, 0)?)?;
        let mut positions = Vec::new();
        let mut indices = Vec::new();

        for face_id in shell.references(0) {
            let face = self.entity(face_id)?;
            for bound_id in face.references(0) {
                let bound = self.entity(bound_id)?;
                let polyloop = self.entity(required_ref(bound, 0)?)?;
                let base = positions.len() as u32;
                let corners = polyloop
                    .references(0)
                    .into_iter()
                    .map(|point_id| self.point(point_id))
                    .collect::<Result<Vec<_>, _>>()?;
                for i in 1..corners.len().saturating_sub(1) {
                    indices.extend([base, base + i as u32, base + i as u32 + 1]);
                }
                positions.extend(corners.iter().map(|p| local.transform_point(p)));
            }
        }

        Ok(MeshPart { positions, indices })
    }

    // Placements

    fn placement_matrix(&self, id: u64, depth: usize) -> Result<Matrix4<f64>, EngineError> {
        if depth >= MAX_PLACEMENT_DEPTH {
            return Err(EngineError::Unsupported {
                message: format!("placement chain at #{id} is cyclic or too deep"),
            });
        }
        let placement = self.entity(id)?;
        if placement.entity_type != "IFCLOCALPLACEMENT" {
            return Err(EngineError::Unsupported {
                message: format!("placement {} (#{id})", placement.entity_type),
            });
        }

        let relative = match placement.reference(1) {
            Some(axis_id) => self.axis2_placement(axis_id)?,
            None => Matrix4::identity(),
        };
        match placement.reference(0) {
            Some(parent_id) => Ok(self.placement_matrix(parent_id, depth + 1)? * relative),
            None => Ok(relative),
        }
    }

    /// `IfcAxis2Placement3D` or `IfcAxis2Placement2D` as a 4x4 transform.
    fn axis2_placement(&self, id: u64) -> Result<Matrix4<f64>, EngineError> {
        let placement = self.entity(id)?;
        let location = self.point(required_ref(placement, 0)?)?;
        let (z_axis, x_index) = match placement.entity_type.as_str() {
            "IFCAXIS2PLACEMENT3D" => {
                let z = match placement.reference(1) {
                    Some(axis_id) => self.direction(axis_id)?,
                    None => Vector3::z(),
                };
                (z, 2)
            }
            "IFCAXIS2PLACEMENT2D" => (Vector3::z(), 1),
            other => {
                return Err(EngineError::Unsupported {
                    message: format!("axis placement {other} (#{id})"),
                })
            }
        };
        let x_axis = match placement.reference(x_index) {
            Some(dir_id) => self.direction(dir_id)?,
            None => Vector3::x(),
        };
        Ok(frame_matrix(location, z_axis, x_axis, 1.0))
    }

    fn transformation_operator(&self, id: u64) -> Result<Matrix4<f64>, EngineError> {
        let operator = self.entity(id)?;
        let x_axis = match operator.reference(0) {
            Some(dir_id) => self.direction(dir_id)?,
            None => Vector3::x(),
        };
        let origin = self.point(required_ref(operator, 2)?)?;
        let scale = operator.real(3).unwrap_or(1.0);
        let z_axis = match operator.reference(4) {
            Some(dir_id) => self.direction(dir_id)?,
            None => Vector3::z(),
        };
        Ok(frame_matrix(origin, z_axis, x_axis, scale))
    }

    fn point(&self, id: u64) -> Result<Point3<f64>, EngineError> {
        let point = self.entity(id)?;
        let coords = numbers(point, 0)?;
        match coords.as_slice() {
            [x, y] => Ok(Point3::new(*x, *y, 0.0)),
            [x, y, z] => Ok(Point3::new(*x, *y, *z)),
            _ => Err(EngineError::UnexpectedAttribute {
                id,
                index: 0,
                expected: "two or three coordinates",
            }),
        }
    }

    fn direction(&self, id: u64) -> Result<Vector3<f64>, EngineError> {
        let direction = self.entity(id)?;
        let ratios = numbers(direction, 0)?;
        match ratios.as_slice() {
            [x, y] => Ok(Vector3::new(*x, *y, 0.0)),
            [x, y, z] => Ok(Vector3::new(*x, *y, *z)),
            _ => Err(EngineError::UnexpectedAttribute {
                id,
                index: 0,
                expected: "two or three direction ratios",
            }),
        }
    }
}

fn required_ref(entity: &StepEntity, index: usize) -> Result<u64, EngineError> {
    entity
        .reference(index)
        .ok_or(EngineError::UnexpectedAttribute {
            id: entity.id,
            index,
            expected: "entity reference",
        })
}

fn required_real(entity: &StepEntity, index: usize) -> Result<f64, EngineError> {
    entity.real(index).ok_or(EngineError::UnexpectedAttribute {
        id: entity.id,
        index,
        expected: "number",
    })
}

fn numbers(entity: &StepEntity, index: usize) -> Result<Vec<f64>, EngineError> {
    entity
        .get(index)
        .and_then(StepValue::as_list)
        .and_then(|items| items.iter().map(StepValue::as_f64).collect())
        .ok_or(EngineError::UnexpectedAttribute {
            id: entity.id,
            index,
            expected: "list of numbers",
        })
}

/// Points of an `IfcCartesianPointList2D`/`3D`.
fn coordinate_list(list: &StepEntity) -> Result<Vec<Point3<f64>>, EngineError> {
    let invalid = EngineError::UnexpectedAttribute {
        id: list.id,
        index: 0,
        expected: "list of coordinate tuples",
    };
    let tuples = list.get(0).and_then(StepValue::as_list).ok_or(invalid.clone())?;
    tuples
        .iter()
        .map(|tuple| {
            let coords: Option<Vec<f64>> = tuple
                .as_list()
                .and_then(|c| c.iter().map(StepValue::as_f64).collect());
            match coords.as_deref() {
                Some([x, y]) => Ok(Point3::new(*x, *y, 0.0)),
                Some([x, y, z]) => Ok(Point3::new(*x, *y, *z)),
                _ => Err(invalid.clone()),
            }
        })
        .collect()
}

/// Right-handed frame from a location, Z axis and approximate X axis.
fn frame_matrix(
    location: Point3<f64>,
    z_axis: Vector3<f64>,
    x_axis: Vector3<f64>,
    scale: f64,
) -> Matrix4<f64> {
    let z = z_axis.try_normalize(1e-12).unwrap_or_else(Vector3::z);
    let x_projected = x_axis - z * x_axis.dot(&z);
    let x = x_projected.try_normalize(1e-6).unwrap_or_else(|| {
        // X parallel to Z: pick any perpendicular
        let helper = if z.z.abs() < 0.9 {
            Vector3::z()
        } else {
            Vector3::x()
        };
        helper.cross(&z).normalize()
    });
    let y = z.cross(&x);

    let mut m = Matrix4::identity();
    for row in 0..3 {
        m[(row, 0)] = x[row] * scale;
        m[(row, 1)] = y[row] * scale;
        m[(row, 2)] = z[row] * scale;
    }
    m[(0, 3)] = location.x;
    m[(1, 3)] = location.y;
    m[(2, 3)] = location.z;
    m
}

fn column_major(m: &Matrix4<f64>) -> [f64; 16] {
    let mut out = [0.0; 16];
    out.copy_from_slice(m.as_slice());
    out
}

/// Triangles for a prism with `n` bottom vertices followed by `n` top ones.
fn prism_indices(n: usize) -> Vec<u32> {
    let n = n as u32;
    let mut indices = Vec::new();
    for i in 1..n.saturating_sub(1) {
        indices.extend([0, i + 1, i]);
        indices.extend([n, n + i, n + i + 1]);
    }
    for i in 0..n {
        let j = (i + 1) % n;
        indices.extend([i, j, n + j, i, n + j, n + i]);
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ifc::geometry::mesh_bounds;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;

    const FIXTURE: &str = include_str!("../../../tests/fixtures/two_storeys.ifc");

    const DEGENERATE_ITEMS: &str = "ISO-10303-21;
HEADER;
FILE_SCHEMA(('IFC4'));
ENDSEC;
DATA;
#1=IFCCARTESIANPOINT((0.,0.,0.));
#2=IFCAXIS2PLACEMENT3D(#1,$,$);
#3=IFCLOCALPLACEMENT($,#2);
#4=IFCDIRECTION((0.,0.,1.));
#10=IFCBOOLEANRESULT(.DIFFERENCE.,#10,#10);
#11=IFCSHAPEREPRESENTATION($,'Body','CSG',(#10));
#12=IFCPRODUCTDEFINITIONSHAPE($,$,(#11));
#13=IFCWALL('1CyclicBoolean00000000',$,'Cyclic',$,$,#3,#12,$,$);
#20=IFCRECTANGLEPROFILEDEF(.AREA.,$,$,1000.,200.);
#21=IFCEXTRUDEDAREASOLID(#20,#2,#4,3000.);
#22=IFCHALFSPACESOLID($,.F.);
#23=IFCBOOLEANCLIPPINGRESULT(.DIFFERENCE.,#21,#22);
#24=IFCSHAPEREPRESENTATION($,'Body','Clipping',(#23));
#25=IFCPRODUCTDEFINITIONSHAPE($,$,(#24));
#26=IFCWALL('2ClippedWall0000000000',$,'Clipped',$,$,#3,#25,$,$);
#30=IFCREPRESENTATIONMAP(#2,#31);
#31=IFCSHAPEREPRESENTATION($,'Body','MappedRepresentation',(#32));
#32=IFCMAPPEDITEM(#30,$);
#33=IFCPRODUCTDEFINITIONSHAPE($,$,(#31));
#34=IFCWALL('3SelfMappedWall0000000',$,'Self mapped',$,$,#3,#33,$,$);
ENDSEC;
END-ISO-10303-21;
";

    const IFC2X3_LAYOUT: &str = "ISO-10303-21;
HEADER;
FILE_SCHEMA(('IFC2X3'));
ENDSEC;
DATA;
#1=IFCSPACE('0Room000000000000000001',$,'Room 1',$,$,$,$,'Living',.ELEMENT.,.INTERNAL.,$);
#2=IFCBUILDINGELEMENTPROXY('0Proxy00000000000000001',$,'Proxy',$,'Generic box',$,$,$,.ELEMENT.);
#3=IFCSLAB('0Slab000000000000000001',$,'Floor',$,$,$,$,$,.FLOOR.);
#4=IFCDOOR('0Door000000000000000001',$,'Door',$,$,$,$,$,2100.,900.);
ENDSEC;
END-ISO-10303-21;
";

    fn open_text(text: &str) -> (StepEngine, ModelId) {
        let mut engine = StepEngine::new();
        let model = engine.open_model(text.as_bytes());
        assert!(model.0 > 0);
        (engine, model)
    }

    fn open() -> (StepEngine, ModelId) {
        open_text(FIXTURE)
    }

    #[test]
    fn rejects_payload_without_data_section() {
        let mut engine = StepEngine::new();
        assert_eq!(engine.open_model(b"not a model"), ModelId(0));
    }

    #[test]
    fn enumeration_includes_subtypes() {
        let (engine, model) = open();
        assert_eq!(engine.line_ids_with_type(model, "IFCWALL"), vec![100]);
        assert_eq!(engine.line_ids_with_type(model, "IFCWALLSTANDARDCASE"), vec![100]);
        assert_eq!(engine.schema(model).as_deref(), Some("IFC4"));
    }

    #[test]
    fn line_record_skips_undefined_predefined_type() {
        let (engine, model) = open();
        let wall = engine.line(model, 100).unwrap();
        assert_eq!(wall.type_code, "IFCWALLSTANDARDCASE");
        assert_eq!(wall.predefined_type, None);
        assert_eq!(wall.object_type.as_deref(), Some("Basic Wall:Interior - 200"));

        let door = engine.line(model, 120).unwrap();
        assert_eq!(door.predefined_type.as_deref(), Some("DOOR"));
    }

    #[test]
    fn ifc2x3_attributes_in_the_ifc4_slot_are_not_types() {
        let (engine, model) = open_text(IFC2X3_LAYOUT);
        assert_eq!(engine.schema(model).as_deref(), Some("IFC2X3"));
        let types: Vec<_> = [1, 2, 3, 4]
            .into_iter()
            .map(|id| engine.line(model, id).unwrap().predefined_type)
            .collect();
        assert_eq!(types, vec![None, None, Some("FLOOR".to_string()), None]);
        assert_eq!(
            engine.line(model, 2).unwrap().object_type.as_deref(),
            Some("Generic box")
        );
    }

    #[test]
    fn spatial_tree_follows_aggregation_and_containment() {
        let (engine, model) = open();
        let root = engine.spatial_structure(model).unwrap();
        assert_eq!(root.type_code, "IFCPROJECT");
        let building = &root.children[0].children[0];
        assert_eq!(building.type_code, "IFCBUILDING");
        let level_one = &building.children[0];
        assert_eq!(level_one.name.as_deref(), Some("Level 1"));
        let contained: Vec<u64> = level_one.children.iter().map(|c| c.express_id).collect();
        assert_eq!(contained, vec![100, 120, 170]);
        assert_eq!(level_one.children[2].children[0].express_id, 171);
    }

    #[test]
    fn property_sets_carry_units_and_typed_values() {
        let (engine, model) = open();
        let sets = engine.property_sets(model, 130).unwrap();
        let names: Vec<_> = sets.iter().map(|s| s.name.clone().unwrap()).collect();
        assert_eq!(
            names,
            vec!["Pset_SlabCommon", "Qto_SlabBaseQuantities", "Custom_Quantities"]
        );
        let thickness = &sets[0].items[2];
        assert_eq!(thickness.unit.as_deref(), Some("MILLIMETRE"));
        assert_eq!(thickness.fields[0].raw, "IFCPOSITIVELENGTHMEASURE(250.0)");
        assert_eq!(thickness.fields[0].value, IfcValue::Number(250.0));
    }

    #[test]
    fn extruded_wall_is_placed_in_world_coordinates() {
        let (engine, model) = open();
        let mesh = engine.flat_mesh(model, 100).unwrap();
        let bbox = mesh_bounds(&mesh).unwrap();
        assert_eq!(bbox.min(), Some([1000.0, 2000.0, 0.0]));
        assert_eq!(bbox.max(), Some([5000.0, 2200.0, 3000.0]));
    }

    #[test]
    fn mapped_item_applies_target_translation() {
        let (engine, model) = open();
        let bbox = mesh_bounds(&engine.flat_mesh(model, 190).unwrap()).unwrap();
        let min = bbox.min().unwrap();
        let max = bbox.max().unwrap();
        assert_relative_eq!(min[0], 500.0);
        assert_relative_eq!(min[2], -250.0);
        assert_relative_eq!(max[0], 6500.0);
        assert_relative_eq!(max[1], 4500.0);
    }

    #[test]
    fn faceted_brep_collects_loop_vertices() {
        let (engine, model) = open();
        let bbox = mesh_bounds(&engine.flat_mesh(model, 171).unwrap()).unwrap();
        assert_eq!(bbox.min(), Some([0.0, 0.0, 0.0]));
        assert_eq!(bbox.max(), Some([1000.0, 300.0, 150.0]));
    }

    #[test]
    fn clipping_result_is_bounded_by_its_first_operand() {
        let (engine, model) = open_text(DEGENERATE_ITEMS);
        let bbox = mesh_bounds(&engine.flat_mesh(model, 26).unwrap()).unwrap();
        assert_eq!(bbox.min(), Some([-500.0, -100.0, 0.0]));
        assert_eq!(bbox.max(), Some([500.0, 100.0, 3000.0]));
    }

    #[test]
    fn cyclic_boolean_operand_is_unsupported() {
        let (engine, model) = open_text(DEGENERATE_ITEMS);
        let err = engine.flat_mesh(model, 13).unwrap_err();
        assert!(matches!(err, EngineError::Unsupported { .. }));
    }

    #[test]
    fn self_referencing_mapped_item_is_unsupported() {
        let (engine, model) = open_text(DEGENERATE_ITEMS);
        let err = engine.flat_mesh(model, 34).unwrap_err();
        assert!(matches!(err, EngineError::Unsupported { .. }));
    }

    #[test]
    fn grid_placement_is_reported_as_unsupported() {
        let (engine, model) = open();
        let err = engine.flat_mesh(model, 160).unwrap_err();
        assert!(matches!(err, EngineError::Unsupported { .. }));
    }

    #[test]
    fn element_without_representation_has_empty_mesh() {
        let (engine, model) = open();
        assert!(engine.flat_mesh(model, 120).unwrap().geometries.is_empty());
    }

    #[test]
    fn closed_model_answers_nothing() {
        let (mut engine, model) = open();
        engine.close_model(model);
        assert!(engine.line(model, 100).is_none());
        assert!(matches!(
            engine.flat_mesh(model, 100),
            Err(EngineError::ModelNotOpen { .. })
        ));
    }

    #[test]
    fn prism_has_caps_and_sides() {
        // 2 cap triangles per side of a quad, 2 triangles per wall face.
        assert_eq!(prism_indices(4).len(), (2 * 2 + 4 * 2) * 3);
    }
}
