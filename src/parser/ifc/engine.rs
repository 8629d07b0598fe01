//! The geometry-engine capability used by the IFC adapter, and the scoped
//! handles that guarantee the engine and its models are released.

use crate::error::{EngineError, FormatError};

use super::value::FieldValue;

/// Engine-assigned model handle. Non-positive values mean the open failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelId(pub i32);

/// Named view of an entity's line record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LineRecord {
    pub express_id: u64,
    /// Upper-case entity type code, e.g. `IFCWALL`.
    pub type_code: String,
    pub global_id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub object_type: Option<String>,
    pub predefined_type: Option<String>,
}

/// A node of the spatial tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpatialNode {
    pub express_id: u64,
    pub type_code: String,
    pub name: Option<String>,
    pub children: Vec<SpatialNode>,
}

/// A property or quantity item inside a property set.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyItem {
    pub name: Option<String>,
    pub fields: Vec<FieldValue>,
    pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertySetRecord {
    pub express_id: u64,
    pub name: Option<String>,
    pub items: Vec<PropertyItem>,
}

/// A mesh with its placement.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedGeometry {
    /// Interleaved position and normal, six floats per vertex.
    pub vertex_data: Vec<f32>,
    pub index_data: Vec<u32>,
    /// Column-major 4x4 affine transform; translation in elements 12..15.
    pub transform: [f64; 16],
}

/// All placed meshes of one element.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlatMesh {
    pub express_id: u64,
    pub geometries: Vec<PlacedGeometry>,
}

/// An IFC processing engine.
///
/// Query methods take the handle returned by [`GeometryEngine::open_model`];
/// callers go through [`EngineSession`] and [`OpenModel`] rather than calling
/// these directly.
pub trait GeometryEngine: Send {
    fn init(&mut self) -> Result<(), EngineError> {
        Ok(())
    }

    fn open_model(&mut self, data: &[u8]) -> ModelId;

    fn close_model(&mut self, model: ModelId);

    fn dispose(&mut self) {}

    fn schema(&self, model: ModelId) -> Option<String>;

    /// Entity ids of a type code, including known subtypes, in id order.
    fn line_ids_with_type(&self, model: ModelId, type_code: &str) -> Vec<u64>;

    fn line(&self, model: ModelId, express_id: u64) -> Option<LineRecord>;

    /// GUID lookup for entities whose record carries none.
    fn guid_for(&self, _model: ModelId, _express_id: u64) -> Option<String> {
        None
    }

    fn spatial_structure(&self, model: ModelId) -> Option<SpatialNode>;

    fn property_sets(
        &self,
        model: ModelId,
        express_id: u64,
    ) -> Result<Vec<PropertySetRecord>, EngineError>;

    fn flat_mesh(&self, model: ModelId, express_id: u64) -> Result<FlatMesh, EngineError>;
}

/// Owns an initialised engine and disposes it on drop.
pub struct EngineSession {
    engine: Box<dyn GeometryEngine>,
}

impl EngineSession {
    pub fn start(mut engine: Box<dyn GeometryEngine>) -> Result<Self, FormatError> {
        // Dispose even when init fails half way.
        if let Err(err) = engine.init() {
            engine.dispose();
            return Err(err.into());
        }
        Ok(Self { engine })
    }

    /// Opens a model; the returned guard closes it when dropped.
    pub fn open(&mut self, data: &[u8]) -> Result<OpenModel<'_>, FormatError> {
        let id = self.engine.open_model(data);
        if id.0 <= 0 {
            return Err(FormatError::ModelOpen { handle: id.0 });
        }
        Ok(OpenModel {
            engine: self.engine.as_mut(),
            id,
        })
    }
}

impl Drop for EngineSession {
    fn drop(&mut self) {
        self.engine.dispose();
    }
}

/// An open model. Closed when dropped, before its session is disposed.
pub struct OpenModel<'a> {
    engine: &'a mut (dyn GeometryEngine + 'static),
    id: ModelId,
}

impl OpenModel<'_> {
    #[must_use]
    pub fn id(&self) -> ModelId {
        self.id
    }

    #[must_use]
    pub fn schema(&self) -> Option<String> {
        self.engine.schema(self.id)
    }

    #[must_use]
    pub fn line_ids_with_type(&self, type_code: &str) -> Vec<u64> {
        self.engine.line_ids_with_type(self.id, type_code)
    }

    #[must_use]
    pub fn line(&self, express_id: u64) -> Option<LineRecord> {
        self.engine.line(self.id, express_id)
    }

    #[must_use]
    pub fn guid_for(&self, express_id: u64) -> Option<String> {
        self.engine.guid_for(self.id, express_id)
    }

    #[must_use]
    pub fn spatial_structure(&self) -> Option<SpatialNode> {
        self.engine.spatial_structure(self.id)
    }

    pub fn property_sets(&self, express_id: u64) -> Result<Vec<PropertySetRecord>, EngineError> {
        self.engine.property_sets(self.id, express_id)
    }

    pub fn flat_mesh(&self, express_id: u64) -> Result<FlatMesh, EngineError> {
        self.engine.flat_mesh(self.id, express_id)
    }
}

impl Drop for OpenModel<'_> {
    fn drop(&mut self) {
        self.engine.close_model(self.id);
    }
}
