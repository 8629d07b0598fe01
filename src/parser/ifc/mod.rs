//! IFC adapter.
//!
//! The adapter drives a [`GeometryEngine`] through one scoped session per
//! parse: the spatial tree is walked for level context, every supported
//! element code is enumerated once, and each element is enriched with its
//! property sets and a bounding box from its placed meshes. Failures while
//! enriching one element are recorded as diagnostics and never abort the
//! parse; only a model that cannot be opened fails the call.

pub mod engine;
pub mod geometry;
pub mod properties;
pub mod schema;
pub mod spatial;
pub mod step_engine;
pub mod value;

use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

pub use engine::{EngineSession, GeometryEngine, LineRecord, ModelId, OpenModel};
pub use step_engine::StepEngine;

use self::geometry::mesh_bounds;
use self::properties::extract_properties;
use self::spatial::{assign_storeys, StoreyMap};
use super::{FormatAdapter, GuidSynthesizer, ParseContext, ParseOptions};
use crate::error::{ElementResolutionFailure, EngineError, FormatError, ResolutionStage};
use crate::model::{
    BoundingBox, GeometrySummary, NormalizedElement, ParsedModel, QuantityTotals, SourceFormat,
};

type EngineFactory = dyn Fn() -> Box<dyn GeometryEngine> + Send + Sync;

/// Parses IFC payloads. Each parse gets a fresh engine from the factory.
#[derive(Clone)]
pub struct IfcAdapter {
    engine_factory: Arc<EngineFactory>,
}

impl IfcAdapter {
    /// Adapter backed by the built-in [`StepEngine`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_engine(|| Box::new(StepEngine::new()))
    }

    #[must_use]
    pub fn with_engine<F>(factory: F) -> Self
    where
        F: Fn() -> Box<dyn GeometryEngine> + Send + Sync + 'static,
    {
        Self {
            engine_factory: Arc::new(factory),
        }
    }
}

impl Default for IfcAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for IfcAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IfcAdapter").finish_non_exhaustive()
    }
}

#[async_trait]
impl FormatAdapter for IfcAdapter {
    fn format(&self) -> SourceFormat {
        SourceFormat::Ifc
    }

    async fn parse(
        &self,
        input: &[u8],
        context: &ParseContext,
    ) -> Result<ParsedModel, FormatError> {
        parse_ifc((self.engine_factory)(), input, context)
    }
}

/// Runs a whole parse on the calling thread.
///
/// The engine is disposed and the model closed on every return path,
/// including a failed open.
pub fn parse_ifc(
    engine: Box<dyn GeometryEngine>,
    input: &[u8],
    context: &ParseContext,
) -> Result<ParsedModel, FormatError> {
    let mut session = EngineSession::start(engine)?;
    let model = session.open(input)?;
    let options = &context.options;

    let storeys = if options.include_spatial_structure {
        model
            .spatial_structure()
            .map(|root| assign_storeys(&root))
            .unwrap_or_default()
    } else {
        StoreyMap::default()
    };
    debug!(storeys = storeys.storey_count, "spatial structure walked");

    let resolver = ElementResolver {
        model: &model,
        storeys: &storeys,
        synthesizer: GuidSynthesizer::new(options.guid_strategy, SourceFormat::Ifc),
        options,
    };

    let mut seen = HashSet::new();
    let mut elements = Vec::new();
    let mut diagnostics = Vec::new();
    for (code, _, _) in schema::SUPPORTED_ELEMENTS {
        for express_id in model.line_ids_with_type(code) {
            if !seen.insert(express_id) {
                continue;
            }
            let line = model.line(express_id).unwrap_or_else(|| LineRecord {
                express_id,
                type_code: (*code).to_string(),
                ..LineRecord::default()
            });
            elements.push(resolver.resolve(&line, &mut diagnostics));
        }
    }
    debug!(
        elements = elements.len(),
        diagnostics = diagnostics.len(),
        "IFC elements resolved"
    );

    Ok(ParsedModel::new(
        elements,
        SourceFormat::Ifc,
        model.schema(),
        context.model_name.clone(),
        storeys.storey_count,
    )
    .with_diagnostics(diagnostics))
}

struct ElementResolver<'m, 'e> {
    model: &'m OpenModel<'e>,
    storeys: &'m StoreyMap,
    synthesizer: GuidSynthesizer,
    options: &'m ParseOptions,
}

impl ElementResolver<'_, '_> {
    fn resolve(
        &self,
        line: &LineRecord,
        diagnostics: &mut Vec<ElementResolutionFailure>,
    ) -> NormalizedElement {
        let id = line.express_id;
        let guid = line
            .global_id
            .clone()
            .or_else(|| self.model.guid_for(id))
            .unwrap_or_else(|| self.synthesizer.synthesize(&line.type_code, id));

        let mut element = NormalizedElement::new(guid);
        element.name.clone_from(&line.name);
        element.description.clone_from(&line.description);
        element.category = schema::category_for(&line.type_code).map(str::to_string);
        element.element_type = Some(
            line.predefined_type
                .clone()
                .or_else(|| line.object_type.clone())
                .unwrap_or_else(|| schema::schema_name(&line.type_code)),
        );
        element.level = self.storeys.level_of(id).map(str::to_string);

        let mut quantities = QuantityTotals::default();
        let mut units = None;
        if self.options.include_properties {
            match self.model.property_sets(id) {
                Ok(sets) => {
                    let extracted = extract_properties(&sets);
                    quantities = extracted.quantities;
                    units = extracted.quantity_unit;
                    for entry in extracted.entries {
                        element.push_property(entry);
                    }
                }
                Err(err) => diagnostics.push(failure(
                    &element.guid,
                    id,
                    ResolutionStage::Properties,
                    &err,
                )),
            }
        }

        let mut bbox = BoundingBox::default();
        if self.options.include_geometry {
            match self.model.flat_mesh(id).and_then(|mesh| mesh_bounds(&mesh)) {
                Ok(bounds) => bbox = bounds,
                Err(err) => diagnostics.push(failure(
                    &element.guid,
                    id,
                    ResolutionStage::Geometry,
                    &err,
                )),
            }
        }

        element.geometry = GeometrySummary::from_parts(&bbox, quantities, units);
        element
    }
}

fn failure(
    guid: &str,
    express_id: u64,
    stage: ResolutionStage,
    err: &EngineError,
) -> ElementResolutionFailure {
    warn!(express_id, %stage, error = %err, "element resolution degraded");
    ElementResolutionFailure {
        express_id,
        guid: guid.to_string(),
        stage,
        message: err.to_string(),
    }
}
