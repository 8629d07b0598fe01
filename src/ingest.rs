//! Ingestion: keep the raw file, parse it, persist the elements.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{ElementResolutionFailure, IngestError};
use crate::model::SourceFormat;
use crate::parser::{adapter_for, ParseContext};
use crate::store::{ElementStore, ObjectStore};

/// Outcome of one ingestion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub version_id: String,
    pub object_ref: String,
    pub source_format: SourceFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub element_count: usize,
    pub storey_count: usize,
    pub diagnostics: Vec<ElementResolutionFailure>,
}

#[derive(Clone)]
pub struct Ingestor {
    elements: Arc<dyn ElementStore>,
    objects: Arc<dyn ObjectStore>,
}

impl Ingestor {
    #[must_use]
    pub fn new(elements: Arc<dyn ElementStore>, objects: Arc<dyn ObjectStore>) -> Self {
        Self { elements, objects }
    }

    /// Parses `bytes` with the adapter for `context.source_format` and saves
    /// the elements under `version_id`. A failed parse saves nothing.
    pub async fn ingest(
        &self,
        version_id: &str,
        bytes: &[u8],
        context: &ParseContext,
    ) -> Result<IngestReport, IngestError> {
        let object_ref = self.objects.upload_raw_file(bytes).await?;
        debug!(%object_ref, size = bytes.len(), "raw file stored");

        let adapter = adapter_for(context.source_format);
        let parsed = adapter.parse(bytes, context).await?;
        self.elements
            .save_elements(version_id, &parsed.elements)
            .await?;

        info!(
            version_id,
            format = %context.source_format,
            elements = parsed.metadata.element_count,
            storeys = parsed.metadata.storey_count,
            degraded = parsed.diagnostics.len(),
            "model ingested"
        );

        Ok(IngestReport {
            version_id: version_id.to_string(),
            object_ref,
            source_format: parsed.metadata.source_format,
            schema: parsed.metadata.schema,
            element_count: parsed.metadata.element_count,
            storey_count: parsed.metadata.storey_count,
            diagnostics: parsed.diagnostics,
        })
    }
}
