use clap::Parser;
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use bim_ingest::compute::{compute_handover_register, compute_takeoff, GroupBy, TakeoffReport};
use bim_ingest::export::{export_handover_csv, export_json, export_takeoff_csv};
use bim_ingest::ingest::{IngestReport, Ingestor};
use bim_ingest::model::{NormalizedElement, SourceFormat};
use bim_ingest::parser::{GuidStrategy, ParseContext, ParseOptions};
use bim_ingest::query::{query_elements, ElementFilters, QueryOptions};
use bim_ingest::store::{InMemoryElementStore, InMemoryObjectStore};

#[derive(Parser, Debug)]
#[command(name = "bim-ingest")]
#[command(about = "Normalize IFC, tabular and model-exchange files and compute takeoffs")]
#[command(version)]
struct Args {
    /// Path to the source file
    #[arg(required = true)]
    file: PathBuf,

    /// Source format (ifc, tabular, exchange); inferred from the extension
    #[arg(long)]
    format: Option<SourceFormat>,

    /// Model version to store the elements under
    #[arg(long, value_name = "ID")]
    version_id: Option<String>,

    /// Tabular field delimiter; detected from the header when omitted
    #[arg(long, value_name = "CHAR")]
    delimiter: Option<char>,

    /// Group takeoff totals by category, system, level or type
    #[arg(long, value_name = "FIELD")]
    group_by: Option<GroupBy>,

    /// Only include these categories
    #[arg(long = "category", value_name = "NAME")]
    categories: Vec<String>,

    /// Only include these systems
    #[arg(long = "system", value_name = "NAME")]
    systems: Vec<String>,

    /// Only include these levels
    #[arg(long = "level", value_name = "NAME")]
    levels: Vec<String>,

    /// Only include these types
    #[arg(long = "type", value_name = "NAME")]
    types: Vec<String>,

    /// Case-insensitive search over name, guid, category and system
    #[arg(long)]
    search: Option<String>,

    /// Property keys for the handover register (comma separated)
    #[arg(long, value_delimiter = ',', value_name = "KEYS")]
    keys: Vec<String>,

    /// Skip geometry resolution
    #[arg(long)]
    no_geometry: bool,

    /// Skip property and quantity extraction
    #[arg(long)]
    no_properties: bool,

    /// Skip the spatial structure walk (no levels for IFC elements)
    #[arg(long)]
    no_spatial: bool,

    /// Derive identifiers for GUID-less elements from their position
    #[arg(long)]
    stable_guids: bool,

    /// Write ingest report, takeoff and elements as JSON
    #[arg(long, value_name = "FILE")]
    json: Option<PathBuf>,

    /// Write the takeoff to CSV
    #[arg(long, value_name = "FILE")]
    takeoff_csv: Option<PathBuf>,

    /// Write the handover register to CSV
    #[arg(long, value_name = "FILE")]
    handover_csv: Option<PathBuf>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    ingest: &'a IngestReport,
    takeoff: &'a TakeoffReport,
    elements: &'a [NormalizedElement],
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let format = match args.format {
        Some(format) => format,
        None => infer_format(&args.file)?,
    };
    let bytes = tokio::fs::read(&args.file)
        .await
        .wrap_err_with(|| format!("failed to read '{}'", args.file.display()))?;

    let delimiter = args
        .delimiter
        .map(|c| {
            u8::try_from(c).map_err(|_| eyre!("delimiter '{c}' is not a single-byte character"))
        })
        .transpose()?;
    let options = ParseOptions {
        include_spatial_structure: !args.no_spatial,
        include_properties: !args.no_properties,
        include_geometry: !args.no_geometry,
        guid_strategy: if args.stable_guids {
            GuidStrategy::ContentHash
        } else {
            GuidStrategy::Random
        },
        delimiter,
    };
    let mut context = ParseContext::new(format).with_options(options);
    if let Some(name) = args.file.file_name() {
        context = context.with_model_name(name.to_string_lossy());
    }

    let elements = Arc::new(InMemoryElementStore::new());
    let ingestor = Ingestor::new(elements.clone(), Arc::new(InMemoryObjectStore::new()));
    let version_id = args
        .version_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let report = ingestor.ingest(&version_id, &bytes, &context).await?;

    println!(
        "Ingested {} elements ({} storeys) from {} as version {}",
        report.element_count,
        report.storey_count,
        args.file.display(),
        report.version_id
    );
    if !report.diagnostics.is_empty() {
        println!("{} element(s) only partly resolved", report.diagnostics.len());
    }

    let filters = ElementFilters {
        categories: args.categories.clone(),
        systems: args.systems.clone(),
        levels: args.levels.clone(),
        types: args.types.clone(),
        search: args.search.clone(),
    };
    let takeoff = compute_takeoff(&*elements, &version_id, &filters, args.group_by).await?;
    print_takeoff(&takeoff, args.group_by);

    if let Some(path) = &args.takeoff_csv {
        export_takeoff_csv(&takeoff, path)?;
        println!("Exported takeoff to CSV: {}", path.display());
    }

    if let Some(path) = &args.handover_csv {
        let keys = (!args.keys.is_empty()).then_some(args.keys.as_slice());
        let register = compute_handover_register(&*elements, &version_id, &filters, keys).await?;
        export_handover_csv(&register, path)?;
        println!("Exported {} assets to CSV: {}", register.asset_count, path.display());
    }

    if let Some(path) = &args.json {
        let page = query_elements(
            &*elements,
            &version_id,
            &filters,
            QueryOptions {
                limit: usize::MAX,
                include_properties: true,
                ..QueryOptions::default()
            },
        )
        .await?;
        let json = JsonReport {
            ingest: &report,
            takeoff: &takeoff,
            elements: &page.elements,
        };
        export_json(&json, path)?;
        println!("Exported to JSON: {}", path.display());
    }

    Ok(())
}

fn infer_format(path: &Path) -> Result<SourceFormat> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(SourceFormat::from_extension)
        .ok_or_else(|| eyre!("cannot infer the format of '{}', pass --format", path.display()))
}

fn print_takeoff(report: &TakeoffReport, group_by: Option<GroupBy>) {
    let summary = &report.summary;
    println!(
        "Takeoff: {} elements, length {:.3}, area {:.3}, volume {:.3}",
        summary.element_count, summary.total_length, summary.total_area, summary.total_volume
    );

    if let Some(group_by) = group_by {
        println!(
            "  {:<28} {:>8} {:>14} {:>14} {:>14}",
            group_by, "count", "length", "area", "volume"
        );
        for group in &report.groups {
            println!(
                "  {:<28} {:>8} {:>14.3} {:>14.3} {:>14.3}",
                group.group,
                group.element_count,
                group.total_length,
                group.total_area,
                group.total_volume
            );
        }
    }
}
