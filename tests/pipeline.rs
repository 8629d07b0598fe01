use std::sync::Arc;

use bim_ingest::compute::{compute_handover_register, compute_takeoff, GroupBy};
use bim_ingest::error::ResolutionStage;
use bim_ingest::ingest::Ingestor;
use bim_ingest::model::{NormalizedElement, SourceFormat};
use bim_ingest::parser::ParseContext;
use bim_ingest::query::{query_elements, ElementFilters, QueryOptions};
use bim_ingest::store::{InMemoryElementStore, InMemoryObjectStore};
use pretty_assertions::assert_eq;
use serde_json::json;

const FIXTURE: &str = include_str!("fixtures/two_storeys.ifc");

fn setup() -> (Ingestor, Arc<InMemoryElementStore>) {
    let elements = Arc::new(InMemoryElementStore::new());
    let ingestor = Ingestor::new(elements.clone(), Arc::new(InMemoryObjectStore::new()));
    (ingestor, elements)
}

async fn all_elements(store: &InMemoryElementStore, version_id: &str) -> Vec<NormalizedElement> {
    query_elements(
        store,
        version_id,
        &ElementFilters::default(),
        QueryOptions {
            limit: usize::MAX,
            include_properties: true,
            ..QueryOptions::default()
        },
    )
    .await
    .unwrap()
    .elements
}

fn by_name<'a>(elements: &'a [NormalizedElement], name: &str) -> &'a NormalizedElement {
    elements
        .iter()
        .find(|e| e.name.as_deref() == Some(name))
        .unwrap()
}

#[tokio::test]
async fn tabular_takeoff_groups_beams_by_category() {
    let (ingestor, store) = setup();
    let input = "guid,name,category,length\nG1,Beam-A,Structural,4.5\nG2,Beam-B,Structural,3.0\n";
    ingestor
        .ingest("v1", input.as_bytes(), &ParseContext::new(SourceFormat::Tabular))
        .await
        .unwrap();

    let report = compute_takeoff(
        &*store,
        "v1",
        &ElementFilters::default(),
        Some(GroupBy::Category),
    )
    .await
    .unwrap();

    assert_eq!(report.summary.element_count, 2);
    assert_eq!(report.summary.total_length, 7.5);
    assert_eq!(report.groups.len(), 1);
    let group = &report.groups[0];
    assert_eq!(group.group, "Structural");
    assert_eq!(group.total_length, 7.5);
    assert_eq!(group.total_area, 0.0);
    assert_eq!(group.total_volume, 0.0);
}

#[tokio::test]
async fn repeated_takeoff_gives_the_same_report() {
    let (ingestor, store) = setup();
    ingestor
        .ingest("v1", FIXTURE.as_bytes(), &ParseContext::new(SourceFormat::Ifc))
        .await
        .unwrap();

    let filters = ElementFilters::default();
    let first = compute_takeoff(&*store, "v1", &filters, Some(GroupBy::Level))
        .await
        .unwrap();
    let second = compute_takeoff(&*store, "v1", &filters, Some(GroupBy::Level))
        .await
        .unwrap();
    assert_eq!(first, second);

    let grouped: usize = first.groups.iter().map(|g| g.element_count).sum();
    assert_eq!(grouped, first.summary.element_count);
    let names: Vec<_> = first.groups.iter().map(|g| g.group.as_str()).collect();
    assert_eq!(names, vec!["Level 1", "Storey-74", "Unspecified"]);
}

#[tokio::test]
async fn handover_omits_keys_an_asset_does_not_carry() {
    let (ingestor, store) = setup();
    let input = "guid,name,category,fireRating\nD1,Door-1,Doors,EI30\nD2,Door-2,Doors,\n";
    ingestor
        .ingest("v1", input.as_bytes(), &ParseContext::new(SourceFormat::Tabular))
        .await
        .unwrap();

    let keys = vec!["firerating".to_string(), "acousticrating".to_string()];
    let register = compute_handover_register(
        &*store,
        "v1",
        &ElementFilters::default(),
        Some(keys.as_slice()),
    )
    .await
    .unwrap();

    assert_eq!(register.asset_count, 2);
    let value = serde_json::to_value(&register).unwrap();
    assert_eq!(value["assets"][0]["properties"], json!({"firerating": "EI30"}));
    assert!(value["assets"][1].get("properties").is_none());
}

#[tokio::test]
async fn ifc_model_resolves_levels_quantities_and_degradations() {
    let (ingestor, store) = setup();
    let context = ParseContext::new(SourceFormat::Ifc).with_model_name("two_storeys.ifc");
    let report = ingestor
        .ingest("v1", FIXTURE.as_bytes(), &context)
        .await
        .unwrap();

    assert_eq!(report.element_count, 7);
    assert_eq!(report.storey_count, 2);
    assert_eq!(report.schema.as_deref(), Some("IFC4"));

    let elements = all_elements(&store, "v1").await;
    let levels: Vec<_> = elements
        .iter()
        .map(|e| (e.name.as_deref().unwrap_or_default(), e.level.as_deref()))
        .collect();
    assert_eq!(
        levels,
        vec![
            ("Basic Wall:Interior", Some("Level 1")),
            ("Door-1", Some("Level 1")),
            ("Floor:Generic 250", Some("Storey-74")),
            ("Beam-1", Some("Storey-74")),
            ("Stair", Some("Level 1")),
            ("Flight", Some("Level 1")),
            ("Table", None),
        ]
    );

    let wall = by_name(&elements, "Basic Wall:Interior");
    assert_eq!(wall.category.as_deref(), Some("Walls"));
    assert_eq!(wall.element_type.as_deref(), Some("Basic Wall:Interior - 200"));
    let wall_geometry = wall.geometry.as_ref().unwrap();
    assert_eq!(wall_geometry.bbox_min, Some([1000.0, 2000.0, 0.0]));
    assert_eq!(wall_geometry.bbox_max, Some([5000.0, 2200.0, 3000.0]));
    assert_eq!(wall_geometry.length, Some(4000.0));

    let slab = by_name(&elements, "Floor:Generic 250");
    assert_eq!(slab.element_type.as_deref(), Some("FLOOR"));
    assert_eq!(slab.geometry.as_ref().unwrap().area, Some(48.0));
    assert_eq!(slab.geometry.as_ref().unwrap().volume, Some(6.0));

    let door = by_name(&elements, "Door-1");
    assert_eq!(door.element_type.as_deref(), Some("DOOR"));
    assert!(door.geometry.is_none());

    let beam = by_name(&elements, "Beam-1");
    assert!(!beam.guid.is_empty());
    assert!(beam.geometry.is_none());
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].express_id, 160);
    assert_eq!(report.diagnostics[0].stage, ResolutionStage::Geometry);
    assert_eq!(report.diagnostics[0].guid, beam.guid);
}

#[tokio::test]
async fn exchange_graph_feeds_filtered_queries() {
    let (ingestor, store) = setup();
    let input = r#"{
        "id": "root",
        "elements": [
            {"id": "w1", "category": "Walls", "level": "Level 1",
             "parameters": {"length": 5.0}},
            {"id": "w2", "category": "Walls", "level": "Level 2",
             "parameters": {"Length": 2.5}},
            {"id": "d1", "category": "Doors", "level": "Level 1"}
        ]
    }"#;
    let report = ingestor
        .ingest("v1", input.as_bytes(), &ParseContext::new(SourceFormat::Exchange))
        .await
        .unwrap();
    assert_eq!(report.element_count, 3);
    assert_eq!(report.storey_count, 2);

    let walls = ElementFilters {
        categories: vec!["Walls".to_string()],
        ..ElementFilters::default()
    };
    let takeoff = compute_takeoff(&*store, "v1", &walls, None).await.unwrap();
    assert_eq!(takeoff.summary.element_count, 2);
    assert_eq!(takeoff.summary.total_length, 7.5);
    assert!(takeoff.groups.is_empty());
}
