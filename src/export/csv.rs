use crate::compute::{HandoverRegister, TakeoffReport};
use crate::error::ExportError;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

/// Writes one row per takeoff group, then a `Total` row.
pub fn export_takeoff_csv<P: AsRef<Path>>(
    report: &TakeoffReport,
    path: P,
) -> Result<(), ExportError> {
    let file = super::create_file(path.as_ref())?;
    write_takeoff(report, file)
}

/// Writes one row per asset; property columns are the sorted union of
/// every asset's keys.
pub fn export_handover_csv<P: AsRef<Path>>(
    register: &HandoverRegister,
    path: P,
) -> Result<(), ExportError> {
    let file = super::create_file(path.as_ref())?;
    write_handover(register, file)
}

fn write_takeoff<W: Write>(report: &TakeoffReport, out: W) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_writer(out);

    writer.write_record([
        "Group",
        "Element Count",
        "Total Length",
        "Total Area",
        "Total Volume",
    ])?;

    for group in &report.groups {
        writer.write_record([
            group.group.clone(),
            group.element_count.to_string(),
            group.total_length.to_string(),
            group.total_area.to_string(),
            group.total_volume.to_string(),
        ])?;
    }

    let summary = &report.summary;
    writer.write_record([
        "Total".to_string(),
        summary.element_count.to_string(),
        summary.total_length.to_string(),
        summary.total_area.to_string(),
        summary.total_volume.to_string(),
    ])?;

    writer.flush().map_err(|e| ExportError::WriteError {
        message: e.to_string(),
    })?;

    Ok(())
}

fn write_handover<W: Write>(register: &HandoverRegister, out: W) -> Result<(), ExportError> {
    let keys: BTreeSet<&str> = register
        .assets
        .iter()
        .flat_map(|asset| asset.properties.keys().map(String::as_str))
        .collect();

    let mut writer = csv::Writer::from_writer(out);

    let mut header = vec!["guid", "name", "category", "system", "level", "type"];
    header.extend(keys.iter().copied());
    writer.write_record(&header)?;

    for asset in &register.assets {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        let mut row = vec![
            asset.guid.clone(),
            text(&asset.name),
            text(&asset.category),
            text(&asset.system),
            text(&asset.level),
            text(&asset.element_type),
        ];
        row.extend(keys.iter().map(|key| {
            asset
                .properties
                .get(*key)
                .map(ToString::to_string)
                .unwrap_or_default()
        }));
        writer.write_record(&row)?;
    }

    writer.flush().map_err(|e| ExportError::WriteError {
        message: e.to_string(),
    })?;

    Ok(())
}
