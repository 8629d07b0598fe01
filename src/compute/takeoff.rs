//! Quantity takeoff: grouped length, area and volume sums.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::StoreError;
use crate::model::{GeometrySummary, NormalizedElement};
use crate::query::ElementFilters;
use crate::store::{ElementQuery, ElementStore, Pagination, Relations};

/// Bucket for elements without a value in the grouping field.
pub const UNSPECIFIED: &str = "Unspecified";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    Category,
    System,
    Level,
    Type,
}

impl GroupBy {
    #[must_use]
    pub fn key(self, element: &NormalizedElement) -> Option<&str> {
        match self {
            Self::Category => element.category.as_deref(),
            Self::System => element.system.as_deref(),
            Self::Level => element.level.as_deref(),
            Self::Type => element.element_type.as_deref(),
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Category => "category",
            Self::System => "system",
            Self::Level => "level",
            Self::Type => "type",
        })
    }
}

impl FromStr for GroupBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "category" => Ok(Self::Category),
            "system" => Ok(Self::System),
            "level" => Ok(Self::Level),
            "type" => Ok(Self::Type),
            other => Err(format!(
                "unknown grouping '{other}', expected category, system, level or type"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TakeoffSummary {
    pub element_count: usize,
    pub total_length: f64,
    pub total_area: f64,
    pub total_volume: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TakeoffGroup {
    pub group: String,
    pub element_count: usize,
    pub total_length: f64,
    pub total_area: f64,
    pub total_volume: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TakeoffReport {
    pub summary: TakeoffSummary,
    /// In order of first appearance. Empty without a grouping.
    pub groups: Vec<TakeoffGroup>,
}

/// The quantities one element contributes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct Contribution {
    length: Option<f64>,
    area: Option<f64>,
    volume: Option<f64>,
}

impl Contribution {
    /// Persisted geometry first, then a numeric property under the
    /// lowercase or capitalised key.
    fn of(element: &NormalizedElement) -> Self {
        Self {
            length: resolve(element, |g| g.length, ["length", "Length"]),
            area: resolve(element, |g| g.area, ["area", "Area"]),
            volume: resolve(element, |g| g.volume, ["volume", "Volume"]),
        }
    }
}

fn resolve(
    element: &NormalizedElement,
    from_geometry: fn(&GeometrySummary) -> Option<f64>,
    keys: [&str; 2],
) -> Option<f64> {
    element
        .geometry
        .as_ref()
        .and_then(from_geometry)
        .or_else(|| {
            keys.iter()
                .find_map(|key| element.properties.get(*key).and_then(|v| v.as_f64()))
        })
        .filter(|n| n.is_finite())
}

impl TakeoffSummary {
    fn add(&mut self, contribution: Contribution) {
        self.element_count += 1;
        self.total_length += contribution.length.unwrap_or(0.0);
        self.total_area += contribution.area.unwrap_or(0.0);
        self.total_volume += contribution.volume.unwrap_or(0.0);
    }
}

/// Aggregates elements into a grand total and, with a grouping, one total
/// per group key.
#[must_use]
pub fn takeoff(elements: &[NormalizedElement], group_by: Option<GroupBy>) -> TakeoffReport {
    let mut summary = TakeoffSummary::default();
    let mut groups: Vec<(String, TakeoffSummary)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for element in elements {
        let contribution = Contribution::of(element);
        summary.add(contribution);

        if let Some(group_by) = group_by {
            let key = group_by.key(element).unwrap_or(UNSPECIFIED);
            let position = *positions.entry(key.to_string()).or_insert_with(|| {
                groups.push((key.to_string(), TakeoffSummary::default()));
                groups.len() - 1
            });
            groups[position].1.add(contribution);
        }
    }

    TakeoffReport {
        summary,
        groups: groups
            .into_iter()
            .map(|(group, totals)| TakeoffGroup {
                group,
                element_count: totals.element_count,
                total_length: totals.total_length,
                total_area: totals.total_area,
                total_volume: totals.total_volume,
            })
            .collect(),
    }
}

/// Takeoff over every element of a version that matches the filters.
pub async fn compute_takeoff(
    store: &dyn ElementStore,
    version_id: &str,
    filters: &ElementFilters,
    group_by: Option<GroupBy>,
) -> Result<TakeoffReport, StoreError> {
    let query = ElementQuery::new(version_id, filters.clone());
    let elements = store
        .find_elements(&query, Pagination::all(), Relations::all())
        .await?;
    Ok(takeoff(&elements, group_by))
}
