//! Catalog scene search around a point.
//!
//! A search restricted to the WTSS-compatible collections runs alongside an
//! unrestricted one, so the compatible cubes always show up even when the
//! broad page is filled by other products. Both pages are merged and
//! de-duplicated by item id.

use std::collections::HashSet;

use crate::api::{iso_date_prefix, Coordinates, DateWindow, Scene};
use crate::config::StacSettings;
use crate::services::bbox::BoundingBox;
use crate::upstream::{
    DataCubeClient, StacItem, StacItemCollection, StacSearchParams, UpstreamResult,
};

/// Optional narrowing applied after the merge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneFilter {
    pub collection: Option<String>,
    pub window: DateWindow,
}

impl SceneFilter {
    pub fn is_empty(&self) -> bool {
        self.collection.is_none() && self.window == DateWindow::default()
    }

    pub fn matches(&self, item: &StacItem) -> bool {
        if let Some(wanted) = &self.collection {
            if item.collection.as_deref() != Some(wanted.as_str()) {
                return false;
            }
        }
        if self.window == DateWindow::default() {
            return true;
        }
        item.properties
            .datetime
            .as_deref()
            .is_some_and(|dt| self.window.contains(dt))
    }
}

/// Typed view of an item; `None` when it carries no acquisition datetime.
pub fn scene_from_item(item: &StacItem) -> Option<Scene> {
    let datetime = item.properties.datetime.clone()?;
    Some(Scene {
        id: item.id.clone(),
        collection: item.collection.clone().unwrap_or_default(),
        date: iso_date_prefix(&datetime).to_string(),
        datetime,
        cloud_cover: item.properties.cloud_cover,
    })
}

/// Typed scenes of a search result, newest first; undated items are skipped.
pub fn scenes_of(collection: &StacItemCollection) -> Vec<Scene> {
    let mut scenes: Vec<Scene> = collection.features.iter().filter_map(scene_from_item).collect();
    scenes.sort_by(|a, b| {
        b.datetime
            .cmp(&a.datetime)
            .then_with(|| a.collection.cmp(&b.collection))
    });
    scenes
}

/// Concatenate pages keeping the first item seen for every id.
pub fn merge_unique(pages: impl IntoIterator<Item = Vec<StacItem>>) -> Vec<StacItem> {
    let mut seen = HashSet::new();
    pages
        .into_iter()
        .flatten()
        .filter(|item| seen.insert(item.id.clone()))
        .collect()
}

/// Run the targeted and broad searches concurrently and merge them.
///
/// Either search failing fails the whole request.
pub async fn search_scenes(
    client: &dyn DataCubeClient,
    settings: &StacSettings,
    point: Coordinates,
    filter: &SceneFilter,
) -> UpstreamResult<StacItemCollection> {
    let bbox = BoundingBox::around(point, settings.bbox_epsilon);
    let broad_params = StacSearchParams::new(bbox, settings.search_limit);
    let targeted_params = broad_params.clone().collections(&settings.collections);

    log::debug!("STAC search around {} with bbox {}", point, bbox);
    let (targeted, broad) = futures::future::try_join(
        client.search_items(&targeted_params),
        client.search_items(&broad_params),
    )
    .await?;

    let mut merged = broad;
    let features = merge_unique([targeted.features, std::mem::take(&mut merged.features)]);
    merged.features = features
        .into_iter()
        .filter(|item| filter.matches(item))
        .collect();
    merged.context = Some(serde_json::json!({
        "returned": merged.features.len(),
        "limit": settings.search_limit.saturating_mul(2),
    }));

    log::info!(
        "STAC search around {} returned {} unique items",
        point,
        merged.features.len()
    );
    Ok(merged)
}
