//! Attribute discovery for WTSS coverages.
//!
//! Some coverages answer the describe call with 404 even though they serve
//! time series. For coverages listed in `wtss.attribute_fallbacks` that 404 is
//! replaced by the configured attribute list.

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use crate::upstream::{DataCubeClient, UpstreamResult};

/// Where an attribute list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeSource {
    Upstream,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageAttributes {
    pub coverage: String,
    pub attributes: Vec<String>,
    pub source: AttributeSource,
}

/// Split a comma-separated list of names, dropping blanks and repeats.
pub fn parse_name_list(raw: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .filter(|c| seen.insert(c.to_string()))
        .map(str::to_string)
        .collect()
}

/// Describe one coverage, substituting the fallback list on a 404.
pub async fn describe_attributes(
    client: &dyn DataCubeClient,
    coverage: &str,
    fallbacks: &BTreeMap<String, Vec<String>>,
) -> UpstreamResult<CoverageAttributes> {
    match client.describe_coverage(coverage).await {
        Ok(description) => Ok(CoverageAttributes {
            coverage: coverage.to_string(),
            attributes: description.attribute_names(),
            source: AttributeSource::Upstream,
        }),
        Err(err) if err.is_not_found() => match fallbacks.get(coverage) {
            Some(attributes) => {
                log::warn!(
                    "Coverage {} not described upstream ({}), using fallback attributes",
                    coverage,
                    err
                );
                Ok(CoverageAttributes {
                    coverage: coverage.to_string(),
                    attributes: attributes.clone(),
                    source: AttributeSource::Fallback,
                })
            }
            None => Err(err),
        },
        Err(err) => Err(err),
    }
}

/// Describe all coverages concurrently; the first failure in input order wins.
pub async fn discover_attributes(
    client: &dyn DataCubeClient,
    coverages: &[String],
    fallbacks: &BTreeMap<String, Vec<String>>,
) -> UpstreamResult<Vec<CoverageAttributes>> {
    futures::future::join_all(
        coverages
            .iter()
            .map(|coverage| describe_attributes(client, coverage, fallbacks)),
    )
    .await
    .into_iter()
    .collect()
}

/// Union of attribute names in first-seen order.
pub fn union_attributes(described: &[CoverageAttributes]) -> Vec<String> {
    let mut seen = HashSet::new();
    described
        .iter()
        .flat_map(|c| c.attributes.iter())
        .filter(|a| seen.insert(a.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WtssSettings;
    use crate::upstream::LocalDataCubeClient;

    fn fallbacks() -> BTreeMap<String, Vec<String>> {
        WtssSettings::default().attribute_fallbacks
    }

    #[test]
    fn test_parse_name_list() {
        assert_eq!(
            parse_name_list(" S2-16D-2, ,LANDSAT-16D-1,S2-16D-2"),
            vec!["S2-16D-2", "LANDSAT-16D-1"]
        );
        assert!(parse_name_list(" , ").is_empty());
    }

    #[tokio::test]
    async fn test_fallback_on_not_found() {
        let client = LocalDataCubeClient::with_sample_data();
        let described = describe_attributes(&client, "S2-16D-2", &fallbacks())
            .await
            .unwrap();
        assert_eq!(described.source, AttributeSource::Fallback);
        assert!(described.attributes.contains(&"NDVI".to_string()));
    }

    #[tokio::test]
    async fn test_not_found_without_fallback_is_relayed() {
        let client = LocalDataCubeClient::with_sample_data();
        let err = describe_attributes(&client, "MOD13Q1-6.1", &fallbacks())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_other_errors_skip_fallback() {
        let client = LocalDataCubeClient::with_sample_data();
        client.fail_coverage("S2-16D-2", 503, "maintenance");
        let err = describe_attributes(&client, "S2-16D-2", &fallbacks())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(503));
    }

    #[tokio::test]
    async fn test_discover_many() {
        let client = LocalDataCubeClient::with_sample_data();
        let coverages = parse_name_list("LANDSAT-16D-1,S2-16D-2");
        let described = discover_attributes(&client, &coverages, &fallbacks())
            .await
            .unwrap();
        assert_eq!(described.len(), 2);
        assert_eq!(described[0].coverage, "LANDSAT-16D-1");
        assert_eq!(described[0].source, AttributeSource::Upstream);
        assert_eq!(described[1].source, AttributeSource::Fallback);

        let union = union_attributes(&described);
        assert_eq!(union.iter().filter(|a| *a == "NDVI").count(), 1);
        assert_eq!(union[0], "blue");
    }
}
