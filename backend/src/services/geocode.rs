//! Free-text place lookup.

use serde::Serialize;

use crate::upstream::{DataCubeClient, UpstreamResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeocodeMatch {
    pub lat: f64,
    pub lon: f64,
    pub display_name: String,
}

/// Resolve `query` to the geocoder's first hit.
///
/// A hit whose coordinates do not parse counts as no match.
pub async fn geocode(
    client: &dyn DataCubeClient,
    query: &str,
) -> UpstreamResult<Option<GeocodeMatch>> {
    let places = client.geocode(query).await?;
    let found = places.into_iter().next().and_then(|place| {
        Some(GeocodeMatch {
            lat: place.lat.as_f64()?,
            lon: place.lon.as_f64()?,
            display_name: place.display_name,
        })
    });
    if found.is_none() {
        log::info!("Geocoder found no match for '{}'", query);
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::models::NumberOrText;
    use crate::upstream::{GeocodePlace, LocalDataCubeClient};

    #[tokio::test]
    async fn test_known_place() {
        let client = LocalDataCubeClient::with_sample_data();
        let hit = geocode(&client, "jacareí, sp").await.unwrap().unwrap();
        assert_eq!(hit.lat, -23.3054);
        assert_eq!(hit.lon, -45.9659);
        assert!(hit.display_name.starts_with("Jacareí"));
    }

    #[tokio::test]
    async fn test_unknown_place() {
        let client = LocalDataCubeClient::with_sample_data();
        assert_eq!(geocode(&client, "Atlantis").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unparsable_coordinates() {
        let client = LocalDataCubeClient::new();
        client.add_place(
            "nowhere",
            GeocodePlace {
                lat: NumberOrText::Text("north".into()),
                lon: NumberOrText::Number(1.0),
                display_name: "Nowhere".into(),
            },
        );
        assert_eq!(geocode(&client, "nowhere").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_failure_is_relayed() {
        let client = LocalDataCubeClient::with_sample_data();
        client.fail_geocode(503, "Service Unavailable");
        let err = geocode(&client, "Jacareí, SP").await.unwrap_err();
        assert_eq!(err.status_code(), Some(503));
    }
}
