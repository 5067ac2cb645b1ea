mod client;
mod basic;
pub mod auth;

pub use client::HttpClient;
pub use basic::BasicClient;

use anyhow::{Context, Result, bail};
use bytes::Bytes;
use tracing::debug;

use crate::config::{FeedAuth, OperatorConfig};
use crate::model::OperatorFeed;
use crate::parser::parse_stops;
use auth::{ApiKey, UrlParam};

pub async fn fetch_bytes<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
) -> Result<Bytes> {
    let req = reqwest::Request::new(
        reqwest::Method::GET,
        url.parse()?,
    );

    let resp = client.execute(req).await?;
    let status = resp.status();
    if !status.is_success() {
        bail!("GET {url} returned status {status}");
    }
    Ok(resp.bytes().await?)
}

/// Loads feed data from a local file path or fetches it over HTTP.
#[tracing::instrument(skip(client))]
pub async fn load_source<C: HttpClient + ?Sized>(client: &C, source: &str) -> Result<Bytes> {
    let bytes = if source.starts_with("http://") || source.starts_with("https://") {
        fetch_bytes(client, source).await?
    } else {
        tokio::fs::read(source)
            .await
            .with_context(|| format!("Failed to read '{source}'"))?
            .into()
    };
    debug!(bytes = bytes.len(), "Source loaded");
    Ok(bytes)
}

/// Builds a client that authenticates the way `auth` describes.
pub fn client_for(auth: &FeedAuth, key: Option<String>) -> Result<Box<dyn HttpClient>> {
    let basic = BasicClient::new()?;
    let client: Box<dyn HttpClient> = match (auth, key) {
        (FeedAuth::None, _) => Box::new(basic),
        (FeedAuth::UrlParam { param_name }, Some(key)) => Box::new(UrlParam {
            inner: basic,
            param_name: param_name.clone(),
            key,
        }),
        (FeedAuth::Header { header_name }, Some(key)) => {
            Box::new(ApiKey::new(basic, header_name, &key)?)
        }
        (_, None) => bail!("feed requires an API key but none was provided"),
    };
    Ok(client)
}

/// Fetches and parses one operator's stops.
#[tracing::instrument(skip(client, operator), fields(operator_id = %operator.operator.id))]
pub async fn load_operator_feed<C: HttpClient + ?Sized>(
    client: &C,
    operator: &OperatorConfig,
) -> Result<OperatorFeed> {
    let bytes = load_source(client, &operator.source).await?;
    let stops = parse_stops(&bytes)
        .with_context(|| format!("Failed to parse stops for operator '{}'", operator.operator.id))?;
    Ok(OperatorFeed::new(operator.operator.clone(), stops))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Operator, OperatorType};
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    fn operator_config(source: &str) -> OperatorConfig {
        OperatorConfig {
            operator: Operator {
                id: "CT".to_string(),
                name: "Caltrain".to_string(),
                color: "#E31837".to_string(),
                kind: OperatorType::Rail,
            },
            source: source.to_string(),
            auth: FeedAuth::None,
            api_key_env: None,
        }
    }

    #[tokio::test]
    async fn test_load_operator_feed_from_file() {
        let path = temp_path("station_consolidator_test_feed.txt");
        fs::write(
            &path,
            "stop_id,stop_name,stop_lat,stop_lon,parent_station\n\
             70011,San Francisco Caltrain Northbound,37.77639,-122.394992,sf\n\
             70012,San Francisco Caltrain Southbound,37.776348,-122.394935,sf\n",
        )
        .unwrap();

        let feed = load_operator_feed(&BasicClient::new().unwrap(), &operator_config(&path))
            .await
            .unwrap();

        assert_eq!(feed.operator.id, "CT");
        assert_eq!(feed.stops.len(), 2);
        assert_eq!(feed.stops[0].station_key(), "sf");

        fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_load_missing_file_fails() {
        let result = load_source(&BasicClient::new().unwrap(), "/nonexistent/stops.txt").await;
        assert!(result.is_err());
    }

    #[test]
    fn test_client_for_requires_key_when_authenticated() {
        let auth = FeedAuth::UrlParam {
            param_name: "api_key".to_string(),
        };
        assert!(client_for(&auth, None).is_err());
        assert!(client_for(&auth, Some("k".to_string())).is_ok());
        assert!(client_for(&FeedAuth::None, None).is_ok());
    }

    #[test]
    fn test_client_for_rejects_bad_header() {
        let auth = FeedAuth::Header {
            header_name: "not a header".to_string(),
        };
        assert!(client_for(&auth, Some("k".to_string())).is_err());
    }
}
