use anyhow::{Context, Result};

use nutrilog_core::error::TrackerError;
use nutrilog_core::models::FoodCandidate;
use nutrilog_core::usda::{SearchResponse, candidates_from_response, validate_query};

pub const DEFAULT_ENDPOINT: &str = "https://api.nal.usda.gov/fdc/v1/foods/search";
const PAGE_SIZE: &str = "10";

/// Client for the USDA `FoodData Central` search endpoint.
pub struct UsdaClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl UsdaClient {
    pub fn new(endpoint: &str, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "nutrilog/{} (protein and fiber tracker)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(std::time::Duration::from_secs(10))
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Search for `query`.
    ///
    /// A blank query fails with [`TrackerError::BlankQuery`] before anything
    /// is sent. Every other failure (connection, status, body) becomes
    /// [`TrackerError::SearchFailed`].
    pub async fn search_async(&self, query: &str) -> Result<Vec<FoodCandidate>> {
        let query = validate_query(query)?;
        self.fetch(query)
            .await
            .map_err(|e| TrackerError::SearchFailed(format!("{e:#}")).into())
    }

    async fn fetch(&self, query: &str) -> Result<Vec<FoodCandidate>> {
        // Errors are stripped of their URL: it carries the API key.
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("query", query),
                ("pageSize", PAGE_SIZE),
            ])
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("Failed to reach USDA FoodData Central")?
            .error_for_status()
            .map_err(reqwest::Error::without_url)
            .context("USDA FoodData Central rejected the request")?;

        let data: SearchResponse = resp
            .json()
            .await
            .map_err(reqwest::Error::without_url)
            .context("Failed to parse USDA search response")?;

        Ok(candidates_from_response(data))
    }
}
