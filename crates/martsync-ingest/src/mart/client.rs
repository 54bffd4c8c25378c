//! HTTP client for a BioMart `martservice` endpoint

use super::parser::TsvRowParser;
use super::query::query_document;
use super::{MartQuery, MartSource, SourceError};
use crate::config::MartConfig;
use async_trait::async_trait;
use futures::TryStreamExt;
use martsync_common::types::Row;
use reqwest::Client;
use tokio::io::AsyncBufReadExt;
use tokio_util::io::StreamReader;
use tracing::{debug, instrument};

const MARTSERVICE_PATH: &str = "martservice";

/// Longest slice of an error body kept in a rejection message
const MAX_ERROR_BODY: usize = 512;

/// Queries one BioMart dataset over HTTP.
///
/// Any non-success HTTP status is reported as [`SourceError::Rejected`];
/// connection failures and broken response streams as
/// [`SourceError::Transport`].
#[derive(Debug, Clone)]
pub struct BiomartClient {
    client: Client,
    endpoint: String,
    dataset: String,
}

impl BiomartClient {
    pub fn new(config: &MartConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("martsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(SourceError::transport)?;

        Ok(Self {
            client,
            endpoint: martservice_url(&config.server_url),
            dataset: config.dataset.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }
}

#[async_trait]
impl MartSource for BiomartClient {
    #[instrument(skip(self, query), fields(values = query.values.len()))]
    async fn query(&self, query: &MartQuery) -> Result<Vec<Row>, SourceError> {
        let document = query_document(&self.dataset, query)?;

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("query", document.as_str())])
            .send()
            .await
            .map_err(SourceError::transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message: String = body.trim().chars().take(MAX_ERROR_BODY).collect();
            return Err(SourceError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let stream = Box::pin(response.bytes_stream().map_err(std::io::Error::other));
        let mut lines = StreamReader::new(stream).lines();
        let mut parser = TsvRowParser::new(query.arity());
        let mut rows = Vec::new();

        while let Some(line) = lines.next_line().await.map_err(SourceError::transport)? {
            if let Some(row) = parser.parse_line(&line)? {
                rows.push(row);
            }
        }

        debug!(rows = rows.len(), "Mart query complete");
        Ok(rows)
    }
}

fn martservice_url(server_url: &str) -> String {
    let base = server_url.trim_end_matches('/');
    if base.ends_with(MARTSERVICE_PATH) {
        base.to_string()
    } else {
        format!("{}/{}", base, MARTSERVICE_PATH)
    }
}
