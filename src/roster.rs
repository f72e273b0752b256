// src/roster.rs
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::{config::AirtableConfig, models::RosterRecord};

#[derive(Debug, Error)]
pub enum DataSourceError {
    #[error("roster request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("roster source returned HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("malformed roster response: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[async_trait]
pub trait RosterSource: Send + Sync {
    async fn fetch_roster(&self) -> Result<Vec<RosterRecord>, DataSourceError>;
}

#[derive(Debug, Deserialize)]
struct ListRecordsPage {
    #[serde(default)]
    records: Vec<AirtableRow>,
    #[serde(default)]
    offset: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AirtableRow {
    #[serde(default)]
    id: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

/// Reads one view of one Airtable table
pub struct AirtableRoster {
    client: Client,
    list_url: Url,
    cfg: AirtableConfig,
}

impl AirtableRoster {
    pub fn new(cfg: AirtableConfig, timeout: Duration) -> eyre::Result<Self> {
        let mut list_url = Url::parse(&cfg.api_url)?;
        list_url
            .path_segments_mut()
            .map_err(|_| eyre::eyre!("AIRTABLE_API_URL cannot be a base URL: {}", cfg.api_url))?
            .pop_if_empty()
            .extend(["v0", cfg.base_id.as_str(), cfg.table_name.as_str()]);

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            list_url,
            cfg,
        })
    }

    async fn fetch_page(&self, offset: Option<&str>) -> Result<ListRecordsPage, DataSourceError> {
        let mut req = self
            .client
            .get(self.list_url.clone())
            .bearer_auth(&self.cfg.api_token)
            .query(&[("view", self.cfg.view.as_str())]);
        if let Some(offset) = offset {
            req = req.query(&[("offset", offset)]);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(DataSourceError::Status { status, body: text });
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// Every page of the view, incomplete rows dropped
    pub async fn fetch_all(&self) -> Result<Vec<RosterRecord>, DataSourceError> {
        info!(
            "Fetching roster from table {:?} (view {:?})",
            self.cfg.table_name, self.cfg.view
        );

        let mut records = Vec::new();
        let mut raw_count = 0usize;
        let mut offset: Option<String> = None;

        loop {
            let page = self.fetch_page(offset.as_deref()).await?;
            raw_count += page.records.len();

            for row in &page.records {
                match parse_row(&row.fields, &self.cfg.name_field, &self.cfg.address_field) {
                    Some(record) => records.push(record),
                    None => debug!("Skipped roster row {} (missing name or address)", row.id),
                }
            }

            match page.offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        info!("Roster: {} valid of {} rows", records.len(), raw_count);
        Ok(records)
    }
}

#[async_trait]
impl RosterSource for AirtableRoster {
    async fn fetch_roster(&self) -> Result<Vec<RosterRecord>, DataSourceError> {
        self.fetch_all().await
    }
}

/// Text of a cell; a multi-value (lookup) cell yields its first element.
fn cell_text(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.as_str(),
        Value::Array(items) => items.first()?.as_str()?,
        _ => return None,
    };
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// A roster record if the row has both a name and an address
pub fn parse_row(
    fields: &Map<String, Value>,
    name_field: &str,
    address_field: &str,
) -> Option<RosterRecord> {
    let name = cell_text(fields.get(name_field))?;
    let address = cell_text(fields.get(address_field))?;
    Some(RosterRecord { name, address })
}
