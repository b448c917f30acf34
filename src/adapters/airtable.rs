use crate::adapters::schema;
use crate::config::{AppConfig, TableNames};
use crate::core::query::Filter;
use crate::domain::model::{FieldBag, StoreRecord};
use crate::domain::ports::{RecordStore, Table};
use crate::utils::error::{StoreError, StoreResult};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    records: Vec<StoreRecord>,
    offset: Option<String>,
}

#[derive(Debug, Serialize)]
struct WriteRequest<'a> {
    fields: &'a FieldBag,
}

/// [`RecordStore`] backed by the Airtable REST API.
pub struct AirtableStore {
    client: Client,
    base_url: Url,
    token: String,
    tables: TableNames,
    timeout: Duration,
}

impl AirtableStore {
    pub fn new(config: &AppConfig) -> StoreResult<Self> {
        let root = config.store.api_url.trim_end_matches('/');
        let base_url = Url::parse(&format!("{}/{}/", root, config.store.base_id))?;

        Ok(Self {
            client: Client::new(),
            base_url,
            token: config.store.token.clone(),
            tables: config.tables.clone(),
            timeout: Duration::from_secs(config.store.timeout_seconds),
        })
    }

    fn table_name(&self, table: Table) -> &str {
        match table {
            Table::Chauffeurs => &self.tables.chauffeurs,
            Table::Events => &self.tables.events,
            Table::Availability => &self.tables.availability,
        }
    }

    fn table_url(&self, table: Table, record_id: Option<&str>) -> StoreResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| StoreError::Unavailable {
                message: format!("store URL {} cannot carry a path", self.base_url),
            })?;
            segments.pop_if_empty().push(self.table_name(table));
            if let Some(id) = record_id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    async fn check(response: Response) -> StoreResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn write(
        &self,
        method: reqwest::Method,
        url: Url,
        fields: &FieldBag,
    ) -> StoreResult<StoreRecord> {
        tracing::debug!("{} {}", method, url);
        let response = self
            .client
            .request(method, url)
            .bearer_auth(&self.token)
            .timeout(self.timeout)
            .json(&WriteRequest { fields })
            .send()
            .await?;

        let response = Self::check(response).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl RecordStore for AirtableStore {
    async fn list(&self, table: Table, filter: &Filter) -> StoreResult<Vec<StoreRecord>> {
        let url = self.table_url(table, None)?;
        let mut request = self
            .client
            .get(url.clone())
            .bearer_auth(&self.token)
            .timeout(self.timeout);

        if let Some(formula) = filter.to_formula() {
            request = request.query(&[("filterByFormula", formula)]);
        }
        if table == Table::Chauffeurs {
            if let Some(view) = &self.tables.chauffeur_view {
                request = request.query(&[("view", view)]);
            }
        }
        for field in schema::projection(table) {
            request = request.query(&[("fields[]", field)]);
        }

        tracing::debug!("Listing {} from {} ({:?})", table, url, filter);
        let response = Self::check(request.send().await?).await?;
        let bytes = response.bytes().await?;
        let page: ListResponse = serde_json::from_slice(&bytes)?;

        if page.offset.is_some() {
            tracing::warn!(
                "Listing {} returned more than one page; only the first {} records are used",
                table,
                page.records.len()
            );
        }
        tracing::debug!("Listed {} {} records", page.records.len(), table);
        Ok(page.records)
    }

    async fn create(&self, table: Table, fields: FieldBag) -> StoreResult<StoreRecord> {
        let url = self.table_url(table, None)?;
        self.write(reqwest::Method::POST, url, &fields).await
    }

    async fn update(&self, table: Table, id: &str, fields: FieldBag) -> StoreResult<StoreRecord> {
        let url = self.table_url(table, Some(id))?;
        self.write(reqwest::Method::PATCH, url, &fields).await
    }
}
