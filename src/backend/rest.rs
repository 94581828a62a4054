use reqwest::StatusCode;
use reqwest::header::{ACCEPT, HeaderValue};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::debug;
use url::Url;

use super::client::BackendClient;
use crate::error::GateError;
use crate::types::installation::Lookup;

/// Media type asking the data API for exactly one row as a bare object.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";
/// Error code the data API uses when a single-object request matched no rows.
pub const NO_ROWS_CODE: &str = "PGRST116";

const PREFER: &str = "Prefer";

/// How an insert treats rows that collide on the conflict target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnConflict {
    Merge,
    Ignore,
}

impl OnConflict {
    fn prefer(self) -> HeaderValue {
        match self {
            OnConflict::Merge => {
                HeaderValue::from_static("resolution=merge-duplicates,return=representation")
            }
            OnConflict::Ignore => {
                HeaderValue::from_static("resolution=ignore-duplicates,return=representation")
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RestErrorBody {
    code: Option<String>,
    message: Option<String>,
}

impl BackendClient {
    fn table_url(&self, table: &str, filters: &[(&str, String)]) -> Result<Url, GateError> {
        let mut url = self.endpoint(&format!("rest/v1/{table}"))?;
        {
            let mut pairs = url.query_pairs_mut();
            for (column, filter) in filters {
                pairs.append_pair(column, filter);
            }
        }
        Ok(url)
    }

    /// Fetch `columns` of the single row where `column = value`.
    pub async fn select_one<T: DeserializeOwned>(
        &self,
        table: &str,
        columns: &str,
        column: &str,
        value: &str,
    ) -> Result<Lookup<T>, GateError> {
        let url = self.table_url(
            table,
            &[("select", columns.to_string()), (column, format!("eq.{value}"))],
        )?;
        let resp = self
            .authorized(self.http().get(url))
            .await?
            .header(ACCEPT, SINGLE_OBJECT)
            .send()
            .await?;
        if resp.status().is_success() {
            return Ok(Lookup::Found(resp.json().await?));
        }
        match rest_error(resp).await {
            GateError::Rest { code: Some(code), .. } if code == NO_ROWS_CODE => {
                debug!(table, column, "no rows matched");
                Ok(Lookup::NotFound)
            }
            err => Err(err),
        }
    }

    /// Insert `row`, resolving conflicts on `on_conflict` as `mode` says.
    /// Returns `columns` of the rows actually written.
    pub async fn insert<T, R>(
        &self,
        table: &str,
        columns: &str,
        on_conflict: &str,
        mode: OnConflict,
        row: &T,
    ) -> Result<Vec<R>, GateError>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.table_url(
            table,
            &[
                ("on_conflict", on_conflict.to_string()),
                ("select", columns.to_string()),
            ],
        )?;
        let resp = self
            .authorized(self.http().post(url))
            .await?
            .header(PREFER, mode.prefer())
            .header(ACCEPT, "application/json")
            .json(row)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(rest_error(resp).await);
        }
        Ok(resp.json().await?)
    }

    /// Apply `patch` to rows matching every `column = value` pair.
    /// Returns `columns` of the rows that were updated.
    pub async fn update<T, R>(
        &self,
        table: &str,
        columns: &str,
        matching: &[(&str, &str)],
        patch: &T,
    ) -> Result<Vec<R>, GateError>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let mut filters: Vec<(&str, String)> = matching
            .iter()
            .map(|(column, value)| (*column, format!("eq.{value}")))
            .collect();
        filters.push(("select", columns.to_string()));
        let url = self.table_url(table, &filters)?;
        let resp = self
            .authorized(self.http().patch(url))
            .await?
            .header(PREFER, HeaderValue::from_static("return=representation"))
            .header(ACCEPT, "application/json")
            .json(patch)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(rest_error(resp).await);
        }
        Ok(resp.json().await?)
    }
}

async fn rest_error(resp: reqwest::Response) -> GateError {
    let status: StatusCode = resp.status();
    let body: RestErrorBody = resp.json().await.unwrap_or_default();
    GateError::Rest {
        status,
        code: body.code,
        message: body
            .message
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string()),
    }
}
