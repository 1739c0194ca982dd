//! Kusto management client over the v1 REST endpoint.

use crate::query::{
    BoxFuture, BufferedRows, InlineError, QueryClient, Row, RowEvent, RowIterator, Stmt,
};
use crate::traced::QueryClientExt;
use crate::transport::{Transport, json_request};
use crate::{BoxError, Cluster, Result};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Serialize)]
struct MgmtRequest<'a> {
    db: &'a str,
    csl: &'a str,
}

/// [`QueryClient`] that POSTs management commands to `<cluster>/v1/rest/mgmt`.
///
/// The response is read in full before iteration starts, so stopping the
/// iterator early only drops buffered rows.
#[derive(Clone)]
pub struct KustoClient {
    endpoint: String,
    transport: Arc<dyn Transport>,
}

impl KustoClient {
    pub fn new(endpoint: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            endpoint: endpoint.into(),
            transport,
        }
    }

    async fn run_mgmt(&self, database: &str, stmt: &Stmt) -> Result<BufferedRows, BoxError> {
        let url = format!("{}/v1/rest/mgmt", self.endpoint.trim_end_matches('/'));
        let request = json_request(
            Method::POST,
            &url,
            Some(&MgmtRequest {
                db: database,
                csl: stmt.as_str(),
            }),
        )?;
        let response = self.transport.send(request).await?.expect_success()?;
        let body: Value = response.json()?;
        Ok(BufferedRows::new(parse_v1_rows(&body)?))
    }
}

impl QueryClient for KustoClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn mgmt<'a>(
        &'a self,
        database: &'a str,
        stmt: &'a Stmt,
    ) -> BoxFuture<'a, Result<Box<dyn RowIterator + 'a>, BoxError>> {
        Box::pin(async move {
            let rows = self.run_mgmt(database, stmt).await?;
            Ok(Box::new(rows) as Box<dyn RowIterator + 'a>)
        })
    }
}

impl Cluster {
    /// Connect to a cluster over `transport`, with every management call
    /// traced.
    pub fn connect(uri: impl Into<String>, transport: Arc<dyn Transport>) -> Result<Self> {
        let uri = uri.into();
        let client = KustoClient::new(uri.clone(), transport).traced();
        Cluster::new(uri, client)
    }
}

/// Decode the primary table of a v1 response into row events.
///
/// Array rows become [`RowEvent::Row`]; objects carrying an `Exceptions`
/// array become [`RowEvent::Inline`]; anything else is a terminal error at
/// its position.
pub fn parse_v1_rows(body: &Value) -> Result<Vec<Result<RowEvent, BoxError>>, BoxError> {
    let table = body
        .get("Tables")
        .and_then(Value::as_array)
        .and_then(|tables| tables.first())
        .ok_or("response has no tables")?;
    let rows = table
        .get("Rows")
        .and_then(Value::as_array)
        .ok_or("primary table has no rows")?;

    Ok(rows
        .iter()
        .enumerate()
        .map(|(index, row)| decode_row(index, row))
        .collect())
}

fn decode_row(index: usize, row: &Value) -> Result<RowEvent, BoxError> {
    match row {
        Value::Array(cells) => cells
            .iter()
            .map(cell_to_string)
            .collect::<Option<Vec<_>>>()
            .map(|values| RowEvent::Row(Row::new(values)))
            .ok_or_else(|| format!("row {index} has a non-scalar cell").into()),
        Value::Object(fields) => match fields.get("Exceptions").and_then(Value::as_array) {
            Some(exceptions) => {
                let message = exceptions
                    .iter()
                    .map(|e| e.as_str().map(str::to_string).unwrap_or_else(|| e.to_string()))
                    .collect::<Vec<_>>()
                    .join("; ");
                Ok(RowEvent::Inline(InlineError { message }))
            }
            None => Err(format!("row {index} is neither values nor exceptions").into()),
        },
        _ => Err(format!("row {index} is not an array").into()),
    }
}

fn cell_to_string(cell: &Value) -> Option<String> {
    match cell {
        Value::Null => Some(String::new()),
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}
