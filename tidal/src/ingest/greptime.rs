//! A GreptimeDB sink speaking the HTTP SQL API.
//!
//! Every statement is a form-encoded POST to `/v1/sql`. The first write to a
//! table creates it, every write after that is a single multi-row `INSERT`.

use std::{
    sync::{Mutex, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use rustc_hash::FxHashSet;
use serde::Deserialize;
use tidal_payload::Batch;
use tracing::{debug, info};

use super::{Ack, Error, Ingest};
use crate::{codec, config::Config};

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    output: Vec<Output>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    execution_time_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct Output {
    #[serde(default)]
    affectedrows: Option<u64>,
}

/// The GreptimeDB sink.
#[derive(Debug)]
pub struct Greptime {
    client: reqwest::Client,
    endpoint: String,
    database: String,
    username: String,
    password: String,
    created: Mutex<FxHashSet<String>>,
}

impl Greptime {
    /// Create a new [`Greptime`] sink from the store settings in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Build`] if the HTTP client cannot be constructed, for
    /// instance when no TLS backend is available.
    pub fn new(config: &Config) -> Result<Self, Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.write_timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|err| Error::Build(err.to_string()))?;
        let endpoint = endpoint(config);
        info!("Writing to GreptimeDB at {endpoint}");

        Ok(Self {
            client,
            endpoint,
            database: config.database.clone(),
            username: config.db_username.clone(),
            password: config.db_password.clone(),
            created: Mutex::new(FxHashSet::default()),
        })
    }

    async fn execute(&self, sql: String) -> Result<(u64, String), Error> {
        let mut request = self.client.post(&self.endpoint);
        if !self.database.is_empty() {
            request = request.query(&[("db", &self.database)]);
        }
        if !self.username.is_empty() {
            request = request.basic_auth(&self.username, Some(&self.password));
        }
        let response = request.form(&[("sql", sql)]).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                body: response.text().await?,
            });
        }
        decode(response.json::<Response>().await?)
    }

    async fn ensure_table(&self, batch: &Batch) -> Result<(), Error> {
        let table = batch.table();
        let known = self
            .created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(table);
        if known {
            return Ok(());
        }
        self.execute(codec::create_table(table, batch.columns()))
            .await?;
        debug!("Created table {table}");
        // A repeat CREATE is harmless.
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(table.to_string());
        Ok(())
    }
}

fn endpoint(config: &Config) -> String {
    let scheme = if config.db_insecure { "http" } else { "https" };
    format!("{scheme}://{}:{}/v1/sql", config.db_host, config.db_port)
}

fn decode(response: Response) -> Result<(u64, String), Error> {
    if let Some(error) = response.error {
        return Err(Error::Response(error));
    }
    let rows = response
        .output
        .iter()
        .filter_map(|output| output.affectedrows)
        .sum();
    let detail = match response.execution_time_ms {
        Some(ms) => format!("affectedrows={rows} execution_time_ms={ms}"),
        None => format!("affectedrows={rows}"),
    };
    Ok((rows, detail))
}

#[async_trait]
impl Ingest for Greptime {
    async fn write(&self, batch: &Batch) -> Result<Ack, Error> {
        if batch.is_empty() {
            return Ok(Ack {
                rows: 0,
                detail: "empty batch".to_string(),
            });
        }
        self.ensure_table(batch).await?;
        let (rows, detail) = self.execute(codec::insert(batch)).await?;
        Ok(Ack { rows, detail })
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;
    use tidal_payload::{Batch, Value};
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_string_contains, header_exists, method, path, query_param},
    };

    use super::{Error, Greptime, Ingest, Response, decode, endpoint};
    use crate::config::Config;

    fn row(ip: &str) -> Vec<Value> {
        vec![
            Value::String(ip.to_string()),
            Value::String("GET".to_string()),
            Value::String("/index.html".to_string()),
            Value::String("HTTP/1.1".to_string()),
            Value::Int32(200),
            Value::Int32(1024),
            Value::String("-".to_string()),
            Value::String("curl".to_string()),
            Value::TimestampMillisecond(1_700_000_000_000),
        ]
    }

    fn batch(rows: usize) -> Batch {
        let mut batch = Batch::with_capacity("nginx_logs_0", rows).expect("named table");
        for i in 0..rows {
            batch.push(row(&format!("10.0.0.{i}"))).expect("row fits schema");
        }
        batch
    }

    fn config(server: &MockServer) -> Config {
        let addr = server.address();
        Config {
            db_host: addr.ip().to_string(),
            db_port: addr.port(),
            db_insecure: true,
            database: "public".to_string(),
            db_username: "greptime".to_string(),
            db_password: "secret".to_string(),
            ..Config::default()
        }
    }

    fn affected(rows: u64) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "output": [{ "affectedrows": rows }],
            "execution_time_ms": 1,
        }))
    }

    fn parse(body: serde_json::Value) -> Response {
        serde_json::from_value(body).expect("response shape")
    }

    #[test]
    fn endpoint_scheme_follows_insecure() {
        let mut config = Config {
            db_host: "db.example".to_string(),
            ..Config::default()
        };
        assert_eq!(endpoint(&config), "https://db.example:5001/v1/sql");
        config.db_insecure = true;
        config.db_port = 4000;
        assert_eq!(endpoint(&config), "http://db.example:4000/v1/sql");
    }

    #[test]
    fn decode_sums_affected_rows() {
        let (rows, detail) = decode(parse(json!({
            "output": [{ "affectedrows": 3 }, { "affectedrows": 2 }],
            "execution_time_ms": 4,
        })))
        .expect("valid body");
        assert_eq!(rows, 5);
        assert_eq!(detail, "affectedrows=5 execution_time_ms=4");
    }

    #[test]
    fn decode_surfaces_store_errors() {
        let result = decode(parse(json!({ "code": 1004, "error": "Table not found" })));
        assert!(matches!(result, Err(Error::Response(msg)) if msg == "Table not found"));
    }

    #[tokio::test]
    async fn first_write_creates_table_then_inserts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/sql"))
            .and(query_param("db", "public"))
            .and(header_exists("authorization"))
            .and(body_string_contains("sql=CREATE+TABLE+IF+NOT+EXISTS+nginx_logs_0"))
            .respond_with(affected(0))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/sql"))
            .and(query_param("db", "public"))
            .and(body_string_contains("sql=INSERT+INTO+nginx_logs_0"))
            .respond_with(affected(2))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/sql"))
            .and(body_string_contains("sql=INSERT+INTO+nginx_logs_0"))
            .respond_with(affected(1))
            .expect(1)
            .mount(&server)
            .await;
        let sink = Greptime::new(&config(&server)).expect("client builds");

        let ack = sink.write(&batch(2)).await.expect("write succeeds");
        assert_eq!(ack.rows, 2);
        // The table is remembered, so only an insert goes out.
        let ack = sink.write(&batch(1)).await.expect("write succeeds");
        assert_eq!(ack.rows, 1);

        let requests = server.received_requests().await.expect("recording on");
        let bodies: Vec<String> = requests
            .iter()
            .map(|request| String::from_utf8_lossy(&request.body).into_owned())
            .collect();
        assert_eq!(bodies.len(), 3);
        assert!(bodies[0].starts_with("sql=CREATE+TABLE"));
        assert!(bodies[1].starts_with("sql=INSERT+INTO"));
        assert!(bodies[2].starts_with("sql=INSERT+INTO"));
    }

    #[tokio::test]
    async fn failed_create_is_retried_on_next_write() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("sql=CREATE+TABLE"))
            .respond_with(ResponseTemplate::new(503).set_body_string("starting"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("sql=CREATE+TABLE"))
            .respond_with(affected(0))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("sql=INSERT+INTO"))
            .respond_with(affected(1))
            .mount(&server)
            .await;
        let sink = Greptime::new(&config(&server)).expect("client builds");

        let result = sink.write(&batch(1)).await;
        assert!(
            matches!(result, Err(Error::Status { status: 503, ref body }) if body == "starting")
        );
        let ack = sink.write(&batch(1)).await.expect("write succeeds");
        assert_eq!(ack.rows, 1);
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/sql"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({ "code": 3000, "error": "boom" })),
            )
            .mount(&server)
            .await;
        let sink = Greptime::new(&config(&server)).expect("client builds");

        let result = sink.write(&batch(1)).await;
        assert!(matches!(result, Err(Error::Status { status: 500, .. })));
    }

    #[tokio::test]
    async fn malformed_body_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;
        let sink = Greptime::new(&config(&server)).expect("client builds");

        let result = sink.write(&batch(1)).await;
        assert!(matches!(result, Err(Error::Request(_))));
    }
}
