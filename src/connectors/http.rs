use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::domain::DataSourceConfig;
use crate::error::{FpmaError, Result};
use crate::validation::RawRecord;

use super::{optional, required, ConnectorLifecycle, ConnectorState, DataSource};

#[derive(Debug, Clone)]
enum AuthMode {
    None,
    Basic { username: String, password: String },
    Oauth2 { token_url: String, client_id: String, client_secret: String },
    ApiKey { header_name: String, value: String },
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Shared REST/SOAP/GraphQL connector. SOAP and GraphQL both ride the same
/// HTTP verb/auth/pagination machinery as REST; a GraphQL query, if
/// configured, rides along as the request body.
pub struct HttpConnector {
    api_url: String,
    auth: AuthMode,
    data_key: String,
    next_page_key: String,
    graphql_query: Option<String>,
    extra_headers: HashMap<String, String>,
    use_pagination: bool,
    client: Client,
    token: Mutex<Option<CachedToken>>,
    lifecycle: ConnectorLifecycle,
}

impl HttpConnector {
    pub fn new(config: &DataSourceConfig) -> Result<Self> {
        let api_url = required(&config.connection_params, "api_url")?;
        let auth_type = optional(&config.connection_params, "auth_type", "none");
        let auth = match auth_type.as_str() {
            "basic" => AuthMode::Basic {
                username: required(&config.connection_params, "username")?,
                password: required(&config.connection_params, "password")?,
            },
            "oauth2" => AuthMode::Oauth2 {
                token_url: required(&config.connection_params, "token_url")?,
                client_id: required(&config.connection_params, "client_id")?,
                client_secret: required(&config.connection_params, "client_secret")?,
            },
            "api_key" => AuthMode::ApiKey {
                header_name: optional(&config.connection_params, "header_name", "X-API-Key"),
                value: required(&config.connection_params, "api_key")?,
            },
            _ => AuthMode::None,
        };

        let mut extra_headers = HashMap::new();
        if let Some(system_id) = config.connection_params.get("system_id") {
            extra_headers.insert("x-sap-system-id".to_string(), system_id.clone());
        }
        if let Some(client_number) = config.connection_params.get("client_number") {
            extra_headers.insert("x-sap-client".to_string(), client_number.clone());
        }
        if let Some(environment) = config.connection_params.get("environment") {
            extra_headers.insert("X-JDA-Environment".to_string(), environment.clone());
        }
        if let Some(tenant_id) = config.connection_params.get("tenant_id") {
            extra_headers.insert("X-Tenant-Id".to_string(), tenant_id.clone());
        }

        Ok(Self {
            api_url,
            auth,
            data_key: optional(&config.connection_params, "data_key", "data"),
            next_page_key: optional(&config.connection_params, "next_page_key", "next_page"),
            graphql_query: config.connection_params.get("graphql_query").cloned(),
            extra_headers,
            use_pagination: optional(&config.connection_params, "use_pagination", "false")
                .parse()
                .unwrap_or(false),
            client: Client::new(),
            token: Mutex::new(None),
            lifecycle: ConnectorLifecycle::new(),
        })
    }

    async fn ensure_token(&self) -> Result<Option<String>> {
        let AuthMode::Oauth2 { token_url, client_id, client_secret } = &self.auth else {
            return Ok(None);
        };

        {
            let guard = self.token.lock().expect("token cache poisoned");
            if let Some(cached) = guard.as_ref() {
                if cached.expires_at > Instant::now() {
                    return Ok(Some(cached.access_token.clone()));
                }
            }
        }

        let token = self.fetch_token(token_url, client_id, client_secret).await?;
        let mut guard = self.token.lock().expect("token cache poisoned");
        let access_token = token.access_token.clone();
        *guard = Some(token);
        Ok(Some(access_token))
    }

    async fn fetch_token(&self, token_url: &str, client_id: &str, client_secret: &str) -> Result<CachedToken> {
        let resp: Value = self
            .client
            .post(token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ])
            .send()
            .await?
            .json()
            .await?;

        let access_token = resp
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| FpmaError::authentication("oauth2 token response missing access_token"))?
            .to_string();
        // expiry = expires_in - 60s, to refresh slightly before it actually lapses.
        let expires_in = resp.get("expires_in").and_then(Value::as_u64).unwrap_or(3600);
        let ttl = expires_in.saturating_sub(60);

        Ok(CachedToken {
            access_token,
            expires_at: Instant::now() + Duration::from_secs(ttl),
        })
    }

    async fn authorized_request(
        &self,
        url: &str,
        retry_on_401: bool,
    ) -> Result<Value> {
        let mut request = self.client.get(url);
        for (name, value) in &self.extra_headers {
            request = request.header(name, value);
        }

        request = match &self.auth {
            AuthMode::None => request,
            AuthMode::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            }
            AuthMode::Oauth2 { .. } => {
                let token = self.ensure_token().await?;
                match token {
                    Some(token) => request.bearer_auth(token),
                    None => request,
                }
            }
            AuthMode::ApiKey { header_name, value } => request.header(header_name, value),
        };

        if let Some(query) = &self.graphql_query {
            request = request.json(&serde_json::json!({ "query": query }));
        }

        let response = request.send().await?;

        if response.status().as_u16() == 401 && retry_on_401 && matches!(self.auth, AuthMode::Oauth2 { .. }) {
            // Invalidate cached token and retry exactly once.
            *self.token.lock().expect("token cache poisoned") = None;
            return Box::pin(self.authorized_request(url, false)).await;
        }

        if !response.status().is_success() {
            return Err(FpmaError::integration(format!(
                "request to {url} failed with status {}",
                response.status()
            )));
        }

        response.json::<Value>().await.map_err(FpmaError::from)
    }

    fn extract_page(&self, body: &Value) -> Vec<RawRecord> {
        // SAP OData wraps results in {d: {results: [...]}}; everything else
        // uses `data_key` directly.
        let array = body
            .get("d")
            .and_then(|d| d.get("results"))
            .or_else(|| body.get(&self.data_key))
            .and_then(Value::as_array);

        let Some(array) = array else {
            return Vec::new();
        };

        array
            .iter()
            .filter_map(|item| item.as_object())
            .map(|obj| {
                obj.iter()
                    .map(|(k, v)| (k.clone(), value_to_string(v)))
                    .collect()
            })
            .collect()
    }

    fn has_next_page(&self, body: &Value) -> bool {
        body.get(&self.next_page_key)
            .map(|v| !v.is_null() && v.as_bool() != Some(false))
            .unwrap_or(false)
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SourceType;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(api_url: String) -> DataSourceConfig {
        let mut params = HashMap::new();
        params.insert("api_url".to_string(), api_url);
        params.insert("auth_type".to_string(), "none".to_string());
        DataSourceConfig::new("test-rest", SourceType::Rest).with_connection_params(params)
    }

    #[tokio::test]
    async fn fetch_parses_data_array() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"origin": "LAX", "freight_charge": "1200.00"}],
            })))
            .mount(&server)
            .await;

        let connector = HttpConnector::new(&config_for(server.uri())).unwrap();
        let rows = connector.fetch(&HashMap::new(), None).await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("origin"), Some(&"LAX".to_string()));
    }

    #[tokio::test]
    async fn fetch_follows_pagination_until_empty_page() {
        let server = MockServer::start().await;
        let mut config = config_for(server.uri());
        config
            .connection_params
            .insert("use_pagination".to_string(), "true".to_string());

        Mock::given(method("GET"))
            .and(path("/"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"origin": "LAX"}],
                "next_page": true,
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [],
                "next_page": false,
            })))
            .mount(&server)
            .await;

        let connector = HttpConnector::new(&config).unwrap();
        let rows = connector.fetch(&HashMap::new(), None).await.unwrap();

        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn fetch_respects_limit_across_pages() {
        let server = MockServer::start().await;
        let mut config = config_for(server.uri());
        config
            .connection_params
            .insert("use_pagination".to_string(), "true".to_string());

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"origin": "LAX"}, {"origin": "SFO"}, {"origin": "SEA"}],
                "next_page": true,
            })))
            .mount(&server)
            .await;

        let connector = HttpConnector::new(&config).unwrap();
        let rows = connector.fetch(&HashMap::new(), Some(2)).await.unwrap();

        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn non_success_status_becomes_integration_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let connector = HttpConnector::new(&config_for(server.uri())).unwrap();
        let err = connector.fetch(&HashMap::new(), None).await.unwrap_err();

        assert!(matches!(err, FpmaError::Integration { .. }));
    }

    #[tokio::test]
    async fn sap_odata_envelope_is_unwrapped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "d": {"results": [{"origin": "ORD"}]},
            })))
            .mount(&server)
            .await;

        let connector = HttpConnector::new(&config_for(server.uri())).unwrap();
        let rows = connector.fetch(&HashMap::new(), None).await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("origin"), Some(&"ORD".to_string()));
    }
}

#[async_trait]
impl DataSource for HttpConnector {
    async fn test_connection(&self) -> Result<()> {
        self.authorized_request(&self.api_url, true).await.map(|_| ())
    }

    async fn connect(&self) -> Result<()> {
        self.lifecycle.mark_connected();
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.lifecycle.mark_disconnected();
        Ok(())
    }

    async fn fetch(
        &self,
        _query_params: &HashMap<String, String>,
        limit: Option<usize>,
    ) -> Result<Vec<RawRecord>> {
        if self.lifecycle.state() == ConnectorState::New {
            self.connect().await?;
        }
        self.lifecycle.mark_fetching();

        let mut out = Vec::new();
        let mut page = 1u64;
        loop {
            let url = if self.use_pagination {
                format!("{}?page={page}", self.api_url)
            } else {
                self.api_url.clone()
            };

            let body = self.authorized_request(&url, true).await?;
            let rows = self.extract_page(&body);
            if rows.is_empty() {
                break;
            }
            out.extend(rows);

            if let Some(limit) = limit {
                if out.len() >= limit {
                    out.truncate(limit);
                    break;
                }
            }

            if !self.use_pagination || !self.has_next_page(&body) {
                break;
            }
            page += 1;
        }

        self.lifecycle.mark_connected();
        Ok(out)
    }

    fn state(&self) -> ConnectorState {
        self.lifecycle.state()
    }
}
