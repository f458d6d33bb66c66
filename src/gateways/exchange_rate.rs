//! Exchange rates from an exchangerate.host style API

use super::traits::RateProvider;
use crate::config::FxSettings;
use crate::error::{Error, Result};
use crate::network::{ApiRequest, HttpClient};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

const PROVIDER: &str = "exchange_rate";

/// Live rate source
pub struct HttpRateProvider {
    client: HttpClient,
    api_url: String,
    api_key: Option<String>,
}

impl HttpRateProvider {
    pub fn new(client: HttpClient, settings: &FxSettings) -> Self {
        Self {
            client,
            api_url: settings.api_url.clone(),
            api_key: settings.api_key.clone().filter(|k| !k.is_empty()),
        }
    }
}

/// Pull a positive rate out of `result`, `info.rate` or `rates.<to>`
fn extract_rate(body: &Value, to: &str) -> Option<f64> {
    body.get("result")
        .and_then(Value::as_f64)
        .or_else(|| body.pointer("/info/rate").and_then(Value::as_f64))
        .or_else(|| body.get("rates").and_then(|r| r.get(to)).and_then(Value::as_f64))
        .filter(|rate| rate.is_finite() && *rate > 0.0)
}

#[async_trait]
impl RateProvider for HttpRateProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn get_rate(&self, from: &str, to: &str) -> Result<f64> {
        let from = from.to_ascii_uppercase();
        let to = to.to_ascii_uppercase();

        let mut request = ApiRequest::get(&self.api_url)
            .param("from", &from)
            .param("to", &to)
            .param("amount", "1");
        if let Some(ref key) = self.api_key {
            request = request.param("access_key", key);
        }

        let response = self.client.execute(request).await?;
        if !response.is_success() {
            return Err(Error::upstream(
                PROVIDER,
                format!("HTTP {}: {}", response.status, response.preview(300)),
            ));
        }

        let body: Value = response.json()?;
        let rate = extract_rate(&body, &to).ok_or_else(|| {
            Error::Fx(format!("no {}->{} rate in response: {}", from, to, response.preview(200)))
        })?;

        debug!("Fetched rate {}->{} = {}", from, to, rate);
        Ok(rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer, api_key: Option<&str>) -> HttpRateProvider {
        let settings = FxSettings {
            api_url: format!("{}/convert", server.uri()),
            api_key: api_key.map(String::from),
            ..Default::default()
        };
        HttpRateProvider::new(HttpClient::new().unwrap(), &settings)
    }

    #[test]
    fn test_extract_rate_shapes() {
        assert_eq!(extract_rate(&json!({"result": 56.5}), "ETB"), Some(56.5));
        assert_eq!(extract_rate(&json!({"info": {"rate": 57.0}}), "ETB"), Some(57.0));
        assert_eq!(extract_rate(&json!({"rates": {"ETB": 58.25}}), "ETB"), Some(58.25));
        assert_eq!(extract_rate(&json!({"result": 0}), "ETB"), None);
        assert_eq!(extract_rate(&json!({"success": false}), "ETB"), None);
    }

    #[tokio::test]
    async fn test_get_rate_sends_access_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("from", "USD"))
            .and(query_param("to", "ETB"))
            .and(query_param("access_key", "k"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": 56.5})))
            .expect(1)
            .mount(&server)
            .await;

        let rate = provider(&server, Some("k")).get_rate("usd", "etb").await.unwrap();
        assert_eq!(rate, 56.5);
    }

    #[tokio::test]
    async fn test_missing_rate_is_fx_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": false})))
            .mount(&server)
            .await;

        let result = provider(&server, None).get_rate("USD", "ETB").await;
        assert!(matches!(result, Err(Error::Fx(_))));
    }
}
