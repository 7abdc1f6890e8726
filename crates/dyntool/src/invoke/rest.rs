//! `rest` tools: one HTTP request per invocation.

use reqwest::Url;
use serde_json::{Map, Value, json};

use crate::spec::HttpMethod;

/// Call `endpoint` with `params`.
///
/// `GET` sends params as a query string (nulls dropped, strings unquoted);
/// other methods send them as a JSON body. A non-2xx status is an error.
/// The result is `{"data": <json or text>, "http_status": <code>}`.
pub async fn call(
    client: &reqwest::Client,
    endpoint: &str,
    method: HttpMethod,
    params: &Map<String, Value>,
) -> Result<Value, String> {
    let request = match method {
        HttpMethod::Get => client.get(query_url(endpoint, params)?),
        other => client.request(other.into(), endpoint).json(params),
    };
    let response = request
        .send()
        .await
        .map_err(|e| format!("{method} {endpoint} failed: {e}"))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| format!("reading response from {endpoint}: {e}"))?;
    if !status.is_success() {
        return Err(format!("{method} {endpoint} returned HTTP {status}: {body}"));
    }
    let data = serde_json::from_str(&body).unwrap_or(Value::String(body));
    Ok(json!({ "data": data, "http_status": status.as_u16() }))
}

/// Append params to the endpoint's existing query string.
fn query_url(endpoint: &str, params: &Map<String, Value>) -> Result<Url, String> {
    let mut url =
        Url::parse(endpoint).map_err(|e| format!("invalid endpoint '{endpoint}': {e}"))?;
    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in params {
            match value {
                Value::Null => {}
                Value::String(s) => {
                    pairs.append_pair(key, s);
                }
                other => {
                    pairs.append_pair(key, &other.to_string());
                }
            }
        }
    }
    Ok(url)
}
