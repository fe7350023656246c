use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::from_str;
use std::time::Duration;

use crate::error::{RagError, Result};

#[derive(Clone, Debug)]
pub enum Auth {
    None,
    Bearer(String),
    Header(&'static str, String),
}

/// Blocking JSON client shared by the remote providers.
#[derive(Clone, Debug)]
pub struct JsonClient {
    client: Client,
}

impl JsonClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RagError::Config(format!("http client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        auth: &Auth,
        body: &B,
    ) -> Result<T> {
        let mut req = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .json(body);
        req = match auth {
            Auth::None => req,
            Auth::Bearer(token) => req.bearer_auth(token),
            Auth::Header(name, value) => req.header(*name, value.as_str()),
        };
        let resp = req.send().map_err(|e| transport_error("POST", url, e))?;
        let status = resp.status();
        let text = resp.text().unwrap_or_default();
        if !status.is_success() {
            return Err(RagError::ExternalService(format!(
                "POST {} failed: {} {}",
                url, status, text
            )));
        }
        from_str::<T>(&text).map_err(|e| {
            RagError::ExternalService(format!("POST {} decode failed: {} | {}", url, e, text))
        })
    }
}

fn transport_error(method: &str, url: &str, err: reqwest::Error) -> RagError {
    if err.is_timeout() {
        RagError::Timeout(format!("{} {}: {}", method, url, err))
    } else {
        RagError::ExternalService(format!("{} {}: {}", method, url, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::net::TcpListener;

    #[test]
    fn silent_server_times_out_as_retryable() {
        // Accepts connections into the backlog but never answers.
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let url = format!("http://{}/api/chat", listener.local_addr().expect("addr"));
        let client = JsonClient::new(Duration::from_secs(1)).expect("client");

        let err = client
            .post_json::<serde_json::Value, _>(&url, &Auth::None, &serde_json::json!({}))
            .expect_err("no response");
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.is_retryable());
    }

    #[test]
    fn refused_connection_is_not_retryable() {
        let addr = TcpListener::bind("127.0.0.1:0")
            .expect("bind")
            .local_addr()
            .expect("addr");
        let client = JsonClient::new(Duration::from_secs(1)).expect("client");

        let err = client
            .post_json::<serde_json::Value, _>(
                &format!("http://{}/", addr),
                &Auth::None,
                &serde_json::json!({}),
            )
            .expect_err("nothing listening");
        assert_eq!(err.kind(), ErrorKind::ExternalService);
        assert!(!err.is_retryable());
    }
}
