// This file is part of the terraform-provider-zabbix project
//
// Copyright (C) ANEO, 2024-2024. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License")
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Minimal JSON-RPC client for the Zabbix API.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

mod de;
mod methods;
#[cfg(test)]
pub(crate) mod mock;
pub mod types;
mod version;

pub use version::ApiVersion;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{message} ({code}): {data}")]
    Rpc {
        code: i64,
        message: String,
        data: String,
    },
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Expected exactly one result, got {0}.")]
    ExpectedOne(usize),
    #[error("Expected one result got : {0}")]
    Ambiguous(usize),
    #[error("Expected one item with id : {id} and got : {count}")]
    FunctionItem { id: String, count: usize },
    #[error("Missing `{0}` in response")]
    MissingIds(String),
    #[error("Expected one parent for object {id} and got {count}")]
    Parent { id: String, count: usize },
    #[error("Expected to delete {expected} object and {deleted} were deleted")]
    DeleteCount { expected: usize, deleted: usize },
    #[error("{kind} not found: {names}")]
    NotFound { kind: &'static str, names: String },
    #[error("Invalid server version: {0}")]
    Version(String),
}

impl ApiError {
    /// Transient failure of the database backend, worth retrying
    pub fn is_sql_error(&self) -> bool {
        let message = self.to_string();
        message.contains("SQL statement execution") || message.contains("DBEXECUTE_ERROR")
    }

    /// The object looked up by id does not exist (anymore)
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::ExpectedOne(0))
    }
}

pub type Result<T, E = ApiError> = std::result::Result<T, E>;

/// Connection settings of the API client
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Full URL of the endpoint, usually ending with `/api_jsonrpc.php`
    pub url: String,
    pub user: String,
    pub password: String,
    pub tls_insecure: bool,
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            user: String::new(),
            password: String::new(),
            tls_insecure: false,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Serialize)]
struct Request<'a, P> {
    jsonrpc: &'static str,
    method: &'a str,
    params: P,
    id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    auth: Option<&'a str>,
}

#[derive(Deserialize)]
struct Response<R> {
    result: Option<R>,
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: String,
}

pub struct ZabbixApi {
    client: Client,
    url: String,
    auth: Option<String>,
    version: ApiVersion,
    request_id: AtomicU64,
}

impl std::fmt::Debug for ZabbixApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZabbixApi")
            .field("url", &self.url)
            .field("version", &self.version)
            .field("logged_in", &self.auth.is_some())
            .finish()
    }
}

impl ZabbixApi {
    /// Build an anonymous client and fetch the server version
    pub async fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.tls_insecure)
            .build()?;

        let mut api = Self {
            client,
            url: config.url.clone(),
            auth: None,
            version: ApiVersion::default(),
            request_id: AtomicU64::new(1),
        };

        let version: String = api.call("apiinfo.version", json!([])).await?;
        api.version = version.parse()?;
        debug!(url = %api.url, version = %api.version, "Connected to Zabbix API");

        Ok(api)
    }

    /// Build a client and log in with the configured credentials
    pub async fn connect(config: &ApiConfig) -> Result<Self> {
        let mut api = Self::new(config).await?;
        api.login(&config.user, &config.password).await?;
        Ok(api)
    }

    pub async fn login(&mut self, user: &str, password: &str) -> Result<()> {
        let user_field = if self.version >= ApiVersion::V5_4 {
            "username"
        } else {
            "user"
        };
        self.auth = None;
        let token: String = self
            .call(
                "user.login",
                json!({ user_field: user, "password": password }),
            )
            .await?;
        debug!(user, "Logged in to Zabbix API");
        self.auth = Some(token);
        Ok(())
    }

    pub fn version(&self) -> ApiVersion {
        self.version
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Call a remote method and decode its `result`
    pub async fn call<P, R>(&self, method: &str, params: P) -> Result<R>
    where
        P: Serialize + Send,
        R: DeserializeOwned,
    {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        // `apiinfo.version` and `user.login` must be sent anonymously
        let bearer = self.version >= ApiVersion::V6_4;
        let auth = match method {
            "apiinfo.version" | "user.login" => None,
            _ => self.auth.as_deref(),
        };

        let request = Request {
            jsonrpc: "2.0",
            method,
            params,
            id,
            auth: if bearer { None } else { auth },
        };

        debug!(method, id, "Zabbix API call");

        let mut builder = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json-rpc")
            .json(&request);
        if let (true, Some(token)) = (bearer, auth) {
            builder = builder.bearer_auth(token);
        }

        let body = builder.send().await?.error_for_status()?.bytes().await?;
        let response: Response<R> = serde_json::from_slice(&body)?;

        match (response.result, response.error) {
            (_, Some(err)) => Err(ApiError::Rpc {
                code: err.code,
                message: err.message,
                data: err.data,
            }),
            (Some(result), None) => Ok(result),
            (None, None) => Err(ApiError::MissingIds("result".to_owned())),
        }
    }

    /// Call a `*.get` method expecting exactly one object
    pub async fn get_one<P, R>(&self, method: &str, params: P) -> Result<R>
    where
        P: Serialize + Send,
        R: DeserializeOwned,
    {
        let mut objects: Vec<R> = self.call(method, params).await?;
        if objects.len() != 1 {
            return Err(ApiError::ExpectedOne(objects.len()));
        }
        Ok(objects.remove(0))
    }

    /// Call a `*.create`, `*.update` or `*.delete` method and extract the
    /// affected ids listed under `ids_key`
    pub async fn call_ids<P>(&self, method: &str, ids_key: &str, params: P) -> Result<Vec<String>>
    where
        P: Serialize + Send,
    {
        #[derive(Deserialize)]
        struct Ids(#[serde(deserialize_with = "de::strings")] Vec<String>);

        let mut result: HashMap<String, Ids> = self.call(method, params).await?;
        result
            .remove(ids_key)
            .map(|Ids(ids)| ids)
            .ok_or_else(|| ApiError::MissingIds(ids_key.to_owned()))
    }

    /// Same as [`ZabbixApi::call_ids`], for calls on a single object
    pub async fn call_id<P>(&self, method: &str, ids_key: &str, params: P) -> Result<String>
    where
        P: Serialize + Send,
    {
        self.call_ids(method, ids_key, params)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::MissingIds(ids_key.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sql_errors_are_classified() {
        let err = ApiError::Rpc {
            code: -32500,
            message: "Application error.".to_owned(),
            data: "SQL statement execution has failed \"INSERT INTO items ...\"".to_owned(),
        };
        assert!(err.is_sql_error());

        let err = ApiError::Rpc {
            code: -32500,
            message: "DBEXECUTE_ERROR".to_owned(),
            data: String::new(),
        };
        assert!(err.is_sql_error());

        let err = ApiError::Rpc {
            code: -32602,
            message: "Invalid params.".to_owned(),
            data: "Host with the same name \"web-1\" already exists.".to_owned(),
        };
        assert!(!err.is_sql_error());
        assert!(!ApiError::ExpectedOne(0).is_sql_error());
    }

    #[test]
    fn rpc_error_display() {
        let err = ApiError::Rpc {
            code: -32602,
            message: "Invalid params.".to_owned(),
            data: "No permissions to referred object or it does not exist!".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid params. (-32602): No permissions to referred object or it does not exist!"
        );
        assert_eq!(
            ApiError::ExpectedOne(0).to_string(),
            "Expected exactly one result, got 0."
        );
        assert!(ApiError::ExpectedOne(0).is_not_found());
        assert!(!ApiError::ExpectedOne(2).is_not_found());
    }
}
