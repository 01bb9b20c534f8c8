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

//! Mocked Zabbix endpoint shared by the resource tests.

use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

use super::{ApiConfig, ZabbixApi};

pub fn result(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "jsonrpc": "2.0",
        "result": result,
        "id": 1,
    }))
}

pub fn rpc(name: &str) -> MockBuilder {
    Mock::given(method("POST")).and(body_partial_json(json!({ "method": name })))
}

/// Server reporting `version` and accepting any login
pub async fn zabbix(version: &str) -> MockServer {
    let server = MockServer::start().await;
    rpc("apiinfo.version")
        .respond_with(result(json!(version)))
        .mount(&server)
        .await;
    rpc("user.login")
        .respond_with(result(json!("0424bd59b807674191e7d77572075f33")))
        .mount(&server)
        .await;
    server
}

pub async fn connect(server: &MockServer) -> ZabbixApi {
    let config = ApiConfig {
        url: format!("{}/api_jsonrpc.php", server.uri()),
        user: "Admin".to_owned(),
        password: "zabbix".to_owned(),
        timeout: Duration::from_secs(5),
        ..Default::default()
    };
    ZabbixApi::connect(&config).await.unwrap()
}

/// Params of every call to `name` received so far
pub async fn params(server: &MockServer, name: &str) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter_map(|request| serde_json::from_slice::<Value>(&request.body).ok())
        .filter(|body| body["method"] == name)
        .map(|body| body["params"].clone())
        .collect()
}
