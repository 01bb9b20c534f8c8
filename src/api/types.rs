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

//! Zabbix API objects.
//!
//! The same struct is used to build requests and to decode responses:
//! empty identifiers are not serialized, and relations only returned by
//! `select*` options are never sent back.

use serde::{Deserialize, Serialize};

use super::de;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostGroup {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub groupid: String,
    pub name: String,
}

/// Group membership. The name is only returned by `selectGroups`
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupId {
    pub groupid: String,
    #[serde(default, skip_serializing)]
    pub name: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateId {
    pub templateid: String,
}

/// Reference to a host returned by `selectHosts`
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct HostRef {
    pub hostid: String,
    #[serde(default)]
    pub host: String,
}

/// Reference to a template returned by `selectParentTemplates`
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct TemplateRef {
    pub templateid: String,
    #[serde(default)]
    pub host: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Macro {
    #[serde(rename = "macro")]
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub tag: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreProc {
    #[serde(rename = "type", deserialize_with = "de::string")]
    pub kind: String,
    #[serde(default)]
    pub params: String,
    #[serde(default, deserialize_with = "de::string")]
    pub error_handler: String,
    #[serde(default)]
    pub error_handler_params: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LldMacroPath {
    pub lld_macro: String,
    pub path: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInterface {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub interfaceid: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub dns: String,
    #[serde(default, deserialize_with = "de::string")]
    pub port: String,
    #[serde(deserialize_with = "de::number")]
    pub main: i64,
    #[serde(rename = "type", deserialize_with = "de::number")]
    pub kind: i64,
    #[serde(deserialize_with = "de::number")]
    pub useip: i64,
    #[serde(default, skip_serializing_if = "Option::is_none", skip_deserializing)]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hostid: String,
    pub host: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "de::number")]
    pub status: i64,
    #[serde(default, deserialize_with = "de::string")]
    pub proxy_hostid: String,
    #[serde(default)]
    pub groups: Vec<GroupId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", skip_deserializing)]
    pub templates: Vec<TemplateId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", skip_deserializing)]
    pub templates_clear: Vec<TemplateId>,
    #[serde(rename = "parentTemplates", default, skip_serializing)]
    pub parent_templates: Vec<TemplateRef>,
    #[serde(default)]
    pub interfaces: Vec<HostInterface>,
    #[serde(default)]
    pub macros: Vec<Macro>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub templateid: String,
    pub host: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Template groups since 6.2, host groups before
    #[serde(default, alias = "templategroups")]
    pub groups: Vec<GroupId>,
    #[serde(default)]
    pub macros: Vec<Macro>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default, skip_serializing)]
    pub hosts: Vec<HostRef>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub itemid: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hostid: String,
    pub name: String,
    #[serde(rename = "key_")]
    pub key: String,
    #[serde(rename = "type", default, deserialize_with = "de::number")]
    pub kind: i64,
    #[serde(default, deserialize_with = "de::number")]
    pub value_type: i64,
    #[serde(default)]
    pub delay: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub interfaceid: String,
    #[serde(default)]
    pub history: String,
    #[serde(default)]
    pub trends: String,
    #[serde(default)]
    pub units: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "de::number")]
    pub status: i64,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub preprocessing: Vec<PreProc>,
    #[serde(default, skip_serializing)]
    pub hosts: Vec<HostRef>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LldRule {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub itemid: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hostid: String,
    pub name: String,
    #[serde(rename = "key_")]
    pub key: String,
    #[serde(rename = "type", default, deserialize_with = "de::number")]
    pub kind: i64,
    #[serde(default)]
    pub delay: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub interfaceid: String,
    #[serde(default)]
    pub lifetime: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "de::number")]
    pub status: i64,
    #[serde(default)]
    pub preprocessing: Vec<PreProc>,
    #[serde(default)]
    pub lld_macro_paths: Vec<LldMacroPath>,
    #[serde(default, skip_serializing)]
    pub hosts: Vec<HostRef>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerId {
    pub triggerid: String,
}

/// Function referenced as `{functionid}` in a raw trigger expression
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct TriggerFunction {
    pub functionid: String,
    pub itemid: String,
    pub function: String,
    #[serde(default)]
    pub parameter: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub triggerid: String,
    pub description: String,
    pub expression: String,
    #[serde(default, deserialize_with = "de::number")]
    pub recovery_mode: i64,
    #[serde(default)]
    pub recovery_expression: String,
    #[serde(default)]
    pub comments: String,
    #[serde(default, deserialize_with = "de::number")]
    pub priority: i64,
    #[serde(default, deserialize_with = "de::number")]
    pub status: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<TriggerId>>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default, skip_serializing)]
    pub functions: Vec<TriggerFunction>,
    #[serde(default, skip_serializing)]
    pub hosts: Vec<HostRef>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyInterface {
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub dns: String,
    #[serde(default, deserialize_with = "de::string")]
    pub port: String,
    #[serde(default, deserialize_with = "de::number")]
    pub useip: i64,
}

/// Status of an active proxy
pub const PROXY_ACTIVE: i64 = 5;
/// Status of a passive proxy
pub const PROXY_PASSIVE: i64 = 6;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proxy {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub proxyid: String,
    pub host: String,
    #[serde(default)]
    pub description: String,
    #[serde(deserialize_with = "de::number")]
    pub status: i64,
    #[serde(default, deserialize_with = "de::number")]
    pub tls_connect: i64,
    #[serde(default, deserialize_with = "de::number")]
    pub tls_accept: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tls_psk_identity: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tls_psk: String,
    #[serde(default)]
    pub proxy_address: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "de::object_or_empty"
    )]
    pub interface: Option<ProxyInterface>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub httpstepid: String,
    pub name: String,
    #[serde(deserialize_with = "de::string")]
    pub no: String,
    pub url: String,
    #[serde(default)]
    pub status_codes: String,
    #[serde(default)]
    pub required: String,
    #[serde(default)]
    pub headers: Vec<Header>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpTest {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub httptestid: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hostid: String,
    pub name: String,
    #[serde(default)]
    pub delay: String,
    #[serde(default, deserialize_with = "de::string")]
    pub retries: String,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn empty_ids_are_not_sent() {
        let group = HostGroup {
            groupid: String::new(),
            name: "Linux servers".to_owned(),
        };
        assert_eq!(
            serde_json::to_value(&group).unwrap(),
            json!({ "name": "Linux servers" })
        );
    }

    #[test]
    fn select_relations_are_not_sent() {
        let trigger = Trigger {
            triggerid: "42".to_owned(),
            description: "cpu".to_owned(),
            expression: "{1}>0".to_owned(),
            functions: vec![TriggerFunction {
                functionid: "1".to_owned(),
                itemid: "7".to_owned(),
                function: "last".to_owned(),
                parameter: "$".to_owned(),
            }],
            ..Default::default()
        };
        let value = serde_json::to_value(&trigger).unwrap();
        assert!(value.get("functions").is_none());
        assert!(value.get("hosts").is_none());
        assert!(value.get("dependencies").is_none());
        assert_eq!(value["triggerid"], "42");
    }

    #[test]
    fn active_proxy_without_interface() {
        let proxy: Proxy = serde_json::from_value(json!({
            "proxyid": "10",
            "host": "proxy-1",
            "status": "5",
            "tls_connect": "1",
            "tls_accept": "1",
            "interface": [],
        }))
        .unwrap();
        assert_eq!(proxy.status, PROXY_ACTIVE);
        assert_eq!(proxy.interface, None);
    }

    #[test]
    fn passive_proxy_interface() {
        let proxy: Proxy = serde_json::from_value(json!({
            "proxyid": "11",
            "host": "proxy-2",
            "status": "6",
            "interface": { "ip": "10.0.0.2", "dns": "", "port": "10051", "useip": "1" },
        }))
        .unwrap();
        assert_eq!(proxy.status, PROXY_PASSIVE);
        let interface = proxy.interface.unwrap();
        assert_eq!(interface.ip, "10.0.0.2");
        assert_eq!(interface.port, "10051");
        assert_eq!(interface.useip, 1);
    }
}
