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

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use tf_provider::value::{Value, ValueList};
use tf_provider::{AttributePath, Diagnostics};

use crate::api::types::{GroupId, Host, HostInterface, TemplateId};
use crate::api::{ApiError, ZabbixApi};
use crate::resource::{report, ObjectState, ZabbixObject};
use crate::retry::{create_retry, RetryPolicy};
use crate::transcode::{macros_from_api, macros_to_api, tags_from_api, tags_to_api};
use crate::utils::{collection, list_entries, optional_string, string_value};

use super::state::{interface_type_code, interface_type_name, HostState, InterfaceState};

/// Interfaces of the state, in the shape expected by `host.create`
pub(crate) fn interfaces_to_api(
    interfaces: &ValueList<Value<InterfaceState<'_>>>,
) -> Vec<HostInterface> {
    interfaces
        .iter()
        .flatten()
        .flatten()
        .map(|interface| {
            let kind = interface_type_code(interface.kind.as_str()).unwrap_or(1);
            HostInterface {
                interfaceid: interface
                    .interface_id
                    .as_deref_option()
                    .unwrap_or_default()
                    .to_owned(),
                ip: interface.ip.as_str().to_owned(),
                dns: interface.dns.as_str().to_owned(),
                port: interface.port.as_str().to_owned(),
                main: i64::from(interface.main.unwrap_or(false)),
                kind,
                useip: interface.use_ip(),
                // SNMP interfaces are created as SNMPv2 with the community in a macro
                details: (kind == 2).then(|| {
                    json!({
                        "version": "2",
                        "bulk": "1",
                        "community": "{$SNMP_COMMUNITY}",
                    })
                }),
            }
        })
        .collect()
}

/// Interfaces read from the server, in the order of the prior state
pub(crate) fn interfaces_from_api<'a>(
    interfaces: &[HostInterface],
    prior: &ValueList<Value<InterfaceState<'a>>>,
) -> ValueList<Value<InterfaceState<'a>>> {
    let prior_interfaces = prior
        .iter()
        .flatten()
        .flatten()
        .filter_map(|interface| {
            let id = interface.interface_id.as_deref_option()?;
            Some((id, interface))
        })
        .collect::<Vec<_>>();
    let default_interface = InterfaceState::default();

    let mut ordered = interfaces.iter().collect::<Vec<_>>();
    ordered.sort_by_key(|interface| {
        prior_interfaces
            .iter()
            .position(|(id, _)| *id == interface.interfaceid)
            .unwrap_or(usize::MAX)
    });

    let states = ordered
        .into_iter()
        .map(|interface| {
            let prior_interface = prior_interfaces
                .iter()
                .find(|(id, _)| *id == interface.interfaceid)
                .map_or(&default_interface, |(_, prior)| *prior);
            Value::Value(InterfaceState {
                dns: optional_string(interface.dns.clone(), &prior_interface.dns),
                ip: optional_string(interface.ip.clone(), &prior_interface.ip),
                main: Value::Value(interface.main == 1),
                port: string_value(interface.port.clone()),
                kind: string_value(interface_type_name(interface.kind)),
                interface_id: string_value(interface.interfaceid.clone()),
            })
        })
        .collect::<Vec<_>>();
    let empty = states.is_empty();
    collection(states, empty, prior)
}

#[derive(Debug, Default)]
pub struct HostObject;

impl HostObject {
    fn request(state: &HostState<'_>, groups: Vec<GroupId>, templates: Vec<TemplateId>) -> Host {
        let proxy_hostid = match state.proxy_id.as_str() {
            "" => "0",
            id => id,
        };
        Host {
            hostid: state.id.as_deref_option().unwrap_or_default().to_owned(),
            host: state.host.as_str().to_owned(),
            name: state.name.as_str().to_owned(),
            status: if state.monitored.unwrap_or(true) { 0 } else { 1 },
            proxy_hostid: proxy_hostid.to_owned(),
            groups,
            templates,
            interfaces: interfaces_to_api(&state.interfaces),
            macros: macros_to_api(&state.macros),
            tags: tags_to_api(&state.tags),
            ..Default::default()
        }
    }

    /// Resolve group and template names, and build the request
    async fn build(diags: &mut Diagnostics, api: &ZabbixApi, state: &HostState<'_>) -> Option<Host> {
        let groups = match api.host_group_ids(&list_entries(&state.groups)).await {
            Ok(groups) => groups,
            Err(err) => {
                diags.error(
                    "Failed to resolve host groups",
                    err.to_string(),
                    AttributePath::new("groups"),
                );
                return None;
            }
        };
        let templates = match api.template_ids(&list_entries(&state.templates)).await {
            Ok(templates) => templates,
            Err(err) => {
                diags.error(
                    "Failed to resolve templates",
                    err.to_string(),
                    AttributePath::new("templates"),
                );
                return None;
            }
        };

        Some(Self::request(state, groups, templates))
    }
}

#[async_trait]
impl ZabbixObject for HostObject {
    const KIND: &'static str = "Host";
    type State<'a> = HostState<'a>;

    async fn create<'a>(
        &self,
        diags: &mut Diagnostics,
        api: &ZabbixApi,
        planned: &mut Self::State<'a>,
    ) -> Option<String> {
        let host = Self::build(diags, api, planned).await?;
        let result = create_retry(&RetryPolicy::default(), || api.host_create(&host)).await;
        report(diags, "Failed to create host", result)
    }

    async fn read<'a>(
        &self,
        _diags: &mut Diagnostics,
        api: &ZabbixApi,
        state: &mut Self::State<'a>,
    ) -> Result<(), ApiError> {
        let host = api.host_get_by_id(state.id()).await?;

        let mut groups = host
            .groups
            .into_iter()
            .map(|group| group.name)
            .collect::<Vec<_>>();
        groups.sort();
        let mut templates = host
            .parent_templates
            .into_iter()
            .map(|template| template.host)
            .collect::<Vec<_>>();
        templates.sort();
        let proxy_id = if host.proxy_hostid == "0" {
            String::new()
        } else {
            host.proxy_hostid
        };

        state.host = string_value(host.host);
        state.name = string_value(host.name);
        state.host_id = string_value(host.hostid);
        state.monitored = Value::Value(host.status == 0);
        state.proxy_id = optional_string(proxy_id, &state.proxy_id);
        state.groups = Value::Value(groups.into_iter().map(|name| string_value(name)).collect());
        let empty = templates.is_empty();
        state.templates = collection(
            templates.into_iter().map(|name| string_value(name)).collect(),
            empty,
            &state.templates,
        );
        state.macros = macros_from_api(&host.macros, &state.macros);
        state.tags = tags_from_api(&host.tags, &state.tags);
        state.interfaces = interfaces_from_api(&host.interfaces, &state.interfaces);
        Ok(())
    }

    async fn update<'a>(
        &self,
        diags: &mut Diagnostics,
        api: &ZabbixApi,
        _prior: &Self::State<'a>,
        planned: &Self::State<'a>,
    ) -> Option<()> {
        let mut host = Self::build(diags, api, planned).await?;

        // Templates linked on the server but not configured anymore
        let current = report(
            diags,
            "Failed to read host templates",
            api.host_get_by_id(planned.id()).await,
        )?;
        host.templates_clear = current
            .parent_templates
            .into_iter()
            .filter(|linked| {
                !host
                    .templates
                    .iter()
                    .any(|template| template.templateid == linked.templateid)
            })
            .map(|linked| TemplateId {
                templateid: linked.templateid,
            })
            .collect();
        if !host.templates_clear.is_empty() {
            debug!(
                host = %host.host,
                count = host.templates_clear.len(),
                "Unlinking templates"
            );
        }

        let result = create_retry(&RetryPolicy::default(), || api.host_update(&host)).await;
        report(diags, "Failed to update host", result).map(|_| ())
    }

    async fn delete<'a>(
        &self,
        diags: &mut Diagnostics,
        api: &ZabbixApi,
        state: &Self::State<'a>,
    ) -> Option<()> {
        let result = api.hosts_delete(&[state.id()]).await;
        report(diags, "Failed to delete host", result).map(|_| ())
    }

    fn plan_changes<'a>(
        &self,
        _prior: &Self::State<'a>,
        planned: &mut Self::State<'a>,
    ) -> Vec<AttributePath> {
        // Interfaces keep their id when updated in place, new ones get one from the server
        if let Value::Value(interfaces) = &mut planned.interfaces {
            for interface in interfaces.iter_mut().flatten() {
                if interface.interface_id.is_null() {
                    interface.interface_id = Value::Unknown;
                }
            }
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use serde_json::json;
    use wiremock::matchers::body_partial_json;

    use crate::api::mock::{connect, result, rpc, zabbix};

    use super::*;

    fn interface<'a>(id: &'a str, ip: &'a str) -> Value<InterfaceState<'a>> {
        Value::Value(InterfaceState {
            ip: Value::Value(Cow::Borrowed(ip)),
            dns: Value::Null,
            main: Value::Value(true),
            port: Value::Value(Cow::Borrowed("10050")),
            kind: Value::Value(Cow::Borrowed("agent")),
            interface_id: if id.is_empty() {
                Value::Unknown
            } else {
                Value::Value(Cow::Borrowed(id))
            },
        })
    }

    #[test]
    fn host_request() {
        let state = HostState {
            host: Value::Value(Cow::Borrowed("web-01")),
            name: Value::Value(Cow::Borrowed("Web server")),
            monitored: Value::Value(false),
            interfaces: Value::Value(vec![
                interface("", "10.0.0.1"),
                Value::Value(InterfaceState {
                    dns: Value::Value(Cow::Borrowed("web-01.local")),
                    ip: Value::Null,
                    main: Value::Value(true),
                    port: Value::Value(Cow::Borrowed("161")),
                    kind: Value::Value(Cow::Borrowed("snmp")),
                    interface_id: Value::Unknown,
                }),
            ]),
            ..Default::default()
        };
        let host = HostObject::request(
            &state,
            vec![GroupId {
                groupid: "2".to_owned(),
                name: String::new(),
            }],
            vec![],
        );

        assert_eq!(
            serde_json::to_value(&host).unwrap(),
            json!({
                "host": "web-01",
                "name": "Web server",
                "status": 1,
                "proxy_hostid": "0",
                "groups": [{ "groupid": "2" }],
                "interfaces": [
                    { "ip": "10.0.0.1", "dns": "", "port": "10050", "main": 1, "type": 1, "useip": 1 },
                    {
                        "ip": "", "dns": "web-01.local", "port": "161", "main": 1, "type": 2, "useip": 0,
                        "details": { "version": "2", "bulk": "1", "community": "{$SNMP_COMMUNITY}" },
                    },
                ],
                "macros": [],
                "tags": [],
            })
        );
    }

    #[test]
    fn interfaces_follow_prior_order() {
        let prior = Value::Value(vec![interface("12", "10.0.0.2"), interface("11", "10.0.0.1")]);
        let server = vec![
            HostInterface {
                interfaceid: "11".to_owned(),
                ip: "10.0.0.1".to_owned(),
                port: "10050".to_owned(),
                main: 1,
                kind: 1,
                useip: 1,
                ..Default::default()
            },
            HostInterface {
                interfaceid: "12".to_owned(),
                ip: "10.0.0.2".to_owned(),
                port: "10050".to_owned(),
                main: 1,
                kind: 1,
                useip: 1,
                ..Default::default()
            },
        ];

        let read = interfaces_from_api(&server, &prior);
        assert_eq!(read, prior);
    }

    #[test]
    fn new_interfaces_get_an_unknown_id() {
        let prior = HostState::default();
        let mut planned = HostState {
            interfaces: Value::Value(vec![Value::Value(InterfaceState::default())]),
            ..Default::default()
        };
        assert!(HostObject.plan_changes(&prior, &mut planned).is_empty());
        let interface = planned.interfaces.as_ref().unwrap()[0].as_ref().unwrap();
        assert!(interface.interface_id.is_unknown());
    }

    #[tokio::test]
    async fn update_unlinks_removed_templates() {
        let server = zabbix("6.0.21").await;
        rpc("hostgroup.get")
            .respond_with(result(json!([{ "groupid": "2", "name": "Linux servers" }])))
            .mount(&server)
            .await;
        rpc("template.get")
            .respond_with(result(json!([{
                "templateid": "10001",
                "host": "Linux by Zabbix agent",
            }])))
            .mount(&server)
            .await;
        rpc("host.get")
            .respond_with(result(json!([{
                "hostid": "10084",
                "host": "web-01",
                "parentTemplates": [
                    { "templateid": "10001", "host": "Linux by Zabbix agent" },
                    { "templateid": "10050", "host": "Nginx by HTTP" },
                ],
            }])))
            .mount(&server)
            .await;
        rpc("host.update")
            .and(body_partial_json(json!({
                "params": {
                    "hostid": "10084",
                    "templates": [{ "templateid": "10001" }],
                    "templates_clear": [{ "templateid": "10050" }],
                },
            })))
            .respond_with(result(json!({ "hostids": ["10084"] })))
            .expect(1)
            .mount(&server)
            .await;
        let api = connect(&server).await;

        let state = HostState {
            id: Value::Value(Cow::Borrowed("10084")),
            host: Value::Value(Cow::Borrowed("web-01")),
            name: Value::Value(Cow::Borrowed("web-01")),
            groups: Value::Value(vec![Value::Value(Cow::Borrowed("Linux servers"))]),
            templates: Value::Value(vec![Value::Value(Cow::Borrowed("Linux by Zabbix agent"))]),
            ..Default::default()
        };
        let mut diags = Diagnostics::default();
        HostObject
            .update(&mut diags, &api, &state, &state)
            .await
            .unwrap();
        assert!(diags.errors.is_empty());
    }
}
