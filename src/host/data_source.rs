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
use serde::{Deserialize, Serialize};
use tracing::debug;

use tf_provider::value::{Value, ValueList, ValueString};
use tf_provider::{
    map, Attribute, AttributeConstraint, AttributePath, AttributeType, Block, DataSource,
    Description, Diagnostics, Schema, ValueEmpty,
};

use crate::api::types::{Host, HostInterface};
use crate::resource::ApiHandle;
use crate::transcode::{tags_from_api, StringMap};
use crate::utils::{string_value, WithSchema, WithValidate};

use super::state::{interface_type_name, InterfaceState};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostDataSourceState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub host_id: ValueString<'a>,
    pub host: ValueString<'a>,
    pub name: ValueString<'a>,
    pub main_interface_id: ValueString<'a>,
    pub interfaces: ValueList<Value<InterfaceState<'a>>>,
    pub tags: StringMap<'a>,
}

impl<'a> WithSchema for HostDataSourceState<'a> {
    fn schema() -> Schema {
        let interface = InterfaceState::attributes(true)
            .into_iter()
            .map(|(name, attribute)| (name, attribute.attr_type))
            .collect();

        Schema {
            version: 1,
            block: Block {
                description: Description::plain("Read a Zabbix host and its interfaces"),
                attributes: map! {
                    "id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Id of the host"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "host_id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Id of the host to read"),
                        constraint: AttributeConstraint::Required,
                        ..Default::default()
                    },
                    "host" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Technical name of the host"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "name" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Visible name of the host"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "main_interface_id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Id of the main interface of the host, empty if it has no interface"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "interfaces" => Attribute {
                        attr_type: AttributeType::List(Box::new(AttributeType::Object(interface))),
                        description: Description::plain("Interfaces of the host"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "tags" => Attribute {
                        attr_type: AttributeType::Map(Box::new(AttributeType::String)),
                        description: Description::plain("Tags of the host"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                },
                ..Default::default()
            },
        }
    }
}

#[async_trait]
impl<'a> WithValidate for HostDataSourceState<'a> {
    async fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        if let Value::Value(host_id) = &self.host_id {
            if host_id.is_empty() || !host_id.bytes().all(|b| b.is_ascii_digit()) {
                diags.error(
                    "Invalid host id",
                    format!("`{host_id}` is not a Zabbix object id"),
                    attr_path.attribute("host_id"),
                );
            }
        }
    }
}

/// Id of the interface flagged as main, or of the first one
fn main_interface_id(interfaces: &[HostInterface]) -> &str {
    interfaces
        .iter()
        .find(|interface| interface.main == 1)
        .or_else(|| interfaces.first())
        .map_or("", |interface| interface.interfaceid.as_str())
}

impl<'a> HostDataSourceState<'a> {
    fn fill(&mut self, host: Host) {
        self.id = string_value(host.hostid.clone());
        self.host_id = string_value(host.hostid);
        self.host = string_value(host.host);
        self.name = string_value(host.name);
        self.main_interface_id = string_value(main_interface_id(&host.interfaces));
        self.interfaces = Value::Value(
            host.interfaces
                .into_iter()
                .map(|interface| {
                    Value::Value(InterfaceState {
                        dns: string_value(interface.dns),
                        ip: string_value(interface.ip),
                        main: Value::Value(interface.main == 1),
                        port: string_value(interface.port),
                        kind: string_value(interface_type_name(interface.kind)),
                        interface_id: string_value(interface.interfaceid),
                    })
                })
                .collect(),
        );
        self.tags = tags_from_api(&host.tags, &Value::Value(Default::default()));
    }
}

#[derive(Debug, Default)]
pub struct HostDataSource {
    api: ApiHandle,
}

impl HostDataSource {
    pub fn new(api: ApiHandle) -> Self {
        Self { api }
    }
}

#[async_trait]
impl DataSource for HostDataSource {
    type State<'a> = HostDataSourceState<'a>;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(HostDataSourceState::schema())
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        config.validate(diags, AttributePath::default()).await;

        if diags.errors.is_empty() {
            Some(())
        } else {
            None
        }
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        config: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<Self::State<'a>> {
        let api = self.api.get(diags)?;
        let host_id = config.host_id.as_str().to_owned();
        debug!(host_id = %host_id, "Reading host");

        match api.host_get_by_id(&host_id).await {
            Ok(host) => {
                let mut state = config;
                state.fill(host);
                Some(state)
            }
            Err(err) => {
                diags.error(
                    format!("Failed to read host {host_id}"),
                    err.to_string(),
                    AttributePath::new("host_id"),
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interface(id: &str, main: i64) -> HostInterface {
        HostInterface {
            interfaceid: id.to_owned(),
            ip: "10.0.0.1".to_owned(),
            port: "10050".to_owned(),
            main,
            kind: 1,
            useip: 1,
            ..Default::default()
        }
    }

    #[test]
    fn main_interface() {
        assert_eq!(main_interface_id(&[interface("3", 0), interface("4", 1)]), "4");
        assert_eq!(main_interface_id(&[interface("3", 0), interface("4", 0)]), "3");
        assert_eq!(main_interface_id(&[]), "");
    }

    #[test]
    fn host_without_interface() {
        let mut state = HostDataSourceState::default();
        state.fill(Host {
            hostid: "10084".to_owned(),
            host: "Zabbix server".to_owned(),
            name: "Zabbix server".to_owned(),
            ..Default::default()
        });
        assert_eq!(state.id.as_str(), "10084");
        assert_eq!(state.main_interface_id.as_str(), "");
        assert_eq!(state.interfaces, Value::Value(vec![]));
        assert_eq!(state.tags, Value::Value(Default::default()));
    }

    #[tokio::test]
    async fn host_id_must_be_numeric() {
        let state = HostDataSourceState {
            host_id: string_value("web-01"),
            ..Default::default()
        };
        let mut diags = Diagnostics::default();
        state.validate(&mut diags, AttributePath::default()).await;
        assert_eq!(diags.errors.len(), 1);
    }
}
