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

use tf_provider::schema::NestedBlock;
use tf_provider::value::{Value, ValueList, ValueString};
use tf_provider::{
    map, Attribute, AttributeConstraint, AttributePath, AttributeType, Block, Description,
    Diagnostics, Schema,
};

use crate::resource::ObjectState;
use crate::transcode::StringMap;
use crate::utils::{
    default_bool, default_string, is_blank, string_value, WithNormalize, WithSchema, WithValidate,
};

/// Interface types, by name and API code
pub(crate) const INTERFACE_TYPES: [(&str, i64); 4] =
    [("agent", 1), ("snmp", 2), ("ipmi", 3), ("jmx", 4)];

pub(crate) fn interface_type_code(name: &str) -> Option<i64> {
    INTERFACE_TYPES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, code)| *code)
}

pub(crate) fn interface_type_name(code: i64) -> &'static str {
    INTERFACE_TYPES
        .iter()
        .find(|(_, c)| *c == code)
        .map_or("agent", |(name, _)| name)
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceState<'a> {
    #[serde(borrow = "'a")]
    pub dns: ValueString<'a>,
    pub ip: ValueString<'a>,
    pub main: Value<bool>,
    pub port: ValueString<'a>,
    #[serde(rename = "type")]
    pub kind: ValueString<'a>,
    pub interface_id: ValueString<'a>,
}

impl<'a> InterfaceState<'a> {
    /// Attributes of an interface block, all computed when `computed` is set
    pub fn attributes(computed: bool) -> std::collections::HashMap<String, Attribute> {
        let pick = |configured| {
            if computed {
                AttributeConstraint::Computed
            } else {
                configured
            }
        };
        map! {
            "dns" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain("DNS name of the interface"),
                constraint: pick(AttributeConstraint::Optional),
                ..Default::default()
            },
            "ip" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain("IP address of the interface"),
                constraint: pick(AttributeConstraint::Optional),
                ..Default::default()
            },
            "main" => Attribute {
                attr_type: AttributeType::Bool,
                description: Description::plain("Whether the interface is the default one for its type"),
                constraint: pick(AttributeConstraint::Required),
                ..Default::default()
            },
            "port" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain("Port of the interface (default: 10050)"),
                constraint: pick(AttributeConstraint::OptionalComputed),
                ..Default::default()
            },
            "type" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain("Type of the interface: `agent`, `snmp`, `ipmi` or `jmx` (default: agent)"),
                constraint: pick(AttributeConstraint::OptionalComputed),
                ..Default::default()
            },
            "interface_id" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain("Id of the interface"),
                constraint: AttributeConstraint::Computed,
                ..Default::default()
            },
        }
    }

    fn normalize(&mut self) {
        default_string(&mut self.port, "10050");
        default_string(&mut self.kind, "agent");
    }

    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        if let Value::Value(kind) = &self.kind {
            if interface_type_code(kind).is_none() {
                diags.error(
                    "Invalid interface type",
                    format!("`{kind}` is not one of `agent`, `snmp`, `ipmi`, `jmx`"),
                    attr_path.clone().attribute("type"),
                );
            }
        }
        if is_blank(&self.ip) && is_blank(&self.dns) {
            diags.error_short("At least one of `ip` or `dns` must be set", attr_path);
        }
    }

    /// `useip` flag sent to the API
    pub fn use_ip(&self) -> i64 {
        i64::from(!self.ip.as_str().is_empty())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub host: ValueString<'a>,
    pub name: ValueString<'a>,
    pub host_id: ValueString<'a>,
    pub monitored: Value<bool>,
    pub proxy_id: ValueString<'a>,
    pub groups: ValueList<ValueString<'a>>,
    pub templates: ValueList<ValueString<'a>>,
    #[serde(rename = "macro")]
    pub macros: StringMap<'a>,
    pub tags: StringMap<'a>,
    pub interfaces: ValueList<Value<InterfaceState<'a>>>,
}

impl<'a> WithSchema for HostState<'a> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                description: Description::plain("Zabbix host"),
                attributes: map! {
                    "id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Id of the host"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "host" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Technical name of the host"),
                        constraint: AttributeConstraint::Required,
                        ..Default::default()
                    },
                    "name" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Visible name of the host (default: the technical name)"),
                        constraint: AttributeConstraint::OptionalComputed,
                        ..Default::default()
                    },
                    "host_id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Id of the host, as returned by the API"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "monitored" => Attribute {
                        attr_type: AttributeType::Bool,
                        description: Description::plain("Whether the host is monitored (default: true)"),
                        constraint: AttributeConstraint::OptionalComputed,
                        ..Default::default()
                    },
                    "proxy_id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Id of the proxy monitoring the host"),
                        constraint: AttributeConstraint::Optional,
                        ..Default::default()
                    },
                    "groups" => Attribute {
                        attr_type: AttributeType::Set(Box::new(AttributeType::String)),
                        description: Description::plain("Names of the host groups the host belongs to"),
                        constraint: AttributeConstraint::Required,
                        ..Default::default()
                    },
                    "templates" => Attribute {
                        attr_type: AttributeType::Set(Box::new(AttributeType::String)),
                        description: Description::plain("Technical names of the templates linked to the host"),
                        constraint: AttributeConstraint::Optional,
                        ..Default::default()
                    },
                    "macro" => Attribute {
                        attr_type: AttributeType::Map(Box::new(AttributeType::String)),
                        description: Description::plain("User macros of the host, without the `{$` `}` delimiters"),
                        constraint: AttributeConstraint::Optional,
                        ..Default::default()
                    },
                    "tags" => Attribute {
                        attr_type: AttributeType::Map(Box::new(AttributeType::String)),
                        description: Description::plain("Tags of the host"),
                        constraint: AttributeConstraint::Optional,
                        ..Default::default()
                    },
                },
                blocks: map! {
                    "interfaces" => NestedBlock::List(Block {
                        description: Description::plain("Interfaces of the host"),
                        attributes: InterfaceState::attributes(false),
                        ..Default::default()
                    }),
                },
                ..Default::default()
            },
        }
    }
}

impl<'a> WithNormalize for HostState<'a> {
    fn normalize(&mut self, _diags: &mut Diagnostics) {
        default_bool(&mut self.monitored, true);
        if self.name.is_null() {
            self.name = match &self.host {
                Value::Value(host) => string_value(host.as_ref()),
                _ => Value::Unknown,
            };
        }
        if let Value::Value(interfaces) = &mut self.interfaces {
            for interface in interfaces.iter_mut().flatten() {
                interface.normalize();
            }
        }
    }
}

#[async_trait]
impl<'a> WithValidate for HostState<'a> {
    async fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        if let Value::Value(groups) = &self.groups {
            if groups.is_empty() {
                diags.error_short(
                    "A host must belong to at least one host group",
                    attr_path.clone().attribute("groups"),
                );
            }
        }

        for (i, interface) in self.interfaces.iter().flatten().enumerate() {
            if let Value::Value(interface) = interface {
                let mut interface = interface.clone();
                interface.normalize();
                interface.validate(
                    diags,
                    attr_path.clone().attribute("interfaces").index(i as i64),
                );
            }
        }
    }
}

impl<'a> ObjectState for HostState<'a> {
    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn set_id(&mut self, id: String) {
        self.host_id = string_value(id.clone());
        self.id = string_value(id);
    }

    fn mark_computed(&mut self) {
        self.id = Value::Unknown;
        self.host_id = Value::Unknown;
        if let Value::Value(interfaces) = &mut self.interfaces {
            for interface in interfaces.iter_mut().flatten() {
                interface.interface_id = Value::Unknown;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;

    fn interface<'a>(ip: &'a str, dns: &'a str, kind: &'a str) -> Value<InterfaceState<'a>> {
        Value::Value(InterfaceState {
            ip: Value::Value(Cow::Borrowed(ip)),
            dns: Value::Value(Cow::Borrowed(dns)),
            kind: Value::Value(Cow::Borrowed(kind)),
            main: Value::Value(true),
            ..Default::default()
        })
    }

    #[test]
    fn interface_types() {
        assert_eq!(interface_type_code("snmp"), Some(2));
        assert_eq!(interface_type_code("http"), None);
        assert_eq!(interface_type_name(4), "jmx");
    }

    #[test]
    fn normalize_fills_defaults() {
        let mut state = HostState {
            host: Value::Value(Cow::Borrowed("web-01")),
            interfaces: Value::Value(vec![Value::Value(InterfaceState {
                ip: Value::Value(Cow::Borrowed("10.0.0.1")),
                main: Value::Value(true),
                ..Default::default()
            })]),
            ..Default::default()
        };
        state.normalize(&mut Diagnostics::default());

        assert_eq!(state.name.as_str(), "web-01");
        assert_eq!(state.monitored, Value::Value(true));
        let interface = state.interfaces.as_ref().unwrap()[0].as_ref().unwrap();
        assert_eq!(interface.port.as_str(), "10050");
        assert_eq!(interface.kind.as_str(), "agent");
        assert_eq!(interface.use_ip(), 1);
    }

    #[tokio::test]
    async fn invalid_interfaces_are_reported() {
        let state = HostState {
            groups: Value::Value(vec![Value::Value(Cow::Borrowed("Linux servers"))]),
            interfaces: Value::Value(vec![
                interface("10.0.0.1", "", "agent"),
                interface("", "", "agent"),
                interface("", "web-01.local", "http"),
            ]),
            ..Default::default()
        };
        let mut diags = Diagnostics::default();
        state.validate(&mut diags, AttributePath::default()).await;
        assert_eq!(diags.errors.len(), 2);
    }

    #[tokio::test]
    async fn groups_must_not_be_empty() {
        let state = HostState {
            groups: Value::Value(vec![]),
            ..Default::default()
        };
        let mut diags = Diagnostics::default();
        state.validate(&mut diags, AttributePath::default()).await;
        assert_eq!(diags.errors.len(), 1);
    }
}
