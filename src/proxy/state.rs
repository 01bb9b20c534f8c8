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

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use tf_provider::schema::NestedBlock;
use tf_provider::value::{Value, ValueList, ValueNumber, ValueString};
use tf_provider::{
    map, Attribute, AttributeConstraint, AttributePath, AttributeType, Block, Description,
    Diagnostics, Schema,
};

use crate::resource::ObjectState;
use crate::utils::{
    check_range, default_bool, default_number, default_string, is_blank, string_value,
    WithNormalize, WithSchema, WithValidate,
};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyInterfaceState<'a> {
    #[serde(borrow = "'a")]
    pub dns: ValueString<'a>,
    pub ip: ValueString<'a>,
    pub port: ValueString<'a>,
    pub useip: ValueString<'a>,
}

impl<'a> ProxyInterfaceState<'a> {
    fn attributes() -> HashMap<String, Attribute> {
        map! {
            "dns" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain("DNS name of the proxy"),
                constraint: AttributeConstraint::OptionalComputed,
                ..Default::default()
            },
            "ip" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain("IP address of the proxy"),
                constraint: AttributeConstraint::OptionalComputed,
                ..Default::default()
            },
            "port" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain("Port the proxy listens on (default: 10050)"),
                constraint: AttributeConstraint::OptionalComputed,
                ..Default::default()
            },
            "useip" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain("1 to connect through the IP address, 0 through the DNS name (default: 1)"),
                constraint: AttributeConstraint::OptionalComputed,
                ..Default::default()
            },
        }
    }

    fn normalize(&mut self) {
        default_string(&mut self.dns, "");
        default_string(&mut self.ip, "");
        default_string(&mut self.port, "10050");
        default_string(&mut self.useip, "1");
    }

    /// `useip` flag sent to the server, forced to 0 without an IP address
    pub fn use_ip(&self) -> i64 {
        if self.ip.as_str().is_empty() {
            0
        } else {
            self.useip.as_str().parse().unwrap_or(1)
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub host: ValueString<'a>,
    pub proxyid: ValueString<'a>,
    pub description: ValueString<'a>,
    pub interfaces: ValueList<Value<ProxyInterfaceState<'a>>>,
    pub tls_connect: ValueNumber,
    pub tls_accept: ValueNumber,
    pub tls_psk_identity: ValueString<'a>,
    pub tls_psk: ValueString<'a>,
    pub generate_tls_psk: Value<bool>,
    pub passive: Value<bool>,
    pub address: ValueString<'a>,
}

impl<'a> ProxyState<'a> {
    /// A PSK must be generated client side
    pub fn needs_psk(&self) -> bool {
        self.generate_tls_psk.unwrap_or(false) && self.tls_psk.as_str().is_empty()
    }

    pub fn first_interface(&self) -> Option<&ProxyInterfaceState<'a>> {
        self.interfaces.iter().flatten().flatten().next()
    }
}

impl<'a> WithSchema for ProxyState<'a> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                description: Description::plain("Zabbix proxy"),
                attributes: map! {
                    "id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Id of the proxy"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "host" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Technical name of the proxy"),
                        constraint: AttributeConstraint::Required,
                        ..Default::default()
                    },
                    "proxyid" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Id of the proxy, as returned by the API"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "description" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Description of the proxy"),
                        constraint: AttributeConstraint::Optional,
                        ..Default::default()
                    },
                    "tls_connect" => Attribute {
                        attr_type: AttributeType::Number,
                        description: Description::plain("Connections to the proxy: 1 unencrypted, 2 PSK, 4 certificate (default: 1)"),
                        constraint: AttributeConstraint::OptionalComputed,
                        ..Default::default()
                    },
                    "tls_accept" => Attribute {
                        attr_type: AttributeType::Number,
                        description: Description::plain("Connections from the proxy, as a bitmask of 1 unencrypted, 2 PSK, 4 certificate (default: 1)"),
                        constraint: AttributeConstraint::OptionalComputed,
                        ..Default::default()
                    },
                    "tls_psk_identity" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("PSK identity"),
                        constraint: AttributeConstraint::Optional,
                        ..Default::default()
                    },
                    "tls_psk" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Pre-shared key, as an hexadecimal string"),
                        constraint: AttributeConstraint::OptionalComputed,
                        sensitive: true,
                        ..Default::default()
                    },
                    "generate_tls_psk" => Attribute {
                        attr_type: AttributeType::Bool,
                        description: Description::plain("Generate a random 32 bytes PSK when `tls_psk` is not set (default: false)"),
                        constraint: AttributeConstraint::OptionalComputed,
                        ..Default::default()
                    },
                    "passive" => Attribute {
                        attr_type: AttributeType::Bool,
                        description: Description::plain("The server connects to the proxy instead of the opposite (default: false)"),
                        constraint: AttributeConstraint::OptionalComputed,
                        ..Default::default()
                    },
                    "address" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Comma separated addresses accepted from an active proxy (default: \"\")"),
                        constraint: AttributeConstraint::OptionalComputed,
                        ..Default::default()
                    },
                },
                blocks: map! {
                    "interfaces" => NestedBlock::List(Block {
                        description: Description::plain("Interface of a passive proxy. Changing it replaces the proxy"),
                        attributes: ProxyInterfaceState::attributes(),
                        ..Default::default()
                    }),
                },
                ..Default::default()
            },
        }
    }
}

impl<'a> WithNormalize for ProxyState<'a> {
    fn normalize(&mut self, _diags: &mut Diagnostics) {
        default_number(&mut self.tls_connect, 1);
        default_number(&mut self.tls_accept, 1);
        default_bool(&mut self.generate_tls_psk, false);
        default_bool(&mut self.passive, false);
        default_string(&mut self.address, "");
        if let Value::Value(interfaces) = &mut self.interfaces {
            for interface in interfaces.iter_mut().flatten() {
                interface.normalize();
            }
        }
    }
}

#[async_trait]
impl<'a> WithValidate for ProxyState<'a> {
    async fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        check_range(
            diags,
            attr_path.clone().attribute("tls_connect"),
            "tls_connect",
            &self.tls_connect,
            1,
            4,
        );
        check_range(
            diags,
            attr_path.clone().attribute("tls_accept"),
            "tls_accept",
            &self.tls_accept,
            1,
            7,
        );

        if self.passive.unwrap_or(false) {
            let missing = match &self.interfaces {
                Value::Value(interfaces) => interfaces.is_empty(),
                Value::Null => true,
                Value::Unknown => false,
            };
            if missing {
                diags.error_short(
                    "passive proxies require an interface",
                    attr_path.clone().attribute("interfaces"),
                );
            }
        }

        for (i, interface) in self.interfaces.iter().flatten().flatten().enumerate() {
            if is_blank(&interface.ip) && is_blank(&interface.dns) {
                diags.error_short(
                    "Atleast one of two dns or ip must be set",
                    attr_path.clone().attribute("interfaces").index(i as i64),
                );
            }
        }
    }
}

impl<'a> ObjectState for ProxyState<'a> {
    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn set_id(&mut self, id: String) {
        self.proxyid = string_value(id.clone());
        self.id = string_value(id);
    }

    fn mark_computed(&mut self) {
        self.id = Value::Unknown;
        self.proxyid = Value::Unknown;
        if self.needs_psk() {
            self.tls_psk = Value::Unknown;
        }
    }
}
