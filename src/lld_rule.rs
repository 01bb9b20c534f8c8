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

//! `zabbix_lld_rule` resource: low-level discovery rules.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use tf_provider::schema::NestedBlock;
use tf_provider::value::{Value, ValueList, ValueNumber, ValueString};
use tf_provider::{
    map, Attribute, AttributeConstraint, AttributePath, AttributeType, Block, Description,
    Diagnostics, Schema,
};

use crate::api::types::LldRule;
use crate::api::{ApiError, ZabbixApi};
use crate::resource::{report, ObjectState, ZabbixObject};
use crate::retry::{create_retry, delete_retry, RetryPolicy};
use crate::transcode::{
    lld_macro_paths_from_api, lld_macro_paths_to_api, preprocessing_from_api,
    preprocessing_to_api, LldMacroState, PreprocessingState,
};
use crate::utils::{
    check_range, default_number, default_string, optional_string, string_value, WithNormalize,
    WithSchema, WithValidate,
};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct LldRuleState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub host_id: ValueString<'a>,
    pub rule_id: ValueString<'a>,
    pub name: ValueString<'a>,
    pub key: ValueString<'a>,
    #[serde(rename = "type")]
    pub kind: ValueNumber,
    pub delay: ValueString<'a>,
    pub interface_id: ValueString<'a>,
    pub lifetime: ValueString<'a>,
    pub description: ValueString<'a>,
    pub status: ValueNumber,
    pub preprocessing: ValueList<Value<PreprocessingState<'a>>>,
    pub lld_macros: ValueList<Value<LldMacroState<'a>>>,
}

impl<'a> WithSchema for LldRuleState<'a> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                description: Description::plain("Low-level discovery rule of a Zabbix host or template"),
                attributes: map! {
                    "id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Id of the discovery rule"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "host_id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Id of the host or template the rule belongs to. Changing it replaces the rule"),
                        constraint: AttributeConstraint::Required,
                        ..Default::default()
                    },
                    "rule_id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Id of the discovery rule, as returned by the API"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "name" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Name of the discovery rule"),
                        constraint: AttributeConstraint::Required,
                        ..Default::default()
                    },
                    "key" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Key of the discovery rule"),
                        constraint: AttributeConstraint::Required,
                        ..Default::default()
                    },
                    "type" => Attribute {
                        attr_type: AttributeType::Number,
                        description: Description::plain("Type of the discovery rule (default: 0, Zabbix agent)"),
                        constraint: AttributeConstraint::OptionalComputed,
                        ..Default::default()
                    },
                    "delay" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Update interval of the rule (default: 1h)"),
                        constraint: AttributeConstraint::OptionalComputed,
                        ..Default::default()
                    },
                    "interface_id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Id of the host interface used by the rule"),
                        constraint: AttributeConstraint::Optional,
                        ..Default::default()
                    },
                    "lifetime" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("How long discovered objects no longer discovered are kept (default: 30d)"),
                        constraint: AttributeConstraint::OptionalComputed,
                        ..Default::default()
                    },
                    "description" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Description of the rule"),
                        constraint: AttributeConstraint::Optional,
                        ..Default::default()
                    },
                    "status" => Attribute {
                        attr_type: AttributeType::Number,
                        description: Description::plain("0 when the rule is enabled, 1 when disabled (default: 0)"),
                        constraint: AttributeConstraint::OptionalComputed,
                        ..Default::default()
                    },
                },
                blocks: map! {
                    "preprocessing" => NestedBlock::List(PreprocessingState::block()),
                    "lld_macros" => NestedBlock::List(LldMacroState::block()),
                },
                ..Default::default()
            },
        }
    }
}

impl<'a> WithNormalize for LldRuleState<'a> {
    fn normalize(&mut self, _diags: &mut Diagnostics) {
        default_number(&mut self.kind, 0);
        default_string(&mut self.delay, "1h");
        default_string(&mut self.lifetime, "30d");
        default_number(&mut self.status, 0);
        if let Value::Value(steps) = &mut self.preprocessing {
            for step in steps.iter_mut().flatten() {
                step.normalize();
            }
        }
    }
}

#[async_trait]
impl<'a> WithValidate for LldRuleState<'a> {
    async fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        check_range(
            diags,
            attr_path.clone().attribute("status"),
            "status",
            &self.status,
            0,
            1,
        );
        for (i, lld_macro) in self.lld_macros.iter().flatten().flatten().enumerate() {
            if let Value::Value(name) = &lld_macro.lld_macro {
                if !(name.starts_with("{#") && name.ends_with('}')) {
                    diags.error(
                        "Invalid LLD macro",
                        format!("`{name}` must have the form `{{#NAME}}`"),
                        attr_path
                            .clone()
                            .attribute("lld_macros")
                            .index(i as i64)
                            .attribute("macro"),
                    );
                }
            }
        }
    }
}

impl<'a> ObjectState for LldRuleState<'a> {
    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn set_id(&mut self, id: String) {
        self.rule_id = string_value(id.clone());
        self.id = string_value(id);
    }

    fn mark_computed(&mut self) {
        self.id = Value::Unknown;
        self.rule_id = Value::Unknown;
    }
}

#[derive(Debug, Default)]
pub struct LldRuleObject;

impl LldRuleObject {
    fn request(state: &LldRuleState<'_>) -> LldRule {
        LldRule {
            itemid: state.id.as_deref_option().unwrap_or_default().to_owned(),
            hostid: state.host_id.as_str().to_owned(),
            name: state.name.as_str().to_owned(),
            key: state.key.as_str().to_owned(),
            kind: state.kind.unwrap_or(0),
            delay: state.delay.as_str().to_owned(),
            interfaceid: state.interface_id.as_str().to_owned(),
            lifetime: state.lifetime.as_str().to_owned(),
            description: state.description.as_str().to_owned(),
            status: state.status.unwrap_or(0),
            preprocessing: preprocessing_to_api(&state.preprocessing),
            lld_macro_paths: lld_macro_paths_to_api(&state.lld_macros),
            hosts: Vec::new(),
        }
    }
}

#[async_trait]
impl ZabbixObject for LldRuleObject {
    const KIND: &'static str = "Discovery rule";
    type State<'a> = LldRuleState<'a>;

    async fn create<'a>(
        &self,
        diags: &mut Diagnostics,
        api: &ZabbixApi,
        planned: &mut Self::State<'a>,
    ) -> Option<String> {
        let rule = Self::request(planned);
        let result = create_retry(&RetryPolicy::default(), || api.lld_rule_create(&rule)).await;
        report(diags, "Failed to create discovery rule", result)
    }

    async fn read<'a>(
        &self,
        _diags: &mut Diagnostics,
        api: &ZabbixApi,
        state: &mut Self::State<'a>,
    ) -> Result<(), ApiError> {
        let rule = api.lld_rule_get_by_id(state.id()).await?;
        let interface_id = if rule.interfaceid == "0" {
            String::new()
        } else {
            rule.interfaceid
        };

        state.rule_id = string_value(rule.itemid);
        state.host_id = string_value(rule.hostid);
        state.name = string_value(rule.name);
        state.key = string_value(rule.key);
        state.kind = Value::Value(rule.kind);
        state.delay = string_value(rule.delay);
        state.interface_id = optional_string(interface_id, &state.interface_id);
        state.lifetime = string_value(rule.lifetime);
        state.description = optional_string(rule.description, &state.description);
        state.status = Value::Value(rule.status);
        state.preprocessing = preprocessing_from_api(&rule.preprocessing, &state.preprocessing);
        state.lld_macros = lld_macro_paths_from_api(&rule.lld_macro_paths, &state.lld_macros);
        Ok(())
    }

    async fn update<'a>(
        &self,
        diags: &mut Diagnostics,
        api: &ZabbixApi,
        _prior: &Self::State<'a>,
        planned: &Self::State<'a>,
    ) -> Option<()> {
        let rule = LldRule {
            hostid: String::new(),
            ..Self::request(planned)
        };
        let result = create_retry(&RetryPolicy::default(), || api.lld_rule_update(&rule)).await;
        report(diags, "Failed to update discovery rule", result).map(|_| ())
    }

    async fn delete<'a>(
        &self,
        diags: &mut Diagnostics,
        api: &ZabbixApi,
        state: &Self::State<'a>,
    ) -> Option<()> {
        let id = state.id();
        let ids = [id];
        let result = delete_retry(
            &RetryPolicy::default(),
            api,
            id,
            || api.lld_rule_parent_id(id),
            || api.lld_rules_delete(&ids),
        )
        .await;
        report(diags, "Failed to delete discovery rule", result)
    }

    fn plan_changes<'a>(
        &self,
        prior: &Self::State<'a>,
        planned: &mut Self::State<'a>,
    ) -> Vec<AttributePath> {
        if prior.host_id != planned.host_id {
            vec![AttributePath::new("host_id")]
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use serde_json::json;

    use super::*;

    #[test]
    fn rule_request() {
        let mut state = LldRuleState {
            id: Value::Value(Cow::Borrowed("23001")),
            host_id: Value::Value(Cow::Borrowed("10084")),
            name: Value::Value(Cow::Borrowed("Mounted filesystem discovery")),
            key: Value::Value(Cow::Borrowed("vfs.fs.discovery")),
            lld_macros: Value::Value(vec![Value::Value(LldMacroState {
                lld_macro: Value::Value(Cow::Borrowed("{#FSNAME}")),
                path: Value::Value(Cow::Borrowed("$.fsname")),
            })]),
            ..Default::default()
        };
        state.normalize(&mut Diagnostics::default());

        let value = serde_json::to_value(LldRuleObject::request(&state)).unwrap();
        assert_eq!(value["itemid"], "23001");
        assert_eq!(value["delay"], "1h");
        assert_eq!(value["lifetime"], "30d");
        assert_eq!(
            value["lld_macro_paths"],
            json!([{ "lld_macro": "{#FSNAME}", "path": "$.fsname" }])
        );
        assert!(value.get("interfaceid").is_none());
    }

    #[tokio::test]
    async fn malformed_macros_are_reported() {
        let state = LldRuleState {
            lld_macros: Value::Value(vec![
                Value::Value(LldMacroState {
                    lld_macro: Value::Value(Cow::Borrowed("{#FSNAME}")),
                    path: Value::Value(Cow::Borrowed("$.fsname")),
                }),
                Value::Value(LldMacroState {
                    lld_macro: Value::Value(Cow::Borrowed("FSTYPE")),
                    path: Value::Value(Cow::Borrowed("$.fstype")),
                }),
            ]),
            ..Default::default()
        };
        let mut diags = Diagnostics::default();
        state.validate(&mut diags, AttributePath::default()).await;
        assert_eq!(diags.errors.len(), 1);
    }
}
