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

use tf_provider::value::{Value, ValueList, ValueNumber, ValueString};
use tf_provider::{
    map, Attribute, AttributeConstraint, AttributePath, AttributeType, Block, Description,
    Diagnostics, Schema,
};

use crate::resource::ObjectState;
use crate::transcode::StringMap;
use crate::utils::{
    check_range, default_number, default_string, list_entries, string_value, WithNormalize,
    WithSchema, WithValidate,
};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub description: ValueString<'a>,
    pub expression: ValueString<'a>,
    pub recovery_mode: ValueNumber,
    pub recovery_expression: ValueString<'a>,
    pub comment: ValueString<'a>,
    pub priority: ValueNumber,
    pub status: ValueNumber,
    pub dependencies: ValueList<ValueString<'a>>,
    pub tags: StringMap<'a>,
}

impl<'a> TriggerState<'a> {
    /// Ids of the triggers this one depends on, sorted
    pub fn dependency_ids(&self) -> Vec<&str> {
        let mut ids = list_entries(&self.dependencies);
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

impl<'a> WithSchema for TriggerState<'a> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                description: Description::plain("Zabbix trigger"),
                attributes: map! {
                    "id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Id of the trigger"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "description" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Name of the trigger"),
                        constraint: AttributeConstraint::Required,
                        ..Default::default()
                    },
                    "expression" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Problem expression of the trigger"),
                        constraint: AttributeConstraint::Required,
                        ..Default::default()
                    },
                    "recovery_mode" => Attribute {
                        attr_type: AttributeType::Number,
                        description: Description::plain("0: recover on the expression, 1: on the recovery expression, 2: never (default: 0)"),
                        constraint: AttributeConstraint::OptionalComputed,
                        ..Default::default()
                    },
                    "recovery_expression" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Recovery expression of the trigger"),
                        constraint: AttributeConstraint::OptionalComputed,
                        ..Default::default()
                    },
                    "comment" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Additional description of the trigger"),
                        constraint: AttributeConstraint::Optional,
                        ..Default::default()
                    },
                    "priority" => Attribute {
                        attr_type: AttributeType::Number,
                        description: Description::plain("Severity of the trigger, from 0 (not classified) to 5 (disaster) (default: 0)"),
                        constraint: AttributeConstraint::OptionalComputed,
                        ..Default::default()
                    },
                    "status" => Attribute {
                        attr_type: AttributeType::Number,
                        description: Description::plain("0 when the trigger is enabled, 1 when disabled (default: 0)"),
                        constraint: AttributeConstraint::OptionalComputed,
                        ..Default::default()
                    },
                    "dependencies" => Attribute {
                        attr_type: AttributeType::Set(Box::new(AttributeType::String)),
                        description: Description::plain("Ids of the triggers this trigger depends on"),
                        constraint: AttributeConstraint::Optional,
                        ..Default::default()
                    },
                    "tags" => Attribute {
                        attr_type: AttributeType::Map(Box::new(AttributeType::String)),
                        description: Description::plain("Tags of the trigger"),
                        constraint: AttributeConstraint::Optional,
                        ..Default::default()
                    },
                },
                ..Default::default()
            },
        }
    }
}

impl<'a> WithNormalize for TriggerState<'a> {
    fn normalize(&mut self, _diags: &mut Diagnostics) {
        default_number(&mut self.recovery_mode, 0);
        default_string(&mut self.recovery_expression, "");
        default_number(&mut self.priority, 0);
        default_number(&mut self.status, 0);
    }
}

#[async_trait]
impl<'a> WithValidate for TriggerState<'a> {
    async fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        for (name, value, max) in [
            ("recovery_mode", &self.recovery_mode, 2),
            ("priority", &self.priority, 5),
            ("status", &self.status, 1),
        ] {
            check_range(diags, attr_path.clone().attribute(name), name, value, 0, max);
        }

        let missing_recovery = match &self.recovery_expression {
            Value::Value(expression) => expression.is_empty(),
            Value::Null => true,
            Value::Unknown => false,
        };
        if self.recovery_mode == Value::Value(1) && missing_recovery {
            diags.error_short(
                "`recovery_expression` is required when `recovery_mode` is 1",
                attr_path.attribute("recovery_expression"),
            );
        }
    }
}

impl<'a> ObjectState for TriggerState<'a> {
    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn set_id(&mut self, id: String) {
        self.id = string_value(id);
    }

    fn mark_computed(&mut self) {
        self.id = Value::Unknown;
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;

    #[tokio::test]
    async fn out_of_range_values() {
        let mut state = TriggerState {
            priority: Value::Value(6),
            status: Value::Value(-1),
            ..Default::default()
        };
        state.normalize(&mut Diagnostics::default());

        let mut diags = Diagnostics::default();
        state.validate(&mut diags, AttributePath::default()).await;
        assert_eq!(diags.errors.len(), 2);
    }

    #[tokio::test]
    async fn recovery_expression_required() {
        let state = TriggerState {
            recovery_mode: Value::Value(1),
            recovery_expression: Value::Null,
            ..Default::default()
        };
        let mut diags = Diagnostics::default();
        state.validate(&mut diags, AttributePath::default()).await;
        assert_eq!(diags.errors.len(), 1);
    }

    #[test]
    fn dependencies_are_sorted() {
        let state = TriggerState {
            dependencies: Value::Value(vec![
                Value::Value(Cow::Borrowed("17")),
                Value::Unknown,
                Value::Value(Cow::Borrowed("12")),
            ]),
            ..Default::default()
        };
        assert_eq!(state.dependency_ids(), vec!["12", "17"]);
    }
}
