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
use crate::utils::{default_string, string_value, WithNormalize, WithSchema, WithValidate};

/// Step of a web scenario
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepState<'a> {
    #[serde(borrow = "'a")]
    pub name: ValueString<'a>,
    pub order: ValueString<'a>,
    pub url: ValueString<'a>,
    pub status_codes: ValueString<'a>,
    pub search_string: ValueString<'a>,
    pub headers: StringMap<'a>,
}

impl<'a> StepState<'a> {
    fn block() -> Block {
        Block {
            description: Description::plain("Steps of the web scenario"),
            attributes: map! {
                "name" => Attribute {
                    attr_type: AttributeType::String,
                    description: Description::plain("Name of the step"),
                    constraint: AttributeConstraint::Required,
                    ..Default::default()
                },
                "order" => Attribute {
                    attr_type: AttributeType::String,
                    description: Description::plain("Position of the step in the scenario, starting at 1"),
                    constraint: AttributeConstraint::Required,
                    ..Default::default()
                },
                "url" => Attribute {
                    attr_type: AttributeType::String,
                    description: Description::plain("URL to check"),
                    constraint: AttributeConstraint::Required,
                    ..Default::default()
                },
                "status_codes" => Attribute {
                    attr_type: AttributeType::String,
                    description: Description::plain("Comma separated HTTP status codes expected, e.g. `200,201,210-299`"),
                    constraint: AttributeConstraint::Optional,
                    ..Default::default()
                },
                "search_string" => Attribute {
                    attr_type: AttributeType::String,
                    description: Description::plain("Text that must be present in the response"),
                    constraint: AttributeConstraint::Optional,
                    ..Default::default()
                },
                "headers" => Attribute {
                    attr_type: AttributeType::Map(Box::new(AttributeType::String)),
                    description: Description::plain("HTTP headers sent by the step"),
                    constraint: AttributeConstraint::Optional,
                    ..Default::default()
                },
            },
            ..Default::default()
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpTestState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub name: ValueString<'a>,
    pub host_id: ValueString<'a>,
    pub httptest_id: ValueString<'a>,
    pub delay: ValueString<'a>,
    pub retries: ValueString<'a>,
    pub headers: StringMap<'a>,
    pub steps: ValueList<Value<StepState<'a>>>,
}

impl<'a> WithSchema for HttpTestState<'a> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                description: Description::plain("Web scenario of a Zabbix host or template"),
                attributes: map! {
                    "id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Id of the web scenario"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "name" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Name of the web scenario"),
                        constraint: AttributeConstraint::Required,
                        ..Default::default()
                    },
                    "host_id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Id of the host or template the web scenario belongs to. Changing it replaces the web scenario"),
                        constraint: AttributeConstraint::Required,
                        ..Default::default()
                    },
                    "httptest_id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Id of the web scenario, as returned by the API"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "delay" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Execution interval of the web scenario (default: 1m)"),
                        constraint: AttributeConstraint::OptionalComputed,
                        ..Default::default()
                    },
                    "retries" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Number of attempts for each step before failing (default: 1)"),
                        constraint: AttributeConstraint::OptionalComputed,
                        ..Default::default()
                    },
                    "headers" => Attribute {
                        attr_type: AttributeType::Map(Box::new(AttributeType::String)),
                        description: Description::plain("HTTP headers sent by every step"),
                        constraint: AttributeConstraint::Optional,
                        ..Default::default()
                    },
                },
                blocks: map! {
                    "steps" => NestedBlock::List(StepState::block()),
                },
                ..Default::default()
            },
        }
    }
}

impl<'a> WithNormalize for HttpTestState<'a> {
    fn normalize(&mut self, _diags: &mut Diagnostics) {
        default_string(&mut self.delay, "1m");
        default_string(&mut self.retries, "1");
    }
}

#[async_trait]
impl<'a> WithValidate for HttpTestState<'a> {
    async fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        let no_step = match &self.steps {
            Value::Value(steps) => steps.is_empty(),
            Value::Null => true,
            Value::Unknown => false,
        };
        if no_step {
            diags.error_short(
                "A web scenario needs at least one step",
                attr_path.clone().attribute("steps"),
            );
        }

        for (i, step) in self.steps.iter().flatten().flatten().enumerate() {
            if let Value::Value(order) = &step.order {
                if order.parse::<u32>().map_or(true, |order| order == 0) {
                    diags.error(
                        "Invalid step order",
                        format!("`{order}` is not a positive number"),
                        attr_path
                            .clone()
                            .attribute("steps")
                            .index(i as i64)
                            .attribute("order"),
                    );
                }
            }
        }
    }
}

impl<'a> ObjectState for HttpTestState<'a> {
    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn set_id(&mut self, id: String) {
        self.httptest_id = string_value(id.clone());
        self.id = string_value(id);
    }

    fn mark_computed(&mut self) {
        self.id = Value::Unknown;
        self.httptest_id = Value::Unknown;
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;

    fn step(order: &'static str) -> Value<StepState<'static>> {
        Value::Value(StepState {
            name: Value::Value(Cow::Borrowed("Home page")),
            order: Value::Value(Cow::Borrowed(order)),
            url: Value::Value(Cow::Borrowed("https://example.com/")),
            ..Default::default()
        })
    }

    #[test]
    fn normalize_fills_defaults() {
        let mut state = HttpTestState {
            retries: Value::Value(Cow::Borrowed("3")),
            ..Default::default()
        };
        state.normalize(&mut Diagnostics::default());
        assert_eq!(state.delay.as_str(), "1m");
        assert_eq!(state.retries.as_str(), "3");
    }

    #[tokio::test]
    async fn steps_are_checked() {
        let mut diags = Diagnostics::default();
        HttpTestState::default()
            .validate(&mut diags, AttributePath::default())
            .await;
        assert_eq!(diags.errors.len(), 1);

        let state = HttpTestState {
            steps: Value::Value(vec![step("1"), step("0"), step("second")]),
            ..Default::default()
        };
        let mut diags = Diagnostics::default();
        state.validate(&mut diags, AttributePath::default()).await;
        assert_eq!(diags.errors.len(), 2);
    }
}
