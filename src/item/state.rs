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
use tf_provider::value::{Value, ValueList, ValueNumber, ValueString};
use tf_provider::{
    map, Attribute, AttributeConstraint, AttributePath, AttributeType, Block, Description,
    Diagnostics, Schema,
};

use crate::resource::ObjectState;
use crate::transcode::{PreprocessingState, StringMap};
use crate::utils::{
    check_range, default_number, default_string, string_value, WithNormalize, WithSchema,
    WithValidate,
};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub host_id: ValueString<'a>,
    pub item_id: ValueString<'a>,
    pub name: ValueString<'a>,
    pub key: ValueString<'a>,
    #[serde(rename = "type")]
    pub kind: ValueNumber,
    pub value_type: ValueNumber,
    pub delay: ValueString<'a>,
    pub interface_id: ValueString<'a>,
    pub history: ValueString<'a>,
    pub trends: ValueString<'a>,
    pub units: ValueString<'a>,
    pub description: ValueString<'a>,
    pub status: ValueNumber,
    pub tags: StringMap<'a>,
    pub preprocessing: ValueList<Value<PreprocessingState<'a>>>,
}

impl<'a> WithSchema for ItemState<'a> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                description: Description::plain("Item of a Zabbix host or template"),
                attributes: map! {
                    "id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Id of the item"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "host_id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Id of the host or template the item belongs to. Changing it replaces the item"),
                        constraint: AttributeConstraint::Required,
                        ..Default::default()
                    },
                    "item_id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Id of the item, as returned by the API"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "name" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Name of the item"),
                        constraint: AttributeConstraint::Required,
                        ..Default::default()
                    },
                    "key" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Key of the item"),
                        constraint: AttributeConstraint::Required,
                        ..Default::default()
                    },
                    "type" => Attribute {
                        attr_type: AttributeType::Number,
                        description: Description::plain("Type of the item (default: 0, Zabbix agent)"),
                        constraint: AttributeConstraint::OptionalComputed,
                        ..Default::default()
                    },
                    "value_type" => Attribute {
                        attr_type: AttributeType::Number,
                        description: Description::plain("Type of information of the item (default: 3, numeric unsigned)"),
                        constraint: AttributeConstraint::OptionalComputed,
                        ..Default::default()
                    },
                    "delay" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Update interval of the item (default: 1m)"),
                        constraint: AttributeConstraint::OptionalComputed,
                        ..Default::default()
                    },
                    "interface_id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Id of the host interface used by the item"),
                        constraint: AttributeConstraint::Optional,
                        ..Default::default()
                    },
                    "history" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("How long the history is kept (default: 90d)"),
                        constraint: AttributeConstraint::OptionalComputed,
                        ..Default::default()
                    },
                    "trends" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("How long the trends are kept (default: 365d)"),
                        constraint: AttributeConstraint::OptionalComputed,
                        ..Default::default()
                    },
                    "units" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Units of the value"),
                        constraint: AttributeConstraint::Optional,
                        ..Default::default()
                    },
                    "description" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Description of the item"),
                        constraint: AttributeConstraint::Optional,
                        ..Default::default()
                    },
                    "status" => Attribute {
                        attr_type: AttributeType::Number,
                        description: Description::plain("0 when the item is enabled, 1 when disabled (default: 0)"),
                        constraint: AttributeConstraint::OptionalComputed,
                        ..Default::default()
                    },
                    "tags" => Attribute {
                        attr_type: AttributeType::Map(Box::new(AttributeType::String)),
                        description: Description::plain("Tags of the item"),
                        constraint: AttributeConstraint::Optional,
                        ..Default::default()
                    },
                },
                blocks: map! {
                    "preprocessing" => NestedBlock::List(PreprocessingState::block()),
                },
                ..Default::default()
            },
        }
    }
}

impl<'a> WithNormalize for ItemState<'a> {
    fn normalize(&mut self, _diags: &mut Diagnostics) {
        default_number(&mut self.kind, 0);
        default_number(&mut self.value_type, 3);
        default_string(&mut self.delay, "1m");
        default_string(&mut self.history, "90d");
        default_string(&mut self.trends, "365d");
        default_number(&mut self.status, 0);
        if let Value::Value(steps) = &mut self.preprocessing {
            for step in steps.iter_mut().flatten() {
                step.normalize();
            }
        }
    }
}

#[async_trait]
impl<'a> WithValidate for ItemState<'a> {
    async fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        check_range(
            diags,
            attr_path.clone().attribute("value_type"),
            "value_type",
            &self.value_type,
            0,
            5,
        );
        check_range(
            diags,
            attr_path.attribute("status"),
            "status",
            &self.status,
            0,
            1,
        );
    }
}

impl<'a> ObjectState for ItemState<'a> {
    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn set_id(&mut self, id: String) {
        self.item_id = string_value(id.clone());
        self.id = string_value(id);
    }

    fn mark_computed(&mut self) {
        self.id = Value::Unknown;
        self.item_id = Value::Unknown;
    }
}
