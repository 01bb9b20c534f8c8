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

use tf_provider::value::{Value, ValueString};
use tf_provider::{
    map, Attribute, AttributeConstraint, AttributePath, AttributeType, Block, Description,
    Diagnostics, Schema,
};

use crate::api::types::HostGroup;
use crate::api::{ApiError, ZabbixApi};
use crate::resource::{report, ObjectState, ZabbixObject};
use crate::retry::{create_retry, RetryPolicy};
use crate::utils::{string_value, WithNormalize, WithSchema, WithValidate};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostGroupState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub name: ValueString<'a>,
    pub group_id: ValueString<'a>,
}

impl<'a> WithSchema for HostGroupState<'a> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                description: Description::plain("Zabbix host group"),
                attributes: map! {
                    "id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Id of the host group"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "name" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Name of the host group"),
                        constraint: AttributeConstraint::Required,
                        ..Default::default()
                    },
                    "group_id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Id of the host group, as returned by the API"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                },
                ..Default::default()
            },
        }
    }
}

impl<'a> WithNormalize for HostGroupState<'a> {
    fn normalize(&mut self, _diags: &mut Diagnostics) {}
}

#[async_trait]
impl<'a> WithValidate for HostGroupState<'a> {
    async fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        if let Value::Value(name) = &self.name {
            if name.trim().is_empty() {
                diags.error_short(
                    "Host group name must not be empty",
                    attr_path.attribute("name"),
                );
            }
        }
    }
}

impl<'a> ObjectState for HostGroupState<'a> {
    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn set_id(&mut self, id: String) {
        self.group_id = string_value(id.clone());
        self.id = string_value(id);
    }

    fn mark_computed(&mut self) {
        self.id = Value::Unknown;
        self.group_id = Value::Unknown;
    }
}

#[derive(Debug, Default)]
pub struct HostGroupObject;

impl HostGroupObject {
    fn request(state: &HostGroupState<'_>) -> HostGroup {
        HostGroup {
            groupid: state.id.as_deref_option().unwrap_or_default().to_owned(),
            name: state.name.as_str().to_owned(),
        }
    }
}

#[async_trait]
impl ZabbixObject for HostGroupObject {
    const KIND: &'static str = "Host group";
    type State<'a> = HostGroupState<'a>;

    async fn create<'a>(
        &self,
        diags: &mut Diagnostics,
        api: &ZabbixApi,
        planned: &mut Self::State<'a>,
    ) -> Option<String> {
        let group = HostGroup {
            groupid: String::new(),
            ..Self::request(planned)
        };
        let result = create_retry(&RetryPolicy::default(), || api.host_group_create(&group)).await;
        report(diags, "Failed to create host group", result)
    }

    async fn read<'a>(
        &self,
        _diags: &mut Diagnostics,
        api: &ZabbixApi,
        state: &mut Self::State<'a>,
    ) -> Result<(), ApiError> {
        let group = api.host_group_get_by_id(state.id()).await?;
        state.name = string_value(group.name);
        state.group_id = string_value(group.groupid);
        Ok(())
    }

    async fn update<'a>(
        &self,
        diags: &mut Diagnostics,
        api: &ZabbixApi,
        _prior: &Self::State<'a>,
        planned: &Self::State<'a>,
    ) -> Option<()> {
        let group = Self::request(planned);
        let result = create_retry(&RetryPolicy::default(), || api.host_group_update(&group)).await;
        report(diags, "Failed to update host group", result).map(|_| ())
    }

    async fn delete<'a>(
        &self,
        diags: &mut Diagnostics,
        api: &ZabbixApi,
        state: &Self::State<'a>,
    ) -> Option<()> {
        let result = api.host_groups_delete(&[state.id()]).await;
        report(diags, "Failed to delete host group", result).map(|_| ())
    }
}
