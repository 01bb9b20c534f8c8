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

use tf_provider::value::Value;
use tf_provider::{AttributePath, Diagnostics};

use crate::api::types::Item;
use crate::api::{ApiError, ZabbixApi};
use crate::resource::{report, ObjectState, ZabbixObject};
use crate::retry::{create_retry, delete_retry, RetryPolicy};
use crate::transcode::{preprocessing_from_api, preprocessing_to_api, tags_from_api, tags_to_api};
use crate::utils::{optional_string, string_value};

use super::state::ItemState;

#[derive(Debug, Default)]
pub struct ItemObject;

impl ItemObject {
    fn request(state: &ItemState<'_>) -> Item {
        Item {
            itemid: state.id.as_deref_option().unwrap_or_default().to_owned(),
            hostid: state.host_id.as_str().to_owned(),
            name: state.name.as_str().to_owned(),
            key: state.key.as_str().to_owned(),
            kind: state.kind.unwrap_or(0),
            value_type: state.value_type.unwrap_or(3),
            delay: state.delay.as_str().to_owned(),
            interfaceid: state.interface_id.as_str().to_owned(),
            history: state.history.as_str().to_owned(),
            trends: state.trends.as_str().to_owned(),
            units: state.units.as_str().to_owned(),
            description: state.description.as_str().to_owned(),
            status: state.status.unwrap_or(0),
            tags: tags_to_api(&state.tags),
            preprocessing: preprocessing_to_api(&state.preprocessing),
            hosts: Vec::new(),
        }
    }
}

#[async_trait]
impl ZabbixObject for ItemObject {
    const KIND: &'static str = "Item";
    type State<'a> = ItemState<'a>;

    async fn create<'a>(
        &self,
        diags: &mut Diagnostics,
        api: &ZabbixApi,
        planned: &mut Self::State<'a>,
    ) -> Option<String> {
        let item = Self::request(planned);
        let result = create_retry(&RetryPolicy::default(), || api.item_create(&item)).await;
        report(diags, "Failed to create item", result)
    }

    async fn read<'a>(
        &self,
        _diags: &mut Diagnostics,
        api: &ZabbixApi,
        state: &mut Self::State<'a>,
    ) -> Result<(), ApiError> {
        let item = api.item_get_by_id(state.id()).await?;
        let interface_id = if item.interfaceid == "0" {
            String::new()
        } else {
            item.interfaceid
        };

        state.item_id = string_value(item.itemid);
        state.host_id = string_value(item.hostid);
        state.name = string_value(item.name);
        state.key = string_value(item.key);
        state.kind = Value::Value(item.kind);
        state.value_type = Value::Value(item.value_type);
        state.delay = string_value(item.delay);
        state.interface_id = optional_string(interface_id, &state.interface_id);
        state.history = string_value(item.history);
        state.trends = string_value(item.trends);
        state.units = optional_string(item.units, &state.units);
        state.description = optional_string(item.description, &state.description);
        state.status = Value::Value(item.status);
        state.tags = tags_from_api(&item.tags, &state.tags);
        state.preprocessing = preprocessing_from_api(&item.preprocessing, &state.preprocessing);
        Ok(())
    }

    async fn update<'a>(
        &self,
        diags: &mut Diagnostics,
        api: &ZabbixApi,
        _prior: &Self::State<'a>,
        planned: &Self::State<'a>,
    ) -> Option<()> {
        // The host of an item cannot be changed
        let item = Item {
            hostid: String::new(),
            ..Self::request(planned)
        };
        let result = create_retry(&RetryPolicy::default(), || api.item_update(&item)).await;
        report(diags, "Failed to update item", result).map(|_| ())
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
            || api.item_parent_id(id),
            || api.items_delete(&ids),
        )
        .await;
        report(diags, "Failed to delete item", result)
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
