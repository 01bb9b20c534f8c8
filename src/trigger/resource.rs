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
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde_json::json;
use tracing::debug;

use tf_provider::value::Value;
use tf_provider::Diagnostics;

use crate::api::types::{Item, Trigger, TriggerFunction, TriggerId};
use crate::api::{ApiError, ZabbixApi};
use crate::resource::{report, ObjectState, ZabbixObject};
use crate::retry::{create_retry, delete_retry, RetryPolicy};
use crate::transcode::{tags_from_api, tags_to_api};
use crate::utils::{collection, optional_string, string_value};

use super::expression::{expand, ResolvedFunction};
use super::state::TriggerState;

/// Items looked up concurrently when expanding an expression
const ITEM_LOOKUPS: usize = 8;

#[derive(Debug, Default)]
pub struct TriggerObject;

impl TriggerObject {
    fn request(state: &TriggerState<'_>) -> Trigger {
        Trigger {
            triggerid: state.id.as_deref_option().unwrap_or_default().to_owned(),
            description: state.description.as_str().to_owned(),
            expression: state.expression.as_str().to_owned(),
            recovery_mode: state.recovery_mode.unwrap_or(0),
            recovery_expression: state.recovery_expression.as_str().to_owned(),
            comments: state.comment.as_str().to_owned(),
            priority: state.priority.unwrap_or(0),
            status: state.status.unwrap_or(0),
            dependencies: Some(
                state
                    .dependency_ids()
                    .into_iter()
                    .map(|triggerid| TriggerId {
                        triggerid: triggerid.to_owned(),
                    })
                    .collect(),
            ),
            tags: tags_to_api(&state.tags),
            ..Default::default()
        }
    }

    /// Item of every function of the trigger, with its single parent host
    fn function_items<'t>(
        api: &'t ZabbixApi,
        trigger: &'t Trigger,
    ) -> BoxFuture<'t, Result<Vec<Item>, ApiError>> {
        stream::iter(&trigger.functions)
            .map(move |function: &'t TriggerFunction| async move {
                let item = api
                    .item_get_by_id(&function.itemid)
                    .await
                    .map_err(|err| match err {
                        ApiError::ExpectedOne(count) => ApiError::FunctionItem {
                            id: function.itemid.clone(),
                            count,
                        },
                        err => err,
                    })?;
                if item.hosts.len() != 1 {
                    return Err(ApiError::Parent {
                        id: function.itemid.clone(),
                        count: item.hosts.len(),
                    });
                }
                Ok(item)
            })
            .buffered(ITEM_LOOKUPS)
            .try_collect()
            .boxed()
    }
}

#[async_trait]
impl ZabbixObject for TriggerObject {
    const KIND: &'static str = "Trigger";
    type State<'a> = TriggerState<'a>;

    async fn create<'a>(
        &self,
        diags: &mut Diagnostics,
        api: &ZabbixApi,
        planned: &mut Self::State<'a>,
    ) -> Option<String> {
        let trigger = Self::request(planned);
        let result = create_retry(&RetryPolicy::default(), || api.trigger_create(&trigger)).await;
        report(diags, "Failed to create trigger", result)
    }

    async fn read<'a>(
        &self,
        _diags: &mut Diagnostics,
        api: &ZabbixApi,
        state: &mut Self::State<'a>,
    ) -> Result<(), ApiError> {
        let mut triggers = api
            .triggers_get(json!({
                "output": "extend",
                "selectDependencies": "extend",
                "selectFunctions": "extend",
                "selectTags": "extend",
                "triggerids": [state.id()],
            }))
            .await?;
        match triggers.len() {
            0 => return Err(ApiError::ExpectedOne(0)),
            1 => (),
            count => return Err(ApiError::Ambiguous(count)),
        }
        let trigger = triggers.remove(0);

        let items = Self::function_items(api, &trigger).await?;
        let functions = trigger
            .functions
            .iter()
            .zip(&items)
            .map(|(function, item)| ResolvedFunction {
                functionid: &function.functionid,
                function: &function.function,
                parameter: &function.parameter,
                host: item.hosts.first().map_or("", |host| host.host.as_str()),
                key: &item.key,
            })
            .collect::<Vec<_>>();
        let version = api.version();
        let expression = expand(&trigger.expression, &functions, version);
        let recovery_expression = expand(&trigger.recovery_expression, &functions, version);
        debug!(expression = %expression, "Expanded trigger expression");

        let mut dependencies = trigger
            .dependencies
            .unwrap_or_default()
            .into_iter()
            .map(|dependency| dependency.triggerid)
            .collect::<Vec<_>>();
        dependencies.sort();
        let empty = dependencies.is_empty();

        state.description = string_value(trigger.description);
        state.expression = string_value(expression);
        state.recovery_mode = Value::Value(trigger.recovery_mode);
        state.recovery_expression = string_value(recovery_expression);
        state.comment = optional_string(trigger.comments, &state.comment);
        state.priority = Value::Value(trigger.priority);
        state.status = Value::Value(trigger.status);
        state.dependencies = collection(
            dependencies.into_iter().map(|id| string_value(id)).collect(),
            empty,
            &state.dependencies,
        );
        state.tags = tags_from_api(&trigger.tags, &state.tags);
        Ok(())
    }

    async fn update<'a>(
        &self,
        diags: &mut Diagnostics,
        api: &ZabbixApi,
        prior: &Self::State<'a>,
        planned: &Self::State<'a>,
    ) -> Option<()> {
        let mut trigger = Self::request(planned);
        if prior.dependency_ids() == planned.dependency_ids() {
            trigger.dependencies = None;
        }
        let result = create_retry(&RetryPolicy::default(), || api.trigger_update(&trigger)).await;
        report(diags, "Failed to update trigger", result).map(|_| ())
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
            || api.trigger_parent_id(id),
            || api.triggers_delete(&ids),
        )
        .await;
        report(diags, "Failed to delete trigger", result)
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use serde_json::json;

    use crate::api::mock::{connect, params, result, rpc, zabbix};

    use super::*;

    fn trigger_json(expression: &str, parameter: &str) -> serde_json::Value {
        json!({
            "triggerid": "14000",
            "description": "High CPU load",
            "expression": expression,
            "recovery_mode": "0",
            "recovery_expression": "",
            "comments": "",
            "priority": "4",
            "status": "0",
            "dependencies": [],
            "tags": [],
            "functions": [{
                "functionid": "13284",
                "itemid": "28000",
                "function": "last",
                "parameter": parameter,
            }],
        })
    }

    fn cpu_item() -> serde_json::Value {
        json!([{
            "itemid": "28000",
            "name": "CPU load",
            "key_": "system.cpu.load",
            "hosts": [{ "hostid": "10084", "host": "web-01" }],
        }])
    }

    fn stored_state() -> TriggerState<'static> {
        TriggerState {
            id: Value::Value(Cow::Borrowed("14000")),
            ..Default::default()
        }
    }

    async fn read(
        version: &str,
        triggers: serde_json::Value,
        items: serde_json::Value,
    ) -> (Result<(), ApiError>, TriggerState<'static>) {
        let server = zabbix(version).await;
        rpc("trigger.get")
            .respond_with(result(triggers))
            .mount(&server)
            .await;
        rpc("item.get")
            .respond_with(result(items))
            .mount(&server)
            .await;

        let api = connect(&server).await;
        let mut state = stored_state();
        let outcome = TriggerObject
            .read(&mut Diagnostics::default(), &api, &mut state)
            .await;
        (outcome, state)
    }

    #[tokio::test]
    async fn read_expands_functions_since_5_4() {
        let (outcome, state) = read(
            "6.0.21",
            json!([trigger_json("{13284}>5", "$")]),
            cpu_item(),
        )
        .await;
        outcome.unwrap();
        assert_eq!(state.expression.as_str(), "last(/web-01/system.cpu.load)>5");
        assert_eq!(state.priority, Value::Value(4));
    }

    #[tokio::test]
    async fn read_expands_functions_before_5_4() {
        let (outcome, state) = read(
            "5.0.38",
            json!([trigger_json("{13284}>5", "")]),
            cpu_item(),
        )
        .await;
        outcome.unwrap();
        assert_eq!(state.expression.as_str(), "{web-01:system.cpu.load.last()}>5");
    }

    #[tokio::test]
    async fn missing_function_item_is_not_a_missing_trigger() {
        let (outcome, _) = read(
            "6.0.21",
            json!([trigger_json("{13284}>5", "$")]),
            json!([]),
        )
        .await;
        let err = outcome.unwrap_err();
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "Expected one item with id : 28000 and got : 0");
    }

    #[tokio::test]
    async fn read_rejects_several_triggers() {
        let (outcome, _) = read(
            "6.0.21",
            json!([trigger_json("{13284}>5", "$"), trigger_json("{13284}>9", "$")]),
            cpu_item(),
        )
        .await;
        let err = outcome.unwrap_err();
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "Expected one result got : 2");

        let (outcome, _) = read("6.0.21", json!([]), cpu_item()).await;
        assert!(outcome.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn update_sends_dependencies_only_when_changed() {
        let server = zabbix("6.0.21").await;
        rpc("trigger.update")
            .respond_with(result(json!({ "triggerids": ["14000"] })))
            .expect(2)
            .mount(&server)
            .await;
        let api = connect(&server).await;

        let prior = TriggerState {
            description: Value::Value(Cow::Borrowed("High CPU load")),
            expression: Value::Value(Cow::Borrowed("last(/web-01/system.cpu.load)>5")),
            dependencies: Value::Value(vec![Value::Value(Cow::Borrowed("13999"))]),
            ..stored_state()
        };
        let planned = TriggerState {
            priority: Value::Value(5),
            ..prior.clone()
        };
        let mut diags = Diagnostics::default();
        TriggerObject
            .update(&mut diags, &api, &prior, &planned)
            .await
            .unwrap();

        let planned = TriggerState {
            dependencies: Value::Value(Vec::new()),
            ..planned
        };
        TriggerObject
            .update(&mut diags, &api, &prior, &planned)
            .await
            .unwrap();

        let sent = params(&server, "trigger.update").await;
        assert_eq!(sent.len(), 2);
        assert!(sent[0].get("dependencies").is_none());
        assert_eq!(sent[0]["priority"], 5);
        assert_eq!(sent[1]["dependencies"], json!([]));
    }

    #[test]
    fn trigger_request() {
        let state = TriggerState {
            id: Value::Value(Cow::Borrowed("14000")),
            description: Value::Value(Cow::Borrowed("High CPU load")),
            expression: Value::Value(Cow::Borrowed("last(/web-01/system.cpu.load)>5")),
            recovery_mode: Value::Value(0),
            recovery_expression: Value::Value(Cow::Borrowed("")),
            priority: Value::Value(4),
            status: Value::Value(0),
            dependencies: Value::Value(vec![
                Value::Value(Cow::Borrowed("13999")),
                Value::Value(Cow::Borrowed("13001")),
            ]),
            ..Default::default()
        };

        assert_eq!(
            serde_json::to_value(TriggerObject::request(&state)).unwrap(),
            json!({
                "triggerid": "14000",
                "description": "High CPU load",
                "expression": "last(/web-01/system.cpu.load)>5",
                "recovery_mode": 0,
                "recovery_expression": "",
                "comments": "",
                "priority": 4,
                "status": 0,
                "dependencies": [{ "triggerid": "13001" }, { "triggerid": "13999" }],
                "tags": [],
            })
        );
    }
}
