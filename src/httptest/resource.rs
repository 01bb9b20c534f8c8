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

use tf_provider::value::{Value, ValueList};
use tf_provider::{AttributePath, Diagnostics};

use crate::api::types::{HttpTest, Step};
use crate::api::{ApiError, ZabbixApi};
use crate::resource::{report, ObjectState, ZabbixObject};
use crate::retry::{create_retry, RetryPolicy};
use crate::transcode::{headers_from_api, headers_to_api};
use crate::utils::{collection, optional_string, string_value};

use super::state::{HttpTestState, StepState};

fn steps_to_api(steps: &ValueList<Value<StepState<'_>>>) -> Vec<Step> {
    steps
        .iter()
        .flatten()
        .flatten()
        .map(|step| Step {
            httpstepid: String::new(),
            name: step.name.as_str().to_owned(),
            no: step.order.as_str().to_owned(),
            url: step.url.as_str().to_owned(),
            status_codes: step.status_codes.as_str().to_owned(),
            required: step.search_string.as_str().to_owned(),
            headers: headers_to_api(&step.headers),
        })
        .collect()
}

/// Steps ordered by position, optional fields matched with the prior step at the same index
fn steps_from_api<'a>(
    mut steps: Vec<Step>,
    prior: &ValueList<Value<StepState<'a>>>,
) -> ValueList<Value<StepState<'a>>> {
    steps.sort_by_key(|step| step.no.parse::<u32>().unwrap_or(u32::MAX));

    let prior_steps = prior.as_ref().map_or(&[][..], Vec::as_slice);
    let default_step = StepState::default();

    let states = steps
        .into_iter()
        .enumerate()
        .map(|(i, step)| {
            let prior_step = prior_steps
                .get(i)
                .and_then(|step| step.as_ref_option())
                .unwrap_or(&default_step);
            Value::Value(StepState {
                name: string_value(step.name),
                order: string_value(step.no),
                url: string_value(step.url),
                status_codes: optional_string(step.status_codes, &prior_step.status_codes),
                search_string: optional_string(step.required, &prior_step.search_string),
                headers: headers_from_api(&step.headers, &prior_step.headers),
            })
        })
        .collect::<Vec<_>>();
    let empty = states.is_empty();
    collection(states, empty, prior)
}

#[derive(Debug, Default)]
pub struct HttpTestObject;

impl HttpTestObject {
    fn request(state: &HttpTestState<'_>) -> HttpTest {
        HttpTest {
            httptestid: state.id.as_deref_option().unwrap_or_default().to_owned(),
            hostid: state.host_id.as_str().to_owned(),
            name: state.name.as_str().to_owned(),
            delay: state.delay.as_str().to_owned(),
            retries: state.retries.as_str().to_owned(),
            headers: headers_to_api(&state.headers),
            steps: steps_to_api(&state.steps),
        }
    }
}

#[async_trait]
impl ZabbixObject for HttpTestObject {
    const KIND: &'static str = "Web scenario";
    type State<'a> = HttpTestState<'a>;

    async fn create<'a>(
        &self,
        diags: &mut Diagnostics,
        api: &ZabbixApi,
        planned: &mut Self::State<'a>,
    ) -> Option<String> {
        let test = Self::request(planned);
        let result = create_retry(&RetryPolicy::default(), || api.http_test_create(&test)).await;
        report(diags, "Failed to create web scenario", result)
    }

    async fn read<'a>(
        &self,
        _diags: &mut Diagnostics,
        api: &ZabbixApi,
        state: &mut Self::State<'a>,
    ) -> Result<(), ApiError> {
        let test = api.http_test_get_by_id(state.id()).await?;

        state.httptest_id = string_value(test.httptestid);
        state.host_id = string_value(test.hostid);
        state.name = string_value(test.name);
        state.delay = string_value(test.delay);
        state.retries = string_value(test.retries);
        state.headers = headers_from_api(&test.headers, &state.headers);
        state.steps = steps_from_api(test.steps, &state.steps);
        Ok(())
    }

    async fn update<'a>(
        &self,
        diags: &mut Diagnostics,
        api: &ZabbixApi,
        _prior: &Self::State<'a>,
        planned: &Self::State<'a>,
    ) -> Option<()> {
        let test = HttpTest {
            hostid: String::new(),
            ..Self::request(planned)
        };
        let result = create_retry(&RetryPolicy::default(), || api.http_test_update(&test)).await;
        report(diags, "Failed to update web scenario", result).map(|_| ())
    }

    async fn delete<'a>(
        &self,
        diags: &mut Diagnostics,
        api: &ZabbixApi,
        state: &Self::State<'a>,
    ) -> Option<()> {
        let result = api.http_tests_delete(&[state.id()]).await;
        report(diags, "Failed to delete web scenario", result).map(|_| ())
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
    use std::collections::BTreeMap;

    use serde_json::json;

    use crate::api::types::Header;

    use super::*;

    fn step(no: &str, name: &str) -> Step {
        Step {
            httpstepid: format!("9{no}"),
            name: name.to_owned(),
            no: no.to_owned(),
            url: format!("https://example.com/{name}"),
            status_codes: "200".to_owned(),
            ..Default::default()
        }
    }

    #[test]
    fn request_renames_step_fields() {
        let state = HttpTestState {
            host_id: Value::Value(Cow::Borrowed("10084")),
            name: Value::Value(Cow::Borrowed("Storefront")),
            delay: Value::Value(Cow::Borrowed("1m")),
            retries: Value::Value(Cow::Borrowed("1")),
            steps: Value::Value(vec![Value::Value(StepState {
                name: Value::Value(Cow::Borrowed("Home")),
                order: Value::Value(Cow::Borrowed("1")),
                url: Value::Value(Cow::Borrowed("https://example.com/")),
                search_string: Value::Value(Cow::Borrowed("Welcome")),
                headers: Value::Value(BTreeMap::from([(
                    Cow::Borrowed("Accept"),
                    Value::Value(Cow::Borrowed("text/html")),
                )])),
                ..Default::default()
            })]),
            ..Default::default()
        };

        let value = serde_json::to_value(HttpTestObject::request(&state)).unwrap();
        assert!(value.get("httptestid").is_none());
        assert_eq!(value["hostid"], "10084");
        assert_eq!(
            value["steps"],
            json!([{
                "name": "Home",
                "no": "1",
                "url": "https://example.com/",
                "status_codes": "",
                "required": "Welcome",
                "headers": [{ "name": "Accept", "value": "text/html" }],
            }])
        );
    }

    #[test]
    fn steps_are_read_in_order() {
        let mut checkout = step("2", "checkout");
        checkout.headers = vec![Header {
            name: "Cookie".to_owned(),
            value: "cart=1".to_owned(),
        }];
        let steps = steps_from_api(vec![checkout, step("1", "home")], &Value::Null);

        let steps = steps.as_ref().unwrap();
        let first = steps[0].as_ref().unwrap();
        let second = steps[1].as_ref().unwrap();
        assert_eq!(first.name.as_str(), "home");
        assert!(first.search_string.is_null());
        assert!(first.headers.is_null());
        assert_eq!(second.order.as_str(), "2");
        assert_eq!(second.status_codes.as_str(), "200");
        assert!(!second.headers.is_null());
    }

    #[test]
    fn host_change_replaces_scenario() {
        let prior = HttpTestState {
            host_id: Value::Value(Cow::Borrowed("10084")),
            ..Default::default()
        };
        let mut planned = HttpTestState {
            host_id: Value::Value(Cow::Borrowed("10085")),
            ..Default::default()
        };
        assert_eq!(HttpTestObject.plan_changes(&prior, &mut planned).len(), 1);
    }
}
