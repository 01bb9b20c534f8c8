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

use tf_provider::value::{Value, ValueList, ValueString};
use tf_provider::{
    map, Attribute, AttributeConstraint, AttributePath, AttributeType, Block, Description,
    Diagnostics, Schema,
};

use crate::api::types::{GroupId, Template};
use crate::api::{ApiError, ZabbixApi};
use crate::resource::{report, ObjectState, ZabbixObject};
use crate::retry::{create_retry, RetryPolicy};
use crate::transcode::{macros_from_api, macros_to_api, tags_from_api, tags_to_api, StringMap};
use crate::utils::{
    list_entries, optional_string, string_value, WithNormalize, WithSchema, WithValidate,
};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub host: ValueString<'a>,
    pub name: ValueString<'a>,
    pub description: ValueString<'a>,
    pub groups: ValueList<ValueString<'a>>,
    #[serde(rename = "macro")]
    pub macros: StringMap<'a>,
    pub tags: StringMap<'a>,
    pub template_id: ValueString<'a>,
}

impl<'a> WithSchema for TemplateState<'a> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                description: Description::plain("Zabbix template"),
                attributes: map! {
                    "id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Id of the template"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "host" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Technical name of the template"),
                        constraint: AttributeConstraint::Required,
                        ..Default::default()
                    },
                    "name" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Visible name of the template (default: the technical name)"),
                        constraint: AttributeConstraint::OptionalComputed,
                        ..Default::default()
                    },
                    "description" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Description of the template"),
                        constraint: AttributeConstraint::Optional,
                        ..Default::default()
                    },
                    "groups" => Attribute {
                        attr_type: AttributeType::Set(Box::new(AttributeType::String)),
                        description: Description::plain("Names of the groups the template belongs to: template groups since Zabbix 6.2, host groups before"),
                        constraint: AttributeConstraint::Required,
                        ..Default::default()
                    },
                    "macro" => Attribute {
                        attr_type: AttributeType::Map(Box::new(AttributeType::String)),
                        description: Description::plain("User macros of the template, without the `{$` `}` delimiters"),
                        constraint: AttributeConstraint::Optional,
                        ..Default::default()
                    },
                    "tags" => Attribute {
                        attr_type: AttributeType::Map(Box::new(AttributeType::String)),
                        description: Description::plain("Tags of the template"),
                        constraint: AttributeConstraint::Optional,
                        ..Default::default()
                    },
                    "template_id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Id of the template, as returned by the API"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                },
                ..Default::default()
            },
        }
    }
}

impl<'a> WithNormalize for TemplateState<'a> {
    fn normalize(&mut self, _diags: &mut Diagnostics) {
        if self.name.is_null() {
            self.name = match &self.host {
                Value::Value(host) => string_value(host.as_ref()),
                _ => Value::Unknown,
            };
        }
    }
}

#[async_trait]
impl<'a> WithValidate for TemplateState<'a> {
    async fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        if let Value::Value(groups) = &self.groups {
            if groups.is_empty() {
                diags.error_short(
                    "A template must belong to at least one group",
                    attr_path.attribute("groups"),
                );
            }
        }
    }
}

impl<'a> ObjectState for TemplateState<'a> {
    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn set_id(&mut self, id: String) {
        self.template_id = string_value(id.clone());
        self.id = string_value(id);
    }

    fn mark_computed(&mut self) {
        self.id = Value::Unknown;
        self.template_id = Value::Unknown;
    }
}

#[derive(Debug, Default)]
pub struct TemplateObject;

impl TemplateObject {
    fn request(state: &TemplateState<'_>, groups: Vec<GroupId>) -> Template {
        Template {
            templateid: state.id.as_deref_option().unwrap_or_default().to_owned(),
            host: state.host.as_str().to_owned(),
            name: state.name.as_str().to_owned(),
            description: state.description.as_str().to_owned(),
            groups,
            macros: macros_to_api(&state.macros),
            tags: tags_to_api(&state.tags),
            hosts: Vec::new(),
        }
    }

    async fn build(
        diags: &mut Diagnostics,
        api: &ZabbixApi,
        state: &TemplateState<'_>,
    ) -> Option<Template> {
        match api.template_group_ids(&list_entries(&state.groups)).await {
            Ok(groups) => Some(Self::request(state, groups)),
            Err(err) => {
                diags.error(
                    "Failed to resolve template groups",
                    err.to_string(),
                    AttributePath::new("groups"),
                );
                None
            }
        }
    }
}

#[async_trait]
impl ZabbixObject for TemplateObject {
    const KIND: &'static str = "Template";
    type State<'a> = TemplateState<'a>;

    async fn create<'a>(
        &self,
        diags: &mut Diagnostics,
        api: &ZabbixApi,
        planned: &mut Self::State<'a>,
    ) -> Option<String> {
        let template = Self::build(diags, api, planned).await?;
        let result = create_retry(&RetryPolicy::default(), || api.template_create(&template)).await;
        report(diags, "Failed to create template", result)
    }

    async fn read<'a>(
        &self,
        _diags: &mut Diagnostics,
        api: &ZabbixApi,
        state: &mut Self::State<'a>,
    ) -> Result<(), ApiError> {
        let template = api.template_get_by_id(state.id()).await?;

        let mut groups = template
            .groups
            .into_iter()
            .map(|group| group.name)
            .collect::<Vec<_>>();
        groups.sort();

        state.host = string_value(template.host);
        state.name = string_value(template.name);
        state.description = optional_string(template.description, &state.description);
        state.groups = Value::Value(groups.into_iter().map(|name| string_value(name)).collect());
        state.macros = macros_from_api(&template.macros, &state.macros);
        state.tags = tags_from_api(&template.tags, &state.tags);
        state.template_id = string_value(template.templateid);
        Ok(())
    }

    async fn update<'a>(
        &self,
        diags: &mut Diagnostics,
        api: &ZabbixApi,
        _prior: &Self::State<'a>,
        planned: &Self::State<'a>,
    ) -> Option<()> {
        let template = Self::build(diags, api, planned).await?;
        let result = create_retry(&RetryPolicy::default(), || api.template_update(&template)).await;
        report(diags, "Failed to update template", result).map(|_| ())
    }

    async fn delete<'a>(
        &self,
        diags: &mut Diagnostics,
        api: &ZabbixApi,
        state: &Self::State<'a>,
    ) -> Option<()> {
        let result = api.templates_delete(&[state.id()]).await;
        report(diags, "Failed to delete template", result).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use serde_json::json;
    use wiremock::matchers::body_partial_json;

    use crate::api::mock::{connect, params, result, rpc, zabbix};

    use super::*;

    fn nginx_state() -> TemplateState<'static> {
        let mut state = TemplateState {
            host: Value::Value(Cow::Borrowed("Template App Nginx")),
            groups: Value::Value(vec![Value::Value(Cow::Borrowed("Templates/Applications"))]),
            ..Default::default()
        };
        state.normalize(&mut Diagnostics::default());
        state
    }

    #[test]
    fn template_request() {
        let mut state = TemplateState {
            host: Value::Value(Cow::Borrowed("Template App Nginx")),
            macros: Value::Value(
                [(Cow::Borrowed("NGINX.PORT"), Value::Value(Cow::Borrowed("8080")))]
                    .into_iter()
                    .collect(),
            ),
            ..Default::default()
        };
        state.normalize(&mut Diagnostics::default());
        state.set_id("10500".to_owned());

        let template = TemplateObject::request(
            &state,
            vec![GroupId {
                groupid: "1".to_owned(),
                name: "Templates".to_owned(),
            }],
        );
        assert_eq!(
            serde_json::to_value(&template).unwrap(),
            json!({
                "templateid": "10500",
                "host": "Template App Nginx",
                "name": "Template App Nginx",
                "description": "",
                "groups": [{ "groupid": "1" }],
                "macros": [{ "macro": "{$NGINX.PORT}", "value": "8080" }],
                "tags": [],
            })
        );
    }

    #[tokio::test]
    async fn template_groups_since_6_2() {
        let server = zabbix("6.4.8").await;
        rpc("templategroup.get")
            .respond_with(result(json!([{ "groupid": "12", "name": "Templates/Applications" }])))
            .expect(1)
            .mount(&server)
            .await;
        rpc("template.create")
            .respond_with(result(json!({ "templateids": ["10500"] })))
            .mount(&server)
            .await;
        rpc("template.get")
            .and(body_partial_json(json!({
                "params": { "selectTemplateGroups": ["groupid", "name"] },
            })))
            .respond_with(result(json!([{
                "templateid": "10500",
                "host": "Template App Nginx",
                "name": "Template App Nginx",
                "templategroups": [{ "groupid": "12", "name": "Templates/Applications" }],
            }])))
            .mount(&server)
            .await;
        let api = connect(&server).await;

        let mut state = nginx_state();
        let mut diags = Diagnostics::default();
        let id = TemplateObject.create(&mut diags, &api, &mut state).await.unwrap();
        assert_eq!(id, "10500");
        let sent = params(&server, "template.create").await;
        assert_eq!(sent[0]["groups"], json!([{ "groupid": "12" }]));

        state.set_id(id);
        TemplateObject.read(&mut diags, &api, &mut state).await.unwrap();
        assert_eq!(list_entries(&state.groups), ["Templates/Applications"]);
        assert!(diags.errors.is_empty());
    }

    #[tokio::test]
    async fn host_groups_before_6_2() {
        let server = zabbix("6.0.21").await;
        rpc("hostgroup.get")
            .respond_with(result(json!([{ "groupid": "1", "name": "Templates/Applications" }])))
            .expect(1)
            .mount(&server)
            .await;
        rpc("template.create")
            .respond_with(result(json!({ "templateids": ["10500"] })))
            .mount(&server)
            .await;
        rpc("template.get")
            .and(body_partial_json(json!({ "params": { "selectGroups": ["groupid", "name"] } })))
            .respond_with(result(json!([{
                "templateid": "10500",
                "host": "Template App Nginx",
                "groups": [{ "groupid": "1", "name": "Templates/Applications" }],
            }])))
            .mount(&server)
            .await;
        let api = connect(&server).await;

        let mut state = nginx_state();
        let mut diags = Diagnostics::default();
        let id = TemplateObject.create(&mut diags, &api, &mut state).await.unwrap();
        let sent = params(&server, "template.create").await;
        assert_eq!(sent[0]["groups"], json!([{ "groupid": "1" }]));

        state.set_id(id);
        TemplateObject.read(&mut diags, &api, &mut state).await.unwrap();
        assert_eq!(list_entries(&state.groups), ["Templates/Applications"]);
    }
}
