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

//! Conversions between Terraform maps/blocks and Zabbix API lists.
//!
//! Maps are sent in key order, so a request built twice from the same
//! configuration is always identical.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tf_provider::value::{Value, ValueList, ValueMap, ValueNumber, ValueString};
use tf_provider::{map, Attribute, AttributeConstraint, AttributeType, Block, Description};

use crate::api::types::{Header, LldMacroPath, Macro, PreProc, Tag};
use crate::utils::{collection, map_entries, optional_number, optional_string, string_value};

pub type StringMap<'a> = ValueMap<'a, ValueString<'a>>;

fn map_from_pairs<'a>(
    pairs: impl Iterator<Item = (String, String)>,
    prior: &StringMap<'a>,
) -> StringMap<'a> {
    let map: BTreeMap<Cow<'a, str>, ValueString<'a>> = pairs
        .map(|(k, v)| (Cow::Owned(k), string_value(v)))
        .collect();
    let empty = map.is_empty();
    collection(map, empty, prior)
}

/// `{ NAME = value }` into `[{ macro = "{$NAME}", value }]`
pub fn macros_to_api(macros: &StringMap<'_>) -> Vec<Macro> {
    map_entries(macros)
        .map(|(name, value)| Macro {
            name: format!("{{${name}}}"),
            value: value.to_owned(),
        })
        .collect()
}

pub fn macros_from_api<'a>(macros: &[Macro], prior: &StringMap<'a>) -> StringMap<'a> {
    map_from_pairs(
        macros.iter().map(|m| {
            let name = m
                .name
                .strip_prefix("{$")
                .and_then(|name| name.strip_suffix('}'))
                .unwrap_or(&m.name);
            (name.to_owned(), m.value.clone())
        }),
        prior,
    )
}

pub fn tags_to_api(tags: &StringMap<'_>) -> Vec<Tag> {
    map_entries(tags)
        .map(|(tag, value)| Tag {
            tag: tag.to_owned(),
            value: value.to_owned(),
        })
        .collect()
}

pub fn tags_from_api<'a>(tags: &[Tag], prior: &StringMap<'a>) -> StringMap<'a> {
    map_from_pairs(
        tags.iter().map(|t| (t.tag.clone(), t.value.clone())),
        prior,
    )
}

pub fn headers_to_api(headers: &StringMap<'_>) -> Vec<Header> {
    map_entries(headers)
        .map(|(name, value)| Header {
            name: name.to_owned(),
            value: value.to_owned(),
        })
        .collect()
}

pub fn headers_from_api<'a>(headers: &[Header], prior: &StringMap<'a>) -> StringMap<'a> {
    map_from_pairs(
        headers.iter().map(|h| (h.name.clone(), h.value.clone())),
        prior,
    )
}

/// `preprocessing` block of items and discovery rules
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingState<'a> {
    #[serde(rename = "type")]
    pub kind: ValueNumber,
    #[serde(borrow = "'a")]
    pub params: ValueString<'a>,
    pub error_handler: ValueNumber,
    pub error_handler_params: ValueString<'a>,
}

impl<'a> PreprocessingState<'a> {
    pub fn block() -> Block {
        Block {
            description: Description::plain("Preprocessing step applied to the received value"),
            attributes: map! {
                "type" => Attribute {
                    attr_type: AttributeType::Number,
                    description: Description::plain("Type of the preprocessing step"),
                    constraint: AttributeConstraint::Required,
                    ..Default::default()
                },
                "params" => Attribute {
                    attr_type: AttributeType::String,
                    description: Description::plain("Parameters of the step, separated by new lines"),
                    constraint: AttributeConstraint::OptionalComputed,
                    ..Default::default()
                },
                "error_handler" => Attribute {
                    attr_type: AttributeType::Number,
                    description: Description::plain("Action taken when the step fails"),
                    constraint: AttributeConstraint::Optional,
                    ..Default::default()
                },
                "error_handler_params" => Attribute {
                    attr_type: AttributeType::String,
                    description: Description::plain("Parameters of the error handler"),
                    constraint: AttributeConstraint::Optional,
                    ..Default::default()
                },
            },
            ..Default::default()
        }
    }

    pub fn normalize(&mut self) {
        crate::utils::default_string(&mut self.params, "");
    }
}

pub fn preprocessing_to_api(steps: &ValueList<Value<PreprocessingState<'_>>>) -> Vec<PreProc> {
    steps
        .iter()
        .flatten()
        .flatten()
        .map(|step| PreProc {
            kind: step.kind.unwrap_or(0).to_string(),
            params: step.params.as_str().to_owned(),
            error_handler: step.error_handler.unwrap_or(0).to_string(),
            error_handler_params: step.error_handler_params.as_str().to_owned(),
        })
        .collect()
}

pub fn preprocessing_from_api<'a>(
    steps: &[PreProc],
    prior: &ValueList<Value<PreprocessingState<'a>>>,
) -> ValueList<Value<PreprocessingState<'a>>> {
    let prior_steps = prior.as_ref().map_or(&[][..], Vec::as_slice);
    let default_step = PreprocessingState::default();

    let states = steps
        .iter()
        .enumerate()
        .map(|(i, step)| {
            let prior_step = prior_steps
                .get(i)
                .and_then(|step| step.as_ref_option())
                .unwrap_or(&default_step);
            Value::Value(PreprocessingState {
                kind: Value::Value(step.kind.parse().unwrap_or_default()),
                params: string_value(step.params.clone()),
                error_handler: optional_number(
                    step.error_handler.parse().unwrap_or_default(),
                    0,
                    &prior_step.error_handler,
                ),
                error_handler_params: optional_string(
                    step.error_handler_params.clone(),
                    &prior_step.error_handler_params,
                ),
            })
        })
        .collect::<Vec<_>>();
    let empty = states.is_empty();
    collection(states, empty, prior)
}

/// `lld_macros` block of discovery rules
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct LldMacroState<'a> {
    #[serde(rename = "macro", borrow = "'a")]
    pub lld_macro: ValueString<'a>,
    pub path: ValueString<'a>,
}

impl<'a> LldMacroState<'a> {
    pub fn block() -> Block {
        Block {
            description: Description::plain("Low-level discovery macro extracted with a JSONPath"),
            attributes: map! {
                "macro" => Attribute {
                    attr_type: AttributeType::String,
                    description: Description::plain("LLD macro, e.g. `{#FSNAME}`"),
                    constraint: AttributeConstraint::Required,
                    ..Default::default()
                },
                "path" => Attribute {
                    attr_type: AttributeType::String,
                    description: Description::plain("JSONPath of the value"),
                    constraint: AttributeConstraint::Required,
                    ..Default::default()
                },
            },
            ..Default::default()
        }
    }
}

pub fn lld_macro_paths_to_api(macros: &ValueList<Value<LldMacroState<'_>>>) -> Vec<LldMacroPath> {
    macros
        .iter()
        .flatten()
        .flatten()
        .map(|m| LldMacroPath {
            lld_macro: m.lld_macro.as_str().to_owned(),
            path: m.path.as_str().to_owned(),
        })
        .collect()
}

pub fn lld_macro_paths_from_api<'a>(
    macros: &[LldMacroPath],
    prior: &ValueList<Value<LldMacroState<'a>>>,
) -> ValueList<Value<LldMacroState<'a>>> {
    let states = macros
        .iter()
        .map(|m| {
            Value::Value(LldMacroState {
                lld_macro: string_value(m.lld_macro.clone()),
                path: string_value(m.path.clone()),
            })
        })
        .collect::<Vec<_>>();
    let empty = states.is_empty();
    collection(states, empty, prior)
}
