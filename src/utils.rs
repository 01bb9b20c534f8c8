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

use std::borrow::Cow;
use std::cell::RefCell;

use async_trait::async_trait;

use tf_provider::value::{ValueList, ValueMap, ValueNumber, ValueString};
use tf_provider::{AttributePath, Diagnostics, Schema, Value};

pub(crate) trait WithSchema {
    fn schema() -> Schema;
}

#[async_trait]
pub(crate) trait WithValidate {
    async fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath);
}

pub(crate) trait WithNormalize {
    fn normalize(&mut self, diags: &mut Diagnostics);
}

/// Owned string value, as written back into the state after a read
pub(crate) fn string_value<'a>(s: impl Into<String>) -> ValueString<'a> {
    Value::Value(Cow::Owned(s.into()))
}

/// Replace a null value by its default, keeping unknowns untouched
pub(crate) fn default_string<'a>(value: &mut ValueString<'a>, default: &'static str) {
    if value.is_null() {
        *value = Value::Value(Cow::Borrowed(default));
    }
}

pub(crate) fn default_number(value: &mut ValueNumber, default: i64) {
    if value.is_null() {
        *value = Value::Value(default);
    }
}

pub(crate) fn default_bool(value: &mut Value<bool>, default: bool) {
    if value.is_null() {
        *value = Value::Value(default);
    }
}

/// Null or empty, unknown values may still be set
pub(crate) fn is_blank(value: &ValueString) -> bool {
    match value {
        Value::Value(value) => value.is_empty(),
        Value::Null => true,
        Value::Unknown => false,
    }
}

/// Value read from the server for an optional attribute without default.
/// An empty value stays null if it was null before the read.
pub(crate) fn optional_string<'a>(value: String, prior: &ValueString<'a>) -> ValueString<'a> {
    if value.is_empty() && prior.is_null() {
        Value::Null
    } else {
        string_value(value)
    }
}

pub(crate) fn optional_number(value: i64, default: i64, prior: &ValueNumber) -> ValueNumber {
    if value == default && prior.is_null() {
        Value::Null
    } else {
        Value::Value(value)
    }
}

/// Collection read from the server for an optional attribute.
/// An empty collection stays null if it was null before the read.
pub(crate) fn collection<T, P>(value: T, empty: bool, prior: &Value<P>) -> Value<T> {
    if empty && prior.is_null() {
        Value::Null
    } else {
        Value::Value(value)
    }
}

/// Iterate over the known entries of a string map
pub(crate) fn map_entries<'a, 'b>(
    map: &'b ValueMap<'a, ValueString<'a>>,
) -> impl Iterator<Item = (&'b str, &'b str)> {
    map.iter()
        .flatten()
        .filter_map(|(k, v)| Some((k.as_ref(), v.as_deref_option()?)))
}

/// Known elements of a list or set of strings
pub(crate) fn list_entries<'a, 'b>(list: &'b ValueList<ValueString<'a>>) -> Vec<&'b str> {
    list.iter()
        .flatten()
        .filter_map(|value| value.as_deref_option())
        .collect()
}

/// Report an integer attribute outside of `min..=max`
pub(crate) fn check_range(
    diags: &mut Diagnostics,
    attr_path: AttributePath,
    name: &str,
    value: &ValueNumber,
    min: i64,
    max: i64,
) {
    if let Value::Value(v) = value {
        if *v < min || *v > max {
            diags.error_short(
                format!("\"{name}\", must be between {min} and {max} inclusive, got {v}"),
                attr_path,
            );
        }
    }
}

pub struct DisplayJoiner<'a, T, I>
where
    T: Iterator<Item = I>,
    I: std::fmt::Display,
{
    iter: RefCell<T>,
    sep: &'a str,
}

pub trait DisplayJoinable {
    type Joiner<'a>;
    fn join_with(self, sep: &str) -> Self::Joiner<'_>;
}

impl<T, I> DisplayJoinable for T
where
    T: Iterator<Item = I>,
    I: std::fmt::Display,
{
    type Joiner<'a> = DisplayJoiner<'a, T, I>;

    fn join_with(self, sep: &str) -> Self::Joiner<'_> {
        DisplayJoiner {
            iter: RefCell::new(self),
            sep,
        }
    }
}

impl<'a, T, I> std::fmt::Display for DisplayJoiner<'a, T, I>
where
    T: Iterator<Item = I>,
    I: std::fmt::Display,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut sep = "";
        let mut iter = self.iter.try_borrow_mut().or(Err(std::fmt::Error))?;
        for elt in iter.by_ref() {
            f.write_str(sep)?;
            f.write_fmt(format_args!("{elt}"))?;
            sep = self.sep;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn join_names() {
        let missing = ["Linux servers", "Databases"];
        assert_eq!(
            missing.iter().join_with(", ").to_string(),
            "Linux servers, Databases"
        );
        assert_eq!(std::iter::empty::<&str>().join_with(", ").to_string(), "");
    }

    #[test]
    fn optional_values_stay_null() {
        assert!(optional_string(String::new(), &Value::Null).is_null());
        assert_eq!(
            optional_string(String::new(), &string_value("")),
            string_value("")
        );
        assert!(optional_number(0, 0, &Value::Null).is_null());
        assert_eq!(optional_number(3, 0, &Value::Null), Value::Value(3));

        let empty: BTreeMap<Cow<str>, ValueString> = BTreeMap::new();
        let null: ValueMap<ValueString> = Value::Null;
        assert!(collection(empty.clone(), true, &null).is_null());
        assert_eq!(
            collection(empty.clone(), true, &Value::Value(empty.clone())),
            Value::Value(empty)
        );
    }

    #[test]
    fn defaults_do_not_touch_unknowns() {
        let mut delay: ValueString = Value::Unknown;
        default_string(&mut delay, "1m");
        assert!(delay.is_unknown());

        let mut delay: ValueString = Value::Null;
        default_string(&mut delay, "1m");
        assert_eq!(delay.as_str(), "1m");

        let mut status: ValueNumber = Value::Null;
        default_number(&mut status, 0);
        assert_eq!(status, Value::Value(0));
    }

    #[test]
    fn range_check() {
        let mut diags = Diagnostics::default();
        check_range(
            &mut diags,
            AttributePath::new("priority"),
            "priority",
            &Value::Value(7),
            0,
            5,
        );
        check_range(
            &mut diags,
            AttributePath::new("status"),
            "status",
            &Value::Unknown,
            0,
            1,
        );
        assert_eq!(diags.errors.len(), 1);
    }
}
