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

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use tf_provider::value::{Value, ValueNumber, ValueString};
use tf_provider::{
    map, Attribute, AttributeConstraint, AttributePath, AttributeType, Block, Description,
    Diagnostics, Provider, Schema, ValueEmpty,
};

use crate::api::{ApiConfig, ZabbixApi};
use crate::host::{HostDataSource, HostObject};
use crate::host_group::HostGroupObject;
use crate::httptest::HttpTestObject;
use crate::item::ItemObject;
use crate::lld_rule::LldRuleObject;
use crate::proxy::ProxyObject;
use crate::resource::{ApiHandle, ZabbixResource};
use crate::template::TemplateObject;
use crate::trigger::TriggerObject;

const DEFAULT_TIMEOUT: i64 = 30;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig<'a> {
    #[serde(borrow = "'a")]
    pub server_url: ValueString<'a>,
    pub user: ValueString<'a>,
    pub password: ValueString<'a>,
    pub tls_insecure: Value<bool>,
    pub timeout: ValueNumber,
}

/// Credentials settable either in the provider block or in the environment
const SETTINGS: [(&str, &str); 3] = [
    ("server_url", "ZABBIX_SERVER_URL"),
    ("user", "ZABBIX_USER"),
    ("password", "ZABBIX_PASSWORD"),
];

impl<'a> ProviderConfig<'a> {
    fn setting(&self, name: &str) -> &ValueString<'a> {
        match name {
            "server_url" => &self.server_url,
            "user" => &self.user,
            _ => &self.password,
        }
    }

    /// Value of a setting, falling back to its environment variable.
    /// `None` when the value is not known yet.
    fn resolve<F>(&self, name: &str, env_var: &str, lookup: &F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        match self.setting(name) {
            Value::Value(value) if !value.is_empty() => Some(value.to_string()),
            Value::Unknown => None,
            _ => Some(lookup(env_var).unwrap_or_default()),
        }
    }

    /// Report settings neither configured nor present in the environment
    fn check<F>(&self, diags: &mut Diagnostics, lookup: &F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for (name, env_var) in SETTINGS {
            if self.resolve(name, env_var, lookup).is_some_and(|v| v.is_empty()) {
                diags.error(
                    format!("Missing `{name}`"),
                    format!("`{name}` must be set in the provider block or through the `{env_var}` environment variable."),
                    AttributePath::new(name),
                );
            }
        }
        if let Value::Value(timeout) = self.timeout {
            if timeout <= 0 {
                diags.error_short(
                    "`timeout` must be a positive number of seconds",
                    AttributePath::new("timeout"),
                );
            }
        }
    }

    fn api_config<F>(&self, lookup: &F) -> ApiConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        let [url, user, password] =
            SETTINGS.map(|(name, env_var)| self.resolve(name, env_var, lookup).unwrap_or_default());

        ApiConfig {
            url,
            user,
            password,
            tls_insecure: self.tls_insecure.unwrap_or(false),
            timeout: Duration::from_secs(self.timeout.unwrap_or(DEFAULT_TIMEOUT).max(1) as u64),
        }
    }
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

#[derive(Debug, Default, Clone)]
pub struct ZabbixProvider {
    api: ApiHandle,
}

#[async_trait]
impl Provider for ZabbixProvider {
    type Config<'a> = ProviderConfig<'a>;
    type MetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut tf_provider::Diagnostics) -> Option<tf_provider::Schema> {
        Some(Schema {
            version: 1,
            block: Block {
                description: Description::plain("Manage Zabbix monitoring entities"),
                attributes: map! {
                    "server_url" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("URL of the Zabbix API endpoint, e.g. `https://zabbix.example.com/api_jsonrpc.php`. Defaults to `ZABBIX_SERVER_URL`"),
                        constraint: AttributeConstraint::Optional,
                        ..Default::default()
                    },
                    "user" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("User name used to log in. Defaults to `ZABBIX_USER`"),
                        constraint: AttributeConstraint::Optional,
                        ..Default::default()
                    },
                    "password" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Password used to log in. Defaults to `ZABBIX_PASSWORD`"),
                        constraint: AttributeConstraint::Optional,
                        sensitive: true,
                        ..Default::default()
                    },
                    "tls_insecure" => Attribute {
                        attr_type: AttributeType::Bool,
                        description: Description::plain("Skip the verification of the server certificate"),
                        constraint: AttributeConstraint::Optional,
                        ..Default::default()
                    },
                    "timeout" => Attribute {
                        attr_type: AttributeType::Number,
                        description: Description::plain("Timeout of API calls in seconds (default: 30)"),
                        constraint: AttributeConstraint::Optional,
                        ..Default::default()
                    },
                },
                ..Default::default()
            },
        })
    }

    async fn validate<'a>(
        &self,
        diags: &mut tf_provider::Diagnostics,
        config: Self::Config<'a>,
    ) -> Option<()> {
        config.check(diags, &env_lookup);

        if diags.errors.is_empty() {
            Some(())
        } else {
            None
        }
    }

    async fn configure<'a>(
        &self,
        diags: &mut tf_provider::Diagnostics,
        terraform_version: String,
        config: Self::Config<'a>,
    ) -> Option<()> {
        config.check(diags, &env_lookup);
        if !diags.errors.is_empty() {
            return None;
        }

        let api_config = config.api_config(&env_lookup);
        debug!(terraform_version, url = %api_config.url, "Configuring provider");

        match ZabbixApi::connect(&api_config).await {
            Ok(api) => {
                info!(url = %api.url(), version = %api.version(), "Connected to Zabbix server");
                if !self.api.set(api) {
                    debug!("Provider already configured, keeping the first client");
                }
                Some(())
            }
            Err(err) => {
                diags.root_error(
                    format!("Failed to connect to Zabbix API at {}", api_config.url),
                    err.to_string(),
                );
                None
            }
        }
    }

    fn get_resources(
        &self,
        _diags: &mut tf_provider::Diagnostics,
    ) -> Option<std::collections::HashMap<String, Box<dyn tf_provider::resource::DynamicResource>>>
    {
        let api = &self.api;
        Some(map! {
            "host_group" => ZabbixResource::<HostGroupObject>::new(api.clone()),
            "host"       => ZabbixResource::<HostObject>::new(api.clone()),
            "template"   => ZabbixResource::<TemplateObject>::new(api.clone()),
            "item"       => ZabbixResource::<ItemObject>::new(api.clone()),
            "lld_rule"   => ZabbixResource::<LldRuleObject>::new(api.clone()),
            "trigger"    => ZabbixResource::<TriggerObject>::new(api.clone()),
            "proxy"      => ZabbixResource::<ProxyObject>::new(api.clone()),
            "httptest"   => ZabbixResource::<HttpTestObject>::new(api.clone()),
        })
    }

    fn get_data_sources(
        &self,
        _diags: &mut tf_provider::Diagnostics,
    ) -> Option<
        std::collections::HashMap<String, Box<dyn tf_provider::data_source::DynamicDataSource>>,
    > {
        Some(map! {
            "host" => HostDataSource::new(self.api.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;
    use std::collections::HashMap;

    use super::*;

    fn lookup<'a>(env: &'a HashMap<&'a str, &'a str>) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| env.get(name).map(|v| v.to_string())
    }

    #[test]
    fn settings_fall_back_to_environment() {
        let env = HashMap::from([
            ("ZABBIX_SERVER_URL", "http://zabbix.local/api_jsonrpc.php"),
            ("ZABBIX_USER", "Admin"),
            ("ZABBIX_PASSWORD", "zabbix"),
        ]);
        let config = ProviderConfig {
            user: Value::Value(Cow::Borrowed("terraform")),
            timeout: Value::Value(5),
            ..Default::default()
        };

        let mut diags = Diagnostics::default();
        config.check(&mut diags, &lookup(&env));
        assert!(diags.errors.is_empty());

        let api_config = config.api_config(&lookup(&env));
        assert_eq!(api_config.url, "http://zabbix.local/api_jsonrpc.php");
        assert_eq!(api_config.user, "terraform");
        assert_eq!(api_config.password, "zabbix");
        assert!(!api_config.tls_insecure);
        assert_eq!(api_config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn missing_settings_are_reported() {
        let env = HashMap::new();
        let config = ProviderConfig {
            server_url: Value::Unknown,
            timeout: Value::Value(0),
            ..Default::default()
        };

        let mut diags = Diagnostics::default();
        config.check(&mut diags, &lookup(&env));
        // user, password and timeout; the unknown url is checked at apply time
        assert_eq!(diags.errors.len(), 3);
    }
}
