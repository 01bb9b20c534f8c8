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
use rand::{thread_rng, Rng};
use tracing::debug;

use tf_provider::value::Value;
use tf_provider::{AttributePath, Diagnostics};

use crate::api::types::{Proxy, ProxyInterface, PROXY_ACTIVE, PROXY_PASSIVE};
use crate::api::{ApiError, ZabbixApi};
use crate::resource::{report, ObjectState, ZabbixObject};
use crate::retry::{create_retry, RetryPolicy};
use crate::utils::{optional_string, string_value};

use super::state::ProxyState;

/// Random pre-shared key of 32 bytes, as 64 lowercase hex digits
fn random_psk() -> String {
    let bytes: [u8; 32] = thread_rng().gen();
    hex::encode(bytes)
}

#[derive(Debug, Default)]
pub struct ProxyObject;

impl ProxyObject {
    fn request(state: &ProxyState<'_>) -> Proxy {
        let passive = state.passive.unwrap_or(false);
        let interface = state
            .first_interface()
            .filter(|_| passive)
            .map(|interface| ProxyInterface {
                ip: interface.ip.as_str().to_owned(),
                dns: interface.dns.as_str().to_owned(),
                port: interface.port.as_str().to_owned(),
                useip: interface.use_ip(),
            });

        Proxy {
            proxyid: state.id.as_deref_option().unwrap_or_default().to_owned(),
            host: state.host.as_str().to_owned(),
            description: state.description.as_str().to_owned(),
            status: if passive { PROXY_PASSIVE } else { PROXY_ACTIVE },
            tls_connect: state.tls_connect.unwrap_or(1),
            tls_accept: state.tls_accept.unwrap_or(1),
            tls_psk_identity: state.tls_psk_identity.as_str().to_owned(),
            tls_psk: state.tls_psk.as_str().to_owned(),
            proxy_address: state.address.as_str().to_owned(),
            interface,
        }
    }
}

#[async_trait]
impl ZabbixObject for ProxyObject {
    const KIND: &'static str = "Proxy";
    type State<'a> = ProxyState<'a>;

    async fn create<'a>(
        &self,
        diags: &mut Diagnostics,
        api: &ZabbixApi,
        planned: &mut Self::State<'a>,
    ) -> Option<String> {
        if planned.needs_psk() {
            debug!(host = %planned.host.as_str(), "Generating proxy PSK");
            planned.tls_psk = string_value(random_psk());
        }
        let proxy = Self::request(planned);
        let result = create_retry(&RetryPolicy::default(), || api.proxy_create(&proxy)).await;
        report(diags, "Failed to create proxy", result)
    }

    async fn read<'a>(
        &self,
        _diags: &mut Diagnostics,
        api: &ZabbixApi,
        state: &mut Self::State<'a>,
    ) -> Result<(), ApiError> {
        let proxy = api.proxy_get_by_id(state.id()).await?;

        state.proxyid = string_value(proxy.proxyid);
        state.host = string_value(proxy.host);
        state.description = optional_string(proxy.description, &state.description);
        state.tls_connect = Value::Value(proxy.tls_connect);
        state.tls_accept = Value::Value(proxy.tls_accept);
        state.tls_psk_identity = optional_string(proxy.tls_psk_identity, &state.tls_psk_identity);
        // Recent servers never return the key
        if !proxy.tls_psk.is_empty() {
            state.tls_psk = string_value(proxy.tls_psk);
        } else if state.tls_psk.is_unknown() {
            state.tls_psk = Value::Null;
        }
        state.address = string_value(proxy.proxy_address);
        state.passive = Value::Value(proxy.status == PROXY_PASSIVE);

        if let (Some(interface), Value::Value(interfaces)) = (proxy.interface, &mut state.interfaces) {
            if let Some(Value::Value(first)) = interfaces.first_mut() {
                first.ip = string_value(interface.ip);
                first.dns = string_value(interface.dns);
                first.port = string_value(interface.port);
            }
        }
        Ok(())
    }

    async fn update<'a>(
        &self,
        diags: &mut Diagnostics,
        api: &ZabbixApi,
        _prior: &Self::State<'a>,
        planned: &Self::State<'a>,
    ) -> Option<()> {
        let proxy = Proxy {
            interface: None,
            ..Self::request(planned)
        };
        let result = create_retry(&RetryPolicy::default(), || api.proxy_update(&proxy)).await;
        report(diags, "Failed to update proxy", result).map(|_| ())
    }

    async fn delete<'a>(
        &self,
        diags: &mut Diagnostics,
        api: &ZabbixApi,
        state: &Self::State<'a>,
    ) -> Option<()> {
        let result = api.proxies_delete(&[state.id()]).await;
        report(diags, "Failed to delete proxy", result).map(|_| ())
    }

    fn plan_changes<'a>(
        &self,
        prior: &Self::State<'a>,
        planned: &mut Self::State<'a>,
    ) -> Vec<AttributePath> {
        // The key is applied as planned by the update
        if planned.needs_psk() && !planned.tls_psk.is_unknown() {
            planned.tls_psk = string_value(random_psk());
        }
        if prior.interfaces != planned.interfaces {
            vec![AttributePath::new("interfaces")]
        } else {
            Vec::new()
        }
    }
}
