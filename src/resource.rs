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

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::debug;

use tf_provider::value::ValueEmpty;
use tf_provider::{schema::Schema, AttributePath, Diagnostics, Resource};

use crate::api::{ApiError, ZabbixApi};
use crate::utils::{WithNormalize, WithSchema, WithValidate};

/// API client shared between the provider and its resources.
///
/// Resources are instantiated before the provider is configured, so they
/// hold this handle and fetch the client when an operation runs.
#[derive(Debug, Default, Clone)]
pub struct ApiHandle(Arc<OnceCell<ZabbixApi>>);

impl ApiHandle {
    pub fn set(&self, api: ZabbixApi) -> bool {
        self.0.set(api).is_ok()
    }

    pub fn get(&self, diags: &mut Diagnostics) -> Option<&ZabbixApi> {
        let api = self.0.get();
        if api.is_none() {
            diags.root_error(
                "Provider not configured",
                "The Zabbix provider must be configured before its resources are used.",
            );
        }
        api
    }
}

/// Terraform state of a Zabbix object
pub(crate) trait ObjectState:
    WithSchema + WithNormalize + WithValidate + Send + Sync + Clone + Debug + Default + PartialEq
{
    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);

    /// Mark the attributes only known once the object exists as unknown
    fn mark_computed(&mut self);
}

/// CRUD of a kind of Zabbix object
#[async_trait]
pub(crate) trait ZabbixObject: Debug + Default + Send + Sync + 'static {
    /// Human readable name used in diagnostics
    const KIND: &'static str;

    type State<'a>: ObjectState + Serialize + Deserialize<'a>;

    /// Create the object and return its id.
    /// Values generated client side are written into `planned`.
    async fn create<'a>(
        &self,
        diags: &mut Diagnostics,
        api: &ZabbixApi,
        planned: &mut Self::State<'a>,
    ) -> Option<String>;

    /// Refresh `state` from the server
    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        api: &ZabbixApi,
        state: &mut Self::State<'a>,
    ) -> Result<(), ApiError>;

    async fn update<'a>(
        &self,
        diags: &mut Diagnostics,
        api: &ZabbixApi,
        prior: &Self::State<'a>,
        planned: &Self::State<'a>,
    ) -> Option<()>;

    async fn delete<'a>(
        &self,
        diags: &mut Diagnostics,
        api: &ZabbixApi,
        state: &Self::State<'a>,
    ) -> Option<()>;

    /// Adjust the planned update and return the attributes forcing a replacement
    fn plan_changes<'a>(
        &self,
        _prior: &Self::State<'a>,
        _planned: &mut Self::State<'a>,
    ) -> Vec<AttributePath> {
        Vec::new()
    }
}

#[derive(Debug, Default)]
pub(crate) struct ZabbixResource<T: ZabbixObject> {
    object: T,
    api: ApiHandle,
}

impl<T: ZabbixObject> ZabbixResource<T> {
    pub fn new(api: ApiHandle) -> Self {
        Self {
            object: T::default(),
            api,
        }
    }

    async fn refresh<'a>(
        &self,
        diags: &mut Diagnostics,
        api: &ZabbixApi,
        state: &mut T::State<'a>,
    ) -> Option<()> {
        match self.object.read(diags, api, state).await {
            Ok(()) => Some(()),
            Err(err) if err.is_not_found() => {
                diags.root_error(
                    format!("{} not found", T::KIND),
                    format!(
                        "The {} with id `{}` does not exist on the Zabbix server anymore. It must be removed from the state (`terraform state rm`) to be created again.",
                        T::KIND,
                        state.id()
                    ),
                );
                None
            }
            Err(err) => {
                diags.root_error(format!("Failed to read {}", T::KIND), err.to_string());
                None
            }
        }
    }
}

#[async_trait]
impl<T> Resource for ZabbixResource<T>
where
    T: ZabbixObject,
{
    type State<'a> = T::State<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(<T::State<'static> as WithSchema>::schema())
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        config.validate(diags, Default::default()).await;

        if diags.errors.is_empty() {
            Some(())
        } else {
            None
        }
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let api = self.api.get(diags)?;
        let mut state = state;
        debug!(kind = T::KIND, id = state.id(), "Reading object");
        self.refresh(diags, api, &mut state).await?;
        Some((state, private_state))
    }

    async fn plan_create<'a>(
        &self,
        diags: &mut Diagnostics,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let mut state = proposed_state;
        state.normalize(diags);
        state.mark_computed();

        Some((state, Default::default()))
    }

    async fn plan_update<'a>(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(
        Self::State<'a>,
        Self::PrivateState<'a>,
        Vec<tf_provider::AttributePath>,
    )> {
        let mut state = proposed_state;
        state.normalize(diags);
        let trigger_replace = self.object.plan_changes(&prior_state, &mut state);

        Some((state, prior_private_state, trigger_replace))
    }

    async fn plan_destroy<'a>(
        &self,
        _diags: &mut Diagnostics,
        _prior_state: Self::State<'a>,
        _prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<()> {
        Some(())
    }

    async fn create<'a>(
        &self,
        diags: &mut Diagnostics,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let api = self.api.get(diags)?;
        let mut state = planned_state;

        let id = self.object.create(diags, api, &mut state).await?;
        debug!(kind = T::KIND, id = %id, "Created object");
        state.set_id(id);

        self.refresh(diags, api, &mut state).await?;

        Some((state, private_state))
    }

    async fn update<'a>(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let api = self.api.get(diags)?;
        let mut state = planned_state;
        state.set_id(prior_state.id().to_owned());

        self.object.update(diags, api, &prior_state, &state).await?;
        debug!(kind = T::KIND, id = state.id(), "Updated object");

        self.refresh(diags, api, &mut state).await?;

        Some((state, private_state))
    }

    async fn destroy<'a>(
        &self,
        diags: &mut Diagnostics,
        state: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<()> {
        let api = self.api.get(diags)?;
        self.object.delete(diags, api, &state).await?;
        debug!(kind = T::KIND, id = state.id(), "Deleted object");
        Some(())
    }

    async fn import<'a>(
        &self,
        _diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        // Every other attribute is filled by the read following the import
        let mut state: Self::State<'a> = Default::default();
        state.set_id(id);
        Some((state, Default::default()))
    }
}

/// Report a failed API call on the whole resource
pub(crate) fn report<T>(
    diags: &mut Diagnostics,
    summary: impl Into<String>,
    result: Result<T, ApiError>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            diags.root_error(summary.into(), err.to_string());
            None
        }
    }
}
