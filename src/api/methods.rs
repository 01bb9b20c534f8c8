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

use std::collections::HashMap;

use serde_json::{json, Value};

use super::types::{
    GroupId, Host, HostGroup, HostRef, HttpTest, Item, LldRule, Proxy, Template, TemplateId,
    Trigger,
};
use super::{ApiError, ApiVersion, Result, ZabbixApi};
use crate::utils::DisplayJoinable;

impl ZabbixApi {
    // Host groups

    pub async fn host_group_get_by_id(&self, id: &str) -> Result<HostGroup> {
        self.get_one(
            "hostgroup.get",
            json!({ "output": "extend", "groupids": [id] }),
        )
        .await
    }

    pub async fn host_group_create(&self, group: &HostGroup) -> Result<String> {
        self.call_id("hostgroup.create", "groupids", group).await
    }

    pub async fn host_group_update(&self, group: &HostGroup) -> Result<String> {
        self.call_id("hostgroup.update", "groupids", group).await
    }

    pub async fn host_groups_delete(&self, ids: &[&str]) -> Result<Vec<String>> {
        self.call_ids("hostgroup.delete", "groupids", ids).await
    }

    /// Ids of the host groups with the given names, in the same order
    pub async fn host_group_ids(&self, names: &[&str]) -> Result<Vec<GroupId>> {
        self.group_ids("hostgroup.get", "Host groups", names).await
    }

    /// Ids of the groups templates belong to: template groups since 6.2,
    /// host groups before
    pub async fn template_group_ids(&self, names: &[&str]) -> Result<Vec<GroupId>> {
        if self.version() < ApiVersion::V6_2 {
            return self.host_group_ids(names).await;
        }
        self.group_ids("templategroup.get", "Template groups", names).await
    }

    async fn group_ids(
        &self,
        method: &str,
        kind: &'static str,
        names: &[&str],
    ) -> Result<Vec<GroupId>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let groups: Vec<HostGroup> = self
            .call(
                method,
                json!({
                    "output": ["groupid", "name"],
                    "filter": { "name": names },
                }),
            )
            .await?;
        let ids = groups
            .into_iter()
            .map(|group| (group.name, group.groupid))
            .collect();

        resolve_names(kind, names, ids).map(|ids| {
            ids.into_iter()
                .map(|groupid| GroupId {
                    groupid,
                    name: String::new(),
                })
                .collect()
        })
    }

    // Hosts

    pub async fn host_get_by_id(&self, id: &str) -> Result<Host> {
        self.get_one(
            "host.get",
            json!({
                "output": "extend",
                "hostids": [id],
                "selectGroups": ["groupid", "name"],
                "selectParentTemplates": ["templateid", "host"],
                "selectInterfaces": "extend",
                "selectMacros": "extend",
                "selectTags": "extend",
            }),
        )
        .await
    }

    pub async fn host_create(&self, host: &Host) -> Result<String> {
        self.call_id("host.create", "hostids", host).await
    }

    pub async fn host_update(&self, host: &Host) -> Result<String> {
        self.call_id("host.update", "hostids", host).await
    }

    pub async fn hosts_delete(&self, ids: &[&str]) -> Result<Vec<String>> {
        self.call_ids("host.delete", "hostids", ids).await
    }

    // Templates

    pub async fn templates_get(&self, params: Value) -> Result<Vec<Template>> {
        self.call("template.get", params).await
    }

    pub async fn template_get_by_id(&self, id: &str) -> Result<Template> {
        let select_groups = if self.version() >= ApiVersion::V6_2 {
            "selectTemplateGroups"
        } else {
            "selectGroups"
        };
        self.get_one(
            "template.get",
            json!({
                "output": "extend",
                "templateids": [id],
                select_groups: ["groupid", "name"],
                "selectMacros": "extend",
                "selectTags": "extend",
            }),
        )
        .await
    }

    pub async fn template_create(&self, template: &Template) -> Result<String> {
        self.call_id("template.create", "templateids", template).await
    }

    pub async fn template_update(&self, template: &Template) -> Result<String> {
        self.call_id("template.update", "templateids", template).await
    }

    pub async fn templates_delete(&self, ids: &[&str]) -> Result<Vec<String>> {
        self.call_ids("template.delete", "templateids", ids).await
    }

    /// Ids of the templates with the given technical names, in the same order
    pub async fn template_ids(&self, names: &[&str]) -> Result<Vec<TemplateId>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let templates = self
            .templates_get(json!({
                "output": ["templateid", "host"],
                "filter": { "host": names },
            }))
            .await?;
        let ids = templates
            .into_iter()
            .map(|template| (template.host, template.templateid))
            .collect();

        resolve_names("Templates", names, ids)
            .map(|ids| ids.into_iter().map(|templateid| TemplateId { templateid }).collect())
    }

    /// Number of objects a deletion must remove: the object itself, plus the
    /// copies inherited by templates linked to its parent and their hosts
    pub async fn inherited_count(&self, parent_id: &str) -> Result<usize> {
        let templates = self
            .templates_get(json!({
                "output": "extend",
                "selectHosts": "extend",
                "parentTemplateids": parent_id,
            }))
            .await?;

        Ok(templates
            .iter()
            .fold(1, |count, template| count + template.hosts.len() + 1))
    }

    // Items

    pub async fn item_get_by_id(&self, id: &str) -> Result<Item> {
        self.get_one(
            "item.get",
            json!({
                "output": "extend",
                "itemids": [id],
                "selectHosts": ["hostid", "host"],
                "selectPreprocessing": "extend",
                "selectTags": "extend",
                "webitems": true,
            }),
        )
        .await
    }

    pub async fn item_create(&self, item: &Item) -> Result<String> {
        self.call_id("item.create", "itemids", item).await
    }

    pub async fn item_update(&self, item: &Item) -> Result<String> {
        self.call_id("item.update", "itemids", item).await
    }

    pub async fn items_delete(&self, ids: &[&str]) -> Result<Vec<String>> {
        self.call_ids("item.delete", "itemids", ids).await
    }

    pub async fn item_parent_id(&self, id: &str) -> Result<String> {
        let item = self.item_get_by_id(id).await?;
        single_parent(id, &item.hosts)
    }

    // Discovery rules

    pub async fn lld_rule_get_by_id(&self, id: &str) -> Result<LldRule> {
        self.get_one(
            "discoveryrule.get",
            json!({
                "output": "extend",
                "itemids": [id],
                "selectHosts": ["hostid", "host"],
                "selectPreprocessing": "extend",
                "selectLLDMacroPaths": "extend",
            }),
        )
        .await
    }

    pub async fn lld_rule_create(&self, rule: &LldRule) -> Result<String> {
        self.call_id("discoveryrule.create", "itemids", rule).await
    }

    pub async fn lld_rule_update(&self, rule: &LldRule) -> Result<String> {
        self.call_id("discoveryrule.update", "itemids", rule).await
    }

    pub async fn lld_rules_delete(&self, ids: &[&str]) -> Result<Vec<String>> {
        self.call_ids("discoveryrule.delete", "ruleids", ids).await
    }

    pub async fn lld_rule_parent_id(&self, id: &str) -> Result<String> {
        let rule = self.lld_rule_get_by_id(id).await?;
        single_parent(id, &rule.hosts)
    }

    // Triggers

    pub async fn triggers_get(&self, params: Value) -> Result<Vec<Trigger>> {
        self.call("trigger.get", params).await
    }

    pub async fn trigger_create(&self, trigger: &Trigger) -> Result<String> {
        self.call_id("trigger.create", "triggerids", trigger).await
    }

    pub async fn trigger_update(&self, trigger: &Trigger) -> Result<String> {
        self.call_id("trigger.update", "triggerids", trigger).await
    }

    pub async fn triggers_delete(&self, ids: &[&str]) -> Result<Vec<String>> {
        self.call_ids("trigger.delete", "triggerids", ids).await
    }

    pub async fn trigger_parent_id(&self, id: &str) -> Result<String> {
        let mut triggers = self
            .triggers_get(json!({
                "output": "extend",
                "selectHosts": ["hostid", "host"],
                "triggerids": [id],
            }))
            .await?;
        if triggers.len() != 1 {
            return Err(ApiError::ExpectedOne(triggers.len()));
        }
        let trigger = triggers.remove(0);
        single_parent(id, &trigger.hosts)
    }

    // Proxies

    pub async fn proxy_get_by_id(&self, id: &str) -> Result<Proxy> {
        self.get_one(
            "proxy.get",
            json!({
                "output": "extend",
                "proxyids": [id],
                "selectInterface": "extend",
            }),
        )
        .await
    }

    pub async fn proxy_create(&self, proxy: &Proxy) -> Result<String> {
        self.call_id("proxy.create", "proxyids", proxy).await
    }

    pub async fn proxy_update(&self, proxy: &Proxy) -> Result<String> {
        self.call_id("proxy.update", "proxyids", proxy).await
    }

    pub async fn proxies_delete(&self, ids: &[&str]) -> Result<Vec<String>> {
        self.call_ids("proxy.delete", "proxyids", ids).await
    }

    // Web scenarios

    pub async fn http_test_get_by_id(&self, id: &str) -> Result<HttpTest> {
        self.get_one(
            "httptest.get",
            json!({
                "output": "extend",
                "httptestids": [id],
                "selectSteps": "extend",
            }),
        )
        .await
    }

    pub async fn http_test_create(&self, test: &HttpTest) -> Result<String> {
        self.call_id("httptest.create", "httptestids", test).await
    }

    pub async fn http_test_update(&self, test: &HttpTest) -> Result<String> {
        self.call_id("httptest.update", "httptestids", test).await
    }

    pub async fn http_tests_delete(&self, ids: &[&str]) -> Result<Vec<String>> {
        self.call_ids("httptest.delete", "httptestids", ids).await
    }
}

/// Map every name to its id, failing with all the names without one
fn resolve_names(
    kind: &'static str,
    names: &[&str],
    mut ids: HashMap<String, String>,
) -> Result<Vec<String>> {
    let missing = names
        .iter()
        .filter(|name| !ids.contains_key(**name))
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        return Err(ApiError::NotFound {
            kind,
            names: missing.into_iter().join_with(", ").to_string(),
        });
    }

    Ok(names
        .iter()
        .filter_map(|name| ids.remove(*name))
        .collect())
}

fn single_parent(id: &str, hosts: &[HostRef]) -> Result<String> {
    match hosts {
        [host] => Ok(host.hostid.clone()),
        _ => Err(ApiError::Parent {
            id: id.to_owned(),
            count: hosts.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_resolve_in_order() {
        let ids = HashMap::from([
            ("Databases".to_owned(), "7".to_owned()),
            ("Linux servers".to_owned(), "2".to_owned()),
        ]);
        let resolved = resolve_names("Host groups", &["Linux servers", "Databases"], ids).unwrap();
        assert_eq!(resolved, vec!["2", "7"]);
    }

    #[test]
    fn missing_names_are_listed() {
        let ids = HashMap::from([("Databases".to_owned(), "7".to_owned())]);
        let err = resolve_names("Templates", &["Template OS Linux", "Databases", "Template App"], ids)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Templates not found: Template OS Linux, Template App"
        );
    }

    #[test]
    fn parent_must_be_unique() {
        let hosts = vec![
            HostRef {
                hostid: "10084".to_owned(),
                host: "server".to_owned(),
            },
            HostRef {
                hostid: "10085".to_owned(),
                host: "other".to_owned(),
            },
        ];
        assert_eq!(single_parent("1", &hosts[..1]).unwrap(), "10084");
        assert!(matches!(
            single_parent("1", &hosts),
            Err(ApiError::Parent { count: 2, .. })
        ));
    }
}
