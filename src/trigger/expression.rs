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

//! Expansion of the `{functionid}` placeholders of trigger expressions.
//!
//! `trigger.get` returns expressions such as `{13284}>5` where every
//! placeholder references a function on an item. They are expanded back to
//! the syntax accepted by `trigger.create` on the server version in use:
//!
//! * 5.4 and later: `last(/host/key)>5`
//! * before 5.4: `{host:key.last()}>5`

use crate::api::ApiVersion;

/// Function of a trigger, with the item it is evaluated on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFunction<'a> {
    pub functionid: &'a str,
    pub function: &'a str,
    pub parameter: &'a str,
    pub host: &'a str,
    pub key: &'a str,
}

impl<'a> ResolvedFunction<'a> {
    /// Readable form of the function on the given server version
    pub fn expand(&self, version: ApiVersion) -> String {
        if version >= ApiVersion::V5_4 {
            // `$` stands for the item the function is evaluated on
            let item = format!("/{}/{}", self.host, self.key);
            format!("{}({})", self.function, self.parameter.replacen('$', &item, 1))
        } else {
            format!(
                "{{{}:{}.{}({})}}",
                self.host, self.key, self.function, self.parameter
            )
        }
    }
}

/// Replace every placeholder of `expression` by the expanded function
pub fn expand(expression: &str, functions: &[ResolvedFunction<'_>], version: ApiVersion) -> String {
    functions
        .iter()
        .fold(expression.to_owned(), |expression, function| {
            expression.replace(
                &format!("{{{}}}", function.functionid),
                &function.expand(version),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn functions() -> Vec<ResolvedFunction<'static>> {
        vec![
            ResolvedFunction {
                functionid: "13284",
                function: "last",
                parameter: "$",
                host: "web-01",
                key: "system.cpu.load[all,avg1]",
            },
            ResolvedFunction {
                functionid: "13285",
                function: "avg",
                parameter: "$,5m",
                host: "web-01",
                key: "net.if.in[eth0]",
            },
        ]
    }

    #[test]
    fn new_syntax() {
        let version = ApiVersion::new(6, 0, 12);
        assert_eq!(
            expand("{13284}>5 or {13285}>100", &functions(), version),
            "last(/web-01/system.cpu.load[all,avg1])>5 or avg(/web-01/net.if.in[eth0],5m)>100"
        );
    }

    #[test]
    fn old_syntax() {
        let version = ApiVersion::new(5, 0, 30);
        assert_eq!(
            expand("{13284}>5 and {13284}<10", &functions()[..1], version),
            "{web-01:system.cpu.load[all,avg1].last($)}>5 and {web-01:system.cpu.load[all,avg1].last($)}<10"
        );
    }

    #[test]
    fn first_dollar_only() {
        let function = ResolvedFunction {
            functionid: "1",
            function: "count",
            parameter: "$,10m,\"$100\"",
            host: "db",
            key: "log[/var/log/app.log]",
        };
        assert_eq!(
            function.expand(ApiVersion::V5_4),
            "count(/db/log[/var/log/app.log],10m,\"$100\")"
        );
    }

    #[test]
    fn unknown_placeholders_are_kept() {
        let version = ApiVersion::new(6, 4, 0);
        assert_eq!(expand("{99}=0", &functions(), version), "{99}=0");
        assert_eq!(expand("", &functions(), version), "");
    }
}
