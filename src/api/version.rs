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

use std::{fmt::Display, str::FromStr};

use super::ApiError;

/// Zabbix server version as reported by `apiinfo.version`
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ApiVersion {
    /// New expression syntax (`func(/host/key)`) and `username` login field
    pub const V5_4: ApiVersion = ApiVersion::new(5, 4, 0);
    /// Templates put in template groups instead of host groups
    pub const V6_2: ApiVersion = ApiVersion::new(6, 2, 0);
    /// Auth token sent as a bearer header
    pub const V6_4: ApiVersion = ApiVersion::new(6, 4, 0);

    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl FromStr for ApiVersion {
    type Err = ApiError;

    /// Accepts `6.0.21`, `5.4` and pre-release suffixes like `7.0.0rc1`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().splitn(3, '.').map(|part| {
            let digits = part
                .find(|c: char| !c.is_ascii_digit())
                .map_or(part, |end| &part[..end]);
            digits.parse::<u32>()
        });

        let invalid = || ApiError::Version(s.to_owned());
        let major = parts.next().ok_or_else(invalid)?.map_err(|_| invalid())?;
        let minor = match parts.next() {
            Some(minor) => minor.map_err(|_| invalid())?,
            None => 0,
        };
        let patch = match parts.next() {
            Some(patch) => patch.unwrap_or(0),
            None => 0,
        };

        Ok(Self::new(major, minor, patch))
    }
}

impl Display for ApiVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_versions() {
        assert_eq!("6.0.21".parse::<ApiVersion>().unwrap(), ApiVersion::new(6, 0, 21));
        assert_eq!("5.4".parse::<ApiVersion>().unwrap(), ApiVersion::new(5, 4, 0));
        assert_eq!("7.0.0rc1".parse::<ApiVersion>().unwrap(), ApiVersion::new(7, 0, 0));
        assert!("".parse::<ApiVersion>().is_err());
        assert!("latest".parse::<ApiVersion>().is_err());
    }

    #[test]
    fn ordering() {
        assert!(ApiVersion::new(5, 4, 0) >= ApiVersion::V5_4);
        assert!(ApiVersion::new(5, 2, 7) < ApiVersion::V5_4);
        assert!(ApiVersion::new(6, 0, 0) > ApiVersion::V5_4);
        assert!(ApiVersion::new(6, 0, 0) < ApiVersion::V6_2);
        assert!(ApiVersion::new(6, 2, 0) < ApiVersion::V6_4);
        assert_eq!(ApiVersion::new(6, 4, 2).to_string(), "6.4.2");
    }
}
