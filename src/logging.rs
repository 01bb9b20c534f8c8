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

//! Logging setup for the plugin process.
//!
//! Stdout carries the plugin handshake, so every event goes to stderr where
//! Terraform collects it into its own log. `RUST_LOG` takes precedence,
//! otherwise the level follows `TF_LOG`.

use std::env;

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Map a `TF_LOG` value onto a tracing level
pub fn level_from_tf_log(tf_log: &str) -> Level {
    match tf_log.to_uppercase().as_str() {
        "TRACE" | "JSON" => Level::TRACE,
        "DEBUG" => Level::DEBUG,
        "INFO" => Level::INFO,
        "ERROR" => Level::ERROR,
        _ => Level::WARN,
    }
}

pub fn init() {
    let level = env::var("TF_LOG")
        .map(|tf_log| level_from_tf_log(&tf_log))
        .unwrap_or(Level::WARN);

    let filter = match env::var("RUST_LOG") {
        Ok(rust_log) => EnvFilter::new(rust_log),
        // Transport crates stay quiet unless asked through RUST_LOG
        Err(_) => EnvFilter::new(format!("{level},hyper=warn,h2=warn,tonic=warn")),
    };

    let fmt_layer = fmt::layer()
        .compact()
        .with_ansi(false)
        .with_writer(std::io::stderr);

    // A second init (e.g. from tests) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tf_log_levels() {
        assert_eq!(level_from_tf_log("debug"), Level::DEBUG);
        assert_eq!(level_from_tf_log("TRACE"), Level::TRACE);
        assert_eq!(level_from_tf_log("JSON"), Level::TRACE);
        assert_eq!(level_from_tf_log("off"), Level::WARN);
    }
}
