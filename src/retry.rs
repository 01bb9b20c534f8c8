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

//! Retry of API calls failing on transient database errors.
//!
//! Zabbix reports concurrent writes on the same host (e.g. many items
//! created in parallel by Terraform) as failed SQL statements. Those calls
//! succeed when sent again a bit later.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use tracing::{debug, warn};

use crate::api::{ApiError, ZabbixApi};

/// Outcome of a failed attempt
#[derive(Debug)]
pub enum RetryError<E> {
    Retryable(E),
    NonRetryable(E),
}

impl RetryError<ApiError> {
    /// SQL execution failures are retryable, everything else is final
    pub fn classify(err: ApiError) -> Self {
        if err.is_sql_error() {
            RetryError::Retryable(err)
        } else {
            RetryError::NonRetryable(err)
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Give up once this much time has passed since the first attempt
    pub timeout: Duration,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delays doubling from `initial_delay` up to `max_delay`, without jitter
    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_delay)
            .with_multiplier(2.0)
            .with_max_interval(self.max_delay)
            .with_max_elapsed_time(Some(self.timeout))
            .with_randomization_factor(0.0)
            .build()
    }
}

/// Run `operation` until it succeeds, fails with a non retryable error, or
/// the policy timeout expires. The last error is returned on failure.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RetryError<E>>>,
    E: Display,
{
    let mut backoff = policy.backoff();
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => return Ok(result),
            Err(RetryError::NonRetryable(err)) => return Err(err),
            Err(RetryError::Retryable(err)) => match backoff.next_backoff() {
                Some(delay) => {
                    warn!(
                        "Operation failed (attempt {}): {}. Retrying in {:?}",
                        attempt, err, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                None => return Err(err),
            },
        }
    }
}

/// Send a create or update call, retrying on SQL errors.
/// Returns the id of the affected object.
pub async fn create_retry<F, Fut>(policy: &RetryPolicy, create: F) -> Result<String, ApiError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<String, ApiError>>,
{
    let create = &create;
    retry(policy, move || async move {
        create().await.map_err(RetryError::classify)
    })
    .await
}

/// Delete an object that may be inherited by linked templates and hosts.
///
/// The deletion is checked to have removed the object and all its inherited
/// copies. SQL errors on any step trigger a new attempt.
pub async fn delete_retry<G, GFut, D, DFut>(
    policy: &RetryPolicy,
    api: &ZabbixApi,
    id: &str,
    get_parent: G,
    delete: D,
) -> Result<(), ApiError>
where
    G: Fn() -> GFut,
    GFut: Future<Output = Result<String, ApiError>>,
    D: Fn() -> DFut,
    DFut: Future<Output = Result<Vec<String>, ApiError>>,
{
    let get_parent = &get_parent;
    let delete = &delete;
    retry(policy, move || async move {
        let parent_id = get_parent().await.map_err(RetryError::classify)?;
        let expected = api
            .inherited_count(&parent_id)
            .await
            .map_err(RetryError::classify)?;

        match delete().await {
            Ok(deleted) if deleted.len() == expected => Ok(()),
            Ok(deleted) => Err(RetryError::NonRetryable(ApiError::DeleteCount {
                expected,
                deleted: deleted.len(),
            })),
            Err(err) => {
                debug!("Deletion failed. Got error {}, with id {}", err, id);
                Err(RetryError::classify(err))
            }
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            timeout: Duration::from_secs(5),
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        }
    }

    fn sql_error() -> ApiError {
        ApiError::Rpc {
            code: -32500,
            message: "Application error.".to_owned(),
            data: "SQL statement execution has failed".to_owned(),
        }
    }

    #[test]
    fn delays_double_up_to_the_cap() {
        let policy = RetryPolicy::default();
        let mut backoff = policy.backoff();
        let delays = (0..7)
            .map(|_| backoff.next_backoff().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(
            delays,
            [500, 1000, 2000, 4000, 8000, 10000, 10000].map(Duration::from_millis)
        );
    }

    #[tokio::test]
    async fn retries_sql_errors_until_success() {
        let attempts = AtomicUsize::new(0);
        let attempts = &attempts;
        let id = create_retry(&fast_policy(), move || async move {
            if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(sql_error())
            } else {
                Ok("10084".to_owned())
            }
        })
        .await
        .unwrap();

        assert_eq!(id, "10084");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_on_other_errors() {
        let attempts = AtomicUsize::new(0);
        let attempts = &attempts;
        let err = create_retry(&fast_policy(), move || async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(ApiError::ExpectedOne(0))
        })
        .await
        .unwrap_err();

        assert!(matches!(err, ApiError::ExpectedOne(0)));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_timeout() {
        let policy = RetryPolicy {
            timeout: Duration::from_millis(20),
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(5),
        };
        let attempts = AtomicUsize::new(0);
        let attempts = &attempts;
        let err = retry(&policy, move || async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(RetryError::Retryable(sql_error()))
        })
        .await
        .unwrap_err();

        assert!(err.is_sql_error());
        let attempts = attempts.load(Ordering::SeqCst);
        assert!((2..=6).contains(&attempts), "{attempts} attempts");
    }
}
