// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ordered gateway fallback.

use std::future::Future;

use url::Url;

use super::GatewayError;

/// Run `op` against each gateway in order and return the first success.
///
/// Each gateway is attempted at most once. When every attempt fails the
/// last error is returned inside [`GatewayError::AllFailed`].
pub async fn with_fallback<T, F, Fut>(gateways: &[Url], mut op: F) -> Result<T, GatewayError>
where
    F: FnMut(Url) -> Fut,
    Fut: Future<Output = Result<T, GatewayError>>,
{
    let mut last = None;

    for (position, gateway) in gateways.iter().enumerate() {
        match op(gateway.clone()).await {
            Ok(value) => {
                if position > 0 {
                    tracing::info!(gateway = %gateway, position, "Gateway fallback succeeded");
                }
                return Ok(value);
            }
            Err(e) => {
                tracing::warn!(gateway = %gateway, error = %e, "Gateway request failed");
                last = Some(e);
            }
        }
    }

    match last {
        Some(last) => Err(GatewayError::AllFailed {
            attempts: gateways.len(),
            last: Box::new(last),
        }),
        None => Err(GatewayError::NoGateways),
    }
}
