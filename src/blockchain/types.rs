// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain types and constants.

use alloy::primitives::{Address, FixedBytes, TxHash, U256};
use serde::{Deserialize, Serialize};

use super::contract::ISessionKeyManager::SessionKeyData;
use super::error::ChainError;

/// Native token decimals on every supported network.
pub const NATIVE_DECIMALS: u8 = 18;

/// Avalanche network configuration.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Network name for display
    pub name: &'static str,
    /// Chain ID
    pub chain_id: u64,
    /// RPC endpoint URL
    pub rpc_url: &'static str,
    /// Block explorer URL
    pub explorer_url: &'static str,
}

impl NetworkConfig {
    /// Explorer link for a transaction.
    pub fn tx_url(&self, hash: &TxHash) -> String {
        format!("{}/tx/{hash}", self.explorer_url)
    }
}

/// Avalanche C-Chain Mainnet configuration.
pub const AVAX_MAINNET: NetworkConfig = NetworkConfig {
    name: "Avalanche C-Chain",
    chain_id: 43114,
    rpc_url: "https://api.avax.network/ext/bc/C/rpc",
    explorer_url: "https://snowtrace.io",
};

/// Avalanche Fuji Testnet configuration.
pub const AVAX_FUJI: NetworkConfig = NetworkConfig {
    name: "Avalanche Fuji Testnet",
    chain_id: 43113,
    rpc_url: "https://api.avax-test.network/ext/bc/C/rpc",
    explorer_url: "https://testnet.snowtrace.io",
};

/// A four-byte method selector.
pub type Selector = FixedBytes<4>;

/// Mirror of the authorization contract's per-key record.
///
/// Read-only from this crate. A registered key always has a non-zero
/// `session_key` field; the contract returns a zeroed struct for unknown
/// keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKeyRecord {
    pub session_key: Address,
    pub valid_after: u64,
    pub valid_until: u64,
    pub allowed_target: Address,
    pub allowed_selectors: Vec<Selector>,
    pub spending_limit: U256,
    pub spent_amount: U256,
    pub nonce: U256,
}

impl SessionKeyRecord {
    pub fn is_registered(&self) -> bool {
        !self.session_key.is_zero()
    }

    pub fn allows_selector(&self, selector: Selector) -> bool {
        self.allowed_selectors.contains(&selector)
    }

    /// `now` falls inside `[valid_after, valid_until]`.
    pub fn is_time_valid(&self, now: u64) -> bool {
        self.valid_after <= now && now <= self.valid_until
    }

    /// Value the key may still move before hitting its limit.
    pub fn remaining_allowance(&self) -> U256 {
        self.spending_limit.saturating_sub(self.spent_amount)
    }
}

impl From<SessionKeyData> for SessionKeyRecord {
    fn from(data: SessionKeyData) -> Self {
        Self {
            session_key: data.sessionKey,
            valid_after: data.validAfter,
            valid_until: data.validUntil,
            allowed_target: data.allowedTarget,
            allowed_selectors: data.allowedSelectors,
            spending_limit: data.spendingLimit,
            spent_amount: data.spentAmount,
            nonce: data.nonce,
        }
    }
}

/// Pricing mode reported by the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeeKind {
    Eip1559,
    Legacy,
}

/// Current per-gas price the funding loop sizes balances against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeEstimate {
    /// Max fee per gas (EIP-1559) or gas price (legacy)
    pub max_fee_per_gas: u128,
    /// Priority fee; absent for legacy pricing
    pub max_priority_fee_per_gas: Option<u128>,
    pub kind: FeeKind,
}

impl FeeEstimate {
    pub fn legacy(gas_price: u128) -> Self {
        Self {
            max_fee_per_gas: gas_price,
            max_priority_fee_per_gas: None,
            kind: FeeKind::Legacy,
        }
    }

    pub fn eip1559(max_fee_per_gas: u128, max_priority_fee_per_gas: u128) -> Self {
        Self {
            max_fee_per_gas,
            max_priority_fee_per_gas: Some(max_priority_fee_per_gas),
            kind: FeeKind::Eip1559,
        }
    }

    /// Upper bound of the fee paid for `gas_units`.
    pub fn cost(&self, gas_units: u64) -> U256 {
        U256::from(gas_units) * U256::from(self.max_fee_per_gas)
    }
}

/// Transaction receipt after confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    /// Block number where transaction was included
    pub block_number: u64,
    /// Gas actually used
    pub gas_used: u64,
    /// Whether the transaction was successful
    pub success: bool,
}

/// Format a balance with the specified number of decimals.
pub fn format_balance(balance: U256, decimals: u8) -> String {
    if balance.is_zero() {
        return "0".to_string();
    }

    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let whole = balance / divisor;
    let remainder = balance % divisor;

    if remainder.is_zero() {
        return whole.to_string();
    }

    // Up to 6 decimal places
    let decimal_str = format!("{:0>width$}", remainder, width = decimals as usize);
    let trimmed = decimal_str.trim_end_matches('0');
    format!("{}.{}", whole, &trimmed[..trimmed.len().min(6)])
}

/// Parse a human-readable amount ("1.5") into base units.
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256, ChainError> {
    let (whole, fraction) = match amount.trim().split_once('.') {
        Some((w, f)) => (w, f),
        None => (amount.trim(), ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(ChainError::InvalidAmount("empty amount".to_string()));
    }
    if fraction.len() > decimals as usize {
        return Err(ChainError::InvalidAmount(format!(
            "too many decimal places (max {decimals})"
        )));
    }

    let parse = |digits: &str| -> Result<U256, ChainError> {
        if digits.is_empty() {
            return Ok(U256::ZERO);
        }
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ChainError::InvalidAmount(format!("`{amount}` is not a number")));
        }
        U256::from_str_radix(digits, 10).map_err(|e| ChainError::InvalidAmount(e.to_string()))
    };

    let padded = format!("{:0<width$}", fraction, width = decimals as usize);
    let multiplier = U256::from(10u64).pow(U256::from(decimals));

    let whole = parse(whole)?;
    let fraction = parse(&padded)?;

    whole
        .checked_mul(multiplier)
        .and_then(|w| w.checked_add(fraction))
        .ok_or_else(|| ChainError::InvalidAmount("amount overflow".to_string()))
}
