// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process collaborators for tests: a simulated chain enforcing the
//! session key manager's rules, a scripted owner wallet, and an in-memory
//! storage network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::{
    dyn_abi::TypedData,
    primitives::{keccak256, Address, Bytes, TxHash, TxKind, U256},
    rpc::types::TransactionRequest,
    signers::{local::PrivateKeySigner, SignerSync},
    sol_types::{Eip712Domain, SolInterface},
};
use async_trait::async_trait;

use crate::blockchain::actions::DelegatedAction;
use crate::blockchain::contract::{DelegatedCall, ISessionKeyManager::ISessionKeyManagerCalls};
use crate::blockchain::error::{ChainError, Revert};
use crate::blockchain::signing::{delegation_domain, recover_signer, typed_data_hash};
use crate::blockchain::types::{FeeEstimate, Selector, SessionKeyRecord, TxReceipt};
use crate::blockchain::{ChainClient, OwnerWallet};
use crate::config::{Environment, FundingPolicy, SessionPolicy};
use crate::crypto::ArticleKeyCache;
use crate::funding::FundingController;
use crate::gateway::{ContentSource, GatewayError};
use crate::publish::Publisher;
use crate::session::{ActionSubmitter, DelegatedSigner, SessionKeyManager};
use crate::storage::MemoryStore;
use crate::uploader::{tag_value, StorageNetwork, StorageNetworkError, Tag, ROOT_TX_TAG};

pub const TEST_CHAIN_ID: u64 = 43113;

pub fn session_manager_address() -> Address {
    Address::repeat_byte(0xA1)
}

pub fn blog_address() -> Address {
    Address::repeat_byte(0xB1)
}

/// Funding policy without backoff delays.
pub fn fast_funding_policy() -> FundingPolicy {
    FundingPolicy {
        balance_retries: 2,
        retry_backoff: Duration::ZERO,
        ..FundingPolicy::default()
    }
}

fn one_ether() -> U256 {
    U256::from(10u64).pow(U256::from(18))
}

// =============================================================================
// Simulated chain
// =============================================================================

/// A blog call that went through.
#[derive(Debug, Clone)]
pub struct ExecutedCall {
    pub sender: Address,
    /// Owner the call acted for.
    pub owner: Address,
    pub action: DelegatedAction,
    pub delegated: bool,
    pub value: U256,
}

struct ChainState {
    timestamp: u64,
    block: u64,
    balances: HashMap<Address, U256>,
    records: HashMap<(Address, Address), SessionKeyRecord>,
    /// Nonces survive revocation so signatures never replay.
    nonces: HashMap<(Address, Address), U256>,
    receipts: HashMap<TxHash, TxReceipt>,
    executed: Vec<ExecutedCall>,
    fee: FeeEstimate,
    fail_next_send: Option<ChainError>,
    fail_next_receipt: bool,
    tx_count: u64,
}

/// Chain that applies transactions synchronously and enforces the session
/// key manager's checks on delegated blog calls.
pub struct MockChain {
    state: Mutex<ChainState>,
    domain: Eip712Domain,
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ChainState {
                timestamp: 1_700_000_000,
                block: 1,
                balances: HashMap::new(),
                records: HashMap::new(),
                nonces: HashMap::new(),
                receipts: HashMap::new(),
                executed: Vec::new(),
                fee: FeeEstimate::eip1559(25_000_000_000, 1_500_000_000),
                fail_next_send: None,
                fail_next_receipt: false,
                tx_count: 0,
            }),
            domain: delegation_domain(TEST_CHAIN_ID, session_manager_address()),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ChainState> {
        self.state.lock().unwrap()
    }

    pub fn set_balance(&self, address: Address, balance: U256) {
        self.state().balances.insert(address, balance);
    }

    pub fn balance_of(&self, address: Address) -> U256 {
        self.state().balances.get(&address).copied().unwrap_or_default()
    }

    pub fn timestamp(&self) -> u64 {
        self.state().timestamp
    }

    pub fn advance(&self, seconds: u64) {
        self.state().timestamp += seconds;
    }

    pub fn record(&self, owner: Address, session_key: Address) -> Option<SessionKeyRecord> {
        self.state().records.get(&(owner, session_key)).cloned()
    }

    /// Change a record behind the client's back.
    pub fn mutate_record(
        &self,
        owner: Address,
        session_key: Address,
        f: impl FnOnce(&mut SessionKeyRecord),
    ) {
        let mut state = self.state();
        if let Some(record) = state.records.get_mut(&(owner, session_key)) {
            f(record);
            let nonce = record.nonce;
            state.nonces.insert((owner, session_key), nonce);
        }
    }

    pub fn executed(&self) -> Vec<ExecutedCall> {
        self.state().executed.clone()
    }

    /// The next send fails before broadcast with `err`.
    pub fn fail_next_send(&self, err: ChainError) {
        self.state().fail_next_send = Some(err);
    }

    /// The next transaction is mined but reverts.
    pub fn fail_next_receipt(&self) {
        self.state().fail_next_receipt = true;
    }

    /// Validate and apply `tx` sent by `from`. Errors model a failed gas
    /// estimate: nothing is recorded.
    pub fn apply(&self, from: Address, tx: TransactionRequest) -> Result<TxHash, ChainError> {
        let mut state = self.state();

        if let Some(err) = state.fail_next_send.take() {
            return Err(err);
        }

        let to = match tx.to {
            Some(TxKind::Call(to)) => to,
            _ => return Err(ChainError::Abi("contract creation not supported".into())),
        };
        let value = tx.value.unwrap_or_default();
        let input = tx.input.input().cloned().unwrap_or_default();

        let balance = state.balances.get(&from).copied().unwrap_or_default();
        if balance < value {
            return Err(ChainError::InsufficientFunds(format!(
                "{from} has {balance}, needs {value}"
            )));
        }

        state.tx_count += 1;
        let tx_hash = keccak256(state.tx_count.to_be_bytes());

        if std::mem::take(&mut state.fail_next_receipt) {
            state.block += 1;
            let receipt = TxReceipt {
                tx_hash,
                block_number: state.block,
                gas_used: 21_000,
                success: false,
            };
            state.receipts.insert(tx_hash, receipt);
            return Ok(tx_hash);
        }

        if to == session_manager_address() {
            apply_manager_call(&mut state, from, &input)?;
        } else if to == blog_address() {
            let call = self.apply_blog_call(&mut state, from, &input, value)?;
            state.executed.push(call);
        } else if !input.is_empty() {
            return Err(ChainError::Reverted(Revert::Other("no code at target".into())));
        }

        if !value.is_zero() {
            *state.balances.entry(from).or_default() -= value;
            *state.balances.entry(to).or_default() += value;
        }

        state.block += 1;
        let receipt = TxReceipt {
            tx_hash,
            block_number: state.block,
            gas_used: 100_000,
            success: true,
        };
        state.receipts.insert(tx_hash, receipt);
        Ok(tx_hash)
    }

    fn apply_blog_call(
        &self,
        state: &mut ChainState,
        from: Address,
        input: &Bytes,
        value: U256,
    ) -> Result<ExecutedCall, ChainError> {
        if let Ok(action) = DelegatedAction::decode(input, value) {
            return Ok(ExecutedCall {
                sender: from,
                owner: from,
                action,
                delegated: false,
                value,
            });
        }

        let (envelope, action) = DelegatedAction::decode_delegated(input, value)?;
        let now = state.timestamp;
        let revert = |r: Revert| -> Result<ExecutedCall, ChainError> {
            Err(ChainError::Reverted(r))
        };

        let slot = (envelope.owner, envelope.session_key);
        let Some(record) = state.records.get(&slot).cloned() else {
            return revert(Revert::SessionKeyNotFound);
        };
        if envelope.deadline < U256::from(now) {
            return revert(Revert::SignatureExpired {
                deadline: envelope.deadline,
            });
        }
        if record.allowed_target != blog_address() {
            return revert(Revert::TargetNotAllowed(blog_address()));
        }
        if !record.is_time_valid(now) {
            return revert(Revert::SessionKeyExpired);
        }
        let selector: Selector = action.selector();
        if !record.allows_selector(selector) {
            return revert(Revert::SelectorNotAllowed(selector.0));
        }
        let remaining = record.remaining_allowance();
        if value > remaining {
            return revert(Revert::SpendingLimitExceeded {
                requested: value,
                remaining,
            });
        }

        let call = DelegatedCall {
            owner: envelope.owner,
            sessionKey: envelope.session_key,
            target: blog_address(),
            selector,
            callData: action.call_data(),
            value,
            nonce: record.nonce,
            deadline: envelope.deadline,
        };
        let hash = typed_data_hash(&self.domain, &call);
        // A stale nonce yields a different digest and thus a different signer.
        match recover_signer(&hash, &envelope.signature) {
            Ok(signer) if signer == envelope.session_key => {}
            _ => return revert(Revert::InvalidSignature),
        }

        let nonce = record.nonce + U256::from(1);
        if let Some(stored) = state.records.get_mut(&slot) {
            stored.nonce = nonce;
            stored.spent_amount += value;
        }
        state.nonces.insert(slot, nonce);

        Ok(ExecutedCall {
            sender: from,
            owner: envelope.owner,
            action,
            delegated: true,
            value,
        })
    }
}

fn apply_manager_call(state: &mut ChainState, owner: Address, input: &Bytes) -> Result<(), ChainError> {
    let call = ISessionKeyManagerCalls::abi_decode(input).map_err(|e| ChainError::Abi(e.to_string()))?;
    match call {
        ISessionKeyManagerCalls::registerSessionKey(c) => {
            let slot = (owner, c.sessionKey);
            if state
                .records
                .get(&slot)
                .is_some_and(|r| r.is_time_valid(state.timestamp))
            {
                return Err(ChainError::Reverted(Revert::SessionKeyStillActive));
            }
            let nonce = state.nonces.get(&slot).copied().unwrap_or_default();
            state.records.insert(
                slot,
                SessionKeyRecord {
                    session_key: c.sessionKey,
                    valid_after: c.validAfter,
                    valid_until: c.validUntil,
                    allowed_target: c.allowedTarget,
                    allowed_selectors: c.allowedSelectors,
                    spending_limit: c.spendingLimit,
                    spent_amount: U256::ZERO,
                    nonce,
                },
            );
            Ok(())
        }
        ISessionKeyManagerCalls::revokeSessionKey(c) => {
            match state.records.remove(&(owner, c.sessionKey)) {
                Some(_) => Ok(()),
                None => Err(ChainError::Reverted(Revert::SessionKeyNotFound)),
            }
        }
        ISessionKeyManagerCalls::getSessionKeyData(_) => Ok(()),
    }
}

#[async_trait]
impl ChainClient for MockChain {
    fn chain_id(&self) -> u64 {
        TEST_CHAIN_ID
    }

    async fn block_timestamp(&self) -> Result<u64, ChainError> {
        Ok(self.timestamp())
    }

    async fn balance(&self, address: Address) -> Result<U256, ChainError> {
        Ok(self.balance_of(address))
    }

    async fn fee_estimate(&self) -> Result<FeeEstimate, ChainError> {
        Ok(self.state().fee)
    }

    async fn session_key_record(
        &self,
        owner: Address,
        session_key: Address,
    ) -> Result<Option<SessionKeyRecord>, ChainError> {
        Ok(self.record(owner, session_key))
    }

    async fn send_as(
        &self,
        signer: &PrivateKeySigner,
        tx: TransactionRequest,
    ) -> Result<TxHash, ChainError> {
        self.apply(signer.address(), tx)
    }

    async fn wait_for_receipt(&self, hash: TxHash) -> Result<TxReceipt, ChainError> {
        match self.state().receipts.get(&hash) {
            Some(receipt) if receipt.success => Ok(receipt.clone()),
            Some(_) => Err(ChainError::TransactionFailed(hash)),
            None => Err(ChainError::ReceiptTimeout(hash)),
        }
    }
}

// =============================================================================
// Scripted owner wallet
// =============================================================================

/// Owner wallet with a fixed key. Counts prompts and can reject them.
pub struct MockWallet {
    signer: PrivateKeySigner,
    chain: Option<Arc<MockChain>>,
    chain_id: AtomicU64,
    reject: AtomicBool,
    sign_prompts: AtomicUsize,
    transactions: AtomicUsize,
}

impl Default for MockWallet {
    fn default() -> Self {
        Self::new()
    }
}

impl MockWallet {
    pub fn new() -> Self {
        let signer = PrivateKeySigner::from_slice(&[0x42; 32]).unwrap();
        Self {
            signer,
            chain: None,
            chain_id: AtomicU64::new(TEST_CHAIN_ID),
            reject: AtomicBool::new(false),
            sign_prompts: AtomicUsize::new(0),
            transactions: AtomicUsize::new(0),
        }
    }

    /// Wallet whose transactions land on `chain`.
    pub fn with_chain(chain: Arc<MockChain>) -> Self {
        Self {
            chain: Some(chain),
            ..Self::new()
        }
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Point the wallet at another network.
    pub fn switch_chain(&self, chain_id: u64) {
        self.chain_id.store(chain_id, Ordering::SeqCst);
    }

    pub fn reject_prompts(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }

    /// Accepted message signatures.
    pub fn sign_prompts(&self) -> usize {
        self.sign_prompts.load(Ordering::SeqCst)
    }

    /// Accepted transactions.
    pub fn transactions(&self) -> usize {
        self.transactions.load(Ordering::SeqCst)
    }

    fn rejected(&self) -> bool {
        self.reject.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OwnerWallet for MockWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, ChainError> {
        Ok(vec![self.address()])
    }

    async fn chain_id(&self) -> Result<u64, ChainError> {
        Ok(self.chain_id.load(Ordering::SeqCst))
    }

    async fn sign_message(&self, message: &str) -> Result<Bytes, ChainError> {
        if self.rejected() {
            return Err(ChainError::UserRejected);
        }
        let signature = self
            .signer
            .sign_message_sync(message.as_bytes())
            .map_err(|e| ChainError::InvalidSignature(e.to_string()))?;
        self.sign_prompts.fetch_add(1, Ordering::SeqCst);
        Ok(Bytes::copy_from_slice(&signature.as_bytes()))
    }

    async fn sign_typed_data(&self, typed_data: &TypedData) -> Result<Bytes, ChainError> {
        if self.rejected() {
            return Err(ChainError::UserRejected);
        }
        let signature = self
            .signer
            .sign_dynamic_typed_data_sync(typed_data)
            .map_err(|e| ChainError::InvalidSignature(e.to_string()))?;
        self.sign_prompts.fetch_add(1, Ordering::SeqCst);
        Ok(Bytes::copy_from_slice(&signature.as_bytes()))
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash, ChainError> {
        if self.rejected() {
            return Err(ChainError::UserRejected);
        }
        let hash = match &self.chain {
            Some(chain) => chain.apply(self.address(), tx)?,
            None => keccak256(format!("{tx:?}").as_bytes()),
        };
        self.transactions.fetch_add(1, Ordering::SeqCst);
        Ok(hash)
    }
}

// =============================================================================
// In-memory storage network
// =============================================================================

#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub id: String,
    pub data: Vec<u8>,
    pub tags: Vec<Tag>,
}

#[derive(Default)]
struct NetworkState {
    uploads: Vec<StoredUpload>,
    price_per_byte: U256,
    balance: U256,
    price_calls: usize,
    fund_calls: usize,
}

/// Storage network and gateway in one. Newer uploads win on `Root-TX`
/// lookups.
#[derive(Default)]
pub struct MemoryNetwork {
    state: Mutex<NetworkState>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, NetworkState> {
        self.state.lock().unwrap()
    }

    pub fn set_price_per_byte(&self, price: U256) {
        self.state().price_per_byte = price;
    }

    pub fn price_calls(&self) -> usize {
        self.state().price_calls
    }

    pub fn fund_calls(&self) -> usize {
        self.state().fund_calls
    }

    pub fn prepaid_balance(&self) -> U256 {
        self.state().balance
    }

    pub fn upload_count(&self) -> usize {
        self.state().uploads.len()
    }

    pub fn data(&self, id: &str) -> Option<Vec<u8>> {
        self.find(id).map(|u| u.data)
    }

    pub fn tags(&self, id: &str) -> Option<Vec<Tag>> {
        self.find(id).map(|u| u.tags)
    }

    fn find(&self, id: &str) -> Option<StoredUpload> {
        self.state().uploads.iter().find(|u| u.id == id).cloned()
    }
}

#[async_trait]
impl StorageNetwork for MemoryNetwork {
    async fn upload(&self, data: Vec<u8>, tags: Vec<Tag>) -> Result<String, StorageNetworkError> {
        let mut state = self.state();
        let id = format!("tx-{:04}", state.uploads.len() + 1);
        state.uploads.push(StoredUpload {
            id: id.clone(),
            data,
            tags,
        });
        Ok(id)
    }

    async fn price(&self, bytes: u64) -> Result<U256, StorageNetworkError> {
        let mut state = self.state();
        state.price_calls += 1;
        Ok(state.price_per_byte * U256::from(bytes))
    }

    async fn balance(&self) -> Result<U256, StorageNetworkError> {
        Ok(self.state().balance)
    }

    async fn fund(&self, amount: U256) -> Result<String, StorageNetworkError> {
        let mut state = self.state();
        state.fund_calls += 1;
        state.balance += amount;
        Ok(format!("deposit-{}", state.fund_calls))
    }
}

#[async_trait]
impl ContentSource for MemoryNetwork {
    async fn fetch(&self, id: &str) -> Result<Vec<u8>, GatewayError> {
        self.data(id).ok_or_else(|| GatewayError::Status {
            gateway: "memory".to_string(),
            status: 404,
        })
    }

    async fn latest_manifest_id(&self, root_id: &str) -> Result<Option<String>, GatewayError> {
        Ok(self
            .state()
            .uploads
            .iter()
            .rev()
            .find(|u| tag_value(&u.tags, ROOT_TX_TAG) == Some(root_id))
            .map(|u| u.id.clone()))
    }
}

// =============================================================================
// Wired-up harness
// =============================================================================

/// Every collaborator wired together against the simulated chain.
pub struct Harness {
    pub chain: Arc<MockChain>,
    pub wallet: Arc<MockWallet>,
    pub storage: Arc<MemoryNetwork>,
    pub store: Arc<MemoryStore>,
    pub funding: Arc<FundingController>,
    pub keys: Arc<ArticleKeyCache>,
    pub manager: Arc<SessionKeyManager>,
    pub session_manager: Address,
    pub blog: Address,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    pub fn new() -> Self {
        let chain = Arc::new(MockChain::new());
        let wallet = Arc::new(MockWallet::with_chain(chain.clone()));
        chain.set_balance(wallet.address(), one_ether() * U256::from(100));

        let storage = Arc::new(MemoryNetwork::new());
        let store = Arc::new(MemoryStore::new());
        let funding = Arc::new(FundingController::new(
            chain.clone(),
            wallet.clone(),
            storage.clone(),
            fast_funding_policy(),
        ));
        let keys = Arc::new(ArticleKeyCache::new(store.clone(), wallet.clone()));

        let manager = Arc::new(SessionKeyManager::new(
            Environment::Testnet,
            session_manager_address(),
            blog_address(),
            SessionPolicy::default(),
            chain.clone(),
            wallet.clone(),
            store.clone(),
            funding.clone(),
        ));

        Self {
            chain,
            wallet,
            storage,
            store,
            funding,
            keys,
            manager,
            session_manager: session_manager_address(),
            blog: blog_address(),
        }
    }

    pub fn manager_with_selectors(&self, selectors: Vec<Selector>) -> SessionKeyManager {
        SessionKeyManager::new(
            Environment::Testnet,
            self.session_manager,
            self.blog,
            SessionPolicy::default(),
            self.chain.clone(),
            self.wallet.clone(),
            self.store.clone(),
            self.funding.clone(),
        )
        .with_selectors(selectors)
    }

    pub fn submitter(&self) -> ActionSubmitter {
        self.submitter_for(self.manager.clone())
    }

    pub fn submitter_with_selectors(&self, selectors: Vec<Selector>) -> ActionSubmitter {
        self.submitter_for(Arc::new(self.manager_with_selectors(selectors)))
    }

    fn submitter_for(&self, manager: Arc<SessionKeyManager>) -> ActionSubmitter {
        let signer = DelegatedSigner::new(
            self.chain.clone(),
            self.session_manager,
            self.blog,
            SessionPolicy::default().deadline_horizon,
        );
        ActionSubmitter::new(manager, signer, self.chain.clone(), self.wallet.clone())
    }

    pub fn publisher(&self) -> Publisher {
        Publisher::new(
            Environment::Testnet,
            self.storage.clone(),
            self.storage.clone(),
            self.funding.clone(),
            self.keys.clone(),
            self.store.clone(),
            Arc::new(self.submitter()),
        )
    }
}
