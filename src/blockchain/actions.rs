// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Typed delegatable blog actions.
//!
//! Each variant carries the strongly-typed arguments of one direct entry
//! point on the blog contract. The same value encodes to the direct call (for
//! owner-signed fallback) and to the `...WithSessionKey` twin.

use std::fmt;

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::{SolCall, SolInterface};

use super::contract::IBlog::{self, IBlogCalls};
use super::error::ChainError;
use super::types::Selector;

/// Overhead of signature recovery and record bookkeeping on delegated calls.
pub const DELEGATION_GAS_OVERHEAD: u64 = 60_000;

/// Article visibility flag recorded on-chain at publish time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Visibility {
    Public = 0,
    Encrypted = 1,
}

/// Discriminant of a [`DelegatedAction`], used in logs and policy tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Publish,
    Evaluate,
    Follow,
    Collect,
    LikeComment,
    EditArticle,
}

impl ActionKind {
    pub const ALL: [ActionKind; 6] = [
        ActionKind::Publish,
        ActionKind::Evaluate,
        ActionKind::Follow,
        ActionKind::Collect,
        ActionKind::LikeComment,
        ActionKind::EditArticle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Publish => "publish",
            ActionKind::Evaluate => "evaluate",
            ActionKind::Follow => "follow",
            ActionKind::Collect => "collect",
            ActionKind::LikeComment => "likeComment",
            ActionKind::EditArticle => "editArticle",
        }
    }

    /// Selector of the direct entry point.
    pub fn selector(&self) -> Selector {
        let raw = match self {
            ActionKind::Publish => IBlog::publishCall::SELECTOR,
            ActionKind::Evaluate => IBlog::evaluateCall::SELECTOR,
            ActionKind::Follow => IBlog::followCall::SELECTOR,
            ActionKind::Collect => IBlog::collectCall::SELECTOR,
            ActionKind::LikeComment => IBlog::likeCommentCall::SELECTOR,
            ActionKind::EditArticle => IBlog::editArticleCall::SELECTOR,
        };
        Selector::from(raw)
    }

    pub fn from_selector(selector: Selector) -> Option<Self> {
        ActionKind::ALL.into_iter().find(|k| k.selector() == selector)
    }

    /// Gas budget of the direct call, before delegation overhead.
    pub fn base_gas(&self) -> u64 {
        match self {
            ActionKind::Publish => 350_000,
            ActionKind::Evaluate => 250_000,
            ActionKind::Follow => 120_000,
            ActionKind::Collect => 300_000,
            ActionKind::LikeComment => 200_000,
            ActionKind::EditArticle => 200_000,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One delegatable action with its arguments and attached value.
#[derive(Debug, Clone, PartialEq)]
pub enum DelegatedAction {
    Publish(IBlog::publishCall),
    Evaluate { call: IBlog::evaluateCall, tip: U256 },
    Follow(IBlog::followCall),
    Collect { call: IBlog::collectCall, price: U256 },
    LikeComment { call: IBlog::likeCommentCall, tip: U256 },
    EditArticle(IBlog::editArticleCall),
}

/// Delegation arguments wrapped around the inner call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegatedEnvelope {
    pub owner: Address,
    pub session_key: Address,
    pub deadline: U256,
    pub signature: Bytes,
}

impl DelegatedAction {
    pub fn publish(
        arweave_id: impl Into<String>,
        title: impl Into<String>,
        category_id: u64,
        visibility: Visibility,
        royalty_bps: u16,
    ) -> Self {
        DelegatedAction::Publish(IBlog::publishCall {
            arweaveId: arweave_id.into(),
            title: title.into(),
            categoryId: category_id,
            visibility: visibility as u8,
            royaltyBps: royalty_bps,
        })
    }

    pub fn follow(target: Address, is_follow: bool) -> Self {
        DelegatedAction::Follow(IBlog::followCall {
            target,
            isFollow: is_follow,
        })
    }

    pub fn evaluate(
        article_id: U256,
        score: u8,
        content: impl Into<String>,
        referrer: Address,
        parent_comment_id: U256,
        tip: U256,
    ) -> Self {
        DelegatedAction::Evaluate {
            call: IBlog::evaluateCall {
                articleId: article_id,
                score,
                content: content.into(),
                referrer,
                parentCommentId: parent_comment_id,
            },
            tip,
        }
    }

    pub fn collect(article_id: U256, referrer: Address, price: U256) -> Self {
        DelegatedAction::Collect {
            call: IBlog::collectCall {
                articleId: article_id,
                referrer,
            },
            price,
        }
    }

    pub fn like_comment(
        article_id: U256,
        comment_id: U256,
        commenter: Address,
        referrer: Address,
        tip: U256,
    ) -> Self {
        DelegatedAction::LikeComment {
            call: IBlog::likeCommentCall {
                articleId: article_id,
                commentId: comment_id,
                commenter,
                referrer,
            },
            tip,
        }
    }

    pub fn edit_article(
        article_id: U256,
        original_author: impl Into<String>,
        title: impl Into<String>,
        category_id: u64,
    ) -> Self {
        DelegatedAction::EditArticle(IBlog::editArticleCall {
            articleId: article_id,
            originalAuthor: original_author.into(),
            title: title.into(),
            categoryId: category_id,
        })
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            DelegatedAction::Publish(_) => ActionKind::Publish,
            DelegatedAction::Evaluate { .. } => ActionKind::Evaluate,
            DelegatedAction::Follow(_) => ActionKind::Follow,
            DelegatedAction::Collect { .. } => ActionKind::Collect,
            DelegatedAction::LikeComment { .. } => ActionKind::LikeComment,
            DelegatedAction::EditArticle(_) => ActionKind::EditArticle,
        }
    }

    /// Selector the session key must be allowed to call.
    pub fn selector(&self) -> Selector {
        self.kind().selector()
    }

    /// ABI-encoded direct call, selector included.
    pub fn call_data(&self) -> Bytes {
        let encoded = match self {
            DelegatedAction::Publish(call) => call.abi_encode(),
            DelegatedAction::Evaluate { call, .. } => call.abi_encode(),
            DelegatedAction::Follow(call) => call.abi_encode(),
            DelegatedAction::Collect { call, .. } => call.abi_encode(),
            DelegatedAction::LikeComment { call, .. } => call.abi_encode(),
            DelegatedAction::EditArticle(call) => call.abi_encode(),
        };
        Bytes::from(encoded)
    }

    /// Native value sent with the call (tip or price).
    pub fn value(&self) -> U256 {
        match self {
            DelegatedAction::Evaluate { tip, .. } | DelegatedAction::LikeComment { tip, .. } => *tip,
            DelegatedAction::Collect { price, .. } => *price,
            DelegatedAction::Publish(_)
            | DelegatedAction::Follow(_)
            | DelegatedAction::EditArticle(_) => U256::ZERO,
        }
    }

    /// Gas budget of the delegated variant.
    pub fn gas_units(&self) -> u64 {
        self.kind().base_gas() + DELEGATION_GAS_OVERHEAD
    }

    /// Encode the `...WithSessionKey` twin of this action.
    pub fn delegated_call_data(&self, envelope: &DelegatedEnvelope) -> Bytes {
        let DelegatedEnvelope {
            owner,
            session_key,
            deadline,
            signature,
        } = envelope.clone();

        let encoded = match self.clone() {
            DelegatedAction::Publish(c) => IBlog::publishWithSessionKeyCall {
                owner,
                sessionKey: session_key,
                arweaveId: c.arweaveId,
                title: c.title,
                categoryId: c.categoryId,
                visibility: c.visibility,
                royaltyBps: c.royaltyBps,
                deadline,
                signature,
            }
            .abi_encode(),
            DelegatedAction::Evaluate { call: c, .. } => IBlog::evaluateWithSessionKeyCall {
                owner,
                sessionKey: session_key,
                articleId: c.articleId,
                score: c.score,
                content: c.content,
                referrer: c.referrer,
                parentCommentId: c.parentCommentId,
                deadline,
                signature,
            }
            .abi_encode(),
            DelegatedAction::Follow(c) => IBlog::followWithSessionKeyCall {
                owner,
                sessionKey: session_key,
                target: c.target,
                isFollow: c.isFollow,
                deadline,
                signature,
            }
            .abi_encode(),
            DelegatedAction::Collect { call: c, .. } => IBlog::collectWithSessionKeyCall {
                owner,
                sessionKey: session_key,
                articleId: c.articleId,
                referrer: c.referrer,
                deadline,
                signature,
            }
            .abi_encode(),
            DelegatedAction::LikeComment { call: c, .. } => IBlog::likeCommentWithSessionKeyCall {
                owner,
                sessionKey: session_key,
                articleId: c.articleId,
                commentId: c.commentId,
                commenter: c.commenter,
                referrer: c.referrer,
                deadline,
                signature,
            }
            .abi_encode(),
            DelegatedAction::EditArticle(c) => IBlog::editArticleWithSessionKeyCall {
                owner,
                sessionKey: session_key,
                articleId: c.articleId,
                originalAuthor: c.originalAuthor,
                title: c.title,
                categoryId: c.categoryId,
                deadline,
                signature,
            }
            .abi_encode(),
        };
        Bytes::from(encoded)
    }

    /// Decode direct call data sent with `value`.
    pub fn decode(data: &[u8], value: U256) -> Result<Self, ChainError> {
        let call = IBlogCalls::abi_decode(data).map_err(|e| ChainError::Abi(e.to_string()))?;
        let action = match call {
            IBlogCalls::publish(c) => DelegatedAction::Publish(c),
            IBlogCalls::evaluate(c) => DelegatedAction::Evaluate { call: c, tip: value },
            IBlogCalls::follow(c) => DelegatedAction::Follow(c),
            IBlogCalls::collect(c) => DelegatedAction::Collect { call: c, price: value },
            IBlogCalls::likeComment(c) => DelegatedAction::LikeComment { call: c, tip: value },
            IBlogCalls::editArticle(c) => DelegatedAction::EditArticle(c),
            _ => {
                return Err(ChainError::Abi(
                    "call data is a delegated entry point".to_string(),
                ))
            }
        };
        Ok(action)
    }

    /// Decode `...WithSessionKey` call data into its envelope and inner action.
    pub fn decode_delegated(
        data: &[u8],
        value: U256,
    ) -> Result<(DelegatedEnvelope, Self), ChainError> {
        let call = IBlogCalls::abi_decode(data).map_err(|e| ChainError::Abi(e.to_string()))?;
        let envelope = |owner, session_key, deadline, signature| DelegatedEnvelope {
            owner,
            session_key,
            deadline,
            signature,
        };

        let decoded = match call {
            IBlogCalls::publishWithSessionKey(c) => (
                envelope(c.owner, c.sessionKey, c.deadline, c.signature),
                DelegatedAction::Publish(IBlog::publishCall {
                    arweaveId: c.arweaveId,
                    title: c.title,
                    categoryId: c.categoryId,
                    visibility: c.visibility,
                    royaltyBps: c.royaltyBps,
                }),
            ),
            IBlogCalls::evaluateWithSessionKey(c) => (
                envelope(c.owner, c.sessionKey, c.deadline, c.signature),
                DelegatedAction::Evaluate {
                    call: IBlog::evaluateCall {
                        articleId: c.articleId,
                        score: c.score,
                        content: c.content,
                        referrer: c.referrer,
                        parentCommentId: c.parentCommentId,
                    },
                    tip: value,
                },
            ),
            IBlogCalls::followWithSessionKey(c) => (
                envelope(c.owner, c.sessionKey, c.deadline, c.signature),
                DelegatedAction::Follow(IBlog::followCall {
                    target: c.target,
                    isFollow: c.isFollow,
                }),
            ),
            IBlogCalls::collectWithSessionKey(c) => (
                envelope(c.owner, c.sessionKey, c.deadline, c.signature),
                DelegatedAction::Collect {
                    call: IBlog::collectCall {
                        articleId: c.articleId,
                        referrer: c.referrer,
                    },
                    price: value,
                },
            ),
            IBlogCalls::likeCommentWithSessionKey(c) => (
                envelope(c.owner, c.sessionKey, c.deadline, c.signature),
                DelegatedAction::LikeComment {
                    call: IBlog::likeCommentCall {
                        articleId: c.articleId,
                        commentId: c.commentId,
                        commenter: c.commenter,
                        referrer: c.referrer,
                    },
                    tip: value,
                },
            ),
            IBlogCalls::editArticleWithSessionKey(c) => (
                envelope(c.owner, c.sessionKey, c.deadline, c.signature),
                DelegatedAction::EditArticle(IBlog::editArticleCall {
                    articleId: c.articleId,
                    originalAuthor: c.originalAuthor,
                    title: c.title,
                    categoryId: c.categoryId,
                }),
            ),
            _ => return Err(ChainError::Abi("call data is a direct entry point".to_string())),
        };
        Ok(decoded)
    }
}
