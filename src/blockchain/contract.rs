// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Solidity interfaces of the authorization and blog contracts.
//!
//! Every delegatable entry point `f(args)` on the blog contract has a twin
//! `fWithSessionKey(owner, sessionKey, args, deadline, signature)`. The
//! session key manager holds the authorization records both consult.

use alloy::sol;

sol! {
    /// EIP-712 payload signed by a session key for one delegated call.
    #[sol(all_derives)]
    struct DelegatedCall {
        address owner;
        address sessionKey;
        address target;
        bytes4 selector;
        bytes callData;
        uint256 value;
        uint256 nonce;
        uint256 deadline;
    }

    #[sol(rpc, all_derives)]
    interface ISessionKeyManager {
        struct SessionKeyData {
            address sessionKey;
            uint64 validAfter;
            uint64 validUntil;
            address allowedTarget;
            bytes4[] allowedSelectors;
            uint256 spendingLimit;
            uint256 spentAmount;
            uint256 nonce;
        }

        error SessionKeyNotFound();
        error SessionKeyExpired();
        error SessionKeyStillActive();
        error SelectorNotAllowed(bytes4 selector);
        error TargetNotAllowed(address target);
        error SpendingLimitExceeded(uint256 requested, uint256 remaining);
        error InvalidSignature();
        error SignatureExpired(uint256 deadline);
        error InvalidNonce(uint256 expected);

        function registerSessionKey(
            address sessionKey,
            uint64 validAfter,
            uint64 validUntil,
            address allowedTarget,
            bytes4[] calldata allowedSelectors,
            uint256 spendingLimit
        ) external;

        function revokeSessionKey(address sessionKey) external;

        function getSessionKeyData(address owner, address sessionKey)
            external
            view
            returns (SessionKeyData memory);
    }

    #[sol(rpc, all_derives)]
    interface IBlog {
        function publish(
            string arweaveId,
            string title,
            uint64 categoryId,
            uint8 visibility,
            uint16 royaltyBps
        ) external returns (uint256 articleId);

        function evaluate(
            uint256 articleId,
            uint8 score,
            string content,
            address referrer,
            uint256 parentCommentId
        ) external payable;

        function follow(address target, bool isFollow) external;

        function collect(uint256 articleId, address referrer) external payable;

        function likeComment(
            uint256 articleId,
            uint256 commentId,
            address commenter,
            address referrer
        ) external payable;

        function editArticle(
            uint256 articleId,
            string originalAuthor,
            string title,
            uint64 categoryId
        ) external;

        function publishWithSessionKey(
            address owner,
            address sessionKey,
            string arweaveId,
            string title,
            uint64 categoryId,
            uint8 visibility,
            uint16 royaltyBps,
            uint256 deadline,
            bytes signature
        ) external returns (uint256 articleId);

        function evaluateWithSessionKey(
            address owner,
            address sessionKey,
            uint256 articleId,
            uint8 score,
            string content,
            address referrer,
            uint256 parentCommentId,
            uint256 deadline,
            bytes signature
        ) external payable;

        function followWithSessionKey(
            address owner,
            address sessionKey,
            address target,
            bool isFollow,
            uint256 deadline,
            bytes signature
        ) external;

        function collectWithSessionKey(
            address owner,
            address sessionKey,
            uint256 articleId,
            address referrer,
            uint256 deadline,
            bytes signature
        ) external payable;

        function likeCommentWithSessionKey(
            address owner,
            address sessionKey,
            uint256 articleId,
            uint256 commentId,
            address commenter,
            address referrer,
            uint256 deadline,
            bytes signature
        ) external payable;

        function editArticleWithSessionKey(
            address owner,
            address sessionKey,
            uint256 articleId,
            string originalAuthor,
            string title,
            uint64 categoryId,
            uint256 deadline,
            bytes signature
        ) external;
    }
}
