// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! `chainpress <article-id>` - resolve an article through the configured
//! gateways and print it.

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use chainpress::blockchain::RpcOwnerWallet;
use chainpress::config::{AppConfig, LogFormat};
use chainpress::crypto::ArticleKeyCache;
use chainpress::gateway::GatewayClient;
use chainpress::publish::{ArticleBody, ArticleReader};
use chainpress::storage::RedbStore;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let Some(article_id) = env::args().nth(1) else {
        eprintln!("usage: chainpress <article-id>");
        return ExitCode::from(2);
    };

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::from(2);
        }
    };
    init_tracing(config.log_format);

    let gateway = match GatewayClient::new(config.gateways.clone()) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            eprintln!("gateway error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Cached article keys are only reachable with a wallet and a local store.
    let keys = match &config.wallet_rpc_url {
        Some(url) => match RedbStore::open_in(&config.data_dir) {
            Ok(store) => Some(Arc::new(ArticleKeyCache::new(
                Arc::new(store),
                Arc::new(RpcOwnerWallet::new(url.clone())),
            ))),
            Err(e) => {
                tracing::warn!(error = %e, data_dir = %config.data_dir.display(), "Local store unavailable");
                None
            }
        },
        None => None,
    };

    let reader = ArticleReader::new(gateway, keys);
    let resolved = match reader.resolve(&article_id, None).await {
        Ok(resolved) => resolved,
        Err(e) => {
            let body = e.to_body();
            eprintln!("{}: {}", body.code.as_str(), body.message);
            return ExitCode::FAILURE;
        }
    };

    println!("article:   {}", resolved.article_id);
    println!("manifest:  {}", resolved.manifest_id);
    println!("encrypted: {}", resolved.body.is_encrypted());
    match &resolved.body {
        ArticleBody::Locked(_) => {
            println!("(no cached key for this article; showing ciphertext)")
        }
        ArticleBody::Pending { index_id, text: None } => {
            println!("(encrypted content not published yet; placeholder asset {index_id})")
        }
        ArticleBody::Pending { .. } => println!("(encrypted content not published yet)"),
        ArticleBody::Plain(_) | ArticleBody::Decrypted(_) => {}
    }
    println!();
    println!("{}", resolved.body.text());

    ExitCode::SUCCESS
}
