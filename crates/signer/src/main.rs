//! # voucher-signer
//!
//! ## 起動シーケンス
//! 1. 環境変数から設定を読み込む（署名鍵・コレクションアドレスが不正なら起動しない）
//! 2. コレクションコントラクトの事前確認（失敗してもリクエスト時に再解決するため警告のみ）
//! 3. `/voucher` `/api/server` `/.well-known/voucher-signer` の受付開始

use std::sync::Arc;

use voucher_signer::{endpoints, CollectionResolver, RpcResolver, SignerConfig, VoucherSigner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    // Step 1: 設定
    let config = SignerConfig::from_env()?;

    // Step 2: コレクションコントラクトの事前確認
    let resolver = RpcResolver::new(reqwest::Client::new(), config.rpc_url.clone());
    match resolver.resolve(config.collection_address).await {
        Ok(()) => tracing::info!(
            collection = %voucher_crypto::format_address(&config.collection_address),
            chain_id = config.chain_id,
            "コレクションコントラクトを確認しました"
        ),
        Err(e) => tracing::warn!(
            collection = %voucher_crypto::format_address(&config.collection_address),
            error = %e,
            "コレクションコントラクトを確認できません。リクエスト時に再試行します"
        ),
    }

    let signer = Arc::new(VoucherSigner::new(config, Box::new(resolver)));
    tracing::info!(
        signer_address = %voucher_crypto::format_address(&signer.signer_address()),
        royalty_bps = signer.config().royalty_bps,
        "バウチャー署名用アドレス（コレクションのミンター権限が必要です）"
    );
    let listen_addr = signer.config().listen_addr.clone();
    let body_limit = signer.config().max_body_bytes();

    // Step 3: 受付開始
    let app = endpoints::router(signer, body_limit);

    tracing::info!("Signer Serviceを {} で起動します", listen_addr);
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
