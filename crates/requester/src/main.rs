//! # voucher-mint
//!
//! 画像ファイルからミント要求を構築し、Signer Serviceでバウチャーを取得して
//! コレクションコントラクトに提出するCLI。
//!
//! ```text
//! voucher-mint --wallet 0x... --name "My Avatar" --image avatar.png
//! voucher-mint --wallet 0x... --image avatar.png --local
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use voucher_requester::chain::rpc::{DEFAULT_MAX_POLLS, DEFAULT_POLL_INTERVAL};
use voucher_requester::{CollectionContract, LocalCollection, Minter, RpcCollection, SignerClient};
use voucher_types::VoucherRequest;

#[derive(Parser)]
#[command(name = "voucher-mint", about = "Avatar Mint Voucher Requester")]
struct Cli {
    /// Signer ServiceのベースURL
    #[arg(long, env = "SIGNER_URL", default_value = "http://localhost:3000")]
    signer_url: String,

    /// 受取人兼トランザクション送信元のウォレットアドレス
    #[arg(long, env = "WALLET_ADDRESS")]
    wallet: String,

    /// NFTの表示名（最大26文字）
    #[arg(long)]
    name: Option<String>,

    /// アバター画像ファイル
    #[arg(long)]
    image: PathBuf,

    /// チェーンのJSON-RPCエンドポイント。
    ///
    /// 提出は`eth_sendTransaction`で行うため、--walletのアカウントをアンロック済みで
    /// 保持するノード（ローカルノードやウォレット内蔵のRPC）が必要。
    /// 公開RPCエンドポイントはこの呼び出しを拒否する。
    #[arg(long, env = "CHAIN_RPC_URL", default_value = "http://localhost:8545")]
    rpc_url: String,

    /// コレクションアドレス（省略時はSigner Serviceの署名者情報から取得）
    #[arg(long, env = "NFT_COLLECTION_ADDRESS")]
    collection: Option<String>,

    /// チェーンの代わりにメモリ上のコレクションにミントする
    #[arg(long)]
    local: bool,

    /// 署名者情報による署名者の確認を省略する
    #[arg(long)]
    skip_signer_check: bool,

    /// receiptのポーリング間隔（ミリ秒）
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL.as_millis() as u64)]
    poll_interval_ms: u64,

    /// receiptのポーリング回数の上限
    #[arg(long, default_value_t = DEFAULT_MAX_POLLS)]
    max_polls: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    // Step 1: ミント要求の構築
    let image = voucher_requester::snapshot::image_data_url(&cli.image).await?;
    let intent = VoucherRequest {
        author_address: Some(cli.wallet.clone()),
        nft_name: cli.name.clone(),
        image,
    };

    // Step 2: 署名者情報の取得
    let http_client = reqwest::Client::new();
    let client = SignerClient::new(http_client.clone(), cli.signer_url.clone());
    let info = match client.signer_info().await {
        Ok(info) => {
            tracing::info!(
                signer = %info.signer_address,
                collection = %info.collection_address,
                chain_id = info.chain_id,
                "署名者情報を取得しました"
            );
            Some(info)
        }
        Err(e) => {
            tracing::warn!(error = %e, "署名者情報を取得できません");
            None
        }
    };

    let collection = match (&cli.collection, &info) {
        (Some(address), _) => address.clone(),
        (None, Some(info)) => info.collection_address.clone(),
        (None, None) => anyhow::bail!("コレクションアドレスを特定できません（--collectionを指定してください）"),
    };
    let collection = voucher_crypto::parse_address(&collection).context("コレクションアドレス")?;

    // Step 3: 提出先の選択
    let contract: Arc<dyn CollectionContract> = if cli.local {
        let info = info
            .as_ref()
            .context("--localには署名者情報が必要です")?;
        let local = LocalCollection::new(info.chain_id, collection);
        let signer = voucher_crypto::parse_address(&info.signer_address).context("署名者アドレス")?;
        local.grant_minter_role(signer).await;
        tracing::info!("ローカルコレクションにミントします");
        Arc::new(local)
    } else {
        let wallet = voucher_crypto::parse_address(&cli.wallet).context("ウォレットアドレス")?;
        Arc::new(
            RpcCollection::new(http_client, cli.rpc_url.clone(), wallet, collection)
                .with_polling(Duration::from_millis(cli.poll_interval_ms), cli.max_polls),
        )
    };

    let mut minter = Minter::new(client, contract);
    if let (Some(info), false) = (&info, cli.skip_signer_check) {
        minter = minter.with_trusted_signer(info)?;
    }

    // Step 4: ミント
    match minter.mint(intent).await {
        Ok(token) => {
            println!("{}", serde_json::to_string_pretty(&token)?);
            Ok(())
        }
        Err(e) => {
            eprintln!("{e}\n{}", e.class().hint());
            Err(e.into())
        }
    }
}
