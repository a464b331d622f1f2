mod commands;
mod project;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "desk")]
#[command(about = "Azure Virtual Desktop を KDL で宣言的に管理する", long_about = None)]
struct Cli {
    /// マニフェストのパス（省略時は desk.kdl を自動検索）
    #[arg(short, long, global = true, env = "DESK_MANIFEST_PATH")]
    manifest: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// マニフェストを検証
    Validate,
    /// 変更内容を表示（リモートには接続しない）
    Plan,
    /// マニフェストの内容をAzureに反映
    Apply {
        /// 確認なしで実行
        #[arg(short, long)]
        yes: bool,
    },
    /// ステートをリモートの実態と同期
    Refresh,
    /// 既存のリソースをステートに取り込む
    Import {
        /// リソースアドレス（例: azurerm_virtual_desktop_workspace.main）
        address: String,
        /// AzureのリソースID
        id: String,
    },
    /// 管理中のリソースを削除
    Destroy {
        /// 削除対象のアドレス（省略時は全リソース）
        address: Option<String>,
        /// 確認なしで実行
        #[arg(short, long)]
        yes: bool,
    },
    /// ステートの内容を表示
    Show {
        /// 表示するアドレス（省略時は一覧）
        address: Option<String>,
        /// JSONで出力
        #[arg(long)]
        json: bool,
    },
    /// バージョン情報を表示
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ログはstderrへ（RUST_LOG で上書き可能）
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Versionコマンドはマニフェスト不要
    if matches!(cli.command, Commands::Version) {
        println!("deskflow {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let project = project::Project::discover(cli.manifest)?;

    match cli.command {
        Commands::Validate => commands::validate::handle(&project),
        Commands::Plan => commands::plan::handle(&project).await,
        Commands::Apply { yes } => commands::apply::handle(&project, yes).await,
        Commands::Refresh => commands::refresh::handle(&project).await,
        Commands::Import { address, id } => commands::import::handle(&project, &address, &id).await,
        Commands::Destroy { address, yes } => {
            commands::destroy::handle(&project, address.as_deref(), yes).await
        }
        Commands::Show { address, json } => {
            commands::show::handle(&project, address.as_deref(), json).await
        }
        Commands::Version => Ok(()),
    }
}
