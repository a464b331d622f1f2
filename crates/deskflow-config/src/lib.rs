pub mod error;
pub mod settings;

pub use error::*;
pub use settings::{ProviderSettings, TimeoutSettings};

use std::path::PathBuf;

const MANIFEST_CANDIDATES: [&str; 4] = ["desk.local.kdl", ".desk.local.kdl", "desk.kdl", ".desk.kdl"];

/// deskflowの設定ディレクトリを取得
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("deskflow");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// プロジェクトのマニフェスト (desk.kdl) を探す
///
/// 以下の優先順位で検索:
/// 1. 環境変数 DESK_MANIFEST_PATH (直接パス指定)
/// 2. カレントディレクトリ: desk.local.kdl, .desk.local.kdl, desk.kdl, .desk.kdl
/// 3. ./.deskflow/ ディレクトリ内: 同様の順序
/// 4. ~/.config/deskflow/desk.kdl (グローバル設定)
pub fn find_manifest_file() -> Result<PathBuf> {
    if let Ok(manifest_path) = std::env::var("DESK_MANIFEST_PATH") {
        let path = PathBuf::from(manifest_path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!("DESK_MANIFEST_PATH {} does not exist", path.display());
    }

    let current_dir = std::env::current_dir()?;

    for filename in &MANIFEST_CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    let project_dir = current_dir.join(".deskflow");
    if project_dir.is_dir() {
        for filename in &MANIFEST_CANDIDATES {
            let path = project_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global = config_dir.join("deskflow").join("desk.kdl");
        if global.exists() {
            return Ok(global);
        }
    }

    Err(ConfigError::ManifestNotFound)
}
