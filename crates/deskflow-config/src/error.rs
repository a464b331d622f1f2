use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("設定ディレクトリが見つかりません")]
    ConfigDirNotFound,

    #[error(
        "マニフェストが見つかりません。以下の場所を確認してください:\n\
        - カレントディレクトリ: desk.kdl, desk.local.kdl, .desk.kdl, .desk.local.kdl\n\
        - ./.deskflow/ ディレクトリ\n\
        - ~/.config/deskflow/desk.kdl\n\
        または DESK_MANIFEST_PATH 環境変数で直接指定できます"
    )]
    ManifestNotFound,

    #[error("設定ファイルの形式が不正です ({path}): {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("設定値が不正です: {0}")]
    InvalidSetting(String),

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
