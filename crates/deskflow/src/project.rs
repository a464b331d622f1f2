use anyhow::Context;
use deskflow_cloud::{Operation, ResourceSet, StateManager, Timeouts, parse_manifest_file};
use deskflow_cloud_azure::{AzureConfig, AzureProvider};
use deskflow_config::ProviderSettings;
use std::path::{Path, PathBuf};

/// マニフェスト・設定・ステートの所在
pub struct Project {
    pub manifest_path: PathBuf,
    pub root: PathBuf,
    pub settings: ProviderSettings,
    pub timeouts: Timeouts,
}

impl Project {
    pub fn discover(manifest: Option<PathBuf>) -> anyhow::Result<Self> {
        let manifest_path = match manifest {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("マニフェストが見つかりません: {}", path.display());
                }
                path
            }
            None => deskflow_config::find_manifest_file()?,
        };
        tracing::debug!("Using manifest {}", manifest_path.display());

        let settings = ProviderSettings::load()?;
        let timeouts = default_timeouts(&settings);

        Ok(Self {
            root: project_root(&manifest_path),
            manifest_path,
            settings,
            timeouts,
        })
    }

    pub fn desired(&self) -> anyhow::Result<ResourceSet> {
        parse_manifest_file(&self.manifest_path, self.timeouts)
            .with_context(|| format!("{} の読み込みに失敗しました", self.manifest_path.display()))
    }

    pub fn state_manager(&self) -> StateManager {
        StateManager::new(&self.root)
    }

    fn azure_config(&self, subscription_id: String) -> AzureConfig {
        let env = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        let settings = &self.settings;

        let mut config = AzureConfig::new(subscription_id);
        config.tenant_id = settings.tenant_id.clone();
        config.client_id = settings.client_id.clone();
        config.client_secret = env("ARM_CLIENT_SECRET");
        config.access_token = env("ARM_ACCESS_TOKEN");
        if let Some(host) = &settings.authority_host {
            config.authority_host = host.clone();
        }
        if let Some(interval) = settings.poll_interval {
            config = config.with_poll_interval(interval);
        }
        let endpoint = settings
            .endpoint
            .clone()
            .unwrap_or_else(|| config.endpoint.clone());
        config.with_endpoint(endpoint)
    }

    /// リモート操作用のプロバイダー（認証情報が必須）
    pub fn provider(&self) -> anyhow::Result<AzureProvider> {
        let subscription_id = self.settings.subscription_id.clone().ok_or_else(|| {
            anyhow::anyhow!(
                "サブスクリプションIDが設定されていません。ARM_SUBSCRIPTION_ID または settings.yaml の subscription_id を指定してください"
            )
        })?;
        let config = self.azure_config(subscription_id);
        AzureProvider::new(&config).context("Azureの認証情報を確認してください")
    }

    /// 検証・プラン用のプロバイダー（リモートには接続しない）
    pub fn offline_provider(&self) -> AzureProvider {
        let subscription_id = self.settings.subscription_id.clone().unwrap_or_default();
        AzureProvider::deferred_auth(&self.azure_config(subscription_id))
    }
}

/// `.deskflow/desk.kdl` のプロジェクトルートはその親ディレクトリ
fn project_root(manifest_path: &Path) -> PathBuf {
    let dir = manifest_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let dir = if dir.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        dir
    };

    if dir.file_name().is_some_and(|name| name == ".deskflow") {
        if let Some(parent) = dir.parent() {
            return parent.to_path_buf();
        }
    }
    dir
}

fn default_timeouts(settings: &ProviderSettings) -> Timeouts {
    let overrides = [
        (Operation::Create, settings.timeouts.create),
        (Operation::Read, settings.timeouts.read),
        (Operation::Update, settings.timeouts.update),
        (Operation::Delete, settings.timeouts.delete),
    ];
    overrides
        .into_iter()
        .fold(Timeouts::default(), |timeouts, (operation, value)| match value {
            Some(d) => timeouts.with(operation, d),
            None => timeouts,
        })
}
