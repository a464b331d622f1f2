use crate::project::Project;
use colored::Colorize;
use deskflow_cloud::Applier;

pub async fn handle(project: &Project, address: &str, id: &str) -> anyhow::Result<()> {
    println!("{} {} ← {}", "インポート中:".blue(), address.cyan(), id);

    // マニフェストに宣言があればそのタイムアウトを使う
    let timeouts = match project.desired() {
        Ok(desired) => desired
            .get(address)
            .map(|r| r.timeouts)
            .unwrap_or(project.timeouts),
        Err(e) => {
            tracing::debug!("Manifest not usable for import: {:#}", e);
            project.timeouts
        }
    };

    let provider = project.provider()?;
    let manager = project.state_manager();
    let lock = manager.acquire_lock().await?;
    let mut state = manager.load().await?;

    Applier::new(&provider)
        .import(address, id, timeouts, &mut state)
        .await?;
    manager.save(&state).await?;
    lock.release().await?;

    println!("{}", format!("✓ {} をインポートしました", address).green());
    Ok(())
}
