use crate::project::Project;
use colored::Colorize;
use deskflow_cloud::Applier;

pub async fn handle(project: &Project) -> anyhow::Result<()> {
    println!("{}", "ステートを更新中...".blue());

    let provider = project.provider()?;
    let manager = project.state_manager();
    let lock = manager.acquire_lock().await?;
    let mut state = manager.load().await?;

    if state.resources.is_empty() {
        println!("管理中のリソースはありません");
        lock.release().await?;
        return Ok(());
    }

    let result = Applier::new(&provider).refresh(&mut state).await;
    manager.save(&state).await?;
    lock.release().await?;

    super::print_result(&result)
}
