use crate::project::Project;
use colored::Colorize;
use deskflow_cloud::{Applier, ApplyResult, Plan};

pub async fn handle(project: &Project, address: Option<&str>, yes: bool) -> anyhow::Result<()> {
    let provider = project.provider()?;
    let manager = project.state_manager();
    let lock = manager.acquire_lock().await?;
    let mut state = manager.load().await?;

    let mut plan = Plan::destroy_all(&state);
    if let Some(target) = address {
        plan = Plan::new(
            plan.actions
                .into_iter()
                .filter(|a| a.address == target)
                .collect(),
        );
        if plan.actions.is_empty() {
            lock.release().await?;
            anyhow::bail!("'{}' はステートに存在しません", target);
        }
    }

    if !plan.has_changes {
        println!("管理中のリソースはありません");
        lock.release().await?;
        return Ok(());
    }

    println!("{}", "削除対象:".bold());
    super::print_plan(&plan);

    if !yes {
        println!();
        println!("{}", "警告: Azure上のリソースを削除します。".yellow());
        println!("実行するには --yes オプションを指定してください");
        lock.release().await?;
        return Ok(());
    }

    println!();
    let applier = Applier::new(&provider);
    let mut result = ApplyResult::new();
    let start = std::time::Instant::now();

    for action in &plan.actions {
        println!("{}", action.description.blue());
        match applier.destroy(&action.address, &mut state).await {
            Ok(()) => result.add_success(
                action.id.clone(),
                format!("{} を削除しました", action.address),
            ),
            Err(e) => result.add_failure(action.id.clone(), e.to_string()),
        }
        manager.save(&state).await?;
    }

    result.duration_ms = start.elapsed().as_millis() as u64;
    lock.release().await?;
    super::print_result(&result)
}
