use crate::project::Project;
use colored::Colorize;
use deskflow_cloud::{Applier, ApplyResult, CloudProvider, Plan};

pub async fn handle(project: &Project, yes: bool) -> anyhow::Result<()> {
    println!("{}", "変更を適用します...".blue().bold());

    let desired = project.desired()?;
    let provider = project.provider()?;
    let manager = project.state_manager();
    let lock = manager.acquire_lock().await?;
    let mut state = manager.load().await?;

    let plan = Plan::compute(&provider, &desired, &state)?;
    if !plan.has_changes {
        println!("{}", "✓ 変更はありません".green());
        lock.release().await?;
        return Ok(());
    }

    println!();
    super::print_plan(&plan);

    // 確認（--yesが指定されていない場合）
    if !yes {
        println!();
        println!("{}", "警告: Azure上のリソースが変更されます。".yellow());
        println!("実行するには --yes オプションを指定してください");
        lock.release().await?;
        return Ok(());
    }

    let auth = provider.check_auth().await?;
    if !auth.authenticated {
        anyhow::bail!(
            "Azureに認証できません: {}",
            auth.error.unwrap_or_default()
        );
    }

    println!();
    let applier = Applier::new(&provider);
    let mut result = ApplyResult::new();

    // 1件ごとにステートを保存し、途中で失敗しても結果を失わない
    for action in &plan.actions {
        let single = Plan::new(vec![action.clone()]);
        if !single.has_changes {
            continue;
        }
        println!("{}", action.description.blue());
        let part = applier.apply(&single, &desired, &mut state).await;
        manager.save(&state).await?;
        super::merge_result(&mut result, part);
    }

    lock.release().await?;
    super::print_result(&result)
}
