use crate::project::Project;
use colored::Colorize;
use deskflow_cloud::Plan;

pub async fn handle(project: &Project) -> anyhow::Result<()> {
    let desired = project.desired()?;
    let provider = project.offline_provider();
    let state = project.state_manager().load().await?;

    let plan = Plan::compute(&provider, &desired, &state)?;
    if !plan.has_changes {
        println!("{}", "✓ 変更はありません".green());
        return Ok(());
    }

    println!("{}", "実行予定の変更:".bold());
    super::print_plan(&plan);
    Ok(())
}
