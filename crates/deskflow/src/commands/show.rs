use crate::project::Project;
use colored::Colorize;

pub async fn handle(project: &Project, address: Option<&str>, json: bool) -> anyhow::Result<()> {
    let state = project.state_manager().load().await?;

    if let Some(address) = address {
        let tracked = state
            .get_resource(address)
            .ok_or_else(|| anyhow::anyhow!("'{}' はステートに存在しません", address))?;

        if json {
            println!("{}", serde_json::to_string_pretty(tracked)?);
            return Ok(());
        }

        println!("{}", address.cyan().bold());
        println!("  種類: {}", tracked.resource_type);
        println!("  状態: {}", tracked.status);
        println!("  ID:   {}", tracked.state.id().unwrap_or("-"));
        println!("  更新: {}", tracked.updated_at.format("%Y-%m-%d %H:%M:%S"));
        println!();
        for (key, value) in tracked.state.flatten() {
            println!("  {:<24} = {}", key, value);
        }
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
        return Ok(());
    }

    if state.resources.is_empty() {
        println!("管理中のリソースはありません");
        return Ok(());
    }

    println!("{}", format!("管理中のリソース ({} 個):", state.resources.len()).bold());
    for (address, tracked) in &state.resources {
        println!(
            "  • {} [{}] {}",
            address.cyan(),
            tracked.status,
            tracked.state.id().unwrap_or("-").dimmed()
        );
    }
    Ok(())
}
