use crate::project::Project;
use colored::Colorize;
use deskflow_cloud::CloudProvider;

pub fn handle(project: &Project) -> anyhow::Result<()> {
    println!("{}", "マニフェストを検証中...".blue());
    println!(
        "マニフェスト: {}",
        project.manifest_path.display().to_string().cyan()
    );

    let desired = project.desired()?;
    let provider = project.offline_provider();

    let mut problems = 0;
    for resource in desired.iter() {
        let address = resource.address();
        let Some(handler) = provider.handler(&resource.resource_type) else {
            println!("  ✗ {}: 未対応のリソースタイプです", address.red());
            problems += 1;
            continue;
        };

        let diagnostics = handler.schema().validate(&resource.config);
        if diagnostics.is_empty() {
            println!("  ✓ {}", address.cyan());
        } else {
            println!("  ✗ {}", address.red());
            for diagnostic in &diagnostics {
                println!("      {}", diagnostic);
            }
            problems += diagnostics.len();
        }
    }

    println!();
    if problems > 0 {
        anyhow::bail!("{}件の問題が見つかりました", problems);
    }

    println!("{}", "✓ マニフェストは正常です！".green().bold());
    println!("  リソース: {}個", desired.len());
    Ok(())
}
