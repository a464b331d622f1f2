pub mod apply;
pub mod destroy;
pub mod import;
pub mod plan;
pub mod refresh;
pub mod show;
pub mod validate;

use colored::Colorize;
use deskflow_cloud::{ActionType, ApplyResult, Plan};

/// プランの内容を表示
pub fn print_plan(plan: &Plan) {
    for action in &plan.actions {
        let (symbol, label) = match action.action_type {
            ActionType::Create => ("+".green(), "作成".green()),
            ActionType::Update => ("~".yellow(), "更新".yellow()),
            ActionType::Replace => ("-/+".red(), "置換".red()),
            ActionType::Delete => ("-".red(), "削除".red()),
            ActionType::NoOp => continue,
        };
        println!("  {} {} ({})", symbol, action.address.cyan(), label);
        for change in &action.changes {
            println!("      {}", change.dimmed());
        }
    }

    let summary = plan.summary();
    println!();
    println!(
        "プラン: 作成 {}, 更新 {}, 置換 {}, 削除 {}, 変更なし {}",
        summary.create, summary.update, summary.replace, summary.delete, summary.no_change
    );
}

/// 実行結果を表示し、失敗があればエラーを返す
pub fn print_result(result: &ApplyResult) -> anyhow::Result<()> {
    for ok in &result.succeeded {
        println!("  ✓ {}", ok.message);
    }
    for failed in &result.failed {
        println!(
            "  ✗ {}: {}",
            failed.action_id.red(),
            failed.error.as_deref().unwrap_or("不明なエラー")
        );
    }

    println!();
    println!(
        "完了: 成功 {}, 失敗 {} ({:.1}秒)",
        result.succeeded.len(),
        result.failed.len(),
        result.duration_ms as f64 / 1000.0
    );

    if !result.is_success() {
        anyhow::bail!("{}件の操作が失敗しました", result.failed.len());
    }
    Ok(())
}

/// ApplyResult を連結
pub fn merge_result(total: &mut ApplyResult, part: ApplyResult) {
    total.succeeded.extend(part.succeeded);
    total.failed.extend(part.failed);
    total.duration_ms += part.duration_ms;
}
