use std::path::Path;

use anyhow::Result;
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::analyzer::AnalysisReport;
use crate::attribution::AttributionResult;
use crate::history::HistorySummary;
use crate::ingredients::explain::IngredientRisk;
use crate::model::train::TrainingOutcome;
use crate::models::{ClassLabel, ClassificationResult, ConfidenceLevel, RiskCategory, RiskTier};

/// Render one analysis. `attributions` are shown in expert mode.
pub fn render_analysis(
    report: &AnalysisReport,
    attributions: Option<&[AttributionResult]>,
    verbose: bool,
    quiet: bool,
) -> Result<()> {
    let score = report.score.value;

    if quiet {
        let label = report
            .classification
            .as_ref()
            .map(|c| c.label.display_name())
            .unwrap_or("-");
        println!(
            "Score: {}/10  Tier: {}  Label: {}",
            colored_score(score),
            tier_text(report.tier),
            label
        );
        return Ok(());
    }

    println!("\n {} v{}\n", "faisc".bold(), env!("CARGO_PKG_VERSION"));

    println!(" ┌────────────────────────────────────────────────────┐");
    println!(" │  {:<48} │", "SUMMARY".bold());
    println!(
        " │  {:<48} │",
        format!("Ingredients        : {}", report.ingredients.len())
    );
    println!(
        " │  {:<48} │",
        format!("Safety score       : {}/10", score)
    );
    println!(
        " │  {:<48} │",
        format!("Risk               : {}", report.tier)
    );
    if let Some(c) = &report.classification {
        println!(
            " │  {:<48} │",
            format!("Label              : {}", c.label.display_name())
        );
        println!(
            " │  {:<48} │",
            format!("Confidence         : {:.1}% ({})", c.confidence() * 100.0, c.confidence_level())
        );
    }
    println!(" └────────────────────────────────────────────────────┘\n");

    if let Some(c) = &report.classification {
        println!(" {} {}", tier_badge(report.tier), c.label.description());
        if c.confidence_level() == ConfidenceLevel::Low {
            println!(
                " {} The model is unsure about this list; treat the label as a hint.",
                "[NOTE]".dimmed()
            );
        }
    }
    println!(" {}\n", report.explanation.narrative);

    if !report.explanation.ingredients.is_empty() {
        let flagged = report
            .explanation
            .ingredients
            .iter()
            .filter(|i| i.category != RiskCategory::Safe)
            .count();
        if flagged > 0 || verbose {
            println!(" {} Ingredient breakdown:\n", "[INGREDIENTS]".cyan().bold());
            render_ingredient_table(&report.explanation.ingredients, verbose);
            println!();
        }
    }

    if let Some(c) = &report.classification {
        if verbose || attributions.is_some() {
            println!(" {} Label probabilities:\n", "[MODEL]".blue().bold());
            render_probability_table(c);
            println!();
        }
    }

    if let Some(results) = attributions {
        render_attribution_tables(results);
    }

    Ok(())
}

/// Render held-out evaluation after training.
pub fn render_training(outcome: &TrainingOutcome, model_path: &Path, quiet: bool) -> Result<()> {
    let eval = &outcome.evaluation;

    if quiet {
        println!(
            "Accuracy: {:.3}  Macro F1: {:.3}  Saved: {}",
            eval.accuracy,
            eval.macro_avg.f1,
            model_path.display()
        );
        return Ok(());
    }

    println!(" ┌────────────────────────────────────────────────────┐");
    println!(" │  {:<48} │", "TRAINING".bold());
    println!(
        " │  {:<48} │",
        format!("Train / test rows  : {} / {}", outcome.train_rows, outcome.test_rows)
    );
    println!(
        " │  {:<48} │",
        format!("Vocabulary         : {}", outcome.model.vectorizer.vocabulary_size())
    );
    println!(
        " │  {:<48} │",
        format!("Iterations         : {}", outcome.iterations)
    );
    println!(
        " │  {:<48} │",
        format!("Accuracy           : {:.3}", eval.accuracy)
    );
    println!(
        " │  {:<48} │",
        format!("Macro F1           : {:.3}", eval.macro_avg.f1)
    );
    println!(" └────────────────────────────────────────────────────┘\n");

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Label").add_attribute(Attribute::Bold),
            Cell::new("Precision").add_attribute(Attribute::Bold),
            Cell::new("Recall").add_attribute(Attribute::Bold),
            Cell::new("F1").add_attribute(Attribute::Bold),
            Cell::new("Support").add_attribute(Attribute::Bold),
        ]);

    for m in &eval.per_class {
        table.add_row(vec![
            Cell::new(m.label.display_name()),
            Cell::new(format!("{:.3}", m.precision)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.3}", m.recall)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.3}", m.f1))
                .fg(metric_color(m.f1))
                .set_alignment(CellAlignment::Right),
            Cell::new(m.support).set_alignment(CellAlignment::Right),
        ]);
    }
    for (name, avg) in [("macro avg", &eval.macro_avg), ("weighted avg", &eval.weighted_avg)] {
        table.add_row(vec![
            Cell::new(name).add_attribute(Attribute::Italic),
            Cell::new(format!("{:.3}", avg.precision)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.3}", avg.recall)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.3}", avg.f1)).set_alignment(CellAlignment::Right),
            Cell::new(eval.support).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("{}", table);
    println!("\n {} Model saved to {}", "✓".green(), model_path.display());

    Ok(())
}

/// Render attribution results on their own.
pub fn render_attribution(results: &[AttributionResult], quiet: bool) -> Result<()> {
    if quiet {
        for r in results {
            let words: Vec<String> = r
                .fragments
                .iter()
                .map(|(w, v)| format!("{} ({:+.3})", w, v))
                .collect();
            println!("{}: {}", r.label, words.join(", "));
        }
        return Ok(());
    }
    render_attribution_tables(results);
    Ok(())
}

/// Render aggregate statistics over the history log.
pub fn render_stats(summary: &HistorySummary, log_path: &Path, quiet: bool) -> Result<()> {
    if summary.total == 0 {
        println!(
            " No analyses logged yet in {}; run `faisc analyze --log` first.",
            log_path.display()
        );
        return Ok(());
    }

    let average = summary.average_score.unwrap_or(0.0);
    if quiet {
        println!("Total: {}  Average score: {:.2}", summary.total, average);
        return Ok(());
    }

    println!(" ┌────────────────────────────────────────────────────┐");
    println!(" │  {:<48} │", "HISTORY".bold());
    println!(
        " │  {:<48} │",
        format!("Total analyses     : {}", summary.total)
    );
    println!(
        " │  {:<48} │",
        format!("Average score      : {:.2}", average)
    );
    println!(" └────────────────────────────────────────────────────┘\n");

    let mut labels = Table::new();
    labels
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Label").add_attribute(Attribute::Bold),
            Cell::new("Analyses").add_attribute(Attribute::Bold),
        ]);
    let mut label_rows: Vec<(&ClassLabel, &usize)> = summary.label_counts.iter().collect();
    label_rows.sort_by(|a, b| b.1.cmp(a.1));
    for (label, count) in label_rows {
        labels.add_row(vec![
            Cell::new(label.display_name()),
            Cell::new(count).set_alignment(CellAlignment::Right),
        ]);
    }
    if summary.unclassified > 0 {
        labels.add_row(vec![
            Cell::new("(score only)").fg(Color::DarkGrey),
            Cell::new(summary.unclassified).set_alignment(CellAlignment::Right),
        ]);
    }
    println!(" {} Label distribution:\n", "[LABELS]".blue().bold());
    println!("{}\n", labels);

    println!(" {} Score distribution:\n", "[SCORES]".cyan().bold());
    let widest = summary.score_counts.values().copied().max().unwrap_or(1).max(1);
    for (score, count) in summary.score_counts.iter().rev() {
        let bar = "█".repeat((count * 30).div_ceil(widest));
        println!("  {:>2} │ {} {}", score, score_colorize(*score, &bar), count);
    }
    println!();

    if summary.unsafe_counts.is_empty() {
        println!(" {} No unsafe ingredients found in the log.", "✓".green());
    } else {
        println!(" {} Most common unsafe ingredients:\n", "[UNSAFE]".red().bold());
        let mut unsafe_rows = summary.unsafe_counts.clone();
        unsafe_rows.sort_by(|a, b| b.1.cmp(&a.1));
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("Ingredient").add_attribute(Attribute::Bold),
                Cell::new("Analyses").add_attribute(Attribute::Bold),
            ]);
        for (keyword, count) in unsafe_rows {
            table.add_row(vec![
                Cell::new(keyword).fg(Color::Red),
                Cell::new(count).set_alignment(CellAlignment::Right),
            ]);
        }
        println!("{}", table);
    }

    Ok(())
}

/// Render the label taxonomy.
pub fn render_labels() -> Result<()> {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Id").add_attribute(Attribute::Bold),
            Cell::new("Name").add_attribute(Attribute::Bold),
            Cell::new("Description").add_attribute(Attribute::Bold),
        ]);
    for label in ClassLabel::ALL {
        table.add_row(vec![
            Cell::new(label.as_str()).fg(Color::Cyan),
            Cell::new(label.display_name()),
            Cell::new(label.description()),
        ]);
    }
    println!("{}", table);
    Ok(())
}

fn render_ingredient_table(ingredients: &[IngredientRisk], verbose: bool) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Ingredient").add_attribute(Attribute::Bold),
            Cell::new("Risk").add_attribute(Attribute::Bold),
            Cell::new("Matched").add_attribute(Attribute::Bold),
        ]);

    for ing in ingredients
        .iter()
        .filter(|i| verbose || i.category != RiskCategory::Safe)
    {
        let (label, color) = match ing.category {
            RiskCategory::Safe => ("✓ safe", Color::Green),
            RiskCategory::Mild => ("⚠ mild", Color::Yellow),
            RiskCategory::High => ("✗ high", Color::Red),
        };
        table.add_row(vec![
            Cell::new(&ing.ingredient),
            Cell::new(label).fg(color).set_alignment(CellAlignment::Center),
            Cell::new(ing.keyword.as_deref().unwrap_or("")),
        ]);
    }

    println!("{}", table);
}

fn render_probability_table(result: &ClassificationResult) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Label").add_attribute(Attribute::Bold),
            Cell::new("Probability").add_attribute(Attribute::Bold),
        ]);
    for (label, p) in result.ranked() {
        let mut name = Cell::new(label.display_name());
        if label == result.label {
            name = name.add_attribute(Attribute::Bold).fg(Color::Cyan);
        }
        table.add_row(vec![
            name,
            Cell::new(format!("{:.1}%", p * 100.0)).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("{}", table);
}

fn render_attribution_tables(results: &[AttributionResult]) {
    for r in results {
        println!(
            " {} Why {} ({:.1}%):\n",
            "[EXPLAIN]".magenta().bold(),
            r.label.display_name().bold(),
            r.probability * 100.0
        );
        if r.fragments.is_empty() {
            println!("  No words to attribute.\n");
            continue;
        }

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("Word").add_attribute(Attribute::Bold),
                Cell::new("Weight").add_attribute(Attribute::Bold),
                Cell::new("Effect").add_attribute(Attribute::Bold),
            ]);
        for (word, weight) in &r.fragments {
            let (effect, color) = if *weight >= 0.0 {
                ("supports", Color::Green)
            } else {
                ("opposes", Color::Red)
            };
            table.add_row(vec![
                Cell::new(word),
                Cell::new(format!("{:+.4}", weight)).set_alignment(CellAlignment::Right),
                Cell::new(effect).fg(color),
            ]);
        }
        println!("{}", table);
        println!(
            "  surrogate fit R² {:.3}, local prediction {:.3}\n",
            r.score, r.local_prediction
        );
    }
}

fn tier_badge(tier: RiskTier) -> ColoredString {
    match tier {
        RiskTier::Low => "[LOW RISK]".green().bold(),
        RiskTier::Moderate => "[MODERATE RISK]".yellow().bold(),
        RiskTier::High => "[HIGH RISK]".red().bold(),
    }
}

fn tier_text(tier: RiskTier) -> ColoredString {
    match tier {
        RiskTier::Low => tier.to_string().green(),
        RiskTier::Moderate => tier.to_string().yellow(),
        RiskTier::High => tier.to_string().red(),
    }
}

fn colored_score(score: u8) -> ColoredString {
    score_colorize(score, &score.to_string())
}

fn score_colorize(score: u8, text: &str) -> ColoredString {
    match RiskTier::from_score(score) {
        RiskTier::Low => text.green(),
        RiskTier::Moderate => text.yellow(),
        RiskTier::High => text.red(),
    }
}

fn metric_color(value: f64) -> Color {
    if value >= 0.8 {
        Color::Green
    } else if value >= 0.5 {
        Color::Yellow
    } else {
        Color::Red
    }
}
