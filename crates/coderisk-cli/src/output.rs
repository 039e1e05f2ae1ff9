use coderisk_core::{RiskAssessment, RiskLevel, ToolCallOutcome};
use colored::Colorize;

/// How much detail `check` prints, set by the CLI flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// One line per file plus a summary (the default).
    Default,
    /// Quiet: only the files that block, nothing on a clean pass.
    PreCommit,
    /// Full hop-by-hop investigation trace for every file.
    Explain,
}

fn color_for(level: RiskLevel) -> colored::Color {
    match level {
        RiskLevel::Minimal | RiskLevel::Low => colored::Color::Green,
        RiskLevel::Medium => colored::Color::Yellow,
        RiskLevel::High => colored::Color::Red,
        RiskLevel::Critical => colored::Color::Magenta,
    }
}

/// Prints one assessment per `verbosity`, and returns whether it should
/// block the commit (`should_block`, already computed by the assembler for
/// the caller's `BlockMode`).
pub fn print_assessment(assessment: &RiskAssessment, verbosity: Verbosity) -> bool {
    match verbosity {
        Verbosity::PreCommit => {
            if assessment.should_block {
                print_line(assessment);
            }
        }
        Verbosity::Default => print_line(assessment),
        Verbosity::Explain => print_explained(assessment),
    }
    assessment.should_block
}

fn print_line(assessment: &RiskAssessment) {
    let level = format!("{:?}", assessment.risk_level).to_uppercase();
    let colored_level = level.color(color_for(assessment.risk_level)).bold();
    let marker = if assessment.should_block {
        "BLOCK".red().bold()
    } else {
        "ok".green()
    };
    println!(
        "{marker} {:<8} {} ({:.0}% confidence, {:.1}s)",
        colored_level,
        assessment.file_path.cyan(),
        assessment.confidence * 100.0,
        assessment.duration.as_secs_f64(),
    );
}

fn print_explained(assessment: &RiskAssessment) {
    print_line(assessment);
    println!("  {}", assessment.summary);

    if !assessment.evidence.is_empty() {
        println!("  {}", "evidence:".bold());
        for item in &assessment.evidence {
            println!(
                "    - [{:?}] {} ({})",
                item.category,
                item.description,
                item.source.dimmed()
            );
        }
    }

    if !assessment.recommendations.is_empty() {
        println!("  {}", "recommendations:".bold());
        for rec in &assessment.recommendations {
            println!("    - {rec}");
        }
    }

    if !assessment.trace.hops.is_empty() {
        println!(
            "  {} ({} hop{}{})",
            "investigation trace:".bold(),
            assessment.trace.hops.len(),
            if assessment.trace.hops.len() == 1 { "" } else { "s" },
            if assessment.trace.emergency_finished {
                ", emergency finish"
            } else {
                ""
            },
        );
        for hop in &assessment.trace.hops {
            println!(
                "    hop {}: {} tool call(s), {} tokens, {:.2}s",
                hop.hop_number,
                hop.tool_calls.len(),
                hop.tokens_used,
                hop.duration.as_secs_f64(),
            );
            for call in &hop.tool_calls {
                match &call.result {
                    ToolCallOutcome::Ok { .. } => {
                        println!("      {} {}", "ok".green(), call.name);
                    }
                    ToolCallOutcome::Error { error } => {
                        println!("      {} {}: {}", "err".red(), call.name, error);
                    }
                }
            }
        }
    }
    println!();
}

/// `--ai-mode` output: the whole assessment serialized as one JSON object
/// per line (JSON Lines), trace always included, so a calling agent can
/// parse results without scraping colored terminal text.
pub fn print_ai_mode(assessment: &RiskAssessment) {
    match serde_json::to_string(assessment) {
        Ok(line) => println!("{line}"),
        Err(e) => println!("{{\"error\":\"failed to serialize assessment: {e}\"}}"),
    }
}

pub fn print_summary(assessments: &[RiskAssessment]) {
    let blocked = assessments.iter().filter(|a| a.should_block).count();
    let total = assessments.len();
    println!(
        "{} file(s) evaluated, {} block{}",
        total,
        if blocked == 0 {
            "0".green()
        } else {
            blocked.to_string().red()
        },
        if blocked == 1 { "" } else { "ed" },
    );
}
