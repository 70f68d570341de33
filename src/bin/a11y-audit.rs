//! a11y-audit CLI
//!
//! Runs the built-in checkers over a page snapshot (JSON or HTML), or over a
//! live page with the `chrome` feature, and prints the diagnostic records.

use anyhow::{bail, Context};
use browser_a11y::audit::{issue_schema, AccessibilityIssue, IssueSummary, Severity};
use browser_a11y::dom::ColorScheme;
use browser_a11y::{rules, AuditConfig, AuditSession, Document};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use url::Url;

/// Accessibility audit for page snapshots and live pages
#[derive(Parser, Debug)]
#[command(name = "a11y-audit")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Page snapshot to audit (.json tree snapshot, anything else is parsed as HTML)
    #[arg(long, short)]
    snapshot: Option<PathBuf>,

    /// Live page to capture and audit
    #[cfg(feature = "chrome")]
    #[arg(long)]
    url: Option<String>,

    /// Show the browser window while capturing
    #[cfg(feature = "chrome")]
    #[arg(long)]
    headed: bool,

    /// Base URL for resolving relative links in a snapshot
    #[arg(long)]
    base_url: Option<String>,

    /// Rule to run (repeatable); defaults to every rule the config enables
    #[arg(long = "rule", short)]
    rules: Vec<String>,

    /// JSON config file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "text")]
    format: FormatArg,

    /// Also print the annotated markup
    #[arg(long)]
    annotated: bool,

    /// Audit with the dark color scheme active
    #[arg(long)]
    dark: bool,

    /// Print the JSON schema of the issue record and exit
    #[arg(long)]
    schema: bool,

    /// List the built-in rules and exit
    #[arg(long)]
    list_rules: bool,

    /// Enable verbose logging
    #[arg(long, short)]
    verbose: bool,
}

/// Output format CLI argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    /// Human-readable text
    Text,
    /// Structured JSON
    Json,
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.schema {
        println!("{}", serde_json::to_string_pretty(&issue_schema()?)?);
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => AuditConfig::from_file(path)?,
        None => AuditConfig::default(),
    };
    if !cli.rules.is_empty() {
        config = config.rules(cli.rules.iter().cloned());
    }

    if cli.list_rules {
        for checker in rules::enabled_checkers(&AuditConfig::default())? {
            println!("{:<24} {:<12} {}", checker.rule_id(), checker.category(), checker.rule_name());
        }
        return Ok(());
    }

    let mut document = load_document(&cli)?;
    if let Some(base) = &cli.base_url {
        let url = Url::parse(base).with_context(|| format!("invalid --base-url '{}'", base))?;
        document = document.with_base_url(url);
    }
    if cli.dark {
        document.set_color_scheme(ColorScheme::Dark);
    }

    let mut session = AuditSession::new(document, config)?;
    for (rule_id, outcome) in session.apply_all() {
        log::info!("{}: success={}", rule_id, outcome.success);
    }

    let issues = session.issues();
    let annotated = cli.annotated.then(|| session.document().to_html());
    session.cleanup_all();

    match cli.format {
        FormatArg::Json => {
            let report = serde_json::json!({
                "issues": issues,
                "summary": IssueSummary::from_issues(&issues),
                "annotated": annotated,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        FormatArg::Text => {
            print!("{}", render_text(&issues));
            if let Some(html) = annotated {
                println!();
                println!("{}", html);
            }
        }
    }

    if IssueSummary::worst(&issues).is_some_and(|s| s >= Severity::High) {
        std::process::exit(1);
    }
    Ok(())
}

fn load_document(cli: &Cli) -> anyhow::Result<Document> {
    #[cfg(feature = "chrome")]
    if let Some(url) = &cli.url {
        use browser_a11y::{BrowserSession, LaunchOptions};

        let session = BrowserSession::launch(LaunchOptions::new().headless(!cli.headed))?;
        session.navigate(url)?;
        return Ok(session.capture_document()?);
    }

    match &cli.snapshot {
        Some(path) => read_snapshot(path),
        None => bail!("nothing to audit: pass --snapshot <file>{}", url_hint()),
    }
}

fn read_snapshot(path: &Path) -> anyhow::Result<Document> {
    let text = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        Ok(Document::from_json(&text)?)
    } else {
        Ok(Document::from_html(&text))
    }
}

fn url_hint() -> &'static str {
    if cfg!(feature = "chrome") { " or --url <page>" } else { "" }
}

fn render_text(issues: &[AccessibilityIssue]) -> String {
    if issues.is_empty() {
        return "No accessibility issues found.\n".to_string();
    }

    let mut out = String::new();
    for issue in issues {
        out.push_str(&format!("[{}] {}: {}\n", issue.severity, issue.rule_id, issue.message));
        out.push_str(&format!("  at {} ({})\n", issue.location.selector, issue.location.context));
        match &issue.evidence.expected {
            Some(expected) => out.push_str(&format!("  found {}, expected {}\n", issue.evidence.found, expected)),
            None => out.push_str(&format!("  found {}\n", issue.evidence.found)),
        }
        out.push_str(&format!("  fix: {}\n", issue.fix.description));
    }

    let summary = IssueSummary::from_issues(issues);
    let known: Vec<String> = Severity::ALL.iter().map(|s| s.to_string()).collect();
    let mut counts: Vec<String> = known
        .iter()
        .filter_map(|s| summary.by_severity.get(s).map(|n| format!("{} {}", n, s)))
        .collect();
    counts.extend(
        summary
            .by_severity
            .iter()
            .filter(|(level, _)| !known.contains(level))
            .map(|(level, n)| format!("{} {}", n, level)),
    );
    out.push_str(&format!("\n{} issue(s): {}\n", summary.total, counts.join(", ")));
    out
}
