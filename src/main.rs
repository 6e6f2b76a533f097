use anyhow::Context;
use clap::{Args, ColorChoice, CommandFactory, FromArgMatches, Parser, Subcommand};
use colored::Colorize;
use serde_json::{Map, Value};
use std::io::{IsTerminal, Read, stdout};
use std::path::PathBuf;
use std::sync::Arc;
use synthsense::check;
use synthsense::config::FusionConfig;
use synthsense::engine::FusionEngine;
use synthsense::fingerprint::GeneratorRegistry;
use synthsense::fusion::VerdictLabel;
use synthsense::schema::{AnalysisRequest, FusionReport, REPORT_FIELDS};

fn check_predicate_long_help() -> &'static str {
    check::check_predicate_long_help()
}

#[derive(Parser)]
#[command(
    name = "synthsense",
    about = "Fuse synthetic-image detector outputs into a calibrated verdict",
    arg_required_else_help = true
)]
struct Cli {
    /// Disable color
    #[arg(long = "no-color", global = true)]
    no_color: bool,

    /// Config file (defaults to $SYNTHSENSE_CONFIG or the user config dir)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Generator registry TOML (defaults to the built-in signatures)
    #[arg(long, global = true, value_name = "PATH")]
    registry: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze an AnalysisRequest JSON document
    Analyze(AnalyzeArgs),
    /// Evaluate predicates against the fusion report
    Check(CheckCmd),
    /// List the generator signatures in the registry
    Generators,
    /// Print the effective configuration as TOML
    Config,
    /// Print the JSON schema of the fusion report
    Schema,
}

#[derive(Args, Clone)]
struct AnalyzeArgs {
    /// Request file, or '-' for stdin
    #[arg(value_name = "FILE", default_value = "-")]
    input: String,

    /// Output JSON (stable schema)
    #[arg(long)]
    json: bool,

    /// Comma-separated report keys to include
    #[arg(long, value_name = "list")]
    fields: Option<String>,
}

#[derive(Args, Clone)]
pub struct CheckCmd {
    /// Request file, or '-' for stdin
    #[arg(long, short, value_name = "FILE", default_value = "-")]
    pub input: String,

    /// Predicates to evaluate
    #[arg(
        value_name = "PREDICATE",
        help = "Predicates to evaluate",
        long_help = check_predicate_long_help()
    )]
    pub predicates: Vec<String>,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,

    /// Suppress output (useful in scripts)
    #[arg(short, long)]
    pub quiet: bool,

    /// Use ANY mode (default is ALL)
    #[arg(long)]
    pub any: bool,
}

fn load_engine(config: Option<&PathBuf>, registry: Option<&PathBuf>) -> anyhow::Result<FusionEngine> {
    let config = match config {
        Some(path) => FusionConfig::from_path(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => FusionConfig::load(),
    };
    let registry = match registry {
        Some(path) => GeneratorRegistry::from_path(path)
            .with_context(|| format!("loading registry {}", path.display()))?,
        None => GeneratorRegistry::builtin(),
    };
    Ok(FusionEngine::new()
        .with_config(config)?
        .with_registry(Arc::new(registry)))
}

fn read_request(input: &str) -> anyhow::Result<AnalysisRequest> {
    let content = if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading request from stdin")?;
        buf
    } else {
        std::fs::read_to_string(input).with_context(|| format!("reading {}", input))?
    };
    serde_json::from_str(&content).with_context(|| format!("parsing request {}", input))
}

fn run_report(cli: &Cli, input: &str) -> Result<FusionReport, i32> {
    let result = load_engine(cli.config.as_ref(), cli.registry.as_ref()).and_then(|engine| {
        let request = read_request(input)?;
        Ok(engine.analyze(&request)?)
    });
    result.map_err(|e| {
        eprintln!("Error: {:#}", e);
        2
    })
}

fn filter_json_fields(value: Value, fields: &str) -> Result<Value, String> {
    let requested: Vec<&str> = fields
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    let obj = value
        .as_object()
        .ok_or_else(|| "expected object".to_string())?;
    let mut map = Map::new();
    for k in requested {
        if let Some(v) = obj.get(k) {
            map.insert(k.to_string(), v.clone());
        } else {
            return Err(format!("unknown field: {}", k));
        }
    }
    Ok(Value::Object(map))
}

fn heading(text: &str, color: bool) -> String {
    if color {
        text.bold().cyan().to_string()
    } else {
        text.to_string()
    }
}

fn colorize_label(label: VerdictLabel, text: &str, color: bool) -> String {
    if !color {
        return text.to_string();
    }
    match label {
        VerdictLabel::AiGenerated | VerdictLabel::LikelyAi => text.red().bold().to_string(),
        VerdictLabel::Uncertain => text.yellow().to_string(),
        VerdictLabel::LikelyReal | VerdictLabel::Real => text.green().to_string(),
    }
}

/// The serialized (wire) name of a unit enum variant.
fn wire_name<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

fn render_section(report: &FusionReport, field: &str, color: bool, out: &mut String) {
    match field {
        "summary" => out.push_str(&report.summary),
        "version" => out.push_str(&format!("{} {}", heading("Version:", color), report.version)),
        "verdict" => {
            let v = &report.verdict;
            out.push_str(&heading("Verdict:", color));
            out.push(' ');
            out.push_str(&colorize_label(v.label, &wire_name(&v.label), color));
            out.push_str(&format!(
                "\n  raw = {:.3}\n  calibrated = {:.3}\n  trust = {:.3}\n  recommendation = {}",
                v.raw_score,
                v.calibrated_score,
                v.trust_score,
                wire_name(&v.recommendation)
            ));
        }
        "disagreement" => {
            let d = &report.disagreement;
            out.push_str(&heading("Disagreement:", color));
            out.push_str(&format!(
                "\n  score = {:.3}\n  std_dev = {:.3}\n  range = {:.3}\n  classification = {}",
                d.score,
                d.std_dev,
                d.range,
                wire_name(&d.classification)
            ));
            for pair in &d.conflicting_pairs {
                out.push_str(&format!("\n  conflict: {} vs {}", pair.first, pair.second));
            }
        }
        "weights" => {
            out.push_str(&heading("Weights:", color));
            if report.weights.degraded {
                out.push_str(" (static prior)");
            }
            for entry in &report.weights.entries {
                out.push_str(&format!("\n  {} = {:.3}", entry.detector, entry.weight));
            }
        }
        "adjustments" => {
            out.push_str(&heading("Adjustments:", color));
            for adj in &report.adjustments {
                out.push_str(&format!("\n  {}: {}", adj.detector, adj.reason));
            }
        }
        "spatial" => {
            out.push_str(&heading("Spatial:", color));
            match &report.spatial {
                None => out.push_str(" none"),
                Some(s) => {
                    out.push_str(&format!(
                        "\n  uniformity = {:.3}\n  composite = {}",
                        s.uniformity_score, s.is_composite
                    ));
                    for row in 0..s.grid.rows {
                        out.push_str("\n  ");
                        let cells: Vec<String> = (0..s.grid.cols)
                            .filter_map(|col| s.grid.cell(row, col))
                            .map(|c| format!("{:.2}", c.score))
                            .collect();
                        out.push_str(&cells.join(" "));
                    }
                    for h in &s.hotspots {
                        out.push_str(&format!(
                            "\n  hotspot {} = {:.2} ({})",
                            h.position,
                            h.score,
                            wire_name(&h.severity)
                        ));
                    }
                }
            }
        }
        "uncertainty" => {
            let u = &report.uncertainty;
            out.push_str(&heading("Uncertainty:", color));
            out.push_str(&format!(
                "\n  prediction = {:.3} [{:.3}, {:.3}] @ {:.0}%\n  aleatoric = {:.3}\n  epistemic = {:.3}\n  total = {:.3}\n  reliability = {} ({:.2})\n  reason = {}",
                u.prediction,
                u.confidence_interval.lower,
                u.confidence_interval.upper,
                u.confidence_interval.level * 100.0,
                u.decomposition.aleatoric,
                u.decomposition.epistemic,
                u.decomposition.total,
                u.reliability.level.as_str(),
                u.reliability.score,
                u.reliability.reason
            ));
        }
        "attribution" => {
            out.push_str(&heading("Attribution:", color));
            match &report.attribution {
                None => out.push_str(" none"),
                Some(a) => {
                    out.push_str(&format!(
                        "\n  source = {}\n  ai_generated = {}\n  ai_confidence = {:.3}\n  generator = {}",
                        a.source_detector,
                        a.is_ai_generated,
                        a.ai_confidence,
                        a.identified_generator.as_deref().unwrap_or("none")
                    ));
                    for m in a.all_matches.iter().take(3) {
                        out.push_str(&format!(
                            "\n  match {} = {:.3} [{}]",
                            m.name,
                            m.confidence,
                            m.matching_features.join(", ")
                        ));
                    }
                }
            }
        }
        "fingerprint_rejections" => {
            out.push_str(&heading("Rejected fingerprints:", color));
            for r in &report.fingerprint_rejections {
                out.push_str(&format!("\n  {}: {}", r.detector, r.reason));
            }
        }
        _ => {}
    }
}

fn render_human(report: &FusionReport, fields: Option<&str>, color: bool) -> Result<String, String> {
    let default_fields = ["summary", "verdict", "weights", "spatial", "uncertainty", "attribution"];
    let selected: Vec<&str> = match fields {
        Some(f) => f
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect(),
        None => default_fields.to_vec(),
    };
    for s in &selected {
        if !REPORT_FIELDS.contains(s) {
            return Err(format!("unknown field: {}", s));
        }
    }
    let mut out = String::new();
    for (i, field) in selected.iter().enumerate() {
        render_section(report, field, color, &mut out);
        if i + 1 < selected.len() {
            out.push('\n');
        }
    }
    Ok(out)
}

fn run_analyze(cli: &Cli, args: &AnalyzeArgs, color: ColorChoice) -> Result<(), i32> {
    let report = run_report(cli, &args.input)?;
    if args.json {
        let mut v = serde_json::to_value(&report).map_err(|_| 3)?;
        if let Some(f) = args.fields.as_deref() {
            v = filter_json_fields(v, f).map_err(|e| {
                eprintln!("{}", e);
                2
            })?;
        }
        match serde_json::to_string_pretty(&v) {
            Ok(s) => println!("{}", s),
            Err(_) => return Err(3),
        }
    } else {
        let want_color = stdout().is_terminal() && !matches!(color, ColorChoice::Never);
        let rendered = render_human(&report, args.fields.as_deref(), want_color).map_err(|e| {
            eprintln!("{}", e);
            2
        })?;
        println!("{}", rendered);
    }
    Ok(())
}

fn run_check(cli: &Cli, args: &CheckCmd) -> Result<(), i32> {
    if args.predicates.is_empty() {
        eprintln!("Error: no predicates specified");
        return Err(2);
    }

    let mut parsed = Vec::with_capacity(args.predicates.len());
    for predicate in &args.predicates {
        match check::parse_predicate(predicate) {
            Ok(p) => parsed.push(p),
            Err(e) => {
                eprintln!("Error parsing '{}': {}", predicate, e);
                return Err(2);
            }
        }
    }

    let report = run_report(cli, &args.input)?;
    let results: Vec<_> = args
        .predicates
        .iter()
        .zip(&parsed)
        .map(|(predicate, p)| check::evaluate(&report, predicate, p))
        .collect();
    let overall = check::overall(&results, args.any);

    if !args.quiet {
        println!(
            "{}",
            check::render_results(&results, overall, args.any, args.json)
        );
    }

    if overall { Ok(()) } else { Err(1) }
}

fn run_generators(cli: &Cli, color: ColorChoice) -> Result<(), i32> {
    let engine = load_engine(cli.config.as_ref(), cli.registry.as_ref()).map_err(|e| {
        eprintln!("Error: {:#}", e);
        2
    })?;
    let want_color = stdout().is_terminal() && !matches!(color, ColorChoice::Never);
    for sig in engine.registry().iter() {
        let name = if want_color {
            sig.name.bold().to_string()
        } else {
            sig.name.clone()
        };
        let kind = if sig.is_real_photo() { "real_photo" } else { "generator" };
        println!("{} ({})", name, kind);
        if !sig.characteristics.is_empty() {
            println!("  {}", sig.characteristics.join(", "));
        }
    }
    Ok(())
}

fn run_config(cli: &Cli) -> Result<(), i32> {
    let engine = load_engine(cli.config.as_ref(), None).map_err(|e| {
        eprintln!("Error: {:#}", e);
        2
    })?;
    match engine.config().to_toml_string() {
        Ok(s) => {
            print!("{}", s);
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            Err(3)
        }
    }
}

fn run_schema() -> Result<(), i32> {
    let schema = schemars::schema_for!(FusionReport);
    match serde_json::to_string_pretty(&schema) {
        Ok(s) => {
            println!("{}", s);
            Ok(())
        }
        Err(_) => Err(3),
    }
}

fn detect_color_choice() -> ColorChoice {
    // Scan args before clap so help/errors honor `--no-color`.
    let mut args = std::env::args_os();
    args.next();
    let mut flag = false;
    for arg in args {
        if arg == "--" {
            break;
        }
        if arg == "--no-color" {
            flag = true;
            break;
        }
    }
    if flag || std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty()) {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    let color = detect_color_choice();
    let matches = Cli::command().color(color).get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());
    if cli.no_color {
        colored::control::set_override(false);
    }

    let result = match &cli.command {
        Some(Commands::Analyze(args)) => run_analyze(&cli, args, color),
        Some(Commands::Check(args)) => run_check(&cli, args),
        Some(Commands::Generators) => run_generators(&cli, color),
        Some(Commands::Config) => run_config(&cli),
        Some(Commands::Schema) => run_schema(),
        None => Ok(()),
    };
    if let Err(code) = result {
        std::process::exit(code);
    }
}
