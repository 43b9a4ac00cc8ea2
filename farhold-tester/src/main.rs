mod logic;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use logic::scenarios::ScenarioOutcome;
use logic::{get_scenario, list_scenarios, resolve_seed_inputs};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TestMode {
    /// Run the scenario catalog selected by --scenarios
    Scenarios,
    /// Run only the same-seed divergence check
    Determinism,
    /// Run only the multi-turn campaign
    Campaign,
}

#[derive(Debug, Parser)]
#[command(name = "farhold-tester", version)]
#[command(about = "Automated scenario and determinism testing for the Farhold turn engine")]
struct Args {
    /// Test mode: scenarios, determinism, or campaign
    #[arg(long, value_enum, default_value_t = TestMode::Scenarios)]
    mode: TestMode,

    /// Scenarios to run (comma-separated, or "all")
    #[arg(long, default_value = "all")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to run (comma-separated numbers, FH- share codes, or "random")
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Turn cap for campaign and determinism runs
    #[arg(long, default_value_t = 30)]
    turns: u32,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["console", "json", "markdown"])]
    report: String,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_scenarios(&args)? {
        return Ok(());
    }

    announce_banner();

    let start_time = Instant::now();
    let seed_infos = resolve_seed_inputs(&split_csv(&args.seeds))?;
    let scenario_keys = scenario_keys_for(&args);

    let mut outcomes: Vec<ScenarioOutcome> = Vec::new();
    for key in &scenario_keys {
        let Some(scenario) = get_scenario(key) else {
            eprintln!("⚠️  Unknown scenario: {}", key.yellow());
            continue;
        };
        for info in &seed_infos {
            outcomes.push(scenario.run(info, args.turns, args.verbose));
        }
    }

    write_reports(&args, &outcomes, start_time)?;

    if outcomes.iter().any(|outcome| !outcome.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_scenarios(args: &Args) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(output_target.writer(), "  {key:18} - {description}")?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🚀 Farhold Automated Tester".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

fn scenario_keys_for(args: &Args) -> Vec<String> {
    match args.mode {
        TestMode::Determinism => vec!["determinism".to_string()],
        TestMode::Campaign => vec!["campaign".to_string()],
        TestMode::Scenarios => {
            let mut keys = split_csv(&args.scenarios);
            if keys.contains(&"all".to_string()) {
                keys.retain(|key| key != "all");
                for (key, _) in list_scenarios() {
                    if !keys.contains(&key.to_string()) {
                        keys.push(key.to_string());
                    }
                }
            }
            keys
        }
    }
}

fn write_reports(args: &Args, outcomes: &[ScenarioOutcome], start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => logic::report::generate_json_report(&mut output_target, outcomes)?,
        "markdown" => logic::report::generate_markdown_report(&mut output_target, outcomes)?,
        _ => {
            let duration = start_time.elapsed();
            logic::report::generate_console_report(&mut output_target, outcomes, duration)?;
            writeln!(&mut output_target)?;
            writeln!(&mut output_target, "🏁 Total time: {duration:?}")?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
