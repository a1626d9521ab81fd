use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use sc_cli::config::InterpreterConfig;
use sc_cli::event_parser::parse_event;
use sc_cli::fixture::StatechartFixture;
use sc_core::Interpreter;
use sc_eval::{DynamicEvaluator, NoCodeEvaluator};
use sc_runtime::{StateChartTester, Tracer};

#[derive(Parser)]
#[command(name = "sc", about = "statechart interpreter: execute, validate and test .sc.ron fixtures")]
struct Cli {
    /// Optional TOML config file (defaults apply otherwise).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a statechart and print its step-by-step trace.
    Execute {
        infile: PathBuf,
        /// Use the structural no-code evaluator instead of the dynamic one.
        #[arg(long)]
        no_code: bool,
        /// Bound on the number of macro-steps (<= 0 is unbounded).
        #[arg(short = 'l', long, default_value_t = -1)]
        max_steps: i64,
        /// Events to send before running, in wire form `name[:key=value...]`.
        #[arg(long)]
        events: Vec<String>,
        /// Verbosity: repeat for more detail (1 transitions, 2 events +
        /// configuration, 3 state enter/exit).
        #[arg(short, action = clap::ArgAction::Count)]
        verbose: u8,
    },
    /// Structural validation only.
    Validate { infile: PathBuf },
    /// Run the tester harness against one tested statechart.
    Test {
        infile: PathBuf,
        #[arg(long = "tests", required = true)]
        tests: Vec<PathBuf>,
        #[arg(long)]
        no_code: bool,
        #[arg(short = 'l', long, default_value_t = -1)]
        max_steps: i64,
        #[arg(long)]
        events: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let interpreter_config = match &cli.config {
        Some(path) => InterpreterConfig::load(path)?,
        None => InterpreterConfig::default(),
    };
    sc_runtime::init_tracing(&interpreter_config.log.level, interpreter_config.log.json)?;

    match cli.command {
        Commands::Execute { infile, no_code, max_steps, events, verbose } => cli_execute(&infile, no_code, max_steps, &events, verbose),
        Commands::Validate { infile } => cli_validate(&infile),
        Commands::Test { infile, tests, no_code, max_steps, events } => cli_test(&infile, &tests, no_code, max_steps, &events),
    }
}

fn build_interpreter(infile: &PathBuf, no_code: bool, silent_contract: bool) -> Result<Interpreter> {
    let statechart = StatechartFixture::load(infile)?;
    let evaluator_factory: Box<dyn Fn() -> Box<dyn sc_core::Evaluator>> =
        if no_code { Box::new(|| Box::new(NoCodeEvaluator)) } else { Box::new(|| Box::new(DynamicEvaluator::new())) };
    Ok(Interpreter::new(statechart, evaluator_factory, silent_contract)?)
}

fn cli_execute(infile: &PathBuf, no_code: bool, max_steps: i64, events: &[String], verbose: u8) -> Result<()> {
    let mut interpreter = build_interpreter(infile, no_code, false)?;

    if verbose >= 1 {
        println!("Initial configuration: {}", interpreter.configuration().join(", "));
    }

    for wire in events {
        interpreter.send(parse_event(wire)?);
    }
    if verbose >= 2 {
        println!("Events sent: {}", events.join(", "));
    }

    let mut tracer = Tracer::new();
    let mut step_count = 0;
    while max_steps <= 0 || step_count < max_steps {
        let step = tracer.execute_once(&mut interpreter)?;
        let Some(step) = step else { break };
        step_count += 1;

        if verbose >= 1 {
            print!("Step {step_count} - ");
        }
        if verbose >= 2 {
            println!("Considered event: {:?}", step.event().map(|e| e.name.as_str()));
        }
        if verbose >= 1 {
            let transitions: Vec<String> =
                step.transitions().iter().map(|t| format!("{} -> {:?}", t.from_state, t.to_state)).collect();
            println!("Transitions: [{}]", transitions.join(", "));
        }
        if verbose >= 3 {
            println!("Exited states: {}", step.exited().join(", "));
            println!("Entered states: {}", step.entered().join(", "));
        }
        if verbose >= 2 {
            println!("Configuration: {}", interpreter.configuration().join(", "));
        }
    }

    println!("Final: {}", !interpreter.running());
    Ok(())
}

fn cli_validate(infile: &PathBuf) -> Result<()> {
    match StatechartFixture::load(infile) {
        Ok(_) => println!("Statechart validates."),
        Err(e) => println!("Statechart does not validate. Cause: {e}"),
    }
    Ok(())
}

fn cli_test(infile: &PathBuf, tests: &[PathBuf], no_code: bool, max_steps: i64, events: &[String]) -> Result<()> {
    let tested = build_interpreter(infile, no_code, false)?;

    let mut named_testers = Vec::with_capacity(tests.len());
    for test in tests {
        let tester = build_interpreter(test, no_code, false)?;
        let label = test.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_else(|| test.display().to_string());
        named_testers.push((label, tester));
    }

    let parsed_events = events.iter().map(|wire| parse_event(wire)).collect::<Result<Vec<_>>>()?;
    let mut harness = StateChartTester::new(tested, named_testers, parsed_events).context("failed to build tester harness")?;

    match harness.execute(max_steps) {
        Ok(_) => {
            harness.stop().context("a tester rejected the stop event")?;
            println!("All tests passed");
        }
        Err(e) => println!("{e}"),
    }
    Ok(())
}
