//! Multi-energy demonstrator simulator entry point.

use std::path::Path;
use std::process;

use mes_sim::config::ScenarioConfig;
use mes_sim::runner::run_scenario;

/// Parsed CLI arguments.
struct CliArgs {
    scenario_path: Option<String>,
    step_size_s: Option<f64>,
    end_s: Option<u64>,
    seed_override: Option<u64>,
    voltage_control_disabled: bool,
    out_path: Option<String>,
    print_steps: bool,
}

fn print_help() {
    eprintln!("mes-sim — multi-energy demonstrator simulator");
    eprintln!();
    eprintln!("Usage: mes-sim [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>            Load scenario from TOML config file");
    eprintln!("  --step-size <s>              Override simulation step size in seconds");
    eprintln!("  --end <s>                    Override simulation horizon in seconds");
    eprintln!("  --seed <u64>                 Override random seed");
    eprintln!("  --voltage-control-disabled   Disable the feeder voltage control loop");
    eprintln!("  --out <path>                 Export collected results to CSV");
    eprintln!("  --print-steps                Print one line per simulation step");
    eprintln!("  --help                       Show this help message");
    eprintln!();
    eprintln!("Without --scenario the built-in baseline scenario is used.");
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        scenario_path: None,
        step_size_s: None,
        end_s: None,
        seed_override: None,
        voltage_control_disabled: false,
        out_path: None,
        print_steps: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--scenario" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --scenario requires a path argument");
                    process::exit(1);
                }
                cli.scenario_path = Some(args[i].clone());
            }
            "--step-size" => {
                i += 1;
                let value = args.get(i).and_then(|v| v.parse::<f64>().ok());
                match value {
                    Some(v) if v > 0.0 => cli.step_size_s = Some(v),
                    _ => {
                        eprintln!("error: --step-size requires a positive number of seconds");
                        process::exit(1);
                    }
                }
            }
            "--end" => {
                i += 1;
                match args.get(i).and_then(|v| v.parse::<u64>().ok()) {
                    Some(v) => cli.end_s = Some(v),
                    None => {
                        eprintln!("error: --end requires a number of seconds");
                        process::exit(1);
                    }
                }
            }
            "--seed" => {
                i += 1;
                match args.get(i).and_then(|v| v.parse::<u64>().ok()) {
                    Some(v) => cli.seed_override = Some(v),
                    None => {
                        eprintln!("error: --seed requires a u64 argument");
                        process::exit(1);
                    }
                }
            }
            "--voltage-control-disabled" => {
                cli.voltage_control_disabled = true;
            }
            "--out" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --out requires a path argument");
                    process::exit(1);
                }
                cli.out_path = Some(args[i].clone());
            }
            "--print-steps" => {
                cli.print_steps = true;
            }
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = parse_args();

    let mut scenario = if let Some(ref path) = cli.scenario_path {
        match ScenarioConfig::from_toml_file(Path::new(path)) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("error: {e}");
                process::exit(1);
            }
        }
    } else {
        ScenarioConfig::baseline()
    };

    // CLI overrides mirror the original benchmark's options.
    if let Some(step) = cli.step_size_s {
        scenario.simulation.step_size_s = step;
    }
    if let Some(end) = cli.end_s {
        scenario.simulation.horizon_s = end;
    }
    if let Some(seed) = cli.seed_override {
        scenario.simulation.seed = seed;
    }
    if cli.voltage_control_disabled {
        scenario.simulation.voltage_control_enabled = false;
    }

    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("error: {e}");
        }
        process::exit(1);
    }

    let result = match run_scenario(&scenario) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("error: simulation aborted: {e}");
            process::exit(1);
        }
    };

    if cli.print_steps {
        for r in &result.records {
            println!("{r}");
        }
    }

    println!("{}", result.kpi);

    if let Some(ref path) = cli.out_path {
        if let Err(e) = result.collector.write_to_path(Path::new(path)) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        eprintln!("Results written to {path}");
    }
}
