//! NoteCanvas replay tool: runs a gesture script through the history engine.
//!
//! ```text
//! nc-replay [--config history.json] [--max-history N] [--merge-window MS] [--json] script.ncs
//! ```
//!
//! `--max-history` and `--merge-window` override the config file.
//!
//! Every step is applied to an in-memory store; `history` steps print the
//! undo/redo stacks. With `--json`, the final stacks are printed as JSON.
//! Set `RUST_LOG=debug` to see merges and evictions.

mod runner;
mod script;

use nc_history::HistoryConfig;
use runner::Runner;
use std::num::NonZeroUsize;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Debug)]
struct Args {
    config: Option<String>,
    max_history: Option<NonZeroUsize>,
    merge_window_ms: Option<u64>,
    json: bool,
    script: String,
}

const USAGE: &str =
    "usage: nc-replay [--config FILE] [--max-history N] [--merge-window MS] [--json] SCRIPT";

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut config = None;
    let mut max_history = None;
    let mut merge_window_ms = None;
    let mut json = false;
    let mut script = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                config = Some(args.next().ok_or("--config needs a file")?);
            }
            "--max-history" => {
                let value = args.next().ok_or("--max-history needs a number")?;
                let max = value
                    .parse()
                    .map_err(|_| format!("--max-history: {value:?} is not a positive integer"))?;
                max_history = Some(max);
            }
            "--merge-window" => {
                let value = args.next().ok_or("--merge-window needs milliseconds")?;
                let ms = value
                    .parse()
                    .map_err(|_| format!("--merge-window: {value:?} is not a number of ms"))?;
                merge_window_ms = Some(ms);
            }
            "--json" => json = true,
            "-h" | "--help" => return Err(USAGE.to_string()),
            _ if script.is_none() => script = Some(arg),
            _ => return Err(format!("unexpected argument {arg:?}\n{USAGE}")),
        }
    }
    Ok(Args {
        config,
        max_history,
        merge_window_ms,
        json,
        script: script.ok_or(USAGE)?,
    })
}

fn load_config(args: &Args) -> Result<HistoryConfig, String> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|e| format!("{path}: {e}"))?;
            serde_json::from_str(&text).map_err(|e| format!("{path}: {e}"))?
        }
        None => HistoryConfig::default(),
    };
    if let Some(max) = args.max_history {
        config = config.with_max_history_size(max);
    }
    if let Some(ms) = args.merge_window_ms {
        config = config.with_merge_window(Duration::from_millis(ms));
    }
    Ok(config)
}

async fn run(args: Args) -> Result<usize, String> {
    let config = load_config(&args)?;
    log::debug!("history config: {config:?}");

    let text =
        std::fs::read_to_string(&args.script).map_err(|e| format!("{}: {e}", args.script))?;
    let steps = script::parse_script(&text)?;

    let mut runner = Runner::new(config);
    let mut failures = 0;
    for line in &steps {
        match runner.run(&line.step).await {
            Ok(output) => {
                for out in output {
                    println!("{out}");
                }
            }
            Err(e) => {
                failures += 1;
                eprintln!("line {}: {e}", line.line);
            }
        }
    }

    if args.json {
        let report = serde_json::json!({
            "flags": runner.engine().flags(),
            "undo": runner.engine().undo_list(),
            "redo": runner.engine().redo_list(),
        });
        let pretty = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
        println!("{pretty}");
    }
    Ok(failures)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };

    match run(args).await {
        Ok(0) => ExitCode::SUCCESS,
        Ok(failures) => {
            eprintln!("{failures} step(s) failed");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
