use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use env_logger::Env;
use serde_json::json;

use lunyard::config::Config;
use lunyard::constants::DEFAULT_REBIND_DELAY_MS;
use lunyard::errors::{exit_code_for, exit_code_for_result, ErrorId};
use lunyard::fs::ops;
use lunyard::logging::LogFacts;
use lunyard::types::OperationResult;
use lunyard::{Lunyard, QuickEditOptions};

#[derive(Parser, Debug)]
#[command(name = "lunyard", about = "Transient read-write access to USB gadget partition images")]
struct Cli {
    /// Path to the YAML configuration
    #[arg(long, default_value = "/etc/lunyard/config.yaml")]
    config: PathBuf,

    /// env_logger-style filter string (e.g. "info,lunyard=debug"); overrides RUST_LOG/defaults
    #[arg(long)]
    log_filter: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Audit gadget state, repairing LUN backings; prints JSON
    Inspect,
    /// Show whether a transition is in flight
    Progress,
    /// Print the current presentation mode
    Mode,
    /// Force the host to re-enumerate the gadget
    Rebind {
        #[arg(long, default_value_t = DEFAULT_REBIND_DELAY_MS)]
        delay_ms: u64,
    },
    /// Copy a local file into a partition
    Copy {
        partition: String,
        src: PathBuf,
        dest: PathBuf,
    },
    /// Remove a file or directory from a partition
    Remove { partition: String, path: PathBuf },
    /// Rename an entry inside a partition
    Rename {
        partition: String,
        from: PathBuf,
        to: PathBuf,
    },
}

const DEFAULT_LOG_FILTER: &str = "info,lunyard::facts=warn";

fn init_logging(cli_filter: Option<&str>) {
    let env = Env::default().default_filter_or(DEFAULT_LOG_FILTER);
    let mut builder = env_logger::Builder::from_env(env);
    if let Some(filter) = cli_filter {
        builder.parse_filters(filter);
    }
    builder.format_timestamp_secs();
    builder.format(|buf, record| {
        let ts = buf.timestamp();
        writeln!(
            buf,
            "[{} {:<5} {}] {}",
            ts,
            record.level(),
            record.target(),
            record.args()
        )
    });
    builder.init();
}

fn report(res: &OperationResult) -> ExitCode {
    println!("{}", json!(res));
    let code = exit_code_for_result(res);
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_filter.as_deref());

    let config = match Config::from_yaml_file(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::from(u8::try_from(exit_code_for(ErrorId::E_CONFIG)).unwrap_or(1));
        }
    };
    let opts = QuickEditOptions::from_timeouts(&config.timeouts);
    let api = Lunyard::new(LogFacts, LogFacts, config);

    match cli.command {
        Command::Inspect => {
            let state = api.check_and_recover_gadget_state();
            println!("{}", json!(state));
            if state.healthy {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(u8::try_from(exit_code_for(ErrorId::E_GADGET)).unwrap_or(1))
            }
        }
        Command::Progress => {
            let st = api.check_operation_in_progress();
            println!(
                "{}",
                json!({
                    "in_progress": st.in_progress,
                    "lock_age_secs": st.lock_age.map(|a| a.as_secs()),
                    "estimated_seconds_remaining": st.estimated_seconds_remaining,
                })
            );
            ExitCode::SUCCESS
        }
        Command::Mode => {
            println!("{}", api.current_mode().as_str());
            ExitCode::SUCCESS
        }
        Command::Rebind { delay_ms } => report(&api.rebind(Duration::from_millis(delay_ms))),
        Command::Copy {
            partition,
            src,
            dest,
        } => report(&api.edit(&partition, move |w| ops::copy_into(w, &src, &dest), opts)),
        Command::Remove { partition, path } => {
            report(&api.edit(&partition, move |w| ops::remove(w, &path), opts))
        }
        Command::Rename {
            partition,
            from,
            to,
        } => report(&api.edit(&partition, move |w| ops::rename(w, &from, &to), opts)),
    }
}
