//! reportd - keeps report artifacts up to date in the background.
//!
//! # サブコマンド
//! - `start <dir>`: daemon として起動（SIGTERM で drain して 143 で終了）
//! - `run <dir>`: 同じループを foreground で（record なし）
//! - `status <dir>`: pid を表示
//! - `stop <dir> [--group]`: SIGTERM を送る（exit 0 / 1 / 2）
//!
//! No `#[tokio::main]`: `start` forks, and the runtime must be created after that.

mod recipe;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use reportd_core::config::{DEFAULT_SERVICE_NAME, DEFAULT_WORKERS};
use reportd_core::domain::ServiceError;
use reportd_core::{
    SchedulerConfig, ServiceControl, ServiceStatus, StopOutcome, StopScope, SupervisorConfig,
};
use tracing_subscriber::EnvFilter;

use crate::recipe::RecipeRegenerator;

#[derive(Parser, Debug)]
#[command(name = "reportd")]
#[command(version)]
#[command(about = "Regenerates report artifacts in the background")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Detach and run the regeneration loop until SIGTERM
    Start(ServeArgs),

    /// Run the regeneration loop in the foreground
    Run(ServeArgs),

    /// Show whether the daemon of a directory is running
    Status(TargetArgs),

    /// Ask the daemon of a directory to drain and exit
    Stop {
        #[command(flatten)]
        target: TargetArgs,

        /// Signal the whole process group instead of the daemon only
        #[arg(long)]
        group: bool,
    },
}

#[derive(clap::Args, Debug)]
struct TargetArgs {
    /// Working directory of the service
    #[arg(default_value = ".")]
    dir: PathBuf,

    /// Service name; the record is `<dir>/<service>.pid`
    #[arg(long, default_value = DEFAULT_SERVICE_NAME)]
    service: String,
}

#[derive(clap::Args, Debug)]
struct ServeArgs {
    #[command(flatten)]
    target: TargetArgs,

    /// Recipe file, relative to the working directory
    #[arg(long, default_value = "reportd.json")]
    recipe: PathBuf,

    /// Seconds between regeneration cycles
    #[arg(long, default_value = "60", value_parser = parse_secs)]
    interval: Duration,

    /// Seconds between stop-request checks
    #[arg(long, default_value = "1", value_parser = parse_secs)]
    poll: Duration,

    /// Number of producers that may run at once
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,
}

impl ServeArgs {
    fn config(&self) -> SupervisorConfig {
        SupervisorConfig {
            service_name: self.target.service.clone(),
            interval: self.interval,
            poll_interval: self.poll,
            scheduler: SchedulerConfig::with_workers(self.workers),
        }
    }
}

fn parse_secs(value: &str) -> Result<Duration, String> {
    let secs: f64 = value.parse().map_err(|e| format!("{e}"))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("{e}"))
}

fn absolute(dir: &Path) -> Result<PathBuf, ServiceError> {
    std::path::absolute(dir).map_err(|source| ServiceError::Record {
        path: dir.to_path_buf(),
        source,
    })
}

fn run(command: Commands) -> Result<u8, ServiceError> {
    match command {
        Commands::Start(args) => {
            let control = ServiceControl::new(absolute(&args.target.dir)?, &args.target.service);
            control.start(RecipeRegenerator::new(&args.recipe), args.config())
        }
        Commands::Run(args) => {
            let control = ServiceControl::new(absolute(&args.target.dir)?, &args.target.service);
            control.run_foreground(RecipeRegenerator::new(&args.recipe), args.config())
        }
        Commands::Status(target) => {
            let control = ServiceControl::new(absolute(&target.dir)?, &target.service);
            match control.status() {
                ServiceStatus::Running { pid, .. } => {
                    println!("running (pid {pid})");
                    Ok(0)
                }
                ServiceStatus::NotRunning => {
                    println!("not running");
                    Ok(StopOutcome::NotRunning.exit_code())
                }
            }
        }
        Commands::Stop { target, group } => {
            let control = ServiceControl::new(absolute(&target.dir)?, &target.service);
            let scope = if group {
                StopScope::Group
            } else {
                StopScope::Process
            };
            let outcome = control.stop(scope);
            println!("{outcome}");
            Ok(outcome.exit_code())
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match run(args.command) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            tracing::error!(error = %err, "reportd failed");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn serve_args_build_a_valid_config() {
        let args = Args::try_parse_from([
            "reportd", "run", "/srv/reports", "--interval", "0.5", "--poll", "0.1", "--workers", "2",
        ])
        .unwrap();
        let Commands::Run(serve) = args.command else {
            panic!("expected run");
        };

        let config = serve.config();
        assert_eq!(serve.target.dir, PathBuf::from("/srv/reports"));
        assert_eq!(config.interval, Duration::from_millis(500));
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.scheduler.workers, 2);
        assert_eq!(config.service_name, "reportd");
        config.validate().unwrap();
    }

    #[test]
    fn stop_defaults_to_the_current_directory() {
        let args = Args::try_parse_from(["reportd", "stop", "--group"]).unwrap();
        let Commands::Stop { target, group } = args.command else {
            panic!("expected stop");
        };
        assert!(group);
        assert_eq!(target.dir, PathBuf::from("."));
    }

    #[test]
    fn negative_durations_are_rejected() {
        assert!(parse_secs("-1").is_err());
        assert!(parse_secs("abc").is_err());
        assert_eq!(parse_secs("2").unwrap(), Duration::from_secs(2));
    }

    #[test]
    fn stop_and_status_without_daemon() {
        let dir = tempfile::tempdir().unwrap();
        let target = TargetArgs {
            dir: dir.path().to_path_buf(),
            service: "reportd".into(),
        };
        assert_eq!(run(Commands::Status(target)).unwrap(), 2);

        let target = TargetArgs {
            dir: dir.path().to_path_buf(),
            service: "reportd".into(),
        };
        assert_eq!(
            run(Commands::Stop {
                target,
                group: false
            })
            .unwrap(),
            2
        );
    }
}
