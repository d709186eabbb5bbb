//! CLI entry point for tscwatch.
//!
//! Compiles every TypeScript file under a root directory into a mirrored
//! JavaScript tree, once or continuously.
//!
//! # Usage
//!
//! ```bash
//! tscwatch [OPTIONS] <COMMAND>
//!
//! # Compile src/ into build/ and exit
//! tscwatch build src build
//!
//! # Keep build/ up to date while editing, with source maps
//! tscwatch watch src build --sourcemap
//!
//! # Everything from a JSON settings file
//! tscwatch run-config tscwatch.json
//! ```
//!
//! Exit codes: `0` on success or a requested stop, `1` on a fatal error,
//! `2` when a one-shot build finished with failed files.

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::process::ExitCode;
use std::sync::Arc;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use tw_backend::TreeSitterBackend;
use tw_build::{Dispatcher, ExitStatus, FatalError, report_fatal};
use tw_core::{CanonicalSettings, ConfigError, OptionName, Schema, UserParams, resolve};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Incremental TypeScript to JavaScript build watcher.
///
/// Mirrors every `.ts` file under a root directory into an output
/// directory as `.js`, optionally with source maps.
#[derive(Parser)]
#[command(name = "tscwatch", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// Compiler flags, applied on top of any settings file.
    #[command(flatten)]
    compiler: CompilerFlags,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Compile every source file once, then exit.
    #[command(visible_alias = "b")]
    Build(ProjectArgs),

    /// Compile every source file, then recompile files as they change.
    #[command(visible_alias = "w")]
    Watch(ProjectArgs),

    /// Run with the settings in a JSON file.
    #[command(name = "run-config", visible_alias = "rc")]
    RunConfig {
        /// Settings file with `watchMode`, `rootPath`, `outputPath` and
        /// `compilerOptions`.
        #[arg(value_name = "CONFIG_PATH")]
        config: Utf8PathBuf,
    },
}

/// Source and output directories for `build` and `watch`.
#[derive(Args)]
struct ProjectArgs {
    /// Directory holding the TypeScript sources.
    #[arg(value_name = "ROOT_PATH")]
    root_path: Utf8PathBuf,

    /// Directory the JavaScript tree is written to.
    #[arg(value_name = "OUTPUT_PATH")]
    output_path: Utf8PathBuf,

    /// Settings file read before the command line is applied.
    #[arg(short, long, value_name = "FILE", env = "TSCWATCH_CONFIG")]
    config: Option<Utf8PathBuf>,
}

/// Compiler options settable from the command line.
///
/// Only flags that were actually given override the settings file.
#[derive(Args)]
struct CompilerFlags {
    /// Keep comments in the compiled output. This is the default; the flag
    /// overrides a settings file that turns comments off.
    #[arg(long, global = true)]
    comments: bool,

    /// Strip comments from the compiled output.
    #[arg(long, global = true, conflicts_with = "comments")]
    no_comments: bool,

    /// Module type of the compiled output (commonjs or amd). Default is commonjs.
    #[arg(short, long = "moduleType", global = true, value_name = "TYPE")]
    module_type: Option<String>,

    /// Write a source map next to every compiled file.
    #[arg(short, long, global = true)]
    sourcemap: bool,

    /// Language level of the compiled output (ES3 or ES5). Default is ES3.
    #[arg(short, long, global = true, value_name = "VERSION")]
    target: Option<String>,
}

impl CompilerFlags {
    /// The flags as a parameter layer.
    fn to_params(&self) -> UserParams {
        let mut params = UserParams::default();
        if self.comments || self.no_comments {
            params = params.with_option(OptionName::Comments, Value::Bool(self.comments));
        }
        if let Some(module_type) = &self.module_type {
            params = params.with_option(OptionName::ModuleType, Value::from(module_type.as_str()));
        }
        if self.sourcemap {
            params = params.with_option(OptionName::Sourcemap, Value::Bool(true));
        }
        if let Some(target) = &self.target {
            params = params.with_option(OptionName::Target, Value::from(target.as_str()));
        }
        params
    }
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects the `RUST_LOG` environment variable if set. Otherwise, uses
/// `debug` level if `--verbose` is set, or `info` level by default.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},mio=warn,notify=warn,globset=warn,ignore=warn"))
    });

    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_ansi(use_ansi))
        .with(filter)
        .init();
}

/// Layers the settings file, the subcommand and the compiler flags.
///
/// Later layers win key by key: settings file, then the command's
/// positional arguments and mode, then compiler flags.
///
/// # Errors
///
/// Returns an error if a settings file cannot be read or parsed.
fn build_params(cli: &Cli) -> Result<UserParams, ConfigError> {
    let (file, command) = match &cli.command {
        Commands::Build(args) | Commands::Watch(args) => {
            let file = match &args.config {
                Some(path) => UserParams::from_file(path)?,
                None => UserParams::default(),
            };
            let command = UserParams {
                watch_mode: Some(matches!(cli.command, Commands::Watch(_))),
                root_path: Some(args.root_path.clone()),
                output_path: Some(args.output_path.clone()),
                ..UserParams::default()
            };
            (file, command)
        }
        Commands::RunConfig { config } => (UserParams::from_file(config)?, UserParams::default()),
    };

    Ok(file.overlay(command).overlay(cli.compiler.to_params()))
}

/// Resolves the layered parameters into canonical settings.
fn build_settings(cli: &Cli) -> Result<CanonicalSettings, FatalError> {
    let params = build_params(cli)?;
    Ok(resolve(Schema::standard(), &params)?)
}

/// Completes on Ctrl-C, or on SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl-C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main(flavor = "current_thread")]
async fn main() -> color_eyre::Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.no_color);

    let settings = match build_settings(&cli) {
        Ok(settings) => Arc::new(settings),
        Err(err) => return Ok(ExitCode::from(report_fatal(&err).code())),
    };

    let dispatcher = Dispatcher::new(settings, Arc::new(TreeSitterBackend::new()));
    let mode = dispatcher.mode();

    let status = match dispatcher.run_until(shutdown_signal()).await {
        Ok(summary) => ExitStatus::from_summary(mode, &summary),
        Err(err) => report_fatal(&err),
    };

    Ok(ExitCode::from(status.code()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::TempDir;
    use tw_core::{ModuleKind, ScriptTarget};

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("tscwatch").chain(args.iter().copied())).unwrap()
    }

    fn settings(args: &[&str]) -> CanonicalSettings {
        build_settings(&parse(args)).unwrap()
    }

    fn write_config(dir: &TempDir, json: &str) -> String {
        let path = dir.path().join("tscwatch.json");
        std::fs::write(&path, json).unwrap();
        path.to_str().unwrap().to_owned()
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_build_is_one_shot() {
        let settings = settings(&["build", "src", "out"]);
        assert!(!settings.watch_mode());
        assert_eq!(settings.root_path(), "src");
        assert_eq!(settings.output_path(), "out");
        assert!(!settings.compiler_options().sourcemap());
    }

    #[test]
    fn test_watch_alias_and_flags() {
        let settings = settings(&["w", "src", "out", "-s", "--comments", "-m", "AMD", "-t", "es5"]);
        let options = settings.compiler_options();

        assert!(settings.watch_mode());
        assert!(options.sourcemap());
        assert!(options.comments());
        assert_eq!(options.module_kind(), ModuleKind::Amd);
        assert_eq!(options.target(), ScriptTarget::Es5);
    }

    #[test]
    fn test_flags_accepted_before_subcommand() {
        let cli = parse(&["--sourcemap", "--moduleType", "commonjs", "build", "a", "b"]);
        assert!(cli.compiler.sourcemap);
        assert_eq!(cli.compiler.module_type.as_deref(), Some("commonjs"));
    }

    #[test]
    fn test_run_config_reads_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"{
                "watchMode": true,
                "rootPath": "app",
                "outputPath": "dist",
                "compilerOptions": { "sourcemap": true, "target": "ES5" }
            }"#,
        );

        let settings = settings(&["run-config", &path]);
        assert!(settings.watch_mode());
        assert_eq!(settings.root_path(), "app");
        assert_eq!(settings.output_path(), "dist");
        assert!(settings.compiler_options().sourcemap());
        assert_eq!(settings.compiler_options().target(), ScriptTarget::Es5);
    }

    #[test]
    fn test_command_line_overrides_config_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"{
                "watchMode": true,
                "rootPath": "app",
                "outputPath": "dist",
                "compilerOptions": { "target": "ES5", "comments": true }
            }"#,
        );

        let settings = settings(&["build", "src", "out", "-c", &path, "-t", "es3"]);
        assert!(!settings.watch_mode());
        assert_eq!(settings.root_path(), "src");
        assert_eq!(settings.output_path(), "out");
        assert_eq!(settings.compiler_options().target(), ScriptTarget::Es3);
        // Unset flags leave file values alone.
        assert!(settings.compiler_options().comments());
    }

    #[test]
    fn test_no_comments_strips_comments() {
        assert!(settings(&["build", "src", "out"]).compiler_options().comments());
        assert!(!settings(&["build", "src", "out", "--no-comments"]).compiler_options().comments());

        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, r#"{ "compilerOptions": { "comments": false } }"#);
        let from_file = settings(&["build", "src", "out", "-c", &path]);
        assert!(!from_file.compiler_options().comments());
        let overridden = settings(&["build", "src", "out", "-c", &path, "--comments"]);
        assert!(overridden.compiler_options().comments());
    }

    #[test]
    fn test_comment_flags_conflict() {
        let result = Cli::try_parse_from(["tscwatch", "build", "src", "out", "--comments", "--no-comments"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_bad_option_token_is_fatal() {
        let err = build_settings(&parse(&["build", "src", "out", "-m", "umd"])).unwrap_err();
        assert!(matches!(err, FatalError::Config(_)));
        assert_eq!(report_fatal(&err).code(), 1);
    }

    #[test]
    fn test_missing_config_file_is_fatal() {
        let err = build_settings(&parse(&["rc", "/definitely/not/here.json"])).unwrap_err();
        assert!(matches!(err, FatalError::Config(ConfigError::Read { .. })));
    }

    #[test]
    fn test_run_config_without_paths_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, r#"{ "watchMode": false }"#);

        let err = build_settings(&parse(&["run-config", &path])).unwrap_err();
        assert!(matches!(err, FatalError::Config(_)));
    }
}
