//! intunewin: package Win32 applications for Intune
//!
//! Commands:
//!   pack --source <dir> --setup <file>  - build <app>.intunewin from a folder
//!   inspect <file>                      - list a container's entries and metadata
//!   config show                         - display current configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;

use intunewin_core::{IntunewinConfig, PackOptions};
use intunewin_pack::{inspect_package, Packager, ProgressFn};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "intunewin",
    version,
    about = "Build .intunewin packages for Microsoft Intune",
    long_about = "intunewin: zip, encrypt and wrap an application folder into a .intunewin container"
)]
struct Cli {
    /// Path to intunewin.toml configuration file
    #[arg(long, short = 'c', env = "INTUNEWIN_CONFIG", default_value = "intunewin.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, env = "INTUNEWIN_LOG")]
    log: Option<String>,

    /// Log format (json, text); overrides the config file
    #[arg(long, env = "INTUNEWIN_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Package an application folder into <output>/<folder name>.intunewin
    Pack {
        /// Folder containing the application files
        #[arg(long, short = 's')]
        source: PathBuf,
        /// Setup executable, relative to the source folder
        #[arg(long = "setup", short = 'e')]
        setup_file: String,
        /// Output directory (default: [output].dir from the config, else ".")
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Print only the output path
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Show the entries and Detection.xml fields of an existing package
    ///
    /// The encrypted content is neither decrypted nor verified.
    Inspect {
        /// Path to a .intunewin file
        package: PathBuf,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

#[derive(Clone, Debug, ValueEnum, PartialEq)]
enum LogFormat {
    Json,
    Text,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    let quiet = matches!(cli.command, Commands::Pack { quiet: true, .. });
    let (level, format) = resolve_logging(&cli, &config, quiet)?;
    init_logging(&level, &format);

    match cli.command {
        Commands::Pack {
            source,
            setup_file,
            output,
            quiet,
        } => {
            let output_dir = output.unwrap_or_else(|| config.output.dir.clone());
            cmd_pack(PackOptions {
                source_dir: source,
                setup_file,
                output_dir,
                quiet,
            })
        }
        Commands::Inspect { package } => cmd_inspect(&package),
        Commands::Config {
            action: ConfigAction::Show,
        } => cmd_config_show(&config, &cli.config),
    }
}

// ── Config loading + logging ──────────────────────────────────────────────────

fn load_config(path: &Path) -> Result<IntunewinConfig> {
    IntunewinConfig::load(path).with_context(|| format!("loading config: {}", path.display()))
}

/// Flags beat the config file; `--quiet` caps the default level at `warn`.
fn resolve_logging(
    cli: &Cli,
    config: &IntunewinConfig,
    quiet: bool,
) -> Result<(String, LogFormat)> {
    let level = match (&cli.log, quiet) {
        (Some(level), _) => level.clone(),
        (None, true) => "warn".to_string(),
        (None, false) => config.log.level.clone(),
    };
    let format = match &cli.log_format {
        Some(format) => format.clone(),
        None => LogFormat::from_str(&config.log.format, true)
            .map_err(|e| anyhow::anyhow!("invalid [log].format in config: {e}"))?,
    };
    Ok((level, format))
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries command output; logs go to stderr
    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

// ── Progress helpers ──────────────────────────────────────────────────────────

fn make_spinner(prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{prefix:.bold} {spinner} {msg}") {
        pb.set_style(style);
    }
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

// ── `intunewin pack` ──────────────────────────────────────────────────────────

fn cmd_pack(opts: PackOptions) -> Result<()> {
    let quiet = opts.quiet;
    let source = opts.source_dir.clone();
    if !quiet {
        println!("Source:     {}", source.display());
        println!("Setup file: {}", opts.setup_file);
        println!("Output:     {}", opts.output_dir.display());
        println!();
    }

    let packager = Packager::new(opts);
    let path = if quiet {
        packager.create_package()
    } else {
        let pb = make_spinner("pack");
        let pb_clone = pb.clone();
        let progress: ProgressFn = Box::new(move |step, total, msg| {
            pb_clone.set_message(format!("[{step}/{total}] {msg}"));
        });
        let result = packager.create_package_with_progress(&progress);
        match &result {
            Ok(_) => pb.finish_with_message("done"),
            Err(_) => pb.abandon_with_message("failed"),
        }
        result
    }
    .with_context(|| format!("packaging {}", source.display()))?;

    if quiet {
        println!("{}", path.display());
        return Ok(());
    }

    let size = std::fs::metadata(&path)
        .with_context(|| format!("reading {}", path.display()))?
        .len();
    println!();
    println!("Created: {}", path.display());
    println!("  size:  {}", fmt_bytes(size));
    Ok(())
}

// ── `intunewin inspect` ───────────────────────────────────────────────────────

fn cmd_inspect(package: &Path) -> Result<()> {
    let summary = inspect_package(package)
        .with_context(|| format!("inspecting {}", package.display()))?;
    let info = &summary.detection;
    let enc = &info.encryption_info;

    println!("Package: {}", package.display());
    println!();
    println!("Entries:");
    for name in &summary.entries {
        println!("  {name}");
    }
    if !summary.is_standard_layout() {
        println!("  warning: non-standard layout (expected Detection.xml then the encrypted content)");
        for name in summary.unexpected_entries() {
            println!("  warning: unexpected entry {name}");
        }
    }
    println!();
    println!("Detection.xml:");
    println!("  name:             {}", info.name);
    println!("  setup file:       {}", info.setup_file);
    println!("  file name:        {}", info.file_name);
    println!("  tool version:     {}", info.tool_version);
    println!(
        "  content size:     {} (unencrypted)",
        fmt_bytes(info.unencrypted_content_size.max(0) as u64)
    );
    println!("  encrypted size:   {}", fmt_bytes(summary.encrypted_size));
    println!("  profile:          {}", enc.profile_identifier);
    println!(
        "  digest:           {} {}",
        enc.file_digest_algorithm, enc.file_digest
    );
    Ok(())
}

// ── `intunewin config show` ───────────────────────────────────────────────────

fn cmd_config_show(config: &IntunewinConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!();
    let rendered = config
        .to_toml_pretty()
        .context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}

fn fmt_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_pack_arguments() {
        let cli = parse(&[
            "intunewin", "pack", "--source", "build/App", "--setup", "setup.exe", "-q",
        ]);
        match cli.command {
            Commands::Pack {
                source,
                setup_file,
                output,
                quiet,
            } => {
                assert_eq!(source, PathBuf::from("build/App"));
                assert_eq!(setup_file, "setup.exe");
                assert!(output.is_none());
                assert!(quiet);
            }
            other => panic!("expected Pack, got: {other:?}"),
        }
    }

    #[test]
    fn test_pack_requires_source_and_setup() {
        assert!(Cli::try_parse_from(["intunewin", "pack", "--source", "x"]).is_err());
        assert!(Cli::try_parse_from(["intunewin", "pack", "--setup", "x"]).is_err());
    }

    #[test]
    fn test_quiet_lowers_default_level() {
        let cli = parse(&["intunewin", "inspect", "a.intunewin"]);
        let config = IntunewinConfig::default();

        let (level, format) = resolve_logging(&cli, &config, true).unwrap();
        assert_eq!(level, "warn");
        assert_eq!(format, LogFormat::Text);

        let (level, _) = resolve_logging(&cli, &config, false).unwrap();
        assert_eq!(level, "info");
    }

    #[test]
    fn test_flags_override_config() {
        let cli = parse(&[
            "intunewin", "--log", "debug", "--log-format", "json", "config", "show",
        ]);
        let mut config = IntunewinConfig::default();
        config.log.level = "error".into();

        let (level, format) = resolve_logging(&cli, &config, true).unwrap();
        assert_eq!(level, "debug");
        assert_eq!(format, LogFormat::Json);
    }

    #[test]
    fn test_bad_config_format_is_rejected() {
        let cli = parse(&["intunewin", "config", "show"]);
        let mut config = IntunewinConfig::default();
        config.log.format = "xml".into();

        assert!(resolve_logging(&cli, &config, false).is_err());
    }

    #[test]
    fn test_fmt_bytes() {
        assert_eq!(fmt_bytes(512), "512 B");
        assert_eq!(fmt_bytes(2048), "2.0 KB");
        assert_eq!(fmt_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}
