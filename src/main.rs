use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use std::path::{Path, PathBuf};
use venv_patcher::config::{load_or_builtin, PatchDefinition, PythonVersion};
use venv_patcher::locate::{locate, HostEnv, LocateError, PrefixSource, VIRTUAL_ENV_VAR};
use venv_patcher::logging::init_cli_logger;
use venv_patcher::strategy::StrategyKind;
use venv_patcher::{ContextLine, EnvironmentGuard, PatchError, PatchResult, Patcher};

#[derive(Parser)]
#[command(name = "venv-patcher")]
#[command(
    about = "Patch uvicorn inside a virtual environment for nest_asyncio compatibility",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct TargetArgs {
    /// Virtual environment prefix (default: $VIRTUAL_ENV, then ./venv, then ./.venv)
    #[arg(long)]
    venv: Option<PathBuf>,

    /// Patch this file directly instead of locating it
    #[arg(short, long, conflicts_with_all = ["venv", "python_version"])]
    file: Option<PathBuf>,

    /// Interpreter version for lib/pythonX.Y (default: from pyvenv.cfg)
    #[arg(long, value_name = "X.Y")]
    python_version: Option<PythonVersion>,

    /// Patch definition TOML (default: built-in uvicorn/nest_asyncio patch)
    #[arg(short, long)]
    patch: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply the patch
    Apply {
        #[command(flatten)]
        target: TargetArgs,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Report whether the patch is applied, without modifying files
    Status {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Print the path of the target module
    Locate {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Describe the patch definition
    Show {
        /// Patch definition TOML (default: built-in uvicorn/nest_asyncio patch)
        #[arg(short, long)]
        patch: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_cli_logger(cli.verbose);

    match cli.command {
        Commands::Apply {
            target,
            dry_run,
            diff,
        } => cmd_apply(target, dry_run, diff),

        Commands::Status { target } => cmd_status(target),

        Commands::Locate { target } => cmd_locate(target),

        Commands::Show { patch } => cmd_show(patch),
    }
}

/// A resolved target file, plus the guard for its environment when located.
struct ResolvedTarget {
    file: PathBuf,
    guard: Option<EnvironmentGuard>,
}

/// Resolve the file to patch, exiting with guidance when it cannot be found.
fn resolve_target(target: &TargetArgs, definition: &PatchDefinition) -> Result<ResolvedTarget> {
    if let Some(file) = &target.file {
        if !file.is_file() {
            eprintln!("{} {} does not exist", "✗".red(), file.display());
            std::process::exit(1);
        }
        return Ok(ResolvedTarget {
            file: file.clone(),
            guard: None,
        });
    }

    let host = HostEnv::from_process()?;
    if let Some(active) = &host.virtual_env {
        if target.venv.is_none() && !active.is_dir() {
            eprintln!(
                "{}",
                format!(
                    "Warning: {} is set but path doesn't exist: {}",
                    VIRTUAL_ENV_VAR,
                    active.display()
                )
                .yellow()
            );
        }
    }

    let module = definition.module_path();
    match locate(
        &module,
        target.venv.as_deref(),
        target.python_version,
        &host,
    ) {
        Ok(located) => {
            if located.prefix.source == PrefixSource::WorkingDir {
                eprintln!(
                    "{}",
                    format!("Using environment: {}", located.prefix.path.display()).dimmed()
                );
            }
            let guard = EnvironmentGuard::new(&located.prefix.path)?;
            Ok(ResolvedTarget {
                file: located.file,
                guard: Some(guard),
            })
        }
        Err(err) => {
            report_not_found(&err, definition);
            std::process::exit(1);
        }
    }
}

fn report_not_found(err: &LocateError, definition: &PatchDefinition) {
    eprintln!(
        "{} Could not find {}/{}",
        "✗".red(),
        definition.target.package,
        definition.target.module
    );
    eprintln!("  {}", err);

    if let LocateError::NotFound { searched, .. } = err {
        eprintln!("  Searched:");
        for path in searched {
            eprintln!("    - {}", path.display());
        }
    }

    eprintln!();
    eprintln!("{}", "Please ensure:".bold());
    eprintln!("  1. You have activated your virtual environment (or pass --venv <path>)");
    eprintln!(
        "  2. {} is installed in it: pip install -r requirements.txt",
        definition.target.package
    );
    eprintln!("  3. You are running from the project root directory");
    eprintln!("  4. Or patch a file directly: venv-patcher apply --file <path>");
}

fn report_unmatched(file: &Path, context: &[ContextLine], definition: &PatchDefinition) {
    eprintln!("{} Could not find the section to patch", "✗".red());
    eprintln!("  File: {}", file.display());
    eprintln!(
        "  The installed {} may have a different structure.",
        definition.target.package
    );
    eprintln!("  You may need to apply the patch manually.");

    if context.is_empty() {
        eprintln!(
            "  No lines mention {}",
            definition.guard.subject.as_str().dimmed()
        );
        return;
    }

    eprintln!("  Lines mentioning {}:", definition.guard.subject);
    let mut previous = None;
    for line in context {
        if previous.is_some_and(|prev| line.line > prev + 1) {
            eprintln!("  {}", "  ...".dimmed());
        }
        eprintln!("  {}", line.to_string().dimmed());
        previous = Some(line.line);
    }
}

/// Helper: Show unified diff between original and modified content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

fn cmd_apply(target: TargetArgs, dry_run: bool, show_diff: bool) -> Result<()> {
    let definition = load_or_builtin(target.patch.as_deref())?;
    println!(
        "{}",
        format!("Applying {}...", definition.meta.name).bold()
    );

    let resolved = resolve_target(&target, &definition)?;
    println!("Target: {}", resolved.file.display());

    let mut patcher = Patcher::new(&definition)?.dry_run(dry_run);
    if let Some(guard) = resolved.guard {
        patcher = patcher.with_guard(guard);
    }

    if dry_run {
        println!("{}", "  [DRY RUN - no files will be modified]".cyan());
    }

    let report = match patcher.patch_file(&resolved.file) {
        Ok(report) => report,
        Err(PatchError::PatternNotMatched { file, context }) => {
            report_unmatched(&file, &context, &definition);
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    match &report.result {
        PatchResult::Applied { file, strategy } => {
            println!(
                "{} Applied to {} ({} strategy)",
                "✓".green(),
                file.display(),
                strategy
            );
        }
        PatchResult::WouldApply { file, strategy } => {
            println!(
                "{} Would apply to {} ({} strategy)",
                "✓".green(),
                file.display(),
                strategy
            );
        }
        PatchResult::AlreadyApplied { file } => {
            println!("{} Already applied to {}", "⊙".yellow(), file.display());
        }
    }

    if show_diff && report.original != report.patched {
        display_diff(report.result.file(), &report.original, &report.patched);
    }

    Ok(())
}

fn cmd_status(target: TargetArgs) -> Result<()> {
    let definition = load_or_builtin(target.patch.as_deref())?;
    let resolved = resolve_target(&target, &definition)?;

    let mut patcher = Patcher::new(&definition)?.dry_run(true);
    if let Some(guard) = resolved.guard {
        patcher = patcher.with_guard(guard);
    }

    println!("{}", "Patch Status Report".bold());
    println!("Patch: {}", definition.meta.name);
    println!("Target: {}", resolved.file.display());
    println!();

    match patcher.patch_file(&resolved.file) {
        Ok(report) => match report.result {
            PatchResult::AlreadyApplied { .. } => {
                println!("{} {}", "✓".green(), "APPLIED".green().bold());
                Ok(())
            }
            PatchResult::WouldApply { strategy, .. } | PatchResult::Applied { strategy, .. } => {
                println!(
                    "{} {} ({})",
                    "⊙".yellow(),
                    "NOT APPLIED".yellow().bold(),
                    format!("{} strategy would apply", strategy).dimmed()
                );
                std::process::exit(1);
            }
        },
        Err(PatchError::PatternNotMatched { file, context }) => {
            println!("{} {}", "✗".red(), "NOT APPLICABLE".red().bold());
            report_unmatched(&file, &context, &definition);
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

fn cmd_locate(target: TargetArgs) -> Result<()> {
    let definition = load_or_builtin(target.patch.as_deref())?;
    let resolved = resolve_target(&target, &definition)?;
    println!("{}", resolved.file.display());
    Ok(())
}

fn cmd_show(patch: Option<PathBuf>) -> Result<()> {
    let definition = load_or_builtin(patch.as_deref())?;

    println!("{}", definition.meta.name.bold());
    if let Some(description) = &definition.meta.description {
        println!("  {}", description);
    }
    println!();
    println!(
        "Target:   <site-packages>/{}",
        definition.module_path().display()
    );
    println!("Marker:   {}", definition.meta.marker);
    println!("Replaces: {}", definition.guard.original);
    println!("Guards:");
    for (idx, branch) in definition.guard.branches.iter().enumerate() {
        let primary = if idx == 0 { " (primary)" } else { "" };
        println!(
            "  - {} >= {}{}",
            definition.guard.subject,
            branch.threshold.tuple_literal(),
            primary.dimmed()
        );
    }
    let order: Vec<&str> = StrategyKind::ORDER.iter().map(|k| k.as_str()).collect();
    println!("Strategies: {}", order.join(" -> "));

    Ok(())
}
