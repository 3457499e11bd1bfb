use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use safe_fs_perms::Result;
use safe_fs_perms::mode::parse_mode;
use safe_fs_perms::ops::{Context, ReadFilter};
use safe_fs_perms::policy_io::{PolicyFormat, load_policy, render_policy};

#[derive(Debug, Parser)]
#[command(name = "safe-fs-perms")]
#[command(
    about = "Normalize POSIX permissions and remove directory trees inside an explicit sandbox."
)]
struct Cli {
    #[arg(long)]
    policy: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a directory and any missing parents.
    Mkdir { path: PathBuf },
    /// Recursively delete a path under the sandbox prefix.
    Rmtree { path: PathBuf },
    SetPermissions {
        path: PathBuf,
        /// Octal mode overriding the policy default, e.g. `640`.
        #[arg(long, value_parser = parse_mode)]
        mode: Option<u32>,
    },
    MakeWritable { path: PathBuf },
    Stat { path: PathBuf },
    Touch { path: PathBuf },
    Ls {
        path: PathBuf,
        #[arg(long, conflicts_with = "dirs")]
        files: bool,
        #[arg(long)]
        dirs: bool,
    },
    /// Print the loaded policy with modes in octal.
    Policy {
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let policy = load_policy(&cli.policy)?;
    let ctx = Context::new(policy)?;

    let value = match cli.command {
        Command::Mkdir { path } => {
            ctx.mkdir_all(&path)?;
            serde_json::to_value(ctx.identity(&path)?)?
        }
        Command::Rmtree { path } => {
            let removed = ctx.remove_tree(&path)?;
            serde_json::json!({ "path": path, "removed": removed })
        }
        Command::SetPermissions { path, mode } => {
            ctx.set_permissions(&path, mode)?;
            serde_json::to_value(ctx.identity(&path)?)?
        }
        Command::MakeWritable { path } => {
            ctx.make_writable(&path)?;
            serde_json::to_value(ctx.identity(&path)?)?
        }
        Command::Stat { path } => serde_json::to_value(ctx.identity(&path)?)?,
        Command::Touch { path } => {
            ctx.touch(&path)?;
            serde_json::to_value(ctx.identity(&path)?)?
        }
        Command::Ls { path, files, dirs } => {
            let filter = match (files, dirs) {
                (true, _) => ReadFilter::Files,
                (_, true) => ReadFilter::Dirs,
                _ => ReadFilter::All,
            };
            let entries = ctx
                .read_dir(&path, filter)?
                .collect::<Result<Vec<_>>>()?;
            serde_json::to_value(entries)?
        }
        Command::Policy { json } => {
            let format = if json {
                PolicyFormat::Json
            } else {
                PolicyFormat::Toml
            };
            print!("{}", render_policy(ctx.policy(), format)?);
            return Ok(());
        }
    };

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
