//! burrow CLI - inspect the shim's tables and drive it against real descriptors

use burrow_core::config::default_config_path;
use burrow_core::dirent::DirEntries;
use burrow_core::fd::{Descriptor, DirEntryBuf};
use burrow_core::host::DefaultHost;
use burrow_core::{BurrowError, Errno, ProcessState, ShimConfig, Signal, Whence};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs::File;
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "burrow")]
#[command(author, version, about = "POSIX compatibility shim for WASI preview1 sandboxes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Describe an errno value
    Errno {
        /// Numeric errno
        code: u32,
    },

    /// Describe a signal number
    Signal {
        /// Signal number
        number: i32,
    },

    /// Decode a file of raw directory records
    Dirent {
        /// File holding records in the host layout
        file: PathBuf,
    },

    /// List a directory through the descriptor state machine
    Ls {
        /// Directory to list
        dir: PathBuf,

        /// Number of listings, rewinding between them
        #[arg(short, long, default_value = "1")]
        passes: u32,
    },

    /// Seek an open path and print the resulting position
    Seek {
        /// File or directory to open
        path: PathBuf,

        /// Offset relative to `--whence`
        #[arg(allow_hyphen_values = true)]
        offset: i64,

        /// Origin of the offset
        #[arg(short, long, value_enum, default_value = "set")]
        whence: Origin,
    },

    /// Print the emulated process identity
    Identity {
        /// Config file (defaults to BURROW_CONFIG env var)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Origin {
    Set,
    Cur,
    End,
}

impl From<Origin> for Whence {
    fn from(origin: Origin) -> Self {
        match origin {
            Origin::Set => Self::Set,
            Origin::Cur => Self::Cur,
            Origin::End => Self::End,
        }
    }
}

#[derive(Serialize)]
struct ErrnoReport {
    code: u32,
    name: Option<&'static str>,
    message: String,
    kind: String,
    temporary: bool,
    timeout: bool,
}

#[derive(Serialize)]
struct SignalReport {
    signal: i32,
    description: String,
    exit_code: i32,
}

#[derive(Serialize)]
struct DirentReport {
    entries: Vec<DirEntryBuf>,
    consumed: usize,
    trailing: usize,
    error: Option<String>,
}

#[derive(Serialize)]
struct Pass {
    pass: u32,
    entries: Vec<DirEntryBuf>,
}

#[derive(Serialize)]
struct SeekReport {
    fd: u32,
    file_type: burrow_core::FileType,
    position: u64,
}

#[derive(Serialize)]
struct IdentityReport {
    uid: u32,
    gid: u32,
    euid: u32,
    egid: u32,
    pid: u32,
    ppid: u32,
    groups: Vec<u32>,
    hostname: String,
    time: Option<burrow_core::Timeval>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("burrow=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Errno { code } => {
            let errno = Errno::from_raw(code);
            print_json(&ErrnoReport {
                code,
                name: errno.name(),
                message: errno.to_string(),
                kind: format!("{:?}", errno.kind()),
                temporary: errno.is_temporary(),
                timeout: errno.is_timeout(),
            })?;
        }

        Commands::Signal { number } => {
            let signal = Signal::from_raw(number);
            print_json(&SignalReport {
                signal: number,
                description: signal.to_string(),
                exit_code: signal.exit_code(),
            })?;
        }

        Commands::Dirent { file } => {
            let bytes = std::fs::read(&file)?;
            let mut records = DirEntries::new(&bytes);
            let entries = records.by_ref().map(DirEntryBuf::from).collect();
            print_json(&DirentReport {
                entries,
                consumed: records.consumed(),
                trailing: records.remainder().len(),
                error: records.error().map(|e| e.to_string()),
            })?;
        }

        Commands::Ls { dir, passes } => {
            let handle = File::open(&dir)?;
            let desc = Descriptor::new(host_fd(&handle)?);
            let host = DefaultHost::new();

            for pass in 1..=passes {
                if pass > 1 {
                    desc.seek(&host, 0, Whence::Set)?;
                }
                let entries = desc.read_dir(&host)?;
                tracing::info!(dir = %dir.display(), pass, count = entries.len(), "listed");
                print_json(&Pass { pass, entries })?;
            }
        }

        Commands::Seek {
            path,
            offset,
            whence,
        } => {
            let handle = File::open(&path)?;
            let fd = host_fd(&handle)?;
            let desc = Descriptor::new(fd);
            let host = DefaultHost::new();

            let position = desc.seek(&host, offset, whence.into())?;
            print_json(&SeekReport {
                fd,
                file_type: desc.cached_type(),
                position,
            })?;
        }

        Commands::Identity { config } => {
            let config = load_config(config.or_else(default_config_path).as_deref())?;
            let state = ProcessState::new(config, DefaultHost::new());

            let time = match state.gettimeofday() {
                Ok(tv) => Some(tv),
                Err(errno) => {
                    tracing::warn!(%errno, "clock unavailable");
                    None
                }
            };
            print_json(&IdentityReport {
                uid: state.getuid(),
                gid: state.getgid(),
                euid: state.geteuid(),
                egid: state.getegid(),
                pid: state.getpid(),
                ppid: state.getppid(),
                groups: state.getgroups().to_vec(),
                hostname: state.sysctl("kern.hostname")?.to_owned(),
                time,
            })?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> burrow_core::Result<ShimConfig> {
    let config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            serde_json::from_str(&raw)
                .map_err(|e| BurrowError::Config(format!("{}: {e}", path.display())))?
        }
        None => ShimConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn host_fd(file: &File) -> Result<u32, Errno> {
    u32::try_from(file.as_raw_fd()).map_err(|_| Errno::EBADF)
}

fn print_json<T: Serialize>(value: &T) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
