use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use log::{error, LevelFilter};
use yamlfs_core_store::Format;
use yamlfs_fuse::{mount, FsError, MountConfig, ProjectionConfig};

/// yamlfs - mount a YAML document as a directory tree
#[derive(Parser, Debug)]
#[command(name = "yamlfs")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML document to project (created on first write if missing)
    document: PathBuf,

    /// Where to mount it
    mountpoint: PathBuf,

    /// Presentation for files without a .json/.yaml/.yml suffix
    #[arg(long, value_enum, env = "YAMLFS_MODE", default_value_t = Mode::Yaml)]
    mode: Mode,

    /// Log every filesystem request
    #[arg(long)]
    debug: bool,

    /// Let other users access the mount
    #[arg(long)]
    allow_other: bool,

    /// Refuse all modifications
    #[arg(long)]
    read_only: bool,

    /// Turn literal \n sequences in strings into newlines on load
    #[arg(long)]
    repair_escaped_newlines: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    Yaml,
    Json,
}

impl Args {
    fn projection_config(&self) -> ProjectionConfig {
        ProjectionConfig {
            default_format: match self.mode {
                Mode::Yaml => Format::YAML,
                Mode::Json => Format::JSON,
            },
            repair_escaped_newlines: self.repair_escaped_newlines,
            ..ProjectionConfig::default()
        }
    }

    fn mount_config(&self) -> MountConfig {
        MountConfig {
            mount_point: self.mountpoint.clone(),
            allow_other: self.allow_other,
            read_only: self.read_only,
            ..MountConfig::default()
        }
    }
}

fn init_logging(debug: bool) {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    // RUST_LOG, when set, takes precedence over the flag
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    if let Err(e) = mount(&args.document, args.projection_config(), &args.mount_config()) {
        match &e {
            FsError::MountPoint { .. } => error!("{}", e),
            _ => error!("yamlfs exited: {}", e),
        }
        std::process::exit(1);
    }
}
