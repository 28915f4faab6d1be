//! CLI for the packsync modpack server installer.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use packsync_core::checksum::HashAlgorithm;
use packsync_core::config;
use std::path::PathBuf;

use commands::{run_checksum, run_diff, run_install, run_verify, InstallArgs};

/// Top-level CLI for packsync.
#[derive(Debug, Parser)]
#[command(name = "packsync")]
#[command(about = "packsync: install and update modpack servers", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Install or update a modpack into a directory.
    Install {
        /// Modpack id. Defaults to the id in this executable's name (e.g. serverinstall_126_12000).
        #[arg(long)]
        pack: Option<u64>,
        /// Version id. Defaults to the newest release.
        #[arg(long)]
        version: Option<u64>,
        /// Install directory (default: current directory).
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Concurrent downloads (overrides config).
        #[arg(long, value_name = "N")]
        threads: Option<usize>,
        /// Modpack catalog to query.
        #[arg(long, default_value = "ftb")]
        provider: String,
        /// API key for the catalog ("public" when empty).
        #[arg(long, default_value = "")]
        api_key: String,
        /// Without --version, take the newest version of any channel.
        #[arg(long)]
        latest: bool,
        /// Install into a non-empty directory, replace another pack, or downgrade.
        #[arg(long)]
        force: bool,
        /// Re-hash all files after installing and repair mismatches.
        #[arg(long)]
        validate: bool,
        /// Do not download or run the mod loader installer.
        #[arg(long)]
        skip_modloader: bool,
        /// Use the system java instead of downloading a runtime into jre/.
        #[arg(long)]
        no_java: bool,
    },

    /// Check an installation against its manifest.
    Verify {
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Re-download missing or mismatched files.
        #[arg(long)]
        repair: bool,
    },

    /// Show how two manifests differ.
    Diff {
        /// Previously installed manifest.
        old: PathBuf,
        /// New manifest.
        new: PathBuf,
    },

    /// Print the digest of a file.
    Checksum {
        path: PathBuf,
        #[arg(long, value_enum, default_value_t = Algorithm::Sha1)]
        algorithm: Algorithm,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Algorithm {
    Sha1,
    Sha256,
}

impl From<Algorithm> for HashAlgorithm {
    fn from(a: Algorithm) -> Self {
        match a {
            Algorithm::Sha1 => HashAlgorithm::Sha1,
            Algorithm::Sha256 => HashAlgorithm::Sha256,
        }
    }
}

fn dir_or_cwd(dir: Option<PathBuf>) -> Result<PathBuf> {
    match dir {
        Some(d) => Ok(d),
        None => Ok(std::env::current_dir()?),
    }
}

impl CliCommand {
    /// Directory whose `packsync.log` records this run. `verify` only logs
    /// into a directory that already exists.
    pub fn log_dir(&self) -> Option<PathBuf> {
        match self {
            CliCommand::Install { dir, .. } => dir_or_cwd(dir.clone()).ok(),
            CliCommand::Verify { dir, .. } => dir_or_cwd(dir.clone()).ok().filter(|d| d.is_dir()),
            CliCommand::Diff { .. } | CliCommand::Checksum { .. } => None,
        }
    }

    pub async fn run(self) -> Result<()> {
        match self {
            CliCommand::Install {
                pack,
                version,
                dir,
                threads,
                provider,
                api_key,
                latest,
                force,
                validate,
                skip_modloader,
                no_java,
            } => {
                let cfg = config::load_or_init()?;
                tracing::debug!("loaded config: {:?}", cfg);
                let args = InstallArgs {
                    pack,
                    version,
                    dir: dir_or_cwd(dir)?,
                    threads,
                    provider,
                    api_key,
                    latest,
                    force,
                    validate,
                    skip_modloader,
                    no_java,
                };
                run_install(cfg, args).await?;
            }
            CliCommand::Verify { dir, repair } => {
                let cfg = config::load_or_init()?;
                run_verify(cfg, dir_or_cwd(dir)?, repair).await?;
            }
            CliCommand::Diff { old, new } => run_diff(&old, &new)?,
            CliCommand::Checksum { path, algorithm } => run_checksum(&path, algorithm.into())?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
