//! CLI argument parsing with clap.

use clap::Parser;
use std::path::PathBuf;

use crate::config::{Binding, ConfigOverrides, ExitPolicy};

#[derive(Parser, Debug)]
#[command(name = "nft-prefix-import")]
#[command(
    author,
    version,
    about = "Import the prefixes announced by autonomous systems into nftables sets"
)]
pub struct Cli {
    /// List of autonomous systems (AS) numbers, matched verbatim
    #[arg(required = true, value_name = "AUTNUMS")]
    pub autnums: Vec<String>,

    /// User-Agent sent to the routing table service (identify yourself)
    #[arg(long, env = "USER_AGENT")]
    pub user_agent: String,

    /// Table in nftables to target [default: filter]
    #[arg(long)]
    pub table: Option<String>,

    /// Set for IPv4 prefixes [default: ipv4prefixes]
    #[arg(long)]
    pub ipv4set: Option<String>,

    /// Set for IPv6 prefixes [default: ipv6prefixes]
    #[arg(long)]
    pub ipv6set: Option<String>,

    /// How elements are pushed into nftables [default: json]
    #[arg(long, value_enum)]
    pub binding: Option<Binding>,

    /// Whether failed elements make the run fail [default: strict]
    #[arg(long, value_enum)]
    pub exit_policy: Option<ExitPolicy>,

    /// Local copy of the routing table [default: ./table.txt]
    #[arg(long)]
    pub cache_file: Option<PathBuf>,

    /// Refetch once the cache is older than this (30m, 2h, 1d) [default: 2h]
    #[arg(long)]
    pub max_age: Option<String>,

    /// Optional YAML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Fetch and extract, print the prefixes, but don't touch nftables
    #[arg(long)]
    pub dry_run: bool,

    /// Quiet mode (for cron/systemd timer)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Verbose mode (debug output)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Settings given on the command line
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            table: self.table.clone(),
            ipv4_set: self.ipv4set.clone(),
            ipv6_set: self.ipv6set.clone(),
            binding: self.binding,
            exit_policy: self.exit_policy,
            cache_file: self.cache_file.clone(),
            cache_max_age: self.max_age.clone(),
        }
    }
}
