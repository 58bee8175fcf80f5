use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "tgvpn")]
#[command(about = "TgVPN CLI: manage your VPN subscription from the terminal")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Proxy base URL (overrides config and TGVPN_URL env var)
    #[arg(short, long, global = true, env = "TGVPN_URL")]
    pub server: Option<String>,

    /// Signed Telegram init data to authenticate with
    #[arg(long, global = true, env = "TGVPN_INIT_DATA", hide_env_values = true)]
    pub init_data: Option<String>,

    /// Config profile name
    #[arg(short, long, global = true, env = "TGVPN_PROFILE", default_value = "default")]
    pub profile: String,

    /// Output format
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,

    /// Show technical error details
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    Json,
    #[default]
    Table,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show subscription status
    Status(StatusArgs),
    /// Print your VPN key
    Key,
    /// List available tariffs
    Tariffs,
    /// Create an order for a tariff
    Buy(BuyArgs),
    /// Check whether an order has been paid
    Check(CheckArgs),
    /// Show or change auto-renewal
    Autorenew(AutorenewArgs),
    /// Show payment history
    Payments(PageArgs),
    /// Show referral statistics
    Referral,
    /// List invited friends
    Friends(PageArgs),
    /// Show the active contest
    Contest(ContestArgs),
    /// Connection guide for a platform
    Setup(SetupArgs),
    /// Export a list as CSV
    Export(ExportArgs),
    /// Print your referral link
    Link(LinkArgs),
    /// Manage CLI configuration
    Config(ConfigArgs),
}

#[derive(clap::Args)]
pub struct StatusArgs {
    /// Bypass the cache and ask the server
    #[arg(long)]
    pub refresh: bool,
}

#[derive(clap::Args)]
pub struct BuyArgs {
    /// Tariff id (see `tgvpn tariffs`)
    pub tariff: String,
    /// Promo code
    #[arg(long)]
    pub promo: Option<String>,
}

#[derive(clap::Args)]
pub struct CheckArgs {
    /// Order id returned by `tgvpn buy`
    pub order: String,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

#[derive(clap::Args)]
pub struct AutorenewArgs {
    /// Turn auto-renewal on or off; omit to show the current setting
    pub state: Option<Toggle>,
}

#[derive(clap::Args)]
pub struct PageArgs {
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    #[arg(long, default_value_t = 20)]
    pub limit: u32,
}

#[derive(clap::Args)]
pub struct ContestArgs {
    /// Also list participants
    #[arg(long)]
    pub participants: bool,
    /// Also show your ticket history
    #[arg(long)]
    pub tickets: bool,
    #[command(flatten)]
    pub page: PageArgs,
}

#[derive(clap::Args)]
pub struct SetupArgs {
    /// ios, android, windows, macos or linux (defaults to the saved or current one)
    #[arg(long)]
    pub platform: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ExportKind {
    Payments,
    Friends,
    Participants,
}

#[derive(clap::Args)]
pub struct ExportArgs {
    /// What to export
    pub kind: ExportKind,
    /// Destination CSV file
    #[arg(short, long)]
    pub output: PathBuf,
    /// Rows per request while paging through the list
    #[arg(long, default_value_t = 100)]
    pub batch: u32,
    /// Contest id for `participants` (defaults to the active contest)
    #[arg(long)]
    pub contest: Option<String>,
}

#[derive(clap::Args)]
pub struct LinkArgs {
    /// Bot username (overrides the configured one)
    #[arg(long)]
    pub bot: Option<String>,
    /// Mini App short name; prints a Mini App link instead of a bot link
    #[arg(long)]
    pub app: Option<String>,
    /// Also print a Telegram share link
    #[arg(long)]
    pub share: bool,
}

#[derive(clap::Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current config
    Show,
    /// Set config value
    Set(ConfigSetArgs),
}

#[derive(clap::Args)]
pub struct ConfigSetArgs {
    /// Key to set (server, init_data, format, bot)
    pub key: String,
    /// Value
    pub value: String,
}
