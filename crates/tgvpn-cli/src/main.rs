mod cli;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use colored::Colorize;
use tgvpn_client::LocalStore;

use cli::{Cli, Commands, OutputFormat};
use commands::Session;
use config::ProfileConfig;
use output::{describe_error, print_error, print_hint};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(&cli).await {
        print_error(&describe_error(&e));
        if cli.verbose {
            print_hint(&format!("{e:#}"));
        }
        std::process::exit(1);
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let profile = &cli.profile;
    let cfg = config::load_profile(profile)?;
    let format = resolve_format(cli.format, &cfg);
    let connect = || -> Result<Session> {
        let server = config::resolve_server(&cli.server, &cfg)?;
        let init_data = config::resolve_init_data(&cli.init_data, &cfg);
        let store = LocalStore::open(config::state_path(profile)?)?;
        Ok(Session::new(&server, init_data, store, format))
    };

    match &cli.command {
        Commands::Status(args) => {
            let mut session = connect()?;
            commands::account::status(&mut session, args.refresh).await?;
        }
        Commands::Key => {
            let session = connect()?;
            commands::account::key(&session).await?;
        }
        Commands::Autorenew(args) => {
            let session = connect()?;
            commands::account::autorenew(&session, args.state).await?;
        }
        Commands::Payments(args) => {
            let session = connect()?;
            commands::account::payments(&session, args.page, args.limit).await?;
        }
        Commands::Tariffs => {
            let session = connect()?;
            commands::billing::tariffs(&session).await?;
        }
        Commands::Buy(args) => {
            let mut session = connect()?;
            commands::billing::buy(&mut session, &args.tariff, args.promo.clone()).await?;
        }
        Commands::Check(args) => {
            let mut session = connect()?;
            commands::billing::check(&mut session, &args.order).await?;
        }
        Commands::Referral => {
            let session = connect()?;
            commands::referral::summary(&session).await?;
        }
        Commands::Friends(args) => {
            let session = connect()?;
            commands::referral::friends(&session, args.page, args.limit).await?;
        }
        Commands::Contest(args) => {
            let session = connect()?;
            commands::contest::show(
                &session,
                args.participants,
                args.tickets,
                args.page.page,
                args.page.limit,
            )
            .await?;
        }
        Commands::Setup(args) => {
            let mut session = connect()?;
            commands::setup::guide(&mut session, args.platform.as_deref()).await?;
        }
        Commands::Export(args) => {
            let session = connect()?;
            commands::export::export(
                &session,
                args.kind,
                &args.output,
                args.batch,
                args.contest.as_deref(),
            )
            .await?;
        }
        Commands::Link(args) => {
            let init_data = config::resolve_init_data(&cli.init_data, &cfg);
            commands::referral::link(
                init_data.as_deref(),
                args.bot.as_deref().or(cfg.bot.as_deref()),
                args.app.as_deref(),
                args.share,
                format,
            )?;
        }
        Commands::Config(args) => configure(profile, &args.command)?,
    }

    Ok(())
}

fn configure(profile: &str, command: &cli::ConfigCommands) -> Result<()> {
    match command {
        cli::ConfigCommands::Show => {
            let cfg = config::load_profile(profile)?;
            let unset = || "(not set)".to_string();
            println!("{}: {}", "Profile".cyan(), profile);
            println!("{}: {}", "Server".cyan(), cfg.server.unwrap_or_else(unset));
            println!(
                "{}: {}",
                "Init data".cyan(),
                cfg.init_data
                    .map(|_| "(stored)".to_string())
                    .unwrap_or_else(unset)
            );
            println!("{}: {}", "Bot".cyan(), cfg.bot.unwrap_or_else(unset));
            println!(
                "{}: {}",
                "Format".cyan(),
                cfg.format.as_deref().unwrap_or("table")
            );
        }
        cli::ConfigCommands::Set(set_args) => {
            let mut cfg = config::load_profile(profile)?;
            cfg.set(&set_args.key, &set_args.value)?;
            config::save_profile(profile, &cfg)?;
            let shown = if set_args.key == "init_data" {
                "(stored)"
            } else {
                set_args.value.as_str()
            };
            output::print_success(&format!("Set {} = {}", set_args.key, shown));
        }
    }
    Ok(())
}

fn resolve_format(flag: Option<OutputFormat>, cfg: &ProfileConfig) -> OutputFormat {
    flag.or_else(|| {
        cfg.format
            .as_deref()
            .and_then(|f| OutputFormat::from_str(f, true).ok())
    })
    .unwrap_or_default()
}
