use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;
use simple_logger::SimpleLogger;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use wakebot::config::{self, Config};
use wakebot::{iface, CommandHandler, Registry, WakePacketSender};

#[derive(Parser)]
#[command(version, about = "Wake-on-LAN bot for named hosts")]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, env = "WAKEBOT_CONFIG", default_value = "config.yml")]
    config: String,

    /// Namespace console messages are attributed to
    #[arg(short, long, default_value = "console")]
    guild: String,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logger(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    SimpleLogger::new()
        .with_level(LevelFilter::Warn)
        .with_module_level("wakebot", level)
        .with_colors(true)
        .init()?;
    Ok(())
}

/*
 * Blocking stdin reads run on a plain thread rather than tokio's stdin: a
 * pending blocking read would otherwise keep the runtime from shutting down
 * after SIGINT.
 */
fn spawn_console(tx: mpsc::Sender<String>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break; };
            if tx.blocking_send(line).is_err() { break; }
        }
        log::trace!("[console] exit");
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let opts = Cli::parse();
    init_logger(opts.verbose)?;

    let config_path = config::expand_path(&opts.config)?;
    let mut cfg = Config::load(&config_path)?;
    cfg.apply_env(|key| std::env::var(key).ok())?;

    let token_path: PathBuf = cfg.token_path()?;
    if !token_path.exists() {
        log::error!("Please place bot token in a file called \"{}\".", token_path.display());
        anyhow::bail!("missing bot token file '{}'", token_path.display());
    }
    let _token = config::load_token(&token_path)?;
    log::info!("[bot] loaded bot token from '{}'", token_path.display());

    let wol = cfg.wol();
    let broadcast = match wol.broadcast_addr {
        Some(addr) => addr,
        None => iface::local_broadcast(wol.interface.as_deref()),
    };
    let sender = WakePacketSender::new(cfg.wol_config(broadcast));
    log::info!("[bot] wake packets go to {}", sender.target());

    let registry = Arc::new(Registry::new(cfg.registry_config()?));
    let handler = CommandHandler::new(cfg.bot().prefix, registry, sender);

    let cancel_token = CancellationToken::new();
    let sigint_token = cancel_token.clone();
    ctrlc::set_handler(move || {
        log::info!("Received SIGINT");
        sigint_token.cancel();
    }).context("Failed to install SIGINT handler")?;

    let (tx, mut rx) = mpsc::channel::<String>(8);
    spawn_console(tx);
    log::info!("[bot] reading messages for '{}' from stdin", opts.guild);

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => break,
            msg = rx.recv() => {
                let Some(msg) = msg else { break; };
                if let Some(reply) = handler.handle(&opts.guild, &msg).await {
                    println!("{}", reply);
                }
            }
        }
    }

    log::trace!("[bot] exit");
    Ok(())
}
