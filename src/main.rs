// No console window for the logon task; interactive runs reattach below
#![windows_subsystem = "windows"]

mod autostart;
mod config;
mod engine;
mod error;
mod event;
mod network;
mod platform;
mod policy;
mod prompt;
mod proxy;
#[cfg(test)]
mod testing;
mod ui;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::{CliArgs, Command, Config};
use crate::engine::{CycleOutcome, Resolution, ResolutionEngine};
use crate::event::ChangeEvent;
use crate::network::{probe, ProbeOutcome};
use crate::policy::{lookup, PolicyStore, ProxyPolicy};
use crate::proxy::ProxyApplier;

#[tokio::main]
async fn main() -> Result<()> {
    #[cfg(windows)]
    attach_parent_console();

    let cli = CliArgs::parse();
    color_eyre::install()?;

    if cli.print_default_config {
        print!("{}", config::default_config_toml());
        return Ok(());
    }

    let config = config::load(&cli)?;
    let _guard = init_logging(&config, cli.stderr)?;

    let command = cli.command();
    info!(?command, "wifi-proxy starting");

    match command {
        Command::Run => run(&config).await,
        Command::Once => once(&config).await,
        Command::Status => status(&config).await,
        Command::List => list(&config),
        Command::Forget { id } => forget(&config, &id),
        Command::Install => {
            let location = autostart::install().await?;
            println!("Installed: {location}");
            Ok(())
        }
        Command::Uninstall => {
            if autostart::uninstall().await? {
                println!("Removed login startup");
            } else {
                println!("Nothing to remove");
            }
            Ok(())
        }
    }
}

async fn build_engine(config: &Config) -> Result<(ResolutionEngine, platform::StatusBackend)> {
    let status = platform::status_backend(config)
        .await
        .wrap_err("Failed to set up the network status source")?;
    let proxy = platform::proxy_store(config).wrap_err("Failed to set up the proxy backend")?;

    let engine = ResolutionEngine::new(
        config.engine_config()?,
        status.source.clone(),
        ProxyApplier::new(proxy),
        platform::resolver(config),
    );
    Ok((engine, status))
}

/// Monitor loop: one cycle at startup, then one per network change, until
/// Ctrl+C or SIGTERM.
async fn run(config: &Config) -> Result<()> {
    let (mut engine, status) = build_engine(config).await?;
    info!(store = %engine.store().path().display(), "Monitoring Wi-Fi changes");

    let (mut subscription, publisher) = event::subscription();
    publisher.publish(ChangeEvent::Startup);
    platform::start_monitor(config, &status, config.status_patterns()?, publisher)
        .await
        .wrap_err("Failed to start the network change monitor")?;

    let stop = subscription.stop_handle();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Interrupted, stopping");
        stop.stop();
    });

    engine.run(&mut subscription).await;
    info!("wifi-proxy exiting");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
                return;
            }
            Err(e) => tracing::warn!("Cannot listen for SIGTERM: {}", e),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Cannot listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn once(config: &Config) -> Result<()> {
    let (mut engine, _status) = build_engine(config).await?;

    match engine.run_cycle().await? {
        CycleOutcome::Disconnected => println!("Not connected to a Wi-Fi network"),
        CycleOutcome::Resolved(report) => {
            let source = match report.resolution {
                Resolution::Stored => "stored",
                Resolution::Learned => "new",
            };
            println!("{}: {} ({})", report.identity, report.policy, source);
            if let Some(e) = report.apply_error {
                return Err(e).wrap_err("Policy resolved but not applied");
            }
        }
    }
    Ok(())
}

async fn status(config: &Config) -> Result<()> {
    let backend = platform::status_backend(config).await?;
    let patterns = config.status_patterns()?;

    match probe(backend.source.as_ref(), &patterns).await? {
        ProbeOutcome::Disconnected => println!("Not connected to a Wi-Fi network"),
        ProbeOutcome::Connected(identity) => {
            let policies = PolicyStore::new(config.store_path()).load()?;
            println!("Network: {identity}");
            match lookup(&policies, &identity.stable_id) {
                ProxyPolicy::NoPolicyRecorded => {
                    println!("Policy:  none recorded (will prompt on the next cycle)")
                }
                policy => println!("Policy:  {policy}"),
            }
        }
    }
    Ok(())
}

fn list(config: &Config) -> Result<()> {
    let store = PolicyStore::new(config.store_path());
    let policies = store.load()?;

    if policies.is_empty() {
        println!("No networks remembered in {}", store.path().display());
        return Ok(());
    }
    for (stable_id, policy) in &policies {
        println!("{stable_id}  {policy}");
    }
    Ok(())
}

fn forget(config: &Config, stable_id: &str) -> Result<()> {
    match PolicyStore::new(config.store_path()).forget(stable_id)? {
        Some(policy) => println!("Forgot {stable_id} ({policy})"),
        None => println!("{stable_id} is not remembered"),
    }
    Ok(())
}

/// Log to a file through a non-blocking writer, optionally mirrored to
/// stderr. `RUST_LOG` overrides the configured level.
fn init_logging(config: &Config, stderr: bool) -> Result<WorkerGuard> {
    let path = config.log_file();
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| ".".into());
    let file_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "wifi-proxy.log".into());

    std::fs::create_dir_all(&dir)
        .wrap_err_with(|| format!("Failed to create log directory {}", dir.display()))?;
    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.general.log_level))
        .wrap_err_with(|| format!("Invalid log level \"{}\"", config.general.log_level))?;

    let stderr_layer = stderr.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        )
        .with(stderr_layer)
        .init();

    Ok(guard)
}

/// A windows-subsystem process starts without a console. When launched from
/// a terminal, borrow that terminal so help, `list` and errors still print;
/// under the logon task there is no parent console and this does nothing.
#[cfg(windows)]
fn attach_parent_console() -> bool {
    use windows_sys::Win32::System::Console::{AttachConsole, ATTACH_PARENT_PROCESS};

    // SAFETY: no pointers involved; failure only means there is no console
    unsafe { AttachConsole(ATTACH_PARENT_PROCESS) != 0 }
}

#[cfg(all(test, windows))]
mod tests {
    use super::*;

    #[test]
    fn attaching_twice_is_harmless() {
        // The test harness already owns a console, so both calls fail cleanly
        let first = attach_parent_console();
        let second = attach_parent_console();
        assert!(!(first && second));
    }
}
