use std::{
    net::{Ipv4Addr, Ipv6Addr, SocketAddr},
    path::PathBuf,
};

use clap::Parser;
use log::{error, info, warn};
use tokio_util::sync::CancellationToken;

use lispmn::{
    address::LispAddr,
    config::ConfigFile,
    dispatcher::{ControlHandlers, Dispatcher, HandlerError, UdpControlSocket},
    resolve::SystemResolver,
};

#[derive(Parser)]
#[command(version)]
struct Cli {
    /// Path to the daemon configuration file.
    #[arg(short = 'f', long = "config-file", default_value = "/etc/lispmn.toml")]
    config_file: PathBuf,

    /// Enable debug logging.
    #[arg(short = 'd', long = "debug")]
    debug: bool,
}

/// Placeholder handler set logging each message; the protocol handlers are
/// wired in by the control plane built on top of this core.
struct LoggingHandlers;

impl ControlHandlers for LoggingHandlers {
    fn handle_map_request(
        &self,
        payload: &[u8],
        local_rloc: LispAddr,
        remote_port: u16,
    ) -> Result<(), HandlerError> {
        info!(
            "Map-Request of {} bytes on {local_rloc} from port {remote_port}",
            payload.len()
        );
        Ok(())
    }

    fn handle_map_reply(&self, payload: &[u8]) -> Result<(), HandlerError> {
        info!("Map-Reply of {} bytes", payload.len());
        Ok(())
    }

    fn handle_map_notify(&self, payload: &[u8]) -> Result<(), HandlerError> {
        info!("Map-Notify of {} bytes", payload.len());
        Ok(())
    }

    fn handle_map_referral(&self, payload: &[u8]) -> Result<(), HandlerError> {
        info!("Map-Referral of {} bytes", payload.len());
        Ok(())
    }

    fn handle_info_nat(&self, payload: &[u8], local_rloc: LispAddr) -> Result<(), HandlerError> {
        info!("Info-Request/Info-Reply of {} bytes on {local_rloc}", payload.len());
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.debug {
        pretty_env_logger::formatted_timed_builder()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        pretty_env_logger::formatted_timed_builder()
            .filter_level(log::LevelFilter::Info)
            .init();
    }

    let file = ConfigFile::load(&cli.config_file)?;
    let config = file.resolve(&SystemResolver);
    let port = config.control_port;

    // Dual stack operation: one control socket per family, and the daemon
    // keeps going as long as at least one binds.
    let sock_v4 = match UdpControlSocket::bind(SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), port))
        .await
    {
        Ok(sock) => Some(sock),
        Err(e) => {
            warn!("Could not bind IPv4 control socket on port {port}: {e}");
            None
        }
    };
    let sock_v6 = match UdpControlSocket::bind(SocketAddr::new(Ipv6Addr::UNSPECIFIED.into(), port))
        .await
    {
        Ok(sock) => Some(sock),
        Err(e) => {
            warn!("Could not bind IPv6 control socket on port {port}: {e}");
            None
        }
    };
    if sock_v4.is_none() && sock_v6.is_none() {
        error!("No control socket available, exiting");
        return Err("could not bind any control socket".into());
    }

    info!("Listening for LISP control messages on port {port}");

    let dispatcher = Dispatcher::new(sock_v4, sock_v6, LoggingHandlers, config);

    let cancellation = CancellationToken::new();
    let loop_token = cancellation.clone();
    let dispatch_loop = tokio::spawn(async move { dispatcher.run(loop_token).await });

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    cancellation.cancel();
    dispatch_loop.await?;

    Ok(())
}
