mod launcher;
mod logging;
mod netbox;
mod ui;

use std::ffi::CStr;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, bail};
use clap::Parser;

use jumpbox_core::config::JumpboxConfig;
use jumpbox_core::controller::{Controller, load_menu};
use jumpbox_core::session::SessionDispatcher;

use launcher::SshLauncher;
use netbox::NetboxClient;
use ui::TuiFrontend;

#[derive(Parser)]
#[command(name = "jumpbox", version)]
#[command(about = "Menu-driven SSH jump host backed by Netbox", long_about = None)]
struct Cli {
    /// Config file (default: $JUMPBOX_CONFIG, /etc/jumpbox/jumpbox.yml, ~/.jumpbox.yml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Remote command passed by sshd; always refused
    #[arg(short = 'c', value_name = "COMMAND", hide = true)]
    command: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // One line, whole context chain
            eprintln!("jumpbox: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let (config_path, config) =
        JumpboxConfig::discover(cli.config.as_deref()).context("cannot load configuration")?;
    let _log_guard = logging::init_logging(&config.log)?;

    let operator = login_name();
    tracing::info!(config = %config_path.display(), %operator, "jumpbox starting");

    if let Some(command) = cli.command {
        tracing::warn!(
            target: "jumpbox::audit",
            %operator,
            %command,
            "refused remote command"
        );
        bail!("remote commands are not allowed, log in interactively");
    }
    if !std::io::stdin().is_terminal() || !std::io::stdout().is_terminal() {
        bail!("no terminal attached (try ssh -t)");
    }

    let token = config.token()?;
    let client = NetboxClient::new(&config.netbox, token, config.menu.grouping.clone())?;
    let root = load_menu(&client, &config.menu.grouping)
        .await
        .inspect_err(|e| tracing::error!("startup failed: {}", e))?;
    tracing::info!(devices = root.leaf_count(), "menu loaded");

    let dispatcher = SessionDispatcher::new(config.ssh.clone(), SshLauncher::new(), operator);
    let mut controller = Controller::new(root, config.menu.clone(), dispatcher, TuiFrontend::new());
    controller.run().await?;

    tracing::info!("jumpbox exiting");
    Ok(())
}

/// Login name of the real uid, falling back to `$USER`
fn login_name() -> String {
    // SAFETY: getpwuid returns a pointer into static storage; it is read
    // before any other passwd lookup can overwrite it.
    let from_passwd = unsafe {
        let pw = libc::getpwuid(libc::getuid());
        if pw.is_null() || (*pw).pw_name.is_null() {
            None
        } else {
            Some(CStr::from_ptr((*pw).pw_name).to_string_lossy().into_owned())
        }
    };

    from_passwd
        .or_else(|| std::env::var("USER").ok())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_config_and_login_shell_command() {
        let cli = Cli::try_parse_from(["jumpbox", "--config", "/tmp/j.yml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/j.yml")));
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["jumpbox", "-c", "uname -a"]).unwrap();
        assert_eq!(cli.command.as_deref(), Some("uname -a"));
    }

    #[test]
    fn test_login_name_is_never_empty() {
        assert!(!login_name().is_empty());
    }
}
