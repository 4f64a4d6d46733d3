use async_trait::async_trait;

use crate::config::SshSettings;
use crate::model::{DeviceRecord, SessionOutcome, SessionStatus};

/// OpenSSH exits with 255 when the connection itself fails
pub const SSH_CONNECTION_FAILURE: i32 = 255;
const SIGINT: i32 = 2;
/// Shells report death-by-SIGINT as 128 + SIGINT
const EXIT_INTERRUPTED: i32 = 128 + SIGINT;

/// A fully resolved outbound SSH command line
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SshInvocation {
    pub program: String,
    pub args: Vec<String>,
}

impl SshInvocation {
    /// `{program} {extra args} [-l user] [-p port] -- {address}`
    ///
    /// The `--` keeps an inventory-supplied address from being parsed as an
    /// option.
    pub fn build(settings: &SshSettings, device: &DeviceRecord, username: Option<&str>) -> Self {
        let mut args = settings.args.clone();
        if let Some(user) = username.map(str::trim).filter(|u| !u.is_empty()) {
            args.push("-l".into());
            args.push(user.to_string());
        }
        if let Some(port) = settings.port {
            args.push("-p".into());
            args.push(port.to_string());
        }
        args.push("--".into());
        args.push(device.address.clone());

        Self {
            program: settings.program.clone(),
            args,
        }
    }

    /// Human-readable command line for logs
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// How the spawned client process ended
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExitInfo {
    pub code: Option<i32>,
    /// Terminating signal, when killed by one
    pub signal: Option<i32>,
    /// An interrupt reached the jumpbox while the session was running
    pub interrupted: bool,
}

impl ExitInfo {
    pub fn code(code: i32) -> Self {
        Self {
            code: Some(code),
            ..Self::default()
        }
    }
}

/// Best-effort mapping from exit status to a session outcome.
pub fn classify(device: &DeviceRecord, exit: ExitInfo) -> SessionOutcome {
    let (status, diagnostic) = match exit {
        ExitInfo { code: Some(0), .. } => (SessionStatus::Normal, None),
        ExitInfo {
            signal: Some(SIGINT),
            ..
        }
        | ExitInfo {
            code: Some(EXIT_INTERRUPTED),
            ..
        }
        | ExitInfo {
            interrupted: true, ..
        } => (
            SessionStatus::UserInterrupted,
            Some(format!("session to {} interrupted", device.name)),
        ),
        ExitInfo {
            code: Some(SSH_CONNECTION_FAILURE),
            ..
        } => (
            SessionStatus::ConnectionFailure,
            Some(format!(
                "could not connect to {} ({})",
                device.name, device.address
            )),
        ),
        ExitInfo {
            code: Some(code), ..
        } => (
            SessionStatus::Normal,
            Some(format!("session to {} exited with status {}", device.name, code)),
        ),
        ExitInfo {
            code: None,
            signal: Some(sig),
            ..
        } => (
            SessionStatus::ConnectionFailure,
            Some(format!("ssh to {} killed by signal {}", device.name, sig)),
        ),
        ExitInfo {
            code: None,
            signal: None,
            ..
        } => (
            SessionStatus::ConnectionFailure,
            Some(format!("ssh to {} ended without an exit status", device.name)),
        ),
    };

    SessionOutcome {
        device_id: device.id.clone(),
        status,
        diagnostic,
        exit_code: exit.code,
    }
}

/// Runs an outbound session to completion on the controlling terminal.
///
/// Implementations must inherit the terminal and must not return until the
/// client process has exited.
#[async_trait]
pub trait SessionLauncher: Send {
    async fn launch(&mut self, invocation: &SshInvocation) -> std::io::Result<ExitInfo>;
}

/// Turns a resolved device into one outbound session and reports how it went.
pub struct SessionDispatcher<L> {
    settings: SshSettings,
    launcher: L,
    operator: String,
}

impl<L: SessionLauncher> SessionDispatcher<L> {
    /// `operator` is the local login the sessions are audited under
    pub fn new(settings: SshSettings, launcher: L, operator: impl Into<String>) -> Self {
        Self {
            settings,
            launcher,
            operator: operator.into(),
        }
    }

    pub fn settings(&self) -> &SshSettings {
        &self.settings
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    pub async fn dispatch(&mut self, device: &DeviceRecord, username: Option<&str>) -> SessionOutcome {
        let invocation = SshInvocation::build(&self.settings, device, username);
        tracing::info!(
            target: "jumpbox::audit",
            operator = %self.operator,
            device = %device.id,
            name = %device.name,
            address = %device.address,
            remote_user = username.unwrap_or("-"),
            "session start"
        );
        tracing::debug!("exec: {}", invocation.command_line());

        let outcome = match self.launcher.launch(&invocation).await {
            Ok(exit) => classify(device, exit),
            Err(e) => SessionOutcome {
                device_id: device.id.clone(),
                status: SessionStatus::ConnectionFailure,
                diagnostic: Some(format!("failed to launch {}: {}", invocation.program, e)),
                exit_code: None,
            },
        };

        tracing::info!(
            target: "jumpbox::audit",
            operator = %self.operator,
            device = %device.id,
            status = outcome.status.label(),
            exit_code = ?outcome.exit_code,
            "session end"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sw1() -> DeviceRecord {
        DeviceRecord {
            id: "1".into(),
            name: "core-sw1".into(),
            address: "10.0.0.1".into(),
            groups: vec![Some("nyc".into()), Some("switch".into())],
            status: None,
        }
    }

    #[test]
    fn test_invocation_defaults() {
        let inv = SshInvocation::build(&SshSettings::default(), &sw1(), None);
        assert_eq!(inv.program, "ssh");
        assert_eq!(inv.args, vec!["--", "10.0.0.1"]);
        assert_eq!(inv.command_line(), "ssh -- 10.0.0.1");
    }

    #[test]
    fn test_invocation_with_user_port_and_args() {
        let settings = SshSettings {
            program: "/usr/bin/ssh".into(),
            args: vec!["-o".into(), "BatchMode=no".into()],
            username: Some("ignored-here".into()),
            port: Some(2222),
            prompt_username: false,
        };
        let inv = SshInvocation::build(&settings, &sw1(), Some(" netops "));
        assert_eq!(
            inv.args,
            vec!["-o", "BatchMode=no", "-l", "netops", "-p", "2222", "--", "10.0.0.1"]
        );
    }

    #[test]
    fn test_blank_username_is_omitted() {
        let inv = SshInvocation::build(&SshSettings::default(), &sw1(), Some("  "));
        assert_eq!(inv.args, vec!["--", "10.0.0.1"]);
    }

    #[test]
    fn test_classify_exit_statuses() {
        let d = sw1();

        let ok = classify(&d, ExitInfo::code(0));
        assert_eq!(ok.status, SessionStatus::Normal);
        assert!(ok.diagnostic.is_none());

        let refused = classify(&d, ExitInfo::code(255));
        assert_eq!(refused.status, SessionStatus::ConnectionFailure);
        assert!(refused.diagnostic.unwrap().contains("10.0.0.1"));

        assert_eq!(
            classify(&d, ExitInfo::code(130)).status,
            SessionStatus::UserInterrupted
        );

        let killed = ExitInfo {
            code: None,
            signal: Some(2),
            interrupted: false,
        };
        assert_eq!(classify(&d, killed).status, SessionStatus::UserInterrupted);

        let remote_fail = classify(&d, ExitInfo::code(1));
        assert_eq!(remote_fail.status, SessionStatus::Normal);
        assert_eq!(remote_fail.exit_code, Some(1));
        assert!(remote_fail.diagnostic.is_some());
    }

    #[test]
    fn test_interrupt_during_session_wins_over_exit_code() {
        let exit = ExitInfo {
            code: Some(255),
            signal: None,
            interrupted: true,
        };
        assert_eq!(classify(&sw1(), exit).status, SessionStatus::UserInterrupted);
    }

    struct Scripted {
        result: Option<std::io::Result<ExitInfo>>,
        seen: Vec<SshInvocation>,
    }

    #[async_trait]
    impl SessionLauncher for Scripted {
        async fn launch(&mut self, invocation: &SshInvocation) -> std::io::Result<ExitInfo> {
            self.seen.push(invocation.clone());
            self.result.take().unwrap_or(Ok(ExitInfo::code(0)))
        }
    }

    #[tokio::test]
    async fn test_dispatch_spawn_failure_is_connection_failure() {
        let launcher = Scripted {
            result: Some(Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no such file",
            ))),
            seen: vec![],
        };
        let mut dispatcher = SessionDispatcher::new(SshSettings::default(), launcher, "jump");
        let outcome = dispatcher.dispatch(&sw1(), Some("admin")).await;

        assert_eq!(outcome.status, SessionStatus::ConnectionFailure);
        assert!(outcome.diagnostic.unwrap().starts_with("failed to launch ssh"));
        assert_eq!(
            dispatcher.launcher().seen[0].args,
            vec!["-l", "admin", "--", "10.0.0.1"]
        );
    }
}
