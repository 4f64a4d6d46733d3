use std::io;
use std::os::unix::process::ExitStatusExt;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::signal::unix::{SignalKind, signal};

use jumpbox_core::session::{ExitInfo, SessionLauncher, SshInvocation};

/// Runs the ssh client in the foreground with the login terminal inherited.
///
/// A SIGINT listener lives only for the length of one session, so an
/// interrupt typed during it is recorded against that session instead of
/// killing the jumpbox, and nothing received earlier carries over.
#[derive(Debug, Default)]
pub struct SshLauncher;

impl SshLauncher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SessionLauncher for SshLauncher {
    async fn launch(&mut self, invocation: &SshInvocation) -> io::Result<ExitInfo> {
        // Let the signal driver deliver anything already pending before subscribing
        tokio::task::yield_now().await;
        let mut interrupts = signal(SignalKind::interrupt())?;

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()?;

        let mut interrupted = false;
        let mut listening = true;
        let status = loop {
            tokio::select! {
                status = child.wait() => break status?,
                received = interrupts.recv(), if listening => match received {
                    Some(()) => {
                        tracing::debug!(program = %invocation.program, "interrupt during session");
                        interrupted = true;
                    }
                    None => listening = false,
                },
            }
        };

        Ok(ExitInfo {
            code: status.code(),
            signal: status.signal(),
            interrupted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> SshInvocation {
        SshInvocation {
            program: "sh".into(),
            args: vec!["-c".into(), script.into()],
        }
    }

    #[tokio::test]
    async fn test_exit_code_is_reported() {
        let mut launcher = SshLauncher::new();
        let exit = launcher.launch(&sh("exit 3")).await.unwrap();
        assert_eq!(exit.code, Some(3));
        assert_eq!(exit.signal, None);
    }

    #[tokio::test]
    async fn test_killed_by_signal() {
        let mut launcher = SshLauncher::new();
        let exit = launcher.launch(&sh("kill -TERM $$")).await.unwrap();
        assert_eq!(exit.code, None);
        assert_eq!(exit.signal, Some(libc::SIGTERM));
    }

    #[tokio::test]
    async fn test_interrupt_between_sessions_is_not_charged_to_the_next() {
        // Keeps a handler installed so the raised signal does not end the test binary
        let mut earlier = signal(SignalKind::interrupt()).unwrap();
        // SAFETY: raise only sends a signal to the calling thread
        assert_eq!(unsafe { libc::raise(libc::SIGINT) }, 0);
        earlier.recv().await;

        let mut launcher = SshLauncher::new();
        let exit = launcher.launch(&sh("exit 255")).await.unwrap();
        assert_eq!(exit.code, Some(255));
        assert!(!exit.interrupted);
    }

    #[tokio::test]
    async fn test_missing_program_is_an_error() {
        let mut launcher = SshLauncher::new();
        let inv = SshInvocation {
            program: "/nonexistent/jumpbox-ssh".into(),
            args: vec![],
        };
        assert!(launcher.launch(&inv).await.is_err());
    }
}
