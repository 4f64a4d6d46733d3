//! Top-level loop: fetch, build, then navigate and dispatch until the user quits.

use std::io;

use thiserror::Error;

use crate::config::{MenuSettings, ReturnTo};
use crate::inventory::{InventoryError, InventorySource};
use crate::model::{DeviceRecord, MenuNode, SessionOutcome, SessionStatus};
use crate::navigator::{MenuView, Navigator, Note, Step};
use crate::session::{SessionDispatcher, SessionLauncher};
use crate::tree::{self, BuildError};

/// Terminal side of the menu.
///
/// The controller calls [`Frontend::start`] only once the menu has data, and
/// brackets every dispatched session with [`Frontend::suspend`] /
/// [`Frontend::resume`] so the session owns the terminal outright.
pub trait Frontend {
    fn start(&mut self) -> io::Result<()>;

    /// Draw `view` and block until the user submits a line.
    /// `Ok(None)` means the input stream is closed or the user asked to leave.
    fn read_line(&mut self, view: &MenuView) -> io::Result<Option<String>>;

    /// Ask a free-text question (e.g. a username). `Ok(None)` cancels.
    fn prompt(&mut self, question: &str) -> io::Result<Option<String>>;

    fn suspend(&mut self) -> io::Result<()>;
    fn resume(&mut self) -> io::Result<()>;
    fn finish(&mut self) -> io::Result<()>;
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error("cannot build menu: {0}")]
    Build(#[from] BuildError),

    #[error("no devices available")]
    NoDevices,

    #[error("terminal error: {0}")]
    Terminal(#[from] io::Error),
}

/// Fetch the inventory and build the menu tree.
///
/// An empty tree is an error: the menu is never shown without devices.
pub async fn load_menu<S>(source: &S, grouping: &[String]) -> Result<MenuNode, ControllerError>
where
    S: InventorySource + ?Sized,
{
    let devices = source.fetch().await?;
    tracing::info!(source = source.name(), devices = devices.len(), "inventory fetched");

    let root = tree::build(&devices, grouping)?;
    if root.children().is_empty() {
        return Err(ControllerError::NoDevices);
    }
    Ok(root)
}

pub struct Controller<F, L> {
    settings: MenuSettings,
    navigator: Navigator,
    dispatcher: SessionDispatcher<L>,
    frontend: F,
    note: Option<Note>,
}

impl<F: Frontend, L: SessionLauncher> Controller<F, L> {
    pub fn new(
        root: MenuNode,
        settings: MenuSettings,
        dispatcher: SessionDispatcher<L>,
        frontend: F,
    ) -> Self {
        let navigator = Navigator::new(root).with_quick_connect(settings.quick_connect);
        Self {
            settings,
            navigator,
            dispatcher,
            frontend,
            note: None,
        }
    }

    pub fn frontend(&self) -> &F {
        &self.frontend
    }

    pub fn dispatcher(&self) -> &SessionDispatcher<L> {
        &self.dispatcher
    }

    /// Run the menu until the user quits or input ends.
    pub async fn run(&mut self) -> Result<(), ControllerError> {
        self.frontend.start()?;
        let result = self.menu_loop().await;
        let finished = self.frontend.finish();
        result?;
        finished?;
        Ok(())
    }

    async fn menu_loop(&mut self) -> Result<(), ControllerError> {
        loop {
            let view = self.navigator.view(&self.settings.title, self.note.take());
            let line = match self.frontend.read_line(&view) {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("terminal read failed, leaving: {}", e);
                    break;
                }
            };

            match self.navigator.apply(&line) {
                Step::Stay(note) => self.note = note,
                Step::Exit => break,
                Step::Resolved(device) => {
                    self.note = self.dispatch(&device).await?;
                    if self.settings.return_to == ReturnTo::Root {
                        self.navigator.home();
                    }
                }
            }
        }
        tracing::info!("menu closed");
        Ok(())
    }

    /// Hand the terminal to one session; the returned note is shown on the
    /// next render.
    async fn dispatch(&mut self, device: &DeviceRecord) -> Result<Option<Note>, ControllerError> {
        let username = match self.username()? {
            Some(user) => user,
            None => return Ok(Some(Note::info("connection cancelled"))),
        };

        if let Err(e) = self.frontend.suspend() {
            tracing::warn!("cannot release terminal before session: {}", e);
        }
        let outcome = self.dispatcher.dispatch(device, username.as_deref()).await;
        // A menu that cannot come back fails its next read, which quits
        if let Err(e) = self.frontend.resume() {
            tracing::warn!("cannot restore menu after session: {}", e);
        }

        Ok(outcome_note(&outcome))
    }

    /// `Some(None)`: connect without `-l`; `None`: the user cancelled.
    fn username(&mut self) -> io::Result<Option<Option<String>>> {
        let ssh = self.dispatcher.settings();
        if let Some(user) = &ssh.username {
            return Ok(Some(Some(user.clone())));
        }
        if !ssh.prompt_username {
            return Ok(Some(None));
        }
        Ok(self
            .frontend
            .prompt("Username")?
            .map(|u| Some(u.trim().to_string()).filter(|u| !u.is_empty())))
    }
}

fn outcome_note(outcome: &SessionOutcome) -> Option<Note> {
    let text = outcome.diagnostic.clone()?;
    Some(match outcome.status {
        SessionStatus::Normal => Note::info(text),
        SessionStatus::ConnectionFailure | SessionStatus::UserInterrupted => Note::error(text),
    })
}
