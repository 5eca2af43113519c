use crate::{Backend, Engine, EngineConfig, Error, Result};
use log::{debug, info, warn};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;
use tokio::sync::oneshot;

enum Command {
    Goto(String, oneshot::Sender<Result<()>>),
    Screenshot(oneshot::Sender<Result<Vec<u8>>>),
    Close(oneshot::Sender<Result<()>>),
}

/// An async handle over one rendering session backed by a dedicated worker thread.
///
/// The worker thread owns the engine and executes commands sent from async
/// tasks, so the engine never has to be `Send`. The engine is closed exactly
/// once: on [`Session::close`], or as soon as the handle is dropped and the
/// command in progress (if any) has finished.
pub struct Session {
    id: u64,
    cmd_tx: Sender<Command>,
}

impl Session {
    /// Launch a new session on its own worker thread.
    pub async fn open<B: Backend>(backend: Arc<B>, config: EngineConfig) -> Result<Self> {
        static NEXT_ID: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(1);
        let id = NEXT_ID.fetch_add(1, std::sync::atomic::Ordering::Relaxed);

        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let (init_tx, init_rx) = oneshot::channel::<Result<()>>();

        thread::Builder::new()
            .name(format!("pageshot-session-{}", id))
            .spawn(move || {
                let mut engine = match backend.launch(&config) {
                    Ok(e) => e,
                    Err(err) => {
                        let _ = init_tx.send(Err(err));
                        return;
                    }
                };
                info!("session {} acquired", id);

                // The caller may have given up already; the engine is still released below.
                let _ = init_tx.send(Ok(()));

                let mut close_reply = None;
                while let Ok(cmd) = cmd_rx.recv() {
                    match cmd {
                        Command::Goto(url, resp) => {
                            let res = engine.load_url(&url);
                            let _ = resp.send(res);
                        }
                        Command::Screenshot(resp) => {
                            let res = engine.render_png();
                            let _ = resp.send(res);
                        }
                        Command::Close(resp) => {
                            close_reply = Some(resp);
                            break;
                        }
                    }
                }

                let res = engine.close();
                match &res {
                    Ok(()) => info!("session {} released", id),
                    Err(e) => warn!("session {} released with error: {}", id, e),
                }
                match close_reply {
                    Some(resp) => {
                        let _ = resp.send(res);
                    }
                    None => debug!("session {} handle dropped before close", id),
                }
            })
            .map_err(|e| Error::InitializationError(format!("Failed to spawn session worker: {}", e)))?;

        init_rx
            .await
            .map_err(|e| Error::SessionClosed(format!("worker init canceled: {}", e)))??;

        Ok(Self { id, cmd_tx })
    }

    /// Identifier used in log lines for this session
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Navigate to a URL and wait for the page to settle
    pub async fn goto(&self, url: &str) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Goto(url.to_string(), tx))?;
        rx.await
            .map_err(|e| Error::SessionClosed(format!("goto canceled: {}", e)))?
    }

    /// Capture the visible viewport as PNG bytes
    pub async fn screenshot(&self) -> Result<Vec<u8>> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Screenshot(tx))?;
        rx.await
            .map_err(|e| Error::SessionClosed(format!("screenshot canceled: {}", e)))?
    }

    /// Release the session and wait until the engine has been closed.
    pub async fn close(self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Close(tx))?;
        rx.await
            .map_err(|e| Error::SessionClosed(format!("close canceled: {}", e)))?
    }

    fn send(&self, cmd: Command) -> Result<()> {
        self.cmd_tx
            .send(cmd)
            .map_err(|_| Error::SessionClosed(format!("session {} worker has exited", self.id)))
    }
}
