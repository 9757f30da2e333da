use anyhow::Result;
use async_channel::{bounded, Receiver, Sender};
use async_std::future;
use domain_keys::keys::RouteKey;
use log::*;
use service_uptime::Uptime;
use std::future::Future;
use std::time::Instant;

use super::Command;
use crate::worker::{JsonString, WorkerState, WorkerStatus};

/// why a loop woke up
#[derive(Debug)]
pub(crate) enum Wake {
    Tick,
    Command(Command),
    Closed,
}

/// wait for the next tick (`None` waits for commands only) or the next command
pub(crate) async fn wait_for(rx: &Receiver<Command>, next_run: Option<Instant>) -> Wake {
    let received = match next_run {
        None => rx.recv().await,
        Some(at) => {
            let delay = at.saturating_duration_since(Instant::now());
            match future::timeout(delay, rx.recv()).await {
                Ok(received) => received,
                Err(_) => return Wake::Tick,
            }
        }
    };

    match received {
        Ok(cmd) => Wake::Command(cmd),
        Err(_) => Wake::Closed,
    }
}

/// the counters every loop reports in its status
#[derive(Debug, Default, Clone)]
pub(crate) struct LoopStats {
    pub state: WorkerState,
    pub passes: u64,
    pub error_count: u16,
}

impl LoopStats {
    pub fn failed(&mut self) {
        self.error_count = self.error_count.saturating_add(1);
    }

    pub fn status(&self, id: &str, role: &str, uptime: &Uptime) -> WorkerStatus {
        WorkerStatus::new(
            id.to_string(),
            role.to_string(),
            self.state.clone(),
            uptime.to_string(),
            self.error_count,
        )
        .with_passes(self.passes)
    }
}

// helper functions
pub(crate) async fn send_response(msg: JsonString, tx: Sender<JsonString>) -> u16 {
    if let Err(e) = tx.send(msg).await {
        error!("error sending message: {:?}", e);
        1u16
    } else {
        0u16
    }
}

/// handle to one supervised loop
#[derive(Debug, Clone)]
pub struct LoopWorker {
    id: String,
    role: &'static str,
    uptime: Uptime,
    request_tx: Sender<Command>,
}

impl LoopWorker {
    /// create the command channel and run the handler loop as a background task.
    pub fn spawn<F, Fut>(role: &'static str, handler: F) -> LoopWorker
    where
        F: FnOnce(String, Receiver<Command>) -> Fut,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let uptime = Uptime::new();
        let id = RouteKey::create();

        info!("starting up {} worker, id: {}", role, id);

        let (request_tx, request_receiver) = bounded(250);
        let handler_loop = handler(id.clone(), request_receiver);

        let wid = id.clone();
        async_std::task::spawn(async move {
            match handler_loop.await {
                Ok(()) => info!("{} handler exit for worker id: {}", role, wid),
                Err(e) => error!("{} worker exit with error: {:?}", role, e),
            }
        });

        LoopWorker {
            id,
            role,
            uptime,
            request_tx,
        }
    }

    /// return the worker's id
    pub fn id(&self) -> String {
        self.id.to_string()
    }

    pub fn role(&self) -> &'static str {
        self.role
    }

    /// return the time this worker has been alive
    pub fn get_uptime(&self) -> String {
        self.uptime.to_string()
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.uptime.get_uptime_seconds()
    }

    /// This is invoked by the client to enable sending command request to
    /// the worker
    pub fn request_channel(&self) -> Sender<Command> {
        self.request_tx.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.request_tx.is_closed()
    }

    pub async fn status(&self) -> Result<WorkerStatus> {
        let (responder, rx) = bounded(1);
        self.request_tx.send(Command::Status(responder)).await?;
        let js = rx.recv().await?;

        Ok(serde_json::from_str(&js)?)
    }

    pub async fn run_now(&self) -> Result<()> {
        self.request_tx.send(Command::RunNow).await?;
        Ok(())
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.request_tx.send(Command::Shutdown).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn echo_handler(id: String, rx: Receiver<Command>) -> Result<()> {
        let uptime = Uptime::new();
        let mut stats = LoopStats::default();
        loop {
            match wait_for(&rx, None).await {
                Wake::Command(Command::Status(tx)) => {
                    let msg = stats.status(&id, "echo", &uptime).to_json();
                    stats.error_count += send_response(msg, tx).await;
                }
                Wake::Command(Command::RunNow) | Wake::Tick => stats.passes += 1,
                Wake::Command(Command::Shutdown) | Wake::Closed => break,
            }
        }
        rx.close();
        Ok(())
    }

    #[test]
    fn spawn_status_shutdown() {
        async_std::task::block_on(async move {
            let worker = LoopWorker::spawn("echo", echo_handler);
            assert_eq!(worker.id().len(), 16);
            assert_eq!(worker.role(), "echo");

            worker.run_now().await.expect("run now");
            let status = worker.status().await.expect("status");
            assert_eq!(status.worker_id, worker.id());
            assert_eq!(status.passes, 1);
            assert_eq!(status.state, WorkerState::Idle);

            worker.shutdown().await.expect("shutdown");
        });
    }

    #[test]
    fn wait_for_ticks_on_deadline() {
        async_std::task::block_on(async move {
            let (_tx, rx) = bounded::<Command>(1);
            let next = Instant::now() + Duration::from_millis(10);
            assert!(matches!(wait_for(&rx, Some(next)).await, Wake::Tick));
        });
    }

    #[test]
    fn wait_for_sees_closed_channel() {
        async_std::task::block_on(async move {
            let (tx, rx) = bounded::<Command>(1);
            drop(tx);
            assert!(matches!(wait_for(&rx, None).await, Wake::Closed));
        });
    }
}
