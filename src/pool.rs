/// bounded pool for local blocking work (file reads and the like)
///
use anyhow::{anyhow, Result};
use async_channel::{bounded, Receiver, Sender};
use async_std::task;

/// at most `size` closures run on the blocking threads at once; callers beyond that
/// wait asynchronously for a permit instead of piling onto the thread pool.
#[derive(Debug, Clone)]
pub struct BlockingPool {
    size: usize,
    permits_tx: Sender<()>,
    permits_rx: Receiver<()>,
}

// returns the permit even if the closure panics
struct Permit(Sender<()>);

impl Drop for Permit {
    fn drop(&mut self) {
        let _ = self.0.try_send(());
    }
}

impl BlockingPool {
    pub fn new(size: usize) -> BlockingPool {
        let size = size.max(1);
        let (permits_tx, permits_rx) = bounded(size);
        for _ in 0..size {
            // capacity matches the permit count so this can't fail
            let _ = permits_tx.try_send(());
        }

        BlockingPool {
            size,
            permits_tx,
            permits_rx,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// permits not currently in use
    pub fn available(&self) -> usize {
        self.permits_rx.len()
    }

    /// run `f` on a blocking thread once a permit is free
    pub async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.permits_rx
            .recv()
            .await
            .map_err(|e| anyhow!("blocking pool closed: {}", e))?;
        let _permit = Permit(self.permits_tx.clone());

        Ok(task::spawn_blocking(f).await)
    }
}
