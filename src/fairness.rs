/// cooperative fairness for long row loops
///
use async_std::task;

/// yields to the executor after every `every` rows so a loader walking thousands of
/// rows doesn't starve other tasks sharing the runtime.
#[derive(Debug, Clone)]
pub struct Fairness {
    every: usize,
    seen: usize,
    yields: usize,
}

impl Fairness {
    pub fn new(every: usize) -> Fairness {
        Fairness {
            every: every.max(1),
            seen: 0,
            yields: 0,
        }
    }

    /// count one processed row, yielding when the chunk is used up
    pub async fn tick(&mut self) {
        self.seen += 1;
        if self.seen % self.every == 0 {
            self.yields += 1;
            task::yield_now().await;
        }
    }

    pub fn rows(&self) -> usize {
        self.seen
    }

    pub fn yields(&self) -> usize {
        self.yields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yields_per_chunk() {
        async_std::task::block_on(async move {
            let mut fair = Fairness::new(3);
            for _ in 0..10 {
                fair.tick().await;
            }
            assert_eq!(fair.rows(), 10);
            assert_eq!(fair.yields(), 3);
        });
    }

    #[test]
    fn zero_means_every_row() {
        async_std::task::block_on(async move {
            let mut fair = Fairness::new(0);
            fair.tick().await;
            fair.tick().await;
            assert_eq!(fair.yields(), 2);
        });
    }
}
