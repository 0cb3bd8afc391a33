//! Input-order turns for filename claims.
//!
//! Workers render and extract concurrently, but claim filenames one at a
//! time in input order: a worker's turn comes once every earlier input has
//! claimed or failed. Collision suffixes therefore never depend on timing.

use std::sync::Arc;

use tokio::sync::watch;

#[derive(Debug)]
struct Progress {
    passed: Vec<bool>,
    /// Lowest index that has not passed.
    next: usize,
}

/// Hands out claim turns for a batch of `len` inputs.
#[derive(Debug, Clone)]
pub(crate) struct Turnstile {
    progress: Arc<watch::Sender<Progress>>,
}

impl Turnstile {
    pub(crate) fn new(len: usize) -> Self {
        let (progress, _) = watch::channel(Progress { passed: vec![false; len], next: 0 });
        Self { progress: Arc::new(progress) }
    }

    pub(crate) fn turn(&self, index: usize) -> Turn {
        Turn { turnstile: self.clone(), index }
    }

    fn pass(&self, index: usize) {
        self.progress.send_modify(|p| {
            if let Some(slot) = p.passed.get_mut(index) {
                *slot = true;
            }
            while p.passed.get(p.next).copied().unwrap_or(false) {
                p.next += 1;
            }
        });
    }
}

/// One input's place in line. Dropping it passes the turn, so failed or
/// aborted workers never hold up later inputs.
#[derive(Debug)]
pub(crate) struct Turn {
    turnstile: Turnstile,
    index: usize,
}

impl Turn {
    /// Wait until every earlier input has passed.
    pub(crate) async fn wait(&self) {
        let mut rx = self.turnstile.progress.subscribe();
        // The sender lives in `self`, so the channel cannot close while waiting.
        let _ = rx.wait_for(|p| p.next >= self.index).await;
    }

    pub(crate) fn pass(&self) {
        self.turnstile.pass(self.index);
    }
}

impl Drop for Turn {
    fn drop(&mut self) {
        self.pass();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    #[tokio::test]
    async fn test_turns_follow_index_order() {
        let turnstile = Turnstile::new(3);
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for (index, delay) in [(0, 60), (1, 0), (2, 20)] {
            let turn = turnstile.turn(index);
            let order = order.clone();
            handles.push(tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                turn.wait().await;
                order.lock().unwrap().push(index);
                turn.pass();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_dropped_turn_unblocks_later_inputs() {
        let turnstile = Turnstile::new(2);
        let first = turnstile.turn(0);
        let second = turnstile.turn(1);

        let waiter = tokio::spawn(async move {
            second.wait().await;
        });
        drop(first);

        tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_later_failure_does_not_skip_earlier_input() {
        let turnstile = Turnstile::new(3);
        let first = turnstile.turn(0);
        drop(turnstile.turn(2));

        let second = turnstile.turn(1);
        let waited = tokio::time::timeout(Duration::from_millis(50), second.wait()).await;
        assert!(waited.is_err());

        first.pass();
        tokio::time::timeout(Duration::from_secs(1), second.wait()).await.unwrap();
    }
}
