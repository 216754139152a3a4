//! Periodic publication sweep scheduler.
//!
//! Issues move from scheduled to published in exactly two places: at
//! write time in the issue repository, and here. The sweep is the
//! catch-up path for issues whose publication date passes while they
//! sit in the database.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::db::{issue_repo, Database};

/// Periodic publication sweep.
pub struct PublishScheduler {
    db: Database,
    interval: Duration,
    shutdown: Arc<AtomicBool>,
}

impl PublishScheduler {
    /// Creates a new scheduler sweeping every `interval`.
    pub fn new(db: Database, interval: Duration) -> Self {
        Self {
            db,
            interval,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Starts the sweep loop as a background task.
    ///
    /// One sweep runs immediately to catch issues that matured while the
    /// process was down; after that the loop waits on the interval timer
    /// or a manual trigger. Accepts a trigger receiver for on-demand
    /// sweeps.
    pub fn start(&self, mut trigger_rx: broadcast::Receiver<()>) -> JoinHandle<()> {
        let db = self.db.clone();
        let shutdown = Arc::clone(&self.shutdown);
        let interval = self.interval;

        tokio::spawn(async move {
            sweep_once(&db);

            let mut interval_timer = tokio::time::interval(interval);
            interval_timer.tick().await; // skip immediate first tick

            loop {
                if shutdown.load(Ordering::Acquire) {
                    break;
                }

                tokio::select! {
                    _ = interval_timer.tick() => {},
                    Ok(()) = trigger_rx.recv() => {
                        log::info!("Manual publication sweep triggered");
                    },
                }

                if shutdown.load(Ordering::Acquire) {
                    break;
                }

                sweep_once(&db);
            }
        })
    }

    /// Signals the scheduler to stop.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Release);
    }
}

fn sweep_once(db: &Database) {
    match issue_repo::publish_due(db, Utc::now()) {
        Ok(0) => {}
        Ok(published) => log::info!("Publication sweep: {} issue(s) published", published),
        Err(e) => log::error!("Publication sweep failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_unpublished_due(db: &Database, id: &str) {
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO issues (id, title, original_filename, page_image_urls, total_pages,
                 publication_date, publication_day, is_published, created_at, updated_at)
                 VALUES (?1, 'Edition', 'f.pdf', '[]', 0, '2020-01-01T00:00:00.000Z',
                 ?2, 0, '2020-01-01T00:00:00.000Z', '2020-01-01T00:00:00.000Z')",
                rusqlite::params![id, format!("2020-01-{:02}", 1 + id.len() % 27)],
            )?;
            Ok(())
        })
        .unwrap();
    }

    fn is_published(db: &Database, id: &str) -> bool {
        db.with_conn(|conn| {
            let flag: bool = conn.query_row(
                "SELECT is_published FROM issues WHERE id = ?1",
                rusqlite::params![id],
                |r| r.get(0),
            )?;
            Ok(flag)
        })
        .unwrap()
    }

    async fn wait_until(mut check: impl FnMut() -> bool) -> bool {
        for _ in 0..40 {
            if check() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_startup_sweep_publishes_matured_issues() {
        let db = Database::open_in_memory().unwrap();
        seed_unpublished_due(&db, "a");

        let scheduler = PublishScheduler::new(db.clone(), Duration::from_secs(3600));
        let (trigger_tx, trigger_rx) = broadcast::channel(16);
        let handle = scheduler.start(trigger_rx);

        assert!(wait_until(|| is_published(&db, "a")).await);

        scheduler.stop();
        let _ = trigger_tx.send(());
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_manual_trigger_wakes_the_loop() {
        let db = Database::open_in_memory().unwrap();

        let scheduler = PublishScheduler::new(db.clone(), Duration::from_secs(3600));
        let (trigger_tx, trigger_rx) = broadcast::channel(16);
        let handle = scheduler.start(trigger_rx);

        // Give the startup sweep a moment, then add a due issue the loop
        // only sees after a trigger.
        tokio::time::sleep(Duration::from_millis(50)).await;
        seed_unpublished_due(&db, "bb");
        trigger_tx.send(()).unwrap();

        assert!(wait_until(|| is_published(&db, "bb")).await);

        scheduler.stop();
        let _ = trigger_tx.send(());
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();
    }
}
