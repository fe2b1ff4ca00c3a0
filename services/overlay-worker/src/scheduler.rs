//! Cycle polling: re-decode only when the latest available cycle changes.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use renderer::OverlayConfig;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::cycle::CycleId;
use crate::pipeline::render_cycle;
use crate::slot::OverlaySlot;
use crate::source::GribSource;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between model run start and data availability
    pub latency: ChronoDuration,
    /// Seconds between cycle checks
    pub poll_interval: Duration,
    pub overlay: OverlayConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            latency: ChronoDuration::hours(4),
            poll_interval: Duration::from_secs(900),
            overlay: OverlayConfig::default(),
        }
    }
}

impl SchedulerConfig {
    /// Convert a publication latency given in hours, rejecting values chrono
    /// cannot represent and negative ones.
    pub fn latency_from_hours(hours: i64) -> Result<ChronoDuration> {
        if hours < 0 {
            return Err(anyhow!("Latency must not be negative, got {} hours", hours));
        }
        ChronoDuration::try_hours(hours)
            .ok_or_else(|| anyhow!("Latency of {} hours is out of range", hours))
    }
}

/// Result of one scheduler check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The cycle already has a published overlay
    Unchanged(CycleId),
    /// A new overlay was published for this cycle
    Published(CycleId),
}

pub struct CycleScheduler {
    source: Arc<dyn GribSource>,
    slot: OverlaySlot,
    config: SchedulerConfig,
}

impl CycleScheduler {
    pub fn new(source: Arc<dyn GribSource>, slot: OverlaySlot, config: SchedulerConfig) -> Self {
        Self {
            source,
            slot,
            config,
        }
    }

    pub fn current_cycle(&self, now: DateTime<Utc>) -> CycleId {
        CycleId::latest_available(now, self.config.latency)
    }

    /// True unless `cycle` is the one behind the published overlay.
    pub fn needs_update(&self, cycle: CycleId) -> bool {
        self.slot.last_cycle() != Some(cycle)
    }

    /// Fetch, decode and publish the cycle current at `now`, if it changed.
    ///
    /// On error nothing is published and the previous overlay stays in place;
    /// the same cycle is retried on the next call.
    pub async fn update(&self, now: DateTime<Utc>) -> Result<UpdateOutcome> {
        let cycle = self.current_cycle(now);
        if !self.needs_update(cycle) {
            debug!(cycle = %cycle, "Cycle unchanged, skipping fetch");
            return Ok(UpdateOutcome::Unchanged(cycle));
        }

        info!(cycle = %cycle, source = %self.source.describe(cycle), "New cycle available");
        let data = self.source.fetch(cycle).await?;

        let config = self.config.overlay.clone();
        let published = tokio::task::spawn_blocking(move || render_cycle(&data, cycle, &config))
            .await
            .context("Overlay render task failed")??;

        if self.slot.publish(published).is_some() {
            debug!(cycle = %cycle, "Replaced an overlay that was never taken");
        }
        info!(cycle = %cycle, "Published overlay");

        Ok(UpdateOutcome::Published(cycle))
    }

    /// Poll until a shutdown signal arrives.
    pub async fn run_forever(&self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            latency_hours = self.config.latency.num_hours(),
            "Starting cycle polling"
        );

        loop {
            match self.update(Utc::now()).await {
                Ok(UpdateOutcome::Published(cycle)) => {
                    info!(cycle = %cycle, "Overlay updated");
                }
                Ok(UpdateOutcome::Unchanged(_)) => {}
                Err(e) => {
                    warn!(
                        error = format!("{:#}", e),
                        last_cycle = ?self.slot.last_cycle(),
                        "Overlay update failed, keeping previous overlay"
                    );
                }
            }

            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Shutting down scheduler");
                    break;
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use bytes::Bytes;
    use chrono::TimeZone;
    use test_utils::{create_pressure_low_grid, create_vortex_wind, weather_message, Packing};

    /// Serves a swappable payload and counts fetches.
    struct MemorySource {
        payload: Mutex<Bytes>,
        fetches: AtomicUsize,
    }

    impl MemorySource {
        fn new(payload: Vec<u8>) -> Self {
            Self {
                payload: Mutex::new(Bytes::from(payload)),
                fetches: AtomicUsize::new(0),
            }
        }

        fn set_payload(&self, payload: Vec<u8>) {
            *self.payload.lock().unwrap() = Bytes::from(payload);
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GribSource for MemorySource {
        async fn fetch(&self, _cycle: CycleId) -> Result<Bytes> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.payload.lock().unwrap().clone())
        }

        fn describe(&self, _cycle: CycleId) -> String {
            "memory".to_string()
        }
    }

    fn valid_message() -> Vec<u8> {
        let pressure = create_pressure_low_grid(16, 8, 972.0, 48.0)
            .into_iter()
            .map(f32::round)
            .collect();
        let (u, v) = create_vortex_wind(16, 8, 15.0);
        weather_message(16, 8, pressure, u, v, Packing::Simple)
    }

    fn scheduler(source: Arc<MemorySource>, slot: OverlaySlot) -> CycleScheduler {
        let config = SchedulerConfig {
            poll_interval: Duration::from_millis(10),
            overlay: OverlayConfig {
                width: 80,
                height: 40,
                ..OverlayConfig::default()
            },
            ..SchedulerConfig::default()
        };
        CycleScheduler::new(source, slot, config)
    }

    fn at(h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, h, min, 0).unwrap()
    }

    #[test]
    fn test_latency_from_hours() {
        assert_eq!(
            SchedulerConfig::latency_from_hours(4).unwrap(),
            ChronoDuration::hours(4)
        );
        assert_eq!(
            SchedulerConfig::latency_from_hours(0).unwrap(),
            ChronoDuration::zero()
        );
        assert!(SchedulerConfig::latency_from_hours(-1).is_err());
        assert!(SchedulerConfig::latency_from_hours(i64::MAX).is_err());
        assert!(SchedulerConfig::latency_from_hours(i64::MAX / 3600 + 1).is_err());
    }

    #[tokio::test]
    async fn test_same_cycle_is_noop() {
        let source = Arc::new(MemorySource::new(valid_message()));
        let slot = OverlaySlot::new();
        let scheduler = scheduler(source.clone(), slot.clone());

        let first = scheduler.update(at(11, 0)).await.unwrap();
        assert!(matches!(first, UpdateOutcome::Published(c) if c.hour == 6));
        assert!(slot.take().is_some());

        // Still the 06z cycle two hours later
        let second = scheduler.update(at(13, 0)).await.unwrap();
        assert!(matches!(second, UpdateOutcome::Unchanged(c) if c.hour == 6));
        assert_eq!(source.fetches(), 1);
        assert!(slot.take().is_none());
    }

    #[tokio::test]
    async fn test_new_cycle_publishes_again() {
        let source = Arc::new(MemorySource::new(valid_message()));
        let slot = OverlaySlot::new();
        let scheduler = scheduler(source.clone(), slot.clone());

        scheduler.update(at(11, 0)).await.unwrap();
        let outcome = scheduler.update(at(16, 30)).await.unwrap();
        assert!(matches!(outcome, UpdateOutcome::Published(c) if c.hour == 12));
        assert_eq!(source.fetches(), 2);

        // Only the newest overlay is delivered
        assert_eq!(slot.take().map(|p| p.cycle.hour), Some(12));
        assert!(slot.take().is_none());
    }

    #[tokio::test]
    async fn test_failed_decode_keeps_previous_overlay() {
        let source = Arc::new(MemorySource::new(valid_message()));
        let slot = OverlaySlot::new();
        let scheduler = scheduler(source.clone(), slot.clone());

        scheduler.update(at(11, 0)).await.unwrap();
        let first_update = slot.last_update();

        source.set_payload(b"GRIB garbage".to_vec());
        assert!(scheduler.update(at(16, 30)).await.is_err());

        assert_eq!(slot.last_cycle().map(|c| c.hour), Some(6));
        assert_eq!(slot.last_update(), first_update);
        assert_eq!(slot.take().map(|p| p.cycle.hour), Some(6));

        // The failed cycle is retried on the next poll
        source.set_payload(valid_message());
        let outcome = scheduler.update(at(16, 45)).await.unwrap();
        assert!(matches!(outcome, UpdateOutcome::Published(c) if c.hour == 12));
        assert_eq!(source.fetches(), 3);
    }

    #[tokio::test]
    async fn test_run_forever_stops_on_shutdown() {
        let source = Arc::new(MemorySource::new(valid_message()));
        let slot = OverlaySlot::new();
        let scheduler = scheduler(source.clone(), slot.clone());

        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(async move { scheduler.run_forever(rx).await });

        // Wait for the first publish, then stop
        for _ in 0..500 {
            if slot.has_data() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tx.send(()).unwrap();

        assert!(handle.await.unwrap().is_ok());
        assert!(slot.has_data());
        assert_eq!(source.fetches(), 1);
    }
}
