//! Stability monitoring: a cooperative wall-clock polling loop over
//! interface presence and reachability, tracking drop/reconnect
//! transitions.

use crate::config::StabilityConfig;
use crate::detect::{detect_tunnel, interface_present};
use crate::model::{Rating, StabilityCheck, StabilityWindow};
use crate::probe::ping_once;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Fixed external target for the lightweight reachability probe.
const REACHABILITY_TARGET: &str = "1.1.1.1";

/// Ordered (max_drops, min_uptime_pct, rating) rows, evaluated
/// top-down.
pub const STABILITY_TIERS: &[(u32, f64, Rating)] = &[
    (0, 99.0, Rating::Excellent),
    (1, 95.0, Rating::Good),
    (2, 90.0, Rating::Acceptable),
    (3, 80.0, Rating::Poor),
];

pub fn stability_rating(drops: u32, uptime_pct: f64) -> Rating {
    STABILITY_TIERS
        .iter()
        .find(|(max_drops, min_uptime, _)| drops <= *max_drops && uptime_pct >= *min_uptime)
        .map(|(_, _, r)| *r)
        .unwrap_or(Rating::Unstable)
}

/// Incremental transition tracker. Pure with respect to time: callers
/// feed it connectivity observations and reconnect durations come from
/// the elapsed time between the observations they feed.
#[derive(Debug)]
pub struct WindowTracker {
    window: StabilityWindow,
    last_connected: Option<bool>,
    drop_started: Option<Instant>,
}

impl WindowTracker {
    pub fn new() -> Self {
        Self {
            window: StabilityWindow {
                checks: Vec::new(),
                drops: 0,
                reconnections: 0,
                reconnect_secs: Vec::new(),
                uptime_pct: 0.0,
                rating: Rating::Unknown,
            },
            last_connected: None,
            drop_started: None,
        }
    }

    pub fn record(&mut self, interface_present: bool, reachable: bool, now: Instant) {
        let connected = interface_present && reachable;
        self.window.checks.push(StabilityCheck {
            at: chrono::Utc::now().to_rfc3339(),
            interface_present,
            reachable,
            connected,
        });

        match (self.last_connected, connected) {
            (Some(true), false) => {
                self.window.drops += 1;
                self.drop_started = Some(now);
                warn!(drops = self.window.drops, "tunnel drop observed");
            }
            (Some(false), true) => {
                self.window.reconnections += 1;
                if let Some(started) = self.drop_started.take() {
                    self.window
                        .reconnect_secs
                        .push(now.duration_since(started).as_secs_f64());
                }
            }
            // First observation starting disconnected: the window opened
            // mid-drop, so a later recovery still counts.
            (None, false) => {
                self.drop_started = Some(now);
            }
            _ => {}
        }
        self.last_connected = Some(connected);
    }

    /// Freezes the window: computes uptime and the tier rating.
    pub fn finalize(mut self) -> StabilityWindow {
        let total = self.window.checks.len();
        let connected = self.window.checks.iter().filter(|c| c.connected).count();
        self.window.uptime_pct = if total == 0 {
            0.0
        } else {
            connected as f64 / total as f64 * 100.0
        };
        self.window.rating = stability_rating(self.window.drops, self.window.uptime_pct);
        self.window
    }
}

impl Default for WindowTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Polls connectivity until the configured duration elapses. The loop
/// blocks its caller for the full window; each check's wait is clamped
/// so the wall-clock end time is respected even when an individual
/// probe's timeout would overshoot it.
pub async fn monitor(cfg: &StabilityConfig, tunnel_interface: Option<&str>) -> StabilityWindow {
    let duration = Duration::from_secs(cfg.duration_secs);
    let interval = Duration::from_secs(cfg.check_interval_secs.max(1));
    let deadline = Instant::now() + duration;
    let mut tracker = WindowTracker::new();

    info!(
        duration_secs = cfg.duration_secs,
        interval_secs = cfg.check_interval_secs,
        "stability monitoring started"
    );

    loop {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        let remaining = deadline.duration_since(now);
        let probe_timeout = remaining.min(interval).min(Duration::from_secs(2));

        let check = async {
            let present = match tunnel_interface {
                Some(ifc) => interface_present(ifc).await,
                None => detect_tunnel().await.active,
            };
            let reachable = ping_once(REACHABILITY_TARGET, probe_timeout).await.is_some();
            (present, reachable)
        };
        // An overlong check must not push the window past its end; a
        // check cut off at the deadline is discarded, not recorded.
        match tokio::time::timeout(remaining, check).await {
            Ok((present, reachable)) => tracker.record(present, reachable, Instant::now()),
            Err(_) => break,
        }

        let now = Instant::now();
        if now >= deadline {
            break;
        }
        tokio::time::sleep(interval.min(deadline.duration_since(now))).await;
    }

    let window = tracker.finalize();
    info!(
        checks = window.checks.len(),
        drops = window.drops,
        uptime_pct = window.uptime_pct,
        rating = %window.rating,
        "stability monitoring finished"
    );
    window
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_sequence(states: &[bool]) -> StabilityWindow {
        let mut tracker = WindowTracker::new();
        let t0 = Instant::now();
        for (i, connected) in states.iter().enumerate() {
            tracker.record(*connected, *connected, t0 + Duration::from_secs(i as u64));
        }
        tracker.finalize()
    }

    #[test]
    fn stable_window_is_excellent() {
        let w = run_sequence(&[true; 15]);
        assert_eq!(w.drops, 0);
        assert_eq!(w.reconnections, 0);
        assert_eq!(w.uptime_pct, 100.0);
        assert_eq!(w.rating, Rating::Excellent);
    }

    #[test]
    fn counts_drops_and_reconnections() {
        let w = run_sequence(&[true, true, false, false, true, false, true]);
        assert_eq!(w.drops, 2);
        assert_eq!(w.reconnections, 2);
        assert_eq!(w.reconnect_secs.len(), 2);
        // First drop lasted two intervals, second one.
        assert!(w.reconnect_secs[0] >= w.reconnect_secs[1]);
    }

    #[test]
    fn window_ending_mid_drop_has_more_drops_than_reconnections() {
        let w = run_sequence(&[true, false, true, false]);
        assert_eq!(w.drops, 2);
        assert_eq!(w.reconnections, 1);
    }

    #[test]
    fn window_starting_mid_drop_can_reconnect_without_a_counted_drop() {
        let w = run_sequence(&[false, true]);
        assert_eq!(w.drops, 0);
        assert_eq!(w.reconnections, 1);
        assert!(w.reconnections <= w.drops + 1);
        // The in-progress drop still yields a reconnect duration.
        assert_eq!(w.reconnect_secs.len(), 1);
    }

    #[test]
    fn reconnections_never_exceed_drops_plus_one() {
        for states in [
            vec![false, true, false, true, false, true],
            vec![true, false, true, false, true],
            vec![false, false, true],
        ] {
            let w = run_sequence(&states);
            assert!(w.reconnections <= w.drops + 1, "states {:?}", states);
        }
    }

    #[test]
    fn unstable_scenario_rates_unstable() {
        // 15 checks at 2s intervals, 4 drops, 73% uptime.
        let states = [
            true, true, false, true, true, false, true, true, false, true, true, false, true,
            true, true,
        ];
        let w = run_sequence(&states);
        assert_eq!(w.drops, 4);
        assert!((w.uptime_pct - 73.33).abs() < 0.1);
        assert_eq!(w.rating, Rating::Unstable);
    }

    #[test]
    fn rating_tier_boundaries() {
        assert_eq!(stability_rating(0, 100.0), Rating::Excellent);
        assert_eq!(stability_rating(0, 99.0), Rating::Excellent);
        assert_eq!(stability_rating(1, 96.0), Rating::Good);
        assert_eq!(stability_rating(2, 91.0), Rating::Acceptable);
        assert_eq!(stability_rating(3, 85.0), Rating::Poor);
        assert_eq!(stability_rating(4, 99.0), Rating::Unstable);
        assert_eq!(stability_rating(0, 70.0), Rating::Unstable);
    }
}
