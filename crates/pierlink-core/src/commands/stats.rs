//! `!stats` reporter.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use pierlink_types::message::{Message, PlatformType};

use super::Executor;
use crate::stats::StatsManager;

/// Minimum time between two successful reports.
pub const EXEC_DELAY: Duration = Duration::from_secs(60);

const MS_PER_DAY: u64 = 86_400_000;
const MS_PER_HOUR: u64 = 3_600_000;
const MS_PER_MINUTE: u64 = 60_000;
const MS_PER_SECOND: u64 = 1_000;

pub struct StatsCommand {
    stats: Arc<StatsManager>,
    /// `None` until the first successful report.
    last_execution: Mutex<Option<Instant>>,
}

impl StatsCommand {
    pub fn new(stats: Arc<StatsManager>) -> Self {
        Self {
            stats,
            last_execution: Mutex::new(None),
        }
    }

    /// Build a report as of `now`, or `None` while rate limited.
    pub fn report_at(&self, now: Instant) -> Option<StatsReport> {
        {
            let mut last = self.last_execution.lock();
            if let Some(prev) = *last
                && now.saturating_duration_since(prev) <= EXEC_DELAY
            {
                debug!("stats request rate limited");
                return None;
            }
            *last = Some(now);
        }
        Some(StatsReport::collect(&self.stats, now))
    }
}

impl Executor for StatsCommand {
    fn on_command(&self, _command: &Message) -> Option<String> {
        self.report_at(Instant::now()).map(|r| r.to_string())
    }
}

/// Snapshot rendered by the `!stats` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsReport {
    pub uptime: Duration,
    pub mean_ms: u64,
    pub median_ms: u64,
    pub from_irc: u64,
    pub from_discord: u64,
}

impl StatsReport {
    pub fn collect(stats: &StatsManager, now: Instant) -> Self {
        let mut timings = stats.timings();
        timings.sort_unstable();
        Self {
            uptime: stats.uptime_at(now),
            mean_ms: nanos_to_ms(mean(&timings)),
            median_ms: nanos_to_ms(median(&timings)),
            from_irc: stats.total_from(PlatformType::Irc),
            from_discord: stats.total_from(PlatformType::Discord),
        }
    }

    pub fn irc_percent(&self) -> u64 {
        percent(self.from_irc, self.from_irc + self.from_discord)
    }

    pub fn discord_percent(&self) -> u64 {
        100 - self.irc_percent()
    }
}

impl fmt::Display for StatsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let uptime_ms = u64::try_from(self.uptime.as_millis()).unwrap_or(u64::MAX);
        writeln!(f, "Uptime: {}", format_uptime(uptime_ms))?;
        writeln!(
            f,
            "Message Handling: {}ms / {}ms (mean/median)",
            self.mean_ms, self.median_ms
        )?;
        writeln!(
            f,
            "Messages from {}: {} ({}%)",
            PlatformType::Irc,
            self.from_irc,
            self.irc_percent()
        )?;
        write!(
            f,
            "Messages from {}: {} ({}%)",
            PlatformType::Discord,
            self.from_discord,
            self.discord_percent()
        )
    }
}

fn nanos_to_ms(nanos: u64) -> u64 {
    nanos / 1_000_000
}

/// Integer mean; 0 for an empty slice.
pub fn mean(values: &[u64]) -> u64 {
    if values.is_empty() {
        return 0;
    }
    let sum: u128 = values.iter().map(|&v| u128::from(v)).sum();
    (sum / values.len() as u128) as u64
}

/// Median of an already sorted slice; 0 when empty.
pub fn median(sorted: &[u64]) -> u64 {
    let n = sorted.len();
    match n {
        0 => 0,
        _ if n % 2 == 1 => sorted[n / 2],
        _ => {
            let (a, b) = (u128::from(sorted[n / 2 - 1]), u128::from(sorted[n / 2]));
            ((a + b) / 2) as u64
        }
    }
}

/// `value` as a rounded percentage of `total`.
///
/// An empty total and a full share both give 100.
pub fn percent(value: u64, total: u64) -> u64 {
    if total == 0 || value == total {
        return 100;
    }
    (value as f64 * 100.0 / total as f64).round() as u64
}

pub fn format_uptime(millis: u64) -> String {
    let days = millis / MS_PER_DAY;
    let rest = millis % MS_PER_DAY;
    let hours = rest / MS_PER_HOUR;
    let rest = rest % MS_PER_HOUR;
    let minutes = rest / MS_PER_MINUTE;
    let seconds = (rest % MS_PER_MINUTE) / MS_PER_SECOND;
    format!("{days} days, {hours} hours, {minutes} minutes, {seconds} seconds")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_median() {
        assert_eq!(mean(&[10, 20, 30]), 20);
        assert_eq!(median(&[10, 20, 30]), 20);
        assert_eq!(median(&[10, 20, 30, 40]), 25);
        assert_eq!(mean(&[]), 0);
        assert_eq!(median(&[]), 0);
        assert_eq!(mean(&[u64::MAX, u64::MAX]), u64::MAX);
    }

    #[test]
    fn percent_edges() {
        assert_eq!(percent(0, 0), 100);
        assert_eq!(percent(5, 5), 100);
        assert_eq!(percent(1, 4), 25);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(0, 7), 0);
    }

    #[test]
    fn uptime_fields() {
        assert_eq!(format_uptime(90_061_000), "1 days, 1 hours, 1 minutes, 1 seconds");
        assert_eq!(format_uptime(999), "0 days, 0 hours, 0 minutes, 0 seconds");
    }

    #[test]
    fn rate_limited_within_window() {
        let cmd = StatsCommand::new(Arc::new(StatsManager::new()));
        let t0 = Instant::now();
        assert!(cmd.report_at(t0).is_some());
        assert!(cmd.report_at(t0 + Duration::from_secs(30)).is_none());
        assert!(cmd.report_at(t0 + EXEC_DELAY).is_none());
        assert!(cmd.report_at(t0 + Duration::from_secs(61)).is_some());
        assert!(cmd.report_at(t0 + Duration::from_secs(62)).is_none());
    }

    #[test]
    fn concurrent_requests_get_one_report() {
        const THREADS: usize = 8;
        let cmd = StatsCommand::new(Arc::new(StatsManager::new()));
        let barrier = std::sync::Barrier::new(THREADS);
        let now = Instant::now();

        let reports = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        cmd.report_at(now)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(Option::is_some)
                .count()
        });

        assert_eq!(reports, 1);
    }

    #[test]
    fn rendered_report() {
        let start = Instant::now();
        let stats = Arc::new(StatsManager::started_at(start));
        stats.record_latency(PlatformType::Irc, Duration::from_millis(10));
        stats.record_latency(PlatformType::Irc, Duration::from_millis(20));
        stats.record_latency(PlatformType::Irc, Duration::from_millis(30));
        stats.record_latency(PlatformType::Discord, Duration::from_millis(40));

        let cmd = StatsCommand::new(stats);
        let report = cmd.report_at(start + Duration::from_millis(90_061_000)).unwrap();
        assert_eq!(
            report.to_string(),
            "Uptime: 1 days, 1 hours, 1 minutes, 1 seconds\n\
             Message Handling: 25ms / 25ms (mean/median)\n\
             Messages from IRC: 3 (75%)\n\
             Messages from Discord: 1 (25%)"
        );
    }

    #[test]
    fn empty_report_gives_irc_full_share() {
        let report = StatsReport::collect(&StatsManager::new(), Instant::now());
        assert_eq!(report.irc_percent(), 100);
        assert_eq!(report.discord_percent(), 0);
        assert_eq!(report.mean_ms, 0);
    }
}
