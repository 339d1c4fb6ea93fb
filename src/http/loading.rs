//! Loading indicator configuration and the show/hide timer.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use serde::Serialize;
use tokio::{task::JoinHandle, time::Instant};

use super::RequestConfig;

/// Minimum time a zero-delay indicator stays on screen.
pub const MIN_VISIBLE: Duration = Duration::from_millis(300);

pub type LoadingFn = Arc<dyn Fn() + Send + Sync>;

/// Effective loading/error display settings of one request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadingConfig {
    pub show_loading: bool,
    pub show_error: bool,
    pub show_error_mode: String,
    pub delay: Duration,
}

impl LoadingConfig {
    /// Overlays the per-call overrides of `config` on the instance defaults.
    pub fn resolve(defaults: &LoadingConfig, config: &RequestConfig) -> Self {
        let delay = match config.delay {
            DelayOverride::Disabled => Duration::ZERO,
            DelayOverride::After(delay) => delay,
            DelayOverride::Inherit => defaults.delay,
        };

        Self {
            show_loading: config.show_loading.unwrap_or(defaults.show_loading),
            show_error: config.show_error.unwrap_or(defaults.show_error),
            show_error_mode: config
                .show_error_mode
                .clone()
                .unwrap_or_else(|| defaults.show_error_mode.clone()),
            delay,
        }
    }
}

/// Per-call override of the show-loading delay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DelayOverride {
    /// Use the instance default
    #[default]
    Inherit,
    /// Show the indicator immediately
    Disabled,
    After(Duration),
}

impl From<bool> for DelayOverride {
    fn from(enabled: bool) -> Self {
        if enabled {
            DelayOverride::Inherit
        } else {
            DelayOverride::Disabled
        }
    }
}

impl From<Duration> for DelayOverride {
    fn from(delay: Duration) -> Self {
        DelayOverride::After(delay)
    }
}

/// Armed show-loading timer of a single request.
///
/// A zero delay shows the indicator synchronously; otherwise a task fires the
/// show callback once the delay elapses. `shown` flips only after the callback
/// returned, and is read only after the task was aborted and joined, so a hide
/// can never be overtaken by a late show.
///
/// Hides are paired with shows: the hide callback runs once, and only if the
/// show callback ran. Dropping the timer releases it the same way, so a
/// request future dropped mid-flight leaves no indicator behind.
pub(crate) struct LoadingTimer {
    started: Instant,
    delay: Duration,
    shown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    on_hide: Option<LoadingFn>,
}

impl LoadingTimer {
    pub(crate) fn arm(delay: Duration, on_show: LoadingFn, on_hide: Option<LoadingFn>) -> Self {
        let started = Instant::now();
        let shown = Arc::new(AtomicBool::new(false));

        let handle = if delay.is_zero() {
            on_show();
            shown.store(true, Ordering::SeqCst);
            None
        } else {
            let shown = shown.clone();
            Some(tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                on_show();
                shown.store(true, Ordering::SeqCst);
            }))
        };

        Self {
            started,
            delay,
            shown,
            handle,
            on_hide,
        }
    }

    /// How long to keep the indicator up after a successful response.
    ///
    /// Without a delay the indicator stays for at least [`MIN_VISIBLE`]. With
    /// one, a response landing within one delay-interval after the show is
    /// padded so the indicator stays up for a full interval.
    pub(crate) fn reconcile_delay(&self) -> Duration {
        let elapsed = self.started.elapsed();
        if self.delay.is_zero() {
            return MIN_VISIBLE.saturating_sub(elapsed);
        }

        if elapsed > self.delay && elapsed - self.delay < self.delay {
            self.delay - (elapsed - self.delay)
        } else {
            Duration::ZERO
        }
    }

    /// Cancels a pending show and reports whether the indicator is up.
    pub(crate) async fn cancel_show(&mut self) -> bool {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            let _ = handle.await;
        }
        self.shown.load(Ordering::SeqCst)
    }

    /// Cancels the timer, then hides the indicator if it was shown.
    pub(crate) async fn dismiss(mut self) {
        self.cancel_show().await;
    }
}

impl Drop for LoadingTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        if self.shown.swap(false, Ordering::SeqCst) {
            if let Some(on_hide) = &self.on_hide {
                on_hide();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    fn counter() -> (Arc<AtomicUsize>, LoadingFn) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        (
            count,
            Arc::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }),
        )
    }

    fn defaults() -> LoadingConfig {
        LoadingConfig {
            show_loading: true,
            show_error: false,
            show_error_mode: "toast".to_string(),
            delay: Duration::from_millis(300),
        }
    }

    #[test]
    fn test_resolve_inherits_defaults() {
        let resolved = LoadingConfig::resolve(&defaults(), &RequestConfig::default());
        assert_eq!(resolved, defaults());
    }

    #[test]
    fn test_resolve_overrides() {
        let config = RequestConfig {
            show_loading: Some(false),
            show_error: Some(true),
            show_error_mode: Some("modal".to_string()),
            delay: Duration::from_millis(50).into(),
            ..Default::default()
        };
        let resolved = LoadingConfig::resolve(&defaults(), &config);
        assert!(!resolved.show_loading);
        assert!(resolved.show_error);
        assert_eq!(resolved.show_error_mode, "modal");
        assert_eq!(resolved.delay, Duration::from_millis(50));

        let config = RequestConfig {
            delay: false.into(),
            ..Default::default()
        };
        assert_eq!(
            LoadingConfig::resolve(&defaults(), &config).delay,
            Duration::ZERO
        );

        let config = RequestConfig {
            delay: true.into(),
            ..Default::default()
        };
        assert_eq!(
            LoadingConfig::resolve(&defaults(), &config).delay,
            Duration::from_millis(300)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_delay_shows_immediately() {
        let (shows, on_show) = counter();
        let mut timer = LoadingTimer::arm(Duration::ZERO, on_show, None);
        assert_eq!(shows.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_millis(100)).await;
        assert_eq!(timer.reconcile_delay(), Duration::from_millis(200));

        tokio::time::advance(Duration::from_millis(400)).await;
        assert_eq!(timer.reconcile_delay(), Duration::ZERO);
        assert!(timer.cancel_show().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_delay_never_shows() {
        let (shows, on_show) = counter();
        let (hides, on_hide) = counter();
        let timer = LoadingTimer::arm(Duration::from_millis(300), on_show, Some(on_hide));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(timer.reconcile_delay(), Duration::ZERO);
        timer.dismiss().await;

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(shows.load(Ordering::SeqCst), 0);
        assert_eq!(hides.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconcile_pads_within_second_interval() {
        let (shows, on_show) = counter();
        let mut timer = LoadingTimer::arm(Duration::from_millis(300), on_show, None);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(shows.load(Ordering::SeqCst), 1);
        assert_eq!(timer.reconcile_delay(), Duration::from_millis(200));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(timer.reconcile_delay(), Duration::ZERO);
        assert!(timer.cancel_show().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_hides_once() {
        let (shows, on_show) = counter();
        let (hides, on_hide) = counter();
        let timer = LoadingTimer::arm(Duration::ZERO, on_show, Some(on_hide));

        timer.dismiss().await;
        assert_eq!(shows.load(Ordering::SeqCst), 1);
        assert_eq!(hides.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_before_delay_stops_show() {
        let (shows, on_show) = counter();
        let (hides, on_hide) = counter();
        let timer = LoadingTimer::arm(Duration::from_millis(300), on_show, Some(on_hide));

        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(timer);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(shows.load(Ordering::SeqCst), 0);
        assert_eq!(hides.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_after_show_hides() {
        let (shows, on_show) = counter();
        let (hides, on_hide) = counter();
        let timer = LoadingTimer::arm(Duration::from_millis(300), on_show, Some(on_hide));

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(shows.load(Ordering::SeqCst), 1);
        drop(timer);
        assert_eq!(hides.load(Ordering::SeqCst), 1);
    }
}
