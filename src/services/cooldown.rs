// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Countdown gating OTP resends.
//!
//! [`Countdown`] is the pure, tickable state. [`ResendCooldown`] drives it
//! from a tokio task once per second and stops that task on `cancel()` or
//! when dropped.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Seconds a user must wait between OTP resends.
pub const DEFAULT_RESEND_COOLDOWN_SECS: u32 = 30;

const TICK: Duration = Duration::from_secs(1);

/// Remaining-seconds counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Countdown {
    remaining: u32,
}

impl Countdown {
    /// Arm (or re-arm) the countdown.
    pub fn start(&mut self, seconds: u32) {
        self.remaining = seconds;
    }

    /// Advance by one second. Returns `true` once the countdown is finished.
    pub fn tick(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining == 0
    }

    pub fn cancel(&mut self) {
        self.remaining = 0;
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.remaining > 0
    }

    pub fn can_resend(&self) -> bool {
        self.remaining == 0
    }
}

/// Resend cooldown driven by a background ticker.
///
/// Requires a tokio runtime for [`ResendCooldown::start`].
pub struct ResendCooldown {
    duration_secs: u32,
    state: Arc<watch::Sender<Countdown>>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl ResendCooldown {
    pub fn new(duration_secs: u32) -> Self {
        let (tx, _rx) = watch::channel(Countdown::default());
        Self {
            duration_secs,
            state: Arc::new(tx),
            ticker: Mutex::new(None),
        }
    }

    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    /// Arm the cooldown, restarting from the full duration if already running.
    pub fn start(&self) {
        let mut ticker = self.ticker.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = ticker.take() {
            handle.abort();
        }

        self.state.send_modify(|c| c.start(self.duration_secs));
        if self.duration_secs == 0 {
            return;
        }

        let state = Arc::clone(&self.state);
        *ticker = Some(tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + TICK, TICK);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let mut finished = false;
                state.send_modify(|c| finished = c.tick());
                if finished {
                    tracing::debug!("Resend cooldown finished");
                    break;
                }
            }
        }));
        tracing::debug!(seconds = self.duration_secs, "Resend cooldown started");
    }

    /// Stop ticking and allow resends immediately.
    pub fn cancel(&self) {
        if let Some(handle) = self
            .ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
        self.state.send_modify(Countdown::cancel);
    }

    pub fn remaining(&self) -> u32 {
        self.state.borrow().remaining()
    }

    pub fn can_resend(&self) -> bool {
        self.state.borrow().can_resend()
    }

    /// Watch the countdown as it ticks.
    pub fn subscribe(&self) -> watch::Receiver<Countdown> {
        self.state.subscribe()
    }
}

impl Default for ResendCooldown {
    fn default() -> Self {
        Self::new(DEFAULT_RESEND_COOLDOWN_SECS)
    }
}

impl Drop for ResendCooldown {
    fn drop(&mut self) {
        if let Some(handle) = self
            .ticker
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_countdown_ticks_to_zero_and_stays() {
        let mut c = Countdown::default();
        assert!(c.can_resend());

        c.start(3);
        assert!(!c.can_resend());
        assert!(!c.tick());
        assert!(!c.tick());
        assert!(c.tick());
        assert!(c.can_resend());
        assert!(c.tick());
        assert_eq!(c.remaining(), 0);
    }

    #[test]
    fn test_countdown_restart_and_cancel() {
        let mut c = Countdown::default();
        c.start(30);
        c.tick();
        c.start(30);
        assert_eq!(c.remaining(), 30);

        c.cancel();
        assert!(c.can_resend());
        assert!(!c.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_counts_down_in_real_seconds() {
        let cooldown = ResendCooldown::new(30);
        cooldown.start();
        assert_eq!(cooldown.remaining(), 30);

        tokio::time::sleep(Duration::from_millis(10_500)).await;
        assert_eq!(cooldown.remaining(), 20);
        assert!(!cooldown.can_resend());

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(cooldown.can_resend());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_resets_to_full_duration() {
        let cooldown = ResendCooldown::new(30);
        cooldown.start();
        tokio::time::sleep(Duration::from_millis(25_500)).await;
        assert_eq!(cooldown.remaining(), 5);

        cooldown.start();
        assert_eq!(cooldown.remaining(), 30);
        tokio::time::sleep(Duration::from_millis(10_500)).await;
        assert_eq!(cooldown.remaining(), 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticker() {
        let cooldown = ResendCooldown::new(30);
        let mut rx = cooldown.subscribe();
        cooldown.start();
        cooldown.cancel();
        assert!(cooldown.can_resend());

        rx.borrow_and_update();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts_ticker() {
        let cooldown = ResendCooldown::new(30);
        let mut rx = cooldown.subscribe();
        cooldown.start();
        rx.borrow_and_update();
        drop(cooldown);

        tokio::time::sleep(Duration::from_secs(2)).await;
        // The sender is gone and no further ticks were delivered.
        assert!(rx.changed().await.is_err());
    }
}
