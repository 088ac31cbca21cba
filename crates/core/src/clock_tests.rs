// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn system_clock_is_monotonic() {
    let clock = SystemClock;
    let t1 = clock.now();
    let t2 = clock.now();
    assert!(t2 >= t1);
}

#[test]
fn fake_clock_advances_instant_and_epoch_together() {
    let clock = FakeClock::at_epoch_ms(5_000);
    let t1 = clock.now();
    clock.advance(Duration::from_secs(7));
    assert_eq!(clock.epoch_ms(), 12_000);
    assert!(clock.now().duration_since(t1) >= Duration::from_secs(7));
}

#[test]
fn fake_clock_clones_share_state() {
    let clock = FakeClock::new();
    let other = clock.clone();
    other.advance(Duration::from_secs(30));
    assert_eq!(clock.epoch_ms(), other.epoch_ms());
}

#[test]
fn fake_clock_set_epoch_ms() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(42);
    assert_eq!(clock.epoch_ms(), 42);
}
