use dojo_viewer::{ViewerConfig, context_loss::ReloadSchedule};
use instant::Instant;

use crate::common::test_utils::ms;

mod common;

#[test]
fn context_loss_reloads_once_a_second_later() {
    let config = ViewerConfig::default();
    let mut reload = ReloadSchedule::new(config.reload_delay);
    let t0 = Instant::now();

    assert!(!reload.is_lost());
    assert_eq!(reload.on_context_lost(t0), Some(t0 + ms(1000)));
    assert!(reload.is_lost());

    // further loss events while waiting change nothing
    assert_eq!(reload.on_context_lost(t0 + ms(10)), None);
    assert_eq!(reload.deadline(), Some(t0 + ms(1000)));

    assert!(!reload.take_due(t0 + ms(999)));
    assert!(reload.take_due(t0 + ms(1000)));
    assert!(!reload.take_due(t0 + ms(5000)));
    assert!(reload.is_lost());
}

#[test]
fn no_loss_means_no_reload() {
    let mut reload = ReloadSchedule::new(ms(1000));
    let t0 = Instant::now();
    assert!(!reload.take_due(t0 + ms(60_000)));
    assert_eq!(reload.deadline(), None);
}
