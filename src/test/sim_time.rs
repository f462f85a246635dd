use crate::sim::SimTime;

#[test]
fn sim_time_unit_conversions() {
    assert_eq!(SimTime::from_nanos(7), SimTime(7));
    assert_eq!(SimTime::from_micros(1), SimTime(1_000));
    assert_eq!(SimTime::from_millis(1), SimTime(1_000_000));
    assert_eq!(SimTime::from_secs(1), SimTime(1_000_000_000));
}

#[test]
fn sim_time_unit_conversions_saturate_on_overflow() {
    assert_eq!(SimTime::from_micros(u64::MAX), SimTime(u64::MAX));
    assert_eq!(SimTime::from_millis(u64::MAX), SimTime(u64::MAX));
    assert_eq!(SimTime::from_secs(u64::MAX), SimTime(u64::MAX));
}

#[test]
fn sim_time_arithmetic_saturates() {
    assert_eq!(SimTime(5).saturating_add(SimTime(6)), SimTime(11));
    assert_eq!(SimTime(u64::MAX).saturating_add(SimTime(1)), SimTime(u64::MAX));
    // 退避：slot * k
    assert_eq!(SimTime::from_nanos(51_200).saturating_mul(3), SimTime(153_600));
    assert_eq!(SimTime(u64::MAX).saturating_mul(2), SimTime(u64::MAX));
}
