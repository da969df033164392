use super::*;

#[test]
fn portrait_scales_by_height() {
    let r = Resolution::fit(1000.0, 1500.0, 1200).unwrap();
    assert_eq!((r.width, r.height), (800, 1200));
    assert!((r.scale - 0.8).abs() < 1e-12);
}

#[test]
fn landscape_scales_by_width() {
    let r = Resolution::fit(101.0, 50.0, 1200).unwrap();
    assert_eq!((r.width, r.height), (1200, 594));
    assert!((r.scale - 11.881).abs() < 1e-3);
}

#[test]
fn odd_results_are_bumped_to_even() {
    // 111 * 1.2 = 133.2 rounds to 133, bumped to 134.
    let r = Resolution::fit(1000.0, 111.0, 1200).unwrap();
    assert_eq!((r.width, r.height), (1200, 134));
}

#[test]
fn square_uses_height_branch() {
    let r = Resolution::fit(500.0, 500.0, 1200).unwrap();
    assert_eq!((r.width, r.height), (1200, 1200));
}

#[test]
fn zero_size_is_rejected() {
    assert!(Resolution::fit(0.0, 10.0, 1200).is_err());
    assert!(Resolution::fit(10.0, 10.0, 0).is_err());
}
