use proptest::{prelude::*, test_runner::Config};

use thorchain_ingest::services::smoothing::ConfidenceWindow;

proptest! {
	#![proptest_config(Config {
		failure_persistence: None,
		..Config::default()
	})]

	#[test]
	fn test_window_keeps_last_values(size in 1usize..20, values in prop::collection::vec(0u8..5, 0..60)) {
		let mut window = ConfidenceWindow::new(size, 0.5);
		for value in &values {
			window.append(*value);
		}
		prop_assert_eq!(window.len(), values.len().min(size));
	}

	#[test]
	fn test_uniform_window_is_always_confident(
		size in 1usize..20,
		value in any::<u32>(),
		repeats in 1usize..40,
		threshold in 0.0f64..=1.0,
	) {
		let mut window = ConfidenceWindow::new(size, threshold);
		for _ in 0..repeats {
			window.append(value);
		}
		prop_assert_eq!(window.most_common(true), Some(value));
		prop_assert_eq!(window.dominant().map(|(_, share)| share), Some(1.0));
	}

	#[test]
	fn test_dominant_share_matches_counts(size in 1usize..20, values in prop::collection::vec(0u8..4, 1..60)) {
		let mut window = ConfidenceWindow::new(size, 0.5);
		for value in &values {
			window.append(*value);
		}
		let kept = &values[values.len().saturating_sub(size)..];
		let (value, share) = window.dominant().unwrap();
		let count = kept.iter().filter(|v| *v == value).count();

		prop_assert!((share - count as f64 / kept.len() as f64).abs() < 1e-9);
		for candidate in kept {
			prop_assert!(kept.iter().filter(|v| *v == candidate).count() <= count);
		}
	}

	#[test]
	fn test_threshold_only_filters(size in 1usize..20, values in prop::collection::vec(0u8..4, 1..60), threshold in 0.0f64..=1.0) {
		let mut window = ConfidenceWindow::new(size, threshold);
		for value in &values {
			window.append(*value);
		}
		let loose = window.most_common(false);
		prop_assert!(loose.is_some());
		match window.most_common(true) {
			Some(strict) => prop_assert_eq!(Some(strict), loose),
			None => prop_assert!(window.dominant().unwrap().1 < threshold),
		}
	}
}
