use proptest::{prelude::*, test_runner::Config};
use std::sync::Arc;
use tokio::runtime::Runtime;

use thorchain_ingest::services::{
	limiter::{Cooldown, GcraLimiter},
	store::MemoryStore,
};

const T0: f64 = 1_700_000_000.0;

proptest! {
	#![proptest_config(Config {
		failure_persistence: None,
		cases: 64,
		..Config::default()
	})]

	#[test]
	fn test_burst_allows_exactly_limit(limit in 1u32..50, emission in 1u32..60) {
		let period = (emission * limit) as f64;
		let allowed = Runtime::new().unwrap().block_on(async {
			let limiter = GcraLimiter::new(Arc::new(MemoryStore::new()), "burst", limit, period);
			let mut allowed = 0;
			for _ in 0..limit * 2 {
				if !limiter.is_limited_at(T0).await.unwrap() {
					allowed += 1;
				}
			}
			allowed
		});
		prop_assert_eq!(allowed, limit);
	}

	#[test]
	fn test_sustained_rate_never_limited(limit in 1u32..20, emission in 1u32..60, calls in 1usize..100) {
		let period = (emission * limit) as f64;
		let limited = Runtime::new().unwrap().block_on(async {
			let limiter = GcraLimiter::new(Arc::new(MemoryStore::new()), "steady", limit, period);
			let interval = limiter.emission_interval();
			let mut limited = false;
			for i in 0..calls {
				limited |= limiter.is_limited_at(T0 + i as f64 * interval).await.unwrap();
			}
			limited
		});
		prop_assert!(!limited);
	}

	#[test]
	fn test_window_admits_at_most_limit_plus_elapsed(
		limit in 1u32..20,
		period in 1.0f64..100.0,
		offsets in prop::collection::vec(0.0f64..200.0, 1..80),
	) {
		let mut times: Vec<f64> = offsets.into_iter().map(|o| T0 + o).collect();
		times.sort_by(|a, b| a.partial_cmp(b).unwrap());
		let span = times.last().unwrap() - times.first().unwrap();

		let allowed = Runtime::new().unwrap().block_on(async {
			let limiter = GcraLimiter::new(Arc::new(MemoryStore::new()), "window", limit, period);
			let mut allowed = 0u32;
			for now in &times {
				if !limiter.is_limited_at(*now).await.unwrap() {
					allowed += 1;
				}
			}
			allowed
		});

		let emission = period / limit as f64;
		let bound = limit as f64 + span / emission + 1.0;
		prop_assert!(allowed as f64 <= bound, "allowed {} over bound {}", allowed, bound);
	}

	#[test]
	fn test_cooldown_spacing(period in 1u32..1000, gaps in prop::collection::vec(0u32..500, 1..30)) {
		let period = period as f64;
		let accepted = Runtime::new().unwrap().block_on(async {
			let cooldown = Cooldown::new(Arc::new(MemoryStore::new()), "spacing", period);
			let mut now = T0;
			let mut accepted = Vec::new();
			for gap in gaps {
				now += gap as f64;
				if cooldown.can_do_at(now).await.unwrap() {
					cooldown.record_action_at(now).await.unwrap();
					accepted.push(now);
				}
			}
			accepted
		});
		for pair in accepted.windows(2) {
			prop_assert!(pair[1] - pair[0] >= period);
		}
	}
}
