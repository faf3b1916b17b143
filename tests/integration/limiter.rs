use std::sync::Arc;

use thorchain_ingest::services::{
	limiter::{Cooldown, CooldownBiTrigger, GcraLimiter, RateLimitCooldown, RateLimitResult},
	store::{KeyValueStore, MemoryStore},
};

const T0: f64 = 1_700_000_000.0;

fn store() -> Arc<dyn KeyValueStore> {
	Arc::new(MemoryStore::new())
}

#[tokio::test]
async fn test_bi_trigger_fires_once_per_transition() {
	let trigger = CooldownBiTrigger::new(store(), "node_offline", 10.0);
	assert!(!trigger.get_state().await.unwrap());

	let steps = [
		(true, 0.0, true),
		(true, 1.0, false),
		(false, 2.0, true),
		(false, 3.0, false),
		(true, 4.0, true),
		(true, 15.0, true),
	];
	for (on, offset, expected) in steps {
		assert_eq!(
			trigger.turn_at(on, T0 + offset).await.unwrap(),
			expected,
			"turn({}) at +{}",
			on,
			offset
		);
	}
	assert!(trigger.get_state().await.unwrap());
}

#[tokio::test]
async fn test_bi_trigger_switch_cooldown_suppresses_flapping() {
	let trigger = CooldownBiTrigger::with_switch_cooldown(store(), "flappy", 60.0, 5.0);

	assert!(trigger.turn_at(true, T0).await.unwrap());
	assert!(!trigger.turn_at(false, T0 + 2.0).await.unwrap());
	assert!(trigger.get_state().await.unwrap());

	assert!(trigger.turn_at(false, T0 + 6.0).await.unwrap());
	assert!(!trigger.get_state().await.unwrap());
}

#[tokio::test]
async fn test_bi_trigger_default_and_shared_state() {
	let shared = store();
	let trigger = CooldownBiTrigger::without_repeats(shared.clone(), "halted").with_default(true);
	assert!(trigger.get_state().await.unwrap());

	assert!(trigger.turn_at(false, T0).await.unwrap());

	let other_process = CooldownBiTrigger::without_repeats(shared, "halted");
	assert!(!other_process.get_state().await.unwrap());
	assert!(!other_process.turn_at(false, T0 + 86_400.0).await.unwrap());
}

#[tokio::test]
async fn test_cooldown_with_max_times() {
	let cooldown = Cooldown::with_max_times(store(), "alert", 100.0, 3);

	for i in 0..3 {
		assert!(cooldown.can_do_at(T0 + i as f64).await.unwrap());
		cooldown.record_action_at(T0 + i as f64).await.unwrap();
	}
	assert!(!cooldown.can_do_at(T0 + 50.0).await.unwrap());
	assert!(cooldown.can_do_at(T0 + 102.0).await.unwrap());

	cooldown.clear().await.unwrap();
	assert!(cooldown.can_do_at(T0 + 3.0).await.unwrap());
}

#[tokio::test]
async fn test_gcra_burst_then_sustained_rate() {
	let limiter = GcraLimiter::new(store(), "api", 3, 60.0);

	for _ in 0..3 {
		assert!(!limiter.is_limited_at(T0).await.unwrap());
	}
	assert!(limiter.is_limited_at(T0).await.unwrap());
	assert!(limiter.is_limited_at(T0 + 10.0).await.unwrap());

	assert!(!limiter.is_limited_at(T0 + 20.0).await.unwrap());
	assert!(limiter.is_limited_at(T0 + 20.0).await.unwrap());

	limiter.clear().await.unwrap();
	assert!(!limiter.is_limited_at(T0 + 20.0).await.unwrap());
}

#[tokio::test]
async fn test_gcra_limiters_share_state_by_name() {
	let shared = store();
	let a = GcraLimiter::new(shared.clone(), "shared", 1, 10.0);
	let b = GcraLimiter::new(shared.clone(), "shared", 1, 10.0);
	let other = GcraLimiter::new(shared, "other", 1, 10.0);

	assert!(!a.is_limited_at(T0).await.unwrap());
	assert!(b.is_limited_at(T0).await.unwrap());
	assert!(!other.is_limited_at(T0).await.unwrap());
}

#[tokio::test]
async fn test_rate_limit_announced_once_per_cooldown() {
	let limiter = RateLimitCooldown::new(store(), "swaps", 1, 10.0, 30.0);

	assert_eq!(limiter.hit_at(T0).await.unwrap(), RateLimitResult::Good);
	assert_eq!(limiter.hit_at(T0 + 1.0).await.unwrap(), RateLimitResult::HitLimit);
	assert_eq!(limiter.hit_at(T0 + 2.0).await.unwrap(), RateLimitResult::OnCooldown);
	assert_eq!(limiter.hit_at(T0 + 20.0).await.unwrap(), RateLimitResult::OnCooldown);
	assert_eq!(limiter.hit_at(T0 + 31.0).await.unwrap(), RateLimitResult::Good);

	limiter.clear().await.unwrap();
	assert_eq!(limiter.hit_at(T0 + 32.0).await.unwrap(), RateLimitResult::Good);
}
