//! IdGenerator port - run ID の生成
//!
//! # 実装
//! - **UlidGenerator**: Clock の時刻 + 乱数で ULID を作る

use crate::domain::RunId;
use crate::ports::Clock;
use ulid::Ulid;

pub trait IdGenerator: Send + Sync {
    fn generate_run_id(&self) -> RunId;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// Clock を受け取るので、FixedClock を使えば timestamp 部分が決定的になります。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_run_id(&self) -> RunId {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        RunId::from(Ulid::from_parts(timestamp_ms, rand::random()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SystemClock};
    use chrono::{TimeZone, Utc};

    #[test]
    fn generates_unique_ids() {
        let id_gen = UlidGenerator::new(SystemClock);

        let id1 = id_gen.generate_run_id();
        let id2 = id_gen.generate_run_id();

        assert_ne!(id1, id2);
        assert!(id1.to_string().starts_with("run-"));
    }

    #[test]
    fn fixed_clock_pins_the_timestamp() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let id_gen = UlidGenerator::new(FixedClock::new(fixed_time));

        let id1 = id_gen.generate_run_id();
        let id2 = id_gen.generate_run_id();

        // ランダム部分があるので ID は異なる
        assert_ne!(id1, id2);
        assert_eq!(id1.as_ulid().timestamp_ms(), fixed_time.timestamp_millis() as u64);
        assert_eq!(id2.as_ulid().timestamp_ms(), fixed_time.timestamp_millis() as u64);
    }
}
