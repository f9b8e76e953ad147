//! Shared constants for integration tests

/// Entry id of "Thunder Strike" (Drumline, Advanced, $80, 2019)
pub const THUNDER_ID: &str = "acc_thunder";

/// Entry id of "Calm Waltz" (Full Band, Beginner, $20, 2001)
pub const WALTZ_ID: &str = "acc_waltz";

/// Entry id of "Boss Battle" (Media/Gaming, Advanced, $50, 2022)
pub const BOSS_ID: &str = "acc_boss";

/// Entry id of "Daily Rudiments" (Warmups, Beginner, $0, 2015)
pub const RUDIMENTS_ID: &str = "acc_rudiments";

/// Seeded order, as stored.
#[allow(dead_code)]
pub const SEEDED_IDS: [&str; 4] = [THUNDER_ID, WALTZ_ID, BOSS_ID, RUDIMENTS_ID];

#[allow(dead_code)]
pub const ACCESS_CODE: &str = "ACC1234";
