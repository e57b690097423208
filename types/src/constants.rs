/// Seconds spent in `idle` before the countdown starts.
pub const IDLE_DURATION_SECS: u64 = 5;

/// Seconds spent in `starting`.
pub const STARTING_DURATION_SECS: u64 = 3;

/// Seconds the betting window stays open.
pub const BETTING_DURATION_SECS: u64 = 10;

/// Seconds the crash result stays on screen before the next round.
pub const CRASHED_DURATION_SECS: u64 = 5;

/// Completed bets kept per player.
pub const RECENT_BETS_CAPACITY: usize = 10;

/// Crash points kept in the round history log.
pub const CRASH_HISTORY_CAPACITY: usize = 15;

/// Maximum user identifier length accepted on the wire.
pub const MAX_USER_ID_LENGTH: usize = 128;

/// Balance granted when a wallet account is first opened (100.00 coins).
pub const INITIAL_BALANCE: u64 = 100_00;

/// Smallest deposit accepted (1.00 coin).
pub const MIN_DEPOSIT: u64 = 1_00;

/// Largest deposit accepted in a single request (10,000.00 coins).
pub const MAX_DEPOSIT: u64 = 10_000_00;

/// Default crash pool in hundredths of a multiplier.
///
/// Draws are uniform over entries, so duplicates act as weights. Most of the
/// mass sits at or below 5.00x; a handful of entries reach into the teens and
/// one rare entry flies to 20.00x.
pub const DEFAULT_CRASH_POOL: [u64; 97] = [
    100, 102, 105, 108, 110, 113, 116, 119, 122, 125, 130, 135, 140, 145, 150, //
    160, 170, 180, 190, 200, 215, 230, 245, 260, 275, 290, 310, 330, 350, 375, //
    400, 425, 450, 475, 500, //
    100, 103, 106, 109, 111, 114, 117, 120, 123, 126, 131, 136, 141, 146, 151, //
    165, 175, 185, 195, 205, 220, 235, 250, 265, 280, 295, 315, 335, 355, 380, //
    405, 430, 455, 480, 500, //
    // Extra weight on instant crashes
    100, 100, 100, 100, 100, //
    150, 175, 225, 250, 275, 300, 325, 350, 375, 400, 425, 450, 475, //
    550, 600, 700, 800, 900, 1000, //
    1200, 1500, //
    2000,
];
