//! Simulation constants and tuning parameters.
//!
//! Distances are in world units (one terrain block), durations in ticks.

// --- Flight initiation ---

/// Hard floor on any computed flight initiation distance.
pub const FID_FLOOR: f64 = 4.0;

/// Threats are seen out to this multiple of their own FID, the outer edge
/// of the alarm band.
pub const THREAT_SEARCH_FACTOR: f64 = ALARM_MAX_RATIO;

/// Share of FID removed at full habituation.
pub const HABITUATION_FID_REDUCTION: f64 = 0.5;

/// Health ratio below which the agent counts as badly injured.
pub const HEALTH_CRITICAL_RATIO: f64 = 0.5;
pub const HEALTH_CRITICAL_FACTOR: f64 = 1.3;

/// Health ratio below which the agent counts as lightly injured.
pub const HEALTH_INJURED_RATIO: f64 = 0.8;
pub const HEALTH_INJURED_FACTOR: f64 = 1.1;

pub const JUVENILE_FACTOR: f64 = 1.4;

/// Damage within this many ticks counts as recent.
pub const RECENT_DAMAGE_TICKS: u64 = 100;
pub const RECENT_DAMAGE_FACTOR: f64 = 1.5;

/// Speed below which the agent counts as near-stationary.
pub const STATIONARY_SPEED: f64 = 0.1;
pub const STATIONARY_FACTOR: f64 = 1.2;

/// Refuge beyond the detection range: more cautious.
pub const REFUGE_FAR_FACTOR: f64 = 1.2;
/// Refuge this close: can afford to wait.
pub const REFUGE_NEAR_DISTANCE: f64 = 8.0;
pub const REFUGE_NEAR_FACTOR: f64 = 0.8;

/// Radius used to count herd members for the dilution effect.
pub const HERD_COUNT_RADIUS: f64 = 16.0;
/// Herd size at which the dilution factor applies.
pub const HERD_DILUTION_COUNT: usize = 6;
pub const HERD_DILUTION_FACTOR: f64 = 0.9;
pub const ISOLATION_FACTOR: f64 = 1.15;

/// Light level (0..15) below which darkness raises caution.
pub const DARKNESS_LIGHT_LEVEL: u8 = 4;
pub const DARKNESS_FACTOR: f64 = 1.1;

/// Minimum ticks an agent keeps fleeing once flight starts.
pub const MIN_FLEE_TICKS: u64 = 80;

// --- Escape strategies ---

/// Closer than this share of FID: switch to refuge when the secondary allows it.
pub const REFUGE_SWITCH_RATIO: f64 = 0.6;
/// Farther than this share of FID: revert to the primary strategy.
pub const PRIMARY_REVERT_RATIO: f64 = 0.8;
/// Closer than this share of FID: a frozen agent bolts.
pub const FREEZE_BREAK_RATIO: f64 = 0.3;
/// Farther than this share of FID: the agent may freeze instead of fleeing.
pub const FREEZE_CONSIDER_RATIO: f64 = 0.7;
/// Dot product at or above which a threat counts as looking at the agent.
pub const LOOKING_AT_DOT: f64 = 0.5;

/// Vertical bias added to straight escape to clear low obstacles.
pub const STRAIGHT_LIFT: f64 = 0.1;
/// Magnitude of the heading-only fallback when no threat is known.
pub const HEADING_FALLBACK_SCALE: f64 = 0.5;

/// Angular rate of the zigzag sinusoid (radians per tick).
pub const ZIGZAG_PHASE_RATE: f64 = 0.8;
/// Range a redrawn zigzag intensity falls in.
pub const ZIGZAG_INTENSITY_MIN: f64 = 0.3;
pub const ZIGZAG_INTENSITY_MAX: f64 = 0.7;
/// Full width of the uniform horizontal jitter added to zigzag headings.
pub const ZIGZAG_JITTER: f64 = 0.1;
/// Upward kick applied when a zigzag hop fires.
pub const ZIGZAG_HOP_LIFT: f64 = 0.2;

/// Ticks a refuge lookup stays cached.
pub const REFUGE_CACHE_TTL_TICKS: u64 = 5;
/// Within this distance the refuge is reached.
pub const REFUGE_ARRIVAL_DISTANCE: f64 = 2.0;
/// Spacing of occlusion samples along a path.
pub const OCCLUSION_SAMPLE_STEP: f64 = 1.0;
/// How far along a perpendicular detour the path is sampled.
pub const DETOUR_SAMPLE_DISTANCE: f64 = 3.0;

// --- Panic ---

/// Ticks a stampede lasts once triggered, before wind-down.
pub const PANIC_DURATION_TICKS: u32 = 200;
/// Ticks after a stampede ends during which panic cannot retrigger.
pub const PANIC_COOLDOWN_TICKS: u32 = 600;
/// Countdown decrement per tick once winding down.
pub const PANIC_WIND_DOWN_RATE: u32 = 2;
/// A threat this close (share of FID) is "very close".
pub const PANIC_CRITICAL_RATIO: f64 = 0.5;
/// Threat count that saturates the base panic intensity.
pub const PANIC_INTENSITY_THREATS: f64 = 5.0;
pub const PANIC_CLOSE_THREAT_BONUS: f64 = 0.3;
/// Herd size above which panic intensity gets the crowd bonus.
pub const PANIC_CROWD_SIZE: usize = 5;
pub const PANIC_CROWD_BONUS: f64 = 0.2;
/// Rotational noise magnitude at full panic intensity.
pub const STAMPEDE_NOISE: f64 = 0.2;
/// Cached stampede directions shorter than this are treated as unset.
pub const STAMPEDE_DIRECTION_EPSILON: f64 = 0.1;

// --- Alarm ---

/// Threats closer than this share of FID: flee, don't call.
pub const ALARM_MIN_RATIO: f64 = 0.3;
/// Threats farther than this share of FID: not worth calling about.
pub const ALARM_MAX_RATIO: f64 = 1.5;
/// Dot product above which a listener already watches the threat.
pub const AWARENESS_DOT: f64 = 0.5;

// --- Light ---

/// Maximum light level.
pub const MAX_LIGHT_LEVEL: u8 = 15;
