//! Rational-time and timecode arithmetic.
//!
//! Every duration in a Cinecut timeline is an exact integer frame count at a
//! rational frame rate. Conversions between rates go through 128-bit integer
//! math so positions never drift, no matter how many clips a timeline holds.

use serde::{Deserialize, Serialize};

use crate::error::{CinecutError, CinecutResult};

/// A rational frames-per-second value (e.g. 30/1, 30000/1001).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRate {
    pub num: u32,
    pub den: u32,
}

impl FrameRate {
    /// Create a frame rate. A zero numerator or denominator is a programming
    /// error and panics.
    pub fn new(num: u32, den: u32) -> Self {
        assert!(num > 0 && den > 0, "frame rate must be positive: {num}/{den}");
        Self { num, den }
    }

    /// Whole frames-per-second convenience constructor.
    pub fn whole(fps: u32) -> Self {
        Self::new(fps, 1)
    }

    /// Frames per second as a float, for display and diagnostics only.
    pub fn fps(&self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

impl std::fmt::Display for FrameRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// An exact frame count at a rational rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RationalTime {
    /// Frame count. Operations that need a duration reject negative values.
    pub value: i64,

    /// The rate `value` is expressed at.
    pub rate: FrameRate,
}

impl RationalTime {
    pub fn new(value: i64, rate: FrameRate) -> Self {
        Self { value, rate }
    }

    /// Zero frames at the given rate.
    pub fn zero(rate: FrameRate) -> Self {
        Self { value: 0, rate }
    }

    /// Convert a second count to the nearest frame at `rate`.
    ///
    /// This is the boundary for callers that think in seconds; everything
    /// after it stays in integer frames.
    pub fn from_seconds(secs: f64, rate: FrameRate) -> Self {
        let value = (secs * rate.num as f64 / rate.den as f64).round() as i64;
        Self { value, rate }
    }

    /// Seconds as a float, for display and diagnostics only.
    pub fn to_seconds(&self) -> f64 {
        self.value as f64 * self.rate.den as f64 / self.rate.num as f64
    }

    /// Exact rescale to an integer frame count at `target`.
    ///
    /// Identity when the rates match. Otherwise the rescale is computed in
    /// i128 and rounded half away from zero, so the result is deterministic
    /// and a single conversion never drifts by more than half a frame.
    pub fn to_frames(&self, target: FrameRate) -> i64 {
        if self.rate == target {
            return self.value;
        }

        let numer = self.value as i128 * target.num as i128 * self.rate.den as i128;
        let denom = self.rate.num as i128 * target.den as i128;
        let rounded = if numer >= 0 {
            (2 * numer + denom) / (2 * denom)
        } else {
            (2 * numer - denom) / (2 * denom)
        };
        rounded as i64
    }
}

/// An exact half-open span of time: `start_time` plus `duration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start_time: RationalTime,
    pub duration: RationalTime,
}

impl TimeRange {
    pub fn new(start_time: RationalTime, duration: RationalTime) -> Self {
        Self {
            start_time,
            duration,
        }
    }
}

/// Format a frame count at `rate` as an `"HH:MM:SS.mmm"` display timecode.
///
/// Total milliseconds are computed and rounded once, then decomposed, so a
/// milliseconds round-up past 999 carries into seconds (and onward) without
/// any special casing. Negative frame counts are rejected.
pub fn frames_to_timecode(frames: i64, rate: FrameRate) -> CinecutResult<String> {
    assert!(
        rate.num > 0 && rate.den > 0,
        "frame rate must be positive: {rate}"
    );

    if frames < 0 {
        return Err(CinecutError::time(format!(
            "cannot format negative frame count {frames} as a timecode"
        )));
    }

    // total_ms = frames * 1000 * den / num, rounded half-up.
    let numer = frames as i128 * 1000 * rate.den as i128;
    let denom = rate.num as i128;
    let total_ms = (2 * numer + denom) / (2 * denom);

    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let seconds = (total_ms % 60_000) / 1_000;
    let millis = total_ms % 1_000;

    Ok(format!(
        "{hours:02}:{minutes:02}:{seconds:02}.{millis:03}"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timecode_zero() {
        assert_eq!(
            frames_to_timecode(0, FrameRate::whole(30)).unwrap(),
            "00:00:00.000"
        );
    }

    #[test]
    fn test_timecode_one_second() {
        assert_eq!(
            frames_to_timecode(30, FrameRate::whole(30)).unwrap(),
            "00:00:01.000"
        );
        assert_eq!(
            frames_to_timecode(24, FrameRate::whole(24)).unwrap(),
            "00:00:01.000"
        );
    }

    #[test]
    fn test_timecode_units_and_padding() {
        // 1h 2m 3s 500ms at 30 fps = 111705 frames
        let frames = (3600 + 120 + 3) * 30 + 15;
        assert_eq!(
            frames_to_timecode(frames, FrameRate::whole(30)).unwrap(),
            "01:02:03.500"
        );
    }

    #[test]
    fn test_timecode_millisecond_roundup_carries() {
        // 2 frames at 1999/1000 fps is 1000.5002 ms; rounding must land in
        // the seconds field, not produce ".1000".
        let rate = FrameRate::new(1999, 1000);
        assert_eq!(frames_to_timecode(2, rate).unwrap(), "00:00:01.001");
    }

    #[test]
    fn test_timecode_ntsc_rate() {
        let ntsc = FrameRate::new(30000, 1001);
        // 30000 frames at 29.97 fps is exactly 1001 seconds.
        assert_eq!(frames_to_timecode(30000, ntsc).unwrap(), "00:16:41.000");
    }

    #[test]
    fn test_timecode_rejects_negative_frames() {
        assert!(frames_to_timecode(-1, FrameRate::whole(30)).is_err());
    }

    #[test]
    #[should_panic]
    fn test_zero_rate_panics() {
        FrameRate::new(0, 1);
    }

    #[test]
    fn test_to_frames_identity_at_same_rate() {
        let t = RationalTime::new(12345, FrameRate::whole(30));
        assert_eq!(t.to_frames(FrameRate::whole(30)), 12345);
    }

    #[test]
    fn test_to_frames_exact_rescale() {
        let t = RationalTime::new(30, FrameRate::whole(30));
        assert_eq!(t.to_frames(FrameRate::whole(60)), 60);
        assert_eq!(t.to_frames(FrameRate::whole(15)), 15);

        // One second of NTSC at a whole rate.
        let ntsc = RationalTime::new(30000, FrameRate::new(30000, 1001));
        assert_eq!(ntsc.to_frames(FrameRate::whole(30)), 30030);
    }

    #[test]
    fn test_from_seconds_round_trip() {
        let rate = FrameRate::whole(30);
        let t = RationalTime::from_seconds(2.0, rate);
        assert_eq!(t.value, 60);
        assert!((t.to_seconds() - 2.0).abs() < 1e-9);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_rate() -> impl Strategy<Value = FrameRate> {
            prop_oneof![
                Just(FrameRate::whole(24)),
                Just(FrameRate::whole(25)),
                Just(FrameRate::whole(30)),
                Just(FrameRate::whole(60)),
                Just(FrameRate::new(30000, 1001)),
                Just(FrameRate::new(24000, 1001)),
            ]
        }

        proptest! {
            #[test]
            fn timecode_fields_reassemble_exactly(
                frames in 0i64..1_000_000_000,
                rate in arb_rate(),
            ) {
                let tc = frames_to_timecode(frames, rate).unwrap();

                let (h, rest) = tc.split_at(2);
                let (m, rest) = rest[1..].split_at(2);
                let (s, ms) = rest[1..].split_at(2);
                let h: i128 = h.parse().unwrap();
                let m: i128 = m.parse().unwrap();
                let s: i128 = s.parse().unwrap();
                let ms: i128 = ms[1..].parse().unwrap();

                prop_assert!(m < 60 && s < 60 && ms < 1000);

                let numer = frames as i128 * 1000 * rate.den as i128;
                let denom = rate.num as i128;
                let expected_ms = (2 * numer + denom) / (2 * denom);
                let reassembled = h * 3_600_000 + m * 60_000 + s * 1_000 + ms;
                prop_assert_eq!(reassembled, expected_ms);
            }

            #[test]
            fn to_frames_at_own_rate_never_drifts(
                value in 0i64..1_000_000_000,
                rate in arb_rate(),
            ) {
                let t = RationalTime::new(value, rate);
                prop_assert_eq!(t.to_frames(rate), value);
            }
        }
    }
}
