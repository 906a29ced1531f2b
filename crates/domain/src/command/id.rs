//! Correlation id attached to every outbound command.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::time::Timestamp;

/// Correlation id echoed back by the device in its `result` message.
///
/// The firmware stores ids in a signed 32-bit integer, so every id must stay
/// within `1..=2_147_483_647`. Generated ids are the last five digits of the
/// millisecond clock followed by a four digit random suffix, which keeps them
/// below one billion.
///
/// Two commands issued within the same millisecond collide with probability
/// 1/9999; nothing here detects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u32")]
pub struct CommandId(u32);

impl CommandId {
    /// Largest id the device firmware can represent.
    pub const MAX: u32 = 2_147_483_647;

    const TIME_MODULUS: i64 = 100_000;
    const SUFFIX_SPAN: u32 = 10_000;

    /// Generate a new id from the current clock and thread-local randomness.
    #[must_use]
    pub fn generate() -> Self {
        Self::generate_at(crate::time::now(), &mut rand::thread_rng())
    }

    /// Generate an id for the given instant using the given random source.
    #[must_use]
    pub fn generate_at<R: Rng + ?Sized>(at: Timestamp, rng: &mut R) -> Self {
        let millis = at.timestamp_millis().rem_euclid(Self::TIME_MODULUS);
        let time_part = u32::try_from(millis).unwrap_or_default();
        // never zero: 0 marks "no command" on automation log rows
        let suffix = rng.gen_range(1..Self::SUFFIX_SPAN);
        Self::from_parts(time_part, suffix)
    }

    /// Concatenate a five digit time part with a four digit suffix.
    #[must_use]
    pub const fn from_parts(time_part: u32, suffix: u32) -> Self {
        Self(time_part * Self::SUFFIX_SPAN + suffix)
    }

    /// Access the raw numeric value.
    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<u64> for CommandId {
    type Error = ValidationError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match u32::try_from(value) {
            Ok(inner) if inner > 0 && inner <= Self::MAX => Ok(Self(inner)),
            _ => Err(ValidationError::CommandIdOutOfRange(value)),
        }
    }
}

impl From<CommandId> for u32 {
    fn from(value: CommandId) -> Self {
        value.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for CommandId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u64 = s
            .parse()
            .map_err(|_| ValidationError::EmptyField { field: "command id" })?;
        Self::try_from(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn should_stay_within_device_range_when_generating_many_ids() {
        let mut rng = StdRng::seed_from_u64(7);
        let base = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        for offset in 0..5_000 {
            let at = base + chrono::Duration::milliseconds(offset * 37);
            let id = CommandId::generate_at(at, &mut rng);
            assert!(id.get() > 0);
            assert!(id.get() <= CommandId::MAX);
        }
    }

    #[test]
    fn should_be_positive_when_clock_digits_are_zero() {
        let mut rng = StdRng::seed_from_u64(1);
        let at = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let id = CommandId::generate_at(at, &mut rng);
        assert!(id.get() >= 1);
        assert!(id.get() < 10_000);
    }

    #[test]
    fn should_embed_clock_digits_as_prefix() {
        let mut rng = StdRng::seed_from_u64(3);
        let at = Utc.timestamp_millis_opt(1_700_000_012_345).unwrap();
        let id = CommandId::generate_at(at, &mut rng);
        assert_eq!(id.get() / 10_000, 12_345);
    }

    #[test]
    fn should_reject_zero_and_values_above_i32_max() {
        assert!(CommandId::try_from(0).is_err());
        assert!(CommandId::try_from(2_147_483_648).is_err());
        assert!(CommandId::try_from(2_147_483_647).is_ok());
    }

    #[test]
    fn should_deserialize_from_json_number() {
        let id: CommandId = serde_json::from_str("123450042").unwrap();
        assert_eq!(id.get(), 123_450_042);
        assert_eq!(serde_json::to_string(&id).unwrap(), "123450042");
    }

    #[test]
    fn should_fail_to_deserialize_negative_number() {
        let result: Result<CommandId, _> = serde_json::from_str("-5");
        assert!(result.is_err());
    }

    #[test]
    fn should_parse_from_decimal_string() {
        let id: CommandId = "987650001".parse().unwrap();
        assert_eq!(id, CommandId::from_parts(98_765, 1));
        assert!("abc".parse::<CommandId>().is_err());
    }
}
