//! Working state of one DRBG instantiation.

use zeroize::Zeroize;

/// Security strengths a DRBG instantiation can be set to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SecurityStrength {
    /// 112 bits.
    Bits112,
    /// 128 bits.
    Bits128,
    /// 192 bits.
    Bits192,
    /// 256 bits.
    Bits256,
}

impl SecurityStrength {
    /// Rounds a requested strength up to the nearest supported value.
    ///
    /// Returns `None` for requests above 256 bits.
    pub fn round_up(requested: u32) -> Option<Self> {
        match requested {
            0..=112 => Some(Self::Bits112),
            113..=128 => Some(Self::Bits128),
            129..=192 => Some(Self::Bits192),
            193..=256 => Some(Self::Bits256),
            _ => None,
        }
    }

    /// Returns the strength in bits.
    #[inline]
    pub fn bits(self) -> u32 {
        match self {
            Self::Bits112 => 112,
            Self::Bits128 => 128,
            Self::Bits192 => 192,
            Self::Bits256 => 256,
        }
    }
}

impl std::fmt::Display for SecurityStrength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} bits", self.bits())
    }
}

/// Opaque identifier naming the live state of a mechanism.
///
/// Handles are minted per mechanism from a generation counter and are never
/// reused by that mechanism, so a handle stays invalid after uninstantiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u64);

impl Handle {
    pub(crate) fn new(generation: u64) -> Self {
        Self(generation)
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "drbg-{:08x}", self.0)
    }
}

/// Mutable record of one DRBG instantiation.
///
/// `values` holds the algorithm-specific secret material (key and counter for
/// CTR_DRBG). It is only ever replaced as a whole and is zeroized on drop.
pub struct WorkingState<V: Zeroize> {
    pub(crate) values: V,
    pub(crate) reseed_counter: u64,
    pub(crate) security_strength: SecurityStrength,
    pub(crate) prediction_resistance_flag: bool,
    pub(crate) reseed_required_flag: bool,
}

impl<V: Zeroize> WorkingState<V> {
    /// Creates a freshly seeded state with a reseed counter of 1.
    pub fn seeded(
        values: V,
        security_strength: SecurityStrength,
        prediction_resistance_flag: bool,
    ) -> Self {
        Self {
            values,
            reseed_counter: 1,
            security_strength,
            prediction_resistance_flag,
            reseed_required_flag: false,
        }
    }

    /// Returns a state carrying `values` and this state's administrative fields.
    pub fn with_values(&self, values: V, reseed_counter: u64) -> Self {
        Self {
            values,
            reseed_counter,
            security_strength: self.security_strength,
            prediction_resistance_flag: self.prediction_resistance_flag,
            reseed_required_flag: self.reseed_required_flag,
        }
    }

    /// Returns the algorithm-specific secret values.
    #[inline]
    pub fn values(&self) -> &V {
        &self.values
    }

    /// Returns the number of generate calls since the last (re)seed, plus one.
    #[inline]
    pub fn reseed_counter(&self) -> u64 {
        self.reseed_counter
    }

    /// Returns the instantiated security strength.
    #[inline]
    pub fn security_strength(&self) -> SecurityStrength {
        self.security_strength
    }

    /// Returns whether the state was instantiated with prediction resistance.
    #[inline]
    pub fn prediction_resistance_flag(&self) -> bool {
        self.prediction_resistance_flag
    }

    /// Returns whether the algorithm has asked for a reseed.
    #[inline]
    pub fn reseed_required_flag(&self) -> bool {
        self.reseed_required_flag
    }

    /// Overwrites the secret material and counter.
    pub fn erase(&mut self) {
        self.values.zeroize();
        self.reseed_counter = 0;
        self.reseed_required_flag = false;
    }
}

impl<V: Zeroize> Drop for WorkingState<V> {
    fn drop(&mut self) {
        self.erase();
    }
}

impl<V: Zeroize> std::fmt::Debug for WorkingState<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkingState")
            .field("reseed_counter", &self.reseed_counter)
            .field("security_strength", &self.security_strength)
            .field("prediction_resistance_flag", &self.prediction_resistance_flag)
            .field("reseed_required_flag", &self.reseed_required_flag)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_up_to_supported_strength() {
        assert_eq!(SecurityStrength::round_up(0), Some(SecurityStrength::Bits112));
        assert_eq!(SecurityStrength::round_up(112), Some(SecurityStrength::Bits112));
        assert_eq!(SecurityStrength::round_up(113), Some(SecurityStrength::Bits128));
        assert_eq!(SecurityStrength::round_up(160), Some(SecurityStrength::Bits192));
        assert_eq!(SecurityStrength::round_up(256), Some(SecurityStrength::Bits256));
        assert_eq!(SecurityStrength::round_up(257), None);
    }

    #[test]
    fn test_erase_clears_secrets() {
        let mut state = WorkingState::seeded([0xAAu8; 48], SecurityStrength::Bits256, false);
        state.reseed_counter = 17;

        state.erase();

        assert_eq!(state.values(), &[0u8; 48]);
        assert_eq!(state.reseed_counter(), 0);
    }

    #[test]
    fn test_debug_hides_values() {
        let state = WorkingState::seeded([0x42u8; 16], SecurityStrength::Bits128, true);
        let rendered = format!("{:?}", state);

        assert!(rendered.contains("reseed_counter: 1"));
        assert!(!rendered.contains("66"));
    }
}
