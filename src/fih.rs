//! Fault-hardened equality.
//!
//! Security-critical comparisons return a [`FihResult`] instead of a bool:
//! success is a multi-bit sentinel, stored twice (once under a mask), so a
//! single bit flip on the return path cannot turn a failure into a success.
//! A verdict whose encodings disagree was tampered with and halts the
//! system. The `fih-profile-*` features select the strength; `off` reduces
//! the type to a plain comparison for targets that do not face glitching.

const POSITIVE: u32 = 0x1aaa_aaaa;
const NEGATIVE: u32 = 0x1555_5555;

// The encoded representation is in effect unless the integrator asked for
// `off` and nothing stronger.
#[cfg(all(
    feature = "fih-profile-off",
    not(feature = "fih-profile-low"),
    not(feature = "fih-profile-medium"),
    not(feature = "fih-profile-high")
))]
mod repr {
    use super::POSITIVE;

    /// Verdict of a hardened comparison.
    #[derive(Clone, Copy)]
    pub struct FihResult {
        val: u32,
    }

    impl FihResult {
        pub(super) const fn new(val: u32) -> Self {
            Self { val }
        }

        /// Whether this verdict is the success sentinel.
        pub fn is_success(self) -> bool {
            self.val == POSITIVE
        }
    }
}

#[cfg(not(all(
    feature = "fih-profile-off",
    not(feature = "fih-profile-low"),
    not(feature = "fih-profile-medium"),
    not(feature = "fih-profile-high")
)))]
mod repr {
    use super::{panic_on_fault, NEGATIVE, POSITIVE};

    const MASK: u32 = 0xa5c3_5a3c;

    /// Verdict of a hardened comparison.
    ///
    /// Carries the sentinel and its masked complement; the two must agree at
    /// every decode.
    #[derive(Clone, Copy)]
    pub struct FihResult {
        val: u32,
        msk: u32,
    }

    impl FihResult {
        pub(super) const fn new(val: u32) -> Self {
            Self { val, msk: val ^ MASK }
        }

        /// Whether this verdict is the success sentinel.
        ///
        /// Halts if the verdict is neither a well-formed success nor a
        /// well-formed failure.
        pub fn is_success(self) -> bool {
            let good = self.val == POSITIVE && self.msk == (POSITIVE ^ MASK);
            let bad = self.val == NEGATIVE && self.msk == (NEGATIVE ^ MASK);
            if good == bad {
                panic_on_fault();
            }
            good
        }
    }
}

pub use repr::FihResult;

/// The one value meaning "comparison succeeded".
pub const FIH_SUCCESS: FihResult = FihResult::new(POSITIVE);

/// The safe default.
pub const FIH_FAILURE: FihResult = FihResult::new(NEGATIVE);

#[cfg(not(all(
    feature = "fih-profile-off",
    not(feature = "fih-profile-low"),
    not(feature = "fih-profile-medium"),
    not(feature = "fih-profile-high")
)))]
fn panic_on_fault() -> ! {
    panic!("hardened comparison verdict failed its integrity check");
}

/// Compare two byte regions, touching every byte of both.
///
/// Not a `memcmp` stand-in: there is no early exit in either direction. The
/// walk always covers the full length and the completed iteration count is
/// checked afterwards, so skipped loop iterations surface as a failure
/// rather than a match.
pub fn fih_memequal(s1: &[u8], s2: &[u8]) -> FihResult {
    if s1.len() != s2.len() {
        return FIH_FAILURE;
    }

    let (diff, touched) = fold_diff(s1, s2);

    #[cfg(feature = "fih-profile-high")]
    {
        let (rdiff, rtouched) = fold_diff_rev(s1, s2);
        if (rdiff == 0) != (diff == 0) || rtouched != touched {
            panic_on_fault();
        }
    }

    if diff == 0 && touched == s1.len() {
        FIH_SUCCESS
    } else {
        FIH_FAILURE
    }
}

/// Accumulated byte-wise difference and the number of byte pairs visited.
fn fold_diff(s1: &[u8], s2: &[u8]) -> (u8, usize) {
    let mut diff = 0u8;
    let mut touched = 0usize;
    while touched < s1.len() {
        diff |= s1[touched] ^ s2[touched];
        touched += 1;
    }
    (diff, touched)
}

#[cfg(feature = "fih-profile-high")]
fn fold_diff_rev(s1: &[u8], s2: &[u8]) -> (u8, usize) {
    let mut diff = 0u8;
    let mut touched = 0usize;
    let mut i = s1.len();
    while i > 0 {
        i -= 1;
        diff |= s1[i] ^ s2[i];
        touched += 1;
    }
    (diff, touched)
}
