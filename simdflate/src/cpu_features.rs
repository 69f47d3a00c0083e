//! Runtime detection of vector extensions, and the kernel selection handed to the engines.
//!
//! Nothing here is cached: callers detect once and pass the result along.

/// Vector extensions present on the running machine.
///
/// Values can only be produced by [`CpuFeatures::detect`] (or narrowed from such a value), so a
/// set flag always means the instructions can be executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuFeatures {
    sse2: bool,
    sse41: bool,
    avx2: bool,
    pclmulqdq: bool,
    neon: bool,
}

impl CpuFeatures {
    pub const NONE: Self = Self {
        sse2: false,
        sse41: false,
        avx2: false,
        pclmulqdq: false,
        neon: false,
    };

    pub fn detect() -> Self {
        #[cfg(target_arch = "x86_64")]
        {
            Self {
                sse2: std::is_x86_feature_detected!("sse2"),
                sse41: std::is_x86_feature_detected!("sse4.1"),
                avx2: std::is_x86_feature_detected!("avx2"),
                pclmulqdq: std::is_x86_feature_detected!("pclmulqdq"),
                neon: false,
            }
        }

        #[cfg(target_arch = "aarch64")]
        {
            Self {
                neon: std::arch::is_aarch64_feature_detected!("neon"),
                ..Self::NONE
            }
        }

        #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
        {
            Self::NONE
        }
    }

    pub fn any(self) -> bool {
        self.sse2 || self.sse41 || self.avx2 || self.pclmulqdq || self.neon
    }

    pub fn sse2(self) -> bool {
        self.sse2
    }

    pub fn sse41(self) -> bool {
        self.sse41
    }

    pub fn avx2(self) -> bool {
        self.avx2
    }

    pub fn pclmulqdq(self) -> bool {
        self.pclmulqdq
    }

    pub fn neon(self) -> bool {
        self.neon
    }

    /// Drop AVX2, so the 128-bit kernels get used on machines that have it.
    pub fn without_avx2(self) -> Self {
        Self {
            avx2: false,
            ..self
        }
    }

    /// Names of the detected extensions, e.g. for diagnostics.
    pub fn names(self) -> Vec<&'static str> {
        [
            (self.sse2, "sse2"),
            (self.sse41, "sse4.1"),
            (self.avx2, "avx2"),
            (self.pclmulqdq, "pclmulqdq"),
            (self.neon, "neon"),
        ]
        .into_iter()
        .filter_map(|(present, name)| present.then_some(name))
        .collect()
    }
}

/// Which kernels an engine runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dispatch {
    /// The portable reference implementations only.
    #[default]
    Scalar,
    /// Vector kernels for every extension in the set, scalar code for the rest.
    Vectorized(CpuFeatures),
}

impl Dispatch {
    pub fn detect() -> Self {
        let features = CpuFeatures::detect();

        if features.any() {
            Dispatch::Vectorized(features)
        } else {
            Dispatch::Scalar
        }
    }

    pub fn is_vectorized(self) -> bool {
        matches!(self, Dispatch::Vectorized(_))
    }

    pub fn features(self) -> CpuFeatures {
        match self {
            Dispatch::Scalar => CpuFeatures::NONE,
            Dispatch::Vectorized(features) => features,
        }
    }

    pub(crate) fn sse2(self) -> bool {
        self.features().sse2
    }

    pub(crate) fn sse41(self) -> bool {
        self.features().sse41
    }

    pub(crate) fn avx2(self) -> bool {
        self.features().avx2
    }

    pub(crate) fn pclmulqdq(self) -> bool {
        let features = self.features();
        features.pclmulqdq && features.sse2 && features.sse41
    }

    /// Any vector kernel at all. The portable lane-parallel checksum paths run whenever this is set.
    pub(crate) fn lanes(self) -> bool {
        self.is_vectorized()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn scalar_has_no_features() {
        let dispatch = Dispatch::Scalar;
        assert!(!dispatch.is_vectorized());
        assert!(!dispatch.avx2());
        assert!(!dispatch.sse2());
        assert!(dispatch.features().names().is_empty());
    }

    #[test]
    fn detect_is_consistent() {
        let features = CpuFeatures::detect();
        match Dispatch::detect() {
            Dispatch::Scalar => assert!(!features.any()),
            Dispatch::Vectorized(f) => assert_eq!(f, features),
        }

        assert!(!features.without_avx2().avx2());
        assert_eq!(features.without_avx2().sse2(), features.sse2());
    }

    #[test]
    #[cfg(target_arch = "x86_64")]
    fn x86_64_baseline() {
        // sse2 is part of the x86_64 baseline
        assert!(CpuFeatures::detect().sse2());
        assert!(Dispatch::detect().is_vectorized());
    }
}
