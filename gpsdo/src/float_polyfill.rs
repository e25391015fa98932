#[allow(unused)] // clippy will inaccurately mark this as unused on platforms with std
pub(crate) trait FloatPolyfill {
    #[cfg(not(feature = "std"))]
    fn floor(self) -> Self;
    #[cfg(not(feature = "std"))]
    fn round(self) -> Self;
}

impl FloatPolyfill for f64 {
    #[cfg(not(feature = "std"))]
    fn floor(self) -> Self {
        libm::floor(self)
    }

    #[cfg(not(feature = "std"))]
    fn round(self) -> Self {
        libm::round(self)
    }
}
