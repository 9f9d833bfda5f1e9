/// Bound for cached values: they only need to be `Debug` when spans record them.
#[cfg(feature = "tracing")]
pub trait CfgDebug: std::fmt::Debug {}

#[cfg(feature = "tracing")]
impl<T: std::fmt::Debug + ?Sized> CfgDebug for T {}

#[cfg(not(feature = "tracing"))]
pub trait CfgDebug {}

#[cfg(not(feature = "tracing"))]
impl<T: ?Sized> CfgDebug for T {}
