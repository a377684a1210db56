//! Macros for batchflow error handling.

/// Creates a [`crate::error::FlowError`] from an error kind and a static description.
///
/// An optional third argument adds dynamic detail (anything implementing [`ToString`]), and a
/// trailing `source: err` attaches the originating error.
#[macro_export]
macro_rules! flow_error {
    ($kind:expr, $desc:expr) => {
        $crate::error::FlowError::from(($kind, $desc))
    };
    ($kind:expr, $desc:expr, source: $source:expr) => {
        $crate::error::FlowError::from(($kind, $desc)).with_source($source)
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        $crate::error::FlowError::from(($kind, $desc, $detail.to_string()))
    };
    ($kind:expr, $desc:expr, $detail:expr, source: $source:expr) => {
        $crate::error::FlowError::from(($kind, $desc, $detail.to_string())).with_source($source)
    };
}

/// Creates a [`crate::error::FlowError`] and returns it from the current function.
///
/// Accepts the same arguments as [`flow_error!`].
#[macro_export]
macro_rules! bail {
    ($kind:expr, $desc:expr) => {
        return ::core::result::Result::Err($crate::flow_error!($kind, $desc))
    };
    ($kind:expr, $desc:expr, source: $source:expr) => {
        return ::core::result::Result::Err($crate::flow_error!($kind, $desc, source: $source))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        return ::core::result::Result::Err($crate::flow_error!($kind, $desc, $detail))
    };
    ($kind:expr, $desc:expr, $detail:expr, source: $source:expr) => {
        return ::core::result::Result::Err($crate::flow_error!(
            $kind,
            $desc,
            $detail,
            source: $source
        ))
    };
}
