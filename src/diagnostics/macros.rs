//! Diagnostic macros.

/// Emit a predefined diagnostic by code, optionally with formatted context.
///
/// ```rust,ignore
/// sa_emit!(SA401);
/// sa_emit!(SA302, "{}x{} staging texture, {} retries", w, h, n);
/// ```
#[macro_export]
macro_rules! sa_emit {
    ($code:ident) => {{
        $crate::diagnostics::emit::emit(&$crate::diagnostics::$code);
    }};
    ($code:ident, $($arg:tt)+) => {{
        $crate::diagnostics::emit::emit_with_context(
            &$crate::diagnostics::$code,
            &format!($($arg)+),
        );
    }};
}

/// Emit a predefined error diagnostic and panic.
///
/// ```rust,ignore
/// sa_fatal!(SA201, "buffer {:?}", desc);
/// ```
#[macro_export]
macro_rules! sa_fatal {
    ($code:ident) => {
        $crate::diagnostics::emit::fatal(&$crate::diagnostics::$code, "")
    };
    ($code:ident, $($arg:tt)+) => {
        $crate::diagnostics::emit::fatal(&$crate::diagnostics::$code, &format!($($arg)+))
    };
}

/// Informational message through the `log` crate; compiled out without it.
macro_rules! sa_info {
    ($($arg:tt)+) => {{
        #[cfg(feature = "log")]
        {
            log::info!($($arg)+);
        }
        #[cfg(not(feature = "log"))]
        {
            let _ = format_args!($($arg)+);
        }
    }};
}

pub(crate) use sa_info;
