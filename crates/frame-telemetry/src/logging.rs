//! Structured log helpers with consistent fields.
//!
//! Every line logged through these macros carries a `component` field so
//! parent, child and host output can be told apart in one stream.

/// Log with a `component` field.
#[macro_export]
macro_rules! log_event {
    (info, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::info!(
            component = $component,
            $($($field)*,)?
            $msg
        )
    };

    (warn, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::warn!(
            component = $component,
            $($($field)*,)?
            $msg
        )
    };

    (error, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::error!(
            component = $component,
            $($($field)*,)?
            $msg
        )
    };

    (debug, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::debug!(
            component = $component,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a wire message with its routing fields.
#[macro_export]
macro_rules! log_frame_event {
    ($level:ident, $component:expr, $msg:expr, $from:expr, $to:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = $component,
            from = %$from,
            to = %$to,
            $($($field)*,)?
            $msg
        )
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_macros_expand_without_subscriber() {
        crate::log_event!(info, "parent", "plain");
        crate::log_event!(debug, "child", "with fields", count = 3);
        crate::log_frame_event!(debug, "router", "delivered", "host", "window#2", func = "getContext");
    }
}
