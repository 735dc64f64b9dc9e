//! Tracing/logging setup shared by every process embedding the engine.

/// Tracing configuration (filters, layers).
pub mod tracing;

/// Initialize process-wide logging with the defaults (`info`, JSON).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init("info", true);
}

/// Initialize process-wide logging with an explicit default filter and format.
///
/// `RUST_LOG` still wins over `default_filter` when set.
pub fn init_with(default_filter: &str, json: bool) {
    tracing::init(default_filter, json);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_initialization_is_harmless() {
        init();
        init();
        init_with("debug", false);
    }
}
