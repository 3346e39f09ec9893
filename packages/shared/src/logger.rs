//! Logging setup utilities for the Hiroba poll server.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber with the specified default log level.
///
/// The default directive enables `default_log_level` for the server library,
/// this shared crate, the binary itself and `tower_http` (request traces).
/// The `RUST_LOG` environment variable overrides it entirely.
///
/// # Arguments
///
/// * `binary_name` - The name of the binary (e.g., "hiroba-server")
/// * `default_log_level` - The default log level (e.g., "debug", "info", "warn", "error")
///
/// # Examples
///
/// ```no_run
/// use hiroba_shared::logger::setup_logger;
///
/// setup_logger("hiroba-server", "debug");
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive(binary_name, default_log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn default_directive(binary_name: &str, level: &str) -> String {
    format!(
        "hiroba_server={level},{}={level},{}={level},tower_http={level}",
        env!("CARGO_PKG_NAME").replace('-', "_"),
        binary_name.replace('-', "_"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive_covers_all_crates() {
        // テスト項目: デフォルトのフィルタ指定に全クレートが含まれる
        // given (前提条件):
        let binary_name = "hiroba-server";

        // when (操作):
        let directive = default_directive(binary_name, "debug");

        // then (期待する結果): クレート名のハイフンはアンダースコアに変換される
        assert!(directive.contains("hiroba_server=debug"));
        assert!(directive.contains("hiroba_shared=debug"));
        assert!(directive.contains("tower_http=debug"));
        assert!(!directive.contains("hiroba-server"));
    }
}
