use std::collections::BTreeSet;

/// Join field names for a one-line listing, cut at `max_len` characters.
pub fn field_summary(fields: &BTreeSet<String>, max_len: usize) -> String {
    let joined = fields
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if joined.chars().count() <= max_len {
        joined
    } else {
        let kept: String = joined.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
