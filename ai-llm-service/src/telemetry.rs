use std::io::{self, IsTerminal};
use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, filter, fmt};

/// Targets of the workspace crates; the layer renders only their events.
pub const WORKSPACE_TARGETS: &[&str] = &[
    "ai_llm_service",
    "rag_store",
    "contextor",
    "api",
    "persona_chat_backend",
];

/// RFC3339 UTC timer implemented via `chrono`.
/// Example output: `2026-03-12T10:20:30Z`
#[derive(Clone, Debug, Default)]
struct ChronoRfc3339Utc;

impl FormatTime for ChronoRfc3339Utc {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let s = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        w.write_str(&s)
    }
}

fn is_workspace_target(target: &str) -> bool {
    WORKSPACE_TARGETS.iter().any(|p| {
        target == *p
            || target
                .strip_prefix(p)
                .is_some_and(|rest| rest.starts_with("::"))
    })
}

/// Formatting layer that renders only events emitted by workspace crates.
///
/// Compact single-line output with RFC3339 UTC timestamps, `file:line`,
/// span-close durations, and ANSI colors only when stdout is a terminal.
pub fn layer<S>() -> impl Layer<S> + Send + Sync
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let use_ansi = io::stdout().is_terminal();
    let only_workspace = filter::filter_fn(|meta| is_workspace_target(meta.target()));

    fmt::layer()
        .with_timer(ChronoRfc3339Utc)
        .with_level(true)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(use_ansi)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .event_format(fmt::format().compact().with_source_location(true))
        .with_filter(only_workspace)
}

/// Level directives (`crate=level`) for every workspace crate.
pub fn level_directives(level: Level) -> Vec<Directive> {
    let lvl = level.as_str().to_lowercase();
    WORKSPACE_TARGETS
        .iter()
        .filter_map(|t| Directive::from_str(&format!("{t}={lvl}")).ok())
        .collect()
}

/// `EnvFilter` from `RUST_LOG` (or `default`), with `level` applied to workspace crates.
///
/// Explicit `RUST_LOG` wins: workspace directives are only added when it is unset.
pub fn env_filter_with_level(default: &str, level: Level) -> EnvFilter {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => level_directives(level)
            .into_iter()
            .fold(EnvFilter::new(default), EnvFilter::add_directive),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_target_matching_respects_module_boundaries() {
        assert!(is_workspace_target("contextor"));
        assert!(is_workspace_target("contextor::window"));
        assert!(is_workspace_target("api::routes::chat"));
        assert!(!is_workspace_target("apix"));
        assert!(!is_workspace_target("hyper::proto"));
    }

    #[test]
    fn one_directive_per_crate() {
        let dirs = level_directives(Level::DEBUG);
        assert_eq!(dirs.len(), WORKSPACE_TARGETS.len());
        assert!(dirs.iter().any(|d| d.to_string() == "rag_store=debug"));
    }
}
