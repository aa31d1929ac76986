//! Environment toggles
//!
//! `PARAMTREE_DEBUG=1` turns on the per-invocation debug flag and verbose
//! resolver events. `PARAMTREE_ASSUME_YES=1` is recognized by interactive
//! confirmation processors to auto-answer prompts in test automation; the
//! core only exposes it.

/// Enables debug metadata in the invocation context.
pub const DEBUG_ENV: &str = "PARAMTREE_DEBUG";

/// Auto-answers confirmation prompts, for test automation.
pub const ASSUME_YES_ENV: &str = "PARAMTREE_ASSUME_YES";

fn flag_set(var: &str) -> bool {
    match std::env::var(var) {
        Ok(value) => matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => false,
    }
}

pub fn debug_enabled() -> bool {
    flag_set(DEBUG_ENV)
}

pub fn assume_yes() -> bool {
    flag_set(ASSUME_YES_ENV)
}
