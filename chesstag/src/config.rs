//! Runtime tunables for the batch tagger.
//!
//! Command-line flags win over everything here. Each value below has a
//! compile-time default and can be overridden through a dedicated environment
//! variable, so scripted runs do not need to repeat long flag lists.

use std::path::PathBuf;

/// Default base URL of the remote analysis service.
const DEFAULT_ENGINE_URL: &str = "http://127.0.0.1:8080";

/// Default upper bound for a single engine search (in seconds).
const DEFAULT_ENGINE_TIMEOUT_SECS: u64 = 30;

/// Worker count ceiling when neither the flag nor `CHESSTAG_WORKERS` is set.
const DEFAULT_MAX_WORKERS: usize = 4;

/// Get an explicitly configured local engine binary.
///
/// Priority:
/// 1. `CHESSTAG_ENGINE_PATH` env variable if set
/// 2. `None`, leaving the search of common install locations to the engine crate
pub fn get_engine_path() -> Option<PathBuf> {
    std::env::var("CHESSTAG_ENGINE_PATH")
        .ok()
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
}

/// Get the remote analysis service URL.
///
/// Priority:
/// 1. `CHESSTAG_ENGINE_URL` env variable if set
/// 2. `http://127.0.0.1:8080` as fallback
pub fn get_engine_url() -> String {
    if let Ok(url) = std::env::var("CHESSTAG_ENGINE_URL") {
        return url;
    }

    DEFAULT_ENGINE_URL.to_string()
}

/// Get the per-search engine timeout in seconds.
///
/// Priority:
/// 1. `CHESSTAG_ENGINE_TIMEOUT_SECS` env variable if set (falls back to default
///    if the value cannot be parsed as a `u64`)
/// 2. `30` seconds as fallback
pub fn get_engine_timeout_secs() -> u64 {
    if let Ok(timeout) = std::env::var("CHESSTAG_ENGINE_TIMEOUT_SECS") {
        return timeout.parse().unwrap_or(DEFAULT_ENGINE_TIMEOUT_SECS);
    }

    DEFAULT_ENGINE_TIMEOUT_SECS
}

/// Get the number of tagging workers.
///
/// Priority:
/// 1. `CHESSTAG_WORKERS` env variable if set to a positive integer
/// 2. available parallelism, capped at 4
pub fn get_workers() -> usize {
    if let Some(workers) = std::env::var("CHESSTAG_WORKERS")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|workers| *workers > 0)
    {
        return workers;
    }

    default_workers()
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(DEFAULT_MAX_WORKERS)
}
