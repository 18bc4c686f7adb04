use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;

static WIDTHCAT_FP16: OnceLock<bool> = OnceLock::new();
static WIDTHCAT_TUNE: OnceLock<bool> = OnceLock::new();
static WIDTHCAT_TUNING_DIR: OnceLock<PathBuf> = OnceLock::new();

pub(crate) fn parse_bool(value: &str) -> bool {
    let normalized = value.trim().to_ascii_lowercase();
    matches!(normalized.as_str(), "1" | "true" | "yes" | "on")
}

fn flag_or(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => parse_bool(&value),
        _ => default,
    }
}

/// Half precision support of the default device tier (`WIDTHCAT_FP16`, on by default).
pub(crate) fn fp16_enabled() -> bool {
    *WIDTHCAT_FP16.get_or_init(|| flag_or("WIDTHCAT_FP16", true))
}

/// Whether the persistent tuning store is active (`WIDTHCAT_TUNE`, off by default).
pub(crate) fn tuning_enabled() -> bool {
    *WIDTHCAT_TUNE.get_or_init(|| flag_or("WIDTHCAT_TUNE", false))
}

pub(crate) fn tuning_dir() -> PathBuf {
    WIDTHCAT_TUNING_DIR
        .get_or_init(|| match env::var("WIDTHCAT_TUNING_DIR") {
            Ok(value) if !value.trim().is_empty() => PathBuf::from(value.trim()),
            _ => PathBuf::from(".cache/widthcat"),
        })
        .clone()
}
