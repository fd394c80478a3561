/// Zone prefixes carving the bucket namespace into pipeline stages.
pub const INPUT_PREFIX: &str = "input/";
pub const CLEAN_PREFIX: &str = "clean/";
pub const DONE_PREFIX: &str = "done/";
pub const ERROR_PREFIX: &str = "error/";

/// Basename of an object name; the part after the last `/`.
pub fn basename(object: &str) -> &str {
    object.rsplit('/').next().unwrap_or(object)
}

/// Object name for `basename` placed under a zone prefix.
pub fn zone_path(prefix: &str, basename: &str) -> String {
    format!("{prefix}{basename}")
}
