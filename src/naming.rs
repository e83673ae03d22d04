//! Package name escaping.
//!
//! Two schemes exist and they are not interchangeable:
//!
//! * config keys: [`server_key`] turns every `/` into `-`
//!   (`@scope/pkg` -> `@scope-pkg`).
//! * registry filenames: [`registry_file_stem`] drops a leading `@` and turns
//!   every `/` into `--` (`@scope/pkg` -> `scope--pkg`).
//!
//! Neither is injective in general. [`display_name_from_key`] is a display
//! hint only and must never be used to look anything up.

const SEPARATOR: char = '/';

/// Key under `mcpServers` for a canonical package name.
pub fn server_key(name: &str) -> String {
    name.replace(SEPARATOR, "-")
}

/// Best-effort reverse of [`server_key`]. Not an inverse: `a-b` and `a/b`
/// both come back as `a/b`.
pub fn display_name_from_key(key: &str) -> String {
    key.replace('-', "/")
}

/// File stem (without `.json`) of a package's registry document.
pub fn registry_file_stem(name: &str) -> String {
    let trimmed = name.strip_prefix('@').unwrap_or(name);
    trimmed.replace(SEPARATOR, "--")
}
