//! Container labels read by the watcher.

/// Opt a container in or out of watching (`true`/`false`).
pub const WATCH: &str = "vigil.watch";

/// Regex a candidate tag must match.
pub const TAG_INCLUDE: &str = "vigil.tag.include";

/// Regex excluding candidate tags.
pub const TAG_EXCLUDE: &str = "vigil.tag.exclude";

/// `pattern => replacement` transform applied before semver comparison.
pub const TAG_TRANSFORM: &str = "vigil.tag.transform";

/// Opt digest watching in or out (`true`/`false`).
pub const WATCH_DIGEST: &str = "vigil.watch.digest";

/// Link template expanded against the resolved version.
pub const LINK_TEMPLATE: &str = "vigil.link.template";

/// Display name override.
pub const DISPLAY_NAME: &str = "vigil.display.name";

/// Display icon override.
pub const DISPLAY_ICON: &str = "vigil.display.icon";

/// Comma-separated `trigger[:threshold]` include directives.
pub const TRIGGER_INCLUDE: &str = "vigil.trigger.include";

/// Comma-separated `trigger[:threshold]` exclude directives.
pub const TRIGGER_EXCLUDE: &str = "vigil.trigger.exclude";
