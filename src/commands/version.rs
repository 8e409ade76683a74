//! Command: print version information.

/// Version string: `ALTER_VERSION` at build time, else the package version.
#[must_use]
pub fn version() -> &'static str {
    option_env!("ALTER_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}

/// Print the alter version to stdout.
pub fn run() {
    println!("alter {}", version());
}
