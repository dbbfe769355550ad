use std::fmt;

use serde::Serialize;

/// Build metadata recorded by the binary's build script
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildInfo {
    pub crate_version: &'static str,
    pub build_profile: &'static str,
    pub build_features: &'static str,
    pub version: &'static str,
    pub build_timestamp: &'static str,
    pub rust_version: &'static str,
    pub build_target: Option<&'static str>,
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "fingerkey {} ({})", self.crate_version, self.version)?;
        writeln!(f, "  profile:  {}", self.build_profile)?;
        writeln!(f, "  features: {}", self.build_features)?;
        writeln!(f, "  built:    {}", self.build_timestamp)?;
        write!(f, "  rustc:    {}", self.rust_version)?;
        if let Some(target) = self.build_target {
            write!(f, "\n  target:   {}", target)?;
        }
        Ok(())
    }
}

/// Collect [`BuildInfo`] from the environment of the crate invoking the macro.
///
/// The invoking crate's build script must export `BUILD_PROFILE`,
/// `BUILD_FEATURES`, `REPO_VERSION`, `BUILD_TIMESTAMP` and `RUST_VERSION`.
/// `BUILD_TARGET` is optional.
#[macro_export]
macro_rules! build_info {
    () => {
        $crate::version::BuildInfo {
            crate_version: env!("CARGO_PKG_VERSION"),
            build_profile: env!("BUILD_PROFILE"),
            build_features: env!("BUILD_FEATURES"),
            version: env!("REPO_VERSION"),
            build_timestamp: env!("BUILD_TIMESTAMP"),
            rust_version: env!("RUST_VERSION"),
            build_target: option_env!("BUILD_TARGET"),
        }
    };
}
