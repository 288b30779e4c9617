use std::fmt;

/// Build metadata baked in by `build.rs`
#[derive(Debug, Clone, Copy)]
pub struct BuildInfo {
    pub version: &'static str,
    pub profile: &'static str,
    pub target: &'static str,
    pub timestamp: &'static str,
}

pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: env!("BUI_REPO_VERSION"),
        profile: env!("BUI_BUILD_PROFILE"),
        target: env!("BUI_BUILD_TARGET"),
        timestamp: env!("BUI_BUILD_TIMESTAMP"),
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bui {} ({} build for {}, {})",
            self.version, self.profile, self.target, self.timestamp
        )
    }
}
