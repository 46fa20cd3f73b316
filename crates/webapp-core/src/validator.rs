/// Prefix allow-lists gating which local files scripted content may read.
///
/// Built once at startup and shared by reference; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePathValidator {
    allowed_target_paths: Vec<String>,
    privileged_app_paths: Vec<String>,
    unprivileged_app_paths: Vec<String>,
}

pub const ALLOWED_TARGET_PATHS: &[&str] = &[
    "/usr/palm/frameworks",
    "/media/internal",
    "/usr/lib/luna/luna-media",
    "/var/luna/files",
    "/var/luna/data/extractfs",
    "/var/luna/data/im-avatars",
    "/usr/palm/applications/com.palm.app.contacts/sharedWidgets/",
    "/usr/palm/sysmgr/",
    "/usr/palm/public",
    "/var/file-cache/",
    "/usr/lib/luna/system/luna-systemui/images/",
    "/usr/lib/luna/system/luna-systemui/app/FilePicker",
];

pub const PRIVILEGED_APP_PATHS: &[&str] = &[
    // system ui apps
    "/usr/lib/luna/system/",
    "/usr/palm/applications/",
    "/var/usr/palm/applications/com.palm.",
    "/media/cryptofs/apps/usr/palm/applications/com.palm.",
    "/usr/palm/sysmgr/",
    "/var/usr/palm/applications/com/palm/",
    "/media/cryptofs/apps/usr/palm/applications/com/palm/",
];

pub const UNPRIVILEGED_APP_PATHS: &[&str] = &[
    "/var/usr/palm/applications/",
    "/media/cryptofs/apps/usr/palm/applications/",
];

impl Default for ResourcePathValidator {
    fn default() -> Self {
        Self::with_lists(
            ALLOWED_TARGET_PATHS.iter().copied(),
            PRIVILEGED_APP_PATHS.iter().copied(),
            UNPRIVILEGED_APP_PATHS.iter().copied(),
        )
    }
}

impl ResourcePathValidator {
    pub fn with_lists<A, P, U>(allowed: A, privileged: P, unprivileged: U) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
        U: IntoIterator,
        U::Item: Into<String>,
    {
        Self {
            allowed_target_paths: collect_prefixes(allowed),
            privileged_app_paths: collect_prefixes(privileged),
            unprivileged_app_paths: collect_prefixes(unprivileged),
        }
    }

    pub fn validate(&self, path: &str, privileged: bool) -> bool {
        if path.is_empty() {
            return false;
        }
        if find_path_in_list(&self.allowed_target_paths, path) {
            return true;
        }
        if privileged {
            find_path_in_list(&self.privileged_app_paths, path)
        } else {
            find_path_in_list(&self.unprivileged_app_paths, path)
        }
    }
}

// An empty prefix would match every path.
fn collect_prefixes<I>(items: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    items
        .into_iter()
        .map(Into::into)
        .filter(|prefix: &String| !prefix.is_empty())
        .collect()
}

fn find_path_in_list(list: &[String], path: &str) -> bool {
    list.iter().any(|prefix| path.starts_with(prefix.as_str()))
}

#[cfg(test)]
mod tests {
    use super::{
        ResourcePathValidator, ALLOWED_TARGET_PATHS, PRIVILEGED_APP_PATHS,
        UNPRIVILEGED_APP_PATHS,
    };

    #[test]
    fn universal_paths_are_allowed_for_every_caller() {
        let validator = ResourcePathValidator::default();
        for path in ALLOWED_TARGET_PATHS {
            assert!(validator.validate(path, false), "{path} denied unprivileged");
            assert!(validator.validate(path, true), "{path} denied privileged");
        }
        assert!(validator.validate("/media/internal/ringtones/alarm.mp3", false));
    }

    #[test]
    fn privileged_only_paths_require_privilege() {
        let validator = ResourcePathValidator::default();
        for path in PRIVILEGED_APP_PATHS
            .iter()
            .filter(|path| !ALLOWED_TARGET_PATHS.contains(path))
        {
            let probe = format!("{path}index.html");
            if UNPRIVILEGED_APP_PATHS
                .iter()
                .any(|prefix| probe.starts_with(prefix))
            {
                // reachable through the unprivileged-extra list as well
                continue;
            }
            assert!(!validator.validate(&probe, false), "{probe} allowed unprivileged");
            assert!(validator.validate(&probe, true), "{probe} denied privileged");
        }
    }

    #[test]
    fn unprivileged_extra_paths_are_denied_to_privileged_callers() {
        let validator = ResourcePathValidator::default();
        let path = "/media/cryptofs/apps/usr/palm/applications/org.example.app/index.html";
        assert!(validator.validate(path, false));
        assert!(!validator.validate(path, true));
    }

    #[test]
    fn palm_app_paths_are_reachable_from_both_lists() {
        let validator = ResourcePathValidator::default();
        let path = "/var/usr/palm/applications/com.palm.app.email/index.html";
        assert!(validator.validate(path, false));
        assert!(validator.validate(path, true));
    }

    #[test]
    fn unlisted_and_empty_paths_never_match() {
        let validator = ResourcePathValidator::default();
        for path in ["/etc/shadow", "/", "", "usr/palm/frameworks", "/USR/PALM/PUBLIC"] {
            assert!(!validator.validate(path, false), "{path:?} allowed unprivileged");
            assert!(!validator.validate(path, true), "{path:?} allowed privileged");
        }
    }

    #[test]
    fn empty_prefixes_are_discarded() {
        let validator = ResourcePathValidator::with_lists([""], ["", "/opt/"], Vec::<String>::new());
        assert!(!validator.validate("/etc/passwd", false));
        assert!(!validator.validate("/etc/passwd", true));
        assert!(validator.validate("/opt/app", true));
    }
}
