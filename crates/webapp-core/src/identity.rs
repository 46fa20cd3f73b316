use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

use crate::description::ApplicationDescription;

/// Only system applications with one of these id prefixes may reach the private bus and the
/// privileged resource paths.
pub const PRIVILEGED_ID_PREFIXES: &[&str] = &["org.webosports", "com.palm", "org.webosinternals"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustScope {
    #[default]
    System,
    Remote,
}

impl TrustScope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Remote => "remote",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "system" => Some(Self::System),
            "remote" => Some(Self::Remote),
            _ => None,
        }
    }
}

impl Display for TrustScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationIdentity {
    id: String,
    process_id: String,
    identifier: String,
    trust_scope: TrustScope,
    privileged: bool,
    parameters: String,
}

impl ApplicationIdentity {
    pub fn new(
        description: &ApplicationDescription,
        process_id: impl Into<String>,
        parameters: impl Into<String>,
    ) -> Self {
        let id = description.id.clone();
        let process_id = process_id.into();
        let identifier = format!("{id} {process_id}");
        let trust_scope = description.trust_scope;
        let privileged = is_privileged(&id, trust_scope);
        Self {
            id,
            process_id,
            identifier,
            trust_scope,
            privileged,
            parameters: parameters.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn process_id(&self) -> &str {
        &self.process_id
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn trust_scope(&self) -> TrustScope {
        self.trust_scope
    }

    pub fn privileged(&self) -> bool {
        self.privileged
    }

    pub fn parameters(&self) -> &str {
        &self.parameters
    }

    pub(crate) fn replace_parameters(&mut self, parameters: String) {
        self.parameters = parameters;
    }
}

pub fn is_privileged(id: &str, trust_scope: TrustScope) -> bool {
    trust_scope == TrustScope::System
        && PRIVILEGED_ID_PREFIXES
            .iter()
            .any(|prefix| id.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::{is_privileged, ApplicationIdentity, TrustScope};
    use crate::description::ApplicationDescription;

    fn description(id: &str, trust_scope: TrustScope) -> ApplicationDescription {
        ApplicationDescription {
            id: id.to_owned(),
            trust_scope,
            ..ApplicationDescription::default()
        }
    }

    #[test]
    fn identifier_joins_id_and_process_id() {
        let identity = ApplicationIdentity::new(
            &description("org.webosports.app.phone", TrustScope::System),
            "4242",
            "{}",
        );
        assert_eq!(identity.identifier(), "org.webosports.app.phone 4242");
        assert_eq!(identity.parameters(), "{}");
    }

    #[test]
    fn privilege_requires_system_scope_and_known_prefix() {
        assert!(is_privileged("com.palm.app.email", TrustScope::System));
        assert!(is_privileged("org.webosinternals.tweaks", TrustScope::System));
        assert!(!is_privileged("org.webosinternals.tweaks", TrustScope::Remote));
        assert!(!is_privileged("com.palm.app.email", TrustScope::Remote));
        assert!(!is_privileged("net.example.palm", TrustScope::System));
        assert!(!is_privileged("", TrustScope::System));
    }

    #[test]
    fn trust_scope_round_trips_through_strings() {
        assert_eq!(TrustScope::parse("remote"), Some(TrustScope::Remote));
        assert_eq!(TrustScope::parse("System"), None);
        assert_eq!(TrustScope::System.to_string(), "system");
    }
}
