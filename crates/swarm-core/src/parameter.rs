use crate::error::OrchestratorError;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// `{name}` candidates. A leading `$` marks a shell expansion (`${HOME}`),
/// which is captured so it can be left alone.
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\$?)\{([A-Za-z][A-Za-z0-9_]*)\}").expect("placeholder pattern")
});

/// Closed vocabulary of values that may be bound into a command template.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "String", into = "String")]
pub enum ParameterKey {
    TargetName,
    ManagerIp,
    ManagerPort,
    JoinToken,
}

impl ParameterKey {
    pub const ALL: [ParameterKey; 4] = [
        ParameterKey::TargetName,
        ParameterKey::ManagerIp,
        ParameterKey::ManagerPort,
        ParameterKey::JoinToken,
    ];

    /// Name used inside templates, e.g. `{MANAGER_IP}`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterKey::TargetName => "TARGET_NAME",
            ParameterKey::ManagerIp => "MANAGER_IP",
            ParameterKey::ManagerPort => "MANAGER_PORT",
            ParameterKey::JoinToken => "JOIN_TOKEN",
        }
    }

    pub fn placeholder(&self) -> String {
        format!("{{{}}}", self.as_str())
    }

    /// Names used by older template files.
    fn legacy_names(&self) -> &'static [&'static str] {
        match self {
            ParameterKey::TargetName => &["vm_instance"],
            ParameterKey::ManagerIp => &["swarm_manager_ip"],
            ParameterKey::ManagerPort => &["swarm_manager_port"],
            ParameterKey::JoinToken => &["swarm_token"],
        }
    }

    fn is_named(&self, name: &str) -> bool {
        self.as_str().eq_ignore_ascii_case(name)
            || self.legacy_names().iter().any(|n| n.eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for ParameterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParameterKey {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ParameterKey::ALL
            .into_iter()
            .find(|k| k.is_named(s.trim()))
            .ok_or_else(|| OrchestratorError::InvalidParameterKey(vec![s.to_string()]))
    }
}

impl TryFrom<String> for ParameterKey {
    type Error = OrchestratorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ParameterKey> for String {
    fn from(key: ParameterKey) -> Self {
        key.as_str().to_string()
    }
}

/// Values available for substitution. Cheap to clone; strategies take a
/// private copy before adding target-specific keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(BTreeMap<ParameterKey, String>);

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from untyped key/value pairs (CLI flags, config files).
    /// Every key is checked before anything is accepted.
    pub fn from_raw<I, K, V>(raw: I) -> Result<Self, OrchestratorError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let pairs: Vec<(K, V)> = raw.into_iter().collect();
        validate(pairs.iter().map(|(k, _)| k.as_ref()))?;

        let mut params = Self::new();
        for (key, value) in pairs {
            params.insert(key.as_ref().parse()?, value);
        }
        Ok(params)
    }

    pub fn with(mut self, key: ParameterKey, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: ParameterKey, value: impl Into<String>) {
        self.0.insert(key, value.into());
    }

    pub fn get(&self, key: ParameterKey) -> Option<&str> {
        self.0.get(&key).map(String::as_str)
    }

    /// Later values win.
    pub fn merge(&mut self, other: &ParameterSet) {
        for (key, value) in &other.0 {
            self.0.insert(*key, value.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParameterKey, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

/// Reject any key outside [`ParameterKey`]. All offending keys are reported.
pub fn validate<'a>(keys: impl IntoIterator<Item = &'a str>) -> Result<(), OrchestratorError> {
    let invalid: Vec<String> = keys
        .into_iter()
        .filter(|k| k.parse::<ParameterKey>().is_err())
        .map(str::to_string)
        .collect();

    if invalid.is_empty() {
        Ok(())
    } else {
        Err(OrchestratorError::InvalidParameterKey(invalid))
    }
}

/// `UPPER_SNAKE` names are reserved for parameters; anything else that is not
/// a known key (awk fields, JSON-ish text) is not a placeholder.
fn is_reserved(name: &str) -> bool {
    name.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Resolve every placeholder in `template`.
///
/// A placeholder is `{NAME}` where NAME is a [`ParameterKey`] in any case or
/// one of its legacy names (`{vm_instance}`), or any other `UPPER_SNAKE`
/// name, which is rejected. Either every placeholder resolves or an error is
/// returned; no partially substituted string ever leaves this function.
/// `${NAME}` is shell syntax and is copied through untouched.
pub fn substitute(template: &str, params: &ParameterSet) -> Result<String, OrchestratorError> {
    let mut failure: Option<OrchestratorError> = None;

    let resolved = PLACEHOLDER.replace_all(template, |caps: &Captures<'_>| {
        let whole = caps[0].to_string();
        if !caps[1].is_empty() || failure.is_some() {
            return whole;
        }

        let name = &caps[2];
        match name.parse::<ParameterKey>() {
            Ok(key) => match params.get(key) {
                Some(value) => value.to_string(),
                None => {
                    failure = Some(OrchestratorError::MissingParameter {
                        key: key.to_string(),
                        template: template.to_string(),
                    });
                    whole
                }
            },
            Err(_) if is_reserved(name) => {
                failure = Some(OrchestratorError::UnknownPlaceholder {
                    name: name.to_string(),
                    template: template.to_string(),
                });
                whole
            }
            Err(_) => whole,
        }
    });

    match failure {
        Some(err) => Err(err),
        None => Ok(resolved.into_owned()),
    }
}

/// [`validate`] then [`substitute`], for callers holding untyped parameters.
pub fn substitute_raw<K, V>(
    template: &str,
    raw: &BTreeMap<K, V>,
) -> Result<String, OrchestratorError>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let params = ParameterSet::from_raw(raw.iter().map(|(k, v)| (k.as_ref(), v.as_ref())))?;
    substitute(template, &params)
}

/// Placeholder names referenced by `template`, in order of appearance.
pub fn placeholders(template: &str) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(template)
        .filter(|caps| caps[1].is_empty())
        .map(|caps| caps[2].to_string())
        .filter(|name| name.parse::<ParameterKey>().is_ok() || is_reserved(name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager_params() -> ParameterSet {
        ParameterSet::new()
            .with(ParameterKey::TargetName, "worker-1")
            .with(ParameterKey::ManagerIp, "10.0.0.2")
    }

    #[test]
    fn resolves_every_placeholder() {
        let template = "deploy on {TARGET_NAME} with {MANAGER_IP}";
        let out = substitute(template, &manager_params()).unwrap();
        assert_eq!(out, "deploy on worker-1 with 10.0.0.2");
        assert!(placeholders(&out).is_empty());
    }

    #[test]
    fn substitution_is_idempotent() {
        let template = "deploy on {TARGET_NAME} with {MANAGER_IP}";
        let once = substitute(template, &manager_params()).unwrap();
        let twice = substitute(&once, &manager_params()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn missing_value_fails_without_output() {
        let params = ParameterSet::new().with(ParameterKey::TargetName, "worker-1");
        let err = substitute("join {MANAGER_IP}:{MANAGER_PORT}", &params).unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::MissingParameter { ref key, .. } if key == "MANAGER_IP"
        ));
    }

    #[test]
    fn unknown_placeholder_is_rejected() {
        let err = substitute("echo {SECRET}", &manager_params()).unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::UnknownPlaceholder { ref name, .. } if name == "SECRET"
        ));
    }

    #[test]
    fn lowercase_key_names_resolve() {
        let out = substitute("docker node update {target_name}", &manager_params()).unwrap();
        assert_eq!(out, "docker node update worker-1");
    }

    #[test]
    fn legacy_names_resolve_to_their_keys() {
        let params = manager_params().with(ParameterKey::JoinToken, "SWMTKN-1-abc");
        let template = "join {swarm_token} {swarm_manager_ip} from {vm_instance}";
        let out = substitute(template, &params).unwrap();
        assert_eq!(out, "join SWMTKN-1-abc 10.0.0.2 from worker-1");
        assert_eq!("vm_instance".parse::<ParameterKey>().unwrap(), ParameterKey::TargetName);
    }

    #[test]
    fn lowercase_key_without_value_is_missing() {
        let params = ParameterSet::new().with(ParameterKey::TargetName, "worker-1");
        let err = substitute("join {manager_ip}", &params).unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::MissingParameter { ref key, .. } if key == "MANAGER_IP"
        ));
    }

    #[test]
    fn lowercase_non_keys_are_not_placeholders() {
        let template = "echo {worker} && echo {TARGET_NAME}";
        let out = substitute(template, &manager_params()).unwrap();
        assert_eq!(out, "echo {worker} && echo worker-1");
        assert_eq!(placeholders(template), vec!["TARGET_NAME"]);
        assert_eq!(placeholders("{manager_ip} {name}"), vec!["manager_ip"]);
    }

    #[test]
    fn shell_expansions_and_awk_blocks_pass_through() {
        let template = "echo ${HOME} | awk '{print $1}' && echo {TARGET_NAME}";
        let out = substitute(template, &manager_params()).unwrap();
        assert_eq!(out, "echo ${HOME} | awk '{print $1}' && echo worker-1");
    }

    #[test]
    fn raw_keys_outside_vocabulary_fail_validation() {
        let mut raw = BTreeMap::new();
        raw.insert("TARGET_NAME", "worker-1");
        raw.insert("vm_password", "hunter2");

        let err = substitute_raw("echo {TARGET_NAME}", &raw).unwrap_err();
        match err {
            OrchestratorError::InvalidParameterKey(keys) => assert_eq!(keys, vec!["vm_password"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn raw_keys_are_case_insensitive() {
        let params = ParameterSet::from_raw([("manager_ip", "10.0.0.2")]).unwrap();
        assert_eq!(params.get(ParameterKey::ManagerIp), Some("10.0.0.2"));
    }

    #[test]
    fn merge_prefers_later_values() {
        let mut base = ParameterSet::new().with(ParameterKey::ManagerIp, "old");
        base.merge(&ParameterSet::new().with(ParameterKey::ManagerIp, "new"));
        assert_eq!(base.get(ParameterKey::ManagerIp), Some("new"));
    }
}
