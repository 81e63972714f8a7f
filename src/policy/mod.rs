pub mod store;

use std::fmt;

use serde::de::Deserializer;
use serde::ser::{Error as _, Serializer};
use serde::{Deserialize, Serialize};

pub use store::{lookup, PolicyStore};

/// Proxy decision for one network.
///
/// On disk `NoProxy` is `null` and `UseProxy` is the endpoint string.
/// `NoPolicyRecorded` only exists in memory and refuses to serialize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyPolicy {
    NoPolicyRecorded,
    NoProxy,
    UseProxy(String),
}

impl ProxyPolicy {
    /// Turn a prompt answer into a policy. Blank, whitespace-only and
    /// dismissed answers all mean no proxy.
    pub fn from_answer(answer: Option<String>) -> Self {
        match answer {
            Some(endpoint) if !endpoint.trim().is_empty() => {
                Self::UseProxy(endpoint.trim().to_string())
            }
            _ => Self::NoProxy,
        }
    }
}

impl fmt::Display for ProxyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPolicyRecorded => write!(f, "no policy recorded"),
            Self::NoProxy => write!(f, "no proxy"),
            Self::UseProxy(endpoint) => write!(f, "proxy {endpoint}"),
        }
    }
}

impl Serialize for ProxyPolicy {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::NoProxy => serializer.serialize_none(),
            Self::UseProxy(endpoint) => serializer.serialize_str(endpoint),
            Self::NoPolicyRecorded => Err(S::Error::custom(
                "refusing to persist an unrecorded policy",
            )),
        }
    }
}

impl<'de> Deserialize<'de> for ProxyPolicy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Hand-edited files may carry "" for no proxy
        match Option::<String>::deserialize(deserializer)? {
            Some(endpoint) if !endpoint.trim().is_empty() => Ok(Self::UseProxy(endpoint)),
            _ => Ok(Self::NoProxy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_dismissed_answers_mean_no_proxy() {
        assert_eq!(ProxyPolicy::from_answer(None), ProxyPolicy::NoProxy);
        assert_eq!(
            ProxyPolicy::from_answer(Some(String::new())),
            ProxyPolicy::NoProxy
        );
        assert_eq!(
            ProxyPolicy::from_answer(Some("   \t".into())),
            ProxyPolicy::NoProxy
        );
    }

    #[test]
    fn answer_is_trimmed_but_not_validated() {
        assert_eq!(
            ProxyPolicy::from_answer(Some("  10.0.0.5:8080 \n".into())),
            ProxyPolicy::UseProxy("10.0.0.5:8080".into())
        );
        assert_eq!(
            ProxyPolicy::from_answer(Some("not a proxy".into())),
            ProxyPolicy::UseProxy("not a proxy".into())
        );
    }

    #[test]
    fn json_representation() {
        assert_eq!(serde_json::to_string(&ProxyPolicy::NoProxy).unwrap(), "null");
        assert_eq!(
            serde_json::to_string(&ProxyPolicy::UseProxy("10.0.0.5:8080".into())).unwrap(),
            "\"10.0.0.5:8080\""
        );
        assert!(serde_json::to_string(&ProxyPolicy::NoPolicyRecorded).is_err());

        let parsed: ProxyPolicy = serde_json::from_str("null").unwrap();
        assert_eq!(parsed, ProxyPolicy::NoProxy);
        let parsed: ProxyPolicy = serde_json::from_str("\"\"").unwrap();
        assert_eq!(parsed, ProxyPolicy::NoProxy);
        assert!(serde_json::from_str::<ProxyPolicy>("42").is_err());
    }
}
