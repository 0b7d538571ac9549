//! Client identity strategies.
//!
//! An identity is the string a request presents as its `User-Agent`. The strategy is asked once
//! per request, so a rotating strategy gives every call a fresh identity.

use std::{borrow::Cow, sync::Arc};

use rand::seq::SliceRandom;

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

/// Type implements this trait can produce a client identity for next request.
pub trait IdentityProvider: Send + Sync {
    /// identity used by next request
    fn identity(&self) -> Cow<'_, str>;
}

impl<F> IdentityProvider for F
where
    F: Fn() -> String + Send + Sync,
{
    fn identity(&self) -> Cow<'_, str> {
        self().into()
    }
}

/// Always present the same identity.
#[derive(Debug, Clone)]
pub struct Fixed {
    identity: String,
}

impl Default for Fixed {
    fn default() -> Self {
        Self {
            identity: APP_USER_AGENT.to_string(),
        }
    }
}

impl IdentityProvider for Fixed {
    fn identity(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.identity)
    }
}

/// Create a strategy that always presents `identity`.
pub fn fixed<S: Into<String>>(identity: S) -> Fixed {
    Fixed {
        identity: identity.into(),
    }
}

/// Pick a random identity from a non-empty list for every request.
#[derive(Debug, Clone)]
pub struct Rotating {
    identities: Vec<String>,
}

impl Rotating {
    /// `None` if `identities` is empty
    pub fn new(identities: Vec<String>) -> Option<Self> {
        if identities.is_empty() {
            None
        } else {
            Some(Self { identities })
        }
    }
}

impl IdentityProvider for Rotating {
    fn identity(&self) -> Cow<'_, str> {
        Cow::Borrowed(
            self.identities
                .choose(&mut rand::thread_rng())
                .map(String::as_str)
                .unwrap_or(APP_USER_AGENT),
        )
    }
}

/// Rotate over `identities`, or fall back to the crate's own user agent if the list is empty.
pub fn from_list(identities: Vec<String>) -> Arc<dyn IdentityProvider> {
    match Rotating::new(identities) {
        Some(rotating) => Arc::new(rotating),
        None => Arc::new(Fixed::default()),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_fixed_identity() {
        assert_eq!(fixed("agent/1").identity(), "agent/1");
        assert!(Fixed::default().identity().starts_with("keepalive/"));
    }

    #[test]
    fn test_rotating_identity_picks_from_list() {
        assert!(Rotating::new(vec![]).is_none());

        let list = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let rotating = Rotating::new(list.clone()).unwrap();

        for _ in 0..32 {
            let identity = rotating.identity().into_owned();
            assert!(list.contains(&identity));
        }
    }

    #[test]
    fn test_closure_identity() {
        let provider = || "from-closure".to_string();
        assert_eq!(provider.identity(), "from-closure");
    }

    #[test]
    fn test_from_list_falls_back_to_app_agent() {
        assert!(from_list(vec![]).identity().starts_with("keepalive/"));
        assert_eq!(from_list(vec!["only".to_string()]).identity(), "only");
    }
}
