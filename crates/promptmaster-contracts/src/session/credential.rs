use std::fmt;

use serde::{Deserialize, Serialize};

use super::store::{KeyValueStore, ENDPOINT_KEY, TOKEN_KEY};

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MIN_TOKEN_LEN: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("API key is required")]
    EmptyToken,
    #[error("API key is too short: expected at least {min} characters, got {actual}")]
    TooShort { min: usize, actual: usize },
    #[error("credentials are managed by the host environment; use its key selection instead")]
    HostManaged,
    #[error("host key selection is not configured; log in with an API key instead")]
    NotHostDelegated,
    #[error("no API key is active; log in first")]
    NotReady,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// The two ways a key can reach the app. A session uses exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthStrategy {
    #[default]
    SelfSupplied,
    HostDelegated,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    endpoint: String,
}

impl Credential {
    pub fn new(token: impl Into<String>, endpoint: Option<&str>) -> Self {
        Self {
            token: token.into().trim().to_string(),
            endpoint: normalize_endpoint(endpoint),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn masked_token(&self) -> String {
        mask_token(&self.token)
    }

    pub fn flavour(&self) -> KeyFlavour {
        KeyFlavour::of(&self.token)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &self.masked_token())
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFlavour {
    /// `sk-` keys issued by OpenAI-compatible relays.
    Proxy,
    GoogleNative,
}

impl KeyFlavour {
    pub fn of(token: &str) -> Self {
        if token.starts_with("sk-") {
            KeyFlavour::Proxy
        } else {
            KeyFlavour::GoogleNative
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            KeyFlavour::Proxy => "OpenAI-style proxy",
            KeyFlavour::GoogleNative => "Google native",
        }
    }
}

pub fn mask_token(token: &str) -> String {
    let chars = token.chars().collect::<Vec<char>>();
    let tail = chars[chars.len().saturating_sub(4)..]
        .iter()
        .collect::<String>();
    if token.starts_with("sk-") {
        return format!("sk-...{tail}");
    }
    let head = chars.iter().take(4).collect::<String>();
    format!("{head}...{tail}")
}

pub fn normalize_endpoint(endpoint: Option<&str>) -> String {
    endpoint
        .map(|value| value.trim().trim_end_matches('/'))
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_ENDPOINT)
        .to_string()
}

/// What the invocation layer is allowed to use for the next call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActiveAuth {
    Supplied(Credential),
    /// The host injects the key itself; only the endpoint is known here.
    HostManaged { endpoint: String },
}

impl ActiveAuth {
    pub fn endpoint(&self) -> &str {
        match self {
            ActiveAuth::Supplied(credential) => credential.endpoint(),
            ActiveAuth::HostManaged { endpoint } => endpoint,
        }
    }
}

/// Out-of-band key picker offered by a host environment.
///
/// The host never reports which key was chosen, only whether one is selected.
pub trait HostKeySelector {
    fn has_selected_key(&self) -> anyhow::Result<bool>;
    fn open_key_selection(&self) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    NotReady,
    /// The host flow returned but the host still reports no key; proceeding
    /// on the optimistic assumption that a key was chosen.
    Assumed,
}

impl Readiness {
    pub fn is_usable(self) -> bool {
        matches!(self, Readiness::Ready | Readiness::Assumed)
    }
}

#[derive(Debug, Clone)]
pub struct HostOptions {
    pub endpoint: Option<String>,
    pub assume_selection: bool,
}

enum Backend {
    SelfSupplied {
        store: KeyValueStore,
        min_token_len: usize,
        active: Option<Credential>,
    },
    HostDelegated {
        host: Box<dyn HostKeySelector>,
        endpoint: String,
        assume_selection: bool,
        assumed: bool,
    },
}

/// Holds the single active credential and gates access to it.
pub struct CredentialSession {
    backend: Backend,
}

impl fmt::Debug for CredentialSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSession")
            .field("strategy", &self.strategy())
            .field("active", &self.get_active())
            .finish()
    }
}

impl CredentialSession {
    /// Restores any credential persisted in `store`.
    pub fn self_supplied(mut store: KeyValueStore, min_token_len: usize) -> Self {
        let active = store
            .get(TOKEN_KEY)
            .filter(|token| !token.trim().is_empty())
            .map(|token| Credential::new(token, store.get(ENDPOINT_KEY).as_deref()));
        Self {
            backend: Backend::SelfSupplied {
                store,
                min_token_len,
                active,
            },
        }
    }

    pub fn host_delegated(host: Box<dyn HostKeySelector>, options: HostOptions) -> Self {
        Self {
            backend: Backend::HostDelegated {
                host,
                endpoint: normalize_endpoint(options.endpoint.as_deref()),
                assume_selection: options.assume_selection,
                assumed: false,
            },
        }
    }

    pub fn strategy(&self) -> AuthStrategy {
        match self.backend {
            Backend::SelfSupplied { .. } => AuthStrategy::SelfSupplied,
            Backend::HostDelegated { .. } => AuthStrategy::HostDelegated,
        }
    }

    pub fn get_active(&self) -> Option<&Credential> {
        match &self.backend {
            Backend::SelfSupplied { active, .. } => active.as_ref(),
            Backend::HostDelegated { .. } => None,
        }
    }

    pub fn login(
        &mut self,
        token: &str,
        endpoint: Option<&str>,
    ) -> Result<&Credential, CredentialError> {
        self.install(token, endpoint)?;
        self.get_active().ok_or(CredentialError::NotReady)
    }

    /// Same validation as [`Self::login`]; returns the credential it replaced.
    pub fn switch_credential(
        &mut self,
        token: &str,
        endpoint: Option<&str>,
    ) -> Result<Option<Credential>, CredentialError> {
        self.install(token, endpoint)
    }

    /// Clears the stored credential once `confirm` agrees. Returns whether
    /// anything was cleared.
    pub fn logout(&mut self, confirm: impl FnOnce() -> bool) -> Result<bool, CredentialError> {
        let Backend::SelfSupplied { store, active, .. } = &mut self.backend else {
            return Err(CredentialError::HostManaged);
        };
        if !confirm() {
            return Ok(false);
        }
        store.remove(TOKEN_KEY)?;
        store.remove(ENDPOINT_KEY)?;
        Ok(active.take().is_some())
    }

    /// Runs the host's key picker and then asks the host again.
    pub fn connect_via_host(&mut self) -> Result<Readiness, CredentialError> {
        let Backend::HostDelegated {
            host,
            assume_selection,
            assumed,
            ..
        } = &mut self.backend
        else {
            return Err(CredentialError::NotHostDelegated);
        };
        host.open_key_selection()?;
        if host.has_selected_key()? {
            *assumed = false;
            return Ok(Readiness::Ready);
        }
        *assumed = *assume_selection;
        Ok(if *assumed {
            Readiness::Assumed
        } else {
            Readiness::NotReady
        })
    }

    pub fn readiness(&self) -> Result<Readiness, CredentialError> {
        match &self.backend {
            Backend::SelfSupplied { active, .. } => Ok(if active.is_some() {
                Readiness::Ready
            } else {
                Readiness::NotReady
            }),
            Backend::HostDelegated { host, assumed, .. } => {
                if host.has_selected_key()? {
                    Ok(Readiness::Ready)
                } else if *assumed {
                    Ok(Readiness::Assumed)
                } else {
                    Ok(Readiness::NotReady)
                }
            }
        }
    }

    /// The gate every remote call passes through.
    pub fn active_auth(&self) -> Result<ActiveAuth, CredentialError> {
        match &self.backend {
            Backend::SelfSupplied { active, .. } => active
                .clone()
                .map(ActiveAuth::Supplied)
                .ok_or(CredentialError::NotReady),
            Backend::HostDelegated { endpoint, .. } => {
                if !self.readiness()?.is_usable() {
                    return Err(CredentialError::NotReady);
                }
                Ok(ActiveAuth::HostManaged {
                    endpoint: endpoint.clone(),
                })
            }
        }
    }

    fn install(
        &mut self,
        token: &str,
        endpoint: Option<&str>,
    ) -> Result<Option<Credential>, CredentialError> {
        let Backend::SelfSupplied {
            store,
            min_token_len,
            active,
        } = &mut self.backend
        else {
            return Err(CredentialError::HostManaged);
        };
        let credential = validate_token(token, endpoint, *min_token_len)?;
        store.set(TOKEN_KEY, credential.token())?;
        store.set(ENDPOINT_KEY, credential.endpoint())?;
        Ok(active.replace(credential))
    }
}

pub fn validate_token(
    token: &str,
    endpoint: Option<&str>,
    min_token_len: usize,
) -> Result<Credential, CredentialError> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return Err(CredentialError::EmptyToken);
    }
    let actual = trimmed.chars().count();
    if actual < min_token_len {
        return Err(CredentialError::TooShort {
            min: min_token_len,
            actual,
        });
    }
    Ok(Credential::new(trimmed, endpoint))
}
