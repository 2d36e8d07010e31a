mod credential;
mod store;

pub use credential::{
    mask_token, normalize_endpoint, validate_token, ActiveAuth, AuthStrategy, Credential,
    CredentialError, CredentialSession, HostKeySelector, HostOptions, KeyFlavour, Readiness,
    DEFAULT_ENDPOINT, DEFAULT_MIN_TOKEN_LEN,
};
pub use store::{KeyValueStore, ENDPOINT_KEY, TOKEN_KEY};
