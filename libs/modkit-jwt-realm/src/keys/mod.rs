//! Key material: inline HMAC secrets and refreshable public JWK sets.

mod refresh;
mod remote;
mod source;
mod store;

pub use refresh::{run_key_refresh_task, KeyStoreProvider};
pub use remote::JwksClient;
pub use source::{KeyLoadError, KeySource};
pub use store::{KeySet, KeyStore};
