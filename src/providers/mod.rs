mod dexcom;
mod traits;

pub use dexcom::DexcomProvider;
pub use traits::{OAuthProvider, TokenGrant};
