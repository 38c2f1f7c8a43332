//! Vendor token lifecycle: code exchange, refresh, and authenticated fetches
//! that recover from an expired access token.

mod exchange;
mod fetch;
mod refresh;

pub use exchange::{ExchangeRequest, TokenExchanger};
pub use fetch::AuthenticatedFetcher;
pub use refresh::TokenRefresher;
