mod access_token;
mod token_store;
mod token_store_sqlite;

pub use access_token::AccessToken;
pub use token_store::TokenStore;
pub use token_store_sqlite::SqliteTokenStore;
