//! 检索模块：直连 + 中继回退链
pub mod fetcher;
pub mod relay;
pub mod url_normalizer;

pub use self::fetcher::{RetrievalResult, RetrievalStrategy, Retriever};
pub use self::relay::{default_relays, RelayEndpoint, RelayFormat};
pub use self::url_normalizer::normalize_url;
