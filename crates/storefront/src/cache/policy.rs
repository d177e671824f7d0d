//! Fixed time-to-live policy per cached operation.
//!
//! TTLs follow data volatility: search results churn with every stock change,
//! store-wide statistics barely move within an hour.

use std::time::Duration;

/// A cached catalog operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheOperation {
    Trending,
    Featured,
    ByCategory,
    Search,
    Statistics,
    ProductDetail,
    Related,
}

impl CacheOperation {
    /// Every operation, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Trending,
        Self::Featured,
        Self::ByCategory,
        Self::Search,
        Self::Statistics,
        Self::ProductDetail,
        Self::Related,
    ];

    /// Key prefix for this operation.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Trending => "trending",
            Self::Featured => "featured",
            Self::ByCategory => "by_category",
            Self::Search => "search",
            Self::Statistics => "statistics",
            Self::ProductDetail => "product",
            Self::Related => "related",
        }
    }

    /// How long a computed result stays fresh.
    #[must_use]
    pub const fn ttl(self) -> Duration {
        let secs = match self {
            Self::Search => 120,
            Self::ProductDetail => 300,
            Self::ByCategory | Self::Related => 600,
            Self::Featured => 900,
            Self::Trending => 1800,
            Self::Statistics => 3600,
        };
        Duration::from_secs(secs)
    }
}

impl std::fmt::Display for CacheOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
