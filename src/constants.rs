/// Contract registry and logical contract names
///
/// The registry is deployed at the same address on every supported network.
pub mod registry {
    /// FlareContractRegistry address
    pub const ADDRESS: &str = "0xaD67FE66660Fb8dFE9d6b1b4240d8650e30F6019";
    /// Registry lookup function
    pub const LOOKUP_SIGNATURE: &str = "getContractAddressByName(string)";
    /// Logical name of the FTSOv2 price oracle
    pub const FTSO_V2: &str = "FtsoV2";
}

/// FTSOv2 read functions
pub mod ftso {
    /// Single feed read: returns (value, decimals, timestamp)
    pub const GET_FEED_BY_ID: &str = "getFeedById(bytes21)";
}

/// Default cache TTL in seconds
pub const DEFAULT_CACHE_TTL_SECS: u64 = 60;

/// Default subscription polling interval in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;

/// Quote currency appended to bare symbols ("BTC" -> "BTC/USD")
pub const DEFAULT_QUOTE_CURRENCY: &str = "USD";
