use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockDetails {
    pub symbol: String,
    pub company: String,
    pub current_price: f64,
    pub change_percent: f64,
    pub price_formatted: String,
    pub change_formatted: String,
    pub market_cap_formatted: String,
    pub pe_ratio: String,
}
