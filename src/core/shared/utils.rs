use bigdecimal::BigDecimal;
use diesel::{
    r2d2::{ConnectionManager, Pool},
    PgConnection,
};
use std::str::FromStr;

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

pub fn create_conn(database_url: &str, max_size: u32) -> Result<DbPool, diesel::r2d2::PoolError> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Pool::builder().max_size(max_size.max(1)).build(manager)
}

pub fn bd(val: f64) -> BigDecimal {
    BigDecimal::from_str(&val.to_string()).unwrap_or_else(|_| BigDecimal::from(0))
}

pub fn bd_to_f64(val: &BigDecimal) -> f64 {
    val.to_string().parse::<f64>().unwrap_or(0.0)
}

/// Whole quantities print without decimals ("2"), fractional ones keep up to three ("2.5").
pub fn format_quantity(qty: f64) -> String {
    if qty == 0.0 {
        "0".to_string()
    } else if qty.fract() == 0.0 {
        format!("{qty:.0}")
    } else {
        let s = format!("{:.3}", qty);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

pub fn truncate_for_log(text: &str) -> &str {
    match text.char_indices().nth(100) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
