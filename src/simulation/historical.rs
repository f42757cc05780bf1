//! Bundled historical annual return series
//!
//! Annual US stock, bond, and inflation figures since 1928, embedded in
//! the binary so the core never opens files at run time.

use std::sync::OnceLock;

/// One calendar year of market history
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoricalYear {
    pub year: i32,
    /// Total stock return, decimal
    pub stock: f64,
    /// Total bond return, decimal
    pub bond: f64,
    /// CPI inflation, decimal
    pub inflation: f64,
}

const RAW: &str = include_str!("../../data/historical_returns.csv");

static PARSED: OnceLock<Vec<HistoricalYear>> = OnceLock::new();

/// The full bundled series, oldest year first
pub fn annual_returns() -> &'static [HistoricalYear] {
    PARSED.get_or_init(|| {
        let mut reader = csv::Reader::from_reader(RAW.as_bytes());
        let mut years = Vec::new();
        for record in reader.records() {
            // The bundled file is part of the build; a malformed row is a
            // packaging defect, not a runtime condition
            let record = record.expect("bundled return data is well-formed");
            let year: i32 = record[0].parse().expect("year column");
            let stock: f64 = record[1].parse().expect("stock column");
            let bond: f64 = record[2].parse().expect("bond column");
            let inflation: f64 = record[3].parse().expect("inflation column");
            years.push(HistoricalYear {
                year,
                stock: stock / 100.0,
                bond: bond / 100.0,
                inflation: inflation / 100.0,
            });
        }
        years
    })
}

/// First and last bundled calendar years
pub fn year_range() -> (i32, i32) {
    let data = annual_returns();
    (data[0].year, data[data.len() - 1].year)
}
