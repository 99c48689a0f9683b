//! Ratio and growth calculator.
//!
//! Every division in the crate goes through [`safe_div`] or [`pct_change`], so
//! a zero or missing denominator yields null instead of an infinite or NaN
//! value.

pub mod dividends;
pub mod growth;
pub mod returns;

pub use dividends::DividendHistory;
pub use growth::{ChainedGrowth, GrowthStage};
pub use returns::{
    PriceReturns, annualized_return, cumulative_return, sharpe, simple_return, volatility,
};

use polars::prelude::*;

/// A null `Float64` literal.
pub fn null_f64() -> Expr {
    lit(NULL).cast(DataType::Float64)
}

/// `num / den`, or null when `den` is zero or null.
pub fn safe_div(num: Expr, den: Expr) -> Expr {
    let den = den.cast(DataType::Float64);
    when(den.clone().neq(lit(0.0)))
        .then(num.cast(DataType::Float64) / den)
        .otherwise(null_f64())
}

/// `curr / prior - 1`, or null unless `prior` is strictly positive.
pub fn pct_change(curr: Expr, prior: Expr) -> Expr {
    let prior = prior.cast(DataType::Float64);
    when(prior.clone().gt(lit(0.0)))
        .then(curr.cast(DataType::Float64) / prior - lit(1.0))
        .otherwise(null_f64())
}

/// Geometric mean of chained growth rates: `(∏(1 + p_i))^(1/n) - 1`.
///
/// Null when any input is null or when the product of growth factors is not
/// positive, where the fractional root is undefined.
pub fn chain_growth(parts: Vec<Expr>) -> Expr {
    let n = parts.len();
    if n == 0 {
        return null_f64();
    }
    let product = parts
        .into_iter()
        .map(|p| lit(1.0) + p.cast(DataType::Float64))
        .reduce(|acc, factor| acc * factor)
        .unwrap_or_else(|| lit(1.0));

    when(product.clone().gt(lit(0.0)))
        .then(product.pow(lit(1.0 / n as f64)) - lit(1.0))
        .otherwise(null_f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn eval(df: DataFrame, expr: Expr) -> Vec<Option<f64>> {
        df.lazy()
            .select([expr.alias("out")])
            .collect()
            .unwrap()
            .column("out")
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect()
    }

    #[test]
    fn test_pct_change_requires_positive_prior() {
        let df = df![
            "curr" => [Some(12.0), Some(5.0), Some(5.0), Some(5.0), None],
            "prior" => [Some(10.0), Some(0.0), Some(-2.0), None, Some(4.0)]
        ]
        .unwrap();
        let out = eval(df, pct_change(col("curr"), col("prior")));
        assert_relative_eq!(out[0].unwrap(), 0.2, epsilon = 1e-12);
        assert_eq!(&out[1..], &[None, None, None, None]);
    }

    #[test]
    fn test_safe_div() {
        let df = df![
            "num" => [Some(3.0), Some(3.0), Some(3.0)],
            "den" => [Some(-1.5), Some(0.0), None]
        ]
        .unwrap();
        let out = eval(df, safe_div(col("num"), col("den")));
        assert_eq!(out, vec![Some(-2.0), None, None]);
    }

    #[test]
    fn test_chain_growth() {
        let df = df![
            "p1" => [Some(0.21), Some(-0.5), Some(-2.0), None],
            "p2" => [Some(0.0), Some(-0.5), Some(0.5), Some(0.1)]
        ]
        .unwrap();
        let out = eval(df, chain_growth(vec![col("p1"), col("p2")]));
        assert_relative_eq!(out[0].unwrap(), 0.1, epsilon = 1e-12);
        assert_relative_eq!(out[1].unwrap(), -0.5, epsilon = 1e-12);
        // Negative product of growth factors has no real square root.
        assert_eq!(out[2], None);
        assert_eq!(out[3], None);
    }
}
