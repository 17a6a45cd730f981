use super::{EngineConfig, MidasConfig};
use crate::error::ConfigError;
use crate::regime::RegimeTable;
use rust_decimal::Decimal;
use std::collections::HashSet;

/// Validate invariants across the merged config that serde alone cannot enforce.
///
/// Collects every problem instead of stopping at the first, so a bad config file
/// is reported in one pass. Called by [`super::load_config`].
pub fn validate_config(config: &MidasConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_engine_config(&config.engine, &mut errors);
    validate_instruments(config, &mut errors);

    if let Err(ConfigError::Invalid(regime_errors)) = RegimeTable::from_entries(&config.regimes) {
        errors.extend(regime_errors);
    }

    if config.market_data.rate_limit_rpm == 0 {
        errors.push("market_data.rate_limit_rpm: must be > 0".into());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(errors))
    }
}

fn in_unit_interval(value: Decimal) -> bool {
    value >= Decimal::ZERO && value <= Decimal::ONE
}

fn validate_engine_config(engine: &EngineConfig, errors: &mut Vec<String>) {
    if engine.stop_loss < Decimal::ZERO || engine.stop_loss >= Decimal::ONE {
        errors.push(format!("engine.stop_loss: must be in [0, 1), got {}", engine.stop_loss));
    }

    if engine.trailing_stop < Decimal::ZERO || engine.trailing_stop >= Decimal::ONE {
        errors.push(format!(
            "engine.trailing_stop: must be in [0, 1), got {}",
            engine.trailing_stop
        ));
    }

    if engine.fund <= Decimal::ZERO {
        errors.push(format!("engine.fund: must be > 0, got {}", engine.fund));
    }

    if engine.buy_thresholds.is_empty() {
        errors.push("engine.buy_thresholds: must have at least one threshold".into());
    }
    for (i, threshold) in engine.buy_thresholds.iter().enumerate() {
        if *threshold <= Decimal::ZERO || *threshold >= Decimal::ONE {
            errors.push(format!(
                "engine.buy_thresholds[{i}]: must be in (0, 1), got {threshold}"
            ));
        }
    }

    if engine.ratio < Decimal::ZERO {
        errors.push(format!("engine.ratio: must be >= 0, got {}", engine.ratio));
    }

    if engine.cycle_hours == 0 {
        errors.push("engine.cycle_hours: must be > 0".into());
    }

    if !in_unit_interval(engine.reallocation_fraction) {
        errors.push(format!(
            "engine.reallocation_fraction: must be in [0, 1], got {}",
            engine.reallocation_fraction
        ));
    }

    if engine.reallocation_gain_threshold < Decimal::ZERO {
        errors.push(format!(
            "engine.reallocation_gain_threshold: must be >= 0, got {}",
            engine.reallocation_gain_threshold
        ));
    }

    if engine.double_down_multiplier < Decimal::ONE {
        errors.push(format!(
            "engine.double_down_multiplier: must be >= 1, got {}",
            engine.double_down_multiplier
        ));
    }

    if !in_unit_interval(engine.safety_ratio) {
        errors.push(format!(
            "engine.safety_ratio: must be in [0, 1], got {}",
            engine.safety_ratio
        ));
    }

    if engine.sell_spike <= Decimal::ZERO {
        errors.push(format!("engine.sell_spike: must be > 0, got {}", engine.sell_spike));
    }

    if let Some(dip) = engine.double_down_dip {
        if dip <= Decimal::ZERO || dip >= Decimal::ONE {
            errors.push(format!("engine.double_down_dip: must be in (0, 1), got {dip}"));
        }
    }
}

fn validate_instruments(config: &MidasConfig, errors: &mut Vec<String>) {
    if config.instruments.is_empty() {
        errors.push("instruments: must track at least one instrument".into());
    }

    let mut seen = HashSet::new();
    for instrument in &config.instruments {
        if instrument.symbol.trim().is_empty() {
            errors.push("instruments: symbol is empty".into());
            continue;
        }
        if !seen.insert(instrument.symbol.as_str()) {
            errors.push(format!("instruments.{}: duplicate symbol", instrument.symbol));
        }
        if instrument.expected_swing <= Decimal::ZERO {
            errors.push(format!(
                "instruments.{}: expected_swing must be > 0, got {}",
                instrument.symbol, instrument.expected_swing
            ));
        }
    }
}
