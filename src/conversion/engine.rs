//! Quantity conversion engine
//!
//! Converts a quantity between two catalog units using one of three strategies:
//! - same type: normalize both units along their base chains to a shared base
//! - cross system: bridge two base chains through a unit's equivalent link
//! - density: volume <-> weight through an ingredient-specific factor

use std::collections::HashSet;

use serde::Serialize;

use super::catalog::ConversionCatalog;
use super::error::ConversionError;
use crate::models::{Unit, UnitType};

/// Longest base chain the engine will follow before giving up
pub const MAX_BASE_CHAIN_DEPTH: usize = 16;

/// Trace used when no conversion step was needed
pub const DIRECT_CONVERSION_TRACE: &str = "Direct conversion, same unit type and base.";

/// Stand-in when the ingredient name can't be resolved for the trace
pub const UNKNOWN_INGREDIENT: &str = "Unknown Ingredient";

/// A single conversion request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConversionRequest {
    pub quantity: f64,
    pub from_unit_id: i64,
    pub to_unit_id: i64,
    /// Only needed when converting between volume and weight
    pub ingredient_id: Option<i64>,
}

/// Which side of a density row the source quantity is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DensityDirection {
    VolumeToWeight,
    WeightToVolume,
}

/// How a conversion was carried out.
///
/// `factor` is always the multiplier applied to the source quantity, except for
/// density weight-to-volume where the row's factor is divided out.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversionStrategy {
    Direct,
    SameType {
        base_unit: String,
        factor: f64,
    },
    CrossSystem {
        via_unit: String,
        equivalent_unit: String,
        factor: f64,
    },
    Density {
        ingredient_id: i64,
        factor: f64,
        direction: DensityDirection,
    },
}

/// Outcome of a successful conversion
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    pub original_quantity: f64,
    pub original_unit: String,
    pub converted_quantity: f64,
    pub converted_unit: String,
    /// Human-readable trace; not meant to be parsed
    pub conversion_path: String,
    pub strategy: ConversionStrategy,
}

/// Convert `request.quantity` from one unit to another.
///
/// Pure read + compute: the catalog is only queried, never written.
pub fn convert<C: ConversionCatalog + ?Sized>(
    catalog: &C,
    request: &ConversionRequest,
) -> Result<ConversionResult, ConversionError> {
    let quantity = request.quantity;
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(ConversionError::InvalidQuantity { quantity });
    }

    let from = resolve_unit(catalog, request.from_unit_id)?;
    let to = resolve_unit(catalog, request.to_unit_id)?;

    let (converted_quantity, strategy, steps) = if from.unit_type == to.unit_type {
        convert_same_type(catalog, quantity, &from, &to)?
    } else if is_density_pair(from.unit_type, to.unit_type) {
        convert_by_density(catalog, quantity, &from, &to, request.ingredient_id)?
    } else {
        return Err(ConversionError::IncompatibleUnitTypes {
            from_type: from.unit_type,
            to_type: to.unit_type,
        });
    };

    // Overflow to inf or underflow to 0 would otherwise pass as a success
    if !converted_quantity.is_finite() || converted_quantity <= 0.0 {
        return Err(ConversionError::QuantityOutOfRange {
            quantity,
            converted: converted_quantity,
        });
    }

    tracing::debug!(
        "Converted {} {} -> {} {} ({:?})",
        quantity,
        from.abbreviation,
        converted_quantity,
        to.abbreviation,
        strategy
    );

    Ok(ConversionResult {
        original_quantity: quantity,
        original_unit: from.abbreviation,
        converted_quantity,
        converted_unit: to.abbreviation,
        conversion_path: steps.join("; "),
        strategy,
    })
}

fn resolve_unit<C: ConversionCatalog + ?Sized>(
    catalog: &C,
    unit_id: i64,
) -> Result<Unit, ConversionError> {
    catalog
        .get_unit(unit_id)?
        .ok_or(ConversionError::UnitNotFound { unit_id })
}

fn is_density_pair(a: UnitType, b: UnitType) -> bool {
    matches!(
        (a, b),
        (UnitType::Volume, UnitType::Weight) | (UnitType::Weight, UnitType::Volume)
    )
}

type Converted = (f64, ConversionStrategy, Vec<String>);

// ============================================================================
// Base-unit normalization
// ============================================================================

/// A unit walked down to the root of its base chain
struct Normalized {
    /// Units converted away from, starting with the original unit
    hops: Vec<Unit>,
    root: Unit,
    /// Root quantities per one original unit
    factor: f64,
}

impl Normalized {
    /// The original unit followed by each base, ending at the root
    fn path(&self) -> impl Iterator<Item = &Unit> {
        self.hops.iter().chain(std::iter::once(&self.root))
    }
}

fn normalize<C: ConversionCatalog + ?Sized>(
    catalog: &C,
    unit: Unit,
) -> Result<Normalized, ConversionError> {
    let start_id = unit.id;
    let mut seen = HashSet::from([start_id]);
    let mut hops = Vec::new();
    let mut factor = 1.0;
    let mut current = unit;

    while let Some(base_id) = current.base_unit_id {
        if hops.len() >= MAX_BASE_CHAIN_DEPTH || !seen.insert(base_id) {
            return Err(ConversionError::InvalidBaseChain { unit_id: start_id });
        }

        let base = resolve_unit(catalog, base_id)?;
        if base.unit_type != current.unit_type || base.system != current.system {
            tracing::warn!(
                "Unit '{}' references base '{}' from a different system or type",
                current.abbreviation,
                base.abbreviation
            );
            return Err(ConversionError::InvalidBaseChain { unit_id: start_id });
        }

        factor *= current.conversion_factor;
        hops.push(current);
        current = base;
    }

    Ok(Normalized {
        hops,
        root: current,
        factor,
    })
}

/// Trace lines walking `quantity` of `norm`'s original unit up to its root.
/// Returns the quantity expressed in the root unit.
fn trace_up(norm: &Normalized, quantity: f64, steps: &mut Vec<String>) -> f64 {
    let mut q = quantity;
    let path: Vec<&Unit> = norm.path().collect();
    for pair in path.windows(2) {
        let next = q * pair[0].conversion_factor;
        steps.push(format!(
            "{} {} → {} {}",
            format_quantity(q),
            pair[0].abbreviation,
            format_quantity(next),
            pair[1].abbreviation
        ));
        q = next;
    }
    q
}

/// Trace lines walking a root quantity back down to `norm`'s original unit
fn trace_down(norm: &Normalized, root_quantity: f64, steps: &mut Vec<String>) -> f64 {
    let mut q = root_quantity;
    let path: Vec<&Unit> = norm.path().collect();
    for pair in path.windows(2).rev() {
        let next = q / pair[0].conversion_factor;
        steps.push(format!(
            "{} {} → {} {}",
            format_quantity(q),
            pair[1].abbreviation,
            format_quantity(next),
            pair[0].abbreviation
        ));
        q = next;
    }
    q
}

fn convert_same_type<C: ConversionCatalog + ?Sized>(
    catalog: &C,
    quantity: f64,
    from: &Unit,
    to: &Unit,
) -> Result<Converted, ConversionError> {
    if from.id == to.id {
        return Ok((
            quantity,
            ConversionStrategy::Direct,
            vec![DIRECT_CONVERSION_TRACE.to_string()],
        ));
    }

    let from_norm = normalize(catalog, from.clone())?;
    let to_norm = normalize(catalog, to.clone())?;

    if from_norm.root.id != to_norm.root.id {
        return convert_cross_system(catalog, quantity, &from_norm, &to_norm);
    }

    let mut steps = Vec::new();
    let base_quantity = trace_up(&from_norm, quantity, &mut steps);
    let converted = trace_down(&to_norm, base_quantity, &mut steps);

    // Target is the base itself but the source's immediate base is some other unit
    if to_norm.hops.is_empty() && from.base_unit_id.is_some_and(|b| b != to.id) {
        steps.push(format!(
            "converted to {} {}",
            format_quantity(converted),
            to.abbreviation
        ));
    }

    Ok((
        converted,
        ConversionStrategy::SameType {
            base_unit: from_norm.root.abbreviation.clone(),
            factor: from_norm.factor / to_norm.factor,
        },
        steps,
    ))
}

// ============================================================================
// Cross-system equivalence
// ============================================================================

/// A unit in one chain whose equivalent lands in the other chain
struct Bridge {
    /// Position of the linking unit in its own chain's path
    index: usize,
    /// One linking unit expressed in the other chain's root
    root_quantity: f64,
    via_unit: String,
    equivalent_unit: String,
}

/// Search `source`'s chain for an equivalent link whose own chain ends at `target_root_id`
fn find_bridge<C: ConversionCatalog + ?Sized>(
    catalog: &C,
    source: &Normalized,
    target_root_id: i64,
) -> Result<Option<Bridge>, ConversionError> {
    for (index, unit) in source.path().enumerate() {
        let (Some(equivalent_id), Some(equivalent_factor)) =
            (unit.equivalent_unit_id, unit.equivalent_factor)
        else {
            continue;
        };

        let Some(equivalent) = catalog.get_unit(equivalent_id)? else {
            tracing::warn!(
                "Unit '{}' links to missing equivalent unit {}",
                unit.abbreviation,
                equivalent_id
            );
            continue;
        };
        if equivalent.unit_type != unit.unit_type {
            continue;
        }

        let equivalent_abbreviation = equivalent.abbreviation.clone();
        let equivalent_norm = normalize(catalog, equivalent)?;
        if equivalent_norm.root.id == target_root_id {
            return Ok(Some(Bridge {
                index,
                root_quantity: equivalent_factor * equivalent_norm.factor,
                via_unit: unit.abbreviation.clone(),
                equivalent_unit: equivalent_abbreviation,
            }));
        }
    }

    Ok(None)
}

/// Product of conversion factors from the chain's start up to `index`
fn factor_to_index(norm: &Normalized, index: usize) -> f64 {
    norm.hops.iter().take(index).map(|u| u.conversion_factor).product()
}

fn convert_cross_system<C: ConversionCatalog + ?Sized>(
    catalog: &C,
    quantity: f64,
    from_norm: &Normalized,
    to_norm: &Normalized,
) -> Result<Converted, ConversionError> {
    let from_abbr = from_norm.path().next().map(|u| u.abbreviation.as_str()).unwrap_or_default();
    let to_abbr = to_norm.path().next().map(|u| u.abbreviation.as_str()).unwrap_or_default();

    // From-chain unit links forward into the target system
    if let Some(bridge) = find_bridge(catalog, from_norm, to_norm.root.id)? {
        let via_quantity = quantity * factor_to_index(from_norm, bridge.index);
        let target_root_quantity = via_quantity * bridge.root_quantity;
        let converted = target_root_quantity / to_norm.factor;
        let factor = converted / quantity;

        let mut steps = Vec::new();
        if bridge.index > 0 {
            steps.push(format!(
                "{} {} → {} {}",
                format_quantity(quantity),
                from_abbr,
                format_quantity(via_quantity),
                bridge.via_unit
            ));
        }
        steps.push(format!(
            "{} {} ≈ {} {} (equivalent via {})",
            format_quantity(via_quantity),
            bridge.via_unit,
            format_quantity(target_root_quantity),
            to_norm.root.abbreviation,
            bridge.equivalent_unit
        ));
        if !to_norm.hops.is_empty() {
            steps.push(format!("→ {} {}", format_quantity(converted), to_abbr));
        }

        return Ok((
            converted,
            ConversionStrategy::CrossSystem {
                via_unit: bridge.via_unit,
                equivalent_unit: bridge.equivalent_unit,
                factor,
            },
            steps,
        ));
    }

    // Target-chain unit links back into the source system
    if let Some(bridge) = find_bridge(catalog, to_norm, from_norm.root.id)? {
        let from_root_quantity = quantity * from_norm.factor;
        let via_quantity = from_root_quantity / bridge.root_quantity;
        let converted = via_quantity / factor_to_index(to_norm, bridge.index);
        let factor = converted / quantity;

        let mut steps = Vec::new();
        if !from_norm.hops.is_empty() {
            steps.push(format!(
                "{} {} → {} {}",
                format_quantity(quantity),
                from_abbr,
                format_quantity(from_root_quantity),
                from_norm.root.abbreviation
            ));
        }
        steps.push(format!(
            "{} {} ≈ {} {} (equivalent via {})",
            format_quantity(from_root_quantity),
            from_norm.root.abbreviation,
            format_quantity(via_quantity),
            bridge.via_unit,
            bridge.equivalent_unit
        ));
        if bridge.index > 0 {
            steps.push(format!("→ {} {}", format_quantity(converted), to_abbr));
        }

        return Ok((
            converted,
            ConversionStrategy::CrossSystem {
                via_unit: bridge.via_unit,
                equivalent_unit: bridge.equivalent_unit,
                factor,
            },
            steps,
        ));
    }

    Err(ConversionError::IncompatibleBaseUnits {
        from_base: from_norm.root.abbreviation.clone(),
        to_base: to_norm.root.abbreviation.clone(),
    })
}

// ============================================================================
// Density (volume <-> weight)
// ============================================================================

fn convert_by_density<C: ConversionCatalog + ?Sized>(
    catalog: &C,
    quantity: f64,
    from: &Unit,
    to: &Unit,
    ingredient_id: Option<i64>,
) -> Result<Converted, ConversionError> {
    let ingredient_id =
        ingredient_id.ok_or(ConversionError::IngredientRequiredForConversion {
            from_type: from.unit_type,
            to_type: to.unit_type,
        })?;

    let (volume, weight, direction) = if from.unit_type == UnitType::Volume {
        (from, to, DensityDirection::VolumeToWeight)
    } else {
        (to, from, DensityDirection::WeightToVolume)
    };

    let density = catalog
        .get_density_conversion(ingredient_id, volume.id, weight.id)?
        .ok_or(ConversionError::DensityConversionNotFound {
            ingredient_id,
            volume_unit_id: volume.id,
            weight_unit_id: weight.id,
        })?;

    let factor = density.conversion_factor;
    let (converted, op) = match direction {
        DensityDirection::VolumeToWeight => (quantity * factor, "×"),
        DensityDirection::WeightToVolume => (quantity / factor, "÷"),
    };

    let name = ingredient_display_name(catalog, ingredient_id);
    let step = format!(
        "Density conversion for {}: {} {} {} {} = {} {}",
        name,
        format_quantity(quantity),
        from.abbreviation,
        op,
        format_quantity(factor),
        format_quantity(converted),
        to.abbreviation
    );

    Ok((
        converted,
        ConversionStrategy::Density {
            ingredient_id,
            factor,
            direction,
        },
        vec![step],
    ))
}

fn ingredient_display_name<C: ConversionCatalog + ?Sized>(catalog: &C, ingredient_id: i64) -> String {
    match catalog.get_ingredient_display_name(ingredient_id) {
        Ok(Some(name)) => name,
        Ok(None) => UNKNOWN_INGREDIENT.to_string(),
        Err(e) => {
            tracing::warn!("Ingredient {} name lookup failed: {}", ingredient_id, e);
            UNKNOWN_INGREDIENT.to_string()
        }
    }
}

/// Up to four decimals, without trailing zeros
fn format_quantity(q: f64) -> String {
    let s = format!("{:.4}", q);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() || s == "-" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::catalog::memory::MemoryCatalog;
    use crate::models::MeasurementSystem::{Metric, Us};
    use crate::models::UnitType::{Count, Length, Volume, Weight};

    const TSP: i64 = 1;
    const TBSP: i64 = 2;
    const CUP: i64 = 3;
    const ML: i64 = 10;
    const LITER: i64 = 11;
    const GRAM: i64 = 20;
    const KG: i64 = 21;
    const OZ: i64 = 30;
    const LB: i64 = 31;
    const EACH: i64 = 40;
    const INCH: i64 = 50;
    const FLOUR: i64 = 7;

    fn catalog() -> MemoryCatalog {
        let mut c = MemoryCatalog::new();
        c.add_unit(TSP, "tsp", Us, Volume, None, 1.0);
        c.add_unit(TBSP, "tbsp", Us, Volume, Some(TSP), 3.0);
        c.add_unit(CUP, "cup", Us, Volume, Some(TSP), 48.0);
        c.add_unit(ML, "ml", Metric, Volume, None, 1.0);
        c.add_unit(LITER, "L", Metric, Volume, Some(ML), 1000.0);
        c.add_unit(GRAM, "g", Metric, Weight, None, 1.0);
        c.add_unit(KG, "kg", Metric, Weight, Some(GRAM), 1000.0);
        c.add_unit(OZ, "oz", Us, Weight, None, 1.0);
        c.add_unit(LB, "lb", Us, Weight, Some(OZ), 16.0);
        c.add_unit(EACH, "ea", Us, Count, None, 1.0);
        c.add_unit(INCH, "in", Us, Length, None, 1.0);
        c.link_equivalent(TSP, ML, 4.92892);
        c.add_ingredient(FLOUR, "All-purpose flour");
        c.add_density(FLOUR, CUP, GRAM, 120.0);
        c
    }

    fn request(quantity: f64, from: i64, to: i64, ingredient: Option<i64>) -> ConversionRequest {
        ConversionRequest {
            quantity,
            from_unit_id: from,
            to_unit_id: to,
            ingredient_id: ingredient,
        }
    }

    fn run(quantity: f64, from: i64, to: i64) -> ConversionResult {
        convert(&catalog(), &request(quantity, from, to, None)).unwrap()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_tablespoons_to_teaspoons() {
        let result = run(2.0, TBSP, TSP);
        assert!(approx(result.converted_quantity, 6.0));
        assert_eq!(result.original_unit, "tbsp");
        assert_eq!(result.converted_unit, "tsp");
        assert!(matches!(result.strategy, ConversionStrategy::SameType { factor, .. } if approx(factor, 3.0)));
    }

    #[test]
    fn test_kilograms_to_grams() {
        let result = run(2.5, KG, GRAM);
        assert!(approx(result.converted_quantity, 2500.0));
    }

    #[test]
    fn test_between_two_derived_units() {
        // cup -> tsp -> tbsp
        let result = run(1.0, CUP, TBSP);
        assert!(approx(result.converted_quantity, 16.0));
        assert!(result.conversion_path.contains("tsp"));
    }

    #[test]
    fn test_same_unit_is_direct() {
        for unit in [TSP, TBSP, GRAM, EACH] {
            let result = run(3.25, unit, unit);
            assert_eq!(result.converted_quantity, 3.25);
            assert_eq!(result.strategy, ConversionStrategy::Direct);
            assert_eq!(result.conversion_path, DIRECT_CONVERSION_TRACE);
        }
    }

    #[test]
    fn test_round_trip_within_shared_base() {
        let pairs = [(TBSP, TSP), (CUP, TBSP), (KG, GRAM), (LB, OZ), (LITER, ML)];
        for (a, b) in pairs {
            for q in [0.001, 1.0, 2.5, 333.3] {
                let there = run(q, a, b);
                let back = run(there.converted_quantity, b, a);
                assert!(
                    (back.converted_quantity - q).abs() < 1e-9 * q.max(1.0),
                    "{} -> {} -> {} for {}",
                    a,
                    b,
                    a,
                    q
                );
            }
        }
    }

    #[test]
    fn test_invalid_quantity_checked_before_units() {
        let c = catalog();
        for q in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = convert(&c, &request(q, 999, 998, None)).unwrap_err();
            assert!(matches!(err, ConversionError::InvalidQuantity { .. }));
        }
    }

    #[test]
    fn test_overflowing_result_is_rejected() {
        let err = convert(&catalog(), &request(1e307, KG, GRAM, None)).unwrap_err();
        assert!(matches!(
            err,
            ConversionError::QuantityOutOfRange { converted, .. } if converted.is_infinite()
        ));

        let err = convert(&catalog(), &request(f64::MAX, CUP, GRAM, Some(FLOUR))).unwrap_err();
        assert_eq!(err.kind(), "QuantityOutOfRange");
    }

    #[test]
    fn test_underflowing_result_is_rejected() {
        let err = convert(&catalog(), &request(5e-324, GRAM, KG, None)).unwrap_err();
        assert!(matches!(
            err,
            ConversionError::QuantityOutOfRange { converted, .. } if converted == 0.0
        ));
    }

    #[test]
    fn test_unknown_unit_either_side() {
        let c = catalog();
        let err = convert(&c, &request(1.0, 999, TSP, None)).unwrap_err();
        assert!(matches!(err, ConversionError::UnitNotFound { unit_id: 999 }));

        let err = convert(&c, &request(1.0, TSP, 998, None)).unwrap_err();
        assert!(matches!(err, ConversionError::UnitNotFound { unit_id: 998 }));
    }

    #[test]
    fn test_density_volume_to_weight() {
        let result = convert(&catalog(), &request(2.0, CUP, GRAM, Some(FLOUR))).unwrap();
        assert!(approx(result.converted_quantity, 240.0));
        assert_eq!(
            result.strategy,
            ConversionStrategy::Density {
                ingredient_id: FLOUR,
                factor: 120.0,
                direction: DensityDirection::VolumeToWeight,
            }
        );
        assert!(result.conversion_path.contains("All-purpose flour"));
        assert!(result.conversion_path.contains("120"));
    }

    #[test]
    fn test_density_weight_to_volume() {
        let result = convert(&catalog(), &request(240.0, GRAM, CUP, Some(FLOUR))).unwrap();
        assert!(approx(result.converted_quantity, 2.0));
        assert!(matches!(
            result.strategy,
            ConversionStrategy::Density { direction: DensityDirection::WeightToVolume, .. }
        ));
    }

    #[test]
    fn test_density_requires_ingredient() {
        let err = convert(&catalog(), &request(1.0, CUP, GRAM, None)).unwrap_err();
        assert!(matches!(err, ConversionError::IngredientRequiredForConversion { .. }));
        assert_eq!(err.kind(), "IngredientRequiredForConversion");
    }

    #[test]
    fn test_density_row_missing() {
        let c = catalog();
        // Row exists for cup/g only, not tbsp/g or cup/kg
        let err = convert(&c, &request(1.0, TBSP, GRAM, Some(FLOUR))).unwrap_err();
        assert!(matches!(
            err,
            ConversionError::DensityConversionNotFound { ingredient_id: FLOUR, volume_unit_id: TBSP, weight_unit_id: GRAM }
        ));

        let err = convert(&c, &request(1.0, KG, CUP, Some(FLOUR))).unwrap_err();
        assert!(matches!(
            err,
            ConversionError::DensityConversionNotFound { volume_unit_id: CUP, weight_unit_id: KG, .. }
        ));

        let err = convert(&c, &request(1.0, CUP, GRAM, Some(99))).unwrap_err();
        assert!(matches!(err, ConversionError::DensityConversionNotFound { .. }));
    }

    #[test]
    fn test_density_name_lookup_failure_degrades() {
        let mut c = catalog();
        c.fail_ingredient_lookup = true;
        let result = convert(&c, &request(1.0, CUP, GRAM, Some(FLOUR))).unwrap();
        assert!(approx(result.converted_quantity, 120.0));
        assert!(result.conversion_path.contains(UNKNOWN_INGREDIENT));

        let mut c = catalog();
        c.add_density(8, CUP, GRAM, 200.0);
        let result = convert(&c, &request(1.0, CUP, GRAM, Some(8))).unwrap();
        assert!(result.conversion_path.contains(UNKNOWN_INGREDIENT));
    }

    #[test]
    fn test_incompatible_types() {
        let c = catalog();
        for (from, to) in [(EACH, GRAM), (GRAM, EACH), (CUP, INCH), (INCH, EACH)] {
            let err = convert(&c, &request(1.0, from, to, Some(FLOUR))).unwrap_err();
            assert!(matches!(err, ConversionError::IncompatibleUnitTypes { .. }));
        }
    }

    #[test]
    fn test_cross_system_forward_equivalent() {
        // 1 cup = 48 tsp = 48 * 4.92892 ml
        let result = run(1.0, CUP, ML);
        assert!((result.converted_quantity - 236.588).abs() < 0.01);
        assert!(matches!(
            result.strategy,
            ConversionStrategy::CrossSystem { ref via_unit, .. } if via_unit == "tsp"
        ));

        let result = run(2.0, TBSP, LITER);
        assert!(approx(result.converted_quantity, 2.0 * 3.0 * 4.92892 / 1000.0));
    }

    #[test]
    fn test_cross_system_reverse_equivalent() {
        // Only tsp -> ml is linked; ml -> tbsp must walk the link backwards
        let result = run(29.57352, ML, TBSP);
        assert!((result.converted_quantity - 2.0).abs() < 1e-4);

        let result = run(1.0, LITER, CUP);
        assert!((result.converted_quantity - 1000.0 / (4.92892 * 48.0)).abs() < 1e-9);
    }

    #[test]
    fn test_unrelated_bases_are_rejected() {
        // oz and g have no equivalent link in this catalog
        let err = run_err(1.0, LB, KG);
        match err {
            ConversionError::IncompatibleBaseUnits { from_base, to_base } => {
                assert_eq!(from_base, "oz");
                assert_eq!(to_base, "g");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    fn run_err(quantity: f64, from: i64, to: i64) -> ConversionError {
        convert(&catalog(), &request(quantity, from, to, None)).unwrap_err()
    }

    #[test]
    fn test_cyclic_base_chain_is_reported() {
        let mut c = MemoryCatalog::new();
        c.add_unit(1, "a", Us, Length, Some(2), 2.0);
        c.add_unit(2, "b", Us, Length, Some(1), 0.5);
        c.add_unit(3, "c", Us, Length, None, 1.0);
        let err = convert(&c, &request(1.0, 1, 3, None)).unwrap_err();
        assert!(matches!(err, ConversionError::InvalidBaseChain { unit_id: 1 }));
    }

    #[test]
    fn test_cross_type_base_reference_is_reported() {
        let mut c = MemoryCatalog::new();
        c.add_unit(1, "g", Metric, Weight, None, 1.0);
        c.add_unit(2, "odd", Metric, Volume, Some(1), 5.0);
        c.add_unit(3, "ml", Metric, Volume, None, 1.0);
        let err = convert(&c, &request(1.0, 2, 3, None)).unwrap_err();
        assert!(matches!(err, ConversionError::InvalidBaseChain { unit_id: 2 }));
    }

    #[test]
    fn test_multi_hop_chain_appends_converted_line() {
        let mut c = MemoryCatalog::new();
        c.add_unit(1, "in", Us, Length, None, 1.0);
        c.add_unit(2, "ft", Us, Length, Some(1), 12.0);
        c.add_unit(3, "yd", Us, Length, Some(2), 3.0);
        let result = convert(&c, &request(2.0, 3, 1, None)).unwrap();
        assert!(approx(result.converted_quantity, 72.0));
        assert!(result.conversion_path.contains("converted to 72 in"));
    }

    #[test]
    fn test_format_quantity() {
        assert_eq!(format_quantity(6.0), "6");
        assert_eq!(format_quantity(2.5), "2.5");
        assert_eq!(format_quantity(236.58816), "236.5882");
        assert_eq!(format_quantity(0.00001), "0");
    }
}
