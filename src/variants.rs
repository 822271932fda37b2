//! deterministic sampling of a form's legitimate option combinations
//!
//! select / radio / checkbox groups span a combinatorial space of possible
//! submissions; testing every combination is usually infeasible, so the
//! generator enumerates exhaustively below a fixed cap and falls back to
//! fixed-seed random sampling above it. Users expect two consecutive scans
//! to exercise the same requests, so the sampled set must be identical
//! across calls and across process runs.
use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::FormFuzzError;
use crate::fields::FormField;
use crate::form_params::FormParameters;

/// upper bound on the number of variants produced beyond the original form
pub const TOP_VARIANTS: usize = 15;

/// absolute ceiling on the sampled index range, keeping the sampler's
/// arithmetic well away from overflow territory
pub const MAX_VARIANTS_TOTAL: u64 = 1_000_000_000;

/// fixed sampler seed; scan reproducibility depends on it never changing
/// between runs
pub(crate) const VARIANT_SEED: u64 = 1;

/// which option combinations [`FormParameters::variants`] should produce
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[non_exhaustive]
pub enum VariantMode {
    /// every combination (capped at [`TOP_VARIANTS`])
    All,

    /// first option only, per field
    Top,

    /// last option only, per field
    Bottom,

    /// first options, then last options (two variants)
    TopBottom,

    /// up to three options per field: first, middle and last
    TopMiddleBottom,
}

impl VariantMode {
    /// the short mode string, as accepted by [`FromStr`]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Top => "t",
            Self::Bottom => "b",
            Self::TopBottom => "tb",
            Self::TopMiddleBottom => "tmb",
        }
    }
}

impl Display for VariantMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for VariantMode {
    type Err = FormFuzzError;

    /// parse one of the short mode strings: `all`, `t`, `b`, `tb`, `tmb`
    ///
    /// # Examples
    ///
    /// ```
    /// # use formfuzz::variants::VariantMode;
    /// # use std::str::FromStr;
    /// assert_eq!(VariantMode::from_str("tmb").unwrap(), VariantMode::TopMiddleBottom);
    /// assert!(VariantMode::from_str("everything").is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "t" => Ok(Self::Top),
            "b" => Ok(Self::Bottom),
            "tb" => Ok(Self::TopBottom),
            "tmb" => Ok(Self::TopMiddleBottom),
            other => Err(FormFuzzError::InvalidVariantMode {
                mode: other.to_string(),
            }),
        }
    }
}

/// decode the integer `index` into one option index per matrix row
///
/// this is plain mixed-radix decomposition: digit `i`'s base is the product
/// of all bases after `i`, so iterating `index` from 0 upward walks the
/// cartesian product of the rows in row-major order. Inverse of
/// [`encode_path`]. Bases must all be >= 1.
#[must_use]
pub fn decode_path(index: u64, bases: &[usize]) -> Vec<usize> {
    let mut remainder = index;
    let mut decoded = Vec::with_capacity(bases.len());

    for position in 0..bases.len() {
        let digit_base: u64 = bases[position + 1..]
            .iter()
            .map(|len| *len as u64)
            .product();

        decoded.push((remainder / digit_base) as usize);
        remainder %= digit_base;
    }

    decoded
}

/// re-encode a per-row option-index path into its integer form
///
/// inverse of [`decode_path`]; exists mostly so the bijectivity of the codec
/// can be asserted directly
#[must_use]
pub fn encode_path(digits: &[usize], bases: &[usize]) -> u64 {
    let mut index = 0_u64;

    for (position, digit) in digits.iter().enumerate() {
        let digit_base: u64 = bases[position + 1..]
            .iter()
            .map(|len| *len as u64)
            .product();

        index += *digit as u64 * digit_base;
    }

    index
}

/// draw `count` distinct indices from `0..total` using a fixed-seed RNG
///
/// a pure function of its arguments: same inputs, same output, on every call
/// and every run. When `total` is not larger than `count`, every index is
/// returned in order
fn sample_indices(total: u64, count: usize, seed: u64) -> Vec<u64> {
    if total <= count as u64 {
        return (0..total).collect();
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut seen = HashSet::with_capacity(count);
    let mut sampled = Vec::with_capacity(count);

    while sampled.len() < count {
        let candidate = rng.gen_range(0..total);

        if seen.insert(candidate) {
            sampled.push(candidate);
        }
    }

    sampled
}

/// saturating product of the row lengths; empty rows count as one slot so a
/// malformed `<select>` with no options contributes a single empty-string
/// value instead of zeroing out the whole space
fn combination_count(bases: &[usize]) -> u64 {
    bases
        .iter()
        .fold(1_u64, |acc, len| acc.saturating_mul(*len as u64))
}

impl FormParameters {
    /// produce the sampled option combinations for this form
    ///
    /// element 0 is always an unmodified copy of the form itself; when the
    /// form has no select / radio / checkbox fields, it is the only element.
    /// Repeated calls produce identical output, including in the
    /// random-sampled regime, because the sampler seed is fixed
    ///
    /// # Examples
    ///
    /// ```
    /// # use formfuzz::fields::TagAttributes;
    /// # use formfuzz::form_params::FormParameters;
    /// # use formfuzz::variants::VariantMode;
    /// let mut form = FormParameters::new();
    /// form.add_field_by_attrs(
    ///     &TagAttributes::new()
    ///         .attr("name", "cars")
    ///         .attr("type", "select")
    ///         .option_values(["volvo", "saab", "fiat"]),
    /// );
    ///
    /// let variants = form.variants(VariantMode::All);
    ///
    /// // original + one variant per option
    /// assert_eq!(variants.len(), 4);
    /// assert_eq!(variants[0], form);
    /// assert_eq!(variants[2].values("cars").unwrap(), vec!["saab"]);
    /// ```
    #[instrument(skip(self), level = "debug")]
    #[must_use]
    pub fn variants(&self, mode: VariantMode) -> Vec<FormParameters> {
        let mut produced = vec![self.clone()];

        // one row per choice-field name, in form order
        let mut matrix: Vec<(String, Vec<String>)> = self
            .iter()
            .filter_map(|(name, fields)| {
                fields
                    .iter()
                    .find(|field| field.input_type().is_choice())
                    .map(|field| {
                        (
                            name.to_string(),
                            field.options().unwrap_or_default().to_vec(),
                        )
                    })
            })
            .collect();

        if matrix.is_empty() {
            return produced;
        }

        // compress rows to [first, middle, last] BEFORE counting, so the
        // combination count reflects what will actually be enumerated
        if mode == VariantMode::TopMiddleBottom {
            for (_, options) in &mut matrix {
                if options.len() > 3 {
                    *options = vec![
                        options[0].clone(),
                        options[options.len() / 2].clone(),
                        options[options.len() - 1].clone(),
                    ];
                }
            }
        }

        let bases: Vec<usize> = matrix
            .iter()
            .map(|(_, options)| options.len().max(1))
            .collect();

        for path in sample_paths(mode, &bases) {
            let mut variant = self.clone();

            for (row, column) in path.iter().enumerate() {
                let (name, options) = &matrix[row];

                // an option list that came up short substitutes an empty
                // string rather than dropping the parameter
                let value = options.get(*column).cloned().unwrap_or_default();

                variant.set_choice_values(name, &value);
            }

            produced.push(variant);
        }

        produced
    }

    /// overwrite the current value of every choice-type occurrence of `name`
    fn set_choice_values(&mut self, name: &str, value: &str) {
        let occurrence_count = self.fields(name).map_or(0, <[FormField]>::len);

        for index in 0..occurrence_count {
            if let Some(field) = self.field_mut(name, index) {
                if field.input_type().is_choice() {
                    field.set_value(value);
                }
            }
        }
    }
}

/// the option-index paths to materialize for `mode`
fn sample_paths(mode: VariantMode, bases: &[usize]) -> Vec<Vec<usize>> {
    match mode {
        VariantMode::Top => vec![vec![0; bases.len()]],
        VariantMode::Bottom => vec![bottom_path(bases)],
        VariantMode::TopBottom => vec![vec![0; bases.len()], bottom_path(bases)],
        VariantMode::All | VariantMode::TopMiddleBottom => {
            let total = combination_count(bases);

            if total > TOP_VARIANTS as u64 {
                debug!(
                    combinations = total,
                    sampled = TOP_VARIANTS,
                    "form spans too many option combinations; testing a \
                     fixed-seed random sample instead"
                );

                sample_indices(total.min(MAX_VARIANTS_TOTAL), TOP_VARIANTS, VARIANT_SEED)
                    .into_iter()
                    .map(|index| decode_path(index, bases))
                    .collect()
            } else {
                (0..total).map(|index| decode_path(index, bases)).collect()
            }
        }
    }
}

/// last-option index per row; rows that pretend to have one slot (empty
/// option lists) stay at index 0
fn bottom_path(bases: &[usize]) -> Vec<usize> {
    bases.iter().map(|len| len - 1).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::TagAttributes;

    fn select(name: &str, options: &[&str]) -> TagAttributes {
        TagAttributes::new()
            .attr("name", name)
            .attr("type", "select")
            .option_values(options.iter().copied())
    }

    fn radio_group(form: &mut FormParameters, name: &str, options: &[&str]) {
        for option in options {
            form.add_field_by_attrs(
                &TagAttributes::new()
                    .attr("name", name)
                    .attr("type", "radio")
                    .attr("value", option),
            );
        }
    }

    #[test]
    fn path_codec_is_bijective() {
        let bases = [2, 3, 2];
        let total: u64 = bases.iter().map(|b| *b as u64).product();

        for index in 0..total {
            let digits = decode_path(index, &bases);

            assert_eq!(digits.len(), bases.len());
            for (digit, base) in digits.iter().zip(bases.iter()) {
                assert!(digit < base);
            }

            assert_eq!(encode_path(&digits, &bases), index);
        }
    }

    #[test]
    fn form_without_choice_fields_yields_only_itself() {
        let mut form = FormParameters::new();
        form.add_field_by_attrs(&TagAttributes::new().attr("name", "q").attr("value", "x"));

        let variants = form.variants(VariantMode::All);

        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0], form);
    }

    #[test]
    fn first_variant_is_the_unmodified_form() {
        let mut form = FormParameters::new();
        form.add_field_by_attrs(&select("cars", &["volvo", "saab"]));

        let variants = form.variants(VariantMode::All);

        assert_eq!(variants[0], form);
    }

    #[test]
    fn tmb_compresses_long_rows_to_three_options() {
        let mut form = FormParameters::new();
        radio_group(&mut form, "sex", &["male", "female"]);
        form.add_field_by_attrs(&select("colors", &["black", "red"]));
        form.add_field_by_attrs(&select("letters", &["a", "b", "c", "d", "e", "f"]));

        let variants = form.variants(VariantMode::TopMiddleBottom);

        // 2 * 2 * 3 combinations plus the original
        assert_eq!(variants.len(), 13);

        for variant in &variants[1..] {
            let letter = variant.values("letters").unwrap()[0].to_string();
            assert!(["a", "d", "f"].contains(&letter.as_str()));
        }
    }

    #[test]
    fn all_mode_enumerates_every_combination_in_order() {
        let mut form = FormParameters::new();
        form.add_field_by_attrs(&select("cars", &["volvo", "saab", "jeep"]));

        let variants = form.variants(VariantMode::All);

        assert_eq!(variants.len(), 4);
        let picked: Vec<String> = variants[1..]
            .iter()
            .map(|v| v.values("cars").unwrap()[0].to_string())
            .collect();
        assert_eq!(picked, vec!["volvo", "saab", "jeep"]);
    }

    #[test]
    fn top_bottom_modes_pick_the_expected_options() {
        let mut form = FormParameters::new();
        form.add_field_by_attrs(&select("cars", &["volvo", "saab", "jeep"]));
        form.add_field_by_attrs(&select("colors", &["black", "red"]));

        let top = form.variants(VariantMode::Top);
        assert_eq!(top.len(), 2);
        assert_eq!(top[1].values("cars").unwrap(), vec!["volvo"]);
        assert_eq!(top[1].values("colors").unwrap(), vec!["black"]);

        let bottom = form.variants(VariantMode::Bottom);
        assert_eq!(bottom[1].values("cars").unwrap(), vec!["jeep"]);
        assert_eq!(bottom[1].values("colors").unwrap(), vec!["red"]);

        let both = form.variants(VariantMode::TopBottom);
        assert_eq!(both.len(), 3);
        assert_eq!(both[1].values("cars").unwrap(), vec!["volvo"]);
        assert_eq!(both[2].values("cars").unwrap(), vec!["jeep"]);
    }

    #[test]
    fn variant_generation_is_deterministic_below_the_cap() {
        let mut form = FormParameters::new();
        form.add_field_by_attrs(&select("a", &["1", "2", "3"]));
        form.add_field_by_attrs(&select("b", &["x", "y"]));

        assert_eq!(form.variants(VariantMode::All), form.variants(VariantMode::All));
    }

    #[test]
    fn sampling_above_the_cap_is_deterministic_and_bounded() {
        let mut form = FormParameters::new();
        form.add_field_by_attrs(&select("a", &["1", "2", "3", "4", "5"]));
        form.add_field_by_attrs(&select("b", &["1", "2", "3", "4", "5"]));

        // 25 combinations > TOP_VARIANTS
        let first = form.variants(VariantMode::All);
        let second = form.variants(VariantMode::All);

        assert_eq!(first.len(), TOP_VARIANTS + 1);
        assert_eq!(first, second);

        // every sampled variant is distinct
        let mut unique = first[1..].to_vec();
        unique.dedup();
        assert_eq!(unique.len(), TOP_VARIANTS);
    }

    #[test]
    fn variant_count_stays_below_the_bound() {
        let mut form = FormParameters::new();
        form.add_field_by_attrs(&select("a", &["1", "2", "3", "4"]));
        form.add_field_by_attrs(&select("b", &["1", "2", "3", "4", "5", "6", "7"]));

        let total = 4 * 7;
        let variants = form.variants(VariantMode::All);

        assert!(variants.len() - 1 <= total.min(TOP_VARIANTS));
    }

    #[test]
    fn empty_select_contributes_an_empty_string_value() {
        let mut form = FormParameters::new();
        form.add_field_by_attrs(&select("spam", &[]));
        radio_group(&mut form, "sex", &["male", "female"]);

        let variants = form.variants(VariantMode::All);

        // 1 (empty slot) * 2 options, plus the original
        assert_eq!(variants.len(), 3);
        for variant in &variants[1..] {
            assert_eq!(variant.values("spam").unwrap(), vec![""]);
        }
    }

    #[test]
    fn sample_indices_is_a_pure_function_of_its_inputs() {
        let first = sample_indices(1_000, 10, 42);
        let second = sample_indices(1_000, 10, 42);
        let different_seed = sample_indices(1_000, 10, 43);

        assert_eq!(first, second);
        assert_ne!(first, different_seed);
        assert_eq!(first.len(), 10);
    }
}
