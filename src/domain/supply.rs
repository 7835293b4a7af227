//! Printer consumable counters.

use serde::{Deserialize, Serialize};

use super::string_enum;

/// One of the five consumable counters kept on the supply inventory row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupplyCounter {
    ImagingUnits,
    BlackToner,
    CyanToner,
    MagentaToner,
    YellowToner,
}

string_enum!(SupplyCounter, "supply counter", {
    ImagingUnits => "imaging_units",
    BlackToner => "black_toner",
    CyanToner => "cyan_toner",
    MagentaToner => "magenta_toner",
    YellowToner => "yellow_toner",
});

/// An amount for each counter. Used for stock levels, restock deltas and
/// consumption requests alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SupplyCounts {
    pub imaging_units: i32,
    pub black_toner: i32,
    pub cyan_toner: i32,
    pub magenta_toner: i32,
    pub yellow_toner: i32,
}

impl SupplyCounts {
    #[must_use]
    pub const fn get(&self, counter: SupplyCounter) -> i32 {
        match counter {
            SupplyCounter::ImagingUnits => self.imaging_units,
            SupplyCounter::BlackToner => self.black_toner,
            SupplyCounter::CyanToner => self.cyan_toner,
            SupplyCounter::MagentaToner => self.magenta_toner,
            SupplyCounter::YellowToner => self.yellow_toner,
        }
    }

    /// Counter/amount pairs in a fixed order.
    pub fn iter(&self) -> impl Iterator<Item = (SupplyCounter, i32)> + '_ {
        SupplyCounter::ALL.iter().map(|c| (*c, self.get(*c)))
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.iter().all(|(_, n)| n == 0)
    }

    /// First counter holding a negative amount, if any.
    #[must_use]
    pub fn first_negative(&self) -> Option<SupplyCounter> {
        self.iter().find(|(_, n)| *n < 0).map(|(c, _)| c)
    }

    /// First counter where `self` cannot cover `requested`, with the
    /// requested and available amounts.
    #[must_use]
    pub fn first_shortfall(&self, requested: &Self) -> Option<(SupplyCounter, i32, i32)> {
        requested
            .iter()
            .find(|(c, n)| *n > self.get(*c))
            .map(|(c, n)| (c, n, self.get(c)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(values: [i32; 5]) -> SupplyCounts {
        SupplyCounts {
            imaging_units: values[0],
            black_toner: values[1],
            cyan_toner: values[2],
            magenta_toner: values[3],
            yellow_toner: values[4],
        }
    }

    #[test]
    fn shortfall_names_the_first_short_counter() {
        let stock = counts([2, 5, 0, 1, 1]);
        assert_eq!(stock.first_shortfall(&counts([1, 5, 0, 0, 0])), None);
        assert_eq!(
            stock.first_shortfall(&counts([0, 1, 1, 0, 0])),
            Some((SupplyCounter::CyanToner, 1, 0))
        );
    }

    #[test]
    fn negative_amounts_are_detected() {
        assert_eq!(counts([0, 0, 0, 0, 0]).first_negative(), None);
        assert_eq!(
            counts([1, 0, 0, -2, 0]).first_negative(),
            Some(SupplyCounter::MagentaToner)
        );
    }

    #[test]
    fn missing_fields_default_to_zero() {
        let parsed: SupplyCounts = serde_json::from_str(r#"{"black_toner": 3}"#).unwrap();
        assert_eq!(parsed.black_toner, 3);
        assert_eq!(parsed.yellow_toner, 0);
        assert!(!parsed.is_zero());
        assert!(SupplyCounts::default().is_zero());
    }
}
