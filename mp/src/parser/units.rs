//! Units recognized after a leading quantity

/// Built-in units, matched case-insensitively as whole words
const BUILTIN_UNITS: &[&str] = &[
    "kg", "g", "mg", "l", "dl", "cl", "ml", "lb", "lbs", "oz", "stk", "pcs", "pc", "piece", "pieces", "can", "cans",
    "pack", "packs", "pkg", "bag", "bags", "jar", "jars", "bottle", "bottles", "box", "boxes", "bunch", "bunches",
    "head", "heads", "clove", "cloves", "slice", "slices", "tbsp", "tsp", "cup", "cups", "bakke", "pose",
];

/// Case-insensitive unit vocabulary: the built-in set plus configured extras
#[derive(Debug, Clone)]
pub struct UnitSet {
    units: Vec<String>,
}

impl Default for UnitSet {
    fn default() -> Self {
        Self::new(std::iter::empty::<String>())
    }
}

impl UnitSet {
    pub fn new<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut units: Vec<String> = BUILTIN_UNITS.iter().map(|u| u.to_string()).collect();
        for unit in extra {
            let unit = unit.as_ref().trim().to_lowercase();
            if !unit.is_empty() && !units.contains(&unit) {
                units.push(unit);
            }
        }
        // Longest first so the alternation prefers "cans" over "can"
        units.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        Self { units }
    }

    pub fn contains(&self, unit: &str) -> bool {
        let unit = unit.to_lowercase();
        self.units.iter().any(|u| *u == unit)
    }

    /// Regex alternation matching any unit
    pub fn pattern(&self) -> String {
        self.units.iter().map(|u| regex::escape(u)).collect::<Vec<_>>().join("|")
    }
}
