//! Shopping-list extraction from generated plan markdown

use regex::{Regex, RegexBuilder};
use tracing::debug;

use super::{ParserError, UnitSet};
use crate::config::ParserConfig;
use crate::domain::ShoppingListEntry;

/// Currency markers recognized before or after a price
const BUILTIN_CURRENCY_MARKERS: &[&str] = &["kr.", "kr", "dkk", "sek", "nok", "eur", "usd", "€", "$", "£"];

/// Extracts shopping-list entries from plan text
///
/// Never fails on input: unrecognized lines are skipped and the result may be empty. Holds no state
/// between calls, so parsing the same text always yields the same entries.
#[derive(Debug, Clone)]
pub struct PlanParser {
    quantity_re: Regex,
    price_re: Regex,
    bold_header_re: Regex,
    numbered_re: Regex,
}

impl PlanParser {
    /// Parser with the built-in units and currency markers
    pub fn new() -> Result<Self, ParserError> {
        Self::from_config(&ParserConfig::default())
    }

    pub fn from_config(config: &ParserConfig) -> Result<Self, ParserError> {
        let units = UnitSet::new(&config.extra_units);
        Self::with_units(&units, &config.currency_markers)
    }

    pub fn with_units(units: &UnitSet, extra_markers: &[String]) -> Result<Self, ParserError> {
        debug!(extra_markers = ?extra_markers, "PlanParser::with_units: called");
        let markers = currency_pattern(extra_markers);

        // A unit ends at a word boundary or whitespace; units like "fl." end in punctuation
        let quantity_re = RegexBuilder::new(&format!(
            r"^(?P<qty>\d+(?:[.,]\d+)?(?:\s*-\s*\d+(?:[.,]\d+)?)?)\s*(?:(?P<unit>{})(?:\b|\s+))?\s*(?P<rest>\S.*)$",
            units.pattern()
        ))
        .case_insensitive(true)
        .build()?;

        let price_re = RegexBuilder::new(&format!(
            r"\(\s*(?:~|ca\.?|approx\.?)?\s*(?:(?P<pre>{m})\s*)?(?P<num>\d+(?:[.,]\d+)*)\s*(?P<post>{m}|,-)?\s*\)\s*$",
            m = markers
        ))
        .case_insensitive(true)
        .build()?;

        let bold_header_re = Regex::new(r"^\*\*\s*(?P<name>[^*]+?)\s*:?\s*\*\*\s*:?$")?;
        let numbered_re = Regex::new(r"^\d+[.)]\s+")?;

        Ok(Self {
            quantity_re,
            price_re,
            bold_header_re,
            numbered_re,
        })
    }

    /// Parse plan text into shopping-list entries, in document order
    pub fn parse(&self, text: &str) -> Vec<ShoppingListEntry> {
        let (scope, in_section) = shopping_list_scope(text);
        debug!(text_len = %text.len(), %in_section, "parse: called");

        let mut category: Option<String> = None;
        let mut entries = Vec::new();

        for raw in scope {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(header) = markdown_header(line) {
                // Outside a shopping-list section, top-level headers end the current category
                category = match header {
                    (level, name) if level >= 3 && !name.is_empty() => Some(name),
                    _ => None,
                };
                continue;
            }

            if let Some(caps) = self.bold_header_re.captures(line) {
                category = Some(caps["name"].trim().to_string());
                continue;
            }

            let Some(item) = self.strip_bullet(line) else {
                continue;
            };

            if let Some(mut entry) = self.parse_item(item) {
                entry.category = category.clone();
                entries.push(entry);
            }
        }

        debug!(entries = %entries.len(), "parse: done");
        entries
    }

    /// Item text after the bullet and checkbox, or None for non-item lines
    fn strip_bullet<'a>(&self, line: &'a str) -> Option<&'a str> {
        let rest = if let Some(m) = self.numbered_re.find(line) {
            &line[m.end()..]
        } else {
            let mut chars = line.chars();
            let bullet = chars.next()?;
            if !matches!(bullet, '-' | '*' | '•' | '+') {
                return None;
            }
            let rest = chars.as_str();
            if !rest.starts_with(char::is_whitespace) {
                return None;
            }
            rest
        };

        let rest = rest.trim_start();
        let rest = ["[ ]", "[x]", "[X]"]
            .iter()
            .find_map(|marker| rest.strip_prefix(marker))
            .unwrap_or(rest);

        Some(rest.trim())
    }

    fn parse_item(&self, item: &str) -> Option<ShoppingListEntry> {
        let (body, price_estimate) = match self.price_re.captures(item) {
            Some(caps) if caps.name("pre").is_some() || caps.name("post").is_some() => {
                let start = caps.get(0).map(|m| m.start()).unwrap_or(item.len());
                (item[..start].trim_end(), parse_decimal(&caps["num"]))
            }
            _ => (item, None),
        };

        let (quantity, unit, name) = match self.quantity_re.captures(body) {
            Some(caps) => (
                Some(caps["qty"].replace(',', ".").replace(' ', "")),
                caps.name("unit").map(|u| u.as_str().to_lowercase()),
                caps["rest"].to_string(),
            ),
            None => (None, None, body.to_string()),
        };

        let name = clean_name(&name);
        if name.is_empty() {
            return None;
        }

        Some(ShoppingListEntry {
            name,
            quantity,
            unit,
            category: None,
            price_estimate,
        })
    }
}

/// Lines of the `## Shopping List` section, or every line when there is none
fn shopping_list_scope(text: &str) -> (Vec<&str>, bool) {
    let lines: Vec<&str> = text.lines().collect();

    let start = lines.iter().position(|line| {
        matches!(markdown_header(line.trim()), Some((level, name)) if level <= 2 && name.to_lowercase().starts_with("shopping list"))
    });

    match start {
        Some(start) => {
            let body = &lines[start + 1..];
            let end = body
                .iter()
                .position(|line| matches!(markdown_header(line.trim()), Some((level, _)) if level <= 2))
                .unwrap_or(body.len());
            (body[..end].to_vec(), true)
        }
        None => (lines, false),
    }
}

/// `(level, title)` for an ATX header line
fn markdown_header(line: &str) -> Option<(usize, String)> {
    let level = line.chars().take_while(|c| *c == '#').count();
    if level == 0 {
        return None;
    }
    let rest = &line[level..];
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let title = rest.trim().trim_matches(['*', '_', ':']).trim().to_string();
    Some((level, title))
}

fn clean_name(name: &str) -> String {
    name.trim().trim_end_matches(':').trim_matches(['*', '_']).trim().to_string()
}

fn currency_pattern(extra: &[String]) -> String {
    let mut markers: Vec<String> = BUILTIN_CURRENCY_MARKERS.iter().map(|m| m.to_string()).collect();
    for marker in extra {
        let marker = marker.trim().to_lowercase();
        if !marker.is_empty() && !markers.contains(&marker) {
            markers.push(marker);
        }
    }
    markers.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    markers.iter().map(|m| regex::escape(m)).collect::<Vec<_>>().join("|")
}

/// Parse `19,95`, `19.95`, `1.234,50` or `1,234.50` as a number
fn parse_decimal(raw: &str) -> Option<f64> {
    let normalized = match raw.rfind([',', '.']) {
        Some(i) if raw.len() - i - 1 <= 2 => {
            let (int, frac) = raw.split_at(i);
            format!("{}.{}", int.replace([',', '.'], ""), &frac[1..])
        }
        _ => raw.replace([',', '.'], ""),
    };
    normalized.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> PlanParser {
        PlanParser::new().unwrap()
    }

    const PLAN: &str = r#"## Meal Plan
Day 1: Chicken tacos
- Quick weeknight tacos
Day 2: Tomato soup

## Shopping List

### Produce
- 1 kg Tomatoes (19,95 kr)
- 2 Onions
- 1 head Lettuce (12,95 kr)

### Dairy
- 2L Milk (14,95 kr)
- 500g Yogurt

**Meat & Fish:**
* [ ] 800g Chicken breast (59,95 kr)
1. 500 g Ground beef (kr 45,00)

## Ingredient Reuse Notes
- Tomatoes are used twice
"#;

    fn entry(name: &str, qty: Option<&str>, unit: Option<&str>, cat: &str, price: Option<f64>) -> ShoppingListEntry {
        ShoppingListEntry {
            name: name.to_string(),
            quantity: qty.map(str::to_string),
            unit: unit.map(str::to_string),
            category: Some(cat.to_string()),
            price_estimate: price,
        }
    }

    #[test]
    fn test_reference_plan() {
        let entries = parser().parse(PLAN);

        assert_eq!(
            entries,
            vec![
                entry("Tomatoes", Some("1"), Some("kg"), "Produce", Some(19.95)),
                entry("Onions", Some("2"), None, "Produce", None),
                entry("Lettuce", Some("1"), Some("head"), "Produce", Some(12.95)),
                entry("Milk", Some("2"), Some("l"), "Dairy", Some(14.95)),
                entry("Yogurt", Some("500"), Some("g"), "Dairy", None),
                entry("Chicken breast", Some("800"), Some("g"), "Meat & Fish", Some(59.95)),
                entry("Ground beef", Some("500"), Some("g"), "Meat & Fish", Some(45.0)),
            ]
        );
    }

    #[test]
    fn test_single_line_example() {
        let entries = parser().parse("- 1 kg Tomatoes (19,95 kr)");

        assert_eq!(entries.len(), 1);
        let e = &entries[0];
        assert_eq!(e.name, "Tomatoes");
        assert_eq!(e.quantity.as_deref(), Some("1"));
        assert_eq!(e.unit.as_deref(), Some("kg"));
        assert_eq!(e.price_estimate, Some(19.95));
        assert_eq!(e.category, None);
    }

    #[test]
    fn test_no_quantity() {
        let entries = parser().parse("- Fresh basil");
        assert_eq!(entries[0].name, "Fresh basil");
        assert_eq!(entries[0].quantity, None);
        assert_eq!(entries[0].unit, None);
    }

    #[test]
    fn test_price_formats() {
        let p = parser();
        let prices: Vec<Option<f64>> = [
            "- Cheese (19.95 kr)",
            "- Cheese (DKK 19.95)",
            "- Cheese (€3.50)",
            "- Cheese ($3.50)",
            "- Cheese (~25 kr)",
            "- Cheese (2 pcs)",
        ]
        .iter()
        .map(|line| p.parse(line)[0].price_estimate)
        .collect();

        assert_eq!(prices, vec![Some(19.95), Some(19.95), Some(3.5), Some(3.5), Some(25.0), None]);
        // Not a price: the parenthetical stays in the name
        assert_eq!(p.parse("- Cheese (2 pcs)")[0].name, "Cheese (2 pcs)");
    }

    #[test]
    fn test_decimal_quantities_and_glued_units() {
        let entries = parser().parse("- 1,5 kg Potatoes\n- 2 cans Chopped tomatoes\n- 3 Garlic cloves");

        assert_eq!(entries[0].quantity.as_deref(), Some("1.5"));
        assert_eq!(entries[0].unit.as_deref(), Some("kg"));
        assert_eq!(entries[1].unit.as_deref(), Some("cans"));
        assert_eq!(entries[1].name, "Chopped tomatoes");
        // "g" must not be read as a unit at the start of "Garlic"
        assert_eq!(entries[2].unit, None);
        assert_eq!(entries[2].name, "Garlic cloves");
    }

    #[test]
    fn test_extra_units_from_config() {
        let config = ParserConfig {
            extra_units: vec!["handful".to_string()],
            currency_markers: vec!["sek.".to_string()],
        };
        let p = PlanParser::from_config(&config).unwrap();
        let entries = p.parse("- 1 handful Parsley (9 sek.)");

        assert_eq!(entries[0].unit.as_deref(), Some("handful"));
        assert_eq!(entries[0].name, "Parsley");
        assert_eq!(entries[0].price_estimate, Some(9.0));
    }

    #[test]
    fn test_extra_unit_ending_in_punctuation() {
        let config = ParserConfig {
            extra_units: vec!["fl.".to_string()],
            ..ParserConfig::default()
        };
        let p = PlanParser::from_config(&config).unwrap();
        let entries = p.parse("- 2 fl. Oz water\n- 2 flour tortillas\n- 500g Rice");

        assert_eq!(entries[0].quantity.as_deref(), Some("2"));
        assert_eq!(entries[0].unit.as_deref(), Some("fl."));
        assert_eq!(entries[0].name, "Oz water");
        assert_eq!(entries[1].unit, None);
        assert_eq!(entries[1].name, "flour tortillas");
        assert_eq!(entries[2].unit.as_deref(), Some("g"));
        assert_eq!(entries[2].name, "Rice");
    }

    #[test]
    fn test_whole_text_without_section() {
        let entries = parser().parse("Buy these:\n- 2 Lemons\nsome prose\n- Salt");
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Lemons", "Salt"]);
    }

    #[test]
    fn test_garbage_yields_empty() {
        assert!(parser().parse("").is_empty());
        assert!(parser().parse("I'm sorry, I can't help with that.").is_empty());
        assert!(parser().parse("## Shopping List\n\n## Notes\n- 2 Eggs").is_empty());
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("19,95"), Some(19.95));
        assert_eq!(parse_decimal("19.95"), Some(19.95));
        assert_eq!(parse_decimal("1.234,50"), Some(1234.5));
        assert_eq!(parse_decimal("1,234"), Some(1234.0));
        assert_eq!(parse_decimal("20"), Some(20.0));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn parse_is_idempotent(text in "(?s).{0,400}") {
                let p = parser();
                let first = serde_json::to_string(&p.parse(&text)).unwrap();
                let second = serde_json::to_string(&p.parse(&text)).unwrap();
                prop_assert_eq!(first, second);
            }

            #[test]
            fn parse_is_idempotent_on_list_like_text(
                lines in proptest::collection::vec("(- |\\* |### )?[0-9]{0,3}(kg|g| )?[A-Za-z ]{0,12}( \\([0-9]{1,3},[0-9]{2} kr\\))?", 0..20)
            ) {
                let text = lines.join("\n");
                let p = parser();
                prop_assert_eq!(p.parse(&text), p.parse(&text));
            }
        }
    }
}
