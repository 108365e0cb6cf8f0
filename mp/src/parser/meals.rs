//! `Day N: name` meal extraction

use crate::domain::PlannedMeal;

/// Extract the planned meals from plan text
///
/// Recognizes lines like `Day 1: Tacos`, `**Day 2: Soup**` or `### Day 3 - Curry`. The first line
/// for each day wins, so a later shopping list mentioning a day does not override the plan.
pub fn extract_meals(text: &str) -> Vec<PlannedMeal> {
    let mut meals: Vec<PlannedMeal> = Vec::new();

    for line in text.lines() {
        let Some(meal) = parse_day_line(line) else {
            continue;
        };
        if !meals.iter().any(|m| m.day == meal.day) {
            meals.push(meal);
        }
    }

    meals
}

fn parse_day_line(line: &str) -> Option<PlannedMeal> {
    let cleaned = strip_list_number(line.trim()).trim_start_matches(['#', '-', '*', '•', '+', '_', ' ']);
    let rest = strip_prefix_ignore_case(cleaned, "day")?;
    let rest = rest.trim_start();

    let digits_end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    if digits_end == 0 {
        return None;
    }
    let day: u32 = rest[..digits_end].parse().ok()?;

    let rest = rest[digits_end..].trim_start().trim_start_matches(['*', '_']);
    let rest = rest
        .strip_prefix(':')
        .or_else(|| rest.strip_prefix('-'))
        .or_else(|| rest.strip_prefix('–'))?;

    let name = rest.trim().trim_matches(['*', '_']).trim();
    if name.is_empty() {
        return None;
    }

    Some(PlannedMeal {
        day,
        name: name.to_string(),
    })
}

/// Drop a leading `1.` or `1)` list marker
fn strip_list_number(line: &str) -> &str {
    let digits_end = line.find(|c: char| !c.is_ascii_digit()).unwrap_or(line.len());
    if digits_end == 0 {
        return line;
    }
    match line[digits_end..].strip_prefix(['.', ')']) {
        Some(rest) if rest.starts_with(' ') => rest,
        _ => line,
    }
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}
