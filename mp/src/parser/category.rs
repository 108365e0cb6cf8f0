//! Keyword categorizer for shopping-list entries

/// Category assigned when no keyword matches
pub const OTHER: &str = "Other";

/// Checked in order; the first category with a matching keyword wins
const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    ("Frozen", &["frozen", "ice cream", "frossen", "frost"]),
    (
        "Produce",
        &[
            "tomato", "lettuce", "onion", "garlic", "potato", "carrot", "pepper", "cucumber", "apple", "banana",
            "orange", "lemon", "lime", "spinach", "broccoli", "cauliflower", "cabbage", "celery", "mushroom", "fruit",
            "vegetable", "salad", "avocado", "grape", "berry", "berries", "melon", "leek", "zucchini", "herb",
        ],
    ),
    (
        "Dairy",
        &[
            "milk", "cheese", "yogurt", "yoghurt", "butter", "cream", "egg", "mælk", "ost", "smør", "fløde", "æg",
        ],
    ),
    (
        "Meat & Fish",
        &[
            "chicken", "beef", "pork", "fish", "salmon", "sausage", "bacon", "meat", "turkey", "lamb", "tuna", "cod",
            "shrimp", "mince", "steak", "kylling", "oksekød", "svinekød", "fisk", "laks", "pølse", "kød",
        ],
    ),
    (
        "Pantry",
        &[
            "pasta", "spaghetti", "noodle", "rice", "flour", "sugar", "oil", "spice", "sauce", "canned", "salt",
            "vinegar", "stock", "bouillon", "beans", "lentils", "ris", "mel", "sukker", "olie", "krydderi", "dåse",
        ],
    ),
    (
        "Bakery",
        &[
            "bread", "bun", "roll", "tortilla", "bagel", "croissant", "pita", "brød", "bolle", "rundstykke",
        ],
    ),
    (
        "Beverages",
        &[
            "juice", "soda", "coffee", "tea", "water", "beer", "wine", "kaffe", "te", "vand", "øl", "vin",
        ],
    ),
];

/// Categorize an item by keyword
///
/// Single-word keywords match the start of any word in the name, so "tomatoes" hits "tomato"
/// while "te" does not hit "potatoes". Multi-word keywords match anywhere.
pub fn categorize_item(name: &str) -> &'static str {
    let lower = name.to_lowercase();
    let words: Vec<&str> = lower.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()).collect();

    for (category, keywords) in CATEGORY_KEYWORDS {
        let hit = keywords.iter().any(|kw| {
            if kw.contains(' ') {
                lower.contains(kw)
            } else {
                words.iter().any(|w| w.starts_with(kw))
            }
        });
        if hit {
            return category;
        }
    }

    OTHER
}
