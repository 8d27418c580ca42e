use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

/// Food category assigned from the food name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Meat,
    Fish,
    Dairy,
    Vegetable,
    Fruit,
    Starch,
    #[serde(rename = "bread/cereal")]
    BreadCereal,
    #[serde(rename = "fat/oil")]
    FatOil,
    Sweet,
    Drink,
    Sauce,
    Unknown,
}

impl Category {
    pub const ALL: [Category; 12] = [
        Category::Meat,
        Category::Fish,
        Category::Dairy,
        Category::Vegetable,
        Category::Fruit,
        Category::Starch,
        Category::BreadCereal,
        Category::FatOil,
        Category::Sweet,
        Category::Drink,
        Category::Sauce,
        Category::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Meat => "meat",
            Category::Fish => "fish",
            Category::Dairy => "dairy",
            Category::Vegetable => "vegetable",
            Category::Fruit => "fruit",
            Category::Starch => "starch",
            Category::BreadCereal => "bread/cereal",
            Category::FatOil => "fat/oil",
            Category::Sweet => "sweet",
            Category::Drink => "drink",
            Category::Sauce => "sauce",
            Category::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Option<Category> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

lazy_static! {
    // Order matters: the first matching rule wins.
    static ref RULES: Vec<(Category, Regex)> = vec![
        (Category::Meat, r"chicken|beef|pork|turkey|\bham\b|meat|steak|bacon|sausage|lamb|veal"),
        (Category::Fish, r"fish|salmon|tuna|\bcod\b|trout|shrimp|prawn|sardine"),
        (Category::Dairy, r"milk|yogurt|yoghurt|cheese|cream|kefir|quark"),
        (Category::Fruit, r"apple|banana|orange|berry|grape|melon|peach|pear|fruit"),
        (Category::Starch, r"potato|rice|pasta|flour|noodle|starch|fries"),
        (Category::BreadCereal, r"bread|cereal|baguette|toast|croissant|\boat|muesli|granola"),
        (Category::FatOil, r"oil|\bfat\b|lard|butter|margarine|ghee"),
        (Category::Sweet, r"cake|cookie|sugar|sweet|dessert|chocolate|candy"),
        (Category::Drink, r"juice|cola|soda|water|\btea\b|coffee|drink|beer|wine"),
        (Category::Sauce, r"ketchup|mayo|sauce|dressing|mustard"),
        (Category::Vegetable, r"vegetable|carrot|tomato|broccoli|onion|pepper|spinach|lettuce|cucumber|cabbage"),
    ]
    .into_iter()
    .map(|(category, pattern)| (category, Regex::new(pattern).unwrap()))
    .collect();
}

/// Maps a free-text food name to a category; no match gives [`Category::Unknown`].
pub fn classify(name: &str) -> Category {
    let name = name.trim().to_lowercase();
    if name.is_empty() {
        return Category::Unknown;
    }
    RULES
        .iter()
        .find(|(_, re)| re.is_match(&name))
        .map(|(category, _)| *category)
        .unwrap_or(Category::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_common_foods() {
        assert_eq!(classify("Grilled chicken breast"), Category::Meat);
        assert_eq!(classify("Smoked SALMON"), Category::Fish);
        assert_eq!(classify("Greek yogurt"), Category::Dairy);
        assert_eq!(classify("Olive oil"), Category::FatOil);
        assert_eq!(classify("Strawberry"), Category::Fruit);
        assert_eq!(classify("Boiled potatoes"), Category::Starch);
        assert_eq!(classify("Wholegrain bread"), Category::BreadCereal);
        assert_eq!(classify("Dark chocolate"), Category::Sweet);
        assert_eq!(classify("Orange juice"), Category::Fruit);
        assert_eq!(classify("Green tea"), Category::Drink);
        assert_eq!(classify("Tomato ketchup"), Category::Sauce);
        assert_eq!(classify("Mustard"), Category::Sauce);
        assert_eq!(classify("Steamed broccoli"), Category::Vegetable);
    }

    #[test]
    fn earlier_rules_take_precedence() {
        // meat is checked before sweet
        assert_eq!(classify("sweet and sour pork"), Category::Meat);
        // dairy is checked before fat/oil
        assert_eq!(classify("buttermilk"), Category::Dairy);
        assert_eq!(classify("peanut butter"), Category::FatOil);
    }

    #[test]
    fn word_boundaries_avoid_false_hits() {
        assert_eq!(classify("champagne"), Category::Unknown);
        assert_eq!(classify("steak"), Category::Meat);
        assert_eq!(classify("ham sandwich"), Category::Meat);
    }

    #[test]
    fn empty_or_unmatched_names_are_unknown() {
        assert_eq!(classify(""), Category::Unknown);
        assert_eq!(classify("   "), Category::Unknown);
        assert_eq!(classify("quinoa-spirulina pellet"), Category::Unknown);
    }

    #[test]
    fn classification_is_case_insensitive_and_stable() {
        let a = classify("Beef Burger");
        let b = classify("beef burger");
        assert_eq!(a, b);
        assert_eq!(a, classify("Beef Burger"));
    }

    #[test]
    fn labels_round_trip() {
        for c in Category::ALL {
            assert_eq!(Category::parse(c.as_str()), Some(c));
            let json = serde_json::to_value(c).unwrap();
            assert_eq!(json, serde_json::json!(c.as_str()));
        }
    }
}
