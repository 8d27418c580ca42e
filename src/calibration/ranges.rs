use super::category::Category;
use crate::nutrients::{Band, Nutrient};

/// Expected per-100 g macro ranges for one food category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryRanges {
    pub kcal: Band,
    pub protein: Band,
    pub fat: Band,
    pub carbs: Band,
}

impl CategoryRanges {
    const fn new(kcal: (f64, f64), protein: (f64, f64), fat: (f64, f64), carbs: (f64, f64)) -> Self {
        Self {
            kcal: Band::new(kcal.0, kcal.1),
            protein: Band::new(protein.0, protein.1),
            fat: Band::new(fat.0, fat.1),
            carbs: Band::new(carbs.0, carbs.1),
        }
    }

    /// Range for a macro field; micronutrients have none.
    pub fn get(&self, n: Nutrient) -> Option<Band> {
        match n {
            Nutrient::Kcal => Some(self.kcal),
            Nutrient::Protein => Some(self.protein),
            Nutrient::Fat => Some(self.fat),
            Nutrient::Carbs => Some(self.carbs),
            _ => None,
        }
    }
}

const MEAT: CategoryRanges = CategoryRanges::new((100.0, 280.0), (18.0, 30.0), (2.0, 20.0), (0.0, 5.0));
const FISH: CategoryRanges = CategoryRanges::new((70.0, 220.0), (16.0, 26.0), (1.0, 10.0), (0.0, 2.0));
const DAIRY: CategoryRanges = CategoryRanges::new((40.0, 120.0), (3.0, 9.0), (1.0, 7.0), (3.0, 10.0));
const VEGETABLE: CategoryRanges = CategoryRanges::new((15.0, 90.0), (1.0, 4.0), (0.0, 2.0), (3.0, 10.0));
const FRUIT: CategoryRanges = CategoryRanges::new((30.0, 90.0), (0.5, 2.0), (0.0, 1.0), (8.0, 20.0));
const STARCH: CategoryRanges = CategoryRanges::new((100.0, 350.0), (2.0, 10.0), (0.0, 5.0), (15.0, 60.0));
const BREAD_CEREAL: CategoryRanges = CategoryRanges::new((200.0, 450.0), (6.0, 15.0), (1.0, 8.0), (30.0, 70.0));
const FAT_OIL: CategoryRanges = CategoryRanges::new((700.0, 900.0), (0.0, 0.0), (70.0, 100.0), (0.0, 0.0));
const SWEET: CategoryRanges = CategoryRanges::new((300.0, 550.0), (1.0, 4.0), (5.0, 25.0), (50.0, 80.0));
const DRINK: CategoryRanges = CategoryRanges::new((0.0, 80.0), (0.0, 2.0), (0.0, 2.0), (1.0, 10.0));
const SAUCE: CategoryRanges = CategoryRanges::new((50.0, 200.0), (1.0, 5.0), (1.0, 15.0), (2.0, 20.0));

/// Range table lookup; `Unknown` has no ranges.
pub fn for_category(category: Category) -> Option<&'static CategoryRanges> {
    match category {
        Category::Meat => Some(&MEAT),
        Category::Fish => Some(&FISH),
        Category::Dairy => Some(&DAIRY),
        Category::Vegetable => Some(&VEGETABLE),
        Category::Fruit => Some(&FRUIT),
        Category::Starch => Some(&STARCH),
        Category::BreadCereal => Some(&BREAD_CEREAL),
        Category::FatOil => Some(&FAT_OIL),
        Category::Sweet => Some(&SWEET),
        Category::Drink => Some(&DRINK),
        Category::Sauce => Some(&SAUCE),
        Category::Unknown => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_known_category_has_ordered_ranges() {
        for c in Category::ALL {
            let Some(r) = for_category(c) else {
                assert_eq!(c, Category::Unknown);
                continue;
            };
            for n in Nutrient::MACROS {
                let band = r.get(n).expect("macro range");
                assert!(band.min >= 0.0 && band.min <= band.max, "{} {}", c, n.column());
            }
        }
    }

    #[test]
    fn micronutrients_have_no_category_range() {
        let r = for_category(Category::Meat).unwrap();
        assert_eq!(r.get(Nutrient::Iron), None);
        assert_eq!(r.get(Nutrient::Kcal), Some(Band::new(100.0, 280.0)));
    }
}
