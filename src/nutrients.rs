use serde::ser::{Serialize, SerializeMap, Serializer};

/// Unit a nutrient column is stored in, always per 100 g of food.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Kcal,
    Gram,
    Milligram,
    Microgram,
}

impl Unit {
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Kcal => "kcal",
            Unit::Gram => "g",
            Unit::Milligram => "mg",
            Unit::Microgram => "µg",
        }
    }
}

/// Inclusive `[min, max]` interval of plausible values per 100 g.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub min: f64,
    pub max: f64,
}

impl Band {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }
}

/// Every nutrient column of the `foods` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Nutrient {
    Kcal,
    Protein,
    Carbs,
    Fat,
    Fiber,
    Sugar,
    Sodium,
    VitaminA,
    VitaminC,
    VitaminD,
    VitaminE,
    VitaminK,
    Calcium,
    Iron,
    Magnesium,
    Phosphorus,
    Potassium,
    Zinc,
    Copper,
    Manganese,
    Selenium,
    Iodine,
    Chromium,
    Molybdenum,
    Omega3,
    Omega6,
    MonounsaturatedFat,
    PolyunsaturatedFat,
    TransFat,
    Cholesterol,
    Water,
    ThiaminB1,
    RiboflavinB2,
    NiacinB3,
    PantothenicB5,
    BiotinB7,
    FolateB9,
    VitaminB6,
    VitaminB12,
    Choline,
    Alcohol,
    Caffeine,
}

impl Nutrient {
    pub const COUNT: usize = 42;

    pub const ALL: [Nutrient; Nutrient::COUNT] = [
        Nutrient::Kcal,
        Nutrient::Protein,
        Nutrient::Carbs,
        Nutrient::Fat,
        Nutrient::Fiber,
        Nutrient::Sugar,
        Nutrient::Sodium,
        Nutrient::VitaminA,
        Nutrient::VitaminC,
        Nutrient::VitaminD,
        Nutrient::VitaminE,
        Nutrient::VitaminK,
        Nutrient::Calcium,
        Nutrient::Iron,
        Nutrient::Magnesium,
        Nutrient::Phosphorus,
        Nutrient::Potassium,
        Nutrient::Zinc,
        Nutrient::Copper,
        Nutrient::Manganese,
        Nutrient::Selenium,
        Nutrient::Iodine,
        Nutrient::Chromium,
        Nutrient::Molybdenum,
        Nutrient::Omega3,
        Nutrient::Omega6,
        Nutrient::MonounsaturatedFat,
        Nutrient::PolyunsaturatedFat,
        Nutrient::TransFat,
        Nutrient::Cholesterol,
        Nutrient::Water,
        Nutrient::ThiaminB1,
        Nutrient::RiboflavinB2,
        Nutrient::NiacinB3,
        Nutrient::PantothenicB5,
        Nutrient::BiotinB7,
        Nutrient::FolateB9,
        Nutrient::VitaminB6,
        Nutrient::VitaminB12,
        Nutrient::Choline,
        Nutrient::Alcohol,
        Nutrient::Caffeine,
    ];

    pub const MACROS: [Nutrient; 4] = [
        Nutrient::Kcal,
        Nutrient::Protein,
        Nutrient::Fat,
        Nutrient::Carbs,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Column name in the `foods` table, also used as the JSON key.
    pub fn column(self) -> &'static str {
        match self {
            Nutrient::Kcal => "kcal",
            Nutrient::Protein => "protein",
            Nutrient::Carbs => "carbs",
            Nutrient::Fat => "fat",
            Nutrient::Fiber => "fiber",
            Nutrient::Sugar => "sugar",
            Nutrient::Sodium => "sodium",
            Nutrient::VitaminA => "vitamin_a",
            Nutrient::VitaminC => "vitamin_c",
            Nutrient::VitaminD => "vitamin_d",
            Nutrient::VitaminE => "vitamin_e",
            Nutrient::VitaminK => "vitamin_k",
            Nutrient::Calcium => "calcium",
            Nutrient::Iron => "iron",
            Nutrient::Magnesium => "magnesium",
            Nutrient::Phosphorus => "phosphorus",
            Nutrient::Potassium => "potassium",
            Nutrient::Zinc => "zinc",
            Nutrient::Copper => "copper",
            Nutrient::Manganese => "manganese",
            Nutrient::Selenium => "selenium",
            Nutrient::Iodine => "iodine",
            Nutrient::Chromium => "chromium",
            Nutrient::Molybdenum => "molybdenum",
            Nutrient::Omega3 => "omega_3",
            Nutrient::Omega6 => "omega_6",
            Nutrient::MonounsaturatedFat => "monounsaturated_fat",
            Nutrient::PolyunsaturatedFat => "polyunsaturated_fat",
            Nutrient::TransFat => "trans_fat",
            Nutrient::Cholesterol => "cholesterol",
            Nutrient::Water => "water",
            Nutrient::ThiaminB1 => "thiamin_b1",
            Nutrient::RiboflavinB2 => "riboflavin_b2",
            Nutrient::NiacinB3 => "niacin_b3",
            Nutrient::PantothenicB5 => "pantothenic_b5",
            Nutrient::BiotinB7 => "biotin_b7",
            Nutrient::FolateB9 => "folate_b9",
            Nutrient::VitaminB6 => "vitamin_b6",
            Nutrient::VitaminB12 => "vitamin_b12",
            Nutrient::Choline => "choline",
            Nutrient::Alcohol => "alcohol",
            Nutrient::Caffeine => "caffeine",
        }
    }

    pub fn is_macro(self) -> bool {
        Self::MACROS.contains(&self)
    }

    pub fn unit(self) -> Unit {
        use Nutrient::*;
        match self {
            Kcal => Unit::Kcal,
            Protein | Carbs | Fat | Fiber | Sugar | Omega3 | Omega6 | MonounsaturatedFat
            | PolyunsaturatedFat | TransFat | Water | Alcohol => Unit::Gram,
            VitaminA | VitaminD | VitaminK | Selenium | Iodine | Chromium | Molybdenum
            | BiotinB7 | FolateB9 | VitaminB12 => Unit::Microgram,
            _ => Unit::Milligram,
        }
    }

    /// Plausible magnitude per 100 g, independent of food category.
    ///
    /// This table is the single source of truth for unit/scale correction of
    /// micronutrients and for the accuracy verification report.
    pub fn band(self) -> Band {
        use Nutrient::*;
        let max = match self {
            Kcal => 900.0,
            Protein | Carbs | Fat | Sugar | MonounsaturatedFat | PolyunsaturatedFat
            | Water | Alcohol => 100.0,
            Fiber => 80.0,
            Sodium => 40_000.0,
            VitaminA => 10_000.0,
            VitaminC => 200.0,
            VitaminD => 20.0,
            VitaminE => 50.0,
            VitaminK => 1000.0,
            Calcium => 1000.0,
            Iron => 30.0,
            Magnesium => 500.0,
            Phosphorus => 1000.0,
            Potassium => 1500.0,
            Zinc => 10.0,
            Copper => 5.0,
            Manganese => 10.0,
            Selenium => 150.0,
            Iodine => 1000.0,
            Chromium => 100.0,
            Molybdenum => 200.0,
            Omega3 => 30.0,
            Omega6 => 80.0,
            TransFat => 10.0,
            Cholesterol => 3000.0,
            ThiaminB1 | RiboflavinB2 => 5.0,
            NiacinB3 => 60.0,
            PantothenicB5 => 10.0,
            BiotinB7 => 100.0,
            FolateB9 => 1000.0,
            VitaminB6 => 5.0,
            VitaminB12 => 5.0,
            Choline => 500.0,
            Caffeine => 4000.0,
        };
        Band::new(0.0, max)
    }
}

/// Per-100 g nutrient values of one food, indexed by [`Nutrient`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NutrientValues([Option<f64>; Nutrient::COUNT]);

impl Default for NutrientValues {
    fn default() -> Self {
        Self([None; Nutrient::COUNT])
    }
}

impl NutrientValues {
    pub fn get(&self, n: Nutrient) -> Option<f64> {
        self.0[n.index()]
    }

    pub fn set(&mut self, n: Nutrient, value: Option<f64>) {
        self.0[n.index()] = value;
    }

    pub fn with(mut self, n: Nutrient, value: f64) -> Self {
        self.set(n, Some(value));
        self
    }

    /// Absent and zero both count as missing.
    pub fn is_missing(&self, n: Nutrient) -> bool {
        self.get(n).map_or(true, |v| v == 0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Nutrient, Option<f64>)> + '_ {
        Nutrient::ALL.into_iter().map(move |n| (n, self.get(n)))
    }

    pub fn present(&self) -> impl Iterator<Item = (Nutrient, f64)> + '_ {
        self.iter().filter_map(|(n, v)| v.map(|v| (n, v)))
    }

    pub fn missing(&self) -> Vec<Nutrient> {
        Nutrient::ALL
            .into_iter()
            .filter(|n| self.is_missing(*n))
            .collect()
    }
}

impl Serialize for NutrientValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (n, v) in self.present() {
            map.serialize_entry(n.column(), &v)?;
        }
        map.end()
    }
}
