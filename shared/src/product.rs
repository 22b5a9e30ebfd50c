use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A sellable bicycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: f64,
    #[serde(default)]
    pub image: String,
    pub description: String,
    #[serde(default)]
    pub specs: BTreeMap<String, String>,
    pub in_stock: bool,
    /// Average review score between 0 and 5.
    #[serde(alias = "reviews")]
    pub rating: f64,
    pub review_count: u32,
}

impl Product {
    /// Folds a new review score into the running average.
    pub fn apply_review(&mut self, score: f64) {
        let total = self.rating * f64::from(self.review_count) + score;
        self.review_count += 1;
        self.rating = total / f64::from(self.review_count);
    }
}

#[allow(clippy::too_many_arguments)]
fn bike(
    id: &str,
    name: &str,
    category: &str,
    price: f64,
    image: &str,
    description: &str,
    specs: [(&str, &str); 4],
    rating: f64,
    review_count: u32,
) -> Product {
    Product {
        id: id.to_string(),
        name: name.to_string(),
        category: category.to_string(),
        price,
        image: image.to_string(),
        description: description.to_string(),
        specs: specs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        in_stock: true,
        rating,
        review_count,
    }
}

/// The catalog a fresh store starts with.
pub fn seed_catalog() -> Vec<Product> {
    vec![
        bike(
            "roadster-200",
            "Roadster 200",
            "road",
            699.0,
            "https://source.unsplash.com/800x600/?road+bike,1",
            "Lightweight and fast for long-distance rides",
            [
                ("frame", "Aluminum"),
                ("weight", "8.5 kg"),
                ("gears", "21-speed"),
                ("brakes", "Dual Pivot Caliper"),
            ],
            4.5,
            23,
        ),
        bike(
            "summit-mtn",
            "Summit Mountain",
            "mountain",
            849.0,
            "https://source.unsplash.com/800x600/?mountain+bike,1",
            "Perfect for off-road adventures and trails",
            [
                ("frame", "Steel"),
                ("weight", "12 kg"),
                ("gears", "18-speed"),
                ("brakes", "V-Brakes"),
            ],
            4.7,
            45,
        ),
        bike(
            "city-hybrid",
            "City Hybrid",
            "hybrid",
            529.0,
            "https://source.unsplash.com/800x600/?city+bike",
            "Versatile bike for city commuting",
            [
                ("frame", "Aluminum"),
                ("weight", "10.5 kg"),
                ("gears", "21-speed"),
                ("brakes", "Rim Brakes"),
            ],
            4.3,
            34,
        ),
        bike(
            "pro-racer-x",
            "Pro Racer X",
            "road",
            1299.0,
            "https://source.unsplash.com/800x600/?road+bike,2",
            "Carbon fiber frame for ultimate performance",
            [
                ("frame", "Carbon Fiber"),
                ("weight", "6.5 kg"),
                ("gears", "27-speed"),
                ("brakes", "Disc Brakes"),
            ],
            4.9,
            67,
        ),
        bike(
            "trail-explorer",
            "Trail Explorer",
            "mountain",
            999.0,
            "https://source.unsplash.com/800x600/?mountain+bike,2",
            "Full suspension for rough terrain",
            [
                ("frame", "Steel"),
                ("weight", "13 kg"),
                ("gears", "21-speed"),
                ("brakes", "Hydraulic Disc Brakes"),
            ],
            4.6,
            52,
        ),
        bike(
            "urban-classic",
            "Urban Classic",
            "hybrid",
            649.0,
            "https://source.unsplash.com/800x600/?hybrid+bike",
            "Stylish and comfortable for everyday riding",
            [
                ("frame", "Aluminum"),
                ("weight", "10 kg"),
                ("gears", "21-speed"),
                ("brakes", "Dual Pivot Caliper"),
            ],
            4.4,
            28,
        ),
        bike(
            "speedster-elite",
            "Speedster Elite",
            "road",
            1499.0,
            "https://source.unsplash.com/800x600/?racing+bike",
            "Professional-grade racing bike",
            [
                ("frame", "Carbon Fiber"),
                ("weight", "6.2 kg"),
                ("gears", "30-speed"),
                ("brakes", "Hydraulic Disc Brakes"),
            ],
            4.8,
            89,
        ),
        bike(
            "beast-terrain",
            "Beast Terrain",
            "mountain",
            1199.0,
            "https://source.unsplash.com/800x600/?mountain+bike,3",
            "Heavy-duty mountain bike for extreme terrain",
            [
                ("frame", "Steel Reinforced"),
                ("weight", "14.5 kg"),
                ("gears", "24-speed"),
                ("brakes", "Hydraulic Disc Brakes"),
            ],
            4.7,
            41,
        ),
        bike(
            "comfort-cruiser",
            "Comfort Cruiser",
            "hybrid",
            579.0,
            "https://source.unsplash.com/800x600/?comfort+bike",
            "Relaxed geometry for comfortable rides",
            [
                ("frame", "Steel"),
                ("weight", "11.5 kg"),
                ("gears", "18-speed"),
                ("brakes", "Rim Brakes"),
            ],
            4.2,
            19,
        ),
    ]
}

/// Starting stock levels for the seed catalog.
pub fn seed_inventory() -> HashMap<String, u32> {
    [
        ("roadster-200", 30),
        ("summit-mtn", 15),
        ("city-hybrid", 40),
        ("pro-racer-x", 8),
        ("trail-explorer", 12),
        ("urban-classic", 22),
        ("speedster-elite", 5),
        ("beast-terrain", 10),
        ("comfort-cruiser", 25),
    ]
    .into_iter()
    .map(|(id, qty)| (id.to_string(), qty))
    .collect()
}
