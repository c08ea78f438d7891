//! 賣場分區：依 identity key 把項目歸到 produce / meat / dairy 等區域。

use crate::core::identity::Lexicon;
use std::collections::BTreeMap;

pub const OTHER_CATEGORY: &str = "other";

const BUILTIN_ORDER: &[&str] = &[
    "produce",
    "meat",
    "dairy",
    "frozen",
    "canned_goods",
    "pantry",
    "spices",
    "condiments",
    "beverages",
    OTHER_CATEGORY,
];

const BUILTIN_ITEMS: &[(&str, &[&str])] = &[
    (
        "produce",
        &[
            "apple", "banana", "orange", "lemon", "lime", "tomato", "onion", "garlic", "carrot", "celery",
            "potato", "lettuce", "spinach", "broccoli", "bell pepper", "mushroom", "avocado", "cucumber",
            "zucchini", "eggplant", "corn", "peas", "green beans", "asparagus", "cabbage", "cauliflower",
            "kale", "arugula", "basil", "parsley", "cilantro", "mint", "rosemary", "thyme", "oregano",
            "dill", "sage", "chives", "green onion", "leek", "shallot", "ginger", "jalapeno",
        ],
    ),
    (
        "meat",
        &[
            "chicken", "beef", "pork", "turkey", "lamb", "fish", "salmon", "tuna", "shrimp", "crab",
            "lobster", "bacon", "sausage", "ham", "ground beef", "ground turkey", "ground pork", "steak",
            "wings", "thighs",
        ],
    ),
    (
        "dairy",
        &[
            "milk", "butter", "cheese", "cream", "yogurt", "sour cream", "heavy cream", "cream cheese",
            "cottage cheese", "ricotta", "mozzarella", "cheddar", "parmesan", "feta", "goat cheese",
            "blue cheese", "eggs",
        ],
    ),
    (
        "frozen",
        &["frozen vegetables", "frozen fruit", "frozen berries", "ice cream", "frozen pizza"],
    ),
    (
        "canned_goods",
        &[
            "beans", "chickpeas", "lentils", "tomato sauce", "tomato paste", "diced tomatoes", "coconut milk",
            "chicken broth", "beef broth", "vegetable broth", "stock", "artichokes", "olives",
        ],
    ),
    (
        "pantry",
        &[
            "flour", "sugar", "salt", "pepper", "oil", "vinegar", "baking powder", "baking soda", "vanilla",
            "honey", "maple syrup", "soy sauce", "worcestershire", "pasta", "rice", "quinoa", "oats", "bread",
            "crackers", "nuts", "almonds", "walnuts", "pecans", "cashews", "peanuts", "coconut", "chocolate",
            "cocoa powder",
        ],
    ),
    (
        "spices",
        &[
            "cinnamon", "paprika", "cumin", "chili powder", "garlic powder", "onion powder",
            "red pepper flakes", "black pepper", "white pepper", "cayenne", "turmeric", "garam masala",
            "curry powder", "bay leaves", "nutmeg", "cardamom", "cloves", "allspice", "fennel", "coriander",
        ],
    ),
    (
        "condiments",
        &[
            "mustard", "ketchup", "mayonnaise", "ranch", "bbq sauce", "teriyaki", "salsa", "hot sauce",
            "sriracha", "pesto", "tahini", "hummus",
        ],
    ),
    (
        "beverages",
        &[
            "water", "juice", "soda", "coffee", "tea", "wine", "beer", "liquor", "coconut water",
            "almond milk", "soy milk", "oat milk",
        ],
    ),
];

pub fn builtin_order() -> Vec<String> {
    BUILTIN_ORDER.iter().map(|c| c.to_string()).collect()
}

pub fn builtin_items() -> BTreeMap<String, Vec<String>> {
    BUILTIN_ITEMS
        .iter()
        .map(|(category, items)| (category.to_string(), items.iter().map(|i| i.to_string()).collect()))
        .collect()
}

#[derive(Debug, Clone)]
pub struct Categorizer {
    /// 購物動線順序，最後一定是 "other"
    order: Vec<String>,
    /// (分區, 正規化後的品項字詞)，依 `order` 排列
    items: Vec<(String, Vec<Vec<String>>)>,
}

impl Default for Categorizer {
    fn default() -> Self {
        Self::new(builtin_order(), builtin_items(), &Lexicon::default())
    }
}

impl Categorizer {
    /// 品項以與 identity key 相同的規則正規化，`order` 沒列出的分區依字母序接在後面
    pub fn new(order: Vec<String>, items: BTreeMap<String, Vec<String>>, lexicon: &Lexicon) -> Self {
        let mut full_order: Vec<String> = Vec::new();
        for category in order.into_iter().chain(items.keys().cloned()) {
            let category = category.trim().to_lowercase();
            if !category.is_empty() && category != OTHER_CATEGORY && !full_order.contains(&category) {
                full_order.push(category);
            }
        }
        full_order.push(OTHER_CATEGORY.to_string());

        let items = full_order
            .iter()
            .filter_map(|category| {
                let entries = items
                    .iter()
                    .find(|(name, _)| name.trim().eq_ignore_ascii_case(category))
                    .map(|(_, entries)| entries)?;
                let words = entries
                    .iter()
                    .map(|item| lexicon.normalize(item))
                    .filter(|item| !item.is_empty())
                    .map(|item| item.split(' ').map(str::to_string).collect())
                    .collect();
                Some((category.clone(), words))
            })
            .collect();

        Self {
            order: full_order,
            items,
        }
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// 分區在購物動線中的位置；未知分區排在最後
    pub fn rank(&self, category: &str) -> usize {
        self.order
            .iter()
            .position(|c| c == category)
            .unwrap_or(self.order.len())
    }

    /// 先找完全相同的品項，再找以整字包含的最長品項；同長度時取動線較前的分區
    pub fn categorize(&self, identity_key: &str) -> &str {
        let key: Vec<&str> = identity_key.split_whitespace().collect();
        if key.is_empty() {
            return OTHER_CATEGORY;
        }

        for (category, entries) in &self.items {
            if entries.iter().any(|item| item.iter().map(String::as_str).eq(key.iter().copied())) {
                return category;
            }
        }

        let mut best: Option<(&str, usize)> = None;
        for (category, entries) in &self.items {
            for item in entries {
                if item.len() > key.len() || best.is_some_and(|(_, len)| len >= item.len()) {
                    continue;
                }
                let found = key
                    .windows(item.len())
                    .any(|window| window.iter().zip(item).all(|(k, i)| *k == i.as_str()));
                if found {
                    best = Some((category, item.len()));
                }
            }
        }
        best.map(|(category, _)| category).unwrap_or(OTHER_CATEGORY)
    }
}
