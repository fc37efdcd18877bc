use crate::model::Category;

/// Keyword table, checked top to bottom. The first category with a keyword
/// contained in the lower-cased name wins, so the order here is the tie-break.
const KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::Bakery,
        &[
            "bread", "roll", "bun", "baguette", "croissant", "bagel", "toast", "pretzel", "muffin",
            "cake", "pastry", "donut", "brioche", "ciabatta", "tortilla", "pita",
        ],
    ),
    (
        Category::Meat,
        &[
            "meat", "chicken", "beef", "pork", "ham", "bacon", "sausage", "salami", "turkey",
            "lamb", "steak", "mince", "veal", "duck", "fish", "salmon", "tuna", "shrimp",
        ],
    ),
    (
        Category::Dairy,
        &[
            "milk", "cheese", "butter", "yogurt", "yoghurt", "cream", "quark", "eggs",
            "mozzarella", "parmesan", "feta", "kefir",
        ],
    ),
    (
        Category::Vegetables,
        &[
            "tomato", "potato", "onion", "garlic", "carrot", "cucumber", "pepper", "lettuce",
            "salad", "spinach", "broccoli", "cabbage", "zucchini", "eggplant", "mushroom", "leek",
            "celery", "peas", "corn", "bean",
        ],
    ),
    (
        Category::Fruits,
        &[
            "apple", "banana", "orange", "lemon", "lime", "grape", "strawberr", "berry", "cherry",
            "pear", "peach", "plum", "mango", "kiwi", "melon", "avocado", "fruit",
        ],
    ),
    (
        Category::Cosmetics,
        &[
            "soap", "toothpaste", "toothbrush", "deodorant", "lotion", "conditioner",
            "shower gel", "razor", "lipstick", "mascara", "sunscreen",
        ],
    ),
];

/// Map an item name to its category by substring match against [`KEYWORDS`].
pub fn classify(name: &str) -> Category {
    let lower = name.to_lowercase();
    KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map(|(cat, _)| *cat)
        .unwrap_or(Category::Other)
}
