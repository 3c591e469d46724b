//! Bootstrap catalog written into an empty document store on first launch.

use crate::store::StoredProduct;

const CATALOG: &[(u64, &str, f64, &str, &str)] = &[
    (1, "Essence Mascara Lash Princess", 9.99, "beauty", "Volumizing and lengthening mascara with a long-lasting, cruelty-free formula."),
    (2, "Eyeshadow Palette with Mirror", 19.99, "beauty", "Versatile eyeshadow shades in a palette with a built-in mirror."),
    (3, "Powder Canister", 14.99, "beauty", "Finely milled setting powder for a flawless finish."),
    (4, "Red Lipstick", 12.99, "beauty", "Classic bold red lipstick with a creamy texture."),
    (5, "Calvin Klein CK One", 49.99, "fragrances", "Clean and refreshing unisex fragrance."),
    (6, "Chanel Coco Noir Eau De", 129.99, "fragrances", "Elegant and mysterious fragrance with notes of grapefruit and rose."),
    (7, "Dior J'adore", 89.99, "fragrances", "Luxurious floral fragrance with ylang-ylang and jasmine."),
    (8, "Annibale Colombo Bed", 1899.99, "furniture", "Luxurious bed crafted with high-quality materials."),
    (9, "Annibale Colombo Sofa", 2499.99, "furniture", "Sophisticated sofa with premium upholstery."),
    (10, "Bedside Table African Cherry", 299.99, "furniture", "Stylish bedside table in rich African cherry wood."),
    (11, "Apple", 1.99, "groceries", "Fresh and crisp apples."),
    (12, "Beef Steak", 12.99, "groceries", "High-quality beef steak, great for grilling."),
    (13, "Cat Food", 8.99, "groceries", "Nutritious cat food formulated to meet the needs of your feline friend."),
    (14, "Chicken Meat", 9.99, "groceries", "Fresh and tender chicken meat."),
];

/// The fixed product set used to seed an empty store.
pub fn bootstrap_products() -> Vec<StoredProduct> {
    CATALOG
        .iter()
        .map(|&(id, title, price, category, description)| StoredProduct {
            id: Some(id),
            title: title.to_string(),
            price,
            thumbnail: format!("https://cdn.dummyjson.com/products/images/{category}/{id}/thumbnail.png"),
            description: description.to_string(),
            category: Some(category.to_string()),
        })
        .collect()
}
