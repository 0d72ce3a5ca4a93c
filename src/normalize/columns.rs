use once_cell::sync::Lazy;
use regex::Regex;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Header spellings seen in supplier sheets, mapped onto catalog field names
const COLUMN_ALIASES: &[(&str, &str)] = &[
    ("title", "name"),
    ("product", "name"),
    ("product_name", "name"),
    ("item_name", "name"),
    ("cost", "price"),
    ("unit_price", "price"),
    ("price_usd", "price"),
    ("image", "image_url"),
    ("img", "image_url"),
    ("image_link", "image_url"),
    ("picture", "image_url"),
    ("link", "product_url"),
    ("url", "product_url"),
    ("product_link", "product_url"),
    ("qty", "stock_quantity"),
    ("quantity", "stock_quantity"),
    ("stock", "stock_quantity"),
    ("part_number", "sku"),
    ("item_number", "sku"),
    ("manufacturer", "brand"),
    ("type", "category"),
    ("category_name", "category"),
    ("details", "description"),
];

/// Normalize a spreadsheet column header to a snake_case catalog field name
pub fn normalize_column(header: &str) -> String {
    let lowered = header.trim().to_lowercase();
    let snake = NON_WORD.replace_all(&lowered, "_");
    let snake = snake.trim_matches('_');

    COLUMN_ALIASES
        .iter()
        .find(|(alias, _)| *alias == snake)
        .map(|(_, field)| field.to_string())
        .unwrap_or_else(|| snake.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_case() {
        assert_eq!(normalize_column(" Stock Level (Units) "), "stock_level_units");
    }

    #[test]
    fn test_aliases() {
        assert_eq!(normalize_column("Product Name"), "name");
        assert_eq!(normalize_column("Unit Price"), "price");
        assert_eq!(normalize_column("IMG"), "image_url");
        assert_eq!(normalize_column("Link"), "product_url");
    }

    #[test]
    fn test_known_fields_pass_through() {
        assert_eq!(normalize_column("name"), "name");
        assert_eq!(normalize_column("image_url"), "image_url");
    }
}
