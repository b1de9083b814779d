use serde::Deserialize;

use crate::error::TrackerError;
use crate::models::{DEFAULT_SERVING, FoodCandidate, round1};

/// Body of `GET /fdc/v1/foods/search`. Only the fields we read are modelled.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub foods: Vec<FoodItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodItem {
    #[serde(default)]
    pub fdc_id: i64,
    #[serde(default)]
    pub description: String,
    pub brand_name: Option<String>,
    pub brand_owner: Option<String>,
    #[serde(default)]
    pub food_nutrients: Vec<FoodNutrient>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodNutrient {
    #[serde(default)]
    pub nutrient_name: String,
    pub value: Option<f64>,
}

const PROTEIN: &str = "Protein";
const FIBER_NAMES: &[&str] = &["Fiber, total dietary", "Fiber"];

fn first_value(nutrients: &[FoodNutrient], names: &[&str]) -> f64 {
    nutrients
        .iter()
        .find(|n| names.contains(&n.nutrient_name.as_str()))
        .and_then(|n| n.value)
        .unwrap_or(0.0)
}

/// Normalize one search hit. Missing nutrients count as zero.
#[must_use]
pub fn food_to_candidate(food: FoodItem) -> FoodCandidate {
    let protein = first_value(&food.food_nutrients, &[PROTEIN]);
    let fiber = first_value(&food.food_nutrients, FIBER_NAMES);
    let brand_name = food
        .brand_name
        .filter(|b| !b.is_empty())
        .or_else(|| food.brand_owner.filter(|b| !b.is_empty()));

    FoodCandidate {
        id: food.fdc_id,
        name: food.description,
        protein: round1(protein),
        fiber: round1(fiber),
        serving_size: DEFAULT_SERVING.to_string(),
        brand_name,
    }
}

/// Normalize a whole response, keeping upstream order.
#[must_use]
pub fn candidates_from_response(response: SearchResponse) -> Vec<FoodCandidate> {
    response.foods.into_iter().map(food_to_candidate).collect()
}

/// Trim a query, rejecting one that is blank.
pub fn validate_query(query: &str) -> Result<&str, TrackerError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(TrackerError::BlankQuery);
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nutrient(name: &str, value: f64) -> FoodNutrient {
        FoodNutrient {
            nutrient_name: name.to_string(),
            value: Some(value),
        }
    }

    fn chicken() -> FoodItem {
        FoodItem {
            fdc_id: 171_077,
            description: "Chicken, broiler, breast, raw".to_string(),
            brand_name: None,
            brand_owner: None,
            food_nutrients: vec![
                nutrient("Energy", 120.0),
                nutrient("Protein", 23.456),
                nutrient("Fiber, total dietary", 2.04),
            ],
        }
    }

    #[test]
    fn test_food_to_candidate_rounds() {
        let c = food_to_candidate(chicken());
        assert_eq!(c.id, 171_077);
        assert_eq!(c.name, "Chicken, broiler, breast, raw");
        assert!((c.protein - 23.5).abs() < f64::EPSILON);
        assert!((c.fiber - 2.0).abs() < f64::EPSILON);
        assert_eq!(c.serving_size, "100g");
        assert!(c.brand_name.is_none());
    }

    #[test]
    fn test_missing_nutrients_default_to_zero() {
        let mut item = chicken();
        item.food_nutrients = vec![nutrient("Energy", 50.0)];
        let c = food_to_candidate(item);
        assert!((c.protein - 0.0).abs() < f64::EPSILON);
        assert!((c.fiber - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_plain_fiber_name_accepted() {
        let mut item = chicken();
        item.food_nutrients = vec![nutrient("Fiber", 3.33), nutrient("Fiber, total dietary", 9.0)];
        let c = food_to_candidate(item);
        assert!((c.fiber - 3.3).abs() < f64::EPSILON);
    }

    #[test]
    fn test_protein_name_must_match_exactly() {
        let mut item = chicken();
        item.food_nutrients = vec![nutrient("Protein, crude", 40.0), nutrient("Protein", 12.0)];
        let c = food_to_candidate(item);
        assert!((c.protein - 12.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_brand_fallback() {
        let mut item = chicken();
        item.brand_owner = Some("Owner Co".to_string());
        assert_eq!(
            food_to_candidate(item).brand_name.as_deref(),
            Some("Owner Co")
        );

        let mut item = chicken();
        item.brand_name = Some("Brand".to_string());
        item.brand_owner = Some("Owner Co".to_string());
        assert_eq!(food_to_candidate(item).brand_name.as_deref(), Some("Brand"));

        let mut item = chicken();
        item.brand_name = Some(String::new());
        item.brand_owner = Some("Owner Co".to_string());
        assert_eq!(
            food_to_candidate(item).brand_name.as_deref(),
            Some("Owner Co")
        );
    }

    #[test]
    fn test_response_decodes_and_keeps_order() {
        let raw = r#"{
            "totalHits": 2,
            "foods": [
                {"fdcId": 2, "description": "Tofu, firm", "brandOwner": "Soy Farms",
                 "foodNutrients": [{"nutrientId": 1003, "nutrientName": "Protein", "value": 17.3}]},
                {"fdcId": 1, "description": "Lentils",
                 "foodNutrients": [{"nutrientName": "Fiber, total dietary", "value": 7.9},
                                   {"nutrientName": "Protein", "value": 9.02}]}
            ]
        }"#;
        let response: SearchResponse = serde_json::from_str(raw).unwrap();
        let candidates = candidates_from_response(response);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].name, "Tofu, firm");
        assert_eq!(candidates[0].brand_name.as_deref(), Some("Soy Farms"));
        assert_eq!(candidates[1].name, "Lentils");
        assert!((candidates[1].protein - 9.0).abs() < f64::EPSILON);
        assert!((candidates[1].fiber - 7.9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_response_without_foods() {
        let response: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(candidates_from_response(response).is_empty());
    }

    #[test]
    fn test_validate_query() {
        assert_eq!(validate_query("  tofu ").unwrap(), "tofu");
        assert!(matches!(validate_query("   "), Err(TrackerError::BlankQuery)));
        assert!(matches!(validate_query(""), Err(TrackerError::BlankQuery)));
    }
}
