use base64ct::{Base64, Encoding};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

/// Provisional analysis result awaiting accept or decline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodAnalysis {
    pub food_name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub meal_type: MealType,
    pub image_url: String,
    pub storage_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
}

/// Share of each macro in the total macro grams, in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacroSplit {
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl FoodAnalysis {
    pub fn macro_split(&self) -> MacroSplit {
        let total = self.protein + self.carbs + self.fat;
        if total <= 0.0 {
            return MacroSplit {
                protein: 0.0,
                carbs: 0.0,
                fat: 0.0,
            };
        }
        MacroSplit {
            protein: self.protein / total * 100.0,
            carbs: self.carbs / total * 100.0,
            fat: self.fat / total * 100.0,
        }
    }

    /// Decoded preview image, when the server inlined one.
    pub fn preview_bytes(&self) -> Option<Vec<u8>> {
        let raw = self.image_base64.as_deref()?;
        // tolerate a data-URI prefix
        let payload = raw.split_once("base64,").map_or(raw, |(_, p)| p);
        Base64::decode_vec(payload.trim()).ok()
    }
}

/// Committed diary record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodEntry {
    #[serde(rename = "_id")]
    pub id: String,
    pub food_name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meal_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscardRequest<'a> {
    pub storage_key: &'a str,
}
