use garde::Validate;
use serde::Deserialize;

use super::{NewFeedback, NewProduct, DEFAULT_MATERIAL_TYPE};
use crate::error::{Error, Result};

/// Product listing as entered by a farmer. Price is kept as typed so the
/// parse failure can be reported like any other field error.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ListingForm {
    #[garde(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    #[garde(skip)]
    pub description: Option<String>,
    #[garde(custom(positive_price))]
    pub price: String,
    #[garde(custom(contact_phone))]
    pub phone: String,
    #[serde(default)]
    #[garde(skip)]
    pub material_type: Option<String>,
}

impl ListingForm {
    /// Validate and convert into a product row for `farmer_id`.
    pub fn into_product(self, farmer_id: &str, image_url: &str) -> Result<NewProduct> {
        self.validate()?;
        let price = parse_price(&self.price)
            .ok_or_else(|| Error::Validation(INVALID_PRICE.to_string()))?;

        Ok(NewProduct {
            farmer_id: farmer_id.to_string(),
            title: self.title,
            description: self.description.filter(|d| !d.trim().is_empty()),
            image_url: image_url.to_string(),
            price,
            material_type: self
                .material_type
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_MATERIAL_TYPE.to_string()),
            farmer_phone: self.phone,
        })
    }
}

/// Free-form feedback; only the message is required.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct FeedbackForm {
    #[serde(default)]
    #[garde(skip)]
    pub name: Option<String>,
    #[serde(default)]
    #[garde(skip)]
    pub email: Option<String>,
    #[garde(custom(required_message))]
    pub message: String,
}

impl FeedbackForm {
    /// Validate and convert into a feedback row. Anonymous senders have no `user_id`.
    pub fn into_feedback(self, user_id: Option<&str>) -> Result<NewFeedback> {
        self.validate()?;
        Ok(NewFeedback {
            user_id: user_id.map(str::to_string),
            name: self.name.filter(|n| !n.is_empty()),
            email: self.email.filter(|e| !e.is_empty()),
            message: self.message,
        })
    }
}

const INVALID_PRICE: &str = "Please enter a valid price greater than 0.";
const INVALID_PHONE: &str = "Please enter a valid phone number.";
const MISSING_MESSAGE: &str = "Please enter your feedback message.";

fn parse_price(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite() && *p > 0.0)
}

fn positive_price(value: &str, _ctx: &()) -> garde::Result {
    parse_price(value)
        .map(|_| ())
        .ok_or_else(|| garde::Error::new(INVALID_PRICE))
}

fn contact_phone(value: &str, _ctx: &()) -> garde::Result {
    let allowed = |c: char| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | ' ');
    if !value.is_empty() && value.chars().all(allowed) {
        Ok(())
    } else {
        Err(garde::Error::new(INVALID_PHONE))
    }
}

fn required_message(value: &str, _ctx: &()) -> garde::Result {
    if value.trim().is_empty() {
        Err(garde::Error::new(MISSING_MESSAGE))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> ListingForm {
        ListingForm {
            title: "Coconut shell bowl".to_string(),
            description: Some("Hand polished".to_string()),
            price: "249.50".to_string(),
            phone: "+91 (98) 765-43210".to_string(),
            material_type: Some("coconut_shell".to_string()),
        }
    }

    #[test]
    fn test_valid_form_becomes_product() {
        let product = form().into_product("farmer-1", "https://cdn/bowl.jpg").unwrap();
        assert_eq!(product.price, 249.5);
        assert_eq!(product.material_type, "coconut_shell");
        assert_eq!(product.farmer_phone, "+91 (98) 765-43210");
        assert_eq!(product.description.as_deref(), Some("Hand polished"));
    }

    #[test]
    fn test_defaults_material_and_blank_description() {
        let mut f = form();
        f.material_type = None;
        f.description = Some("   ".to_string());
        let product = f.into_product("farmer-1", "u").unwrap();
        assert_eq!(product.material_type, "other");
        assert_eq!(product.description, None);
    }

    #[test]
    fn test_rejects_bad_prices() {
        for price in ["", "abc", "0", "-5", "NaN", "inf"] {
            let mut f = form();
            f.price = price.to_string();
            let err = f.into_product("farmer-1", "u").unwrap_err();
            assert_eq!(err.to_string(), INVALID_PRICE, "price {price:?}");
        }
    }

    #[test]
    fn test_rejects_bad_phones() {
        for phone in ["", "call me", "98765#43"] {
            let mut f = form();
            f.phone = phone.to_string();
            let err = f.into_product("farmer-1", "u").unwrap_err();
            assert_eq!(err.to_string(), INVALID_PHONE, "phone {phone:?}");
        }
    }

    #[test]
    fn test_rejects_empty_title() {
        let mut f = form();
        f.title.clear();
        assert!(matches!(
            f.into_product("farmer-1", "u"),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_feedback_requires_message() {
        for message in ["", "  \n\t"] {
            let form = FeedbackForm {
                name: Some("Asha".to_string()),
                message: message.to_string(),
                ..Default::default()
            };
            let err = form.into_feedback(None).unwrap_err();
            assert_eq!(err.to_string(), MISSING_MESSAGE);
        }
    }

    #[test]
    fn test_feedback_blank_contact_fields_become_none() {
        let form = FeedbackForm {
            name: Some(String::new()),
            email: Some("asha@example.com".to_string()),
            message: "Great coasters".to_string(),
        };
        let row = form.into_feedback(Some("user-7")).unwrap();
        assert_eq!(row.user_id.as_deref(), Some("user-7"));
        assert_eq!(row.name, None);
        assert_eq!(row.email.as_deref(), Some("asha@example.com"));
        assert_eq!(row.message, "Great coasters");
    }
}
