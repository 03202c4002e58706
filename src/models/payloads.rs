//! Request bodies accepted by the JSON API.

use serde::Deserialize;
use serde_json::Value;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, Default, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectPayload {
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "description is required"))]
    pub description: String,
    #[validate(length(min = 1, message = "category is required"))]
    pub category: String,
    #[validate(length(min = 1, message = "thumbnail is required"))]
    pub thumbnail: String,
    /// JSON array encoded as a string. Kept loose so any other shape is
    /// reported against `images` instead of failing deserialization.
    pub images: Value,
    #[validate(range(min = 1990, message = "year must be 1990 or later"))]
    pub year: i32,
    #[validate(length(min = 1, message = "client is required"))]
    pub client: String,
    pub duration: Option<String>,
    pub industry: Option<String>,
    pub scope: Option<String>,
    pub challenge: Option<String>,
    pub approach: Option<String>,
    pub testimonial: Option<String>,
    pub content: Option<String>,
    pub is_published: bool,
    pub order: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ReorderItem {
    pub id: Option<String>,
    pub order: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderPayload {
    pub project_orders: Vec<ReorderItem>,
}

/// Kept loose so a non-boolean value is reported as a 400 by the handler.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishPayload {
    #[serde(default)]
    pub is_published: Value,
}

#[derive(Debug, Deserialize)]
pub struct ContentPayload {
    #[serde(default)]
    pub content: Value,
}

#[derive(Debug, Deserialize, Validate, Default, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct TemplateProjectPayload {
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    pub hero_image: String,
    pub challenge: String,
    pub approach: String,
    #[validate(length(min = 1, message = "client is required"))]
    pub client: String,
    #[validate(length(min = 1, message = "year is required"))]
    pub year: String,
    pub duration: String,
    #[serde(rename = "type")]
    pub project_type: String,
    pub industry: String,
    pub scope: Vec<String>,
    pub image1: String,
    pub text_section1: String,
    pub image2: String,
    pub image3: String,
    pub image4: String,
    pub video1: String,
    pub video1_poster: String,
    pub video2: String,
    pub video2_poster: String,
    pub testimonial_quote: String,
    pub testimonial_author: String,
    pub testimonial_role: String,
    pub testimonial_image: String,
    pub final_image: String,
    pub text_section2: String,
    pub final_image1: String,
    pub final_image2: String,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusPayload {
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct MediaUpdatePayload {
    pub name: Option<String>,
    pub alt: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, Default)]
#[serde(default)]
pub struct ProfilePayload {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "description is required"))]
    pub description: String,
    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,
    pub phone: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct SocialLinksPayload {
    pub linkedin: Option<String>,
    pub dribbble: Option<String>,
    pub behance: Option<String>,
    pub medium: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginPayload {
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}
