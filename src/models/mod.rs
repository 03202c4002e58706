use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod db_operations;
pub mod payloads;

pub const PROJECT_CATEGORIES: [&str; 3] = ["WEBSITE", "PRODUCT", "MOBILE"];

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub thumbnail: String,
    pub images: String, // JSON array encoded as a string
    pub year: i32,
    pub client: String,
    pub duration: Option<String>,
    pub industry: Option<String>,
    pub scope: Option<String>, // JSON array encoded as a string
    pub challenge: Option<String>,
    pub approach: Option<String>,
    pub testimonial: Option<String>,
    pub content: Option<String>,
    pub is_published: bool,
    pub order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Shape consumed by the public portfolio site.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub slug: String,
    pub image_url: String,
    pub category: String,
    pub year: i32,
    pub client: String,
    pub is_published: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TemplateStatus {
    Draft,
    Published,
    Archived,
}

impl TemplateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateStatus::Draft => "draft",
            TemplateStatus::Published => "published",
            TemplateStatus::Archived => "archived",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(TemplateStatus::Draft),
            "published" => Some(TemplateStatus::Published),
            "archived" => Some(TemplateStatus::Archived),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TemplateProject {
    pub id: String,
    pub title: String,
    pub hero_image: String,
    pub challenge: String,
    pub approach: String,
    pub client: String,
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
    pub status: TemplateStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
    Document,
    Other,
}

impl MediaType {
    pub fn from_mime(mime_type: &str) -> Self {
        if mime_type.starts_with("image/") {
            MediaType::Image
        } else if mime_type.starts_with("video/") {
            MediaType::Video
        } else if mime_type == "application/pdf" {
            MediaType::Document
        } else {
            MediaType::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
            MediaType::Document => "document",
            MediaType::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "image" => MediaType::Image,
            "video" => MediaType::Video,
            "document" => MediaType::Document,
            _ => MediaType::Other,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MediaFile {
    pub id: String,
    pub filename: String,
    pub original_name: String,
    pub mime_type: String,
    pub size: i64,
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub alt: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields of a media row that are known before it is inserted.
#[derive(Debug, Clone)]
pub struct NewMediaFile {
    pub filename: String,
    pub original_name: String,
    pub mime_type: String,
    pub size: i64,
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub alt: Option<String>,
    pub description: Option<String>,
    pub media_type: MediaType,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SocialLinks {
    pub linkedin: Option<String>,
    pub dribbble: Option<String>,
    pub behance: Option<String>,
    pub medium: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub title: String,
    pub description: String,
    pub email: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub photo: Option<String>,
    pub social_links: SocialLinks,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Clone)]
pub struct Admin {
    pub id: i64,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: i64,
}

impl PageMeta {
    pub fn new(page: u32, limit: u32, total: i64) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            (total + limit as i64 - 1) / limit as i64
        };
        PageMeta { page, limit, total, total_pages }
    }
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

/// Page/limit pair resolved from query parameters.
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    /// Zero or missing values fall back to page 1 / limit 50.
    pub fn from_query(page: Option<u32>, limit: Option<u32>) -> Self {
        Pagination {
            page: page.filter(|p| *p > 0).unwrap_or(1),
            limit: limit.filter(|l| *l > 0).unwrap_or(50),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.limit as i64
    }
}
