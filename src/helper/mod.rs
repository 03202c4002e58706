pub mod auth_helpers;
pub mod media_helpers;
pub mod profile_helpers;
pub mod project_helpers;
pub mod sanitization_helpers;
pub mod template_project_helpers;
