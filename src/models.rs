use chrono::NaiveDateTime;

/// A slug record from the `slugs` table: the public path plus everything the
/// interstitial page needs to render.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Slug {
    pub id: i64,
    pub slug: String,
    pub title: String,
    /// Pre-filled chat message. Percent-encoded when the destination is built.
    pub message: String,
    pub image_url: Option<String>,
    /// How long the interstitial waits before navigating, in milliseconds.
    pub delay_ms: i64,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

/// A phone number in a slug's rotation, from the `targets` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Target {
    pub id: i64,
    pub slug_id: i64,
    pub phone: String,
    pub position: i64,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

/// A single dispatch event from the `clicks` table.
#[derive(Debug, Clone, sqlx::FromRow)]
#[allow(dead_code)]
pub struct ClickRecord {
    pub id: i64,
    pub slug_id: i64,
    pub phone: String,
    pub clicked_at: NaiveDateTime,
}

/// A slug row with its target and click counts, used on the dashboard.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SlugWithStats {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub target_count: i64,
    pub active_target_count: i64,
    pub click_count: i64,
}

/// A target joined with how many clicks it has been served.
#[derive(Debug, Clone)]
pub struct TargetWithStats {
    pub target: Target,
    pub click_count: i64,
}

/// Everything the slug detail page shows.
#[derive(Debug, Clone)]
pub struct SlugDetail {
    pub slug: Slug,
    pub targets: Vec<TargetWithStats>,
    /// Raw stored cursor; `None` until the first dispatch.
    pub cursor: Option<i64>,
    pub total_clicks: i64,
    pub recent_clicks: Vec<ClickRecord>,
}

/// Reduce a user-entered phone number to the digits a `wa.me` link expects.
///
/// Spaces, `+`, dashes, dots and parentheses are dropped. Anything else, or a
/// result outside 8–15 digits (E.164 bounds), is rejected.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let mut digits = String::with_capacity(raw.len());
    for c in raw.trim().chars() {
        match c {
            '0'..='9' => digits.push(c),
            ' ' | '+' | '-' | '.' | '(' | ')' => {}
            _ => return None,
        }
    }
    (8..=15).contains(&digits.len()).then_some(digits)
}

/// Slug codes are letters, digits and hyphens, and must not shadow a route.
pub fn is_valid_slug(code: &str) -> bool {
    const RESERVED: &[&str] = &["admin", "healthz", "health"];
    !code.is_empty()
        && code.len() <= 64
        && code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        && !RESERVED.contains(&code.to_ascii_lowercase().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_numbers_are_reduced_to_digits() {
        assert_eq!(
            normalize_phone(" +55 (11) 99999-0001 ").as_deref(),
            Some("5511999990001")
        );
        assert_eq!(normalize_phone("5511.9999.0001").as_deref(), Some("551199990001"));
        assert_eq!(normalize_phone("1234567"), None);
        assert_eq!(normalize_phone("1234567890123456"), None);
        assert_eq!(normalize_phone("55119999x001"), None);
    }

    #[test]
    fn slug_codes_are_restricted() {
        assert!(is_valid_slug("promo-2024"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("with space"));
        assert!(!is_valid_slug("ação"));
        assert!(!is_valid_slug("Admin"));
        assert!(!is_valid_slug("healthz"));
    }
}
