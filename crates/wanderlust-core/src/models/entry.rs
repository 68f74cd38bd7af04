use chrono::{DateTime, Utc};

use super::{Request, Response};

/// A request/response pair held in a bucket.
#[derive(Debug, Clone)]
pub struct CachedEntry {
    pub request: Request,
    pub response: Response,
    pub cached_at: DateTime<Utc>,
}

impl CachedEntry {
    pub fn new(request: Request, response: Response) -> Self {
        Self {
            request,
            response,
            cached_at: Utc::now(),
        }
    }

    /// Whether this entry answers `request`.
    ///
    /// Only GET requests match. When the stored response names headers in
    /// `Vary`, the incoming request must carry the same values for them as the
    /// request the entry was stored under; `Vary: *` never matches.
    pub fn matches(&self, request: &Request) -> bool {
        if !request.is_get() || self.request.cache_url() != request.cache_url() {
            return false;
        }
        self.response.vary().iter().all(|name| {
            name != "*" && self.request.header(name) == request.header(name)
        })
    }

    pub fn age_minutes(&self) -> i64 {
        let now = Utc::now();
        (now - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }
}
