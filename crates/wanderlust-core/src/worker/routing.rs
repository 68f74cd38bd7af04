use crate::config::WorkerConfig;
use crate::models::Request;

/// Routing class of an intercepted request, decided once from its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Stylesheets and scripts: network first, cache as fallback.
    NetworkFirst,
    /// Everything else: cache first, network on a miss.
    CacheFirst,
}

impl Route {
    pub fn classify(config: &WorkerConfig, request: &Request) -> Self {
        let path = request.path();
        if config
            .network_first_markers
            .iter()
            .any(|marker| path.contains(marker.as_str()))
        {
            Route::NetworkFirst
        } else {
            Route::CacheFirst
        }
    }
}

pub fn is_icon(config: &WorkerConfig, request: &Request) -> bool {
    request.path().contains(config.icon_marker.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn config() -> WorkerConfig {
        WorkerConfig::new(Url::parse("https://wanderlust.test").unwrap())
    }

    fn get(url: &str) -> Request {
        Request::get(Url::parse(url).unwrap())
    }

    #[test]
    fn test_styles_and_scripts_are_network_first() {
        let config = config();
        for url in [
            "https://wanderlust.test/css/style.css",
            "https://wanderlust.test/js/script.js",
            "https://cdn.jsdelivr.net/npm/bootstrap@5.3.7/dist/css/bootstrap.min.css",
            "https://cdn.jsdelivr.net/npm/bootstrap@5.3.7/dist/js/bootstrap.bundle.min.js",
        ] {
            assert_eq!(Route::classify(&config, &get(url)), Route::NetworkFirst, "{}", url);
        }
    }

    #[test]
    fn test_everything_else_is_cache_first() {
        let config = config();
        for url in [
            "https://wanderlust.test/",
            "https://wanderlust.test/listings",
            "https://wanderlust.test/icons/icon-192x192.png",
            "https://wanderlust.test/style.css",
        ] {
            assert_eq!(Route::classify(&config, &get(url)), Route::CacheFirst, "{}", url);
        }
    }

    #[test]
    fn test_query_string_does_not_affect_route() {
        let config = config();
        let req = get("https://wanderlust.test/listings?next=/css/style.css");
        assert_eq!(Route::classify(&config, &req), Route::CacheFirst);
    }

    #[test]
    fn test_icon_detection() {
        let config = config();
        assert!(is_icon(&config, &get("https://wanderlust.test/icons/icon-72x72.png")));
        assert!(!is_icon(&config, &get("https://wanderlust.test/images/hero.png")));
    }
}
