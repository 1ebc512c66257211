/// Origin of the regulator's website.
pub const BASE_URL: &str = "https://ico.org.uk";

/// Path of the enforcement section; detail pages live beneath it.
pub const ENFORCEMENT_PATH: &str = "/action-weve-taken/enforcement/";

/// The site being monitored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub base_url: String,
    pub list_url: String,
}

impl Site {
    /// Build a site rooted at `base_url` with the standard enforcement path.
    pub fn new(base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        let list_url = format!("{base_url}{ENFORCEMENT_PATH}");
        Self { base_url, list_url }
    }

    /// Make a root-relative href absolute; anything else is returned as-is.
    pub fn expand_href(&self, href: &str) -> String {
        if href.starts_with('/') {
            format!("{}{}", self.base_url, href)
        } else {
            href.to_string()
        }
    }
}

impl Default for Site {
    fn default() -> Self {
        Self::new(BASE_URL)
    }
}
