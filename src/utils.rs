//! Naming helpers shared by the resource builders
use reqwest::Url;

/// Name of the ConfigMap holding the generated index page
pub fn config_map_name(game_name: &str) -> String {
    format!("{}-index-configmap", game_name)
}

/// Name of the claim the game bundle is downloaded into
pub fn pvc_name(game_name: &str) -> String {
    format!("{}-pvc", game_name)
}

/// Last path segment of the download url, e.g. `doom.zip`
pub fn bundle_name(url: &str) -> String {
    if let Ok(parsed) = Url::parse(url) {
        if let Some(segment) = parsed
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        {
            return segment.to_string();
        }
    }
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(url)
        .to_string()
}
