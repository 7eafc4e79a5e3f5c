use serde::{Deserialize, Serialize};

/// shapes of the drama catalog api, only the fields the notifier reads are typed

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drama {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub poster: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub episode_count: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DramaDetail {
    #[serde(flatten)]
    pub drama: Drama,
    #[serde(default)]
    pub episodes: Option<Vec<DramaEpisode>>,
    #[serde(default)]
    pub total_episodes: Option<u32>,
}

impl DramaDetail {
    pub fn is_ongoing(&self) -> bool {
        self.drama.status.as_deref().is_some_and(|status| {
            let status = status.to_lowercase();
            status.contains("ongoing") || status.contains("on going")
        })
    }

    /// total from the api, else the episode list length, zero counts as missing for both
    pub fn episode_count(&self) -> u32 {
        self.total_episodes
            .filter(|n| *n > 0)
            .or_else(|| {
                self.episodes
                    .as_ref()
                    .map(|e| e.len() as u32)
                    .filter(|n| *n > 0)
            })
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DramaEpisode {
    pub id: String,
    pub episode_number: u32,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default, rename = "link_720_premium")]
    pub link_720_premium: Option<String>,
    #[serde(default, rename = "link_480")]
    pub link_480: Option<String>,
    #[serde(default, rename = "link_360")]
    pub link_360: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// envelope every catalog response comes in
#[derive(Debug, Deserialize)]
pub struct ApiResult<T> {
    pub success: bool,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(json: serde_json::Value) -> DramaDetail {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn ongoing_status_variants() {
        let base = serde_json::json!({ "id": "1", "title": "A" });

        let mut ongoing = base.clone();
        ongoing["status"] = "OnGoing".into();
        assert!(detail(ongoing).is_ongoing());

        let mut spaced = base.clone();
        spaced["status"] = "On Going".into();
        assert!(detail(spaced).is_ongoing());

        let mut completed = base.clone();
        completed["status"] = "Completed".into();
        assert!(!detail(completed).is_ongoing());

        assert!(!detail(base).is_ongoing());
    }

    #[test]
    fn episode_count_fallbacks() {
        let total = detail(serde_json::json!({ "id": "1", "title": "A", "totalEpisodes": 16 }));
        assert_eq!(total.episode_count(), 16);

        let listed = detail(serde_json::json!({
            "id": "1",
            "title": "A",
            "totalEpisodes": 0,
            "episodes": [
                { "id": "e1", "episodeNumber": 1 },
                { "id": "e2", "episodeNumber": 2, "link_480": "https://whatbox.ca/2.mp4" }
            ]
        }));
        assert_eq!(listed.episode_count(), 2);
        assert_eq!(
            listed.episodes.as_ref().unwrap()[1].link_480.as_deref(),
            Some("https://whatbox.ca/2.mp4")
        );

        let none = detail(serde_json::json!({ "id": "1", "title": "A" }));
        assert_eq!(none.episode_count(), 0);
    }
}
