// F-List kink list client.
//
// Fetches the public kink catalogue from the F-List API so the shared
// catalogue can be imported or refreshed in place.

use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;

use crate::core::kinks::{Kink, KinkCategory, KinkError};

/// Minimal F-List API client. It deliberately exposes only the one call
/// the import command needs.
pub struct FlistClient {
    client: Client,
    base_url: String,
}

impl FlistClient {
    pub fn new() -> Result<Self, KinkError> {
        let client = Client::builder()
            .user_agent("Ambassador/1.0")
            .build()
            .map_err(|e| KinkError::Storage(e.to_string()))?;

        Ok(Self {
            client,
            base_url: "https://www.f-list.net".to_string(),
        })
    }

    /// Downloads the full kink catalogue. Categories F-List doesn't
    /// label with a known name are filed under Other.
    pub async fn fetch_kinks(&self) -> Result<Vec<Kink>, KinkError> {
        let url = format!("{}/json/api/kink-list.php", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| KinkError::Storage(e.to_string()))?;

        if !response.status().is_success() {
            return Err(KinkError::Storage(format!(
                "F-List returned status {}",
                response.status()
            )));
        }

        let body: ApiKinkList = response
            .json()
            .await
            .map_err(|e| KinkError::Storage(e.to_string()))?;

        let mut kinks = Vec::new();
        for (category_name, group) in body.kinks {
            let category =
                KinkCategory::parse(&category_name).unwrap_or(KinkCategory::Other);

            for api_kink in group.items {
                kinks.push(Kink {
                    id: 0,
                    name: api_kink.name,
                    description: api_kink.description,
                    category,
                    flist_id: api_kink.kink_id,
                });
            }
        }

        Ok(kinks)
    }
}

#[derive(Deserialize)]
struct ApiKinkList {
    kinks: HashMap<String, ApiKinkGroup>,
}

#[derive(Deserialize)]
struct ApiKinkGroup {
    items: Vec<ApiKink>,
}

#[derive(Deserialize)]
struct ApiKink {
    kink_id: i64,
    name: String,
    description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_flist_payload_shape() {
        let payload = r#"
        {
            "kinks": {
                "General": {
                    "items": [
                        { "kink_id": 1, "name": "bondage", "description": "ropes" }
                    ]
                },
                "Something new": {
                    "items": [
                        { "kink_id": 2, "name": "mystery", "description": "unknown" }
                    ]
                }
            }
        }
        "#;

        let parsed: ApiKinkList = serde_json::from_str(payload).unwrap();
        assert_eq!(parsed.kinks.len(), 2);
        assert_eq!(parsed.kinks["General"].items[0].kink_id, 1);
    }

    #[test]
    fn unknown_categories_have_no_parse() {
        assert_eq!(KinkCategory::parse("Something new"), None);
    }
}
