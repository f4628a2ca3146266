use async_trait::async_trait;
use feed_engine::{CandidateStore, CandidateStoreError, PoolFilters};
use reqwest::{Client, StatusCode};
use tracing::debug;
use types::ids::UserId;
use types::profile::{Gender, UserProfile};

/// Candidate store backed by the user directory's internal HTTP API
///
/// - `GET {base}/internal/users/{id}` → `UserProfile`
/// - `GET {base}/internal/users/{id}/candidates?...` → `[UserId]`
pub struct HttpDirectory {
    client: Client,
    base_url: String,
}

impl HttpDirectory {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn candidates_url(&self, user_id: UserId, filters: &PoolFilters) -> String {
        let genders: Vec<&str> = filters.genders.iter().map(|g| gender_label(*g)).collect();
        format!(
            "{}/internal/users/{}/candidates?minAge={}&maxAge={}&limit={}&genders={}",
            self.base_url,
            user_id,
            filters.min_age,
            filters.max_age,
            filters.limit,
            genders.join(",")
        )
    }

    async fn fetch<T: serde::de::DeserializeOwned>(
        &self,
        url: String,
        user_id: UserId,
    ) -> Result<T, CandidateStoreError> {
        let res = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CandidateStoreError::Unavailable(format!("User directory error: {}", e)))?;

        match res.status() {
            StatusCode::NOT_FOUND => Err(CandidateStoreError::NotFound(user_id)),
            status if !status.is_success() => Err(CandidateStoreError::Unavailable(format!(
                "User directory returned {}",
                status
            ))),
            _ => res.json::<T>().await.map_err(|e| {
                CandidateStoreError::Unavailable(format!("Malformed directory response: {}", e))
            }),
        }
    }
}

fn gender_label(gender: Gender) -> &'static str {
    match gender {
        Gender::Male => "MALE",
        Gender::Female => "FEMALE",
        Gender::NonBinary => "NON_BINARY",
    }
}

#[async_trait]
impl CandidateStore for HttpDirectory {
    async fn get_user_attributes(
        &self,
        user_id: UserId,
    ) -> Result<UserProfile, CandidateStoreError> {
        let url = format!("{}/internal/users/{}", self.base_url, user_id);
        self.fetch(url, user_id).await
    }

    async fn get_candidate_pool(
        &self,
        user_id: UserId,
        filters: &PoolFilters,
    ) -> Result<Vec<UserId>, CandidateStoreError> {
        let url = self.candidates_url(user_id, filters);
        let pool: Vec<UserId> = self.fetch(url, user_id).await?;
        debug!(user = %user_id, pool = pool.len(), "Candidate pool fetched");
        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::profile::Preferences;

    #[test]
    fn test_candidates_url() {
        let dir = HttpDirectory::new(Client::new(), "http://directory:8081/");
        let user = UserId::new();
        let prefs = Preferences {
            min_age: 25,
            max_age: 35,
            interested_in: [Gender::Female, Gender::NonBinary].into_iter().collect(),
        };
        let url = dir.candidates_url(user, &PoolFilters::for_viewer(&prefs, 5, 500));
        assert_eq!(
            url,
            format!(
                "http://directory:8081/internal/users/{}/candidates?minAge=20&maxAge=40&limit=500&genders=FEMALE,NON_BINARY",
                user
            )
        );
    }
}
