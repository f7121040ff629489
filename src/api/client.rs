//! Moodle web service HTTP client.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use url::Url;

use crate::api::remote::RemoteData;
use crate::api::types::*;
use crate::error::{Error, Result};

/// REST endpoint relative to the site root.
const WS_PATH: &str = "webservice/rest/server.php";

/// Build the browser URL of a course page.
pub fn course_url(site_url: &str, course_id: u64) -> String {
    format!(
        "{}/course/view.php?id={}",
        site_url.trim_end_matches('/'),
        course_id
    )
}

/// Course site API client authenticated with a web service token.
pub struct MoodleApi {
    client: Client,
    endpoint: Url,
    token: String,
    user_id: u64,
}

impl MoodleApi {
    /// Create a new API client.
    pub fn new(site_url: &str, token: String, user_id: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("cms-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Api(format!("Failed to create HTTP client: {}", e)))?;

        let base = Url::parse(&format!("{}/", site_url.trim_end_matches('/')))?;
        let endpoint = base.join(WS_PATH)?;

        Ok(Self {
            client,
            endpoint,
            token,
            user_id,
        })
    }

    /// Call a web service function and decode its JSON response.
    async fn call<T: DeserializeOwned>(
        &self,
        function: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        tracing::debug!("GET {} wsfunction={}", self.endpoint, function);

        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[
                ("wstoken", self.token.as_str()),
                ("wsfunction", function),
                ("moodlewsrestformat", "json"),
            ])
            .query(params)
            .send()
            .await?;

        let text = checked(response).await?.text().await?;

        // Failures come back with a 200 status and an exception body
        if let Ok(exception) = serde_json::from_str::<WsException>(&text) {
            tracing::debug!("{} failed: {}", function, exception.message);
            if exception.is_auth_failure() {
                return Err(Error::Authentication(exception.message));
            }
            return Err(Error::Api(format!(
                "{} ({}): {}",
                function, exception.errorcode, exception.message
            )));
        }

        serde_json::from_str(&text).map_err(|e| {
            Error::Api(format!(
                "Failed to parse {} response: {} - Response: {}",
                function,
                e,
                text.chars().take(500).collect::<String>()
            ))
        })
    }

    /// Get site information (validates token).
    pub async fn get_site_info(&self) -> Result<SiteInfo> {
        self.call("core_webservice_get_site_info", &[]).await
    }

    /// Get the courses the user is enrolled in.
    pub async fn get_course_list(&self) -> Result<Vec<Course>> {
        self.call(
            "core_enrol_get_users_courses",
            &[("userid", self.user_id.to_string())],
        )
        .await
    }

    /// Get the sections and modules of a course.
    pub async fn get_course_contents(&self, course_id: u64) -> Result<Vec<Section>> {
        self.call(
            "core_course_get_contents",
            &[("courseid", course_id.to_string())],
        )
        .await
    }
}

/// Map HTTP-level failures onto our error kinds.
async fn checked(response: Response) -> Result<Response> {
    let status = response.status();
    tracing::debug!("Response status: {}", status);

    if status == 401 || status == 403 {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Authentication(format!(
            "HTTP {}: {}",
            status,
            if body.is_empty() {
                "Authentication failed"
            } else {
                &body
            }
        )));
    }

    if !status.is_success() {
        return Err(Error::Api(format!("HTTP {}", status)));
    }

    Ok(response)
}

#[async_trait]
impl RemoteData for MoodleApi {
    async fn fetch_course_list(&self) -> Result<Vec<Course>> {
        self.get_course_list().await
    }

    async fn fetch_course_sections(&self, course: &Course) -> Result<Vec<Section>> {
        self.get_course_contents(course.id)
            .await
            .map_err(|e| Error::CourseFetch {
                course_id: course.id,
                message: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_course_url() {
        assert_eq!(
            course_url("https://cms.example.edu/", 42),
            "https://cms.example.edu/course/view.php?id=42"
        );
    }

    #[test]
    fn test_endpoint_keeps_site_subpath() {
        let api = MoodleApi::new("https://example.edu/moodle", "t".into(), 1).unwrap();
        assert_eq!(
            api.endpoint.as_str(),
            "https://example.edu/moodle/webservice/rest/server.php"
        );
    }

    #[tokio::test]
    async fn test_section_fetch_failure_names_the_course() {
        let api = MoodleApi::new("http://127.0.0.1:9", "t".into(), 1).unwrap();
        let course = Course {
            id: 42,
            short_name: "CS F111".into(),
            full_name: "Computer Programming".into(),
        };

        let err = api.fetch_course_sections(&course).await.unwrap_err();
        assert!(matches!(err, Error::CourseFetch { course_id: 42, .. }));
        assert!(err.is_isolated());
    }
}
