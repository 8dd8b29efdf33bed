//! Name-to-entity resolution.
//!
//! Moodle's search functions only do substring matching, so a human-provided
//! name can come back with zero, one, or many candidates. These helpers
//! classify the result set and either resolve to a unique record or return a
//! message the agent can relay back to the user — a not-found notice or a
//! clarification request listing the candidates.
//!
//! When several substring matches exist but exactly one of them matches the
//! query exactly (case-insensitive), that one wins. This lets "Juan Pérez"
//! resolve in a single round-trip even when the search also surfaces
//! "Juan Pérez García".
//!
//! Results are never cached; every resolution re-queries the site.

use serde_json::Value;
use tracing::debug;

use crate::moodle::MoodleClient;

/// Maximum number of candidates listed in a clarification message.
const MAX_CANDIDATES: usize = 10;

/// Resolve a free-text name to a unique user record via
/// `core_user_get_users` with a `fullname` criteria filter.
///
/// `Ok` carries the opaque user record as Moodle returned it; `Err` carries
/// the not-found or clarification text.
pub async fn find_user_by_name(
    client: &MoodleClient,
    name_query: &str,
) -> Result<Value, String> {
    let params = vec![
        MoodleClient::entry("criteria", 0, "key", "fullname"),
        MoodleClient::entry("criteria", 0, "value", name_query),
    ];

    let users = match client.call("core_user_get_users", &params).await {
        Ok(body) => body
            .get("users")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
        Err(e) => {
            return Err(format!(
                "No encontré a nadie llamado '{name_query}'. Detalle: {e}"
            ))
        }
    };

    if users.is_empty() {
        return Err(format!(
            "No encontré a nadie llamado '{name_query}'. Detalle: No se encontraron usuarios."
        ));
    }

    if let Some(user) = pick_unique(&users, name_query) {
        debug!(query = name_query, "User resolved");
        return Ok(user.clone());
    }

    Err(clarification(
        &format!(
            "Encontré varios usuarios para '{name_query}'. \
             Por favor, sé más específico o proporciona el ID del usuario correcto:"
        ),
        &users,
    ))
}

/// Resolve a free-text name to a unique course record via
/// `core_course_search_courses`.
pub async fn find_course_by_name(
    client: &MoodleClient,
    course_name_query: &str,
) -> Result<Value, String> {
    let params = vec![
        ("criterianame".to_string(), "search".to_string()),
        ("criteriavalue".to_string(), course_name_query.to_string()),
    ];

    let courses = match client.call("core_course_search_courses", &params).await {
        Ok(body) => body
            .get("courses")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
        Err(_) => Vec::new(),
    };

    if courses.is_empty() {
        return Err(format!(
            "No encontré ningún curso que coincida con '{course_name_query}'."
        ));
    }

    if let Some(course) = pick_unique(&courses, course_name_query) {
        debug!(query = course_name_query, "Course resolved");
        return Ok(course.clone());
    }

    Err(clarification(
        &format!(
            "Encontré varios cursos para '{course_name_query}'. \
             Por favor, especifica a cuál te refieres, si es necesario, usando su ID:"
        ),
        &courses,
    ))
}

/// Pick the single unambiguous candidate, if any.
///
/// One candidate is unambiguous by itself. Among several, a lone
/// case-insensitive exact match on `fullname` wins; otherwise the set stays
/// ambiguous and `None` is returned.
pub fn pick_unique<'a>(candidates: &'a [Value], query: &str) -> Option<&'a Value> {
    if candidates.len() == 1 {
        return Some(&candidates[0]);
    }

    let query_lower = query.to_lowercase();
    let mut exact = candidates.iter().filter(|c| {
        c.get("fullname")
            .and_then(Value::as_str)
            .is_some_and(|n| n.to_lowercase() == query_lower)
    });

    match (exact.next(), exact.next()) {
        (Some(hit), None) => Some(hit),
        _ => None,
    }
}

/// Format a clarification message listing up to [`MAX_CANDIDATES`]
/// candidates as `- <fullname> (ID: <id>)` lines.
pub fn clarification(intro: &str, candidates: &[Value]) -> String {
    let options: Vec<String> = candidates
        .iter()
        .take(MAX_CANDIDATES)
        .map(|c| {
            let name = c
                .get("fullname")
                .and_then(Value::as_str)
                .unwrap_or("(sin nombre)");
            let id = c
                .get("id")
                .and_then(Value::as_i64)
                .map(|i| i.to_string())
                .unwrap_or_else(|| "?".to_string());
            format!("- {name} (ID: {id})")
        })
        .collect();

    format!("{intro}\n{}", options.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MoodleConfig;
    use httpmock::prelude::*;
    use serde_json::json;

    fn users(pairs: &[(&str, i64)]) -> Vec<Value> {
        pairs
            .iter()
            .map(|(name, id)| json!({"fullname": name, "id": id}))
            .collect()
    }

    #[test]
    fn test_single_candidate_is_unique() {
        let set = users(&[("Ana Lopez", 5)]);
        let hit = pick_unique(&set, "Ana").unwrap();
        assert_eq!(hit["id"], 5);
    }

    #[test]
    fn test_lone_exact_match_wins_over_substring_collisions() {
        let set = users(&[("Juan Pérez", 2), ("Juan Pérez García", 3)]);
        let hit = pick_unique(&set, "juan pérez").unwrap();
        assert_eq!(hit["id"], 2);
    }

    #[test]
    fn test_no_exact_match_stays_ambiguous() {
        let set = users(&[("Ana Lopez", 5), ("Ana Ruiz", 9)]);
        assert!(pick_unique(&set, "Ana").is_none());
    }

    #[test]
    fn test_two_exact_matches_stay_ambiguous() {
        let set = users(&[("Ana Lopez", 5), ("ana lopez", 6)]);
        assert!(pick_unique(&set, "Ana Lopez").is_none());
    }

    #[test]
    fn test_clarification_lists_at_most_ten() {
        let set: Vec<Value> = (0..15)
            .map(|i| json!({"fullname": format!("Usuario {i}"), "id": i}))
            .collect();
        let msg = clarification("Encontré varios usuarios:", &set);
        assert_eq!(msg.lines().count(), 11); // intro + 10 options
        assert!(msg.contains("- Usuario 9 (ID: 9)"));
        assert!(!msg.contains("Usuario 10"));
    }

    #[test]
    fn test_clarification_format() {
        let set = users(&[("Ana Lopez", 5), ("Ana Ruiz", 9)]);
        let msg = clarification("Encontré varios usuarios para 'Ana':", &set);
        assert!(msg.contains("- Ana Lopez (ID: 5)"));
        assert!(msg.contains("- Ana Ruiz (ID: 9)"));
    }

    async fn client_for(server: &MockServer) -> MoodleClient {
        server
            .mock_async(|when, then| {
                when.method(POST).path("/login/token.php");
                then.status(200).json_body(json!({"token": "abc123"}));
            })
            .await;

        let mut config = MoodleConfig {
            url: server.base_url(),
            admin_username: "admin".into(),
            admin_password: "secret".into(),
            service_shortname: "moodlebot_ws".into(),
        };
        config.normalize();
        MoodleClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_ambiguous_user_search_asks_for_clarification() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/webservice/rest/server.php")
                    .body_includes("wsfunction=core_user_get_users");
                then.status(200).json_body(json!({
                    "users": [
                        {"fullname": "Ana Lopez", "id": 5},
                        {"fullname": "Ana Ruiz", "id": 9}
                    ]
                }));
            })
            .await;

        let client = client_for(&server).await;
        let msg = find_user_by_name(&client, "Ana").await.unwrap_err();

        assert!(msg.contains("Encontré varios usuarios"));
        assert!(msg.contains("Ana Lopez (ID: 5)"));
        assert!(msg.contains("Ana Ruiz (ID: 9)"));
    }

    #[tokio::test]
    async fn test_empty_user_search_embeds_query() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/webservice/rest/server.php");
                then.status(200).json_body(json!({"users": []}));
            })
            .await;

        let client = client_for(&server).await;
        let msg = find_user_by_name(&client, "Nadie Real").await.unwrap_err();
        assert!(msg.contains("'Nadie Real'"));
    }

    #[tokio::test]
    async fn test_unique_course_resolves() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/webservice/rest/server.php")
                    .body_includes("wsfunction=core_course_search_courses")
                    .body_includes("criterianame=search");
                then.status(200).json_body(json!({
                    "courses": [{"fullname": "Historia Moderna", "id": 42}]
                }));
            })
            .await;

        let client = client_for(&server).await;
        let course = find_course_by_name(&client, "Historia").await.unwrap();
        assert_eq!(course["id"], 42);
    }
}
